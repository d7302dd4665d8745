//! SurfaceHost trait and the in-memory surface table.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surid_core::SurfaceHandle;

use crate::error::HostError;

// ─── Host API ─────────────────────────────────────────────────────

/// The id-agent-facing slice of the compositor host API.
///
/// Mirrors what the host exposes per surface: attribute accessors, the id
/// accessor/mutator pair, and a reverse lookup from id to holder. `None`
/// from [`SurfaceHost::surface_id`] is the "unset" sentinel. Implementations
/// must reject [`SurfaceHost::set_surface_id`] when the id is already held
/// by a different surface.
pub trait SurfaceHost {
    fn app_id(&self, surface: &SurfaceHandle) -> Option<String>;
    fn title(&self, surface: &SurfaceHandle) -> Option<String>;
    fn surface_id(&self, surface: &SurfaceHandle) -> Option<u32>;
    fn set_surface_id(&mut self, surface: &SurfaceHandle, id: u32) -> Result<(), HostError>;
    fn surface_with_id(&self, id: u32) -> Option<SurfaceHandle>;
}

// ─── Surface Table ────────────────────────────────────────────────

/// Live state of one surface as mirrored from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceRecord {
    pub app_id: Option<String>,
    pub title: Option<String>,
    pub surface_id: Option<u32>,
    pub configured_at: DateTime<Utc>,
}

/// In-memory mirror of the host's live surfaces.
///
/// Fed from configure/remove notifications; answers the host API queries
/// (attributes, id occupancy, reverse lookup) for a standalone deployment.
#[derive(Debug, Default)]
pub struct SurfaceTable {
    surfaces: HashMap<SurfaceHandle, SurfaceRecord>,
}

impl SurfaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a surface from a configure notification.
    ///
    /// Attributes are refreshed on every notification; an already-assigned
    /// id and the first-seen timestamp are kept.
    pub fn upsert(
        &mut self,
        surface: SurfaceHandle,
        app_id: Option<String>,
        title: Option<String>,
        now: DateTime<Utc>,
    ) {
        match self.surfaces.entry(surface) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.app_id = app_id;
                record.title = title;
            }
            Entry::Vacant(entry) => {
                entry.insert(SurfaceRecord {
                    app_id,
                    title,
                    surface_id: None,
                    configured_at: now,
                });
            }
        }
    }

    /// Drop a surface on its removal notification.
    pub fn remove(&mut self, surface: &SurfaceHandle) -> Option<SurfaceRecord> {
        self.surfaces.remove(surface)
    }

    pub fn get(&self, surface: &SurfaceHandle) -> Option<&SurfaceRecord> {
        self.surfaces.get(surface)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SurfaceHandle, &SurfaceRecord)> {
        self.surfaces.iter()
    }
}

impl SurfaceHost for SurfaceTable {
    fn app_id(&self, surface: &SurfaceHandle) -> Option<String> {
        self.surfaces.get(surface)?.app_id.clone()
    }

    fn title(&self, surface: &SurfaceHandle) -> Option<String> {
        self.surfaces.get(surface)?.title.clone()
    }

    fn surface_id(&self, surface: &SurfaceHandle) -> Option<u32> {
        self.surfaces.get(surface)?.surface_id
    }

    fn set_surface_id(&mut self, surface: &SurfaceHandle, id: u32) -> Result<(), HostError> {
        if let Some(holder) = self.surface_with_id(id) {
            if holder != *surface {
                return Err(HostError::IdInUse { id, holder });
            }
        }
        let record = self
            .surfaces
            .get_mut(surface)
            .ok_or_else(|| HostError::UnknownSurface(surface.clone()))?;
        record.surface_id = Some(id);
        Ok(())
    }

    fn surface_with_id(&self, id: u32) -> Option<SurfaceHandle> {
        self.surfaces
            .iter()
            .find_map(|(handle, record)| (record.surface_id == Some(id)).then(|| handle.clone()))
    }
}
