use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Surface Handle ───────────────────────────────────────────────

/// Opaque token naming a live surface at the host boundary.
///
/// The host owns the surface's lifetime; a handle held past the surface's
/// removal event compares unequal to any live surface and must never be
/// dereferenced into host state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceHandle(String);

impl SurfaceHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
