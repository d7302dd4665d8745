//! Per-event identity snapshot extracted from a surface.

use serde::{Deserialize, Serialize};

/// Identifying attributes of a surface, captured at event time.
///
/// Transient: recomputed on every configure event, never stored. The app id
/// is the primary match key; when the host reports none, the title stands in
/// for it so registry mirroring still has a usable key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceIdentity {
    pub app_id: Option<String>,
    pub title: Option<String>,
}

impl SurfaceIdentity {
    /// Build a snapshot from raw host attributes, applying the title fallback.
    pub fn from_parts(app_id: Option<String>, title: Option<String>) -> Self {
        let app_id = match (app_id, &title) {
            (Some(app_id), _) => Some(app_id),
            (None, Some(title)) => {
                tracing::info!(title = %title, "no app id reported, using title instead");
                Some(title.clone())
            }
            (None, None) => None,
        };
        Self { app_id, title }
    }

    /// True when the host reported neither an app id nor a title.
    pub fn is_empty(&self) -> bool {
        self.app_id.is_none() && self.title.is_none()
    }
}
