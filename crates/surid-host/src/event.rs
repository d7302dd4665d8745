//! Host notification payloads as they cross the wire.

use serde::{Deserialize, Serialize};
use surid_core::SurfaceHandle;

/// Notifications emitted by the compositor host.
///
/// Delivery contract: single-threaded, in order, no event lost; `Shutdown`
/// fires exactly once and nothing follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SurfaceEvent {
    /// A surface's desktop-level descriptor became available.
    Configured {
        surface: SurfaceHandle,
        #[serde(default)]
        app_id: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    /// A surface disappeared from the host.
    Removed { surface: SurfaceHandle },
    /// The compositor is going down.
    Shutdown,
}
