//! Compositor-host boundary: surface events, the host API trait, and the
//! in-memory surface table a standalone deployment uses to mirror live host
//! state.

pub mod error;
pub mod event;
pub mod table;

pub use error::HostError;
pub use event::SurfaceEvent;
pub use table::{SurfaceHost, SurfaceRecord, SurfaceTable};
