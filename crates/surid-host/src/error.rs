//! Error types for the host boundary.

use surid_core::SurfaceHandle;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("surface id {id} is already held by surface {holder}")]
    IdInUse { id: u32, holder: SurfaceHandle },

    #[error("unknown surface {0}")]
    UnknownSurface(SurfaceHandle),
}
