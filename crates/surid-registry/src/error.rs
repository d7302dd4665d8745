//! Error types for registry transport and protocol handling.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry protocol error: {0}")]
    Protocol(String),

    #[error("cannot resolve registry endpoint {0}")]
    Unresolvable(String),
}
