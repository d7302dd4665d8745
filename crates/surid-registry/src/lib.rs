//! Client for the external key-value registry that mirrors surface id
//! assignments (`<app> → <id>`, `SURID-<id> → <app>`).
//!
//! Tolerant by contract: a missing endpoint disables the integration, a dead
//! connection degrades every operation to a logged no-op, and no failure here
//! ever reaches the assignment path.

pub mod client;
pub mod error;
pub mod resp;
pub mod transport;

pub use client::{Endpoint, RegistryClient, SurfaceRegistry, connect_with_retry};
pub use error::RegistryError;
pub use resp::Reply;
pub use transport::{RegistryTransport, TcpTransport};
