//! Assignment engine: decides, per surface event, which id a surface gets,
//! applies it through the host, and keeps rule bindings and the external
//! registry in sync with surface lifecycle.

pub mod agent;

pub use agent::{AssignError, AssignOutcome, IdAgent};
