//! Core vocabulary and decision logic for the surface id agent.
//!
//! Pure crate: no IO, no clock access. The rule store and the default-range
//! allocator are owned by the engine and mutated from a single event-processing
//! context.

pub mod identity;
pub mod range;
pub mod rules;
pub mod types;

pub use identity::SurfaceIdentity;
pub use range::{DefaultRange, RangeError};
pub use rules::{MatchOutcome, Rule, RuleId, RuleLoadError, RuleStore};
pub use types::SurfaceHandle;
