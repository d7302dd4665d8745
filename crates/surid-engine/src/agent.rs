//! The per-event assignment state machine and lifecycle tracking.
//!
//! On a configure event: extract the identity snapshot, try the rule store,
//! fall back to the default range, apply the chosen id through the host, and
//! mirror the assignment into the registry. Every failure is terminal for
//! that event — the surface stays id-less until the host re-notifies.
//!
//! On a removal event: release the rule binding, then unregister using the
//! id the surface still holds at the host. The id is read back from the host
//! before any internal state about the surface is dropped.

use thiserror::Error;

use surid_core::{DefaultRange, MatchOutcome, RuleStore, SurfaceHandle, SurfaceIdentity};
use surid_host::{HostError, SurfaceHost};
use surid_registry::SurfaceRegistry;

// ─── Outcomes ─────────────────────────────────────────────────────

/// How a configure event concluded when an id ended up applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    /// Duplicate notification; the surface already holds an id.
    AlreadyAssigned { surface_id: u32 },
    /// A configured rule supplied the id.
    Rule { surface_id: u32 },
    /// The default range supplied the id.
    DefaultRange { surface_id: u32 },
}

impl AssignOutcome {
    pub fn surface_id(&self) -> u32 {
        match *self {
            AssignOutcome::AlreadyAssigned { surface_id }
            | AssignOutcome::Rule { surface_id }
            | AssignOutcome::DefaultRange { surface_id } => surface_id,
        }
    }
}

/// Why a configure event ended without an id. Local to one surface; never
/// retried by the agent itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignError {
    #[error("no rule matches and default behavior is disabled")]
    NoMatch,

    #[error("rule id {id} is occupied by surface {holder}")]
    RuleOccupied { id: u32, holder: SurfaceHandle },

    #[error("default id range exhausted")]
    RangeExhausted,

    #[error("default id {id} is already claimed by surface {holder}")]
    DefaultIdOccupied { id: u32, holder: SurfaceHandle },

    #[error("host rejected id {id}: {source}")]
    HostRejected {
        id: u32,
        #[source]
        source: HostError,
    },
}

// ─── Agent ────────────────────────────────────────────────────────

/// Owns the rule store, the default-range cursor, and the registry client.
/// All mutation happens from the single event-processing context.
pub struct IdAgent<R> {
    rules: RuleStore,
    range: Option<DefaultRange>,
    registry: R,
}

impl<R: SurfaceRegistry> IdAgent<R> {
    pub fn new(rules: RuleStore, range: Option<DefaultRange>, registry: R) -> Self {
        Self {
            rules,
            range,
            registry,
        }
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn range(&self) -> Option<&DefaultRange> {
        self.range.as_ref()
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Handle a "surface configured" notification.
    pub fn surface_configured(
        &mut self,
        host: &mut impl SurfaceHost,
        surface: &SurfaceHandle,
    ) -> Result<AssignOutcome, AssignError> {
        if let Some(surface_id) = host.surface_id(surface) {
            tracing::debug!(%surface, surface_id, "surface already has an id, ignoring");
            return Ok(AssignOutcome::AlreadyAssigned { surface_id });
        }

        let identity = SurfaceIdentity::from_parts(host.app_id(surface), host.title(surface));
        if identity.is_empty() {
            tracing::warn!(%surface, "surface reports neither app id nor title");
        } else {
            tracing::debug!(%surface, app_id = ?identity.app_id, title = ?identity.title, "extracted surface identity");
        }

        match self.rules.find_match(&identity, surface) {
            MatchOutcome::Matched(rule_id) => {
                let surface_id = self.rules.rule(rule_id).surface_id;
                // A host-side rejection abandons the match entirely; a rule
                // hit must not fall through to default allocation.
                host.set_surface_id(surface, surface_id).map_err(|source| {
                    AssignError::HostRejected {
                        id: surface_id,
                        source,
                    }
                })?;
                self.rules.bind(rule_id, surface.clone());
                self.registry
                    .register(identity.app_id.as_deref(), surface_id);
                tracing::info!(%surface, surface_id, "assigned id from rule");
                return Ok(AssignOutcome::Rule { surface_id });
            }
            MatchOutcome::Occupied { rule, holder } => {
                let surface_id = self.rules.rule(rule).surface_id;
                tracing::warn!(%surface, surface_id, %holder, "rule id already held by another surface");
                return Err(AssignError::RuleOccupied {
                    id: surface_id,
                    holder,
                });
            }
            MatchOutcome::NoMatch => {}
        }

        let Some(range) = self.range.as_mut() else {
            tracing::warn!(%surface, "no rule matches and default behavior is disabled");
            return Err(AssignError::NoMatch);
        };

        let Some(surface_id) = range.peek() else {
            tracing::warn!(%surface, "default id range exhausted");
            return Err(AssignError::RangeExhausted);
        };

        // Check-then-claim on the current cursor only: a surface created
        // outside the agent may already hold exactly this id.
        if let Some(holder) = host.surface_with_id(surface_id) {
            if holder != *surface {
                tracing::warn!(%surface, surface_id, %holder, "default id already claimed, configuration needs fixing");
                return Err(AssignError::DefaultIdOccupied {
                    id: surface_id,
                    holder,
                });
            }
        }

        host.set_surface_id(surface, surface_id)
            .map_err(|source| AssignError::HostRejected {
                id: surface_id,
                source,
            })?;
        range.commit();
        self.registry
            .register(identity.app_id.as_deref(), surface_id);
        tracing::info!(%surface, surface_id, "assigned id from default range");
        Ok(AssignOutcome::DefaultRange { surface_id })
    }

    /// Handle a "surface removed" notification.
    ///
    /// The host record for the surface must still be readable when this is
    /// called — unregistration needs the id the surface held at removal
    /// time.
    pub fn surface_removed(&mut self, host: &impl SurfaceHost, surface: &SurfaceHandle) {
        self.rules.release(surface);
        match host.surface_id(surface) {
            Some(surface_id) => {
                self.registry.unregister(surface_id);
                tracing::info!(%surface, surface_id, "surface removed");
            }
            None => tracing::debug!(%surface, "removed surface never held an id"),
        }
    }

    /// Tear down agent state on compositor shutdown. Fires once.
    pub fn shutdown(&mut self) {
        self.rules.clear_bindings();
        tracing::info!("id agent shut down");
    }
}
