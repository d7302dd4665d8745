//! Ordered rule database and rule-to-surface binding relation.
//!
//! Rules are matched in declaration order against the identity snapshot of a
//! new surface; the first rule whose set patterns all equal-match wins.
//! Declaration order is the deliberate tie-break for overlapping
//! configurations. A matched rule that is already occupied by a different
//! live surface reports a collision instead of a match — the engine must not
//! fall through to later rules or to default allocation in that case.
//!
//! Occupancy is tracked as an explicit `RuleId -> SurfaceHandle` relation,
//! cleared on surface removal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::SurfaceIdentity;
use crate::range::DefaultRange;
use crate::types::SurfaceHandle;

// ─── Rule ─────────────────────────────────────────────────────────

/// One configured matching record.
///
/// An unset pattern is a wildcard; a set pattern requires the corresponding
/// identity field to be present and byte-equal (case-sensitive). Matching is
/// a fixed two-attribute equality scheme — extend it by adding attributes
/// here and in [`Rule::matches`], not by generalizing the scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub surface_id: u32,
    pub app_id: Option<String>,
    pub title: Option<String>,
}

impl Rule {
    fn matches(&self, identity: &SurfaceIdentity) -> bool {
        pattern_matches(self.app_id.as_deref(), identity.app_id.as_deref())
            && pattern_matches(self.title.as_deref(), identity.title.as_deref())
    }
}

fn pattern_matches(pattern: Option<&str>, value: Option<&str>) -> bool {
    match pattern {
        None => true,
        Some(pattern) => value == Some(pattern),
    }
}

/// Position of a rule in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(usize);

impl RuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Result of a rule lookup for one identity snapshot.
///
/// `Occupied` is distinct from `NoMatch` on purpose: an occupied rule is a
/// collision the engine must surface as a terminal failure, while a plain
/// miss may fall through to default allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// First declared rule whose set patterns all match.
    Matched(RuleId),
    /// The first matching rule's id is held by a different live surface.
    Occupied { rule: RuleId, holder: SurfaceHandle },
    /// No rule matches this identity.
    NoMatch,
}

// ─── Load Errors ──────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleLoadError {
    #[error("rule {index}: surface-id {surface_id} duplicates an earlier rule")]
    DuplicateSurfaceId { index: usize, surface_id: u32 },

    #[error(
        "rule {index}: surface-id {surface_id} falls inside the default range [{start}, {max})"
    )]
    IdInDefaultRange {
        index: usize,
        surface_id: u32,
        start: u32,
        max: u32,
    },

    #[error("rule {index}: neither app-id nor title is set")]
    MissingPatterns { index: usize },
}

// ─── Rule Store ───────────────────────────────────────────────────

/// The validated, ordered rule set plus the live occupancy relation.
#[derive(Debug, Default)]
pub struct RuleStore {
    rules: Vec<Rule>,
    bound: HashMap<RuleId, SurfaceHandle>,
}

impl RuleStore {
    /// Validate and accept a full rule set atomically.
    ///
    /// The whole load is rejected on the first violation: a rule with no
    /// patterns, a duplicate surface id, or a surface id inside the reserved
    /// default range. On error no store exists — there is no partially
    /// loaded state.
    pub fn load(rules: Vec<Rule>, reserved: Option<&DefaultRange>) -> Result<Self, RuleLoadError> {
        for (index, rule) in rules.iter().enumerate() {
            if rule.app_id.is_none() && rule.title.is_none() {
                return Err(RuleLoadError::MissingPatterns { index });
            }

            if let Some(range) = reserved {
                if range.contains(rule.surface_id) {
                    return Err(RuleLoadError::IdInDefaultRange {
                        index,
                        surface_id: rule.surface_id,
                        start: range.start(),
                        max: range.max(),
                    });
                }
            }

            if rules[..index].iter().any(|r| r.surface_id == rule.surface_id) {
                return Err(RuleLoadError::DuplicateSurfaceId {
                    index,
                    surface_id: rule.surface_id,
                });
            }
        }

        Ok(Self {
            rules,
            bound: HashMap::new(),
        })
    }

    /// Look up the first declared rule whose set patterns all match
    /// `identity`.
    ///
    /// Later rules are never consulted once one matches: if the winner's id
    /// is currently held by a live surface other than `claimant`, the lookup
    /// reports the collision instead of scanning on.
    pub fn find_match(
        &self,
        identity: &SurfaceIdentity,
        claimant: &SurfaceHandle,
    ) -> MatchOutcome {
        let Some((index, rule)) = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(identity))
        else {
            return MatchOutcome::NoMatch;
        };
        let id = RuleId(index);

        if let Some(holder) = self.bound.get(&id) {
            if holder != claimant {
                tracing::debug!(
                    surface_id = rule.surface_id,
                    holder = %holder,
                    "matching rule already occupied by another surface"
                );
                return MatchOutcome::Occupied {
                    rule: id,
                    holder: holder.clone(),
                };
            }
        }

        MatchOutcome::Matched(id)
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    /// Record that `surface` now holds the id of rule `id`.
    pub fn bind(&mut self, id: RuleId, surface: SurfaceHandle) {
        self.bound.insert(id, surface);
    }

    /// Clear whichever rule currently references `surface`. Idempotent.
    pub fn release(&mut self, surface: &SurfaceHandle) -> Option<RuleId> {
        let id = self
            .bound
            .iter()
            .find_map(|(id, holder)| (holder == surface).then_some(*id))?;
        self.bound.remove(&id);
        Some(id)
    }

    pub fn bound_surface(&self, id: RuleId) -> Option<&SurfaceHandle> {
        self.bound.get(&id)
    }

    /// Drop all occupancy state. Used at teardown.
    pub fn clear_bindings(&mut self) {
        self.bound.clear();
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, rule)| (RuleId(index), rule))
    }
}
