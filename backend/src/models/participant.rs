//! Participant model
//!
//! Represents one person taking part in a week's coffee chats.
//! Each participant has:
//! - An availability pool: everyone else on this week's roster
//! - A meeting history (`already_met`) carried over from previous weeks
//! - A candidate pool (`yet_to_meet`) derived from the two at week start
//! - A matched flag for the current week
//!
//! # State transitions
//!
//! ```text
//! recompute_candidates()   yet_to_meet = pool - already_met (wraps around when empty)
//! attempt_match(other)     yet_to_meet -> already_met, matched
//! rollback(other)          undoes exactly one attempt_match
//! force_place()            matched, history untouched (overflow bypass only)
//! ```
//!
//! A participant only ever mutates its own state. Pairing two participants is
//! done by calling `attempt_match` on both sides (see `matching::pairing`).

use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Violations of the participant invariants
///
/// These signal a programming defect (or corrupt persisted history) and abort
/// the round.
#[derive(Debug, Error, PartialEq)]
pub enum ParticipantError {
    #[error("{name} lists itself in its {field}")]
    SelfReference { name: String, field: &'static str },

    #[error("{name} has {other} both in already_met and yet_to_meet")]
    Overlap { name: String, other: String },

    #[error("{name} has {other} in yet_to_meet but not in its available pool")]
    NotInPool { name: String, other: String },

    #[error("{name} lists {other} more than once in its {field}")]
    Duplicate {
        name: String,
        other: String,
        field: &'static str,
    },

    #[error("{name} recorded a placement with {other} that is missing from already_met")]
    OrphanPlacement { name: String, other: String },
}

/// A person to be matched for a coffee chat
///
/// # Example
/// ```
/// use coffee_match_core::Participant;
///
/// let mut ana = Participant::new(
///     "Ana".to_string(),
///     "guid-ana".to_string(),
///     vec!["Ben".to_string(), "Cleo".to_string()],
/// );
/// ana.recompute_candidates();
/// assert_eq!(ana.yet_to_meet(), ["Ben", "Cleo"]);
///
/// assert!(ana.attempt_match("Ben"));
/// assert!(ana.is_matched());
/// assert!(ana.has_met("Ben"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Unique name within the week's roster
    name: String,

    /// Opaque identifier passed through to output (never used for matching)
    external_id: String,

    /// Everyone else available this week, in roster order
    available_pool: Vec<String>,

    /// Names met in previous weeks (and this week, once committed)
    already_met: BTreeSet<String>,

    /// Names from `available_pool` not yet met, kept in pool order
    yet_to_meet: Vec<String>,

    /// Names committed through `attempt_match` during this round
    ///
    /// `matched` is derived from this list so that a rollback restores the
    /// flag to whatever it was before the matching attempt.
    placements: Vec<String>,

    /// Set by the overflow bypass, which places without touching history
    forced: bool,
}

impl Participant {
    /// Create a participant with no meeting history
    ///
    /// `yet_to_meet` stays empty until `recompute_candidates` is called.
    pub fn new(name: String, external_id: String, available_pool: Vec<String>) -> Self {
        Self::with_history(name, external_id, available_pool, BTreeSet::new())
    }

    /// Create a participant with history loaded from a previous week
    pub fn with_history(
        name: String,
        external_id: String,
        available_pool: Vec<String>,
        already_met: BTreeSet<String>,
    ) -> Self {
        Self {
            name,
            external_id,
            available_pool,
            already_met,
            yet_to_meet: Vec::new(),
            placements: Vec::new(),
            forced: false,
        }
    }

    /// Restore a participant in an explicit state, without recomputation
    ///
    /// `yet_to_meet` is reordered to follow the pool. The result is checked
    /// against every invariant.
    ///
    /// # Example
    /// ```
    /// use coffee_match_core::Participant;
    /// use std::collections::BTreeSet;
    ///
    /// // Ana has met Ben and has nobody left to meet this week
    /// let ana = Participant::from_parts(
    ///     "Ana".to_string(),
    ///     "guid-ana".to_string(),
    ///     vec!["Ben".to_string()],
    ///     BTreeSet::from(["Ben".to_string()]),
    ///     Vec::new(),
    /// )
    /// .unwrap();
    /// assert!(ana.yet_to_meet().is_empty());
    /// ```
    pub fn from_parts(
        name: String,
        external_id: String,
        available_pool: Vec<String>,
        already_met: BTreeSet<String>,
        mut yet_to_meet: Vec<String>,
    ) -> Result<Self, ParticipantError> {
        yet_to_meet.sort_by_key(|n| pool_rank(&available_pool, n).unwrap_or(usize::MAX));

        let participant = Self {
            yet_to_meet,
            ..Self::with_history(name, external_id, available_pool, already_met)
        };
        participant.validate()?;
        Ok(participant)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn available_pool(&self) -> &[String] {
        &self.available_pool
    }

    pub fn already_met(&self) -> &BTreeSet<String> {
        &self.already_met
    }

    pub fn yet_to_meet(&self) -> &[String] {
        &self.yet_to_meet
    }

    /// Names committed this round through `attempt_match`
    pub fn placements(&self) -> &[String] {
        &self.placements
    }

    /// True once this participant has been placed in a group this round
    pub fn is_matched(&self) -> bool {
        !self.placements.is_empty() || self.forced
    }

    /// True if the placement came from the overflow bypass
    pub fn was_forced(&self) -> bool {
        self.forced
    }

    pub fn has_met(&self, other: &str) -> bool {
        self.already_met.contains(other)
    }

    /// Start a new round: derive the candidate pool from availability and history
    ///
    /// When everyone in the pool has already been met, this participant's
    /// history restarts so they remain matchable. Returns true if that reset
    /// happened. The reset is local and not coordinated with anyone else.
    pub fn recompute_candidates(&mut self) -> bool {
        self.placements.clear();
        self.forced = false;

        self.yet_to_meet = self
            .available_pool
            .iter()
            .filter(|n| !self.already_met.contains(*n))
            .cloned()
            .collect();

        if self.yet_to_meet.is_empty() && !self.available_pool.is_empty() {
            self.yet_to_meet = self.available_pool.clone();
            self.already_met.clear();
            return true;
        }
        false
    }

    /// One-sided match attempt against `other`
    ///
    /// Fails without mutating anything if `other` was already met or is not a
    /// candidate. On success `other` moves from `yet_to_meet` to `already_met`
    /// and this participant counts as matched.
    pub fn attempt_match(&mut self, other: &str) -> bool {
        if self.has_met(other) {
            return false;
        }
        let Some(pos) = self.yet_to_meet.iter().position(|n| n == other) else {
            return false;
        };

        let met = self.yet_to_meet.remove(pos);
        self.already_met.insert(met.clone());
        self.placements.push(met);
        true
    }

    /// Undo a successful `attempt_match(other)` from this round
    ///
    /// `other` goes back into `yet_to_meet` at its pool position and the
    /// matched flag returns to its previous value. A no-op if there is no such
    /// placement, so history from earlier weeks is never rewritten here.
    pub fn rollback(&mut self, other: &str) {
        let Some(pos) = self.placements.iter().rposition(|n| n == other) else {
            return;
        };

        let name = self.placements.remove(pos);
        self.already_met.remove(&name);

        let rank = pool_rank(&self.available_pool, &name);
        let at = self
            .yet_to_meet
            .iter()
            .position(|n| pool_rank(&self.available_pool, n) > rank)
            .unwrap_or(self.yet_to_meet.len());
        self.yet_to_meet.insert(at, name);
    }

    /// Mark as matched without going through the history checks
    ///
    /// Only the overflow resolver's last-resort placement uses this.
    pub fn force_place(&mut self) {
        self.forced = true;
    }

    /// Check every participant invariant
    pub fn validate(&self) -> Result<(), ParticipantError> {
        let mut pool = HashSet::new();
        for other in &self.available_pool {
            if *other == self.name {
                return Err(self.self_reference("available pool"));
            }
            if !pool.insert(other.as_str()) {
                return Err(self.duplicate(other, "available pool"));
            }
        }

        if self.already_met.contains(&self.name) {
            return Err(self.self_reference("already_met"));
        }

        let mut candidates = HashSet::new();
        for other in &self.yet_to_meet {
            if *other == self.name {
                return Err(self.self_reference("yet_to_meet"));
            }
            if !candidates.insert(other.as_str()) {
                return Err(self.duplicate(other, "yet_to_meet"));
            }
            if !pool.contains(other.as_str()) {
                return Err(ParticipantError::NotInPool {
                    name: self.name.clone(),
                    other: other.clone(),
                });
            }
            if self.already_met.contains(other) {
                return Err(ParticipantError::Overlap {
                    name: self.name.clone(),
                    other: other.clone(),
                });
            }
        }

        if let Some(other) = self.placements.iter().find(|n| !self.already_met.contains(*n)) {
            return Err(ParticipantError::OrphanPlacement {
                name: self.name.clone(),
                other: other.clone(),
            });
        }

        Ok(())
    }

    fn self_reference(&self, field: &'static str) -> ParticipantError {
        ParticipantError::SelfReference {
            name: self.name.clone(),
            field,
        }
    }

    fn duplicate(&self, other: &str, field: &'static str) -> ParticipantError {
        ParticipantError::Duplicate {
            name: self.name.clone(),
            other: other.to_string(),
            field,
        }
    }
}

/// Position of `name` in the pool; names outside the pool sort last
fn pool_rank(pool: &[String], name: &str) -> Option<usize> {
    pool.iter().position(|n| n == name)
}
