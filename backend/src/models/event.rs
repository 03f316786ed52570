//! Event logging for round replay and diagnostics.
//!
//! Every decision the matching engine takes is recorded as a `RoundEvent`, in
//! the order it happened. Events enable:
//! - Deterministic replay checks (same seed → same event sequence)
//! - Debugging (why was someone left over, who declined whom)
//! - Auditing (which placements bypassed the meeting history)
//!
//! # Event Types
//!
//! Each event is stamped with the round phase that was current when it was
//! logged (`EventLog::enter` switches phases):
//! - **Setup**: history wraparound at week start
//! - **Pairing**: the randomized pass (pairs opened, declines, exhausted pools)
//! - **Overflow**: the leftover pass (triples, declines, forced placements,
//!   stranded participants)
//!
//! # Example
//!
//! ```rust
//! use coffee_match_core::models::{EventLog, RoundEvent, RoundPhase};
//!
//! let mut log = EventLog::new();
//! log.enter(RoundPhase::Pairing);
//! log.log(RoundEvent::Paired {
//!     primary: "Ana".to_string(),
//!     partner: "Ben".to_string(),
//! });
//!
//! assert_eq!(log.phase_of(0), Some(RoundPhase::Pairing));
//! assert_eq!(log.events_for("Ben").len(), 1);
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    #[default]
    Setup,
    Pairing,
    Overflow,
}

/// Round event capturing a matching decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoundEvent {
    /// Participant had met everyone available; history restarted
    HistoryReset { name: String },

    /// New pair opened through the mutual protocol
    Paired { primary: String, partner: String },

    /// Pair grew into a triple through the mutual protocol
    Joined { primary: String, name: String },

    /// One side refused the other (already met or not a candidate)
    Declined { name: String, candidate: String },

    /// Both sides agreed but the target group was already a triple
    GroupFull { primary: String, name: String },

    /// Every candidate was tried or already placed
    CandidatesExhausted { name: String, tried: usize },

    /// Overflow bypass attached a participant to an existing pair
    ForcedPlacement { primary: String, name: String },

    /// Overflow bypass seated two leftovers together
    ForcedPair { first: String, second: String },

    /// Nowhere left to place this participant
    Stranded { name: String },
}

impl RoundEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            RoundEvent::HistoryReset { .. } => "HistoryReset",
            RoundEvent::Paired { .. } => "Paired",
            RoundEvent::Joined { .. } => "Joined",
            RoundEvent::Declined { .. } => "Declined",
            RoundEvent::GroupFull { .. } => "GroupFull",
            RoundEvent::CandidatesExhausted { .. } => "CandidatesExhausted",
            RoundEvent::ForcedPlacement { .. } => "ForcedPlacement",
            RoundEvent::ForcedPair { .. } => "ForcedPair",
            RoundEvent::Stranded { .. } => "Stranded",
        }
    }

    /// Names this event is about
    pub fn names(&self) -> Vec<&str> {
        match self {
            RoundEvent::HistoryReset { name }
            | RoundEvent::CandidatesExhausted { name, .. }
            | RoundEvent::Stranded { name } => vec![name.as_str()],
            RoundEvent::Paired { primary, partner } => vec![primary.as_str(), partner.as_str()],
            RoundEvent::Joined { primary, name }
            | RoundEvent::GroupFull { primary, name }
            | RoundEvent::ForcedPlacement { primary, name } => vec![primary.as_str(), name.as_str()],
            RoundEvent::Declined { name, candidate } => vec![name.as_str(), candidate.as_str()],
            RoundEvent::ForcedPair { first, second } => vec![first.as_str(), second.as_str()],
        }
    }

    /// True for placements that skipped the history checks
    pub fn is_forced(&self) -> bool {
        matches!(
            self,
            RoundEvent::ForcedPlacement { .. } | RoundEvent::ForcedPair { .. }
        )
    }
}

/// Ordered event log for one round
///
/// `phases[i]` is the phase `events[i]` was logged in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<RoundEvent>,
    phases: Vec<RoundPhase>,
    #[serde(skip)]
    current: RoundPhase,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp every following event with `phase`
    pub fn enter(&mut self, phase: RoundPhase) {
        self.current = phase;
    }

    pub fn current_phase(&self) -> RoundPhase {
        self.current
    }

    pub fn log(&mut self, event: RoundEvent) {
        self.events.push(event);
        self.phases.push(self.current);
    }

    pub fn phase_of(&self, index: usize) -> Option<RoundPhase> {
        self.phases.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[RoundEvent] {
        &self.events
    }

    pub fn events_in_phase(&self, phase: RoundPhase) -> Vec<&RoundEvent> {
        self.events
            .iter()
            .zip(&self.phases)
            .filter(|(_, p)| **p == phase)
            .map(|(e, _)| e)
            .collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&RoundEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Events mentioning a participant
    pub fn events_for(&self, name: &str) -> Vec<&RoundEvent> {
        self.events
            .iter()
            .filter(|e| e.names().contains(&name))
            .collect()
    }

    pub fn forced(&self) -> Vec<&RoundEvent> {
        self.events.iter().filter(|e| e.is_forced()).collect()
    }
}
