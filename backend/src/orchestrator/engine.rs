//! Round Orchestrator
//!
//! Runs one complete matching round:
//!
//! ```text
//! 1. Build participants from the roster and persisted history
//! 2. Recompute every candidate pool (history wraps around when exhausted)
//! 3. Randomized pairing pass, in roster order
//! 4. Overflow pass for anyone left outside the ledger
//! 5. Validate: invariants hold, unmatched counts agree, nobody left over
//! ```
//!
//! # Example
//!
//! ```rust
//! use coffee_match_core::{HistoryBook, RngManager, RosterEntry, Round};
//!
//! let roster: Vec<RosterEntry> = ["Ana", "Ben", "Cleo", "Dev"]
//!     .iter()
//!     .map(|n| RosterEntry::new(*n, format!("guid-{}", n)))
//!     .collect();
//!
//! let round = Round::new(&roster, &HistoryBook::new()).unwrap();
//! let outcome = round.run(&mut RngManager::new(12345)).unwrap();
//!
//! assert_eq!(outcome.ledger().len(), 2);
//! assert_eq!(outcome.report().unmatched_by_flag, 0);
//! ```
//!
//! # Determinism
//!
//! All randomness comes from the `RngManager` passed to `run`. Same roster,
//! same history and same seed give the same ledger and the same event log.
//! A round is consumed by `run`, so no ledger state survives into the next one.

use crate::matching::{find_partner, resolve_overflow};
use crate::models::event::{EventLog, RoundEvent, RoundPhase};
use crate::models::ledger::{LedgerError, MatchLedger};
use crate::models::participant::{Participant, ParticipantError};
use crate::models::state::{RoundState, StateError};
use crate::orchestrator::checkpoint::{HistoryBook, HistoryRecord};
use crate::orchestrator::report::{ExportRow, MatchReport};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Inputs
// ============================================================================

/// One opted-in person on this week's roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub external_id: String,
}

impl RosterEntry {
    pub fn new(name: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            external_id: external_id.into(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Round error types
///
/// `Unmatched` is the only recoverable kind: the caller discards the round and
/// starts a fresh one. Everything else is an invalid-state defect and aborts.
#[derive(Debug, Error, PartialEq)]
pub enum RoundError {
    #[error("{} participant(s) left unmatched: {}", .names.len(), .names.join(", "))]
    Unmatched {
        names: Vec<String>,
        report: Box<MatchReport>,
    },

    #[error("invalid participant state: {0}")]
    Participant(#[from] ParticipantError),

    #[error("invalid ledger state: {0}")]
    Ledger(#[from] LedgerError),

    #[error("invalid round state: {0}")]
    State(#[from] StateError),

    #[error("unmatched counts disagree: {by_flag} by matched flag, {by_count} from the ledger")]
    CountMismatch { by_flag: usize, by_count: i64 },
}

impl RoundError {
    /// True if retrying the whole round may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RoundError::Unmatched { .. })
    }
}

// ============================================================================
// Round
// ============================================================================

/// A round ready to run: participants built, candidate pools computed
#[derive(Debug, Clone)]
pub struct Round {
    state: RoundState,
    events: EventLog,
}

impl Round {
    /// Build the participant set for this week
    ///
    /// Each participant's pool is everyone else on the roster, in roster
    /// order. Missing history means nobody has been met yet. History entries
    /// for people not on this roster are kept.
    pub fn new(roster: &[RosterEntry], history: &HistoryBook) -> Result<Self, RoundError> {
        let participants = roster
            .iter()
            .map(|entry| {
                let pool = roster
                    .iter()
                    .filter(|other| other.name != entry.name)
                    .map(|other| other.name.clone())
                    .collect();
                Participant::with_history(
                    entry.name.clone(),
                    entry.external_id.clone(),
                    pool,
                    history.already_met(&entry.name).unwrap_or_default(),
                )
            })
            .collect();

        let mut state = RoundState::new(participants)?;
        let mut events = EventLog::new();

        for participant in state.iter_mut() {
            if participant.recompute_candidates() {
                warn!(name = participant.name(), "met everyone available, history restarts");
                events.log(RoundEvent::HistoryReset {
                    name: participant.name().to_string(),
                });
            }
            participant.validate()?;
        }

        debug!(participants = state.len(), "round prepared");
        Ok(Self { state, events })
    }

    /// Use participants exactly as given, without recomputing candidates
    pub fn from_participants(participants: Vec<Participant>) -> Result<Self, RoundError> {
        let state = RoundState::new(participants)?;
        for participant in state.iter() {
            participant.validate()?;
        }
        Ok(Self {
            state,
            events: EventLog::new(),
        })
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Run the pairing pass, the overflow pass, and validation
    ///
    /// # Errors
    ///
    /// * `RoundError::Unmatched` - someone could not be placed (recoverable)
    /// * any other variant - an invariant was violated
    pub fn run(self, rng: &mut RngManager) -> Result<RoundOutcome, RoundError> {
        let Round {
            mut state,
            mut events,
        } = self;
        let mut ledger = MatchLedger::new();

        events.enter(RoundPhase::Pairing);
        for name in state.names() {
            if ledger.contains(&name) {
                continue;
            }
            find_partner(&mut state, &mut ledger, &name, rng, &mut events)?;
        }

        if ledger.member_count() < state.len() {
            events.enter(RoundPhase::Overflow);
            resolve_overflow(&mut state, &mut ledger, &mut events)?;
        }

        for participant in state.iter() {
            participant.validate()?;
        }

        let report = MatchReport::build(&state, &ledger);
        if !report.counts_agree() {
            return Err(RoundError::CountMismatch {
                by_flag: report.unmatched_by_flag,
                by_count: report.unmatched_by_count,
            });
        }

        let unmatched: Vec<String> = state
            .unmatched(&ledger)
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        if !unmatched.is_empty() {
            warn!(unmatched = ?unmatched, "round incomplete");
            return Err(RoundError::Unmatched {
                names: unmatched,
                report: Box::new(report),
            });
        }

        info!(
            participants = report.participant_count,
            groups = report.match_count,
            triples = report.triple_count,
            forced = report.forced_placements.len(),
            "round complete"
        );
        Ok(RoundOutcome {
            state,
            ledger,
            events,
            report,
        })
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// A completed round, handed to persistence and reporting
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    state: RoundState,
    ledger: MatchLedger,
    events: EventLog,
    report: MatchReport,
}

impl RoundOutcome {
    pub fn ledger(&self) -> &MatchLedger {
        &self.ledger
    }

    pub fn participants(&self) -> &RoundState {
        &self.state
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn report(&self) -> &MatchReport {
        &self.report
    }

    /// Updated meeting history of every participant, in roster order
    pub fn histories(&self) -> Vec<HistoryRecord> {
        self.state.iter().map(HistoryRecord::from).collect()
    }

    /// One flat row per group, with external ids alongside names
    pub fn export_rows(&self) -> Vec<ExportRow> {
        self.ledger
            .groups()
            .iter()
            .map(|group| ExportRow::from_group(group, &self.state))
            .collect()
    }
}
