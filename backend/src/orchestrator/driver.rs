//! Week driver - collaborators and the whole-round retry loop
//!
//! The engine itself never retries across rounds. This driver does:
//! each attempt reloads the roster and history from its collaborators, builds
//! a fresh `Round`, and runs it. A recoverable `Unmatched` failure discards
//! everything from that attempt and starts over; after a configurable number
//! of failures the persisted history is cleared to break a deadlock.
//!
//! Collaborator failures are opaque to the engine and are returned unchanged.

use crate::orchestrator::checkpoint::HistoryBook;
use crate::orchestrator::engine::{RosterEntry, Round, RoundError, RoundOutcome};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Error type returned by storage/roster collaborators
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// Collaborators
// ============================================================================

/// Supplies this week's opted-in participants
pub trait RosterSource {
    fn load_roster(&mut self) -> Result<Vec<RosterEntry>, CollaboratorError>;
}

/// Loads and persists meeting history between weeks
pub trait HistoryStore {
    fn load_history(&mut self) -> Result<HistoryBook, CollaboratorError>;
    fn save_history(&mut self, history: &HistoryBook) -> Result<(), CollaboratorError>;
    fn clear_history(&mut self) -> Result<(), CollaboratorError>;
}

/// Receives a completed round (ledger, reports, exports)
pub trait ResultSink {
    fn publish(&mut self, outcome: &RoundOutcome) -> Result<(), CollaboratorError>;
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Rounds to try before giving up on the week
    pub max_attempts: usize,

    /// Clear persisted history after this many consecutive unmatched rounds
    /// (and again after each further multiple). None never clears.
    pub clear_history_after: Option<usize>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            clear_history_after: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Collaborator(CollaboratorError),

    #[error("round aborted: {0}")]
    Round(RoundError),

    #[error("no complete matching after {attempts} attempt(s): {last}")]
    AttemptsExhausted { attempts: usize, last: RoundError },

    #[error("invalid driver config: {0}")]
    InvalidConfig(String),
}

/// A matched week and how many rounds it took
#[derive(Debug, Clone)]
pub struct WeekResult {
    pub outcome: RoundOutcome,
    pub attempts: usize,
}

// ============================================================================
// Driver
// ============================================================================

pub struct WeekDriver<R, H, S> {
    config: DriverConfig,
    roster: R,
    history: H,
    sink: S,
}

impl<R: RosterSource, H: HistoryStore, S: ResultSink> WeekDriver<R, H, S> {
    pub fn new(config: DriverConfig, roster: R, history: H, sink: S) -> Self {
        Self {
            config,
            roster,
            history,
            sink,
        }
    }

    /// Match one week, retrying whole rounds on recoverable failure
    ///
    /// On success the updated history is saved before the outcome is
    /// published. Calling this repeatedly runs consecutive weeks.
    pub fn run_week(&mut self, rng: &mut RngManager) -> Result<WeekResult, DriverError> {
        if self.config.max_attempts == 0 {
            return Err(DriverError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.config.clear_history_after == Some(0) {
            return Err(DriverError::InvalidConfig(
                "clear_history_after must be at least 1".to_string(),
            ));
        }

        let mut last = None;
        for attempt in 1..=self.config.max_attempts {
            let roster = self
                .roster
                .load_roster()
                .map_err(DriverError::Collaborator)?;
            let mut history = self
                .history
                .load_history()
                .map_err(DriverError::Collaborator)?;

            let round = Round::new(&roster, &history).map_err(DriverError::Round)?;
            match round.run(rng) {
                Ok(outcome) => {
                    history.record_round(&outcome);
                    self.history
                        .save_history(&history)
                        .map_err(DriverError::Collaborator)?;
                    self.sink
                        .publish(&outcome)
                        .map_err(DriverError::Collaborator)?;

                    info!(attempt, groups = outcome.ledger().len(), "week matched");
                    return Ok(WeekResult {
                        outcome,
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_recoverable() => {
                    warn!(attempt, error = %e, "round incomplete, retrying");
                    if let Some(threshold) = self.config.clear_history_after {
                        if attempt % threshold == 0 {
                            warn!(attempt, "clearing persisted history");
                            self.history
                                .clear_history()
                                .map_err(DriverError::Collaborator)?;
                        }
                    }
                    last = Some(e);
                }
                Err(e) => return Err(DriverError::Round(e)),
            }
        }

        match last {
            Some(last) => Err(DriverError::AttemptsExhausted {
                attempts: self.config.max_attempts,
                last,
            }),
            None => Err(DriverError::InvalidConfig(
                "no attempt was made".to_string(),
            )),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn history_store(&self) -> &H {
        &self.history
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (R, H, S) {
        (self.roster, self.history, self.sink)
    }
}

// ============================================================================
// In-memory collaborators
// ============================================================================

/// The same roster every week
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    entries: Vec<RosterEntry>,
}

impl StaticRoster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }
}

impl RosterSource for StaticRoster {
    fn load_roster(&mut self) -> Result<Vec<RosterEntry>, CollaboratorError> {
        Ok(self.entries.clone())
    }
}

/// History kept in memory; counts how often it was cleared
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    book: HistoryBook,
    clears: usize,
}

impl MemoryHistoryStore {
    pub fn new(book: HistoryBook) -> Self {
        Self { book, clears: 0 }
    }

    pub fn book(&self) -> &HistoryBook {
        &self.book
    }

    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load_history(&mut self) -> Result<HistoryBook, CollaboratorError> {
        Ok(self.book.clone())
    }

    fn save_history(&mut self, history: &HistoryBook) -> Result<(), CollaboratorError> {
        self.book = history.clone();
        Ok(())
    }

    fn clear_history(&mut self) -> Result<(), CollaboratorError> {
        self.book.clear();
        self.clears += 1;
        Ok(())
    }
}

/// Collects every published outcome
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    outcomes: Vec<RoundOutcome>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> &[RoundOutcome] {
        &self.outcomes
    }
}

impl ResultSink for MemorySink {
    fn publish(&mut self, outcome: &RoundOutcome) -> Result<(), CollaboratorError> {
        self.outcomes.push(outcome.clone());
        Ok(())
    }
}
