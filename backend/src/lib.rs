//! Coffee Chat Matcher - Core Engine
//!
//! Pairs members of a recurring social group into weekly meeting groups of
//! two (occasionally three), never repeating a meeting that history already
//! records, while tolerating odd head counts and exhausted histories.
//!
//! # Architecture
//!
//! - **models**: Domain types (Participant, MatchLedger, RoundState, EventLog)
//! - **matching**: Mutual pairing, randomized partner search, overflow resolver
//! - **orchestrator**: Round sequencing, reports, checkpoints, retry driver
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Nobody is in `already_met` and `yet_to_meet` at the same time
//! 2. All randomness is deterministic (seeded RNG, injected by the caller)
//! 3. A pairing is committed on both sides or on neither

// Module declarations
pub mod matching;
pub mod models;
pub mod orchestrator;
pub mod rng;

// Re-exports for convenience
pub use matching::{find_partner, resolve_overflow, try_pair, PairAttempt};
pub use models::{
    event::{EventLog, RoundEvent, RoundPhase},
    ledger::{Group, GroupKind, LedgerError, MatchLedger, Member, Placement},
    participant::{Participant, ParticipantError},
    state::{RoundState, StateError},
};
pub use orchestrator::{
    CollaboratorError, DriverConfig, DriverError, ExportRow, HistoryBook, HistoryRecord,
    HistoryStore, MatchReport, MemoryHistoryStore, MemorySink, ResultSink, RosterEntry,
    RosterSource, Round, RoundError, RoundOutcome, RoundSnapshot, SnapshotError, StaticRoster,
    WeekDriver, WeekResult,
};
pub use rng::RngManager;
