//! Orchestrator - round sequencing, reporting, persistence and retries
//!
//! - `engine`: builds participants and runs one round
//! - `report`: structured report input and export rows
//! - `checkpoint`: persisted history, round snapshots, digests
//! - `driver`: collaborator traits and the whole-round retry loop

pub mod checkpoint;
pub mod driver;
pub mod engine;
pub mod report;

// Re-export main types for convenience
pub use engine::{RosterEntry, Round, RoundError, RoundOutcome};
pub use report::{ExportRow, ForcedPlacement, MatchReport, UnmatchedDiagnostics};

// Re-export checkpoint and driver types
pub use checkpoint::{HistoryBook, HistoryRecord, RoundSnapshot, SnapshotError};
pub use driver::{
    CollaboratorError, DriverConfig, DriverError, HistoryStore, MemoryHistoryStore, MemorySink,
    ResultSink, RosterSource, StaticRoster, WeekDriver, WeekResult,
};
