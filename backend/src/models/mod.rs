//! Domain models for the coffee chat matcher

pub mod event;
pub mod ledger;
pub mod participant;
pub mod state;

// Re-exports
pub use event::{EventLog, RoundEvent, RoundPhase};
pub use ledger::{Group, GroupKind, LedgerError, MatchLedger, Member, Placement};
pub use participant::{Participant, ParticipantError};
pub use state::{RoundState, StateError};
