//! Matching engine
//!
//! - **pairing**: the mutual pairing primitive and the randomized partner search
//! - **overflow**: folds leftovers into existing groups after the main pass
//!
//! Both operate on a `RoundState` and a `MatchLedger` owned by the round
//! orchestrator, and record every decision in the round's `EventLog`.

pub mod overflow;
pub mod pairing;

pub use overflow::resolve_overflow;
pub use pairing::{find_partner, try_pair, PairAttempt};
