//! Pairing engine
//!
//! Two layers:
//!
//! 1. `try_pair`: the mutual pairing primitive. Both participants must
//!    independently accept each other as a not-yet-met candidate, or neither
//!    side is committed.
//! 2. `find_partner`: the randomized search for one participant. Candidates
//!    are drawn uniformly from the untried part of `yet_to_meet`; the search
//!    ends after the first mutual attempt, successful or not, or once every
//!    candidate has been tried. It therefore makes at most `|yet_to_meet|`
//!    draws.
//!
//! A failed search is not retried here. The next top-level pass (the overflow
//! resolver, or a whole new round) is the retry mechanism.

use crate::models::event::{EventLog, RoundEvent};
use crate::models::ledger::{LedgerError, MatchLedger, Placement};
use crate::models::state::RoundState;
use crate::orchestrator::RoundError;
use crate::rng::RngManager;
use tracing::debug;

/// Outcome of one mutual pairing attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairAttempt {
    /// A new pair was opened at this group index
    Opened { group: usize },

    /// An existing pair at this group index became a triple
    Joined { group: usize },

    /// `by` did not accept the other side; nothing was committed
    Declined { by: String },

    /// Both sides accepted but the group was already a triple; rolled back
    GroupFull { primary: String },
}

impl PairAttempt {
    pub fn is_success(&self) -> bool {
        matches!(self, PairAttempt::Opened { .. } | PairAttempt::Joined { .. })
    }
}

/// Pair `first` with `second`, recording the result in the ledger
///
/// 1. `first` must accept `second`, otherwise nothing changes.
/// 2. `second` must accept `first`, otherwise `first` is rolled back.
/// 3. If neither is placed yet, a new pair opens with `first` as primary.
///    If one of them is already in a pair, the other joins that group as the
///    third member. If that group is already a triple, both one-sided
///    commitments are rolled back and the attempt fails.
pub fn try_pair(
    state: &mut RoundState,
    ledger: &mut MatchLedger,
    first: &str,
    second: &str,
    events: &mut EventLog,
) -> Result<PairAttempt, RoundError> {
    let (p1, p2) = state.pair_mut(first, second)?;

    if !p1.attempt_match(second) {
        debug!(name = first, candidate = second, "declined");
        events.log(RoundEvent::Declined {
            name: first.to_string(),
            candidate: second.to_string(),
        });
        return Ok(PairAttempt::Declined {
            by: first.to_string(),
        });
    }

    if !p2.attempt_match(first) {
        p1.rollback(second);
        debug!(name = second, candidate = first, "declined");
        events.log(RoundEvent::Declined {
            name: second.to_string(),
            candidate: first.to_string(),
        });
        return Ok(PairAttempt::Declined {
            by: second.to_string(),
        });
    }

    let (group, joiner) = match (ledger.group_index(first), ledger.group_index(second)) {
        (None, None) => {
            let group = ledger.open_pair(first, second, Placement::Mutual)?;
            debug!(primary = first, partner = second, "paired");
            events.log(RoundEvent::Paired {
                primary: first.to_string(),
                partner: second.to_string(),
            });
            return Ok(PairAttempt::Opened { group });
        }
        (Some(group), None) => (group, second),
        (None, Some(group)) => (group, first),
        (Some(_), Some(_)) => {
            p1.rollback(second);
            p2.rollback(first);
            let primary = ledger.primary_of(second).unwrap_or_default().to_string();
            return Err(LedgerError::AlreadyPlaced {
                name: second.to_string(),
                primary,
            }
            .into());
        }
    };

    let target = ledger.group(group).ok_or(LedgerError::UnknownGroup(group))?;
    let primary = target.primary().to_string();

    if target.is_triple() {
        p1.rollback(second);
        p2.rollback(first);
        debug!(primary = %primary, name = joiner, "group already a triple");
        events.log(RoundEvent::GroupFull {
            primary: primary.clone(),
            name: joiner.to_string(),
        });
        return Ok(PairAttempt::GroupFull { primary });
    }

    ledger.join(group, joiner, Placement::Mutual)?;
    debug!(primary = %primary, name = joiner, "joined as third member");
    events.log(RoundEvent::Joined {
        primary,
        name: joiner.to_string(),
    });
    Ok(PairAttempt::Joined { group })
}

/// Randomized partner search for `name`
///
/// Returns true if `name` is in the ledger afterwards. Candidates that are
/// already placed are skipped without a pairing attempt. The first mutual
/// attempt ends the search either way.
///
/// # Errors
///
/// A candidate that is not part of the round is an invalid-state error.
pub fn find_partner(
    state: &mut RoundState,
    ledger: &mut MatchLedger,
    name: &str,
    rng: &mut RngManager,
    events: &mut EventLog,
) -> Result<bool, RoundError> {
    if ledger.contains(name) {
        return Ok(true);
    }

    let candidates = state.require(name)?.yet_to_meet().to_vec();
    let mut untried: Vec<usize> = (0..candidates.len()).collect();

    while !untried.is_empty() {
        let slot = rng.index(untried.len());
        let candidate = &candidates[untried.swap_remove(slot)];
        state.require(candidate)?;

        if ledger.contains(candidate) {
            continue;
        }

        let attempt = try_pair(state, ledger, name, candidate, events)?;
        return Ok(attempt.is_success());
    }

    debug!(name, tried = candidates.len(), "no candidate left");
    events.log(RoundEvent::CandidatesExhausted {
        name: name.to_string(),
        tried: candidates.len(),
    });
    Ok(false)
}
