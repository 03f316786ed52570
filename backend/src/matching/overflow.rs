//! Overflow resolver
//!
//! After the randomized pass some participants are still outside the ledger:
//! their candidates were exhausted, already taken, or declined. Each leftover,
//! in roster order, is placed by the first rule that applies:
//!
//! 1. **Join a candidate's pair.** Scan `yet_to_meet` for someone already in a
//!    pair whose members share no history with the leftover, and run the
//!    mutual protocol against that person. Success turns the pair into a
//!    triple.
//! 2. **Forced placement.** Attach to the first group that is still a pair,
//!    without any history check and without updating history. If there is no
//!    pair at all, seat the leftover with the next unplaced leftover (through
//!    the mutual protocol when both accept, forced otherwise).
//! 3. **Stranded.** Nothing to attach to; the participant stays unmatched and
//!    the round orchestrator reports the failure.
//!
//! Forced members are tagged `Placement::Forced` in the ledger so reports can
//! tell them apart from history-respecting placements.

use crate::matching::pairing::try_pair;
use crate::models::event::{EventLog, RoundEvent};
use crate::models::ledger::{Group, MatchLedger, Placement};
use crate::models::state::{RoundState, StateError};
use crate::orchestrator::RoundError;
use tracing::{debug, warn};

/// Place every participant missing from the ledger
///
/// Returns the names still unplaced afterwards, in roster order.
pub fn resolve_overflow(
    state: &mut RoundState,
    ledger: &mut MatchLedger,
    events: &mut EventLog,
) -> Result<Vec<String>, RoundError> {
    let leftovers = unplaced(state, ledger);
    debug!(count = leftovers.len(), "resolving overflow");

    for name in &leftovers {
        // An earlier leftover may have been seated with this one
        if ledger.contains(name) {
            continue;
        }
        if join_candidate_group(state, ledger, name, events)? {
            continue;
        }
        place_forced(state, ledger, name, &leftovers, events)?;
    }

    Ok(unplaced(state, ledger))
}

fn unplaced(state: &RoundState, ledger: &MatchLedger) -> Vec<String> {
    state
        .iter()
        .filter(|p| !ledger.contains(p.name()))
        .map(|p| p.name().to_string())
        .collect()
}

/// Rule 1: join the pair of someone the leftover still has to meet
fn join_candidate_group(
    state: &mut RoundState,
    ledger: &mut MatchLedger,
    name: &str,
    events: &mut EventLog,
) -> Result<bool, RoundError> {
    let candidates = state.require(name)?.yet_to_meet().to_vec();

    for other in &candidates {
        let Some(group) = ledger.group_of(other) else {
            continue;
        };
        if group.is_triple() || !history_clear(state, group, name)? {
            continue;
        }

        let attempt = try_pair(state, ledger, other, name, events)?;
        if attempt.is_success() && state.require(name)?.is_matched() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// True if nobody in `group` has met `name` before, in either direction
fn history_clear(state: &RoundState, group: &Group, name: &str) -> Result<bool, StateError> {
    let leftover = state.require(name)?;
    for member in group.names() {
        if leftover.has_met(member) || state.require(member)?.has_met(name) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Rules 2 and 3: last-resort placement, bypassing history
fn place_forced(
    state: &mut RoundState,
    ledger: &mut MatchLedger,
    name: &str,
    leftovers: &[String],
    events: &mut EventLog,
) -> Result<(), RoundError> {
    if let Some(group) = ledger.first_open_pair() {
        ledger.join(group, name, Placement::Forced)?;
        force(state, name)?;

        let primary = ledger.primary_of(name).unwrap_or_default().to_string();
        warn!(name, primary = %primary, "forced placement ignores meeting history");
        events.log(RoundEvent::ForcedPlacement {
            primary,
            name: name.to_string(),
        });
        return Ok(());
    }

    let partner = leftovers
        .iter()
        .find(|other| other.as_str() != name && !ledger.contains(other));

    let Some(partner) = partner else {
        warn!(name, "no group left to join");
        events.log(RoundEvent::Stranded {
            name: name.to_string(),
        });
        return Ok(());
    };

    if try_pair(state, ledger, name, partner, events)?.is_success() {
        return Ok(());
    }

    ledger.open_pair(name, partner, Placement::Forced)?;
    force(state, name)?;
    force(state, partner)?;
    warn!(first = name, second = %partner, "forced pair ignores meeting history");
    events.log(RoundEvent::ForcedPair {
        first: name.to_string(),
        second: partner.clone(),
    });
    Ok(())
}

fn force(state: &mut RoundState, name: &str) -> Result<(), StateError> {
    state
        .get_mut(name)
        .ok_or_else(|| StateError::UnknownParticipant(name.to_string()))?
        .force_place();
    Ok(())
}
