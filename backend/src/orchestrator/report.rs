//! Match report
//!
//! Structured input for whatever renders the weekly report. Besides the
//! headline counts it carries two independently computed unmatched counts:
//!
//! - `unmatched_by_flag`: participants whose matched flag is false
//! - `unmatched_by_count`: participants − 2 × groups − triples, from the ledger
//!
//! A pair accounts for 2 people and a triple for 3 = 2 + 1, so the two counts
//! agree whenever the flags and the ledger agree. The round orchestrator
//! treats disagreement as an invalid state.

use crate::models::ledger::{Group, MatchLedger};
use crate::models::state::RoundState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedPlacement {
    /// Primary of the group the participant was attached to
    pub primary: String,
    pub name: String,
}

/// Residual state of someone who could not be placed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedDiagnostics {
    pub yet_to_meet: Vec<String>,
    pub already_met: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub participant_count: usize,

    /// Number of groups, pairs and triples alike
    pub match_count: usize,

    pub triple_count: usize,

    pub unmatched_by_flag: usize,

    /// Signed so that an inconsistent ledger shows up instead of wrapping
    pub unmatched_by_count: i64,

    /// Placements that bypassed meeting history
    pub forced_placements: Vec<ForcedPlacement>,

    /// Unmatched participants (flag unset or absent from the ledger)
    pub unmatched: BTreeMap<String, UnmatchedDiagnostics>,
}

impl MatchReport {
    pub fn build(state: &RoundState, ledger: &MatchLedger) -> Self {
        let participant_count = state.len();
        let match_count = ledger.len();
        let triple_count = ledger.triple_count();

        let unmatched_by_flag = state.iter().filter(|p| !p.is_matched()).count();
        let unmatched_by_count =
            participant_count as i64 - 2 * match_count as i64 - triple_count as i64;

        let forced_placements = ledger
            .forced_placements()
            .into_iter()
            .map(|(primary, name)| ForcedPlacement { primary, name })
            .collect();

        let unmatched = state
            .unmatched(ledger)
            .into_iter()
            .map(|p| {
                (
                    p.name().to_string(),
                    UnmatchedDiagnostics {
                        yet_to_meet: p.yet_to_meet().to_vec(),
                        already_met: p.already_met().iter().cloned().collect(),
                    },
                )
            })
            .collect();

        Self {
            participant_count,
            match_count,
            triple_count,
            unmatched_by_flag,
            unmatched_by_count,
            forced_placements,
            unmatched,
        }
    }

    /// The two unmatched counts agree
    pub fn counts_agree(&self) -> bool {
        self.unmatched_by_flag as i64 == self.unmatched_by_count
    }

    pub fn pair_count(&self) -> usize {
        self.match_count - self.triple_count
    }

    pub fn has_forced_placements(&self) -> bool {
        !self.forced_placements.is_empty()
    }
}

/// One group flattened for spreadsheet-style export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub participant_a: String,
    pub id_a: String,
    pub participant_b: String,
    pub id_b: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_c: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_c: Option<String>,
}

impl ExportRow {
    pub fn from_group(group: &Group, state: &RoundState) -> Self {
        let external_id = |name: &str| {
            state
                .get(name)
                .map(|p| p.external_id().to_string())
                .unwrap_or_default()
        };
        let mut names = group.names();
        let a = names.next().unwrap_or_default().to_string();
        let b = names.next().unwrap_or_default().to_string();
        let c = names.next().map(str::to_string);

        Self {
            id_a: external_id(&a),
            id_b: external_id(&b),
            id_c: c.as_deref().map(external_id),
            participant_a: a,
            participant_b: b,
            participant_c: c,
        }
    }
}
