//! Checkpoint - Persisted History and Round Snapshots
//!
//! Meeting history is the only state that survives from one week to the
//! next. This module defines its persisted form and a snapshot of a finished
//! round that storage backends can write out and verify later.
//!
//! # Critical Invariants
//!
//! - **Determinism**: same seed + roster + history produce the same digest
//! - **Coverage**: every participant of a snapshot appears in exactly one group
//! - **No self-history**: nobody lists themselves as already met

use crate::models::ledger::MatchLedger;
use crate::models::participant::Participant;
use crate::orchestrator::engine::RoundOutcome;
use crate::orchestrator::report::MatchReport;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("ledger digest mismatch: expected {expected}, computed {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
}

// ============================================================================
// History
// ============================================================================

/// Persisted meeting history of one person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub name: String,
    pub external_id: String,
    #[serde(default)]
    pub already_met: Vec<String>,
}

impl From<&Participant> for HistoryRecord {
    fn from(participant: &Participant) -> Self {
        HistoryRecord {
            name: participant.name().to_string(),
            external_id: participant.external_id().to_string(),
            already_met: participant.already_met().iter().cloned().collect(),
        }
    }
}

/// Everyone's persisted history, keyed by name
///
/// Records of people who sat out a week are kept, so their history is intact
/// when they opt back in.
///
/// # Example
/// ```
/// use coffee_match_core::{HistoryBook, HistoryRecord};
///
/// let book = HistoryBook::from_records(vec![HistoryRecord {
///     name: "Ana".to_string(),
///     external_id: "guid-ana".to_string(),
///     already_met: vec!["Ben".to_string()],
/// }]);
///
/// assert!(book.already_met("Ana").unwrap().contains("Ben"));
/// assert!(book.already_met("Cleo").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<HistoryRecord>", into = "Vec<HistoryRecord>")]
pub struct HistoryBook {
    records: BTreeMap<String, HistoryRecord>,
}

impl HistoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later records with the same name replace earlier ones
    pub fn from_records(records: Vec<HistoryRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.name.clone(), record))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&HistoryRecord> {
        self.records.get(name)
    }

    pub fn already_met(&self, name: &str) -> Option<BTreeSet<String>> {
        self.records
            .get(name)
            .map(|record| record.already_met.iter().cloned().collect())
    }

    pub fn insert(&mut self, record: HistoryRecord) {
        self.records.insert(record.name.clone(), record);
    }

    /// Replace the records of everyone who took part in `outcome`
    pub fn record_round(&mut self, outcome: &RoundOutcome) {
        for record in outcome.histories() {
            self.insert(record);
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl From<Vec<HistoryRecord>> for HistoryBook {
    fn from(records: Vec<HistoryRecord>) -> Self {
        Self::from_records(records)
    }
}

impl From<HistoryBook> for Vec<HistoryRecord> {
    fn from(book: HistoryBook) -> Self {
        book.records.into_values().collect()
    }
}

// ============================================================================
// Round Snapshot
// ============================================================================

/// Everything a storage backend needs to persist a finished round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    /// Seed the round was run with (replay with the same inputs)
    pub rng_seed: u64,

    pub ledger: MatchLedger,

    /// Updated history of every participant, in roster order
    pub histories: Vec<HistoryRecord>,

    pub report: MatchReport,

    /// SHA256 of the canonical ledger JSON
    pub ledger_digest: String,
}

impl RoundSnapshot {
    pub fn capture(rng_seed: u64, outcome: &RoundOutcome) -> Result<Self, SnapshotError> {
        Ok(Self {
            rng_seed,
            ledger: outcome.ledger().clone(),
            histories: outcome.histories(),
            report: outcome.report().clone(),
            ledger_digest: compute_digest(outcome.ledger())?,
        })
    }
}

// ============================================================================
// Digest
// ============================================================================

/// Compute deterministic SHA256 hash of any serializable value
///
/// Uses canonical JSON serialization with sorted keys so that map iteration
/// order never changes the digest.
pub fn compute_digest<T: Serialize>(value: &T) -> Result<String, SnapshotError> {
    use serde_json::Value;

    let value = serde_json::to_value(value)
        .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value))
        .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation
// ============================================================================

/// Validate snapshot integrity
///
/// Checks:
/// - the stored digest matches the ledger
/// - histories and ledger cover the same people, each exactly once
/// - nobody lists themselves as already met
/// - report counts match the ledger
pub fn validate_snapshot(snapshot: &RoundSnapshot) -> Result<(), SnapshotError> {
    // 1. Digest
    let actual = compute_digest(&snapshot.ledger)?;
    if actual != snapshot.ledger_digest {
        return Err(SnapshotError::DigestMismatch {
            expected: snapshot.ledger_digest.clone(),
            actual,
        });
    }

    // 2. Coverage
    let mut seen = HashSet::new();
    for record in &snapshot.histories {
        if !seen.insert(record.name.as_str()) {
            return Err(SnapshotError::Inconsistent(format!(
                "duplicate history record for {}",
                record.name
            )));
        }
        if !snapshot.ledger.contains(&record.name) {
            return Err(SnapshotError::Inconsistent(format!(
                "{} is missing from the ledger",
                record.name
            )));
        }
        // 3. Self-history
        if record.already_met.contains(&record.name) {
            return Err(SnapshotError::Inconsistent(format!(
                "{} lists itself as already met",
                record.name
            )));
        }
    }
    if snapshot.ledger.member_count() != seen.len() {
        return Err(SnapshotError::Inconsistent(format!(
            "ledger places {} people but {} history records exist",
            snapshot.ledger.member_count(),
            seen.len()
        )));
    }

    // 4. Report counts
    let report = &snapshot.report;
    if report.participant_count != seen.len()
        || report.match_count != snapshot.ledger.len()
        || report.triple_count != snapshot.ledger.triple_count()
    {
        return Err(SnapshotError::Inconsistent(
            "report counts do not match the ledger".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_digest_deterministic() {
        #[derive(Serialize)]
        struct Sample {
            value: i32,
            name: String,
        }

        let first = Sample {
            value: 42,
            name: "test".to_string(),
        };
        let second = Sample {
            value: 42,
            name: "test".to_string(),
        };

        assert_eq!(compute_digest(&first).unwrap(), compute_digest(&second).unwrap());
    }

    #[test]
    fn test_history_book_serializes_as_list() {
        let book = HistoryBook::from_records(vec![HistoryRecord {
            name: "Ana".to_string(),
            external_id: "1".to_string(),
            already_met: vec!["Ben".to_string()],
        }]);

        let json = serde_json::to_string(&book).unwrap();
        assert_eq!(
            json,
            r#"[{"name":"Ana","external_id":"1","already_met":["Ben"]}]"#
        );

        let restored: HistoryBook = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, book);
    }
}
