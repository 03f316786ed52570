//! Tests for persisted history and round snapshots

use coffee_match_core::orchestrator::checkpoint::{compute_digest, validate_snapshot};
use coffee_match_core::{
    HistoryBook, HistoryRecord, MatchLedger, RngManager, RosterEntry, Round, RoundOutcome,
    RoundSnapshot, SnapshotError,
};

fn roster(names: &[&str]) -> Vec<RosterEntry> {
    names
        .iter()
        .map(|n| RosterEntry::new(*n, format!("guid-{}", n)))
        .collect()
}

fn run_round(names: &[&str], seed: u64) -> RoundOutcome {
    Round::new(&roster(names), &HistoryBook::new())
        .unwrap()
        .run(&mut RngManager::new(seed))
        .unwrap()
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_capture_and_validate() {
    let outcome = run_round(&["A", "B", "C", "D", "E"], 12345);
    let snapshot = RoundSnapshot::capture(12345, &outcome).unwrap();

    assert_eq!(snapshot.rng_seed, 12345);
    assert_eq!(snapshot.histories.len(), 5);
    assert_eq!(snapshot.ledger_digest.len(), 64, "hex SHA256");
    assert!(validate_snapshot(&snapshot).is_ok());
}

#[test]
fn test_same_seed_same_digest() {
    let first = RoundSnapshot::capture(7, &run_round(&["A", "B", "C", "D"], 7)).unwrap();
    let second = RoundSnapshot::capture(7, &run_round(&["A", "B", "C", "D"], 7)).unwrap();

    assert_eq!(first.ledger_digest, second.ledger_digest);
    assert_eq!(first, second);
}

#[test]
fn test_tampered_ledger_detected() {
    let outcome = run_round(&["A", "B", "C", "D"], 99);
    let mut snapshot = RoundSnapshot::capture(99, &outcome).unwrap();

    // Swap in a different, still well-formed grouping
    let mut other = MatchLedger::new();
    other
        .open_pair("D", "C", coffee_match_core::Placement::Mutual)
        .unwrap();
    other
        .open_pair("B", "A", coffee_match_core::Placement::Mutual)
        .unwrap();
    snapshot.ledger = other;

    assert!(matches!(
        validate_snapshot(&snapshot),
        Err(SnapshotError::DigestMismatch { .. })
    ));
}

#[test]
fn test_missing_history_record_detected() {
    let outcome = run_round(&["A", "B", "C", "D"], 5);
    let mut snapshot = RoundSnapshot::capture(5, &outcome).unwrap();
    snapshot.histories.pop();

    assert!(matches!(
        validate_snapshot(&snapshot),
        Err(SnapshotError::Inconsistent(_))
    ));
}

#[test]
fn test_self_history_detected() {
    let outcome = run_round(&["A", "B"], 5);
    let mut snapshot = RoundSnapshot::capture(5, &outcome).unwrap();
    snapshot.histories[0].already_met.push("A".to_string());

    let err = validate_snapshot(&snapshot).unwrap_err();
    assert_eq!(
        err,
        SnapshotError::Inconsistent("A lists itself as already met".to_string())
    );
}

#[test]
fn test_snapshot_json_round_trip() {
    let outcome = run_round(&["A", "B", "C"], 1);
    let snapshot = RoundSnapshot::capture(1, &outcome).unwrap();

    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: RoundSnapshot = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, snapshot);
    assert!(validate_snapshot(&restored).is_ok());
}

#[test]
fn test_digest_ignores_field_order() {
    let a: serde_json::Value = serde_json::from_str(r#"{"x":1,"y":[{"b":2,"a":1}]}"#).unwrap();
    let b: serde_json::Value = serde_json::from_str(r#"{"y":[{"a":1,"b":2}],"x":1}"#).unwrap();

    assert_eq!(compute_digest(&a).unwrap(), compute_digest(&b).unwrap());
}

// ============================================================================
// History book
// ============================================================================

#[test]
fn test_record_round_updates_participants_only() {
    let mut book = HistoryBook::from_records(vec![HistoryRecord {
        name: "Away".to_string(),
        external_id: "guid-Away".to_string(),
        already_met: vec!["A".to_string()],
    }]);

    let outcome = run_round(&["A", "B"], 3);
    book.record_round(&outcome);

    assert_eq!(book.len(), 3);
    assert_eq!(book.get("Away").unwrap().already_met, vec!["A".to_string()]);
    assert_eq!(book.get("A").unwrap().already_met, vec!["B".to_string()]);
    assert_eq!(book.get("B").unwrap().external_id, "guid-B");
}

#[test]
fn test_later_records_replace_earlier() {
    let book = HistoryBook::from_records(vec![
        HistoryRecord {
            name: "A".to_string(),
            external_id: "1".to_string(),
            already_met: vec!["B".to_string()],
        },
        HistoryRecord {
            name: "A".to_string(),
            external_id: "2".to_string(),
            already_met: vec![],
        },
    ]);

    assert_eq!(book.len(), 1);
    assert_eq!(book.get("A").unwrap().external_id, "2");
}

#[test]
fn test_history_record_missing_list_defaults_empty() {
    let book: HistoryBook =
        serde_json::from_str(r#"[{"name":"A","external_id":"1"}]"#).unwrap();

    assert_eq!(book.already_met("A"), Some(Default::default()));
}
