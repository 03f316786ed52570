//! End-to-end scenarios for a single matching round
//!
//! These run the full pipeline (setup, pairing pass, overflow pass,
//! validation) against small rosters across many seeds.

use coffee_match_core::{
    HistoryBook, HistoryRecord, Participant, ParticipantError, RngManager, RosterEntry, Round,
    RoundError, RoundEvent, RoundPhase, StateError,
};
use std::collections::BTreeSet;

fn roster(names: &[&str]) -> Vec<RosterEntry> {
    names
        .iter()
        .map(|n| RosterEntry::new(*n, format!("guid-{}", n)))
        .collect()
}

fn history(entries: &[(&str, &[&str])]) -> HistoryBook {
    HistoryBook::from_records(
        entries
            .iter()
            .map(|(name, met)| HistoryRecord {
                name: name.to_string(),
                external_id: format!("guid-{}", name),
                already_met: met.iter().map(|s| s.to_string()).collect(),
            })
            .collect(),
    )
}

// ============================================================================
// Successful rounds
// ============================================================================

#[test]
fn test_four_fresh_participants_form_two_pairs() {
    for seed in 0..200 {
        let round = Round::new(&roster(&["A", "B", "C", "D"]), &HistoryBook::new()).unwrap();
        let outcome = round.run(&mut RngManager::new(seed)).unwrap();

        let ledger = outcome.ledger();
        assert_eq!(ledger.len(), 2, "seed {}", seed);
        assert_eq!(ledger.pair_count(), 2);
        assert_eq!(ledger.member_count(), 4);
        assert!(ledger.forced_placements().is_empty());
        assert!(outcome.events().forced().is_empty());

        for group in ledger.groups() {
            let names: Vec<&str> = group.names().collect();
            let a = outcome.participants().get(names[0]).unwrap();
            let b = outcome.participants().get(names[1]).unwrap();
            assert!(a.has_met(names[1]));
            assert!(b.has_met(names[0]));
        }
    }
}

#[test]
fn test_five_fresh_participants_form_pair_and_triple() {
    for seed in 0..200 {
        let round =
            Round::new(&roster(&["A", "B", "C", "D", "E"]), &HistoryBook::new()).unwrap();
        let outcome = round.run(&mut RngManager::new(seed)).unwrap();

        let report = outcome.report();
        assert_eq!(report.participant_count, 5);
        assert_eq!(report.match_count, 2, "seed {}", seed);
        assert_eq!(report.triple_count, 1);
        assert_eq!(report.pair_count(), 1);
        assert_eq!(report.unmatched_by_flag, 0);
        assert_eq!(report.unmatched_by_count, 0);
        assert!(!report.has_forced_placements());
        assert_eq!(
            outcome.events().events_in_phase(RoundPhase::Overflow).len(),
            1,
            "one leftover joins a pair"
        );
    }
}

#[test]
fn test_three_participants_form_one_triple() {
    for seed in 0..50 {
        let round = Round::new(&roster(&["A", "B", "C"]), &HistoryBook::new()).unwrap();
        let outcome = round.run(&mut RngManager::new(seed)).unwrap();

        assert_eq!(outcome.ledger().len(), 1);
        assert!(outcome.ledger().groups()[0].is_triple());
    }
}

#[test]
fn test_exhausted_history_wraps_around() {
    let book = history(&[("A", &["B"]), ("B", &["A"])]);
    let outcome = Round::new(&roster(&["A", "B"]), &book)
        .unwrap()
        .run(&mut RngManager::new(7))
        .unwrap();

    assert_eq!(outcome.events().events_of_type("HistoryReset").len(), 2);
    assert!(outcome.ledger().forced_placements().is_empty());
    for record in outcome.histories() {
        assert_eq!(record.already_met.len(), 1);
    }
}

#[test]
fn test_two_participants_who_met_get_forced_pair() {
    // State built directly so no history reset happens
    let participants = vec![
        Participant::from_parts(
            "A".to_string(),
            "guid-A".to_string(),
            vec!["B".to_string()],
            ["B".to_string()].into_iter().collect(),
            vec![],
        )
        .unwrap(),
        Participant::from_parts(
            "B".to_string(),
            "guid-B".to_string(),
            vec!["A".to_string()],
            ["A".to_string()].into_iter().collect(),
            vec![],
        )
        .unwrap(),
    ];

    let outcome = Round::from_participants(participants)
        .unwrap()
        .run(&mut RngManager::new(1))
        .unwrap();

    let report = outcome.report();
    assert_eq!(report.match_count, 1);
    assert_eq!(report.unmatched_by_flag, 0);
    assert_eq!(report.forced_placements.len(), 2);
    assert!(outcome.participants().iter().all(|p| p.was_forced()));
    assert!(outcome.events().events().iter().any(|e| matches!(
        e,
        RoundEvent::ForcedPair { .. }
    )));
}

#[test]
fn test_overflow_declines_logged_in_overflow_phase() {
    let met_each_other = |name: &str, other: &str| {
        Participant::from_parts(
            name.to_string(),
            format!("guid-{}", name),
            vec![other.to_string()],
            [other.to_string()].into_iter().collect(),
            vec![],
        )
        .unwrap()
    };

    let outcome = Round::from_participants(vec![met_each_other("A", "B"), met_each_other("B", "A")])
        .unwrap()
        .run(&mut RngManager::new(1))
        .unwrap();

    let events = outcome.events();
    let pairing = events.events_in_phase(RoundPhase::Pairing);
    let overflow = events.events_in_phase(RoundPhase::Overflow);

    assert_eq!(pairing.len(), 2, "both search and find nobody");
    assert!(pairing
        .iter()
        .all(|e| matches!(e, RoundEvent::CandidatesExhausted { .. })));
    assert_eq!(
        overflow,
        vec![
            &RoundEvent::Declined {
                name: "A".to_string(),
                candidate: "B".to_string()
            },
            &RoundEvent::ForcedPair {
                first: "A".to_string(),
                second: "B".to_string()
            },
        ]
    );
}

#[test]
fn test_history_of_absent_people_survives() {
    let book = history(&[("A", &["Zed"]), ("Zed", &["A"])]);
    let outcome = Round::new(&roster(&["A", "B"]), &book)
        .unwrap()
        .run(&mut RngManager::new(3))
        .unwrap();

    let a = outcome.participants().get("A").unwrap();
    assert!(a.has_met("Zed"));
    assert!(a.has_met("B"));

    let mut updated = book.clone();
    updated.record_round(&outcome);
    assert_eq!(updated.len(), 3);
    assert_eq!(updated.already_met("Zed"), Some(BTreeSet::from(["A".to_string()])));
}

#[test]
fn test_round_is_deterministic() {
    let names = ["A", "B", "C", "D", "E", "F", "G", "H", "I"];
    let book = history(&[("A", &["B", "C"]), ("D", &["E"]), ("G", &["H", "I"])]);

    for seed in [0, 1, 42, 12345, u64::MAX] {
        let first = Round::new(&roster(&names), &book)
            .unwrap()
            .run(&mut RngManager::new(seed));
        let second = Round::new(&roster(&names), &book)
            .unwrap()
            .run(&mut RngManager::new(seed));

        match (first, second) {
            (Ok(a), Ok(b)) => {
                assert_eq!(a.ledger(), b.ledger());
                assert_eq!(a.events(), b.events());
                assert_eq!(a.report(), b.report());
            }
            (Err(a), Err(b)) => assert_eq!(a, b),
            _ => panic!("seed {} gave different results", seed),
        }
    }
}

#[test]
fn test_export_rows_carry_external_ids() {
    let outcome = Round::new(&roster(&["A", "B", "C", "D", "E"]), &HistoryBook::new())
        .unwrap()
        .run(&mut RngManager::new(5))
        .unwrap();

    let rows = outcome.export_rows();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.id_a, format!("guid-{}", row.participant_a));
        assert_eq!(row.id_b, format!("guid-{}", row.participant_b));
    }
    let triples: Vec<_> = rows.iter().filter(|r| r.participant_c.is_some()).collect();
    assert_eq!(triples.len(), 1);
    assert_eq!(
        triples[0].id_c.as_deref().map(str::to_string),
        triples[0].participant_c.as_ref().map(|c| format!("guid-{}", c))
    );
}

// ============================================================================
// Failed rounds
// ============================================================================

#[test]
fn test_empty_roster_is_an_empty_round() {
    let outcome = Round::new(&[], &HistoryBook::new())
        .unwrap()
        .run(&mut RngManager::new(1))
        .unwrap();

    assert!(outcome.ledger().is_empty());
    assert_eq!(outcome.report().participant_count, 0);
}

#[test]
fn test_single_participant_is_unmatched() {
    let err = Round::new(&roster(&["Solo"]), &HistoryBook::new())
        .unwrap()
        .run(&mut RngManager::new(1))
        .unwrap_err();

    assert!(err.is_recoverable());
    match err {
        RoundError::Unmatched { names, report } => {
            assert_eq!(names, vec!["Solo".to_string()]);
            assert_eq!(report.unmatched_by_flag, 1);
            assert_eq!(report.unmatched_by_count, 1);
            assert!(report.unmatched.contains_key("Solo"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_crowded_history_strands_one_participant() {
    // A and B can only meet each other; C gets forced into their pair and
    // D has nothing left to join
    let book = history(&[
        ("A", &["C", "D"]),
        ("B", &["C", "D"]),
        ("C", &["D"]),
        ("D", &["C"]),
    ]);

    for seed in 0..50 {
        let err = Round::new(&roster(&["A", "B", "C", "D"]), &book)
            .unwrap()
            .run(&mut RngManager::new(seed))
            .unwrap_err();

        match err {
            RoundError::Unmatched { names, report } => {
                assert_eq!(names, vec!["D".to_string()]);
                assert_eq!(report.match_count, 1);
                assert_eq!(report.triple_count, 1);
                assert_eq!(report.forced_placements.len(), 1);
                let d = &report.unmatched["D"];
                assert_eq!(d.yet_to_meet, vec!["A".to_string(), "B".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}

#[test]
fn test_duplicate_roster_name_rejected() {
    let err = Round::new(&roster(&["A", "B", "A"]), &HistoryBook::new()).unwrap_err();
    assert_eq!(err, RoundError::State(StateError::DuplicateName("A".to_string())));
    assert!(!err.is_recoverable());
}

#[test]
fn test_self_in_history_rejected() {
    let book = history(&[("A", &["A"])]);
    let err = Round::new(&roster(&["A", "B"]), &book).unwrap_err();

    assert!(matches!(
        err,
        RoundError::Participant(ParticipantError::SelfReference { .. })
    ));
}
