//! Tests for the week driver: collaborators, retries, history clearing

use coffee_match_core::{
    CollaboratorError, DriverConfig, DriverError, HistoryBook, HistoryRecord, HistoryStore,
    MemoryHistoryStore, MemorySink, RngManager, RosterEntry, RosterSource, RoundError,
    StaticRoster, WeekDriver,
};

fn roster(names: &[&str]) -> Vec<RosterEntry> {
    names
        .iter()
        .map(|n| RosterEntry::new(*n, format!("guid-{}", n)))
        .collect()
}

/// History under which D can never be placed, whatever the seed
fn deadlocked_history() -> HistoryBook {
    let record = |name: &str, met: &[&str]| HistoryRecord {
        name: name.to_string(),
        external_id: format!("guid-{}", name),
        already_met: met.iter().map(|s| s.to_string()).collect(),
    };
    HistoryBook::from_records(vec![
        record("A", &["C", "D"]),
        record("B", &["C", "D"]),
        record("C", &["D"]),
        record("D", &["C"]),
    ])
}

fn driver(
    names: &[&str],
    history: HistoryBook,
    config: DriverConfig,
) -> WeekDriver<StaticRoster, MemoryHistoryStore, MemorySink> {
    WeekDriver::new(
        config,
        StaticRoster::new(roster(names)),
        MemoryHistoryStore::new(history),
        MemorySink::new(),
    )
}

#[test]
fn test_consecutive_weeks_accumulate_history() {
    let mut driver = driver(
        &["A", "B", "C", "D", "E", "F"],
        HistoryBook::new(),
        DriverConfig::default(),
    );
    let mut rng = RngManager::new(2024);

    for week in 1..=8 {
        let result = driver.run_week(&mut rng).unwrap();
        assert_eq!(result.attempts, 1, "week {}", week);
        assert_eq!(result.outcome.ledger().member_count(), 6);
    }

    assert_eq!(driver.sink().outcomes().len(), 8);
    let book = driver.history_store().book();
    assert_eq!(book.len(), 6);
    for record in book.records() {
        assert!(!record.already_met.contains(&record.name));
    }
}

#[test]
fn test_first_week_never_repeats_history() {
    let mut driver = driver(&["A", "B", "C", "D"], HistoryBook::new(), DriverConfig::default());
    let result = driver.run_week(&mut RngManager::new(1)).unwrap();

    let saved = driver.history_store().book();
    for group in result.outcome.ledger().groups() {
        let names: Vec<&str> = group.names().collect();
        let met = saved.already_met(names[0]).unwrap();
        assert!(met.contains(names[1]));
    }
}

#[test]
fn test_clearing_history_breaks_deadlock() {
    let config = DriverConfig {
        max_attempts: 5,
        clear_history_after: Some(2),
    };
    let mut driver = driver(&["A", "B", "C", "D"], deadlocked_history(), config);

    let result = driver.run_week(&mut RngManager::new(11)).unwrap();

    assert_eq!(result.attempts, 3);
    assert_eq!(driver.history_store().clears(), 1);
    assert_eq!(result.outcome.ledger().pair_count(), 2);
    assert_eq!(driver.sink().outcomes().len(), 1, "only the success is published");
}

#[test]
fn test_attempts_exhausted() {
    let config = DriverConfig {
        max_attempts: 4,
        clear_history_after: None,
    };
    let mut driver = driver(&["A", "B", "C", "D"], deadlocked_history(), config);

    let err = driver.run_week(&mut RngManager::new(11)).unwrap_err();

    match err {
        DriverError::AttemptsExhausted { attempts, last } => {
            assert_eq!(attempts, 4);
            assert!(matches!(last, RoundError::Unmatched { .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(driver.sink().outcomes().is_empty());
    assert_eq!(driver.history_store().book(), &deadlocked_history());
}

#[test]
fn test_invalid_config_rejected() {
    let mut zero_attempts = driver(
        &["A", "B"],
        HistoryBook::new(),
        DriverConfig {
            max_attempts: 0,
            clear_history_after: None,
        },
    );
    assert!(matches!(
        zero_attempts.run_week(&mut RngManager::new(1)),
        Err(DriverError::InvalidConfig(_))
    ));

    let mut zero_threshold = driver(
        &["A", "B"],
        HistoryBook::new(),
        DriverConfig {
            max_attempts: 3,
            clear_history_after: Some(0),
        },
    );
    assert!(matches!(
        zero_threshold.run_week(&mut RngManager::new(1)),
        Err(DriverError::InvalidConfig(_))
    ));
}

#[test]
fn test_invalid_roster_aborts_without_retry() {
    let mut driver = driver(&["A", "B", "A"], HistoryBook::new(), DriverConfig::default());

    let err = driver.run_week(&mut RngManager::new(1)).unwrap_err();
    assert!(matches!(err, DriverError::Round(RoundError::State(_))));
}

struct OfflineRoster;

impl RosterSource for OfflineRoster {
    fn load_roster(&mut self) -> Result<Vec<RosterEntry>, CollaboratorError> {
        Err("sheet offline".into())
    }
}

#[test]
fn test_collaborator_error_passes_through() {
    let mut driver = WeekDriver::new(
        DriverConfig::default(),
        OfflineRoster,
        MemoryHistoryStore::default(),
        MemorySink::new(),
    );

    let err = driver.run_week(&mut RngManager::new(1)).unwrap_err();
    assert!(matches!(err, DriverError::Collaborator(_)));
    assert_eq!(err.to_string(), "sheet offline");
}

struct ReadOnlyHistory(HistoryBook);

impl HistoryStore for ReadOnlyHistory {
    fn load_history(&mut self) -> Result<HistoryBook, CollaboratorError> {
        Ok(self.0.clone())
    }

    fn save_history(&mut self, _history: &HistoryBook) -> Result<(), CollaboratorError> {
        Err("history is read-only".into())
    }

    fn clear_history(&mut self) -> Result<(), CollaboratorError> {
        Err("history is read-only".into())
    }
}

#[test]
fn test_failed_save_does_not_publish() {
    let mut driver = WeekDriver::new(
        DriverConfig::default(),
        StaticRoster::new(roster(&["A", "B"])),
        ReadOnlyHistory(HistoryBook::new()),
        MemorySink::new(),
    );

    let err = driver.run_week(&mut RngManager::new(1)).unwrap_err();
    assert_eq!(err.to_string(), "history is read-only");
    assert!(driver.sink().outcomes().is_empty());
}

#[test]
fn test_driver_deterministic() {
    let run = |seed: u64| {
        let mut driver = driver(
            &["A", "B", "C", "D", "E", "F", "G"],
            HistoryBook::new(),
            DriverConfig {
                max_attempts: 50,
                clear_history_after: Some(10),
            },
        );
        let mut rng = RngManager::new(seed);
        let weeks: Vec<_> = (0..6)
            .map(|_| {
                driver
                    .run_week(&mut rng)
                    .map(|result| result.outcome.ledger().clone())
                    .ok()
            })
            .collect();
        (weeks, driver.history_store().book().clone())
    };

    assert_eq!(run(77), run(77));
}
