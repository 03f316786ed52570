//! Multi-week simulation
//!
//! Replays the club for a number of consecutive weeks without touching the
//! persisted history. Each week every roster member independently sits out
//! with the given probability, so the matcher sees changing head counts and
//! a history that grows over time. One JSON record per week goes to stdout.

use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use chrono::Local;
use coffee_match_core::{
    DriverConfig, HistoryBook, MatchReport, MemoryHistoryStore, MemorySink, RngManager,
    RosterEntry, StaticRoster, WeekDriver,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::report::WeekWindow;
use crate::store;

/// Seed offset for the opt-out draws, so they do not share a stream with
/// the matcher
const OPT_OUT_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Serialize)]
pub struct WeekRecord {
    pub week: usize,
    pub window: String,
    pub participants: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<MatchReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn run(
    data_dir: &Path,
    config: DriverConfig,
    seed: u64,
    weeks: usize,
    opt_out: f64,
) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&opt_out),
        "opt-out probability must be between 0 and 1, got {}",
        opt_out
    );

    let path = data_dir.join(store::ROSTER_FILE);
    let club: Vec<RosterEntry> = store::read_roster(&path)
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("failed to load {}", path.display()))?
        .into_iter()
        .map(RosterEntry::from)
        .collect();

    let start = WeekWindow::containing(Local::now().date_naive());
    let records = simulate(&club, config, seed, weeks, opt_out, start);

    let failed = records.iter().filter(|r| r.error.is_some()).count();
    info!(weeks, failed, "simulation finished");

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

pub fn simulate(
    club: &[RosterEntry],
    config: DriverConfig,
    seed: u64,
    weeks: usize,
    opt_out: f64,
    start: WeekWindow,
) -> Vec<WeekRecord> {
    let mut rng = RngManager::new(seed);
    let mut draws = RngManager::new(seed ^ OPT_OUT_STREAM);
    let mut history = MemoryHistoryStore::new(HistoryBook::new());
    let mut records = Vec::with_capacity(weeks);

    for week in 0..weeks {
        let roster: Vec<RosterEntry> = club
            .iter()
            .filter(|_| !draws.chance(opt_out))
            .cloned()
            .collect();
        let participants = roster.len();

        let mut driver = WeekDriver::new(
            config.clone(),
            StaticRoster::new(roster),
            history,
            MemorySink::new(),
        );
        let result = driver.run_week(&mut rng);
        let window = start.shifted(week as i64).to_string();

        let record = match result {
            Ok(result) => WeekRecord {
                week: week + 1,
                window,
                participants,
                attempts: Some(result.attempts),
                report: Some(result.outcome.report().clone()),
                error: None,
            },
            Err(e) => {
                warn!(week = week + 1, error = %e, "simulated week failed");
                WeekRecord {
                    week: week + 1,
                    window,
                    participants,
                    attempts: None,
                    report: None,
                    error: Some(e.to_string()),
                }
            }
        };
        records.push(record);

        let (_, kept, _) = driver.into_parts();
        history = kept;
    }

    records
}
