//! File-backed collaborators for the week driver
//!
//! Layout of the data directory:
//!
//! ```text
//! roster.json     [{"name": .., "external_id": .., "opted_out": false}, ..]
//! history.json    [{"name": .., "external_id": .., "already_met": [..]}, ..]
//! output/         <Mon>_to_<Fri>_matches.json, <Mon>_to_<Fri>_report.txt
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use coffee_match_core::{
    CollaboratorError, HistoryBook, HistoryStore, ResultSink, RosterEntry, RosterSource,
    RoundOutcome,
};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::report::{self, WeekWindow};

pub const ROSTER_FILE: &str = "roster.json";
pub const HISTORY_FILE: &str = "history.json";
pub const OUTPUT_DIR: &str = "output";

/// One row of the club roster
#[derive(Debug, Clone, Deserialize)]
pub struct RosterRow {
    pub name: String,
    pub external_id: String,
    #[serde(default)]
    pub opted_out: bool,
}

impl From<RosterRow> for RosterEntry {
    fn from(row: RosterRow) -> Self {
        RosterEntry::new(row.name, row.external_id)
    }
}

pub fn read_roster(path: &Path) -> Result<Vec<RosterRow>, CollaboratorError> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read roster {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&text)?)
}

/// Roster file; people who opted out this week are skipped
pub struct JsonRoster {
    path: PathBuf,
}

impl JsonRoster {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RosterSource for JsonRoster {
    fn load_roster(&mut self) -> Result<Vec<RosterEntry>, CollaboratorError> {
        let rows = read_roster(&self.path)?;
        let total = rows.len();
        let entries: Vec<RosterEntry> = rows
            .into_iter()
            .filter(|row| !row.opted_out)
            .map(RosterEntry::from)
            .collect();
        debug!(total, opted_in = entries.len(), "roster loaded");
        Ok(entries)
    }
}

/// History file; a missing file means nobody has met yet
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load_history(&mut self) -> Result<HistoryBook, CollaboratorError> {
        if !self.path.exists() {
            return Ok(HistoryBook::new());
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save_history(&mut self, history: &HistoryBook) -> Result<(), CollaboratorError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(history)?)?;
        Ok(())
    }

    fn clear_history(&mut self) -> Result<(), CollaboratorError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Writes the matches and the text report for one week
pub struct OutputDir {
    dir: PathBuf,
    window: WeekWindow,
    run_id: Uuid,
}

impl OutputDir {
    pub fn new(dir: PathBuf, window: WeekWindow, run_id: Uuid) -> Self {
        Self {
            dir,
            window,
            run_id,
        }
    }

    pub fn matches_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}_matches.json", self.window.file_stem()))
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}_report.txt", self.window.file_stem()))
    }
}

impl ResultSink for OutputDir {
    fn publish(&mut self, outcome: &RoundOutcome) -> Result<(), CollaboratorError> {
        fs::create_dir_all(&self.dir)?;

        let rows = outcome.export_rows();
        fs::write(self.matches_path(), serde_json::to_string_pretty(&rows)?)?;
        fs::write(
            self.report_path(),
            report::render(self.window, outcome.report(), self.run_id),
        )?;

        info!(path = %self.matches_path().display(), groups = rows.len(), "matches saved");
        Ok(())
    }
}
