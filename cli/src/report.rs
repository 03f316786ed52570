//! Text rendering of the weekly match report
//!
//! The layout mirrors what the club organisers have always received: a
//! dated title, one line per count, then a section per unmatched person and
//! one for placements that ignored meeting history.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use coffee_match_core::MatchReport;
use uuid::Uuid;

/// Monday to Friday of the week being matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    monday: NaiveDate,
    friday: NaiveDate,
}

impl WeekWindow {
    pub fn containing(day: NaiveDate) -> Self {
        let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
        Self {
            monday,
            friday: monday + Duration::days(4),
        }
    }

    /// The same window `weeks` weeks later
    pub fn shifted(self, weeks: i64) -> Self {
        let offset = Duration::weeks(weeks);
        Self {
            monday: self.monday + offset,
            friday: self.friday + offset,
        }
    }

    /// Prefix for output files, e.g. `2024-01-01_to_2024-01-05`
    pub fn file_stem(&self) -> String {
        format!(
            "{}_to_{}",
            self.monday.format("%Y-%m-%d"),
            self.friday.format("%Y-%m-%d")
        )
    }
}

impl fmt::Display for WeekWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.monday.format("%Y-%m-%d"),
            self.friday.format("%Y-%m-%d")
        )
    }
}

pub fn render(window: WeekWindow, report: &MatchReport, run_id: Uuid) -> String {
    ReportText {
        window,
        report,
        run_id,
    }
    .to_string()
}

/// The weekly report laid out as text
pub struct ReportText<'a> {
    pub window: WeekWindow,
    pub report: &'a MatchReport,
    pub run_id: Uuid,
}

impl fmt::Display for ReportText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let title = format!("Match Report: {}", self.window);

        writeln!(f, "{}", title)?;
        writeln!(f, "{}", "=".repeat(title.len()))?;
        writeln!(f)?;
        writeln!(f, "Run: {}", self.run_id)?;
        writeln!(f, "Number of People: {}", report.participant_count)?;
        writeln!(f, "Number of Matches: {}", report.match_count)?;
        writeln!(f, "Number of 3 way matches: {}", report.triple_count)?;
        writeln!(
            f,
            "Number of Unmatched People (by matched flag): {}",
            report.unmatched_by_flag
        )?;
        writeln!(
            f,
            "Number of Unmatched People (from match count): {}",
            report.unmatched_by_count
        )?;
        writeln!(f, "Unmatched counts agree: {}", report.counts_agree())?;

        if !report.unmatched.is_empty() {
            writeln!(f)?;
            writeln!(f, "Names of Unmatched Persons")?;
            for (name, diagnostics) in &report.unmatched {
                writeln!(f, "{},", name)?;
                writeln!(f, "    Yet To Meet:")?;
                for other in &diagnostics.yet_to_meet {
                    writeln!(f, "    {},", other)?;
                }
                writeln!(f)?;
                writeln!(f, "    Already Met:")?;
                for other in &diagnostics.already_met {
                    writeln!(f, "    {},", other)?;
                }
                writeln!(f)?;
            }
        }

        if report.has_forced_placements() {
            writeln!(f)?;
            writeln!(f, "Placed Without History Check")?;
            for placement in &report.forced_placements {
                writeln!(f, "{} (group of {})", placement.name, placement.primary)?;
            }
        }

        Ok(())
    }
}
