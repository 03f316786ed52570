//! coffee-match - weekly coffee chat matcher
//!
//! Reads this week's roster and the persisted meeting history from a data
//! directory, runs the matcher with bounded retries, and writes the matches
//! and a text report next to them.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use coffee_match_core::{DriverConfig, HistoryStore, RngManager, WeekDriver};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod report;
mod simulate;
mod store;

use report::WeekWindow;
use store::{JsonHistoryStore, JsonRoster, OutputDir};

/// Pair up the members of a coffee club, never repeating a past meeting
#[derive(Parser, Debug)]
#[command(name = "coffee-match")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding roster.json, history.json and output/
    #[arg(long, env = "COFFEE_MATCH_DATA_DIR", default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// RNG seed (defaults to the current time)
    #[arg(long, env = "COFFEE_MATCH_SEED", global = true)]
    seed: Option<u64>,

    /// Rounds to try before giving up on a week
    #[arg(long, default_value_t = 100, global = true)]
    max_attempts: usize,

    /// Clear history after this many failed rounds in a row
    #[arg(long, global = true)]
    clear_history_after: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Match this week's roster and persist the updated history
    Run,

    /// Run consecutive weeks in memory with random opt-outs
    Simulate {
        /// Number of weeks to simulate
        #[arg(long, default_value_t = 104)]
        weeks: usize,

        /// Probability that a person sits out a given week
        #[arg(long, default_value_t = 0.25)]
        opt_out: f64,
    },

    /// Delete the persisted meeting history
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let run_id = Uuid::new_v4();
    let seed = cli
        .seed
        .unwrap_or_else(|| Utc::now().timestamp_millis().unsigned_abs());
    let config = DriverConfig {
        max_attempts: cli.max_attempts,
        clear_history_after: cli.clear_history_after,
    };
    info!(%run_id, seed, data_dir = %cli.data_dir.display(), "coffee-match starting");

    match cli.command {
        Commands::Run => cmd_run(&cli.data_dir, config, seed, run_id),
        Commands::Simulate { weeks, opt_out } => {
            simulate::run(&cli.data_dir, config, seed, weeks, opt_out)
        }
        Commands::Clear => cmd_clear(&cli.data_dir),
    }
}

fn cmd_run(data_dir: &Path, config: DriverConfig, seed: u64, run_id: Uuid) -> Result<()> {
    let window = WeekWindow::containing(Local::now().date_naive());
    let mut driver = WeekDriver::new(
        config,
        JsonRoster::new(data_dir.join(store::ROSTER_FILE)),
        JsonHistoryStore::new(data_dir.join(store::HISTORY_FILE)),
        OutputDir::new(data_dir.join(store::OUTPUT_DIR), window, run_id),
    );

    let result = driver
        .run_week(&mut RngManager::new(seed))
        .with_context(|| format!("matching failed for {}", window))?;

    info!(
        attempts = result.attempts,
        groups = result.outcome.ledger().len(),
        "matches written"
    );
    print!("{}", report::render(window, result.outcome.report(), run_id));
    Ok(())
}

fn cmd_clear(data_dir: &Path) -> Result<()> {
    let path = data_dir.join(store::HISTORY_FILE);
    JsonHistoryStore::new(path.clone())
        .clear_history()
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("failed to clear {}", path.display()))?;
    info!(path = %path.display(), "history cleared");
    Ok(())
}
