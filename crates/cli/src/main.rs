//! Goldcap — simulate capping the gold competition
//!
//! Usage:
//!   goldcap simulate --retain 25 --trials 100     — Average gains for one retain count
//!   goldcap sweep --retain-from 0 --retain-to 50  — Find the best retain count
//!   goldcap roster --competition PLAsTiCC-2018    — Inspect one roster

mod report;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use engine::{
    build_roster, checked_count, find_best_retain_count_with_progress,
    run_simulation_with_progress, stepped_range, AssignmentPolicy, CompetitionPayoutTable,
    RosterOrdering, RunProgress, RunStatus, SimulationConfig, SimulationInput, UserInfoTable,
};
use sources::{
    default_payout_table, discover_competitions, load_payout_table, load_user_table,
    CsvLeaderboardSource,
};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const APP_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GOLDCAP_COMMIT"));

#[derive(Parser)]
#[command(name = "goldcap")]
#[command(about = "Simulate reallocating competitors displaced from a capped gold competition", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Average welfare gains for one retain count
    Simulate {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        run: RunArgs,
        /// Competitors kept in the gold competition
        #[arg(long, default_value_t = 25, allow_negative_numbers = true)]
        retain: i64,
        /// Optional JSON export path
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Search the retain count with the highest mean gain
    Sweep {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        run: RunArgs,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        retain_from: i64,
        #[arg(long, default_value_t = 50, allow_negative_numbers = true)]
        retain_to: i64,
        #[arg(long, default_value_t = 5)]
        step: usize,
        /// Optional JSON export path
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Print the tier breakdown and top entries of one roster
    Roster {
        #[command(flatten)]
        data: DataArgs,
        /// Competition identifier
        #[arg(long)]
        competition: String,
        /// Number of entries to list
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Ordering: points, tier-then-points
        #[arg(long, default_value = "points")]
        ordering: String,
    },
}

#[derive(Args)]
struct DataArgs {
    /// Ranking dump (defaults to $GOLDCAP_USERS_PATH or kaggle_users.json)
    #[arg(long)]
    users: Option<PathBuf>,
    /// Leaderboard snapshot root (defaults to $GOLDCAP_LEADERBOARD_DIR or Leaderboards)
    #[arg(long)]
    leaderboards: Option<PathBuf>,
    /// Payout table JSON (defaults to the built-in 2018 table)
    #[arg(long)]
    payouts: Option<PathBuf>,
    /// Override the gold competition of the payout table
    #[arg(long)]
    gold: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    /// Number of randomized trials
    #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
    trials: i64,
    /// Assignment policy: single, multi
    #[arg(long, default_value = "multi")]
    policy: String,
    /// Ordering: points, tier-then-points
    #[arg(long, default_value = "points")]
    ordering: String,
    /// Run seed for reproducible trials
    #[arg(long)]
    seed: Option<u64>,
    /// Worker threads (defaults to one per core)
    #[arg(long)]
    workers: Option<usize>,
}

impl RunArgs {
    fn to_config(&self, retain: i64) -> anyhow::Result<SimulationConfig> {
        let policy: AssignmentPolicy = self.policy.parse().map_err(anyhow::Error::msg)?;
        let ordering: RosterOrdering = self.ordering.parse().map_err(anyhow::Error::msg)?;
        let config = SimulationConfig {
            retain_count: checked_count("retain_count", retain)?,
            trial_count: checked_count("trial_count", self.trials)?,
            policy,
            ordering,
            seed: self.seed,
            workers: self.workers,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Everything a run reads, loaded up front and owned so it can move to a worker thread
struct LoadedData {
    users: UserInfoTable,
    leaderboards: CsvLeaderboardSource,
    table: CompetitionPayoutTable,
    normal_ids: Vec<String>,
}

impl LoadedData {
    fn input(&self) -> SimulationInput<'_> {
        SimulationInput {
            user_info: &self.users,
            leaderboards: &self.leaderboards,
            gold_id: &self.table.gold,
            normal_ids: &self.normal_ids,
            payout_table: &self.table,
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,sources=debug,goldcap=debug")
    } else {
        EnvFilter::new("info,engine=info,sources=info,goldcap=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn users_path(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(|| {
        std::env::var("GOLDCAP_USERS_PATH")
            .unwrap_or_else(|_| "kaggle_users.json".to_string())
            .into()
    })
}

fn leaderboard_dir(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(|| {
        std::env::var("GOLDCAP_LEADERBOARD_DIR")
            .unwrap_or_else(|_| "Leaderboards".to_string())
            .into()
    })
}

fn load_data(args: DataArgs) -> anyhow::Result<LoadedData> {
    let users_path = users_path(args.users);
    let users = load_user_table(&users_path)
        .with_context(|| format!("loading user table from {}", users_path.display()))?;

    let mut table = match &args.payouts {
        Some(path) => load_payout_table(path)
            .with_context(|| format!("loading payout table from {}", path.display()))?,
        None => default_payout_table(),
    };
    if let Some(gold) = args.gold {
        table.gold = gold;
        table.validate()?;
    }
    let normal_ids = table.normal_ids();

    let root = leaderboard_dir(args.leaderboards);
    match discover_competitions(&root) {
        Ok(found) => {
            for name in found.iter().filter(|n| table.payout(n).is_none()) {
                warn!(competition = %name, "Leaderboard has no payout, ignored");
            }
        }
        Err(e) => warn!(error = %e, "Could not list leaderboard directory"),
    }

    info!(
        users = users.len(),
        gold = %table.gold,
        normal = normal_ids.len(),
        leaderboards = %root.display(),
        "Data loaded"
    );

    Ok(LoadedData {
        users,
        leaderboards: CsvLeaderboardSource::new(root),
        table,
        normal_ids,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Simulate {
            data,
            run,
            retain,
            export,
        } => {
            cmd_simulate(data, run, retain, export).await?;
        }
        Commands::Sweep {
            data,
            run,
            retain_from,
            retain_to,
            step,
            export,
        } => {
            cmd_sweep(data, run, retain_from, retain_to, step, export).await?;
        }
        Commands::Roster {
            data,
            competition,
            top,
            ordering,
        } => {
            cmd_roster(data, &competition, top, &ordering)?;
        }
    }

    Ok(())
}

// ============================================================================
// Simulate command
// ============================================================================

async fn cmd_simulate(
    data: DataArgs,
    run: RunArgs,
    retain: i64,
    export: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = run.to_config(retain)?;
    let loaded = load_data(data)?;

    println!("\n=== Goldcap v{} ===", APP_VERSION);
    println!(
        "Gold: {} | Retain: {} | Trials: {} | Policy: {} | Ordering: {}",
        loaded.table.gold, config.retain_count, config.trial_count, config.policy, config.ordering
    );
    println!();

    let progress = Arc::new(RunProgress::new());
    let progress_clone = progress.clone();
    let handle = tokio::task::spawn_blocking(move || {
        run_simulation_with_progress(&loaded.input(), &config, Some(progress_clone.as_ref()))
    });

    let result = watch_progress(handle, &progress).await??;

    report::print_gains(&result);

    if let Some(path) = export {
        let json = serde_json::to_string_pretty(&report::simulation_export(&result))?;
        std::fs::write(&path, &json)
            .with_context(|| format!("writing export to {}", path.display()))?;
        println!("\nResults exported to {}", path.display());
    }

    Ok(())
}

// ============================================================================
// Sweep command
// ============================================================================

async fn cmd_sweep(
    data: DataArgs,
    run: RunArgs,
    retain_from: i64,
    retain_to: i64,
    step: usize,
    export: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = run.to_config(0)?;
    let retain_range = stepped_range(
        checked_count("retain_from", retain_from)?,
        checked_count("retain_to", retain_to)?,
        step,
    )?;
    let loaded = load_data(data)?;

    println!("\n=== Goldcap v{} ===", APP_VERSION);
    println!(
        "Gold: {} | Candidates: {} ({}..={} step {}) | Trials: {} | Policy: {}",
        loaded.table.gold,
        retain_range.len(),
        retain_from,
        retain_to,
        step,
        config.trial_count,
        config.policy
    );
    println!();

    let progress = Arc::new(RunProgress::new());
    let progress_clone = progress.clone();
    let handle = tokio::task::spawn_blocking(move || {
        find_best_retain_count_with_progress(
            &loaded.input(),
            &retain_range,
            &config,
            Some(progress_clone.as_ref()),
        )
    });

    let outcome = watch_progress(handle, &progress).await??;

    report::print_sweep(&outcome);

    if let Some(path) = export {
        let json = serde_json::to_string_pretty(&report::sweep_export(&outcome))?;
        std::fs::write(&path, &json)
            .with_context(|| format!("writing export to {}", path.display()))?;
        println!("\nResults exported to {}", path.display());
    }

    Ok(())
}

/// Redraw a progress bar until the blocking run finishes
async fn watch_progress<T>(
    handle: JoinHandle<T>,
    progress: &RunProgress,
) -> Result<T, tokio::task::JoinError> {
    while !handle.is_finished() {
        tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;

        let pct = progress.progress_pct();
        let completed = progress.completed_trials.load(Ordering::Relaxed);
        let total = progress.total_trials.load(Ordering::Relaxed);
        let retain = progress.current_retain.load(Ordering::Relaxed);

        match progress.status() {
            RunStatus::BuildingRosters => {
                print!("\r  Building rosters...                                        ");
            }
            RunStatus::Running => {
                let bar_len = 30;
                let filled = ((pct as usize) * bar_len / 100).min(bar_len);
                let bar: String = "=".repeat(filled) + &" ".repeat(bar_len - filled);
                print!(
                    "\r  Retain {} [{}] {:.0}% ({}/{} trials)   ",
                    retain, bar, pct, completed, total
                );
            }
            _ => {}
        }
        use std::io::Write;
        std::io::stdout().flush().ok();
    }
    println!("\r  Done.                                                              ");

    handle.await
}

// ============================================================================
// Roster command
// ============================================================================

fn cmd_roster(data: DataArgs, competition: &str, top: usize, ordering: &str) -> anyhow::Result<()> {
    let ordering: RosterOrdering = ordering.parse().map_err(anyhow::Error::msg)?;
    let loaded = load_data(data)?;

    let roster = build_roster(competition, &loaded.users, &loaded.leaderboards, ordering)?;
    report::print_roster(competition, &roster, loaded.table.payout(competition), top);

    Ok(())
}
