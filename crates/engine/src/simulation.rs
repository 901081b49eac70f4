//! Simulation Driver
//!
//! Builds the baseline rosters once, splits the gold roster at the retain
//! count, then runs independent reallocation trials in parallel and averages
//! the per-competition welfare gain.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    RwLock,
};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::ordering::RosterOrdering;
use crate::payout::{CompetitionPayoutTable, PayoutWeights};
use crate::reallocation::{build_assignment_strategy, reallocate, AssignmentPolicy, AssignmentStrategy};
use crate::roster::{build_roster, LeaderboardSource, Roster};
use crate::sampling::{fresh_seed, trial_rng};
use crate::types::{RosterSet, SimulationResult, TierCounts, UserInfoTable};
use crate::welfare::{compute_welfare, welfare_by_competition};

// ============================================================================
// Types
// ============================================================================

/// Options of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Competitors kept in gold; also the K of the top-K welfare
    pub retain_count: usize,
    pub trial_count: usize,
    pub policy: AssignmentPolicy,
    pub ordering: RosterOrdering,
    /// Run seed. `None` draws one and reports it in the result.
    pub seed: Option<u64>,
    /// Size of a dedicated worker pool. `None` uses the global rayon pool.
    pub workers: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            retain_count: 25,
            trial_count: 100,
            policy: AssignmentPolicy::Multi,
            ordering: RosterOrdering::PointsDescending,
            seed: None,
            workers: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.trial_count == 0 {
            return Err(EngineError::invalid("trial_count must be at least 1"));
        }
        if self.workers == Some(0) {
            return Err(EngineError::invalid("workers must be at least 1"));
        }
        Ok(())
    }
}

/// External data a run reads from
pub struct SimulationInput<'a> {
    pub user_info: &'a UserInfoTable,
    pub leaderboards: &'a dyn LeaderboardSource,
    pub gold_id: &'a str,
    pub normal_ids: &'a [String],
    pub payout_table: &'a CompetitionPayoutTable,
}

/// Rosters and weights shared read-only by every trial of a run
#[derive(Debug, Clone)]
pub struct Baseline {
    pub gold_roster: Roster,
    pub normal_rosters: RosterSet,
    pub weights: PayoutWeights,
    pub ordering: RosterOrdering,
}

/// Run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    BuildingRosters,
    Running,
    Complete,
    Error,
}

/// Shared progress tracker between a run and whoever displays it
pub struct RunProgress {
    pub status: RwLock<RunStatus>,
    pub total_trials: AtomicUsize,
    pub completed_trials: AtomicUsize,
    pub current_retain: AtomicUsize,
    pub error_message: RwLock<Option<String>>,
}

impl RunProgress {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(RunStatus::Idle),
            total_trials: AtomicUsize::new(0),
            completed_trials: AtomicUsize::new(0),
            current_retain: AtomicUsize::new(0),
            error_message: RwLock::new(None),
        }
    }

    pub fn set_status(&self, status: RunStatus) {
        if let Ok(mut guard) = self.status.write() {
            *guard = status;
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status.read().map(|s| *s).unwrap_or(RunStatus::Error)
    }

    pub fn fail(&self, message: impl Into<String>) {
        if let Ok(mut guard) = self.error_message.write() {
            *guard = Some(message.into());
        }
        self.set_status(RunStatus::Error);
    }

    /// Progress as percentage
    pub fn progress_pct(&self) -> f32 {
        let total = self.total_trials.load(Ordering::Relaxed);
        let done = self.completed_trials.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            (done as f32 / total as f32) * 100.0
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status(), RunStatus::BuildingRosters | RunStatus::Running)
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Build the gold roster, every normal roster and the payout weights.
pub fn prepare_baseline(input: &SimulationInput<'_>, ordering: RosterOrdering) -> EngineResult<Baseline> {
    if input.gold_id != input.payout_table.gold {
        return Err(EngineError::invalid(format!(
            "gold competition '{}' does not match payout table gold '{}'",
            input.gold_id, input.payout_table.gold
        )));
    }

    let weights = PayoutWeights::from_table(input.payout_table, input.normal_ids)?;
    let gold_roster = build_roster(input.gold_id, input.user_info, input.leaderboards, ordering)?;

    let mut normal_rosters = RosterSet::new();
    for id in input.normal_ids {
        let roster = build_roster(id, input.user_info, input.leaderboards, ordering)?;
        normal_rosters.insert(id.clone(), roster);
    }

    info!(
        gold = input.gold_id,
        gold_competitors = gold_roster.len(),
        normal_competitions = normal_rosters.len(),
        users = input.user_info.len(),
        "Baseline rosters built"
    );

    Ok(Baseline {
        gold_roster,
        normal_rosters,
        weights,
        ordering,
    })
}

/// Run a full before/after comparison and average it over `trial_count` trials.
pub fn run_simulation(
    input: &SimulationInput<'_>,
    config: &SimulationConfig,
) -> EngineResult<SimulationResult> {
    run_simulation_with_progress(input, config, None)
}

pub fn run_simulation_with_progress(
    input: &SimulationInput<'_>,
    config: &SimulationConfig,
    progress: Option<&RunProgress>,
) -> EngineResult<SimulationResult> {
    config.validate()?;
    if let Some(p) = progress {
        p.set_status(RunStatus::BuildingRosters);
        p.total_trials.store(config.trial_count, Ordering::Relaxed);
        p.completed_trials.store(0, Ordering::Relaxed);
    }

    let outcome = prepare_baseline(input, config.ordering)
        .and_then(|baseline| simulate_baseline(&baseline, config, progress));

    if let Some(p) = progress {
        match &outcome {
            Ok(_) => p.set_status(RunStatus::Complete),
            Err(e) => p.fail(e.to_string()),
        }
    }
    outcome
}

/// Run the trials of one retain count against an already built baseline.
pub fn simulate_baseline(
    baseline: &Baseline,
    config: &SimulationConfig,
    progress: Option<&RunProgress>,
) -> EngineResult<SimulationResult> {
    config.validate()?;
    if baseline.ordering != config.ordering {
        return Err(EngineError::invalid(format!(
            "baseline sorted by {} but run configured for {}",
            baseline.ordering, config.ordering
        )));
    }

    let seed = config.seed.unwrap_or_else(fresh_seed);
    let retain_count = config.retain_count;
    let (retained, displaced) = baseline.gold_roster.split_at(retain_count);
    let strategy = build_assignment_strategy(config.policy);

    let baseline_welfare = welfare_by_competition(&baseline.normal_rosters, retain_count);
    let ids = baseline.weights.ids();

    info!(
        retain_count,
        retained = retained.len(),
        displaced = displaced.len(),
        trials = config.trial_count,
        policy = %config.policy,
        ordering = %config.ordering,
        seed,
        "Starting simulation"
    );

    if let Some(p) = progress {
        p.set_status(RunStatus::Running);
        p.current_retain.store(retain_count, Ordering::Relaxed);
    }

    let run_trials = || -> EngineResult<Vec<Vec<f64>>> {
        (0..config.trial_count)
            .into_par_iter()
            .map(|trial| {
                let gains = run_trial(
                    baseline,
                    &displaced,
                    strategy.as_ref(),
                    &baseline_welfare,
                    retain_count,
                    seed,
                    trial,
                );
                if let Some(p) = progress {
                    p.completed_trials.fetch_add(1, Ordering::Relaxed);
                }
                gains
            })
            .collect()
    };

    let per_trial = match config.workers {
        Some(workers) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| EngineError::invalid(format!("cannot build worker pool: {e}")))?;
            pool.install(run_trials)?
        }
        None => run_trials()?,
    };

    // Reduce in trial order so the sums do not depend on scheduling
    let mut totals = vec![0.0f64; ids.len()];
    for gains in &per_trial {
        for (total, gain) in totals.iter_mut().zip(gains) {
            *total += gain;
        }
    }

    let trial_count = config.trial_count as f64;
    let average_gains: BTreeMap<String, f64> = ids
        .iter()
        .zip(&totals)
        .map(|(id, total)| (id.clone(), total / trial_count))
        .collect();

    let result = SimulationResult {
        retain_count,
        trial_count: config.trial_count,
        seed,
        policy: config.policy,
        ordering: config.ordering,
        retained_tiers: TierCounts::from_entries(&retained),
        displaced_tiers: TierCounts::from_entries(&displaced),
        retained: retained.into_iter().map(|e| e.user).collect(),
        displaced: displaced.into_iter().map(|e| e.user).collect(),
        baseline_welfare,
        average_gains,
    };

    info!(
        retain_count,
        mean_gain = result.mean_gain(),
        "Simulation complete"
    );

    Ok(result)
}

/// One trial: reallocate from a fresh copy of the baseline and return the gain
/// of every normal competition, in `baseline.weights.ids()` order.
fn run_trial(
    baseline: &Baseline,
    displaced: &[crate::types::RosterEntry],
    strategy: &dyn AssignmentStrategy,
    baseline_welfare: &BTreeMap<String, f64>,
    retain_count: usize,
    seed: u64,
    trial: usize,
) -> EngineResult<Vec<f64>> {
    let mut rng = trial_rng(seed, trial);
    let after = reallocate(
        displaced,
        &baseline.weights,
        &baseline.normal_rosters,
        strategy,
        baseline.ordering,
        &mut rng,
    )?;

    let gains = baseline
        .weights
        .ids()
        .iter()
        .map(|id| {
            let before = baseline_welfare.get(id).copied().unwrap_or(0.0);
            let after = after
                .get(id)
                .map(|roster| compute_welfare(roster, retain_count))
                .unwrap_or(0.0);
            after - before
        })
        .collect();

    if trial % 1000 == 0 {
        debug!(trial, "Trial finished");
    }

    Ok(gains)
}

// ============================================================================
// Tests
// ============================================================================
