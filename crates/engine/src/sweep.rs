//! Parameter Sweep — search the retain count that maximizes average gain
//!
//! Runs the simulation once per candidate retain count against a single
//! baseline. All candidates share one run seed, so they differ only by the
//! retain count. Objective: mean of the per-competition average gains.

use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::sampling::fresh_seed;
use crate::simulation::{
    prepare_baseline, simulate_baseline, RunProgress, RunStatus, SimulationConfig, SimulationInput,
};
use crate::types::SimulationResult;

/// One evaluated retain count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepCandidate {
    pub retain_count: usize,
    pub mean_gain: f64,
    pub result: SimulationResult,
}

/// Outcome of a sweep: the winner plus every candidate in range order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub best_retain_count: usize,
    pub best_mean_gain: f64,
    pub candidates: Vec<SweepCandidate>,
}

impl SweepOutcome {
    pub fn best(&self) -> Option<&SweepCandidate> {
        self.candidates
            .iter()
            .find(|c| c.retain_count == self.best_retain_count)
    }
}

/// `from..=to` in steps of `step`
pub fn stepped_range(from: usize, to: usize, step: usize) -> EngineResult<Vec<usize>> {
    if step == 0 {
        return Err(EngineError::invalid("retain range step must be at least 1"));
    }
    if from > to {
        return Err(EngineError::invalid(format!(
            "retain range start {from} is past its end {to}"
        )));
    }
    Ok((from..=to).step_by(step).collect())
}

/// Evaluate every candidate with `evaluate` and keep the best mean gain.
/// Ties go to the earliest candidate in `retain_range`.
pub fn sweep_with<F>(retain_range: &[usize], mut evaluate: F) -> EngineResult<SweepOutcome>
where
    F: FnMut(usize) -> EngineResult<SimulationResult>,
{
    if retain_range.is_empty() {
        return Err(EngineError::invalid("retain_range must not be empty"));
    }

    let mut candidates = Vec::with_capacity(retain_range.len());
    let mut best: Option<(usize, f64)> = None;

    for &retain_count in retain_range {
        let result = evaluate(retain_count)?;
        let mean_gain = result.mean_gain();

        debug!(retain_count, mean_gain, "Candidate evaluated");

        if best.map_or(true, |(_, best_gain)| mean_gain > best_gain) {
            best = Some((retain_count, mean_gain));
        }
        candidates.push(SweepCandidate {
            retain_count,
            mean_gain,
            result,
        });
    }

    let (best_retain_count, best_mean_gain) = best
        .ok_or_else(|| EngineError::invalid("retain_range must not be empty"))?;

    info!(
        best_retain_count,
        best_mean_gain,
        candidates = candidates.len(),
        "Best retain count found"
    );

    Ok(SweepOutcome {
        best_retain_count,
        best_mean_gain,
        candidates,
    })
}

/// Run the simulation for every retain count in `retain_range` and return the
/// one with the highest mean gain. `config.retain_count` is ignored.
pub fn find_best_retain_count(
    input: &SimulationInput<'_>,
    retain_range: &[usize],
    config: &SimulationConfig,
) -> EngineResult<SweepOutcome> {
    find_best_retain_count_with_progress(input, retain_range, config, None)
}

pub fn find_best_retain_count_with_progress(
    input: &SimulationInput<'_>,
    retain_range: &[usize],
    config: &SimulationConfig,
    progress: Option<&RunProgress>,
) -> EngineResult<SweepOutcome> {
    let outcome = run_sweep(input, retain_range, config, progress);
    if let Some(p) = progress {
        match &outcome {
            Ok(_) => p.set_status(RunStatus::Complete),
            Err(e) => p.fail(e.to_string()),
        }
    }
    outcome
}

fn run_sweep(
    input: &SimulationInput<'_>,
    retain_range: &[usize],
    config: &SimulationConfig,
    progress: Option<&RunProgress>,
) -> EngineResult<SweepOutcome> {
    if retain_range.is_empty() {
        return Err(EngineError::invalid("retain_range must not be empty"));
    }
    config.validate()?;

    let seed = config.seed.unwrap_or_else(fresh_seed);

    info!(
        candidates = retain_range.len(),
        trials = config.trial_count,
        seed,
        "Starting retain count sweep"
    );

    if let Some(p) = progress {
        p.set_status(RunStatus::BuildingRosters);
        p.total_trials
            .store(retain_range.len() * config.trial_count, Ordering::Relaxed);
        p.completed_trials.store(0, Ordering::Relaxed);
    }

    let baseline = prepare_baseline(input, config.ordering)?;

    sweep_with(retain_range, |retain_count| {
        let candidate = SimulationConfig {
            retain_count,
            seed: Some(seed),
            ..config.clone()
        };
        simulate_baseline(&baseline, &candidate, progress)
    })
}
