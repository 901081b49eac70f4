//! Seeded weighted sampling
//!
//! Every trial draws from its own `StdRng`, seeded from the run seed mixed with
//! the trial index, so trials can run in any order on any thread.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::EngineResult;

/// Odd 64-bit golden-ratio constant used to spread trial indices
const TRIAL_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Generator for trial `trial` of a run seeded with `run_seed`
pub fn trial_rng(run_seed: u64, trial: usize) -> StdRng {
    StdRng::seed_from_u64(run_seed ^ (trial as u64).wrapping_mul(TRIAL_MIX))
}

/// Draw a run seed when none was configured
pub fn fresh_seed() -> u64 {
    rand::thread_rng().gen()
}

/// One index drawn with probability proportional to `weights`
pub fn sample_one<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> EngineResult<usize> {
    let dist = WeightedIndex::<f64>::new(weights)?;
    Ok(dist.sample(rng))
}

/// `k` distinct indices drawn without replacement, weighted by `weights`.
///
/// `k` is clamped to the population size; `k == weights.len()` returns every
/// index.
pub fn sample_distinct<R: Rng + ?Sized>(
    weights: &[f64],
    k: usize,
    rng: &mut R,
) -> EngineResult<Vec<usize>> {
    let k = k.min(weights.len());
    if k == 0 {
        return Ok(Vec::new());
    }
    let population: Vec<usize> = (0..weights.len()).collect();
    let chosen = population
        .choose_multiple_weighted(rng, k, |&i| weights[i])?
        .copied()
        .collect();
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_trial_rng_reproducible() {
        let a: Vec<u32> = (0..5).map(|_| trial_rng(42, 3).gen()).collect();
        let b: Vec<u32> = (0..5).map(|_| trial_rng(42, 3).gen()).collect();
        assert_eq!(a, b);

        let mut first = trial_rng(42, 0);
        let mut second = trial_rng(42, 1);
        assert_ne!(first.gen::<u64>(), second.gen::<u64>());
    }

    #[test]
    fn test_adjacent_run_seeds_do_not_share_trials() {
        for seed in [0u64, 1, 42, 1_000_000] {
            for trial in 1..50usize {
                let mut shifted = trial_rng(seed, trial);
                let mut neighbour = trial_rng(seed + trial as u64, 0);
                assert_ne!(shifted.gen::<u64>(), neighbour.gen::<u64>());
            }
        }
    }

    #[test]
    fn test_sample_one_respects_zero_weight() {
        let mut rng = trial_rng(7, 0);
        for _ in 0..1000 {
            assert_eq!(sample_one(&[0.0, 1.0, 0.0], &mut rng).unwrap(), 1);
        }
    }

    #[test]
    fn test_sample_one_frequency() {
        let mut rng = trial_rng(11, 0);
        let draws = 20_000;
        let hits = (0..draws)
            .filter(|_| sample_one(&[0.1, 0.9], &mut rng).unwrap() == 1)
            .count();
        let freq = hits as f64 / draws as f64;
        assert!((freq - 0.9).abs() < 0.02, "frequency {freq}");
    }

    #[test]
    fn test_sample_one_rejects_invalid_weights() {
        let mut rng = trial_rng(1, 0);
        assert!(matches!(
            sample_one(&[], &mut rng),
            Err(EngineError::Sampling(_))
        ));
        assert!(matches!(
            sample_one(&[-1.0, 2.0], &mut rng),
            Err(EngineError::Sampling(_))
        ));
    }

    #[test]
    fn test_sample_distinct_full_population() {
        let weights = [0.5, 0.2, 0.2, 0.1];
        for seed in 0..200 {
            let mut rng = trial_rng(seed, 0);
            let mut chosen = sample_distinct(&weights, weights.len(), &mut rng).unwrap();
            chosen.sort_unstable();
            assert_eq!(chosen, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_sample_distinct_clamps_k() {
        let mut rng = trial_rng(5, 0);
        let mut chosen = sample_distinct(&[0.3, 0.7], 10, &mut rng).unwrap();
        chosen.sort_unstable();
        assert_eq!(chosen, vec![0, 1]);
        assert!(sample_distinct(&[0.3, 0.7], 0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_sample_distinct_no_repeats() {
        let weights = [0.05, 0.05, 0.6, 0.1, 0.2];
        for seed in 0..500 {
            let mut rng = trial_rng(seed, 9);
            let mut chosen = sample_distinct(&weights, 3, &mut rng).unwrap();
            assert_eq!(chosen.len(), 3);
            chosen.sort_unstable();
            chosen.dedup();
            assert_eq!(chosen.len(), 3);
        }
    }
}
