//! Reallocation Engine
//!
//! Redistributes competitors displaced from the gold competition across the
//! normal competitions. Where each competitor goes is decided by a pluggable
//! [`AssignmentStrategy`]; both shipped strategies draw competitions with
//! probability proportional to payout.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::trace;

use crate::error::EngineResult;
use crate::ordering::RosterOrdering;
use crate::payout::PayoutWeights;
use crate::roster::Roster;
use crate::sampling::{sample_distinct, sample_one};
use crate::types::{RosterEntry, RosterSet};

// ============================================================================
// Assignment policies
// ============================================================================

/// Which assignment strategy a run uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentPolicy {
    /// Exactly one competition per displaced competitor
    Single,
    /// Between one and half of the normal competitions per displaced competitor
    #[default]
    Multi,
}

impl std::fmt::Display for AssignmentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentPolicy::Single => write!(f, "single"),
            AssignmentPolicy::Multi => write!(f, "multi"),
        }
    }
}

impl std::str::FromStr for AssignmentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(AssignmentPolicy::Single),
            "multi" => Ok(AssignmentPolicy::Multi),
            other => Err(format!("unknown assignment policy '{other}'")),
        }
    }
}

/// Picks the normal competitions one displaced competitor joins.
///
/// Returns indices into `weights.ids()`, without repeats.
pub trait AssignmentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn choose(&self, weights: &PayoutWeights, rng: &mut StdRng) -> EngineResult<Vec<usize>>;
}

/// One weighted draw per competitor
pub struct SingleAssignment;

impl AssignmentStrategy for SingleAssignment {
    fn name(&self) -> &'static str {
        "single"
    }

    fn choose(&self, weights: &PayoutWeights, rng: &mut StdRng) -> EngineResult<Vec<usize>> {
        Ok(vec![sample_one(weights.probabilities(), rng)?])
    }
}

/// Draw `k` uniformly from `[1, n/2 + 1)`, then `k` distinct competitions
/// weighted by payout without replacement
pub struct MultiAssignment;

impl MultiAssignment {
    /// Exclusive upper bound for `k`; at least 2 so a single competition still gets `k = 1`
    fn k_upper_bound(population: usize) -> usize {
        (population / 2 + 1).max(2)
    }
}

impl AssignmentStrategy for MultiAssignment {
    fn name(&self) -> &'static str {
        "multi"
    }

    fn choose(&self, weights: &PayoutWeights, rng: &mut StdRng) -> EngineResult<Vec<usize>> {
        let n = weights.len();
        let k = rng.gen_range(1..Self::k_upper_bound(n)).min(n);
        sample_distinct(weights.probabilities(), k, rng)
    }
}

pub fn build_assignment_strategy(policy: AssignmentPolicy) -> Box<dyn AssignmentStrategy> {
    match policy {
        AssignmentPolicy::Single => Box::new(SingleAssignment),
        AssignmentPolicy::Multi => Box::new(MultiAssignment),
    }
}

// ============================================================================
// Reallocation
// ============================================================================

/// Place every displaced competitor into the competitions chosen by `strategy`.
///
/// Works on a copy of `base_rosters`; the input set is left untouched. A
/// competitor already on a target roster is not added twice. Every roster
/// that gained a competitor is re-sorted with `ordering`.
pub fn reallocate(
    displaced: &[RosterEntry],
    weights: &PayoutWeights,
    base_rosters: &RosterSet,
    strategy: &dyn AssignmentStrategy,
    ordering: RosterOrdering,
    rng: &mut StdRng,
) -> EngineResult<RosterSet> {
    let mut rosters = base_rosters.clone();
    for id in weights.ids() {
        rosters.entry(id.clone()).or_insert_with(Roster::new);
    }

    let mut touched: BTreeSet<&str> = BTreeSet::new();
    for entry in displaced {
        for index in strategy.choose(weights, rng)? {
            let id = weights.ids()[index].as_str();
            if let Some(roster) = rosters.get_mut(id) {
                if roster.insert(entry.clone()) {
                    touched.insert(id);
                }
            }
        }
    }

    for id in &touched {
        if let Some(roster) = rosters.get_mut(*id) {
            roster.sort(ordering);
        }
    }

    trace!(
        strategy = strategy.name(),
        displaced = displaced.len(),
        rosters_changed = touched.len(),
        "Reallocation done"
    );

    Ok(rosters)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payout::CompetitionPayoutTable;
    use crate::sampling::trial_rng;
    use crate::types::Tier;
    use std::collections::{BTreeMap, HashSet};

    fn weights(payouts: &[(&str, f64)]) -> PayoutWeights {
        let mut map: BTreeMap<String, f64> =
            payouts.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        map.insert("gold".into(), 1_000.0);
        let table = CompetitionPayoutTable::new("gold", map).unwrap();
        PayoutWeights::from_table(&table, &table.normal_ids()).unwrap()
    }

    fn displaced() -> Vec<RosterEntry> {
        vec![
            RosterEntry::new("B", Tier::Master, 200.0),
            RosterEntry::new("A", Tier::Expert, 100.0),
        ]
    }

    fn base_rosters(ids: &[&str]) -> RosterSet {
        ids.iter()
            .map(|id| {
                let roster = Roster::from_entries(
                    vec![
                        RosterEntry::new(format!("{id}-top"), Tier::Grandmaster, 150.0),
                        RosterEntry::new(format!("{id}-low"), Tier::Expert, 10.0),
                    ],
                    RosterOrdering::PointsDescending,
                );
                (id.to_string(), roster)
            })
            .collect()
    }

    #[test]
    fn test_single_assignment_places_each_user_once() {
        let w = weights(&[("x", 10.0), ("y", 90.0)]);
        let base = base_rosters(&["x", "y"]);
        for seed in 0..100 {
            let mut rng = trial_rng(seed, 0);
            let after = reallocate(
                &displaced(),
                &w,
                &base,
                &SingleAssignment,
                RosterOrdering::PointsDescending,
                &mut rng,
            )
            .unwrap();
            for user in ["A", "B"] {
                let placements = after.values().filter(|r| r.contains(user)).count();
                assert_eq!(placements, 1);
            }
        }
    }

    #[test]
    fn test_single_assignment_follows_payout_weights() {
        let w = weights(&[("x", 10.0), ("y", 90.0)]);
        let base = base_rosters(&["x", "y"]);
        let trials = 10_000;
        let mut in_y = 0;
        for trial in 0..trials {
            let mut rng = trial_rng(2018, trial);
            let after = reallocate(
                &displaced(),
                &w,
                &base,
                &SingleAssignment,
                RosterOrdering::PointsDescending,
                &mut rng,
            )
            .unwrap();
            if after["y"].contains("B") {
                in_y += 1;
            }
        }
        let freq = in_y as f64 / trials as f64;
        assert!((freq - 0.9).abs() < 0.02, "B landed in y with frequency {freq}");
    }

    #[test]
    fn test_multi_assignment_k_within_bounds() {
        let w = weights(&[("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0), ("e", 5.0)]);
        let mut seen_k = HashSet::new();
        for seed in 0..500 {
            let mut rng = trial_rng(seed, 0);
            let chosen = MultiAssignment.choose(&w, &mut rng).unwrap();
            assert!((1..=2).contains(&chosen.len()), "k = {}", chosen.len());
            let unique: HashSet<_> = chosen.iter().collect();
            assert_eq!(unique.len(), chosen.len());
            seen_k.insert(chosen.len());
        }
        assert_eq!(seen_k.len(), 2);
    }

    #[test]
    fn test_multi_assignment_single_competition() {
        let w = weights(&[("only", 5.0)]);
        let mut rng = trial_rng(3, 0);
        assert_eq!(MultiAssignment.choose(&w, &mut rng).unwrap(), vec![0]);
    }

    #[test]
    fn test_multi_assignment_two_competitions_draws_one() {
        // n = 2 gives k in [1, 2), so exactly one competition each time
        let w = weights(&[("x", 1.0), ("y", 1.0)]);
        for seed in 0..100 {
            let mut rng = trial_rng(seed, 0);
            assert_eq!(MultiAssignment.choose(&w, &mut rng).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_reallocate_never_duplicates() {
        let w = weights(&[("x", 1.0), ("y", 2.0), ("z", 3.0), ("v", 4.0)]);
        let mut base = base_rosters(&["x", "y", "z", "v"]);
        // "B" already competes in z before reallocation
        base.get_mut("z")
            .unwrap()
            .insert(RosterEntry::new("B", Tier::Master, 200.0));
        base.get_mut("z").unwrap().sort(RosterOrdering::PointsDescending);

        for policy in [AssignmentPolicy::Single, AssignmentPolicy::Multi] {
            let strategy = build_assignment_strategy(policy);
            for seed in 0..300 {
                let mut rng = trial_rng(seed, 1);
                let after = reallocate(
                    &displaced(),
                    &w,
                    &base,
                    strategy.as_ref(),
                    RosterOrdering::PointsDescending,
                    &mut rng,
                )
                .unwrap();
                for roster in after.values() {
                    let users: Vec<&str> = roster.users().collect();
                    let unique: HashSet<&str> = users.iter().copied().collect();
                    assert_eq!(users.len(), unique.len());
                    assert!(RosterOrdering::PointsDescending.is_sorted(roster.entries()));
                }
            }
        }
    }

    #[test]
    fn test_reallocate_leaves_base_untouched() {
        let w = weights(&[("x", 1.0), ("y", 1.0)]);
        let base = base_rosters(&["x", "y"]);
        let snapshot = base.clone();
        let mut rng = trial_rng(9, 0);
        let after = reallocate(
            &displaced(),
            &w,
            &base,
            &MultiAssignment,
            RosterOrdering::PointsDescending,
            &mut rng,
        )
        .unwrap();
        assert_eq!(base, snapshot);
        assert_ne!(after, base);
    }

    #[test]
    fn test_reallocate_resorts_with_ordering() {
        let w = weights(&[("x", 1.0)]);
        let base = base_rosters(&["x"]);
        let mut rng = trial_rng(0, 0);
        let after = reallocate(
            &displaced(),
            &w,
            &base,
            &SingleAssignment,
            RosterOrdering::PointsDescending,
            &mut rng,
        )
        .unwrap();
        let users: Vec<&str> = after["x"].users().collect();
        assert_eq!(users, vec!["B", "x-top", "A", "x-low"]);

        let mut rng = trial_rng(0, 0);
        let after = reallocate(
            &displaced(),
            &w,
            &base,
            &SingleAssignment,
            RosterOrdering::TierThenPoints,
            &mut rng,
        )
        .unwrap();
        let users: Vec<&str> = after["x"].users().collect();
        assert_eq!(users, vec!["x-top", "B", "A", "x-low"]);
    }

    #[test]
    fn test_reallocate_empty_displaced_is_identity() {
        let w = weights(&[("x", 1.0), ("y", 3.0)]);
        let base = base_rosters(&["x", "y"]);
        let mut rng = trial_rng(4, 0);
        let after = reallocate(
            &[],
            &w,
            &base,
            &MultiAssignment,
            RosterOrdering::PointsDescending,
            &mut rng,
        )
        .unwrap();
        assert_eq!(after, base);
    }

    #[test]
    fn test_policy_parse_and_display() {
        assert_eq!("single".parse::<AssignmentPolicy>().unwrap(), AssignmentPolicy::Single);
        assert_eq!("MULTI".parse::<AssignmentPolicy>().unwrap(), AssignmentPolicy::Multi);
        assert!("random".parse::<AssignmentPolicy>().is_err());
        assert_eq!(AssignmentPolicy::default().to_string(), "multi");
        assert_eq!(build_assignment_strategy(AssignmentPolicy::Single).name(), "single");
    }
}
