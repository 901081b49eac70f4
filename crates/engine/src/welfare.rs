//! Welfare Calculator
//!
//! Welfare of a competition = summed points of its top-K competitors.

use std::collections::BTreeMap;

use crate::roster::Roster;
use crate::types::RosterSet;

/// Sum of the points of the first `retain_count` entries of a sorted roster.
/// A count past the end sums the whole roster.
pub fn compute_welfare(roster: &Roster, retain_count: usize) -> f64 {
    roster
        .entries()
        .iter()
        .take(retain_count)
        .map(|e| e.points())
        .sum()
}

/// Welfare of every roster in the set
pub fn welfare_by_competition(rosters: &RosterSet, retain_count: usize) -> BTreeMap<String, f64> {
    rosters
        .iter()
        .map(|(id, roster)| (id.clone(), compute_welfare(roster, retain_count)))
        .collect()
}
