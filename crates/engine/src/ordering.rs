//! Roster ordering policies
//!
//! Two orderings exist: a plain points sort (production) and a stratified sort
//! where tier dominates and points order competitors within a tier. Both sorts
//! are stable, so equal keys keep their incoming order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::types::RosterEntry;

/// Named comparator used to sort every roster in a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterOrdering {
    /// Points descending
    #[default]
    PointsDescending,
    /// Grandmasters, then masters, then experts; points descending within each tier
    TierThenPoints,
}

impl RosterOrdering {
    pub fn compare(&self, a: &RosterEntry, b: &RosterEntry) -> Ordering {
        match self {
            RosterOrdering::PointsDescending => b.points().total_cmp(&a.points()),
            RosterOrdering::TierThenPoints => a
                .tier()
                .rank()
                .cmp(&b.tier().rank())
                .then_with(|| b.points().total_cmp(&a.points())),
        }
    }

    /// Stable sort of `entries` under this ordering
    pub fn sort(&self, entries: &mut [RosterEntry]) {
        entries.sort_by(|a, b| self.compare(a, b));
    }

    pub fn is_sorted(&self, entries: &[RosterEntry]) -> bool {
        entries
            .windows(2)
            .all(|w| self.compare(&w[0], &w[1]) != Ordering::Greater)
    }
}

impl std::fmt::Display for RosterOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterOrdering::PointsDescending => write!(f, "points"),
            RosterOrdering::TierThenPoints => write!(f, "tier-then-points"),
        }
    }
}

impl std::str::FromStr for RosterOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "points" | "points_descending" => Ok(RosterOrdering::PointsDescending),
            "tier" | "tier-then-points" | "tier_then_points" => Ok(RosterOrdering::TierThenPoints),
            other => Err(format!("unknown roster ordering '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tier;

    fn sample() -> Vec<RosterEntry> {
        vec![
            RosterEntry::new("expert_high", Tier::Expert, 500.0),
            RosterEntry::new("gm_low", Tier::Grandmaster, 100.0),
            RosterEntry::new("master_mid", Tier::Master, 300.0),
        ]
    }

    fn names(entries: &[RosterEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.user.as_str()).collect()
    }

    #[test]
    fn test_default_is_points_descending() {
        assert_eq!(RosterOrdering::default(), RosterOrdering::PointsDescending);
    }

    #[test]
    fn test_points_descending_ignores_tier() {
        let mut entries = sample();
        RosterOrdering::PointsDescending.sort(&mut entries);
        assert_eq!(names(&entries), vec!["expert_high", "master_mid", "gm_low"]);
    }

    #[test]
    fn test_tier_then_points_stratifies() {
        let mut entries = sample();
        RosterOrdering::TierThenPoints.sort(&mut entries);
        assert_eq!(names(&entries), vec!["gm_low", "master_mid", "expert_high"]);
        assert!(RosterOrdering::TierThenPoints.is_sorted(&entries));
        assert!(!RosterOrdering::PointsDescending.is_sorted(&entries));
    }

    #[test]
    fn test_ties_keep_incoming_order() {
        let mut entries = vec![
            RosterEntry::new("first", Tier::Expert, 50.0),
            RosterEntry::new("second", Tier::Master, 50.0),
            RosterEntry::new("third", Tier::Expert, 50.0),
        ];
        RosterOrdering::PointsDescending.sort(&mut entries);
        assert_eq!(names(&entries), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_parse_ordering() {
        assert_eq!(
            "points".parse::<RosterOrdering>().unwrap(),
            RosterOrdering::PointsDescending
        );
        assert_eq!(
            "tier-then-points".parse::<RosterOrdering>().unwrap(),
            RosterOrdering::TierThenPoints
        );
        assert!("alphabetical".parse::<RosterOrdering>().is_err());
    }
}
