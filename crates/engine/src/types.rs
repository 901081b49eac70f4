//! Core types shared by the roster builder, reallocation engine and simulation driver

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Skill tier of a ranked competitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Grandmaster,
    Master,
    Expert,
    Other,
}

impl Tier {
    /// Parse a tier label as published by the ranking API. Unknown labels map to `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "grandmaster" => Tier::Grandmaster,
            "master" => Tier::Master,
            "expert" => Tier::Expert,
            _ => Tier::Other,
        }
    }

    /// Rank used by stratified orderings (lower sorts first)
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Grandmaster => 0,
            Tier::Master => 1,
            Tier::Expert => 2,
            Tier::Other => 3,
        }
    }

    /// Whether competitors of this tier take part in the simulation
    pub fn is_qualifying(&self) -> bool {
        !matches!(self, Tier::Other)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Grandmaster => write!(f, "grandmaster"),
            Tier::Master => write!(f, "master"),
            Tier::Expert => write!(f, "expert"),
            Tier::Other => write!(f, "other"),
        }
    }
}

/// Tier and point score of one user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub tier: Tier,
    pub points: f64,
}

/// A single ranking record as handed off by the ranking collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub identity: String,
    pub tier: Tier,
    pub points: f64,
}

/// Global mapping from user identity to (tier, points).
///
/// Built once per run and read-only afterwards. Only qualifying tiers are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfoTable {
    users: HashMap<String, UserStats>,
}

impl UserInfoTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from ranking records. A repeated identity keeps its last record;
    /// non-qualifying tiers are dropped.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = UserRecord>,
    {
        let mut table = Self::new();
        for record in records {
            table.insert(record.identity, record.tier, record.points);
        }
        table
    }

    /// Insert or replace a user. Returns false if the tier does not qualify.
    pub fn insert(&mut self, identity: impl Into<String>, tier: Tier, points: f64) -> bool {
        if !tier.is_qualifying() {
            return false;
        }
        self.users.insert(identity.into(), UserStats { tier, points });
        true
    }

    pub fn get(&self, identity: &str) -> Option<&UserStats> {
        self.users.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.users.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// One competitor on a roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub user: String,
    pub stats: UserStats,
}

impl RosterEntry {
    pub fn new(user: impl Into<String>, tier: Tier, points: f64) -> Self {
        Self {
            user: user.into(),
            stats: UserStats { tier, points },
        }
    }

    pub fn points(&self) -> f64 {
        self.stats.points
    }

    pub fn tier(&self) -> Tier {
        self.stats.tier
    }
}

/// Count of qualifying competitors per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub grandmaster: usize,
    pub master: usize,
    pub expert: usize,
}

impl TierCounts {
    pub fn from_entries(entries: &[RosterEntry]) -> Self {
        let mut counts = Self::default();
        for entry in entries {
            match entry.tier() {
                Tier::Grandmaster => counts.grandmaster += 1,
                Tier::Master => counts.master += 1,
                Tier::Expert => counts.expert += 1,
                Tier::Other => {}
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.grandmaster + self.master + self.expert
    }
}

/// Rosters of every normal competition, keyed by competition identifier
pub type RosterSet = BTreeMap<String, crate::roster::Roster>;

/// Average welfare gain per competition after a full simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub retain_count: usize,
    pub trial_count: usize,
    /// Run-level seed every trial seed is derived from
    pub seed: u64,
    pub policy: crate::reallocation::AssignmentPolicy,
    pub ordering: crate::ordering::RosterOrdering,
    pub retained: Vec<String>,
    pub displaced: Vec<String>,
    #[serde(default)]
    pub retained_tiers: TierCounts,
    #[serde(default)]
    pub displaced_tiers: TierCounts,
    /// Welfare of each normal competition before reallocation
    pub baseline_welfare: BTreeMap<String, f64>,
    pub average_gains: BTreeMap<String, f64>,
}

impl SimulationResult {
    /// Mean of the per-competition average gains. Zero when there are no competitions.
    pub fn mean_gain(&self) -> f64 {
        if self.average_gains.is_empty() {
            return 0.0;
        }
        self.average_gains.values().sum::<f64>() / self.average_gains.len() as f64
    }

    pub fn gain_for(&self, competition: &str) -> Option<f64> {
        self.average_gains.get(competition).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_label() {
        assert_eq!(Tier::from_label("Grandmaster"), Tier::Grandmaster);
        assert_eq!(Tier::from_label(" master "), Tier::Master);
        assert_eq!(Tier::from_label("expert"), Tier::Expert);
        assert_eq!(Tier::from_label("contributor"), Tier::Other);
        assert_eq!(Tier::from_label("novice"), Tier::Other);
    }

    #[test]
    fn test_user_table_drops_other_tier() {
        let table = UserInfoTable::from_records(vec![
            UserRecord {
                identity: "alice".into(),
                tier: Tier::Expert,
                points: 10.0,
            },
            UserRecord {
                identity: "bob".into(),
                tier: Tier::Other,
                points: 99.0,
            },
        ]);
        assert_eq!(table.len(), 1);
        assert!(table.contains("alice"));
        assert!(!table.contains("bob"));
    }

    #[test]
    fn test_user_table_last_record_wins() {
        let table = UserInfoTable::from_records(vec![
            UserRecord {
                identity: "alice".into(),
                tier: Tier::Expert,
                points: 10.0,
            },
            UserRecord {
                identity: "alice".into(),
                tier: Tier::Master,
                points: 50.0,
            },
        ]);
        let stats = table.get("alice").unwrap();
        assert_eq!(stats.tier, Tier::Master);
        assert_eq!(stats.points, 50.0);
    }

    #[test]
    fn test_mean_gain_empty() {
        let result = SimulationResult {
            retain_count: 0,
            trial_count: 1,
            seed: 0,
            policy: crate::reallocation::AssignmentPolicy::Multi,
            ordering: crate::ordering::RosterOrdering::PointsDescending,
            retained: vec![],
            displaced: vec![],
            retained_tiers: TierCounts::default(),
            displaced_tiers: TierCounts::default(),
            baseline_welfare: BTreeMap::new(),
            average_gains: BTreeMap::new(),
        };
        assert_eq!(result.mean_gain(), 0.0);
    }

    #[test]
    fn test_result_json_shape() {
        let result = SimulationResult {
            retain_count: 25,
            trial_count: 100,
            seed: 7,
            policy: crate::reallocation::AssignmentPolicy::Multi,
            ordering: crate::ordering::RosterOrdering::TierThenPoints,
            retained: vec!["C".into()],
            displaced: vec!["B".into(), "A".into()],
            retained_tiers: TierCounts {
                grandmaster: 1,
                ..TierCounts::default()
            },
            displaced_tiers: TierCounts {
                master: 1,
                expert: 1,
                ..TierCounts::default()
            },
            baseline_welfare: BTreeMap::from([("x".to_string(), 10.0)]),
            average_gains: BTreeMap::from([("x".to_string(), 2.0), ("y".to_string(), 4.0)]),
        };
        assert_eq!(result.mean_gain(), 3.0);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["policy"], "multi");
        assert_eq!(json["ordering"], "tier_then_points");
        assert_eq!(json["average_gains"]["y"], 4.0);
        assert_eq!(json["displaced_tiers"]["expert"], 1);
        assert_eq!(json["retained_tiers"]["grandmaster"], 1);
        assert_eq!(serde_json::to_value(Tier::Grandmaster).unwrap(), "grandmaster");
    }
}
