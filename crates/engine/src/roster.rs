//! Roster Builder — per-competition lists of qualifying competitors
//!
//! A roster is the intersection of a competition's leaderboard with the global
//! user table, sorted by the run's [`RosterOrdering`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::ordering::RosterOrdering;
use crate::types::{RosterEntry, TierCounts, UserInfoTable};

// ---------------------------------------------------------------------------
// Leaderboard source
// ---------------------------------------------------------------------------

/// Supplies the competitor identities present on a competition's leaderboard.
///
/// Identities are returned in leaderboard order; that order is the tie-break
/// for competitors with equal sort keys.
pub trait LeaderboardSource: Send + Sync {
    fn competitors(&self, competition_id: &str) -> EngineResult<Vec<String>>;
}

/// Leaderboards held in memory, keyed by competition identifier
#[derive(Debug, Clone, Default)]
pub struct InMemoryLeaderboards {
    boards: HashMap<String, Vec<String>>,
}

impl InMemoryLeaderboards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_board<I, S>(mut self, competition_id: &str, competitors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(competition_id, competitors);
        self
    }

    pub fn insert<I, S>(&mut self, competition_id: &str, competitors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.boards.insert(
            competition_id.to_string(),
            competitors.into_iter().map(Into::into).collect(),
        );
    }
}

impl LeaderboardSource for InMemoryLeaderboards {
    fn competitors(&self, competition_id: &str) -> EngineResult<Vec<String>> {
        self.boards
            .get(competition_id)
            .cloned()
            .ok_or_else(|| EngineError::data_source(competition_id, "no leaderboard loaded"))
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Sorted competitors of one competition. Never holds the same user twice.
///
/// Serializes as the plain entry list; `members` is rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<RosterEntry>", into = "Vec<RosterEntry>")]
pub struct Roster {
    entries: Vec<RosterEntry>,
    members: HashSet<String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from entries: duplicates after the first are dropped,
    /// then the rest are sorted.
    pub fn from_entries(entries: Vec<RosterEntry>, ordering: RosterOrdering) -> Self {
        let mut roster = Self::from(entries);
        roster.sort(ordering);
        roster
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, user: &str) -> bool {
        self.members.contains(user)
    }

    /// Append `entry` unless the user is already on the roster.
    /// Returns whether the roster changed. Callers re-sort afterwards.
    pub fn insert(&mut self, entry: RosterEntry) -> bool {
        if !self.members.insert(entry.user.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn sort(&mut self, ordering: RosterOrdering) {
        ordering.sort(&mut self.entries);
    }

    /// Split into (retained, displaced) at `retain_count`. A count beyond the
    /// roster length retains everyone.
    pub fn split_at(&self, retain_count: usize) -> (Vec<RosterEntry>, Vec<RosterEntry>) {
        let cut = retain_count.min(self.entries.len());
        let (retained, displaced) = self.entries.split_at(cut);
        (retained.to_vec(), displaced.to_vec())
    }

    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.user.as_str())
    }

    pub fn tier_counts(&self) -> TierCounts {
        TierCounts::from_entries(&self.entries)
    }
}

/// Keeps entry order; duplicates after the first are dropped
impl From<Vec<RosterEntry>> for Roster {
    fn from(entries: Vec<RosterEntry>) -> Self {
        let mut roster = Self {
            entries: Vec::with_capacity(entries.len()),
            members: HashSet::with_capacity(entries.len()),
        };
        for entry in entries {
            roster.insert(entry);
        }
        roster
    }
}

impl From<Roster> for Vec<RosterEntry> {
    fn from(roster: Roster) -> Self {
        roster.entries
    }
}

/// Build the sorted roster of qualifying competitors for `competition_id`.
///
/// Leaderboard identities missing from `user_info` are dropped silently.
/// A source failure propagates as [`EngineError::DataSource`].
pub fn build_roster(
    competition_id: &str,
    user_info: &UserInfoTable,
    source: &dyn LeaderboardSource,
    ordering: RosterOrdering,
) -> EngineResult<Roster> {
    let competitors = source.competitors(competition_id)?;
    let listed = competitors.len();

    let mut seen: HashSet<&str> = HashSet::with_capacity(listed);
    let mut entries = Vec::new();
    for user in &competitors {
        if !seen.insert(user.as_str()) {
            continue;
        }
        if let Some(stats) = user_info.get(user) {
            entries.push(RosterEntry {
                user: user.clone(),
                stats: *stats,
            });
        }
    }

    let roster = Roster::from_entries(entries, ordering);

    debug!(
        competition = competition_id,
        listed,
        qualifying = roster.len(),
        "Roster built"
    );

    Ok(roster)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
