//! Leaderboard snapshots stored as CSV
//!
//! Layout: `<root>/<competition>/<competition>-publicleaderboard.csv`, one row
//! per team, identities in the `TeamName` column.

use engine::{EngineError, EngineResult, LeaderboardSource};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{SourceError, SourceResult};

const IDENTITY_COLUMN: &str = "TeamName";
/// Column used when the header has no `TeamName`
const FALLBACK_COLUMN: usize = 1;

/// Competitor identities of one leaderboard CSV, in file order
pub fn parse_leaderboard<R: Read>(reader: R) -> SourceResult<Vec<String>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let column = csv_reader
        .headers()?
        .iter()
        .position(|h| h.trim() == IDENTITY_COLUMN)
        .unwrap_or(FALLBACK_COLUMN);

    let mut competitors = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let name = record.get(column).ok_or_else(|| {
            SourceError::Malformed(format!("row {} has no column {}", row + 1, column))
        })?;
        competitors.push(name.to_string());
    }
    Ok(competitors)
}

/// Leaderboards read from a directory of CSV snapshots
#[derive(Debug, Clone)]
pub struct CsvLeaderboardSource {
    root: PathBuf,
}

impl CsvLeaderboardSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, competition_id: &str) -> PathBuf {
        self.root
            .join(competition_id)
            .join(format!("{competition_id}-publicleaderboard.csv"))
    }

    fn read(&self, competition_id: &str) -> SourceResult<Vec<String>> {
        let path = self.path_for(competition_id);
        let file = File::open(&path).map_err(|e| SourceError::io(&path, e))?;
        let competitors = parse_leaderboard(BufReader::new(file))?;
        debug!(
            competition = competition_id,
            rows = competitors.len(),
            "Leaderboard loaded"
        );
        Ok(competitors)
    }
}

impl LeaderboardSource for CsvLeaderboardSource {
    fn competitors(&self, competition_id: &str) -> EngineResult<Vec<String>> {
        self.read(competition_id)
            .map_err(|e| EngineError::data_source(competition_id, e))
    }
}

/// Competition directories under `root`, sorted, hidden entries skipped
pub fn discover_competitions(root: impl AsRef<Path>) -> SourceResult<Vec<String>> {
    let root = root.as_ref();
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root).map_err(|e| SourceError::io(root, e))? {
        let entry = entry.map_err(|e| SourceError::io(root, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| SourceError::io(entry.path(), e))?
            .is_dir();
        let name = entry.file_name().to_string_lossy().to_string();
        if is_dir && !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
