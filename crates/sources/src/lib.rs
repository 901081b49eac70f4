//! File-backed data sources for the gold-cap simulation
//!
//! Reads the hand-off data of the external collaborators: the ranking dump
//! written by the scraper, the per-competition leaderboard snapshots and the
//! payout table.

pub mod leaderboard;
pub mod payouts;
pub mod users;

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Malformed data: {0}")]
    Malformed(String),
}

impl SourceError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        SourceError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

pub use leaderboard::{discover_competitions, parse_leaderboard, CsvLeaderboardSource};
pub use payouts::{default_payout_table, load_payout_table, parse_payout_table};
pub use users::{load_user_table, parse_user_table};
