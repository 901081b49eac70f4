//! Ranking dump → `UserInfoTable`
//!
//! The scraper stores the concatenated `list` arrays of the ranking API. A raw
//! page (`{"list": [...]}`) or a list of pages is accepted as well.

use engine::{Tier, UserInfoTable, UserRecord};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

use crate::{SourceError, SourceResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankingRecord {
    display_name: String,
    tier: String,
    points: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RankingPage {
    list: Vec<RankingRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RankingDump {
    Records(Vec<RankingRecord>),
    Page(RankingPage),
    Pages(Vec<RankingPage>),
}

impl RankingDump {
    fn into_records(self) -> Vec<RankingRecord> {
        match self {
            RankingDump::Records(records) => records,
            RankingDump::Page(page) => page.list,
            RankingDump::Pages(pages) => pages.into_iter().flat_map(|p| p.list).collect(),
        }
    }
}

/// Parse a ranking dump. Non-qualifying tiers are dropped; missing, negative
/// or non-finite points make the whole dump malformed.
pub fn parse_user_table<R: Read>(reader: R) -> SourceResult<UserInfoTable> {
    let dump: RankingDump = serde_json::from_reader(reader)?;
    let records = dump.into_records();
    let total = records.len();

    let mut converted = Vec::with_capacity(total);
    for record in records {
        let points = record.points.ok_or_else(|| {
            SourceError::Malformed(format!("user '{}' has no points", record.display_name))
        })?;
        if !points.is_finite() || points < 0.0 {
            return Err(SourceError::Malformed(format!(
                "user '{}' has invalid points {points}",
                record.display_name
            )));
        }
        converted.push(UserRecord {
            identity: record.display_name,
            tier: Tier::from_label(&record.tier),
            points,
        });
    }

    let table = UserInfoTable::from_records(converted);
    let dropped = total - table.len();
    if dropped > 0 {
        warn!(dropped, "Ranking records dropped (non-qualifying tier or repeated name)");
    }
    info!(users = table.len(), "User table loaded");

    Ok(table)
}

pub fn load_user_table(path: impl AsRef<Path>) -> SourceResult<UserInfoTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SourceError::io(path, e))?;
    parse_user_table(BufReader::new(file))
}
