//! Payout table: JSON file or the built-in 2018 table

use engine::CompetitionPayoutTable;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::{SourceError, SourceResult};

#[derive(Debug, Deserialize)]
struct PayoutFile {
    gold: String,
    payouts: BTreeMap<String, f64>,
}

/// Parse `{"gold": "<id>", "payouts": {"<id>": amount, ...}}`
pub fn parse_payout_table<R: Read>(reader: R) -> SourceResult<CompetitionPayoutTable> {
    let file: PayoutFile = serde_json::from_reader(reader)?;
    CompetitionPayoutTable::new(file.gold, file.payouts)
        .map_err(|e| SourceError::Malformed(e.to_string()))
}

pub fn load_payout_table(path: impl AsRef<Path>) -> SourceResult<CompetitionPayoutTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SourceError::io(path, e))?;
    parse_payout_table(BufReader::new(file))
}

/// Competitions running in late 2018, gold = Two Sigma financial news
pub fn default_payout_table() -> CompetitionPayoutTable {
    let payouts = [
        ("two-sigma-financial-news", 100_000.0),
        ("ga-customer-revenue-prediction", 45_000.0),
        ("humpback-whale-identification", 25_000.0),
        ("airbus-ship-detection", 60_000.0),
        ("human-protein-atlas-image-classification", 37_000.0),
        ("quora-insincere-questions-classification", 25_000.0),
        ("NFL-Punt-Analytics-Competition", 80_000.0),
        ("inclusive-images-challenge", 25_000.0),
        ("elo-merchant-category-recommendation", 50_000.0),
        ("quickdraw-doodle-recognition", 25_000.0),
        ("traveling-santa-2018-prime-paths", 25_000.0),
        ("PLAsTiCC-2018", 25_000.0),
    ]
    .into_iter()
    .map(|(id, amount)| (id.to_string(), amount))
    .collect();

    CompetitionPayoutTable {
        gold: "two-sigma-financial-news".to_string(),
        payouts,
    }
}
