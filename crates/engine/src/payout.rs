//! Competition payouts and the payout-weighted assignment distribution
//!
//! The probability of a displaced competitor landing in a normal competition is
//! its payout divided by the sum of all normal payouts (gold excluded).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};

/// Static payout per competition, with one competition flagged as gold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionPayoutTable {
    pub gold: String,
    pub payouts: BTreeMap<String, f64>,
}

impl CompetitionPayoutTable {
    /// Create a table, rejecting a gold id without a payout and any payout
    /// that is not finite and positive.
    pub fn new(gold: impl Into<String>, payouts: BTreeMap<String, f64>) -> EngineResult<Self> {
        let table = Self {
            gold: gold.into(),
            payouts,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !self.payouts.contains_key(&self.gold) {
            return Err(EngineError::invalid(format!(
                "gold competition '{}' has no payout",
                self.gold
            )));
        }
        for (id, amount) in &self.payouts {
            if !amount.is_finite() || *amount <= 0.0 {
                return Err(EngineError::invalid(format!(
                    "payout for '{id}' must be positive, got {amount}"
                )));
            }
        }
        Ok(())
    }

    pub fn payout(&self, competition: &str) -> Option<f64> {
        self.payouts.get(competition).copied()
    }

    /// Every competition except gold, in identifier order
    pub fn normal_ids(&self) -> Vec<String> {
        self.payouts
            .keys()
            .filter(|id| **id != self.gold)
            .cloned()
            .collect()
    }
}

/// Probability distribution over normal competitions, proportional to payout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutWeights {
    ids: Vec<String>,
    probabilities: Vec<f64>,
}

impl PayoutWeights {
    /// Derive the weights of `normal_ids` from `table`.
    ///
    /// Fails if the list is empty, contains the gold competition or a
    /// duplicate, or names a competition without a payout.
    pub fn from_table(table: &CompetitionPayoutTable, normal_ids: &[String]) -> EngineResult<Self> {
        if normal_ids.is_empty() {
            return Err(EngineError::invalid("no normal competitions to reallocate into"));
        }

        let mut amounts = Vec::with_capacity(normal_ids.len());
        for (i, id) in normal_ids.iter().enumerate() {
            if *id == table.gold {
                return Err(EngineError::invalid(format!(
                    "gold competition '{id}' cannot receive displaced competitors"
                )));
            }
            if normal_ids[..i].contains(id) {
                return Err(EngineError::invalid(format!("competition '{id}' listed twice")));
            }
            let amount = table
                .payout(id)
                .ok_or_else(|| EngineError::invalid(format!("competition '{id}' has no payout")))?;
            if !amount.is_finite() || amount <= 0.0 {
                return Err(EngineError::invalid(format!(
                    "payout for '{id}' must be positive, got {amount}"
                )));
            }
            amounts.push(amount);
        }

        // Scale by the largest payout first; a raw sum of huge payouts overflows
        let max = amounts.iter().copied().fold(0.0f64, f64::max);
        let scaled: Vec<f64> = amounts.iter().map(|a| a / max).collect();
        let norm: f64 = scaled.iter().sum();
        let probabilities = scaled.iter().map(|a| a / norm).collect();

        Ok(Self {
            ids: normal_ids.to_vec(),
            probabilities,
        })
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn probability_of(&self, competition: &str) -> Option<f64> {
        self.ids
            .iter()
            .position(|id| id == competition)
            .map(|i| self.probabilities[i])
    }
}
