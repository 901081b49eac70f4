//! Error taxonomy of the simulation core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Leaderboard or user data missing or malformed. Aborts the run.
    #[error("Data source error for '{competition}': {reason}")]
    DataSource { competition: String, reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The weighted sampler rejected its input (e.g. a negative weight)
    #[error("Sampling error: {0}")]
    Sampling(String),
}

impl EngineError {
    pub fn data_source(competition: impl Into<String>, reason: impl ToString) -> Self {
        EngineError::DataSource {
            competition: competition.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidParameter(message.into())
    }
}

impl From<rand::distributions::WeightedError> for EngineError {
    fn from(err: rand::distributions::WeightedError) -> Self {
        EngineError::Sampling(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Convert a signed count coming from configuration into a `usize`.
pub fn checked_count(name: &str, value: i64) -> EngineResult<usize> {
    usize::try_from(value)
        .map_err(|_| EngineError::invalid(format!("{name} must be non-negative, got {value}")))
}
