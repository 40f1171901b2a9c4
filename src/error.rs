// Error taxonomy for the analysis pipeline.
//
// Only three things can abort a run: a bad configuration (caught before any
// computation), the clique enumerator blowing through its resource budget,
// and an external cancellation. Dropped rows are not errors; they are
// counted into `DroppedRows` and the run continues.

use thiserror::Error;

/// Problems with the caller's column selection or parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("column '{column}' not found (available: {})", .available.join(", "))]
    UnknownColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Anything that aborts an analysis run. No partial report is ever returned
/// alongside one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("resource budget exceeded: {what} limit of {limit} reached")]
    ResourceBudgetExceeded { what: &'static str, limit: u64 },

    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Process exit code for CLI-style callers.
    pub fn exit_code(&self) -> i32 {
        match self {
            AnalysisError::Configuration(_) => 2,
            AnalysisError::ResourceBudgetExceeded { .. } => 3,
            AnalysisError::Cancelled => 130,
        }
    }
}
