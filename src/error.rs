//! Error taxonomy shared by the cleaning, preprocessing, model and report layers.
//!
//! Library operations return [`RiskResult`]. Stage functions in
//! [`crate::pipeline`] wrap these with `anyhow` context naming the stage and
//! file before handing them back to the binary.

use std::path::PathBuf;

use polars::prelude::PolarsError;

/// Errors that can occur anywhere in the scoring pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    /// An expected column is missing or has an unusable type.
    #[error("schema error: {0}")]
    Schema(String),

    /// A file could not be read or written.
    #[error("I/O error on {path}")]
    Io {
        /// Path of the file involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The numeric fitting code rejected its input (all-missing column,
    /// empty dataset, non-finite value, invalid hyperparameter).
    #[error("fit error: {0}")]
    Fit(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A metric is undefined for the given labels.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// JSON encoding or decoding of an artifact failed.
    #[error("failed to (de)serialize {what}")]
    Serialize {
        /// Human-readable name of the artifact.
        what: String,
        /// The underlying serde_json error.
        #[source]
        source: serde_json::Error,
    },

    /// An artifact was written by an incompatible version of this crate.
    #[error("incompatible {what} format in {path}: expected version {expected}, found {found}")]
    IncompatibleFormat {
        /// Human-readable name of the artifact.
        what: String,
        /// Path of the artifact.
        path: PathBuf,
        /// Version this build reads.
        expected: u32,
        /// Version found in the file.
        found: u32,
    },

    /// A dataframe operation failed.
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl RiskError {
    /// Schema error for a single absent column.
    pub fn missing_column(column: &str) -> Self {
        RiskError::Schema(format!("column '{}' not found in dataset", column))
    }

    /// Schema error listing every absent column.
    pub fn missing_columns(columns: &[String]) -> Self {
        RiskError::Schema(format!(
            "{} required column(s) not found in dataset: {:?}",
            columns.len(),
            columns
        ))
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RiskError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type RiskResult<T> = Result<T, RiskError>;
