//! Crate-wide error type.
//!
//! Every failure is structural: the data or configuration handed to a stage
//! violates something the stage depends on. Nothing here is retryable; the
//! caller fixes the input and reruns.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The index series has gaps, duplicate months, non-monotonic dates or
    /// non-finite values.
    #[error("Malformed index series: {0}")]
    MalformedSeries(String),

    /// A stage needs a column that the table does not have.
    #[error("Missing column `{column}` required by {stage}")]
    MissingColumn { column: String, stage: &'static str },

    /// The column grouper found no mapping and no default rule.
    #[error("Column `{0}` has no group mapping")]
    UnmappedColumn(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A value required by a numeric consumer is absent.
    #[error("Missing value in column `{column}` at row {row}")]
    MissingValue { column: String, row: usize },

    /// A raw value could not be interpreted.
    #[error("Invalid value `{value}` in column `{column}` at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    /// A concrete model failed to fit or predict.
    #[error("Model error: {0}")]
    Model(String),

    /// An optional capability is not provided by this implementation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

impl Error {
    pub(crate) fn missing_column(column: impl Into<String>, stage: &'static str) -> Self {
        Self::MissingColumn {
            column: column.into(),
            stage,
        }
    }
}
