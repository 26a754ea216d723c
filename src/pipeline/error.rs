//! Error and warning types for the modeling pipeline.
//!
//! Fatal conditions are `PipelineError` variants returned to the caller.
//! Data-quality issues never abort a run: they are collected as
//! `DataQualityWarning` values next to the stage output.

use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the pipeline and model code.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that stop a pipeline stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input table does not satisfy the required schema.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The top-quantile subset for recommendation is empty or too small.
    #[error("No recommendation available: {reason} ({rows} row(s), threshold {threshold:.4})")]
    DegenerateSubset {
        reason: String,
        rows: usize,
        threshold: f64,
    },

    /// The requested operation is not offered by this backend.
    #[error("Operation '{operation}' is not supported by backend '{backend}'")]
    UnsupportedOperation { backend: String, operation: String },

    /// Columns seen at prediction time differ from the ones used for fitting.
    #[error("Column mismatch: model fitted on {expected:?}, got {actual:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// A column name that is not part of the feature matrix.
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    /// Not enough rows or features for the requested computation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// `predict` or attribution called before `fit`.
    #[error("Backend '{0}' has not been fitted")]
    NotFitted(String),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}

/// Non-fatal issues found while cleaning the input table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// An optional column listed for dropping was not in the table.
    OptionalColumnAbsent { column: String },
    /// Rows removed because the target was missing or outside the log1p domain.
    DroppedRows { count: usize, reason: String },
    /// Missing numeric feature values replaced by the column mean.
    ImputedValues { column: String, count: usize, fill: f64 },
    /// A numeric column with no values at all, removed from the features.
    EmptyColumn { column: String },
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OptionalColumnAbsent { column } => {
                write!(f, "optional column '{}' not present, nothing to drop", column)
            }
            Self::DroppedRows { count, reason } => write!(f, "dropped {} row(s): {}", count, reason),
            Self::ImputedValues {
                column,
                count,
                fill,
            } => write!(
                f,
                "imputed {} missing value(s) in '{}' with mean {:.4}",
                count, column, fill
            ),
            Self::EmptyColumn { column } => {
                write!(f, "column '{}' has no values and was removed", column)
            }
        }
    }
}
