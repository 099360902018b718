//! Error types for the insight pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading a store or running an analysis
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Data root not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Malformed record {}: {reason}", .path.display())]
    MalformedRecord { path: PathBuf, reason: String },

    #[error("No valid records found in store")]
    EmptyStore,

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Insufficient data for '{metric}': need >= {needed} days, got {got}")]
    InsufficientData {
        metric: String,
        needed: usize,
        got: usize,
    },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
}
