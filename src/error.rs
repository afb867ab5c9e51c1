//! Error taxonomy.
//!
//! Caller-visible input problems (`SchemaError`) are kept apart from
//! operator-visible failures (`ArtifactLoadError`, `TrainingDataError`) and from
//! the routing collaborator (`RouteUnavailableError`), so the service layer can
//! map each class to its own response without inspecting messages.

use std::path::PathBuf;

use thiserror::Error;

use crate::gbdt::ModelError;

/// Malformed, missing, or out-of-range input field at encode time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("field '{field}' must be numeric, got {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("field '{field}' must be an integer, got {value}")]
    NotInteger { field: &'static str, value: f64 },

    #[error("field '{field}' must be a string")]
    NotText { field: &'static str },

    #[error("field '{field}' out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("record must be a JSON object")]
    NotAnObject,
}

/// Pipeline artifact missing or unusable. Fatal at service startup.
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("artifact not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("artifact is inconsistent: {reason}")]
    Inconsistent { reason: String },
}

/// Malformed training source. Fatal to the training run.
#[derive(Debug, Error)]
pub enum TrainingDataError {
    #[error("failed to open training data {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("training data is missing required column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("malformed training row at line {line}: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("invalid order_time '{value}' at line {line}")]
    InvalidTimestamp { line: u64, value: String },

    #[error("invalid training row at line {line}: {source}")]
    InvalidRow {
        line: u64,
        #[source]
        source: SchemaError,
    },

    #[error("invalid label delivery_time_min={value} at line {line}")]
    InvalidLabel { line: u64, value: f64 },

    #[error("training data contains no rows")]
    Empty,

    #[error("not enough rows to split: {rows} rows with test fraction {test_fraction}")]
    TooFewRows { rows: usize, test_fraction: f64 },

    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidTestFraction(f64),
}

/// External routing provider failure. Never folded into prediction errors.
#[derive(Debug, Error)]
pub enum RouteUnavailableError {
    #[error("routing provider is not configured (ORS_API_KEY unset)")]
    NotConfigured,

    #[error("routing request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("routing provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed routing response: {0}")]
    MalformedResponse(String),
}

/// Failure while producing a prediction for a single record.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Failure of an offline training run.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Data(#[from] TrainingDataError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("held-out evaluation failed: {0}")]
    Evaluate(#[from] PredictError),

    #[error("failed to write artifact {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("held-out R² {r2:.4} is below the required minimum {min_r2:.4}; artifact not saved")]
    QualityGate { r2: f64, min_r2: f64 },
}
