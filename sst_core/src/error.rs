//! Typed error kinds for the processing core, plus the `eyre`-based `Result`
//! alias used across the public API. Each failure mode the pipeline can hit
//! maps to a distinct variant so hosts can branch on a downcast.
use thiserror::Error;

/// Compile-time failures of the calibration expression language.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("malformed expression: {0}")]
    Parse(String),
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("`{name}` expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("name `{0}` is already defined")]
    DuplicateName(String),
}

/// Calibration failures, carrying the name of the offending method,
/// intermediate or calibration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("calibration expression `{name}` failed to compile: {source}")]
    Compile {
        name: String,
        #[source]
        source: ExpressionError,
    },
    #[error("calibration `{name}` failed at runtime: {reason}")]
    Runtime { name: String, reason: String },
}

/// Leverage-ratio table failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinkageError {
    #[error("leverage ratio data contains no valid rows")]
    NoValidRows,
    #[error("leverage ratio must be strictly positive, got {0}")]
    NonPositiveLeverage(f64),
}

/// Top-level session validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("front and rear record arrays are empty")]
    MissingRecords,
    #[error("front and rear record counts are not equal")]
    RecordCountMismatch,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
