use std::fmt;
use thiserror::Error;

/// Which input document a step came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Benchmark,
    Ai,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Benchmark => write!(f, "benchmark"),
            Side::Ai => write!(f, "ai"),
        }
    }
}

/// Errors raised while ingesting and reconciling step documents
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("step record is missing required field '{field}': {record}")]
    MalformedStep { field: &'static str, record: String },

    #[error("step record has invalid value {value:?} for field '{field}': {record}")]
    InvalidField {
        field: &'static str,
        value: String,
        record: String,
    },

    #[error("step number must be finite: {record}")]
    InvalidStepNumber { record: String },

    #[error("step {step} appears more than once in the {side} list")]
    DuplicateStep { side: Side, step: f64 },

    #[error("expected {expected}")]
    InvalidDocument { expected: &'static str },

    #[error("rating section is malformed ({reason}): {record}")]
    MalformedRating { reason: String, record: String },

    #[error("{field} must be between 1 and 5, got {value} in section '{section}'")]
    RatingOutOfRange {
        field: &'static str,
        value: i64,
        section: String,
    },
}
