//! Error types for ElectroNav

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElectronavError {
    // Argument errors
    #[error("Invalid {what}: {reason}")]
    InvalidArgument { what: String, reason: String },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("{what} index {index} out of range (count {len})")]
    OutOfRange { what: String, index: usize, len: usize },

    // Catalog errors
    #[error("Unknown electrode type: {id}")]
    UnknownElectrodeType { id: String },

    // History errors
    #[error("No session recorded for {date}")]
    SessionNotFound { date: NaiveDate },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ElectronavError {
    pub fn invalid(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument { what: what.into(), reason: reason.into() }
    }

    pub fn out_of_range(what: impl Into<String>, index: usize, len: usize) -> Self {
        Self::OutOfRange { what: what.into(), index, len }
    }
}

pub type Result<T> = std::result::Result<T, ElectronavError>;

/// Reject NaN and infinite values before they reach the model.
pub(crate) fn ensure_finite(what: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ElectronavError::invalid(what, format!("must be finite, got {}", value)))
    }
}
