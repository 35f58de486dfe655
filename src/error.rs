//! Error types for FitLog Analytics

use thiserror::Error;

/// Errors that can occur while normalizing snapshots or computing analytics
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Baseline portion must be greater than zero")]
    ZeroBaselinePortion,

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Failed to parse record: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Logging initialization failed: {0}")]
    LoggingError(String),
}

/// Validation errors raised when a record is constructed or appended.
///
/// A record that fails validation never enters a snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Weight is required")]
    MissingWeight,

    #[error("Weight must be between {min} and {max} kg, got {value}")]
    WeightOutOfRange { value: f64, min: f64, max: f64 },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Portion must be at least {min} g, got {value}")]
    PortionBelowMinimum { value: f64, min: f64 },

    #[error("Food name must not be empty")]
    EmptyFoodName,
}

impl ValidationError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
