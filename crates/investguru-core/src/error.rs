use thiserror::Error;

/// Validation and configuration errors exposed by `investguru-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid source '{value}', expected one of yahoo, stooq")]
    InvalidSource { value: String },
    #[error("source '{value}' is listed more than once")]
    DuplicateSource { value: String },
    #[error("source list cannot be empty")]
    EmptySourceList,

    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidSetting {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("close price cannot be empty")]
    EmptyClose,
}
