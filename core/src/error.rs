//! Error types for http-loadgen-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Target rate is zero, negative, or not a finite number
    #[error("invalid target rate: {0} (must be a positive number of requests per second)")]
    InvalidTargetRate(f64),

    /// Target rate rounds to zero tickets in every candidate renewal interval
    #[error("target rate {0} rps is too low to grant a single ticket per renewal interval")]
    TargetRateTooLow(f64),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A builder was finished without a required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a missing builder field
    pub fn missing_config(field: &'static str) -> Self {
        Error::MissingField(field)
    }

    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
