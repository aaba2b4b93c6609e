//! Error types for the mmsim backtester.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the mmsim backtester.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (malformed or unusable tick).
    #[error("Data error: {0}")]
    Data(String),

    /// Cache collaborator unreachable or returned garbage.
    #[error("Cache unavailable: {0}")]
    Cache(String),

    /// Order rejected at the fill step.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a cache error.
    pub fn cache(msg: impl Into<String>) -> Self {
        Error::Cache(msg.into())
    }

    /// Create an invalid order error.
    pub fn invalid_order(msg: impl Into<String>) -> Self {
        Error::InvalidOrder(msg.into())
    }
}
