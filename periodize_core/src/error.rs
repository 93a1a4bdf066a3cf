//! Error types for the periodize_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for periodize_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A persistence gateway operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// The whole import had to be abandoned
    #[error("Import failed: {0}")]
    Import(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A date could not be parsed
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
