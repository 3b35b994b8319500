//! Custom error types for rustalex.
//!
//! This module defines all error types used throughout the application.
//! All functions return `Result<T, AlexError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for rustalex operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum AlexError {
    /// Start year after end year
    #[error("Invalid year range: start year {start} is after end year {end}")]
    InvalidRange {
        /// Requested start year
        start: i32,
        /// Requested end year
        end: i32,
    },

    /// No collaborative publications matched the partner institution
    #[error("No collaborative publications found for '{0}' - check that the ROR identifier is valid")]
    InvalidCollaborator(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Rate limited by the catalog API
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Catalog API returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message
        message: String,
    },

    /// Response payload could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Run stopped by a user cancellation request
    #[error("Operation interrupted by user")]
    Interrupted,
}

impl AlexError {
    /// Whether this error is a cooperative cancellation rather than a failure.
    ///
    /// Drivers use this to exit cleanly (no error output, zero exit code)
    /// when the user asked for the stop themselves.
    pub fn is_interruption(&self) -> bool {
        matches!(self, AlexError::Interrupted)
    }
}

/// Result type alias using `AlexError`
pub type Result<T> = std::result::Result<T, AlexError>;
