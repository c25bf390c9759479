//! Error types for segue-player
//!
//! Module-specific error types using thiserror for clear error propagation.
//! None of these escalate to terminate playback of subsequent tracks; every
//! failure point in the engine has a defined degraded fallback.

use thiserror::Error;

/// Main error type for the segue-player module
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Resource resolution errors (file moved, permission revoked)
    #[error("Resource error: {0}")]
    Resource(String),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// Queue management errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<segue_common::Error> for Error {
    fn from(err: segue_common::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Convenience Result type using segue-player Error
pub type Result<T> = std::result::Result<T, Error>;
