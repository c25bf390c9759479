//! Error types shared across Segue crates

use thiserror::Error;

/// Error type for segue-common
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration value missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to parse a stored value
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience Result type using segue-common Error
pub type Result<T> = std::result::Result<T, Error>;
