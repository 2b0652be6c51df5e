//! Error types for the relay wire format.

use thiserror::Error;

/// Errors that can occur while parsing wire values.
#[derive(Debug, Error)]
pub enum WireError {
    /// Role was not `desktop` or `mobile`
    #[error("invalid role: {0:?}")]
    InvalidRole(String),

    /// Session token was empty
    #[error("session token must not be empty")]
    EmptyToken,

    /// Envelope was not valid JSON or had the wrong shape
    #[error("invalid envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}
