//! Error types for scan-relay.

use scan_types::CloseCode;

/// Main error type for scan-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Reasons a join request is refused.
///
/// Each variant is scoped to the one connection that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    /// `role` or `session` missing, empty, or `role` unknown.
    #[error("invalid role or session")]
    InvalidHandshake,

    /// Mobile joined a token no desktop has created.
    #[error("session not found")]
    SessionNotFound,
}

impl PairingError {
    /// Close code sent to the rejected client.
    pub fn close_code(self) -> CloseCode {
        match self {
            PairingError::InvalidHandshake => CloseCode::InvalidHandshake,
            PairingError::SessionNotFound => CloseCode::SessionNotFound,
        }
    }
}
