//! WebSocket close codes used by the relay.

use serde::{Deserialize, Serialize};

/// Close codes sent to a client when the relay ends its connection.
///
/// Codes in the 4000 range are application-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure (session expired)
    Normal = 1000,
    /// Missing or invalid `role`/`session` parameter
    InvalidHandshake = 4000,
    /// Mobile joined a session no desktop has created
    SessionNotFound = 4001,
    /// A newer connection took over the same role
    ReplacedBySibling = 4002,
}

impl CloseCode {
    /// Numeric close code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Human-readable close reason.
    pub fn reason(self) -> &'static str {
        match self {
            CloseCode::Normal => "Session expired",
            CloseCode::InvalidHandshake => "Invalid role or session",
            CloseCode::SessionNotFound => "Session not found",
            CloseCode::ReplacedBySibling => "Replaced by new connection",
        }
    }
}

impl TryFrom<u16> for CloseCode {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1000 => Ok(CloseCode::Normal),
            4000 => Ok(CloseCode::InvalidHandshake),
            4001 => Ok(CloseCode::SessionNotFound),
            4002 => Ok(CloseCode::ReplacedBySibling),
            other => Err(other),
        }
    }
}
