//! Envelope - the JSON frame exchanged between paired clients.
//!
//! Application frames are forwarded verbatim and never decoded by the relay.
//! The relay only produces `status` envelopes of its own.

use serde::{Deserialize, Serialize};

use crate::WireError;

/// `type` value of relay-generated status envelopes.
pub const STATUS_TYPE: &str = "status";

/// Pairing events the relay reports to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEvent {
    /// The opposite role is now connected.
    PartnerConnected,
    /// The opposite role went away.
    PartnerDisconnected,
}

/// `{ "type": string, "payload": object }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type discriminator
    #[serde(rename = "type")]
    pub kind: String,
    /// Application-defined payload
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct StatusPayload {
    event: StatusEvent,
}

impl Envelope {
    /// Create an envelope with an arbitrary type and payload.
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Create a relay status envelope.
    pub fn status(event: StatusEvent) -> Self {
        Self {
            kind: STATUS_TYPE.to_string(),
            payload: serde_json::json!({ "event": event }),
        }
    }

    /// Returns the status event if this is a relay status envelope.
    pub fn status_event(&self) -> Option<StatusEvent> {
        if self.kind != STATUS_TYPE {
            return None;
        }
        serde_json::from_value::<StatusPayload>(self.payload.clone())
            .ok()
            .map(|p| p.event)
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(text)?)
    }
}
