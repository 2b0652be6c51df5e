//! Role-pairing state machine.
//!
//! Binds connections to `(session, role)` slots and decides who must be
//! told what. Like the connection state machine on the client side, this
//! module performs no I/O: [`transition`] mutates the registry and returns
//! the [`Effect`]s the caller has to carry out.
//!
//! Per session token:
//!
//! ```text
//! Absent --desktop join--> Active
//! Absent --mobile join---> (rejected: SessionNotFound)
//! Active --join----------> Active   (replace same-role occupant, notify pair)
//! Active --leave---------> Active   (clear slot, notify partner)
//! Active --last leave----> Absent
//! ```

use crate::connection::ConnectionId;
use crate::error::PairingError;
use crate::registry::{Retain, SessionRecord, SessionRegistry};
use scan_types::{CloseCode, Role, SessionToken, StatusEvent};
use std::time::Instant;

/// Answers whether a connection is open and not being shut down.
pub trait Liveness {
    /// True if `id` can still receive messages.
    fn is_live(&self, id: ConnectionId) -> bool;
}

/// Validated join parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Session to join.
    pub token: SessionToken,
    /// Role to take in it.
    pub role: Role,
}

impl Handshake {
    /// Validate the raw `role` and `session` query parameters.
    ///
    /// Missing or empty values and unknown roles are all `InvalidHandshake`.
    pub fn parse(role: Option<&str>, session: Option<&str>) -> Result<Self, PairingError> {
        let role = role
            .ok_or(PairingError::InvalidHandshake)?
            .parse::<Role>()
            .map_err(|_| PairingError::InvalidHandshake)?;
        let token = session
            .map(SessionToken::new)
            .ok_or(PairingError::InvalidHandshake)?
            .map_err(|_| PairingError::InvalidHandshake)?;
        Ok(Self { token, role })
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingEvent {
    /// A connection asks to take the role.
    Join(ConnectionId),
    /// A connection holding (or having held) the role went away.
    Leave(ConnectionId),
}

/// Side effect the caller must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Send a status envelope.
    Notify {
        /// Recipient.
        to: ConnectionId,
        /// Event to report.
        event: StatusEvent,
    },
    /// Close a connection with an application code.
    Close {
        /// Connection to close.
        conn: ConnectionId,
        /// Close code to send.
        code: CloseCode,
    },
}

/// Apply `event` for `(token, role)` and return the effects to carry out.
///
/// # Errors
///
/// `SessionNotFound` when a mobile joins a token no desktop has created.
pub fn transition(
    registry: &SessionRegistry,
    token: &SessionToken,
    role: Role,
    event: PairingEvent,
    liveness: &impl Liveness,
    now: Instant,
) -> Result<Vec<Effect>, PairingError> {
    match event {
        PairingEvent::Join(conn) => {
            let create = || (role == Role::Desktop).then(|| SessionRecord::new(now));
            registry
                .update(token, create, |record| join(record, role, conn, liveness))
                .ok_or(PairingError::SessionNotFound)
        }
        PairingEvent::Leave(conn) => Ok(registry
            .update(token, || None, |record| leave(record, role, conn, liveness))
            .unwrap_or_default()),
    }
}

fn join(
    record: &mut SessionRecord,
    role: Role,
    conn: ConnectionId,
    liveness: &impl Liveness,
) -> (Retain, Vec<Effect>) {
    let mut effects = Vec::new();

    if let Some(existing) = record.slot(role) {
        if existing != conn && liveness.is_live(existing) {
            effects.push(Effect::Close {
                conn: existing,
                code: CloseCode::ReplacedBySibling,
            });
        }
    }
    *record.slot_mut(role) = Some(conn);

    if let Some(partner) = record.slot(role.opposite()) {
        if liveness.is_live(partner) {
            effects.push(Effect::Notify {
                to: partner,
                event: StatusEvent::PartnerConnected,
            });
            effects.push(Effect::Notify {
                to: conn,
                event: StatusEvent::PartnerConnected,
            });
        }
    }

    (Retain::Keep, effects)
}

fn leave(
    record: &mut SessionRecord,
    role: Role,
    conn: ConnectionId,
    liveness: &impl Liveness,
) -> (Retain, Vec<Effect>) {
    let mut effects = Vec::new();

    // A replaced connection no longer owns the slot, so it must not clear it.
    if record.slot(role) == Some(conn) {
        *record.slot_mut(role) = None;
    }

    if let Some(partner) = record.slot(role.opposite()) {
        if liveness.is_live(partner) {
            effects.push(Effect::Notify {
                to: partner,
                event: StatusEvent::PartnerDisconnected,
            });
        }
    }

    let retain = if record.is_vacant() {
        Retain::Remove
    } else {
        Retain::Keep
    };
    (retain, effects)
}
