//! Session registry: token -> role slots.
//!
//! The registry is the single source of truth for pairing state. Slots hold
//! connection identifiers only; the sockets themselves belong to their
//! transport tasks. Each session is mutated under its `DashMap` shard lock.

use crate::connection::ConnectionId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use scan_types::{Role, SessionToken};
use std::time::{Duration, Instant};

/// One pairing instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Connection holding the desktop role.
    pub desktop: Option<ConnectionId>,
    /// Connection holding the mobile role.
    pub mobile: Option<ConnectionId>,
    /// When the first desktop join created the session.
    pub created_at: Instant,
}

impl SessionRecord {
    /// A freshly created session with both slots empty.
    pub fn new(created_at: Instant) -> Self {
        Self {
            desktop: None,
            mobile: None,
            created_at,
        }
    }

    /// The slot for `role`.
    pub fn slot(&self, role: Role) -> Option<ConnectionId> {
        match role {
            Role::Desktop => self.desktop,
            Role::Mobile => self.mobile,
        }
    }

    /// Mutable access to the slot for `role`.
    pub fn slot_mut(&mut self, role: Role) -> &mut Option<ConnectionId> {
        match role {
            Role::Desktop => &mut self.desktop,
            Role::Mobile => &mut self.mobile,
        }
    }

    /// Both slots empty.
    pub fn is_vacant(&self) -> bool {
        self.desktop.is_none() && self.mobile.is_none()
    }

    /// Age of the session at `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

/// Outcome of [`SessionRegistry::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retain {
    /// Keep the record.
    Keep,
    /// Remove the record.
    Remove,
}

/// Explicitly owned mapping from session token to [`SessionRecord`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionToken, SessionRecord>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the record for `token`.
    pub fn get(&self, token: &SessionToken) -> Option<SessionRecord> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    /// Whether `token` names a live session.
    pub fn contains(&self, token: &SessionToken) -> bool {
        self.sessions.contains_key(token)
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no sessions exist.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Mutate the record for `token` in one critical section, creating it
    /// first with `create` if absent and `create` returns a record.
    ///
    /// Returns `None` when the session is absent and was not created.
    pub fn update<T>(
        &self,
        token: &SessionToken,
        create: impl FnOnce() -> Option<SessionRecord>,
        f: impl FnOnce(&mut SessionRecord) -> (Retain, T),
    ) -> Option<T> {
        match self.sessions.entry(token.clone()) {
            Entry::Occupied(mut occupied) => {
                let (retain, out) = f(occupied.get_mut());
                if retain == Retain::Remove {
                    occupied.remove();
                }
                Some(out)
            }
            Entry::Vacant(vacant) => {
                let mut record = create()?;
                let (retain, out) = f(&mut record);
                if retain == Retain::Keep {
                    vacant.insert(record);
                }
                Some(out)
            }
        }
    }

    /// Remove a session outright.
    pub fn remove(&self, token: &SessionToken) -> Option<SessionRecord> {
        self.sessions.remove(token).map(|(_, record)| record)
    }

    /// Remove and return every session older than `ttl` at `now`.
    pub fn drain_expired(&self, now: Instant, ttl: Duration) -> Vec<(SessionToken, SessionRecord)> {
        let mut expired = Vec::new();
        self.sessions.retain(|token, record| {
            if record.age(now) > ttl {
                expired.push((token.clone(), record.clone()));
                false
            } else {
                true
            }
        });
        expired
    }
}
