//! Main PairRelay coordination.
//!
//! PairRelay owns the session registry and the set of open connections, and
//! carries out the effects the pairing state machine asks for.

use crate::config::Config;
use crate::connection::{
    ConnectionId, ConnectionTable, DisconnectReason, Frame, Outbound, Peer, PeerChannels, Shutdown,
};
use crate::error::PairingError;
use crate::pairing::{transition, Effect, Handshake, PairingEvent};
use crate::registry::SessionRegistry;
use crate::relay::route;
use scan_types::CloseCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total connections that completed pairing.
    pub connections_total: AtomicU64,
    /// Total joins refused (invalid handshake or unknown session).
    pub handshake_rejections: AtomicU64,
    /// Total connections closed because a newer one took their role.
    pub replacements_total: AtomicU64,
    /// Total connections terminated by the heartbeat monitor.
    pub liveness_timeouts: AtomicU64,
    /// Total sessions removed by the reaper.
    pub sessions_expired: AtomicU64,
    /// Total frames delivered to a partner's queue.
    pub frames_relayed: AtomicU64,
    /// Total frames dropped (no live partner or full queue).
    pub frames_dropped: AtomicU64,
    /// Total payload bytes delivered to a partner's queue.
    pub bytes_relayed: AtomicU64,
}

/// Main relay server state.
#[derive(Debug)]
pub struct PairRelay {
    config: Config,
    registry: SessionRegistry,
    connections: ConnectionTable,
    metrics: RelayMetrics,
}

impl PairRelay {
    /// Create a relay with an empty registry.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: SessionRegistry::new(),
            connections: ConnectionTable::new(),
            metrics: RelayMetrics::default(),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Get the open-connection set.
    pub fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Bind a new connection to its `(session, role)` slot.
    ///
    /// On success the returned channels must be driven by the transport
    /// task, which calls [`PairRelay::disconnect`] when the socket ends.
    pub fn connect(&self, handshake: &Handshake) -> Result<(Arc<Peer>, PeerChannels), PairingError> {
        let id = ConnectionId::next();
        let (peer, channels) = Peer::new(
            id,
            handshake.token.clone(),
            handshake.role,
            self.config.server.send_queue,
        );
        let peer = Arc::new(peer);
        self.connections.insert(Arc::clone(&peer));

        let result = transition(
            &self.registry,
            &handshake.token,
            handshake.role,
            PairingEvent::Join(id),
            &self.connections,
            Instant::now(),
        );

        match result {
            Ok(effects) => {
                self.metrics.connections_total.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    session = ?handshake.token,
                    role = %handshake.role,
                    conn = %id,
                    "Connection joined session"
                );
                self.apply(&effects);
                Ok((peer, channels))
            }
            Err(e) => {
                self.connections.remove(id);
                self.metrics.handshake_rejections.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    session = ?handshake.token,
                    role = %handshake.role,
                    "Join rejected: {}",
                    e
                );
                Err(e)
            }
        }
    }

    /// Record a refused handshake that never reached [`PairRelay::connect`].
    pub fn reject(&self, error: PairingError) {
        self.metrics.handshake_rejections.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Handshake rejected: {}", error);
    }

    /// Run the disconnect path for a connection.
    ///
    /// Idempotent: only the first call for a given connection clears its
    /// slot and notifies the partner. Returns whether this call did so.
    pub fn disconnect(&self, id: ConnectionId, reason: DisconnectReason) -> bool {
        let Some(peer) = self.connections.remove(id) else {
            return false;
        };

        let effects = transition(
            &self.registry,
            peer.token(),
            peer.role(),
            PairingEvent::Leave(id),
            &self.connections,
            Instant::now(),
        )
        .unwrap_or_default();

        tracing::info!(
            session = ?peer.token(),
            role = %peer.role(),
            conn = %id,
            %reason,
            "Connection left session"
        );
        self.apply(&effects);
        true
    }

    /// Forward a frame from `from` to its partner, if one is live.
    ///
    /// A sender that is being shut down (replaced, expired or terminated)
    /// no longer reaches the partner.
    pub fn forward(&self, from: ConnectionId, frame: Frame) -> bool {
        let Some(sender) = self.connections.get(from) else {
            return false;
        };
        if !sender.is_live() {
            self.metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(conn = %from, "Sender shutting down, frame dropped");
            return false;
        }

        let len = frame.len() as u64;
        let partner = route(&self.registry, sender.token(), sender.role(), &self.connections)
            .and_then(|to| self.connections.get(to));

        match partner {
            Some(partner) if partner.send(Outbound::Frame(frame)) => {
                self.metrics.frames_relayed.fetch_add(1, Ordering::Relaxed);
                self.metrics.bytes_relayed.fetch_add(len, Ordering::Relaxed);
                true
            }
            _ => {
                self.metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(conn = %from, "No live partner, frame dropped");
                false
            }
        }
    }

    /// Record a probe acknowledgement.
    pub fn record_pong(&self, id: ConnectionId) {
        if let Some(peer) = self.connections.get(id) {
            peer.mark_alive();
        }
    }

    /// Carry out effects produced by the pairing state machine.
    pub fn apply(&self, effects: &[Effect]) {
        for effect in effects {
            match *effect {
                Effect::Notify { to, event } => {
                    if let Some(peer) = self.connections.get(to) {
                        peer.send(Outbound::Status(event));
                    }
                }
                Effect::Close { conn, code } => {
                    let Some(peer) = self.connections.get(conn) else {
                        continue;
                    };
                    if peer.shutdown(Shutdown::Close(code)) && code == CloseCode::ReplacedBySibling {
                        self.metrics.replacements_total.fetch_add(1, Ordering::Relaxed);
                        tracing::info!(
                            session = ?peer.token(),
                            role = %peer.role(),
                            conn = %conn,
                            "Connection replaced by newer sibling"
                        );
                    }
                }
            }
        }
    }

    /// Number of open connections.
    pub fn total_connections(&self) -> usize {
        self.connections.len()
    }

    /// Number of live sessions.
    pub fn total_sessions(&self) -> usize {
        self.registry.len()
    }
}
