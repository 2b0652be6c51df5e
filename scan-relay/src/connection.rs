//! Live connection handles.
//!
//! The transport task owns each WebSocket. The relay only keeps a [`Peer`]:
//! the sending side of the connection's outbound queue plus the flags the
//! heartbeat and pairing logic need.

use crate::pairing::Liveness;
use dashmap::DashMap;
use scan_types::{CloseCode, Role, SessionToken, StatusEvent};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};

/// Process-unique connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next identifier.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An application frame, forwarded without inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl Frame {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(t) => t.len(),
            Frame::Binary(b) => b.len(),
        }
    }

    /// True for a zero-length frame.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Queued work for a connection's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Frame relayed from the partner.
    Frame(Frame),
    /// Relay status envelope.
    Status(StatusEvent),
}

/// How the writer should end the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Send a close frame with this code, then drop the socket.
    Close(CloseCode),
    /// Drop the socket without a close handshake.
    Terminate,
}

/// Why a connection left its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Transport closed (client close frame, EOF, or I/O error).
    Closed,
    /// No probe acknowledgement within one heartbeat interval.
    LivenessTimeout,
    /// A newer connection took the same role.
    Replaced,
    /// The session outlived its TTL.
    Expired,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisconnectReason::Closed => "closed",
            DisconnectReason::LivenessTimeout => "liveness timeout",
            DisconnectReason::Replaced => "replaced",
            DisconnectReason::Expired => "expired",
        })
    }
}

/// Receiving halves handed to the transport task.
#[derive(Debug)]
pub struct PeerChannels {
    /// Frames and status events to write, in order.
    pub outbound: mpsc::Receiver<Outbound>,
    /// Set once when the relay wants the connection gone.
    pub shutdown: watch::Receiver<Option<Shutdown>>,
    /// Signalled when a liveness probe is due. Independent of `outbound`.
    pub ping: Arc<Notify>,
}

/// The relay's handle on one accepted connection.
#[derive(Debug)]
pub struct Peer {
    id: ConnectionId,
    token: SessionToken,
    role: Role,
    tx: mpsc::Sender<Outbound>,
    shutdown: watch::Sender<Option<Shutdown>>,
    ping: Arc<Notify>,
    alive: AtomicBool,
}

impl Peer {
    /// Create a peer with an outbound queue of `queue` entries.
    pub fn new(id: ConnectionId, token: SessionToken, role: Role, queue: usize) -> (Self, PeerChannels) {
        let (tx, outbound) = mpsc::channel(queue.max(1));
        let (shutdown, shutdown_rx) = watch::channel(None);
        let ping = Arc::new(Notify::new());
        let peer = Self {
            id,
            token,
            role,
            tx,
            shutdown,
            ping: Arc::clone(&ping),
            alive: AtomicBool::new(true),
        };
        (
            peer,
            PeerChannels {
                outbound,
                shutdown: shutdown_rx,
                ping,
            },
        )
    }

    /// Connection identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Session this connection is bound to.
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Role this connection holds.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Open and not being shut down.
    pub fn is_live(&self) -> bool {
        self.shutdown.borrow().is_none() && !self.tx.is_closed()
    }

    /// Queue an outbound message. Returns false if it was dropped.
    pub fn send(&self, msg: Outbound) -> bool {
        if !self.is_live() {
            return false;
        }
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn = %self.id, "Send queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Request shutdown. Only the first request takes effect.
    pub fn shutdown(&self, how: Shutdown) -> bool {
        self.shutdown.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(how);
            true
        })
    }

    /// Ask the writer to send a liveness probe.
    ///
    /// Not subject to the queue bound; requests made while the writer is
    /// busy collapse into one pending ping.
    pub fn ping(&self) -> bool {
        if !self.is_live() {
            return false;
        }
        self.ping.notify_one();
        true
    }

    /// Record a probe acknowledgement.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    /// Read and clear the liveness flag.
    pub fn take_alive(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }
}

/// The set of open connections, across all sessions.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    peers: DashMap<ConnectionId, Arc<Peer>>,
}

impl ConnectionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly accepted connection.
    pub fn insert(&self, peer: Arc<Peer>) {
        self.peers.insert(peer.id(), peer);
    }

    /// Stop tracking a connection, returning it if it was present.
    pub fn remove(&self, id: ConnectionId) -> Option<Arc<Peer>> {
        self.peers.remove(&id).map(|(_, peer)| peer)
    }

    /// Look up a connection.
    pub fn get(&self, id: ConnectionId) -> Option<Arc<Peer>> {
        self.peers.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// True when no connections are open.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Copy out every peer so callers never hold a shard lock while acting.
    pub fn snapshot(&self) -> Vec<Arc<Peer>> {
        self.peers.iter().map(|entry| Arc::clone(entry.value())).collect()
    }
}

impl Liveness for ConnectionTable {
    fn is_live(&self, id: ConnectionId) -> bool {
        self.peers.get(&id).is_some_and(|peer| peer.is_live())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    fn peer(queue: usize) -> (Arc<Peer>, PeerChannels) {
        let (peer, channels) = Peer::new(
            ConnectionId::next(),
            SessionToken::new("tok").unwrap(),
            Role::Desktop,
            queue,
        );
        (Arc::new(peer), channels)
    }

    #[test]
    fn connection_ids_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("conn-"));
    }

    #[test]
    fn send_preserves_order() {
        let (peer, mut ch) = peer(8);
        assert!(peer.send(Outbound::Frame(Frame::Text("1".into()))));
        assert!(peer.send(Outbound::Frame(Frame::Text("2".into()))));
        assert_eq!(
            ch.outbound.try_recv().unwrap(),
            Outbound::Frame(Frame::Text("1".into()))
        );
        assert_eq!(
            ch.outbound.try_recv().unwrap(),
            Outbound::Frame(Frame::Text("2".into()))
        );
    }

    #[test]
    fn full_queue_drops() {
        let (peer, _ch) = peer(1);
        assert!(peer.send(Outbound::Status(StatusEvent::PartnerConnected)));
        assert!(!peer.send(Outbound::Status(StatusEvent::PartnerConnected)));
    }

    #[test]
    fn ping_bypasses_full_queue() {
        let (peer, ch) = peer(1);
        assert!(peer.send(Outbound::Frame(Frame::Text("backlog".into()))));
        assert!(!peer.send(Outbound::Frame(Frame::Text("dropped".into()))));

        assert!(peer.ping());
        assert!(peer.ping());
        assert!(ch.ping.notified().now_or_never().is_some());
        assert!(ch.ping.notified().now_or_never().is_none());
    }

    #[test]
    fn shutdown_only_first_wins() {
        let (peer, ch) = peer(4);
        assert!(peer.is_live());
        assert!(peer.shutdown(Shutdown::Close(CloseCode::ReplacedBySibling)));
        assert!(!peer.shutdown(Shutdown::Terminate));
        assert!(!peer.is_live());
        assert_eq!(
            *ch.shutdown.borrow(),
            Some(Shutdown::Close(CloseCode::ReplacedBySibling))
        );
        assert!(!peer.send(Outbound::Status(StatusEvent::PartnerConnected)));
        assert!(!peer.ping());
    }

    #[test]
    fn dropped_receiver_means_not_live() {
        let (peer, ch) = peer(4);
        drop(ch);
        assert!(!peer.is_live());
    }

    #[test]
    fn liveness_flag_take_clears() {
        let (peer, _ch) = peer(4);
        assert!(peer.take_alive());
        assert!(!peer.take_alive());
        peer.mark_alive();
        assert!(peer.take_alive());
    }

    #[test]
    fn table_tracks_liveness() {
        let table = ConnectionTable::new();
        let (p, _ch) = peer(4);
        let id = p.id();
        assert!(!table.is_live(id));
        table.insert(Arc::clone(&p));
        assert!(table.is_live(id));
        assert_eq!(table.len(), 1);
        p.shutdown(Shutdown::Terminate);
        assert!(!table.is_live(id));
        assert!(table.remove(id).is_some());
        assert!(table.remove(id).is_none());
        assert!(table.is_empty());
    }
}
