//! Per-connection session loop.
//!
//! Each paired WebSocket gets a ConnectionSession that pumps frames between
//! the socket and the relay until either side ends it.

use crate::connection::{DisconnectReason, Frame, Outbound, Peer, PeerChannels, Shutdown};
use crate::server::PairRelay;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use scan_types::{CloseCode, Envelope};
use std::sync::Arc;

/// A paired connection being served.
pub struct ConnectionSession {
    relay: Arc<PairRelay>,
    peer: Arc<Peer>,
    channels: PeerChannels,
}

impl ConnectionSession {
    /// Create a session for a connection that completed pairing.
    pub fn new(relay: Arc<PairRelay>, peer: Arc<Peer>, channels: PeerChannels) -> Self {
        Self {
            relay,
            peer,
            channels,
        }
    }

    /// Run the session until the socket closes or the relay shuts it down.
    ///
    /// The disconnect path runs exactly once when this returns.
    pub async fn run(self, socket: WebSocket) {
        let Self {
            relay,
            peer,
            channels,
        } = self;
        let PeerChannels {
            mut outbound,
            mut shutdown,
            ping,
        } = channels;
        let id = peer.id();
        let (mut ws_tx, mut ws_rx) = socket.split();

        // Writer: outbound queue -> socket, until shutdown or write error.
        let writer = async {
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let how = *shutdown.borrow_and_update();
                        match how {
                            Some(Shutdown::Close(code)) => {
                                let _ = ws_tx.send(close_message(code)).await;
                                break;
                            }
                            Some(Shutdown::Terminate) => break,
                            None => {}
                        }
                    }
                    _ = ping.notified() => {
                        if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                            break;
                        }
                    }
                    msg = outbound.recv() => {
                        let Some(msg) = msg else { break };
                        let Some(msg) = to_ws_message(msg) else { continue };
                        if ws_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                }
            }
        };

        // Reader: socket -> relay, tracking probe acknowledgements.
        let reader = async {
            while let Some(msg) = ws_rx.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        relay.forward(id, Frame::Text(text));
                    }
                    Ok(Message::Binary(bytes)) => {
                        relay.forward(id, Frame::Binary(bytes));
                    }
                    Ok(Message::Pong(_)) => relay.record_pong(id),
                    Ok(Message::Close(_)) => break,
                    Ok(Message::Ping(_)) => {} // axum answers pings itself
                    Err(e) => {
                        tracing::debug!(conn = %id, "WebSocket read error: {}", e);
                        break;
                    }
                }
            }
        };

        tokio::select! {
            _ = writer => {},
            _ = reader => {},
        }

        let reason = match *shutdown.borrow() {
            Some(Shutdown::Close(CloseCode::ReplacedBySibling)) => DisconnectReason::Replaced,
            Some(Shutdown::Close(CloseCode::Normal)) => DisconnectReason::Expired,
            Some(Shutdown::Terminate) => DisconnectReason::LivenessTimeout,
            _ => DisconnectReason::Closed,
        };
        relay.disconnect(id, reason);
    }
}

/// Close a socket that never made it into a session.
pub async fn close_with(mut socket: WebSocket, code: CloseCode) {
    if let Err(e) = socket.send(close_message(code)).await {
        tracing::debug!("Failed to send close frame {}: {}", code.code(), e);
    }
}

fn close_message(code: CloseCode) -> Message {
    Message::Close(Some(CloseFrame {
        code: code.code(),
        reason: code.reason().into(),
    }))
}

fn to_ws_message(msg: Outbound) -> Option<Message> {
    match msg {
        Outbound::Frame(Frame::Text(text)) => Some(Message::Text(text)),
        Outbound::Frame(Frame::Binary(bytes)) => Some(Message::Binary(bytes)),
        Outbound::Status(event) => match Envelope::status(event).to_json() {
            Ok(json) => Some(Message::Text(json)),
            Err(e) => {
                tracing::error!("Failed to serialize status envelope: {}", e);
                None
            }
        },
    }
}
