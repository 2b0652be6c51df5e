//! Upgrade endpoint handler.
//!
//! Accepts WebSocket upgrades on the relay path, validates the join
//! parameters, and hands paired connections to a [`ConnectionSession`].

use crate::pairing::Handshake;
use crate::server::PairRelay;
use crate::session::{close_with, ConnectionSession};
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::Query;
use axum::response::Response;
use axum::Extension;
use std::sync::Arc;

/// Default relay endpoint path.
pub const WS_PATH: &str = "/ws";

/// Raw join parameters from the upgrade request's query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinParams {
    /// `desktop` or `mobile`.
    pub role: Option<String>,
    /// Client-generated session token.
    pub session: Option<String>,
}

impl JoinParams {
    /// Collect join parameters from decoded query pairs.
    ///
    /// A repeated key keeps its first value; unknown keys are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "role" => &mut params.role,
                "session" => &mut params.session,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

/// Upgrade handler for the relay path.
///
/// The upgrade always succeeds; an invalid join is reported by closing the
/// socket with the matching application close code.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(pairs): Query<Vec<(String, String)>>,
    Extension(relay): Extension<Arc<PairRelay>>,
) -> Response {
    let params = JoinParams::from_pairs(pairs);
    let max = relay.config().server.max_frame_size;
    ws.max_message_size(max)
        .max_frame_size(max)
        .on_upgrade(move |socket| accept(relay, socket, params))
}

/// Pair an upgraded socket and serve it, or close it with the reason.
pub async fn accept(relay: Arc<PairRelay>, socket: WebSocket, params: JoinParams) {
    let handshake = match Handshake::parse(params.role.as_deref(), params.session.as_deref()) {
        Ok(hs) => hs,
        Err(e) => {
            relay.reject(e);
            close_with(socket, e.close_code()).await;
            return;
        }
    };

    match relay.connect(&handshake) {
        Ok((peer, channels)) => {
            ConnectionSession::new(relay, peer, channels)
                .run(socket)
                .await;
        }
        Err(e) => close_with(socket, e.close_code()).await,
    }
}
