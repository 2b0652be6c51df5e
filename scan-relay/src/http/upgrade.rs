//! Transport upgrade router.
//!
//! The one place that decides whether an upgrade request may reach the
//! relay. Every listener serves the same router, so this gate covers all
//! of them.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Decision for an upgrade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeRoute {
    /// Hand the request to the relay's connection acceptor.
    Accept,
    /// Refuse without a response body.
    Reject,
}

/// Only the relay path is ever accepted for upgrade.
pub fn route_upgrade(path: &str, ws_path: &str) -> UpgradeRoute {
    if path == ws_path {
        UpgradeRoute::Accept
    } else {
        UpgradeRoute::Reject
    }
}

/// Middleware refusing upgrades on any path but the relay's.
///
/// The refusal carries no body and asks the client to drop the connection.
pub async fn upgrade_gate(State(ws_path): State<Arc<str>>, req: Request, next: Next) -> Response {
    if req.headers().contains_key(header::UPGRADE)
        && route_upgrade(req.uri().path(), &ws_path) == UpgradeRoute::Reject
    {
        tracing::debug!(path = %req.uri().path(), "Refusing upgrade on non-relay path");
        return (StatusCode::NOT_FOUND, [(header::CONNECTION, "close")]).into_response();
    }
    next.run(req).await
}
