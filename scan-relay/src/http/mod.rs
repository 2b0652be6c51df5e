//! HTTP endpoints for scan-relay.
//!
//! One router serves the relay upgrade endpoint, health checks, metrics,
//! and the client API. Every listener gets this same router.

pub mod ask;
pub mod health;
mod metrics;
pub mod upgrade;

use crate::protocol::ws_handler;
use crate::server::PairRelay;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::{middleware, Extension, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub use ask::{AskBackend, AskService};
pub use health::HealthStatus;

/// Build the HTTP router with all endpoints and no ask backend.
pub fn build_router(relay: Arc<PairRelay>) -> Router {
    build_router_with(relay, AskService::unconfigured())
}

/// Build the HTTP router with all endpoints.
pub fn build_router_with(relay: Arc<PairRelay>, ask: AskService) -> Router {
    let ws_path: Arc<str> = Arc::from(relay.config().server.ws_path.as_str());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let api = Router::new()
        .route("/api/health", get(health::api_health_handler))
        .route("/api/ask", post(ask::ask_handler))
        .layer(cors);

    Router::new()
        .route(&ws_path, get(ws_handler))
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .merge(api)
        .layer(middleware::from_fn_with_state(ws_path, upgrade::upgrade_gate))
        .layer(Extension(relay))
        .layer(Extension(ask))
}
