//! Health check endpoints.

use crate::server::PairRelay;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Global start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call once at startup).
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Relay health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Number of open connections.
    pub connections: usize,
    /// Number of live sessions.
    pub sessions: usize,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Client-facing health response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiHealth {
    /// Always true when the server answers.
    pub ok: bool,
    /// Whether an upstream LLM credential is configured.
    pub llm: bool,
    /// Human-readable hint.
    pub message: String,
}

/// Relay health check handler.
pub async fn health_handler(Extension(relay): Extension<Arc<PairRelay>>) -> Json<HealthStatus> {
    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0);

    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: relay.total_connections(),
        sessions: relay.total_sessions(),
        uptime_seconds: uptime,
    })
}

/// `/api/health` handler.
pub async fn api_health_handler(Extension(relay): Extension<Arc<PairRelay>>) -> Json<ApiHealth> {
    let llm = relay.config().llm.credential_configured();
    let message = if llm {
        "LLM configured".to_string()
    } else {
        format!(
            "Set {} for real AI replies",
            relay.config().llm.api_key_env
        )
    };
    Json(ApiHealth {
        ok: true,
        llm,
        message,
    })
}
