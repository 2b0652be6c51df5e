//! Prometheus metrics endpoint.

use crate::server::PairRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<PairRelay>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render(&relay),
    )
}

fn render(relay: &PairRelay) -> String {
    let m = relay.metrics();

    // Gauges: current state
    let connections = relay.total_connections();
    let sessions = relay.total_sessions();

    // Counters: monotonic since startup
    let conns_total = m.connections_total.load(Ordering::Relaxed);
    let rejections = m.handshake_rejections.load(Ordering::Relaxed);
    let replacements = m.replacements_total.load(Ordering::Relaxed);
    let timeouts = m.liveness_timeouts.load(Ordering::Relaxed);
    let expired = m.sessions_expired.load(Ordering::Relaxed);
    let relayed = m.frames_relayed.load(Ordering::Relaxed);
    let dropped = m.frames_dropped.load(Ordering::Relaxed);
    let bytes = m.bytes_relayed.load(Ordering::Relaxed);

    format!(
        r#"# HELP scan_relay_connections_active Number of open connections
# TYPE scan_relay_connections_active gauge
scan_relay_connections_active {connections}

# HELP scan_relay_sessions_active Number of live sessions
# TYPE scan_relay_sessions_active gauge
scan_relay_sessions_active {sessions}

# HELP scan_relay_info Server information
# TYPE scan_relay_info gauge
scan_relay_info{{version="{version}"}} 1

# HELP scan_relay_connections_total Total connections paired
# TYPE scan_relay_connections_total counter
scan_relay_connections_total {conns_total}

# HELP scan_relay_handshake_rejections_total Total joins refused
# TYPE scan_relay_handshake_rejections_total counter
scan_relay_handshake_rejections_total {rejections}

# HELP scan_relay_replacements_total Total connections replaced by a same-role sibling
# TYPE scan_relay_replacements_total counter
scan_relay_replacements_total {replacements}

# HELP scan_relay_liveness_timeouts_total Total connections terminated by heartbeat
# TYPE scan_relay_liveness_timeouts_total counter
scan_relay_liveness_timeouts_total {timeouts}

# HELP scan_relay_sessions_expired_total Total sessions removed by the reaper
# TYPE scan_relay_sessions_expired_total counter
scan_relay_sessions_expired_total {expired}

# HELP scan_relay_frames_relayed_total Total frames forwarded to a partner
# TYPE scan_relay_frames_relayed_total counter
scan_relay_frames_relayed_total {relayed}

# HELP scan_relay_frames_dropped_total Total frames dropped for lack of a live partner
# TYPE scan_relay_frames_dropped_total counter
scan_relay_frames_dropped_total {dropped}

# HELP scan_relay_bytes_relayed_total Total payload bytes forwarded
# TYPE scan_relay_bytes_relayed_total counter
scan_relay_bytes_relayed_total {bytes}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn prometheus_format_reflects_counters() {
        let relay = PairRelay::new(Config::default());
        relay.metrics().frames_relayed.fetch_add(7, Ordering::Relaxed);

        let body = render(&relay);
        assert!(body.contains("# TYPE scan_relay_sessions_active gauge"));
        assert!(body.contains("scan_relay_frames_relayed_total 7\n"));
        assert!(body.contains("scan_relay_connections_active 0\n"));
    }
}
