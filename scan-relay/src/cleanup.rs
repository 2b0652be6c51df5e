//! Background reaper for expired sessions.
//!
//! Runs periodically to tear down sessions older than their TTL, whether or
//! not both roles ever joined. Transport-level death is the heartbeat's job;
//! this catches sessions that are simply abandoned.

use crate::config::CleanupConfig;
use crate::connection::Shutdown;
use crate::server::PairRelay;
use scan_types::CloseCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;

/// Remove every session older than `ttl` at `now`, closing its live
/// connections with a normal closure.
///
/// Returns the number of sessions removed.
pub fn reap_expired(relay: &PairRelay, now: Instant, ttl: Duration) -> usize {
    let expired = relay.registry().drain_expired(now, ttl);

    for (token, record) in &expired {
        for conn in [record.desktop, record.mobile].into_iter().flatten() {
            if let Some(peer) = relay.connections().get(conn) {
                peer.shutdown(Shutdown::Close(CloseCode::Normal));
            }
        }
        tracing::debug!(session = ?token, age_secs = record.age(now).as_secs(), "Session expired");
    }

    relay
        .metrics()
        .sessions_expired
        .fetch_add(expired.len() as u64, Ordering::Relaxed);
    expired.len()
}

/// Spawn a background cleanup task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_task(
    relay: Arc<PairRelay>,
    config: CleanupConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Cleanup task disabled");
            return;
        }

        let interval_secs = config.interval_secs;
        tracing::info!(
            "Cleanup task started (interval: {}s, ttl: {}s)",
            interval_secs,
            config.session_ttl_secs
        );

        let mut timer = interval(config.interval());

        loop {
            timer.tick().await;

            let removed = reap_expired(&relay, Instant::now(), config.session_ttl());
            if removed > 0 {
                tracing::info!("Cleanup: expired {} sessions", removed);
            } else {
                tracing::debug!("Cleanup: no expired sessions");
            }
        }
    })
}
