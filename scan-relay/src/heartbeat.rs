//! Heartbeat monitor.
//!
//! Every interval, each open connection either gets a probe or, if it did
//! not acknowledge the previous one, is terminated and run through the
//! disconnect path. A dead peer is detected within two intervals.

use crate::config::HeartbeatConfig;
use crate::connection::{DisconnectReason, Shutdown};
use crate::server::PairRelay;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::interval;

/// What one heartbeat pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Connections sent a fresh probe.
    pub probed: usize,
    /// Connections terminated for missing the previous probe.
    pub terminated: usize,
}

/// Run one heartbeat pass over every open connection.
pub fn tick(relay: &PairRelay) -> HeartbeatReport {
    let mut report = HeartbeatReport::default();

    for peer in relay.connections().snapshot() {
        if peer.take_alive() {
            peer.ping();
            report.probed += 1;
            continue;
        }

        peer.shutdown(Shutdown::Terminate);
        if relay.disconnect(peer.id(), DisconnectReason::LivenessTimeout) {
            relay.metrics().liveness_timeouts.fetch_add(1, Ordering::Relaxed);
            report.terminated += 1;
        }
    }

    report
}

/// Spawn the background heartbeat task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_heartbeat_task(
    relay: Arc<PairRelay>,
    config: HeartbeatConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Heartbeat task disabled");
            return;
        }

        tracing::info!("Heartbeat task started (interval: {}s)", config.interval_secs);

        let mut timer = interval(config.interval());
        timer.tick().await; // first tick is immediate

        loop {
            timer.tick().await;

            let report = tick(&relay);
            if report.terminated > 0 {
                tracing::info!(
                    "Heartbeat: terminated {} unresponsive connections",
                    report.terminated
                );
            } else {
                tracing::trace!("Heartbeat: probed {} connections", report.probed);
            }
        }
    })
}
