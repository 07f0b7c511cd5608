//! Ping/pong heartbeat for WebSocket liveness.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, warn};

use cropwatch_core::config::RealtimeConfig;

use super::handle::{CloseReason, ConnectionHandle};
use crate::metrics::RealtimeMetrics;

/// Heartbeat configuration
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Silence after which the connection is considered dead
    pub ping_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_seconds.max(1)),
            ping_timeout: Duration::from_secs(config.ping_timeout_seconds.max(1)),
        }
    }
}

/// Run heartbeat loop for a connection.
///
/// On every tick the connection is closed if nothing was received within
/// `ping_timeout`; otherwise a protocol ping is queued so that a live peer
/// answers and refreshes its last-seen time. Ends when the connection
/// closes for any reason.
pub async fn run_heartbeat(
    handle: Arc<ConnectionHandle>,
    config: HeartbeatConfig,
    metrics: Arc<RealtimeMetrics>,
) {
    let mut interval = time::interval_at(Instant::now() + config.ping_interval, config.ping_interval);

    loop {
        tokio::select! {
            _ = handle.closed() => break,
            _ = interval.tick() => {}
        }

        let idle = handle.idle_for();
        if idle > config.ping_timeout {
            warn!(
                conn_id = %handle.id,
                user_id = %handle.user_id,
                idle_secs = idle.as_secs(),
                "Connection heartbeat timeout"
            );
            metrics.heartbeat_timeout();
            handle.close(CloseReason::HeartbeatTimeout);
            break;
        }

        if !handle.ping() {
            debug!(conn_id = %handle.id, "Heartbeat ping not queued");
        }
    }

    debug!(conn_id = %handle.id, "Heartbeat loop ended");
}
