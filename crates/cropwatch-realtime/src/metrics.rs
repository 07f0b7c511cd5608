//! Realtime engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    connections_rejected: AtomicU64,
    connections_evicted: AtomicU64,
    heartbeat_timeouts: AtomicU64,
    frames_received: AtomicU64,
    events_published: AtomicU64,
    events_delivered: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an opened connection
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a closed connection
    pub fn connection_closed(&self) {
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Record a rejected handshake
    pub fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection evicted by the per-user cap
    pub fn connection_evicted(&self) {
        self.connections_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a heartbeat timeout
    pub fn heartbeat_timeout(&self) {
        self.heartbeat_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound text frame
    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a group publish and how many connections it reached
    pub fn event_published(&self, delivered: usize) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.events_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            connections_evicted: self.connections_evicted.load(Ordering::Relaxed),
            heartbeat_timeouts: self.heartbeat_timeouts.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever opened
    pub connections_total: u64,
    /// Currently open connections
    pub connections_active: u64,
    /// Handshakes rejected for missing or invalid tokens
    pub connections_rejected: u64,
    /// Connections closed by the per-user cap
    pub connections_evicted: u64,
    /// Connections closed by the heartbeat
    pub heartbeat_timeouts: u64,
    /// Inbound text frames
    pub frames_received: u64,
    /// Group publishes
    pub events_published: u64,
    /// Connection deliveries across all publishes
    pub events_delivered: u64,
}
