//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

/// Backing transport for the group registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Groups live in this process only.
    #[default]
    Memory,
    /// Group sends are relayed through Redis pub/sub to every node.
    Redis,
}

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Path the notification socket is served on.
    #[serde(default = "default_path")]
    pub path: String,
    /// Maximum WebSocket connections per user.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Per-connection outbound queue size.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Heartbeat check interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Idle time after which a silent connection is considered dead, in seconds.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Group registry transport.
    #[serde(default)]
    pub transport: TransportKind,
    /// Redis URL when `transport = "redis"`.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Redis channel prefix for group relays.
    #[serde(default = "default_redis_prefix")]
    pub redis_channel_prefix: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            max_connections_per_user: default_max_connections_per_user(),
            channel_buffer_size: default_channel_buffer(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            transport: TransportKind::default(),
            redis_url: default_redis_url(),
            redis_channel_prefix: default_redis_prefix(),
        }
    }
}

fn default_path() -> String {
    "/ws/notifications/".to_string()
}

fn default_max_connections_per_user() -> usize {
    5
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}

fn default_ping_timeout() -> u64 {
    90
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_prefix() -> String {
    "cropwatch:group:".to_string()
}
