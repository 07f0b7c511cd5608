//! # cropwatch-realtime
//!
//! Real-time delivery for CropWatch notifications. Provides:
//!
//! - Per-user delivery groups behind a pluggable registry
//! - The fanout broker the alert pipeline publishes through
//! - WebSocket connection authentication, heartbeat, and lifecycle
//! - Multi-node relay via Redis pub/sub (feature `redis-pubsub`)

pub mod bridge;
pub mod broker;
pub mod channel;
pub mod connection;
pub mod message;
pub mod metrics;
pub mod server;

pub use broker::FanoutBroker;
pub use channel::{GroupKey, GroupRegistry, MemoryGroupRegistry};
pub use connection::{ConnectionGateway, OpenConnection, Rejection, Session};
pub use metrics::RealtimeMetrics;
pub use server::RealtimeEngine;
