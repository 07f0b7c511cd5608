//! Cross-process group relays.

#[cfg(feature = "redis-pubsub")]
pub mod redis_pubsub;

#[cfg(feature = "redis-pubsub")]
pub use redis_pubsub::RedisGroupRegistry;
