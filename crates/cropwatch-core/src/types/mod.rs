//! Shared value types.

pub mod id;

pub use id::{AlertId, NotificationId, UserId};
