//! # cropwatch-database
//!
//! Backends for the collaborator interfaces declared in `cropwatch-entity`:
//!
//! - `connection`: PostgreSQL pool management
//! - `repositories`: sqlx implementations of the user directory, API token
//!   store, and notification store
//! - `memory`: in-process implementations for single-node runs and tests

pub mod connection;
pub mod memory;
pub mod repositories;

pub use connection::DatabasePool;
pub use memory::{MemoryApiTokenStore, MemoryNotificationStore, MemoryUserDirectory};
pub use repositories::{ApiTokenRepository, NotificationRepository, UserRepository};
