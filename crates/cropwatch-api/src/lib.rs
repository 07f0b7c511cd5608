//! # cropwatch-api
//!
//! HTTP layer for CropWatch built on Axum.
//!
//! Serves the health check, the alert fanout hook used by the alert
//! creation flow, and the notification WebSocket.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
