//! Application state shared across all handlers.

use std::sync::Arc;

use cropwatch_auth::identity::IdentityResolver;
use cropwatch_core::config::AppConfig;
use cropwatch_database::connection::DatabasePool;
use cropwatch_realtime::server::RealtimeEngine;
use cropwatch_service::alert::fanout::AlertFanoutOrchestrator;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`; every field is cheap
/// to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// PostgreSQL pool, absent when running on in-memory backends
    pub db_pool: Option<DatabasePool>,
    /// Token → identity resolution for HTTP and WebSocket callers
    pub resolver: IdentityResolver,
    /// Alert fanout pipeline
    pub orchestrator: Arc<AlertFanoutOrchestrator>,
    /// WebSocket realtime engine
    pub realtime: RealtimeEngine,
}
