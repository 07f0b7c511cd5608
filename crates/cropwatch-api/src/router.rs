//! Route definitions for the CropWatch HTTP API.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/alerts/fanout", post(handlers::alerts::fanout));

    let ws_path = state.config.realtime.path.clone();
    let cors = build_cors_layer(&state.config.server);

    Router::new()
        .nest("/api", api_routes)
        .route(&ws_path, get(handlers::ws::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
