// ============================
// backend-lib/src/ws_router.rs
// ============================
//! HTTP and WebSocket routes.
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{get_snapshot, health};
use crate::websocket::ws_handler;
use crate::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/board/{id}", get(get_snapshot))
        .route("/ws/board/{id}", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
