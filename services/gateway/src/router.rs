//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the gateway: the
//! liveness endpoints, the incoming-call webhook, and the media-stream
//! WebSocket endpoint.

use crate::{handlers, state::AppState, ws::ws_handler};

use axum::{
    Router,
    routing::get,
};
use std::sync::Arc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/incoming-call",
            get(handlers::incoming_call).post(handlers::incoming_call),
        )
        .route("/media-stream", get(ws_handler))
        .with_state(app_state)
}
