//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        // WebSocket gateway endpoint
        .route("/gateway", get(ws_handler))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(handlers::metrics::metrics_handler))
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/messages",
            get(handlers::message::list_messages).post(handlers::message::send_message),
        )
        .route("/presence", get(handlers::presence::list_presence))
        .route("/presence/{identity}", get(handlers::presence::get_presence))
        .route(
            "/presence/{identity}/heartbeat",
            post(handlers::presence::heartbeat),
        )
}
