//! API route definitions
//!
//! - `/` and `/health` - liveness with the input mode
//! - `/api/v1/status` - system status and counters
//! - `/api/v1/live` - latest display snapshot
//! - `/api/v1/logs` - event log, newest first
//! - `/api/v1/thresholds` - active thresholds and gauge settings
//! - `/api/v1/history` - persisted readings
//! - `/api/v1/reset` - operator reset
//! - `/ws/frontend` - live updates

use axum::{routing::{get, post}, Router};

use super::handlers::{self, ApiState};
use super::ws;

/// Versioned JSON endpoints, nested under `/api/v1`
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        .route("/live", get(handlers::get_live))
        .route("/logs", get(handlers::get_logs))
        .route("/thresholds", get(handlers::get_thresholds))
        .route("/history", get(handlers::get_history))
        .route("/reset", post(handlers::reset_dashboard))
        .with_state(state)
}

/// Root-level health and WebSocket endpoints
pub fn root_routes(state: ApiState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::root))
        .route("/ws/frontend", get(ws::ws_handler))
        .with_state(state)
}
