//! HTTP and WebSocket API using Axum
//!
//! All JSON responses use the `{data, meta}` envelope from [`envelope`].

pub mod envelope;
pub mod handlers;
mod routes;
pub mod ws;

pub use handlers::ApiState;

use axum::http::{header, Method};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable listing allowed cross-origin dashboard hosts.
pub const CORS_ORIGINS_ENV_VAR: &str = "COMPRESSOR_MONITOR_CORS_ORIGINS";

/// Build a CORS layer that is same-origin only by default.
///
/// Set `COMPRESSOR_MONITOR_CORS_ORIGINS` to a comma-separated list of origins
/// (e.g. `http://localhost:5173` for a frontend dev server).
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match std::env::var(CORS_ORIGINS_ENV_VAR) {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the complete application router.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::root_routes(state))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer())
}
