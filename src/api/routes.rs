//! API Routes
//!
//! Configures the Axum router with the control endpoints and the
//! interception fallback.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    control_not_found, health_handler, intercept_handler, message_handler, release_handler,
    stats_handler, status_handler, AppState,
};

/// Path prefix reserved for the control plane. Never forwarded to the origin.
pub const CONTROL_PREFIX: &str = "/__sw";

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Control endpoints only; proxied responses keep the origin's headers
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let control = Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/status", get(status_handler))
        .route("/message", post(message_handler))
        .route("/release", post(release_handler))
        .fallback(control_not_found)
        .layer(cors);

    Router::new()
        .nest(CONTROL_PREFIX, control)
        .fallback(intercept_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
