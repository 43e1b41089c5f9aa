//! # Routes
//!
//! Axum router configuration for the checkout API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Create the main application router
///
/// Routes:
/// - GET  / - Greeting
/// - GET  /health - Health check
/// - GET  /api/hello - JSON greeting
/// - POST /api/create-checkout-session - Create hosted checkout, returns `{url}`
/// - POST /api/webhook - Stripe webhook handler
pub fn create_router(state: AppState) -> Router {
    let origin = match state.config.cors_origin() {
        Some(origin) => AllowOrigin::exact(origin),
        None => {
            warn!(
                "FRONTEND_URL {:?} is not an origin, allowing any origin",
                state.config.frontend_url
            );
            AllowOrigin::any()
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/hello", get(handlers::hello))
        .route(
            "/create-checkout-session",
            post(handlers::create_checkout_session),
        )
        // raw body is needed for signature verification
        .route("/webhook", post(handlers::webhook));

    Router::new()
        .route("/", get(handlers::hello_world))
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
