//! API route definitions

use axum::routing::get;
use axum::Router;

use super::handlers;
use super::server::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/blacklist", get(handlers::results::get_blacklist))
        .route("/not_working", get(handlers::results::get_not_working))
        .with_state(state)
}
