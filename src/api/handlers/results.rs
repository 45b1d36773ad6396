//! Result set endpoints

use axum::extract::State;
use axum::Json;

use crate::api::server::AppState;

/// Endpoints classified as malicious
pub async fn get_blacklist(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.store.blacklist())
}

/// Endpoints classified as unreachable or not forwarding
pub async fn get_not_working(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.store.not_working())
}
