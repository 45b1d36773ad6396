//! Health check endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::server::AppState;

/// Health check endpoint with guard progress
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.status.borrow().clone();

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "sockguard",
            "uptime_secs": state.started_at.elapsed().as_secs(),
            "cycles": status.cycles,
            "checked": status.checked,
            "last_batch": status.last_batch,
            "last_persisted_at": status.last_persisted_at,
        })),
    )
}
