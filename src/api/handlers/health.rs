//! Health and index endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::server::AppState;

/// Basic API information
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "YouTube Transcript API",
        "endpoints": [
            "/transcript/{video_id}",
            "/transcripts/{video_id}"
        ]
    }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "transcript-relay",
            "uptime_secs": state.started_at.elapsed().as_secs(),
            "proxy_pool": state.proxy_pool.as_ref().map(|pool| pool.available_count()),
        })),
    )
}
