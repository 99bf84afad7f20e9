use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

/// Always 200 while the process is up; reports when the last cycle finished.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let latest = state.latest.read().await;
    let last_cycle = latest.as_ref().map(|r| r.finished_at);
    let unavailable = latest
        .as_ref()
        .map(|r| r.unavailable_sources.len())
        .unwrap_or(0);

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "last_cycle": last_cycle,
            "unavailable_sources": unavailable,
        })),
    )
}
