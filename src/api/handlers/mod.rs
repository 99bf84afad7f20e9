pub mod health;
pub mod metrics;
pub mod positions;
pub mod report;
pub mod treasury;
pub mod whales;

use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::pipeline::CycleReport;
use crate::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }

    pub fn err(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            error: Some(message.into()),
        })
    }
}

/// Project something out of the latest report, or 404 if no cycle has
/// finished yet.
pub(crate) async fn from_latest<T, F>(state: &AppState, f: F) -> Result<Json<ApiResponse<T>>, AppError>
where
    T: Serialize,
    F: FnOnce(&CycleReport) -> T,
{
    let latest = state.latest.read().await;
    match latest.as_ref() {
        Some(report) => Ok(ApiResponse::ok(f(report))),
        None => Err(AppError::NotFound("no cycle has completed yet".into())),
    }
}
