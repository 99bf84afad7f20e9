use axum::extract::State;
use axum::Json;

use super::{from_latest, ApiResponse};
use crate::errors::AppError;
use crate::models::AccumulationCandidate;
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AccumulationCandidate>>>, AppError> {
    from_latest(&state, |r| r.whales.clone()).await
}
