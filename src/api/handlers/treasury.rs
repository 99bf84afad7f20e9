use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::{from_latest, ApiResponse};
use crate::errors::AppError;
use crate::execution::TreasurySummary;
use crate::models::AgentWeights;
use crate::AppState;

#[derive(Serialize)]
pub struct TreasuryView {
    pub summary: TreasurySummary,
    pub weights: AgentWeights,
}

pub async fn summary(State(state): State<AppState>) -> Result<Json<ApiResponse<TreasuryView>>, AppError> {
    from_latest(&state, |r| TreasuryView {
        summary: r.treasury.clone(),
        weights: r.weights.clone(),
    })
    .await
}
