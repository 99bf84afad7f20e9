use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::{from_latest, ApiResponse};
use crate::errors::AppError;
use crate::models::PaperPosition;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Open,
    Closed,
}

#[derive(Debug, Default, Deserialize)]
pub struct PositionQuery {
    pub status: Option<StatusFilter>,
}

/// Paper positions as of the last cycle, newest first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PositionQuery>,
) -> Result<Json<ApiResponse<Vec<PaperPosition>>>, AppError> {
    from_latest(&state, |r| {
        let mut positions: Vec<PaperPosition> = r
            .positions
            .iter()
            .filter(|p| match query.status {
                Some(StatusFilter::Open) => p.is_open(),
                Some(StatusFilter::Closed) => !p.is_open(),
                None => true,
            })
            .cloned()
            .collect();
        positions.sort_by(|a, b| b.entry_time.cmp(&a.entry_time));
        positions
    })
    .await
}
