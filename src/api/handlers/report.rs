use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{from_latest, ApiResponse};
use crate::errors::AppError;
use crate::intelligence::{MacroOutlook, SentimentScore};
use crate::models::{Direction, FlowBreakdown, Opportunity};
use crate::pipeline::CycleReport;
use crate::AppState;

pub async fn report(State(state): State<AppState>) -> Result<Json<ApiResponse<CycleReport>>, AppError> {
    from_latest(&state, CycleReport::clone).await
}

#[derive(Debug, Default, Deserialize)]
pub struct OpportunityFilter {
    pub direction: Option<Direction>,
    pub limit: Option<usize>,
}

/// Ranked opportunities with their consensus attached.
pub async fn opportunities(
    State(state): State<AppState>,
    Query(filter): Query<OpportunityFilter>,
) -> Result<Json<ApiResponse<Vec<Opportunity>>>, AppError> {
    from_latest(&state, |r| {
        r.opportunities
            .iter()
            .filter(|o| filter.direction.map_or(true, |d| o.direction == d))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    })
    .await
}

#[derive(Serialize)]
pub struct FlowsView {
    pub targets: Vec<FlowBreakdown>,
    pub sentiment: SentimentScore,
    pub macro_outlook: MacroOutlook,
}

pub async fn flows(State(state): State<AppState>) -> Result<Json<ApiResponse<FlowsView>>, AppError> {
    from_latest(&state, |r| FlowsView {
        targets: r.flows.clone(),
        sentiment: r.sentiment.clone(),
        macro_outlook: r.macro_outlook.clone(),
    })
    .await
}
