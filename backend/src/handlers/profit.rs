//! HTTP handlers for profit reporting

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::profit::ProfitService;
use crate::AppState;
use shared::profit::ProfitReport;

#[derive(Debug, Deserialize)]
pub struct ProfitQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Compute profits for sales within an inclusive date range
pub async fn get_profits(
    State(state): State<AppState>,
    Query(query): Query<ProfitQuery>,
) -> AppResult<Json<ProfitReport>> {
    let service = ProfitService::new(state.db);
    let report = service
        .compute(query.start_date.as_deref(), query.end_date.as_deref())
        .await?;
    Ok(Json(report))
}
