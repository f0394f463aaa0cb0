//! HTTP handlers for sale endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::sale::{RecordSaleInput, SaleRecorded, SaleService, SaleWithItems};
use crate::AppState;

/// Record a sale
pub async fn create_sale(
    State(state): State<AppState>,
    Json(input): Json<RecordSaleInput>,
) -> AppResult<(StatusCode, Json<SaleRecorded>)> {
    let service = SaleService::new(state.db);
    let recorded = service.record(input).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

/// List all sales with their items, newest first
pub async fn list_sales(State(state): State<AppState>) -> AppResult<Json<Vec<SaleWithItems>>> {
    let service = SaleService::new(state.db);
    let sales = service.list().await?;
    Ok(Json(sales))
}

/// Annul a sale, restoring stock where possible
pub async fn delete_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = SaleService::new(state.db);
    service.cancel(sale_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
