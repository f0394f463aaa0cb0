//! HTTP handlers for price history

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::PriceEntry;
use crate::services::PriceHistoryService;
use crate::AppState;

/// List a product's price history, oldest first
pub async fn get_price_history(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<PriceEntry>>> {
    let service = PriceHistoryService::new(state.db);
    let history = service.list(product_id).await?;
    Ok(Json(history))
}
