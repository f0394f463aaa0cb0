//! HTTP handlers for purchase endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::purchase::{
    PurchaseRecorded, PurchaseService, PurchaseSummary, RecordPurchaseInput,
};
use crate::AppState;

/// Record a purchase
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(input): Json<RecordPurchaseInput>,
) -> AppResult<(StatusCode, Json<PurchaseRecorded>)> {
    let service = PurchaseService::new(state.db);
    let recorded = service.record(input).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

/// List all purchases, newest first
pub async fn list_purchases(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PurchaseSummary>>> {
    let service = PurchaseService::new(state.db);
    let purchases = service.list().await?;
    Ok(Json(purchases))
}

/// Annul a purchase
pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = PurchaseService::new(state.db);
    service.cancel(purchase_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
