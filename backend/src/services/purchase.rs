//! Purchase intake and reversal
//!
//! Intake follows the append-vs-consolidate policy: a purchase above the
//! current highest batch cost re-costs all existing stock to the new price
//! in a single consolidated batch, anything else becomes an independent
//! batch. Reversal undoes a purchase only while the affected batches are
//! untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{BatchSnapshot, PrevBatches, PurchaseAction};
use crate::services::{lock_batches, lock_product, PriceHistoryService};
use shared::ledger::{
    consolidation_intact, plan_add_batch_reversal, plan_intake, sale_price, AddBatchReversal,
    IntakePlan,
};
use shared::validation::{validate_quantity, validate_unit_cost};

/// Purchase service owning intake and annulment
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

/// Input for recording a purchase
#[derive(Debug, Deserialize)]
pub struct RecordPurchaseInput {
    pub product_id: Uuid,
    pub unit_cost: f64,
    pub quantity: f64,
}

/// Result of a recorded purchase
#[derive(Debug, Serialize)]
pub struct PurchaseRecorded {
    pub purchase_id: Uuid,
    pub action: PurchaseAction,
}

/// Purchase as listed for auditing
#[derive(Debug, Serialize)]
pub struct PurchaseSummary {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub product_id: Uuid,
    pub action: PurchaseAction,
    pub unit_cost: f64,
    pub quantity: f64,
    pub created_batch_id: Option<Uuid>,
}

/// Purchase row loaded for reversal
#[derive(Debug, FromRow)]
struct PurchaseRow {
    id: Uuid,
    product_id: Uuid,
    action: String,
    created_batch_id: Option<Uuid>,
    prev_batches_snapshot: Option<Json<PrevBatches>>,
    unit_cost: f64,
    quantity: f64,
    date: DateTime<Utc>,
}

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a purchase, folding it into the product's batch set
    pub async fn record(&self, input: RecordPurchaseInput) -> AppResult<PurchaseRecorded> {
        validate_unit_cost(input.unit_cost)
            .map_err(|msg| AppError::validation("unit_cost", msg))?;
        validate_quantity(input.quantity)
            .map_err(|msg| AppError::validation("quantity", msg))?;

        let mut tx = self.db.begin().await?;

        let product = lock_product(&mut tx, input.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", input.product_id)))?;
        let batches = lock_batches(&mut tx, product.id).await?;

        let plan = plan_intake(&batches, input.unit_cost, input.quantity);
        let (action, purchase_id) = match plan {
            IntakePlan::FirstBatch | IntakePlan::AppendBatch => {
                let batch_id =
                    insert_batch(&mut tx, product.id, input.unit_cost, input.quantity).await?;
                let purchase_id = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    INSERT INTO purchases (product_id, action, created_batch_id, unit_cost, quantity)
                    VALUES ($1, 'add_batch', $2, $3, $4)
                    RETURNING id
                    "#,
                )
                .bind(product.id)
                .bind(batch_id)
                .bind(input.unit_cost)
                .bind(input.quantity)
                .fetch_one(&mut *tx)
                .await?;
                (PurchaseAction::AddBatch, purchase_id)
            }
            IntakePlan::Consolidate {
                snapshot,
                total_quantity,
            } => {
                // All prior stock is re-costed to the new, higher price. The
                // snapshot is what makes this reversible later.
                sqlx::query("DELETE FROM batches WHERE product_id = $1")
                    .bind(product.id)
                    .execute(&mut *tx)
                    .await?;
                let batch_id =
                    insert_batch(&mut tx, product.id, input.unit_cost, total_quantity).await?;
                let purchase_id = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    INSERT INTO purchases
                        (product_id, action, created_batch_id, prev_batches_snapshot, unit_cost, quantity)
                    VALUES ($1, 'consolidate', $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(product.id)
                .bind(batch_id)
                .bind(Json(PrevBatches::new(snapshot)))
                .bind(input.unit_cost)
                .bind(input.quantity)
                .fetch_one(&mut *tx)
                .await?;
                (PurchaseAction::Consolidate, purchase_id)
            }
        };

        PriceHistoryService::append(
            &mut tx,
            product.id,
            input.unit_cost,
            sale_price(input.unit_cost, product.markup),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %product.id,
            action = action.as_str(),
            unit_cost = input.unit_cost,
            quantity = input.quantity,
            "purchase recorded"
        );

        Ok(PurchaseRecorded {
            purchase_id,
            action,
        })
    }

    /// List all purchases, newest first
    pub async fn list(&self) -> AppResult<Vec<PurchaseSummary>> {
        let rows = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, product_id, action, created_batch_id, prev_batches_snapshot,
                   unit_cost, quantity, date
            FROM purchases
            ORDER BY date DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(summary_from_row).collect()
    }

    /// Annul a purchase, restoring the batch set it altered.
    ///
    /// Refused with a conflict whenever stock the purchase brought in has
    /// since been consumed, or (for consolidations) when later purchases of
    /// the same product depend on the consolidated batch layout.
    pub async fn cancel(&self, purchase_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let purchase = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, product_id, action, created_batch_id, prev_batches_snapshot,
                   unit_cost, quantity, date
            FROM purchases
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(purchase_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Purchase {}", purchase_id)))?;

        lock_product(&mut tx, purchase.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", purchase.product_id)))?;

        match PurchaseAction::parse(&purchase.action) {
            Some(PurchaseAction::AddBatch) => {
                self.cancel_add_batch(&mut tx, &purchase).await?;
            }
            Some(PurchaseAction::Consolidate) => {
                self.cancel_consolidation(&mut tx, &purchase).await?;
            }
            None => {
                return Err(AppError::validation("action", "Unknown purchase action"));
            }
        }

        sqlx::query("DELETE FROM purchases WHERE id = $1")
            .bind(purchase.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(purchase_id = %purchase_id, "purchase annulled");
        Ok(())
    }

    async fn cancel_add_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        purchase: &PurchaseRow,
    ) -> AppResult<()> {
        let batch_id = purchase
            .created_batch_id
            .ok_or_else(|| AppError::Conflict("Purchase has no linked batch".to_string()))?;

        let batch_quantity = sqlx::query_scalar::<_, f64>(
            "SELECT quantity FROM batches WHERE id = $1 FOR UPDATE",
        )
        .bind(batch_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("The batch created by this purchase no longer exists".to_string())
        })?;

        match plan_add_batch_reversal(batch_quantity, purchase.quantity) {
            Some(AddBatchReversal::RemoveBatch) => {
                sqlx::query("DELETE FROM batches WHERE id = $1")
                    .bind(batch_id)
                    .execute(&mut **tx)
                    .await?;
            }
            Some(AddBatchReversal::Decrement(remaining)) => {
                sqlx::query("UPDATE batches SET quantity = $1 WHERE id = $2")
                    .bind(remaining)
                    .bind(batch_id)
                    .execute(&mut **tx)
                    .await?;
            }
            None => {
                return Err(AppError::Conflict(
                    "Cannot annul: part of the batch has already been sold".to_string(),
                ));
            }
        }

        Ok(())
    }

    async fn cancel_consolidation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        purchase: &PurchaseRow,
    ) -> AppResult<()> {
        let batch_id = purchase
            .created_batch_id
            .ok_or_else(|| AppError::Conflict("Purchase has no linked batch".to_string()))?;

        let consolidated_quantity = sqlx::query_scalar::<_, f64>(
            "SELECT quantity FROM batches WHERE id = $1 FOR UPDATE",
        )
        .bind(batch_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("The consolidated batch no longer exists".to_string())
        })?;

        let snapshot: Vec<BatchSnapshot> = purchase
            .prev_batches_snapshot
            .as_ref()
            .map(|json| json.0.batches.clone())
            .unwrap_or_default();

        if !consolidation_intact(consolidated_quantity, &snapshot, purchase.quantity) {
            return Err(AppError::Conflict(
                "Cannot annul: stock of the consolidated batch has been consumed".to_string(),
            ));
        }

        // Reversing out of order would corrupt the batch history that later
        // purchases assumed.
        let later_purchase = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM purchases
                WHERE product_id = $1 AND id <> $2 AND date > $3
            )
            "#,
        )
        .bind(purchase.product_id)
        .bind(purchase.id)
        .bind(purchase.date)
        .fetch_one(&mut **tx)
        .await?;

        if later_purchase {
            return Err(AppError::Conflict(
                "Cannot annul: the product has later purchases".to_string(),
            ));
        }

        sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(batch_id)
            .execute(&mut **tx)
            .await?;

        for prev in &snapshot {
            insert_batch(tx, purchase.product_id, prev.cost, prev.quantity).await?;
        }

        Ok(())
    }
}

/// Insert a batch and return its id
async fn insert_batch(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    cost: f64,
    quantity: f64,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO batches (product_id, cost, quantity) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(product_id)
    .bind(cost)
    .bind(quantity)
    .fetch_one(&mut **tx)
    .await
}

fn summary_from_row(row: PurchaseRow) -> AppResult<PurchaseSummary> {
    let action = PurchaseAction::parse(&row.action)
        .ok_or_else(|| AppError::validation("action", "Unknown purchase action"))?;
    Ok(PurchaseSummary {
        id: row.id,
        date: row.date,
        product_id: row.product_id,
        action,
        unit_cost: row.unit_cost,
        quantity: row.quantity,
        created_batch_id: row.created_batch_id,
    })
}
