//! Sale allocation and reversal
//!
//! A sale draws stock from the most expensive batch first (ties broken by
//! oldest), freezing the unit price per line at batch cost plus markup.
//! The whole multi-item request commits atomically or not at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{lock_batches, lock_product};
use shared::ledger::{plan_allocation, sale_price};
use shared::validation::validate_quantity;

/// Sale service owning allocation and annulment
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

/// Input for recording a sale
#[derive(Debug, Deserialize)]
pub struct RecordSaleInput {
    pub items: Vec<SaleItemInput>,
}

/// One requested line of a sale
#[derive(Debug, Deserialize)]
pub struct SaleItemInput {
    pub product_id: Uuid,
    pub quantity: f64,
}

/// Result of a recorded sale
#[derive(Debug, Serialize)]
pub struct SaleRecorded {
    pub sale_id: Uuid,
    pub total: f64,
}

/// Sale with its items, as listed
#[derive(Debug, Serialize)]
pub struct SaleWithItems {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub total: f64,
    pub items: Vec<SaleLine>,
}

#[derive(Debug, Serialize)]
pub struct SaleLine {
    pub product_id: Uuid,
    pub batch_id: Uuid,
    pub quantity: f64,
    pub price_at_sale: f64,
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    sale_id: Uuid,
    product_id: Uuid,
    batch_id: Uuid,
    quantity: f64,
    price_at_sale: f64,
}

/// Order sale items by product id before locking. Two concurrent sales
/// then always take product locks in the same order and cannot deadlock
/// on each other.
fn lock_order(items: &[SaleItemInput]) -> Vec<&SaleItemInput> {
    let mut ordered: Vec<&SaleItemInput> = items.iter().collect();
    ordered.sort_by_key(|item| item.product_id);
    ordered
}

/// A planned line: batch draw priced at sale time, pending insertion
struct PricedDraw {
    product_id: Uuid,
    batch_id: Uuid,
    quantity: f64,
    price_at_sale: f64,
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale across one or more products.
    ///
    /// Fails without committing anything when any item cannot be fully
    /// satisfied from the product's batches.
    pub async fn record(&self, input: RecordSaleInput) -> AppResult<SaleRecorded> {
        if input.items.is_empty() {
            return Err(AppError::validation("items", "At least one item is required"));
        }
        for item in &input.items {
            validate_quantity(item.quantity)
                .map_err(|msg| AppError::validation("quantity", msg))?;
        }

        let mut tx = self.db.begin().await?;

        let mut total = 0.0;
        let mut lines: Vec<PricedDraw> = Vec::new();

        for item in lock_order(&input.items) {
            let product = lock_product(&mut tx, item.product_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Product {}", item.product_id)))?;
            let batches = lock_batches(&mut tx, product.id).await?;

            let draws = plan_allocation(&batches, item.quantity).map_err(|available| {
                AppError::InsufficientStock(format!(
                    "Product '{}' has {} units available, {} requested",
                    product.name, available, item.quantity
                ))
            })?;

            for draw in draws {
                sqlx::query("UPDATE batches SET quantity = quantity - $1 WHERE id = $2")
                    .bind(draw.take)
                    .bind(draw.batch_id)
                    .execute(&mut *tx)
                    .await?;

                let unit_price = sale_price(draw.cost, product.markup);
                total += draw.take * unit_price;
                lines.push(PricedDraw {
                    product_id: product.id,
                    batch_id: draw.batch_id,
                    quantity: draw.take,
                    price_at_sale: unit_price,
                });
            }
        }

        let sale_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO sales (total) VALUES ($1) RETURNING id",
        )
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO sale_items (sale_id, product_id, batch_id, quantity, price_at_sale)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(sale_id)
            .bind(line.product_id)
            .bind(line.batch_id)
            .bind(line.quantity)
            .bind(line.price_at_sale)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(sale_id = %sale_id, total, lines = lines.len(), "sale recorded");
        Ok(SaleRecorded { sale_id, total })
    }

    /// List all sales with their items, newest first
    pub async fn list(&self) -> AppResult<Vec<SaleWithItems>> {
        let sales = sqlx::query_as::<_, (Uuid, DateTime<Utc>, f64)>(
            "SELECT id, date, total FROM sales ORDER BY date DESC",
        )
        .fetch_all(&self.db)
        .await?;

        let sale_ids: Vec<Uuid> = sales.iter().map(|(id, _, _)| *id).collect();
        let items = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT sale_id, product_id, batch_id, quantity, price_at_sale
            FROM sale_items
            WHERE sale_id = ANY($1)
            "#,
        )
        .bind(&sale_ids)
        .fetch_all(&self.db)
        .await?;

        let mut result: Vec<SaleWithItems> = sales
            .into_iter()
            .map(|(id, date, total)| SaleWithItems {
                id,
                date,
                total,
                items: Vec::new(),
            })
            .collect();
        for row in items {
            if let Some(sale) = result.iter_mut().find(|s| s.id == row.sale_id) {
                sale.items.push(SaleLine {
                    product_id: row.product_id,
                    batch_id: row.batch_id,
                    quantity: row.quantity,
                    price_at_sale: row.price_at_sale,
                });
            }
        }

        Ok(result)
    }

    /// Annul a sale, restoring stock to the batches it drew from.
    ///
    /// A batch that has since been deleted (consolidated away, or removed by
    /// a purchase reversal) cannot receive its stock back; that line is
    /// skipped with a warning rather than failing the whole reversal.
    pub async fn cancel(&self, sale_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM sales WHERE id = $1 FOR UPDATE")
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Sale {}", sale_id)))?;

        let items = sqlx::query_as::<_, (Uuid, f64)>(
            "SELECT batch_id, quantity FROM sale_items WHERE sale_id = $1",
        )
        .bind(sale_id)
        .fetch_all(&mut *tx)
        .await?;

        for (batch_id, quantity) in &items {
            let restored = sqlx::query("UPDATE batches SET quantity = quantity + $1 WHERE id = $2")
                .bind(quantity)
                .bind(batch_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if restored == 0 {
                tracing::warn!(
                    sale_id = %sale_id,
                    batch_id = %batch_id,
                    quantity,
                    "batch no longer exists; stock not restored"
                );
            }
        }

        sqlx::query("DELETE FROM sale_items WHERE sale_id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(sale_id = %sale_id, "sale annulled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: Uuid, quantity: f64) -> SaleItemInput {
        SaleItemInput {
            product_id,
            quantity,
        }
    }

    /// Items are locked in ascending product-id order regardless of the
    /// order they were requested in
    #[test]
    fn test_lock_order_is_request_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let forward = vec![item(a, 1.0), item(b, 2.0)];
        let reversed = vec![item(b, 2.0), item(a, 1.0)];

        let forward_ids: Vec<Uuid> = lock_order(&forward).iter().map(|i| i.product_id).collect();
        let reversed_ids: Vec<Uuid> = lock_order(&reversed).iter().map(|i| i.product_id).collect();

        assert_eq!(forward_ids, reversed_ids);
        assert!(forward_ids[0] < forward_ids[1]);
    }

    /// Repeated lines for one product stay in their requested order
    #[test]
    fn test_lock_order_keeps_duplicate_lines_stable() {
        let id = Uuid::new_v4();
        let items = vec![item(id, 5.0), item(id, 3.0)];

        let quantities: Vec<f64> = lock_order(&items).iter().map(|i| i.quantity).collect();
        assert_eq!(quantities, vec![5.0, 3.0]);
    }
}
