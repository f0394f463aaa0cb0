//! Price history recording
//!
//! Append-only audit trail of a product's effective cost and sale price.
//! Entries are written whenever a purchase changes the cost basis or a
//! markup edit changes the sale price; nothing ever mutates or removes
//! them.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::PriceEntry;

/// Price history service
#[derive(Clone)]
pub struct PriceHistoryService {
    db: PgPool,
}

impl PriceHistoryService {
    /// Create a new PriceHistoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append one entry within the caller's transaction
    pub async fn append(
        tx: &mut Transaction<'_, Postgres>,
        product_id: Uuid,
        cost: f64,
        price: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO price_history (product_id, cost, price) VALUES ($1, $2, $3)")
            .bind(product_id)
            .bind(cost)
            .bind(price)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// List a product's price history, oldest first
    pub async fn list(&self, product_id: Uuid) -> AppResult<Vec<PriceEntry>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Product {}", product_id)));
        }

        let rows = sqlx::query_as::<_, (Uuid, Uuid, f64, f64, DateTime<Utc>)>(
            r#"
            SELECT id, product_id, cost, price, date
            FROM price_history
            WHERE product_id = $1
            ORDER BY date ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, product_id, cost, price, date)| PriceEntry {
                id,
                product_id,
                cost,
                price,
                date,
            })
            .collect())
    }
}
