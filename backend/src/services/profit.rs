//! Profit calculation
//!
//! Loads the sales of a date range with their cost sources and hands the
//! replay to `shared::profit`, which owns the cost-resolution and
//! aggregation rules.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::PriceEntry;
use shared::profit::{build_report, ProfitReport, SaleLineRecord};
use shared::validation::parse_date_param;

/// Profit service
#[derive(Clone)]
pub struct ProfitService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    sale_id: Uuid,
    product_id: Uuid,
    quantity: f64,
    price_at_sale: f64,
    product_name: Option<String>,
    batch_cost: Option<f64>,
}

impl ProfitService {
    /// Create a new ProfitService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Compute profits for sales dated within `[start, end]` inclusive
    pub async fn compute(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> AppResult<ProfitReport> {
        let start = start_date
            .and_then(|s| parse_date_param(s, false))
            .ok_or_else(|| AppError::validation("start_date", "Missing or invalid date"))?;
        let end = end_date
            .and_then(|s| parse_date_param(s, true))
            .ok_or_else(|| AppError::validation("end_date", "Missing or invalid date"))?;

        let sales = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "SELECT id, date FROM sales WHERE date >= $1 AND date <= $2 ORDER BY date ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        let sale_ids: Vec<Uuid> = sales.iter().map(|(id, _)| *id).collect();
        let item_rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT si.sale_id, si.product_id, si.quantity, si.price_at_sale,
                   p.name AS product_name, b.cost AS batch_cost
            FROM sale_items si
            LEFT JOIN products p ON p.id = si.product_id
            LEFT JOIN batches b ON b.id = si.batch_id
            WHERE si.sale_id = ANY($1)
            "#,
        )
        .bind(&sale_ids)
        .fetch_all(&self.db)
        .await?;

        // Price history is only consulted for lines whose batch is gone
        let mut orphaned: Vec<Uuid> = item_rows
            .iter()
            .filter(|row| row.batch_cost.is_none())
            .map(|row| row.product_id)
            .collect();
        orphaned.sort();
        orphaned.dedup();
        let history = self.history_for(&orphaned).await?;

        let lines = item_rows
            .into_iter()
            .map(|row| SaleLineRecord {
                sale_id: row.sale_id,
                product_id: row.product_id,
                product_name: row.product_name,
                quantity: row.quantity,
                price_at_sale: row.price_at_sale,
                batch_cost: row.batch_cost,
            })
            .collect();

        Ok(build_report(start, end, sales, lines, &history))
    }

    async fn history_for(
        &self,
        product_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, Vec<PriceEntry>>> {
        let mut history: HashMap<Uuid, Vec<PriceEntry>> = HashMap::new();
        if product_ids.is_empty() {
            return Ok(history);
        }

        let rows = sqlx::query_as::<_, (Uuid, Uuid, f64, f64, DateTime<Utc>)>(
            r#"
            SELECT id, product_id, cost, price, date FROM price_history
            WHERE product_id = ANY($1)
            ORDER BY date ASC
            "#,
        )
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;

        for (id, product_id, cost, price, date) in rows {
            history.entry(product_id).or_default().push(PriceEntry {
                id,
                product_id,
                cost,
                price,
                date,
            });
        }
        Ok(history)
    }
}
