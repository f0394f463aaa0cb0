//! Business logic services for the Granel backend
//!
//! Every mutating operation runs inside a single transaction and locks the
//! rows it is about to rewrite, so ledger operations on one product are
//! serialized at the database rather than in process.

pub mod price_history;
pub mod product;
pub mod profit;
pub mod purchase;
pub mod sale;

pub use price_history::PriceHistoryService;
pub use product::ProductService;
pub use profit::ProfitService;
pub use purchase::PurchaseService;
pub use sale::SaleService;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{Batch, Product};

/// Batch row as stored; shared between the purchase and sale services
#[derive(Debug, FromRow)]
pub(crate) struct BatchRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub cost: f64,
    pub quantity: f64,
    pub date_added: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            product_id: row.product_id,
            cost: row.cost,
            quantity: row.quantity,
            date_added: row.date_added,
        }
    }
}

/// Lock a product row for the duration of the transaction.
///
/// Taking this lock first serializes every ledger mutation on the product,
/// which is what makes purchase intake, sales and reversals atomic with
/// respect to each other.
pub(crate) async fn lock_product(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query_as::<_, (Uuid, String, f64)>(
        "SELECT id, name, markup FROM products WHERE id = $1 FOR UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(|(id, name, markup)| Product { id, name, markup }))
}

/// Lock and load a product's batches in sale order (cost desc, oldest
/// first)
pub(crate) async fn lock_batches(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> Result<Vec<Batch>, sqlx::Error> {
    let rows = sqlx::query_as::<_, BatchRow>(
        r#"
        SELECT id, product_id, cost, quantity, date_added
        FROM batches
        WHERE product_id = $1
        ORDER BY cost DESC, date_added ASC
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().map(Batch::from).collect())
}
