//! Product and batch models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product sold by weight. Stock is carried by its batches, each at the
/// unit cost it was acquired for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Percentage applied over batch cost to derive the sale price
    pub markup: f64,
}

/// A quantity of stock acquired at a specific unit cost.
///
/// Several batches may coexist for one product, each representing a
/// distinct cost tier. A batch with `quantity == 0` is depleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Cost per unit for this batch
    pub cost: f64,
    /// Remaining stock
    pub quantity: f64,
    pub date_added: DateTime<Utc>,
}

impl Batch {
    pub fn is_depleted(&self) -> bool {
        self.quantity <= 0.0
    }
}

/// Total remaining stock across a product's batches
pub fn total_stock(batches: &[Batch]) -> f64 {
    batches.iter().map(|b| b.quantity).sum()
}
