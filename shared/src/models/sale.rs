//! Sale models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit record of one sale transaction. Owns its items; deleting a sale
/// deletes the items with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    /// Sum of all line extensions
    pub total: f64,
}

/// One line of a sale, pinned to the specific batch the stock was drawn
/// from. `price_at_sale` freezes the unit sale price at transaction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Uuid,
    pub quantity: f64,
    pub price_at_sale: f64,
}
