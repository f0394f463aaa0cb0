//! Price history models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only audit entry recording the effective cost and sale price of
/// a product at a point in time. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub cost: f64,
    /// Cost with the markup applied
    pub price: f64,
    pub date: DateTime<Utc>,
}
