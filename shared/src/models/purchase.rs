//! Purchase intake models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a purchase affected the batch set of its product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseAction {
    /// An independent batch was appended (first batch, or a cheaper one)
    AddBatch,
    /// All existing batches were merged into one at a higher cost
    Consolidate,
}

impl PurchaseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseAction::AddBatch => "add_batch",
            PurchaseAction::Consolidate => "consolidate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add_batch" => Some(PurchaseAction::AddBatch),
            "consolidate" => Some(PurchaseAction::Consolidate),
            _ => None,
        }
    }
}

/// Audit record of one intake event. Immutable once created, except for
/// deletion when the purchase is annulled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub product_id: Uuid,
    pub action: PurchaseAction,
    /// The batch this purchase produced or is linked to
    pub created_batch_id: Option<Uuid>,
    pub unit_cost: f64,
    pub quantity: f64,
    pub date: DateTime<Utc>,
}

/// One batch as it existed before a consolidation destroyed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub batch_id: Uuid,
    pub cost: f64,
    pub quantity: f64,
}

/// Versioned snapshot of the batches a consolidation merged away.
///
/// Stored as structured JSONB on the purchase row so a consolidation can be
/// annulled without permanently losing the pre-consolidation batch layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrevBatches {
    pub version: u32,
    pub batches: Vec<BatchSnapshot>,
}

impl PrevBatches {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(batches: Vec<BatchSnapshot>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            batches,
        }
    }
}
