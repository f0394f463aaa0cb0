//! Batch-costing engine
//!
//! Pure decision logic for the batch ledger: how an incoming purchase is
//! folded into a product's batch set, which batches a sale draws from, and
//! whether a past purchase can still be annulled. The backend services load
//! the current batch set, ask this module what to do, and persist the
//! outcome in one transaction.

use std::cmp::Ordering;

use uuid::Uuid;

use crate::models::{Batch, BatchSnapshot};

/// Outcome of evaluating a purchase against the existing batch set
#[derive(Debug, Clone, PartialEq)]
pub enum IntakePlan {
    /// The product has no batches yet; create the first one
    FirstBatch,
    /// The new cost does not exceed the current highest; append an
    /// independent batch and leave the others alone
    AppendBatch,
    /// The new cost is higher than every existing batch; all prior stock is
    /// re-costed to the new price and merged into a single batch
    Consolidate {
        snapshot: Vec<BatchSnapshot>,
        total_quantity: f64,
    },
}

/// One draw a sale takes from a specific batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDraw {
    pub batch_id: Uuid,
    pub cost: f64,
    pub take: f64,
}

/// How to undo an `add_batch` purchase whose batch is still intact
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AddBatchReversal {
    /// The batch holds exactly the purchased quantity; remove it
    RemoveBatch,
    /// Decrement the batch to this remaining quantity
    Decrement(f64),
}

/// Highest unit cost among a product's batches, recomputed on demand.
/// `None` when the product has no batches.
pub fn highest_cost(batches: &[Batch]) -> Option<f64> {
    batches
        .iter()
        .map(|b| b.cost)
        .max_by(|a, b| a.total_cmp(b))
}

/// Decide how a purchase of `quantity` units at `unit_cost` is absorbed.
///
/// Exactly one branch applies, evaluated in order: no batches yet, cost
/// above the current highest (consolidation), or cost at or below it
/// (independent cheaper batch).
pub fn plan_intake(batches: &[Batch], unit_cost: f64, quantity: f64) -> IntakePlan {
    let highest = match highest_cost(batches) {
        None => return IntakePlan::FirstBatch,
        Some(h) => h,
    };

    if unit_cost > highest {
        let snapshot: Vec<BatchSnapshot> = batches
            .iter()
            .map(|b| BatchSnapshot {
                batch_id: b.id,
                cost: b.cost,
                quantity: b.quantity,
            })
            .collect();
        let total_quantity = snapshot.iter().map(|s| s.quantity).sum::<f64>() + quantity;
        IntakePlan::Consolidate {
            snapshot,
            total_quantity,
        }
    } else {
        IntakePlan::AppendBatch
    }
}

/// Sale order: most expensive batch first, ties broken by oldest first.
pub fn sort_for_sale(batches: &mut [Batch]) {
    batches.sort_by(|a, b| {
        b.cost
            .total_cmp(&a.cost)
            .then_with(|| a.date_added.cmp(&b.date_added))
    });
}

/// Plan which batches a sale of `quantity` units draws from.
///
/// Batches are consumed greedily in sale order; depleted batches are
/// skipped. Returns the draws, or `Err(available)` with the total stock on
/// hand when it cannot cover the request (the caller rejects the whole
/// sale; nothing is partially committed).
pub fn plan_allocation(batches: &[Batch], quantity: f64) -> Result<Vec<BatchDraw>, f64> {
    let mut ordered: Vec<Batch> = batches.to_vec();
    sort_for_sale(&mut ordered);

    let mut draws = Vec::new();
    let mut remaining = quantity;
    for batch in &ordered {
        if remaining <= 0.0 {
            break;
        }
        if batch.quantity <= 0.0 {
            continue;
        }
        let take = batch.quantity.min(remaining);
        draws.push(BatchDraw {
            batch_id: batch.id,
            cost: batch.cost,
            take,
        });
        remaining -= take;
    }

    if remaining > 0.0 {
        Err(batches.iter().map(|b| b.quantity.max(0.0)).sum())
    } else {
        Ok(draws)
    }
}

/// Unit sale price: batch cost with the product markup applied.
pub fn sale_price(cost: f64, markup: f64) -> f64 {
    cost * (1.0 + markup / 100.0)
}

/// Check whether an `add_batch` purchase can still be undone.
///
/// `None` when part of the batch has been consumed since the purchase: once
/// sales have merged into the batch, the ledger cannot tell which units
/// came from this purchase, so the reversal is refused.
pub fn plan_add_batch_reversal(
    batch_quantity: f64,
    purchase_quantity: f64,
) -> Option<AddBatchReversal> {
    match batch_quantity.partial_cmp(&purchase_quantity) {
        Some(Ordering::Less) | None => None,
        Some(Ordering::Equal) => Some(AddBatchReversal::RemoveBatch),
        Some(Ordering::Greater) => {
            Some(AddBatchReversal::Decrement(batch_quantity - purchase_quantity))
        }
    }
}

/// Total quantity recorded in a consolidation snapshot
pub fn snapshot_total(snapshot: &[BatchSnapshot]) -> f64 {
    snapshot.iter().map(|s| s.quantity).sum()
}

/// A consolidation can only be undone while the consolidated batch still
/// holds everything it absorbed plus the purchased quantity.
pub fn consolidation_intact(
    consolidated_quantity: f64,
    snapshot: &[BatchSnapshot],
    purchase_quantity: f64,
) -> bool {
    consolidated_quantity >= snapshot_total(snapshot) + purchase_quantity
}

/// Profit realized by one sale line
pub fn item_profit(price_at_sale: f64, unit_cost: f64, quantity: f64) -> f64 {
    (price_at_sale - unit_cost) * quantity
}

/// Round to two decimals for monetary display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
