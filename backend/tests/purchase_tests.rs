//! Purchase intake and reversal tests
//!
//! Covers the batch-costing policy:
//! - first purchase creates the first batch
//! - cheaper (or equal-cost) purchases append independent batches
//! - higher-cost purchases consolidate all stock at the new price
//! - reversals restore the prior batch layout or are refused

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use shared::ledger::{
    consolidation_intact, plan_add_batch_reversal, plan_intake, sale_price, AddBatchReversal,
    IntakePlan,
};
use shared::models::{total_stock, Batch, BatchSnapshot};

fn date(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
}

fn batch(cost: f64, quantity: f64, day: u32) -> Batch {
    Batch {
        id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        cost,
        quantity,
        date_added: date(day),
    }
}

/// Apply an intake plan to a batch set the way the purchase service does,
/// returning the new batch created (if any still distinct).
fn apply_intake(batches: &mut Vec<Batch>, unit_cost: f64, quantity: f64) -> IntakePlan {
    let plan = plan_intake(batches, unit_cost, quantity);
    match &plan {
        IntakePlan::FirstBatch | IntakePlan::AppendBatch => {
            batches.push(batch(unit_cost, quantity, 28));
        }
        IntakePlan::Consolidate { total_quantity, .. } => {
            let total = *total_quantity;
            batches.clear();
            batches.push(batch(unit_cost, total, 28));
        }
    }
    plan
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// A product with no batches gets exactly one batch at the given cost
    #[test]
    fn test_first_purchase_creates_single_batch() {
        let mut batches = Vec::new();
        let plan = apply_intake(&mut batches, 100.0, 50.0);

        assert_eq!(plan, IntakePlan::FirstBatch);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].cost, 100.0);
        assert_eq!(batches[0].quantity, 50.0);
    }

    /// Price history entries are priced with the markup applied
    #[test]
    fn test_price_history_price_applies_markup() {
        let markup = 35.0;
        assert_eq!(sale_price(100.0, markup), 135.0);
        assert_eq!(sale_price(200.0, 0.0), 200.0);
    }

    /// The worked scenario: 100/50, then 90/20 appended, then 150/10
    /// consolidating everything into one 150/80 batch
    #[test]
    fn test_intake_scenario() {
        let mut batches = Vec::new();

        apply_intake(&mut batches, 100.0, 50.0);
        assert_eq!(batches.len(), 1);

        // 90 <= 100: independent cheaper batch
        let plan = apply_intake(&mut batches, 90.0, 20.0);
        assert_eq!(plan, IntakePlan::AppendBatch);
        assert_eq!(batches.len(), 2);
        assert_eq!(total_stock(&batches), 70.0);

        // 150 > 100: consolidation
        let plan = apply_intake(&mut batches, 150.0, 10.0);
        assert!(matches!(plan, IntakePlan::Consolidate { .. }));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].cost, 150.0);
        assert_eq!(batches[0].quantity, 80.0);
    }

    /// Consolidation conserves stock: sum(after) == sum(before) + quantity
    #[test]
    fn test_consolidation_conserves_quantity() {
        let batches = vec![batch(100.0, 50.0, 1), batch(90.0, 20.0, 2), batch(80.0, 5.0, 3)];
        let before = total_stock(&batches);

        match plan_intake(&batches, 120.0, 12.5) {
            IntakePlan::Consolidate {
                snapshot,
                total_quantity,
            } => {
                assert_eq!(total_quantity, before + 12.5);
                assert_eq!(snapshot.len(), 3);
            }
            other => panic!("expected consolidation, got {other:?}"),
        }
    }

    /// Equal cost does not consolidate
    #[test]
    fn test_equal_cost_appends() {
        let batches = vec![batch(100.0, 50.0, 1)];
        assert_eq!(plan_intake(&batches, 100.0, 10.0), IntakePlan::AppendBatch);
    }

    /// Annulling an untouched add_batch purchase restores the pre-purchase
    /// state exactly
    #[test]
    fn test_add_batch_reversal_round_trip() {
        let mut batches = vec![batch(100.0, 50.0, 1)];
        let before: Vec<(f64, f64)> = batches.iter().map(|b| (b.cost, b.quantity)).collect();

        apply_intake(&mut batches, 90.0, 20.0);
        let created = batches.last().unwrap().clone();

        // Untouched: the batch still holds the purchased quantity
        match plan_add_batch_reversal(created.quantity, 20.0) {
            Some(AddBatchReversal::RemoveBatch) => {
                batches.retain(|b| b.id != created.id);
            }
            other => panic!("expected batch removal, got {other:?}"),
        }

        let after: Vec<(f64, f64)> = batches.iter().map(|b| (b.cost, b.quantity)).collect();
        assert_eq!(before, after);
    }

    /// Partial consumption of the created batch blocks the reversal
    #[test]
    fn test_add_batch_reversal_blocked_by_consumption() {
        // 20 purchased, 6 since sold out of the batch
        assert_eq!(plan_add_batch_reversal(14.0, 20.0), None);
    }

    /// A partially remaining batch is decremented, not removed
    #[test]
    fn test_add_batch_reversal_decrements_merged_batch() {
        assert_eq!(
            plan_add_batch_reversal(35.0, 20.0),
            Some(AddBatchReversal::Decrement(15.0))
        );
    }

    /// Annulling a consolidation restores the snapshotted batch layout
    #[test]
    fn test_consolidation_reversal_restores_snapshot() {
        let original = vec![batch(100.0, 50.0, 1), batch(90.0, 20.0, 2)];
        let mut batches = original.clone();

        let plan = apply_intake(&mut batches, 150.0, 10.0);
        let snapshot = match plan {
            IntakePlan::Consolidate { snapshot, .. } => snapshot,
            other => panic!("expected consolidation, got {other:?}"),
        };

        let consolidated = &batches[0];
        assert!(consolidation_intact(consolidated.quantity, &snapshot, 10.0));

        // Restore: one batch per snapshot entry with its original cost/qty
        let restored: Vec<(f64, f64)> =
            snapshot.iter().map(|s| (s.cost, s.quantity)).collect();
        let expected: Vec<(f64, f64)> =
            original.iter().map(|b| (b.cost, b.quantity)).collect();
        assert_eq!(restored, expected);
    }

    /// Any consumption since the consolidation blocks its reversal
    #[test]
    fn test_consolidation_reversal_blocked_by_consumption() {
        let snapshot = vec![BatchSnapshot {
            batch_id: Uuid::new_v4(),
            cost: 100.0,
            quantity: 70.0,
        }];
        // 70 + 10 expected, only 75 left
        assert!(!consolidation_intact(75.0, &snapshot, 10.0));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn batch_set_strategy() -> impl Strategy<Value = Vec<Batch>> {
    prop::collection::vec(
        (1.0f64..1000.0, 0.0f64..500.0, 1u32..28),
        0..8,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .map(|(cost, quantity, day)| batch(cost, quantity, day))
            .collect()
    })
}

proptest! {
    /// Intake conserves stock: total after == total before + quantity
    #[test]
    fn test_intake_conserves_stock(
        batches in batch_set_strategy(),
        unit_cost in 1.0f64..1000.0,
        quantity in 0.1f64..500.0,
    ) {
        let mut state = batches;
        let before = total_stock(&state);
        apply_intake(&mut state, unit_cost, quantity);
        let after = total_stock(&state);

        prop_assert!((after - (before + quantity)).abs() < 1e-9);
    }

    /// Consolidation fires exactly when the cost exceeds the highest batch
    #[test]
    fn test_consolidation_trigger(
        batches in batch_set_strategy(),
        unit_cost in 1.0f64..1000.0,
    ) {
        let plan = plan_intake(&batches, unit_cost, 10.0);
        let highest = batches
            .iter()
            .map(|b| b.cost)
            .fold(f64::NEG_INFINITY, f64::max);

        if batches.is_empty() {
            prop_assert_eq!(plan, IntakePlan::FirstBatch);
        } else if unit_cost > highest {
            prop_assert!(
                matches!(plan, IntakePlan::Consolidate { .. }),
                "expected IntakePlan::Consolidate, got {:?}",
                plan
            );
        } else {
            prop_assert_eq!(plan, IntakePlan::AppendBatch);
        }
    }
}
