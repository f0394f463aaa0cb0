//! Sale allocation and reversal tests
//!
//! Covers batch selection for sales:
//! - the most expensive batch is drawn first, ties broken by oldest
//! - stock is conserved across an allocation
//! - shortfalls reject the whole request
//! - annulling a sale restores the drawn-from batches

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use shared::ledger::{plan_allocation, sale_price, sort_for_sale, BatchDraw};
use shared::models::{total_stock, Batch};

fn date(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 9, 30, 0).unwrap()
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

/// Apply draws to a batch set the way the sale service does
fn apply_draws(batches: &mut [Batch], draws: &[BatchDraw]) {
    for draw in draws {
        let target = batches
            .iter_mut()
            .find(|b| b.id == draw.batch_id)
            .expect("draw references a known batch");
        target.quantity -= draw.take;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Sale order is cost-descending, then oldest-first
    #[test]
    fn test_sale_order() {
        let mut batches = vec![
            batch(90.0, 10.0, 5),
            batch(120.0, 10.0, 8),
            batch(120.0, 10.0, 2),
        ];
        sort_for_sale(&mut batches);

        assert_eq!(batches[0].cost, 120.0);
        assert_eq!(batches[0].date_added, date(2));
        assert_eq!(batches[1].date_added, date(8));
        assert_eq!(batches[2].cost, 90.0);
    }

    /// The worked scenario: one batch (150/80), selling 30 draws from it
    /// and leaves (150/50); the unit price carries the markup
    #[test]
    fn test_single_batch_sale_scenario() {
        let mut batches = vec![batch(150.0, 80.0, 1)];
        let markup = 25.0;

        let draws = plan_allocation(&batches, 30.0).unwrap();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].take, 30.0);
        assert_eq!(draws[0].cost, 150.0);
        assert_eq!(sale_price(draws[0].cost, markup), 187.5);

        apply_draws(&mut batches, &draws);
        assert_eq!(batches[0].quantity, 50.0);
    }

    /// A sale spanning batches drains the expensive one before touching
    /// the cheaper one
    #[test]
    fn test_sale_spans_batches_expensive_first() {
        let expensive = batch(150.0, 10.0, 1);
        let cheap = batch(100.0, 40.0, 2);
        let batches = vec![cheap.clone(), expensive.clone()];

        let draws = plan_allocation(&batches, 25.0).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].batch_id, expensive.id);
        assert_eq!(draws[0].take, 10.0);
        assert_eq!(draws[1].batch_id, cheap.id);
        assert_eq!(draws[1].take, 15.0);
    }

    /// Stock is conserved: remaining == before - quantity sold
    #[test]
    fn test_allocation_conserves_stock() {
        let mut batches = vec![batch(150.0, 10.0, 1), batch(100.0, 40.0, 2)];
        let before = total_stock(&batches);

        let draws = plan_allocation(&batches, 32.5).unwrap();
        apply_draws(&mut batches, &draws);

        assert_eq!(total_stock(&batches), before - 32.5);
    }

    /// Depleted batches are skipped, not drawn from
    #[test]
    fn test_depleted_batches_skipped() {
        let empty = batch(200.0, 0.0, 1);
        let stocked = batch(150.0, 20.0, 2);
        let draws = plan_allocation(&[empty, stocked.clone()], 5.0).unwrap();

        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].batch_id, stocked.id);
    }

    /// A shortfall rejects the request and reports available stock; the
    /// batch set is untouched (nothing was drawn)
    #[test]
    fn test_shortfall_rejects_whole_request() {
        let batches = vec![batch(150.0, 10.0, 1), batch(100.0, 5.0, 2)];
        let before: Vec<f64> = batches.iter().map(|b| b.quantity).collect();

        let result = plan_allocation(&batches, 20.0);
        assert_eq!(result, Err(15.0));

        let after: Vec<f64> = batches.iter().map(|b| b.quantity).collect();
        assert_eq!(before, after);
    }

    /// Annulling a sale restores each drawn-from batch to its pre-sale
    /// quantity
    #[test]
    fn test_sale_reversal_restores_batches() {
        let mut batches = vec![batch(150.0, 30.0, 1), batch(100.0, 20.0, 2)];
        let before: Vec<(Uuid, f64)> = batches.iter().map(|b| (b.id, b.quantity)).collect();

        let draws = plan_allocation(&batches, 42.0).unwrap();
        apply_draws(&mut batches, &draws);
        assert_eq!(total_stock(&batches), 8.0);

        // Reversal: add each draw back to its batch
        for draw in &draws {
            let target = batches.iter_mut().find(|b| b.id == draw.batch_id).unwrap();
            target.quantity += draw.take;
        }

        let after: Vec<(Uuid, f64)> = batches.iter().map(|b| (b.id, b.quantity)).collect();
        assert_eq!(before, after);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn stocked_batches_strategy() -> impl Strategy<Value = Vec<Batch>> {
    prop::collection::vec(
        (1.0f64..500.0, 0.0f64..100.0, 1u32..28),
        1..8,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .map(|(cost, quantity, day)| batch(cost, quantity, day))
            .collect()
    })
}

proptest! {
    /// When stock suffices, the draws add up to exactly the requested
    /// quantity and never overdraw a batch
    #[test]
    fn test_draws_cover_request_without_overdraw(
        batches in stocked_batches_strategy(),
        fraction in 0.01f64..1.0,
    ) {
        let available = total_stock(&batches);
        prop_assume!(available > 0.0);
        let requested = available * fraction;

        let draws = plan_allocation(&batches, requested)
            .expect("stock suffices");

        let drawn: f64 = draws.iter().map(|d| d.take).sum();
        prop_assert!((drawn - requested).abs() < 1e-9);

        for draw in &draws {
            let source = batches.iter().find(|b| b.id == draw.batch_id).unwrap();
            prop_assert!(draw.take <= source.quantity + 1e-9);
            prop_assert!(draw.take > 0.0);
        }
    }

    /// Draws always come in non-increasing cost order
    #[test]
    fn test_draws_ordered_by_cost(
        batches in stocked_batches_strategy(),
        fraction in 0.01f64..1.0,
    ) {
        let available = total_stock(&batches);
        prop_assume!(available > 0.0);

        let draws = plan_allocation(&batches, available * fraction)
            .expect("stock suffices");

        for pair in draws.windows(2) {
            prop_assert!(pair[0].cost >= pair[1].cost);
        }
    }

    /// Requests beyond available stock are rejected with the exact total
    /// on hand
    #[test]
    fn test_overdraw_rejected(
        batches in stocked_batches_strategy(),
        excess in 0.1f64..100.0,
    ) {
        let available = total_stock(&batches);
        let result = plan_allocation(&batches, available + excess);
        prop_assert_eq!(result, Err(available));
    }
}
