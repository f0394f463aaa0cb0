//! Profit replay
//!
//! Aggregates the sale lines of a date range into per-sale, per-product
//! and grand-total breakdowns. The cost basis of a line is the batch it
//! actually drew from whenever that batch still exists; for batches that
//! are gone, the price-history cost in effect at the sale date stands in,
//! and a product with no history at all costs in at zero.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::ledger::{item_profit, round2};
use crate::models::PriceEntry;

/// One sale line joined with its surviving cost source, as loaded from
/// the store
#[derive(Debug, Clone)]
pub struct SaleLineRecord {
    pub sale_id: Uuid,
    pub product_id: Uuid,
    /// `None` when the product has since been deleted
    pub product_name: Option<String>,
    pub quantity: f64,
    pub price_at_sale: f64,
    /// Cost of the drawn-from batch, when that batch still exists
    pub batch_cost: Option<f64>,
}

/// Full profit report over a date range
#[derive(Debug, Serialize)]
pub struct ProfitReport {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub sales: Vec<SaleProfit>,
    pub products: Vec<ProductProfit>,
    pub totals: ProfitTotals,
}

/// Per-sale breakdown
#[derive(Debug, Serialize)]
pub struct SaleProfit {
    pub sale_id: Uuid,
    pub date: DateTime<Utc>,
    pub items: Vec<ItemProfit>,
    pub total: f64,
    pub profit: f64,
}

/// Per-line breakdown
#[derive(Debug, Serialize)]
pub struct ItemProfit {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
    pub cost: f64,
    pub profit: f64,
}

/// Per-product aggregate over the range
#[derive(Debug, Serialize)]
pub struct ProductProfit {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_sold: f64,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
}

/// Grand totals over the range
#[derive(Debug, Serialize)]
pub struct ProfitTotals {
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
}

/// Most recent price-history cost at or before `at`
pub fn cost_in_effect(history: &[PriceEntry], at: DateTime<Utc>) -> Option<f64> {
    history
        .iter()
        .filter(|entry| entry.date <= at)
        .max_by_key(|entry| entry.date)
        .map(|entry| entry.cost)
}

/// Unit cost for a line: the batch is ground truth for what was sold when
/// it survives; otherwise the price history is replayed at the sale date.
pub fn resolve_unit_cost(
    batch_cost: Option<f64>,
    history: &[PriceEntry],
    sale_date: DateTime<Utc>,
) -> f64 {
    batch_cost
        .or_else(|| cost_in_effect(history, sale_date))
        .unwrap_or(0.0)
}

/// Build the report from pre-fetched rows.
///
/// `sales` carries every sale in the range (possibly itemless), in the
/// order the report should list them. An empty range yields zero totals
/// and empty breakdowns.
pub fn build_report(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    sales: Vec<(Uuid, DateTime<Utc>)>,
    lines: Vec<SaleLineRecord>,
    history: &HashMap<Uuid, Vec<PriceEntry>>,
) -> ProfitReport {
    let mut lines_by_sale: HashMap<Uuid, Vec<SaleLineRecord>> = HashMap::new();
    for line in lines {
        lines_by_sale.entry(line.sale_id).or_default().push(line);
    }

    let mut report_sales = Vec::with_capacity(sales.len());
    let mut by_product: HashMap<Uuid, ProductProfit> = HashMap::new();
    let mut totals = ProfitTotals {
        revenue: 0.0,
        cost: 0.0,
        profit: 0.0,
    };

    for (sale_id, date) in sales {
        let mut sale_total = 0.0;
        let mut sale_profit = 0.0;
        let mut items = Vec::new();

        for line in lines_by_sale.remove(&sale_id).unwrap_or_default() {
            let product_history = history
                .get(&line.product_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let unit_cost = resolve_unit_cost(line.batch_cost, product_history, date);
            let subtotal = line.price_at_sale * line.quantity;
            let profit = item_profit(line.price_at_sale, unit_cost, line.quantity);
            let product_name = line
                .product_name
                .clone()
                .unwrap_or_else(|| format!("#{}", line.product_id));

            sale_total += subtotal;
            sale_profit += profit;
            totals.revenue += subtotal;
            totals.cost += unit_cost * line.quantity;
            totals.profit += profit;

            let entry = by_product
                .entry(line.product_id)
                .or_insert_with(|| ProductProfit {
                    product_id: line.product_id,
                    product_name: product_name.clone(),
                    quantity_sold: 0.0,
                    revenue: 0.0,
                    cost: 0.0,
                    profit: 0.0,
                });
            entry.quantity_sold += line.quantity;
            entry.revenue += subtotal;
            entry.cost += unit_cost * line.quantity;
            entry.profit += profit;

            items.push(ItemProfit {
                product_id: line.product_id,
                product_name,
                quantity: round2(line.quantity),
                unit_price: round2(line.price_at_sale),
                subtotal: round2(subtotal),
                cost: round2(unit_cost),
                profit: round2(profit),
            });
        }

        report_sales.push(SaleProfit {
            sale_id,
            date,
            items,
            total: round2(sale_total),
            profit: round2(sale_profit),
        });
    }

    let mut products: Vec<ProductProfit> = by_product
        .into_values()
        .map(|mut p| {
            p.quantity_sold = round2(p.quantity_sold);
            p.revenue = round2(p.revenue);
            p.cost = round2(p.cost);
            p.profit = round2(p.profit);
            p
        })
        .collect();
    products.sort_by(|a, b| a.product_name.cmp(&b.product_name));

    ProfitReport {
        start_date: start,
        end_date: end,
        sales: report_sales,
        products,
        totals: ProfitTotals {
            revenue: round2(totals.revenue),
            cost: round2(totals.cost),
            profit: round2(totals.profit),
        },
    }
}
