//! HTTP handlers for the Granel backend

pub mod health;
pub mod price_history;
pub mod product;
pub mod profit;
pub mod purchase;
pub mod sale;

pub use health::health_check;
pub use price_history::get_price_history;
pub use product::{create_product, delete_product, get_product, list_products, update_product};
pub use profit::get_profits;
pub use purchase::{create_purchase, delete_purchase, list_purchases};
pub use sale::{create_sale, delete_sale, list_sales};
