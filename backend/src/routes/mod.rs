//! Route definitions for the Granel backend

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Product management (with per-product price history)
        .nest("/products", product_routes())
        // Purchase intake and reversal
        .nest("/purchases", purchase_routes())
        // Sales and reversal
        .nest("/sales", sale_routes())
        // Profit reporting
        .route("/profits", get(handlers::get_profits))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_product).get(handlers::list_products))
        .route(
            "/:id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:id/price-history", get(handlers::get_price_history))
}

fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_purchase).get(handlers::list_purchases))
        .route("/:id", delete(handlers::delete_purchase))
}

fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_sale).get(handlers::list_sales))
        .route("/:id", delete(handlers::delete_sale))
}
