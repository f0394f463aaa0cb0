//! Product management
//!
//! Products carry the markup applied over batch cost at sale time. Batches
//! and audit records are owned by their product and removed with it in one
//! explicit, atomic pass.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Batch, Product};
use crate::services::{lock_batches, lock_product, BatchRow, PriceHistoryService};
use shared::ledger::{highest_cost, sale_price};
use shared::models::total_stock;
use shared::validation::{validate_markup, validate_product_name};

/// Product service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub markup: Option<f64>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub markup: Option<f64>,
}

/// Product with its batches in sale order and derived total stock
#[derive(Debug, Serialize)]
pub struct ProductWithBatches {
    pub id: Uuid,
    pub name: String,
    pub markup: f64,
    pub total_stock: f64,
    pub batches: Vec<Batch>,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product
    pub async fn create(&self, input: CreateProductInput) -> AppResult<Product> {
        validate_product_name(&input.name).map_err(|msg| AppError::validation("name", msg))?;
        let markup = input.markup.unwrap_or(0.0);
        validate_markup(markup).map_err(|msg| AppError::validation("markup", msg))?;

        let row = sqlx::query_as::<_, (Uuid, String, f64)>(
            "INSERT INTO products (name, markup) VALUES ($1, $2) RETURNING id, name, markup",
        )
        .bind(input.name.trim())
        .bind(markup)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("A product with this name already exists".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(Product {
            id: row.0,
            name: row.1,
            markup: row.2,
        })
    }

    /// List all products with their batches, most expensive batch first
    pub async fn list(&self) -> AppResult<Vec<ProductWithBatches>> {
        let products = sqlx::query_as::<_, (Uuid, String, f64)>(
            "SELECT id, name, markup FROM products ORDER BY name ASC",
        )
        .fetch_all(&self.db)
        .await?;

        let batches = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, product_id, cost, quantity, date_added
            FROM batches
            ORDER BY cost DESC, date_added ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut result: Vec<ProductWithBatches> = products
            .into_iter()
            .map(|(id, name, markup)| ProductWithBatches {
                id,
                name,
                markup,
                total_stock: 0.0,
                batches: Vec::new(),
            })
            .collect();
        for row in batches {
            if let Some(product) = result.iter_mut().find(|p| p.id == row.product_id) {
                product.batches.push(Batch::from(row));
            }
        }
        for product in &mut result {
            product.total_stock = total_stock(&product.batches);
        }

        Ok(result)
    }

    /// Get one product with its batches
    pub async fn get(&self, product_id: Uuid) -> AppResult<ProductWithBatches> {
        let product = sqlx::query_as::<_, (Uuid, String, f64)>(
            "SELECT id, name, markup FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;

        let batches = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, product_id, cost, quantity, date_added
            FROM batches
            WHERE product_id = $1
            ORDER BY cost DESC, date_added ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(Batch::from)
        .collect::<Vec<_>>();

        Ok(ProductWithBatches {
            id: product.0,
            name: product.1,
            markup: product.2,
            total_stock: total_stock(&batches),
            batches,
        })
    }

    /// Update a product's name or markup.
    ///
    /// An effective markup change is recorded in the price history using
    /// the highest-cost batch as the cost basis, so past sale prices stay
    /// reconstructible.
    pub async fn update(&self, product_id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        let mut tx = self.db.begin().await?;

        let current = lock_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;

        let name = match &input.name {
            Some(name) => {
                validate_product_name(name).map_err(|msg| AppError::validation("name", msg))?;
                name.trim().to_string()
            }
            None => current.name.clone(),
        };
        let markup = input.markup.unwrap_or(current.markup);
        validate_markup(markup).map_err(|msg| AppError::validation("markup", msg))?;

        sqlx::query("UPDATE products SET name = $1, markup = $2 WHERE id = $3")
            .bind(&name)
            .bind(markup)
            .bind(product_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict("A product with this name already exists".to_string())
                }
                _ => AppError::Database(e),
            })?;

        if markup != current.markup {
            let batches = lock_batches(&mut tx, product_id).await?;
            if let Some(cost) = highest_cost(&batches) {
                PriceHistoryService::append(&mut tx, product_id, cost, sale_price(cost, markup))
                    .await?;
            }
        }

        tx.commit().await?;

        Ok(Product {
            id: product_id,
            name,
            markup,
        })
    }

    /// Delete a product and everything it owns.
    ///
    /// Cascade is performed explicitly so the ownership rules stay visible:
    /// batches, purchases and price history go with the product. Sale items
    /// are historical audit lines and are left untouched.
    pub async fn delete(&self, product_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;

        sqlx::query("DELETE FROM price_history WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM purchases WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM batches WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(product_id = %product_id, "product deleted");
        Ok(())
    }
}
