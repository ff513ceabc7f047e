//! # Product Repository
//!
//! Catalog operations for products. Stock counters are NOT changed here:
//! every stock mutation goes through [`super::inventory`] under the row lock.
//!
//! ## Key Operations
//! - Create with validation
//! - Lookup by id / SKU
//! - Search by name, SKU or category
//! - Catalog edits (name, SKU, category, prices, reorder threshold)
//! - Soft delete

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::inventory::lock_product;
use coldroom_core::validation::{
    validate_min_quantity_alert, validate_price_cents, validate_product_name, validate_search_query,
    validate_sku,
};
use coldroom_core::{
    CoreError, NewProduct, Product, ProductUpdate, TrackMethod, ValidationError, Weight,
    DEFAULT_MIN_QUANTITY_ALERT,
};

/// Column list for `query_as::<_, Product>`.
pub(crate) const PRODUCT_COLUMNS: &str = r#"
    id, sku, name, category, track_method,
    unit_price_cents, wholesale_price_cents,
    quantity, min_quantity_alert,
    box_weight, boxes_in_stock, box_remaining,
    is_active, created_at, updated_at
"#;

/// Reads a product on an existing connection or transaction.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let results = repo.search("salmon", 20).await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a unit-tracked product.
    ///
    /// Box counters start at zero; the first `receive_boxes` switches the
    /// product to boxed-weight tracking.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn create(&self, new: &NewProduct) -> DbResult<Product> {
        validate_product_name(&new.name)?;
        let sku = match new.sku.as_deref().map(str::trim) {
            Some(sku) if !sku.is_empty() => {
                validate_sku(sku)?;
                Some(sku.to_string())
            }
            _ => None,
        };
        validate_price_cents(new.unit_price.cents())?;
        validate_price_cents(new.wholesale_price.cents())?;
        let min_quantity_alert = new.min_quantity_alert.unwrap_or(DEFAULT_MIN_QUANTITY_ALERT);
        validate_min_quantity_alert(min_quantity_alert)?;

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            sku,
            name: new.name.trim().to_string(),
            category: new
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            track_method: TrackMethod::Unit,
            unit_price_cents: new.unit_price.cents(),
            wholesale_price_cents: new.wholesale_price.cents(),
            quantity: 0,
            min_quantity_alert,
            box_weight: Weight::zero(),
            boxes_in_stock: 0,
            box_remaining: Weight::zero(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, category, track_method,
                unit_price_cents, wholesale_price_cents,
                quantity, min_quantity_alert,
                box_weight, boxes_in_stock, box_remaining,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.track_method)
        .bind(product.unit_price_cents)
        .bind(product.wholesale_price_cents)
        .bind(product.quantity)
        .bind(product.min_quantity_alert)
        .bind(product.box_weight)
        .bind(product.boxes_in_stock)
        .bind(product.box_remaining)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, product.sku.clone().unwrap_or_default())
            }
            other => other,
        })?;

        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
        ))
        .bind(sku.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Searches active products by name, SKU or category.
    ///
    /// Empty query lists active products by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
              AND (name LIKE ?1 ESCAPE '\'
                   OR sku LIKE ?1 ESCAPE '\'
                   OR category LIKE ?1 ESCAPE '\')
            ORDER BY name
            LIMIT ?2
            "#
        ))
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Applies catalog changes to an active product and returns the new row.
    ///
    /// Runs under the product lock so an edit never interleaves with a sale
    /// reading the same row's prices.
    ///
    /// ## Returns
    /// * `Err(CoreError::ProductNotFound)` - missing or soft-deleted
    /// * `Err(DbError::UniqueViolation)` - SKU taken by another product
    pub async fn update(&self, id: &str, changes: &ProductUpdate) -> DbResult<Product> {
        if changes.is_empty() {
            return Err(ValidationError::Required {
                field: "changes".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        let mut product = lock_product(&mut tx, id).await?;
        if !product.is_active {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        if let Some(name) = changes.name.as_deref() {
            validate_product_name(name)?;
            product.name = name.trim().to_string();
        }
        if let Some(sku) = changes.sku.as_deref().map(str::trim) {
            product.sku = if sku.is_empty() {
                None
            } else {
                validate_sku(sku)?;
                Some(sku.to_string())
            };
        }
        if let Some(category) = changes.category.as_deref().map(str::trim) {
            product.category = (!category.is_empty()).then(|| category.to_string());
        }
        if let Some(price) = changes.unit_price {
            validate_price_cents(price.cents())?;
            product.unit_price_cents = price.cents();
        }
        if let Some(price) = changes.wholesale_price {
            validate_price_cents(price.cents())?;
            product.wholesale_price_cents = price.cents();
        }
        if let Some(alert) = changes.min_quantity_alert {
            validate_min_quantity_alert(alert)?;
            product.min_quantity_alert = alert;
        }
        product.updated_at = Utc::now();

        debug!(id = %id, ?changes, "Updating product");

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?2, sku = ?3, category = ?4,
                unit_price_cents = ?5, wholesale_price_cents = ?6,
                min_quantity_alert = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.category)
        .bind(product.unit_price_cents)
        .bind(product.wholesale_price_cents)
        .bind(product.min_quantity_alert)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, product.sku.clone().unwrap_or_default())
            }
            other => other,
        })?;
        tx.commit().await?;

        info!(id = %id, name = %product.name, "Product updated");
        Ok(product)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// ## Why Soft Delete?
    /// Historical sale items still reference this product.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
