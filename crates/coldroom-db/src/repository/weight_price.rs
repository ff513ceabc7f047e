//! # Weight Price Repository
//!
//! Pack sizes of boxed-weight products ("Salmon 5kg", "Salmon 10kg"), each
//! with its own retail and wholesale price. One row per (product, weight).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::fetch_product;
use coldroom_core::validation::validate_price_cents;
use coldroom_core::{CoreError, Money, ProductWeightPrice, StockError, Weight};

const WEIGHT_PRICE_COLUMNS: &str = r#"
    id, product_id, weight, retail_price_cents, wholesale_price_cents, is_active, created_at
"#;

/// Reads a pack size on an existing connection or transaction.
pub(crate) async fn fetch_weight_price(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<ProductWeightPrice>> {
    let size = sqlx::query_as::<_, ProductWeightPrice>(&format!(
        "SELECT {WEIGHT_PRICE_COLUMNS} FROM product_weight_prices WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(size)
}

/// Repository for product pack sizes.
#[derive(Debug, Clone)]
pub struct WeightPriceRepository {
    pool: SqlitePool,
}

impl WeightPriceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WeightPriceRepository { pool }
    }

    /// Adds a pack size to a product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - product already has this weight
    pub async fn add(
        &self,
        product_id: &str,
        weight: Weight,
        retail_price: Money,
        wholesale_price: Money,
    ) -> DbResult<ProductWeightPrice> {
        if !weight.is_positive() {
            return Err(StockError::invalid_quantity(format!(
                "pack weight must be positive, got {weight}"
            ))
            .into());
        }
        validate_price_cents(retail_price.cents())?;
        validate_price_cents(wholesale_price.cents())?;

        let mut conn = self.pool.acquire().await?;
        if fetch_product(&mut conn, product_id).await?.is_none() {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        let size = ProductWeightPrice {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            weight,
            retail_price_cents: retail_price.cents(),
            wholesale_price_cents: wholesale_price.cents(),
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(product_id = %product_id, weight = %weight, "Adding pack size");

        sqlx::query(
            r#"
            INSERT INTO product_weight_prices (
                id, product_id, weight, retail_price_cents, wholesale_price_cents,
                is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&size.id)
        .bind(&size.product_id)
        .bind(size.weight)
        .bind(size.retail_price_cents)
        .bind(size.wholesale_price_cents)
        .bind(size.is_active)
        .bind(size.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("weight", weight.to_string()),
            other => other,
        })?;

        info!(id = %size.id, product_id = %product_id, weight = %weight, "Pack size added");
        Ok(size)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ProductWeightPrice>> {
        let mut conn = self.pool.acquire().await?;
        fetch_weight_price(&mut conn, id).await
    }

    /// Pack sizes of a product, lightest first.
    pub async fn list_for_product(
        &self,
        product_id: &str,
        active_only: bool,
    ) -> DbResult<Vec<ProductWeightPrice>> {
        let sizes = sqlx::query_as::<_, ProductWeightPrice>(&format!(
            r#"
            SELECT {WEIGHT_PRICE_COLUMNS}
            FROM product_weight_prices
            WHERE product_id = ?1 AND (?2 = 0 OR is_active = 1)
            ORDER BY weight
            "#
        ))
        .bind(product_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(sizes)
    }

    /// Switches a pack size on or off. Past sale items keep referencing it.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Setting pack size active flag");

        let result = sqlx::query("UPDATE product_weight_prices SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::WeightPriceNotFound(id.to_string()).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, new_product};

    #[tokio::test]
    async fn test_sizes_are_unique_and_ordered() {
        let db = memory_db().await;
        let salmon = db.products().create(&new_product("Salmon", None)).await.unwrap();
        let repo = db.weight_prices();

        repo.add(&salmon.id, Weight::from_kg(10), Money::from_cents(50_000), Money::from_cents(45_000))
            .await
            .unwrap();
        let five = repo
            .add(&salmon.id, Weight::from_kg(5), Money::from_cents(26_000), Money::from_cents(23_000))
            .await
            .unwrap();

        let dup = repo
            .add(&salmon.id, Weight::from_kg(5), Money::from_cents(1), Money::from_cents(1))
            .await
            .unwrap_err();
        assert!(matches!(dup, DbError::UniqueViolation { .. }));

        let sizes = repo.list_for_product(&salmon.id, true).await.unwrap();
        let weights: Vec<Weight> = sizes.iter().map(|s| s.weight).collect();
        assert_eq!(weights, vec![Weight::from_kg(5), Weight::from_kg(10)]);

        repo.set_active(&five.id, false).await.unwrap();
        assert_eq!(repo.list_for_product(&salmon.id, true).await.unwrap().len(), 1);
        assert_eq!(repo.list_for_product(&salmon.id, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_size_for_missing_product() {
        let db = memory_db().await;
        let err = db
            .weight_prices()
            .add("missing", Weight::from_kg(5), Money::zero(), Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }
}
