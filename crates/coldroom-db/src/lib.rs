//! # coldroom-db: Database Layer for Coldroom POS
//!
//! SQLite persistence for the cold-storage store, through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Coldroom POS Data Flow                            │
//! │                                                                         │
//! │  coldroom sale create --item <salmon>:2:<5kg>                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   coldroom-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ InventoryRepo │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │ 001_init.sql │  │   │
//! │  │   │ busy_timeout  │    │ CreditRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                              │                                  │   │
//! │  │                              ▼                                  │   │
//! │  │                   coldroom-core (pure planning)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coldroom_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/coldroom.db")).await?;
//!
//! let salmon = db.inventory().receive_boxes(&salmon_id, 3, Weight::from_kg(20)).await?;
//! let receipt = db.sales().create_sale(&new_sale, DEFAULT_VAT_RATE).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::credit::{CreditRepository, PaymentReceipt};
pub use repository::expense::ExpenseRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::{SaleReceipt, SaleRepository};
pub use repository::weight_price::WeightPriceRepository;

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use coldroom_core::{
        Money, NewProduct, NewSale, NewSaleItem, PaymentMethod, Sale, SaleType, Weight,
        DEFAULT_VAT_RATE,
    };
    use std::path::Path;

    use tempfile::TempDir;

    use crate::{Database, DbConfig};

    pub async fn memory_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Fish at 50.00 retail, 45.00 wholesale.
    pub fn new_product(name: &str, sku: Option<&str>) -> NewProduct {
        NewProduct {
            sku: sku.map(str::to_string),
            name: name.to_string(),
            category: Some("Fish".to_string()),
            unit_price: Money::from_cents(5_000),
            wholesale_price: Money::from_cents(4_500),
            min_quantity_alert: None,
        }
    }

    /// Unit-tracked product with `quantity` on hand. Returns its id.
    pub async fn unit_product(db: &Database, name: &str, quantity: i64) -> String {
        let product = db.products().create(&new_product(name, None)).await.unwrap();
        db.inventory()
            .stock_in(&product.id, quantity, Money::zero(), None, None)
            .await
            .unwrap();
        product.id
    }

    /// Boxed-weight product with an exact ledger. Returns its id.
    pub async fn boxed_product(
        db: &Database,
        name: &str,
        box_weight: Weight,
        boxes_in_stock: i64,
        box_remaining: Weight,
    ) -> String {
        let product = db.products().create(&new_product(name, None)).await.unwrap();
        sqlx::query(
            r#"
            UPDATE products
            SET track_method = 'boxed_weight', box_weight = ?2, boxes_in_stock = ?3, box_remaining = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(box_weight)
        .bind(boxes_in_stock)
        .bind(box_remaining)
        .execute(db.pool())
        .await
        .unwrap();
        product.id
    }

    /// Credit sale of `quantity` units to "Kofi", no VAT.
    pub async fn credit_sale(
        db: &Database,
        product_id: &str,
        quantity: i64,
        deposit: Option<Money>,
    ) -> Sale {
        let new = NewSale {
            sale_type: SaleType::Retail,
            customer_name: Some("Kofi".to_string()),
            customer_phone: Some("0244123456".to_string()),
            payment_method: PaymentMethod::Credit,
            discount: Money::zero(),
            apply_vat: false,
            deposit,
            deposit_method: None,
            due_date: None,
            created_by: None,
            items: vec![NewSaleItem {
                product_id: product_id.to_string(),
                weight_price_id: None,
                quantity,
            }],
        };
        db.sales().create_sale(&new, DEFAULT_VAT_RATE).await.unwrap().sale
    }

    /// On-disk database so several pooled connections can contend.
    ///
    /// The file lives in a temporary directory that is removed when the
    /// `TempDb` is dropped, including when a test panics.
    pub struct TempDb {
        pub db: Database,
        dir: TempDir,
    }

    impl TempDb {
        pub async fn new(mut config: DbConfig) -> Self {
            let dir = TempDir::new().unwrap();
            config.database_path = dir.path().join("coldroom.db");
            let db = Database::new(config).await.unwrap();
            TempDb { db, dir }
        }

        pub fn dir(&self) -> &Path {
            self.dir.path()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{unit_product, TempDb};
    use crate::DbConfig;

    #[tokio::test]
    async fn test_temp_db_files_go_away_on_drop() {
        let temp = TempDb::new(DbConfig::new("unused").max_connections(2)).await;
        unit_product(&temp.db, "Ice Pack", 3).await;

        let dir = temp.dir().to_path_buf();
        assert!(dir.join("coldroom.db").exists());

        temp.db.close().await;
        drop(temp);
        assert!(!dir.exists());
    }
}
