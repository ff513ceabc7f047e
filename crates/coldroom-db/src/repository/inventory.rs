//! # Inventory Repository
//!
//! The only path that changes stock counters. Every mutation runs inside a
//! transaction that first takes the product's row lock, re-reads the row,
//! asks `coldroom_core::depletion` what the new counters are, and writes
//! back only what changed.
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SQLite has no SELECT ... FOR UPDATE. The equivalent:                  │
//! │                                                                         │
//! │  BEGIN                         (deferred, no lock yet)                 │
//! │  UPDATE products               ← first statement is a write:           │
//! │     SET updated_at = updated_at   takes the write lock BEFORE any read │
//! │   WHERE id = ?                    (waits up to busy_timeout)           │
//! │  SELECT ... FROM products      ← sees the latest committed counters    │
//! │  -- plan in coldroom-core --                                           │
//! │  UPDATE products SET boxes_in_stock = ?, box_remaining = ?             │
//! │  COMMIT                        ← lock released                         │
//! │                                                                         │
//! │  Two sales of the same product are totally ordered. The write lock is  │
//! │  database-wide, which covers per-product exclusion.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error drops the transaction, which rolls back: partial counter
//! updates are never visible.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::{fetch_product, PRODUCT_COLUMNS};
use coldroom_core::depletion::{
    plan_consume, plan_entry_correction, plan_out_correction, plan_receive, plan_stock_in,
    plan_stock_out, plan_unit_draw, validate_receive,
};
use coldroom_core::validation::{validate_note, validate_price_cents};
use coldroom_core::{
    CoreError, Money, Product, StockEntry, StockOut, StockOutReason, TrackMethod, Weight,
    WeightLedger,
};

// =============================================================================
// Collaborator Primitives
// =============================================================================

/// Locks a product row for the rest of the transaction and returns it.
///
/// Must be called on a transaction's connection. Calling it again for the
/// same product in the same transaction is a cheap no-op re-read.
pub async fn lock_product(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Product> {
    let locked = sqlx::query("UPDATE products SET updated_at = updated_at WHERE id = ?1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    if locked.rows_affected() == 0 {
        return Err(CoreError::ProductNotFound(product_id.to_string()).into());
    }

    fetch_product(conn, product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
}

/// Writes back the two counters a draw changes.
pub async fn persist_weight_ledger(
    conn: &mut SqliteConnection,
    product_id: &str,
    ledger: &WeightLedger,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET boxes_in_stock = ?2, box_remaining = ?3, updated_at = ?4
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .bind(ledger.boxes_in_stock)
    .bind(ledger.box_remaining)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

const ENTRY_COLUMNS: &str =
    "id, product_id, quantity, unit_cost_cents, notes, created_by, created_at";

const OUT_COLUMNS: &str = "id, product_id, quantity, reason, created_at";

async fn persist_quantity(conn: &mut SqliteConnection, product_id: &str, quantity: i64) -> DbResult<()> {
    sqlx::query("UPDATE products SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(conn)
        .await?;

    Ok(())
}

// =============================================================================
// Transaction-Scoped Engine
// =============================================================================

/// `receive_boxes` on a caller-owned transaction.
pub async fn receive_boxes_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    boxes_received: i64,
    box_weight: Weight,
) -> DbResult<Product> {
    let mut product = lock_product(conn, product_id).await?;
    let outcome = plan_receive(&product, boxes_received, box_weight)?;

    if let Some(previous) = outcome.clamped_from {
        warn!(
            product_id = %product_id,
            previous = %previous,
            box_weight = %box_weight,
            "Open box held more than the new box weight; remainder clamped"
        );
    }

    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE products
        SET track_method = ?2, box_weight = ?3, boxes_in_stock = ?4, box_remaining = ?5,
            updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .bind(TrackMethod::BoxedWeight)
    .bind(outcome.ledger.box_weight)
    .bind(outcome.ledger.boxes_in_stock)
    .bind(outcome.ledger.box_remaining)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    product.track_method = TrackMethod::BoxedWeight;
    outcome.ledger.apply_to(&mut product);
    product.updated_at = now;
    Ok(product)
}

/// `consume_weight` on a caller-owned transaction.
pub async fn consume_weight_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    kg_to_sell: Weight,
) -> DbResult<Product> {
    let mut product = lock_product(conn, product_id).await?;

    let Some(ledger) = plan_consume(&product, kg_to_sell)? else {
        debug!(product_id = %product_id, "Nothing to draw");
        return Ok(product);
    };

    debug!(
        product_id = %product_id,
        kg = %kg_to_sell,
        boxes_in_stock = ledger.boxes_in_stock,
        box_remaining = %ledger.box_remaining,
        "Drawing weight"
    );

    persist_weight_ledger(conn, product_id, &ledger).await?;
    ledger.apply_to(&mut product);
    Ok(product)
}

/// Sells `quantity` units of a unit-tracked product on a caller-owned
/// transaction.
pub async fn draw_units_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<Product> {
    let mut product = lock_product(conn, product_id).await?;
    let remaining = plan_unit_draw(&product, quantity)?;

    persist_quantity(conn, product_id, remaining).await?;
    product.quantity = remaining;
    Ok(product)
}

// =============================================================================
// Repository
// =============================================================================

/// Stock Ledger + Depletion Engine, each call in its own transaction.
///
/// ## Usage
/// ```rust,ignore
/// let salmon = db.inventory().receive_boxes(&id, 3, Weight::from_kg(20)).await?;
/// assert_eq!(salmon.available_weight(), Weight::from_kg(60));
///
/// let salmon = db.inventory().consume_weight(&id, Weight::from_kg(5)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Receives sealed boxes of a product.
    ///
    /// ## Effect (under the product lock)
    /// 1. Product becomes boxed-weight tracked
    /// 2. `box_weight` is overwritten
    /// 3. `boxes_in_stock += boxes_received`
    /// 4. An empty ledger opens its first box at full weight
    ///
    /// ## Errors
    /// * `InvalidQuantity` - non-positive boxes or weight, before any lock
    /// * `TrackingConflict` - unit stock still on hand
    pub async fn receive_boxes(
        &self,
        product_id: &str,
        boxes_received: i64,
        box_weight: Weight,
    ) -> DbResult<Product> {
        validate_receive(boxes_received, box_weight)?;

        debug!(product_id = %product_id, boxes_received, box_weight = %box_weight, "Receiving boxes");

        let mut tx = self.pool.begin().await?;
        let product = receive_boxes_in(&mut tx, product_id, boxes_received, box_weight).await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            boxes_received,
            boxes_in_stock = product.boxes_in_stock,
            available = %product.available_weight(),
            "Boxes received"
        );
        Ok(product)
    }

    /// Draws `kg_to_sell` from a boxed-weight product.
    ///
    /// `kg_to_sell <= 0` returns the product unchanged.
    ///
    /// ## Errors
    /// `NotWeightTracked`, `MisconfiguredProduct`, `OutOfStock`,
    /// `InsufficientStock` (ledger untouched), `LockTimeout` (retryable).
    pub async fn consume_weight(&self, product_id: &str, kg_to_sell: Weight) -> DbResult<Product> {
        let mut tx = self.pool.begin().await?;
        let product = consume_weight_in(&mut tx, product_id, kg_to_sell).await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            kg = %kg_to_sell,
            available = %product.available_weight(),
            "Weight consumed"
        );
        Ok(product)
    }

    /// Current availability without locking (display only).
    pub async fn available_weight(&self, product_id: &str) -> DbResult<Weight> {
        let mut conn = self.pool.acquire().await?;
        let product = fetch_product(&mut conn, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        Ok(product.available_weight())
    }

    /// Records units received and adds them to `quantity`.
    pub async fn stock_in(
        &self,
        product_id: &str,
        quantity: i64,
        unit_cost: Money,
        notes: Option<&str>,
        created_by: Option<&str>,
    ) -> DbResult<StockEntry> {
        validate_price_cents(unit_cost.cents())?;

        let mut tx = self.pool.begin().await?;
        let product = lock_product(&mut tx, product_id).await?;
        let new_quantity = plan_stock_in(&product, quantity)?;

        let entry = StockEntry {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            quantity,
            unit_cost_cents: unit_cost.cents(),
            notes: notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
            created_by: created_by.map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO stock_entries (id, product_id, quantity, unit_cost_cents, notes, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.product_id)
        .bind(entry.quantity)
        .bind(entry.unit_cost_cents)
        .bind(&entry.notes)
        .bind(&entry.created_by)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        persist_quantity(&mut tx, product_id, new_quantity).await?;
        tx.commit().await?;

        info!(product_id = %product_id, quantity, new_quantity, "Stock received");
        Ok(entry)
    }

    /// Records units leaving outside a sale. `quantity` is clamped at zero.
    pub async fn stock_out(
        &self,
        product_id: &str,
        quantity: i64,
        reason: StockOutReason,
    ) -> DbResult<StockOut> {
        let mut tx = self.pool.begin().await?;
        let product = lock_product(&mut tx, product_id).await?;
        let new_quantity = plan_stock_out(&product, quantity)?;

        if quantity > product.quantity {
            warn!(
                product_id = %product_id,
                on_hand = product.quantity,
                removed = quantity,
                "Stock-out exceeds quantity on hand; clamped at zero"
            );
        }

        let record = StockOut {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            quantity,
            reason,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO stock_outs (id, product_id, quantity, reason, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&record.id)
        .bind(&record.product_id)
        .bind(record.quantity)
        .bind(record.reason)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        persist_quantity(&mut tx, product_id, new_quantity).await?;
        tx.commit().await?;

        info!(product_id = %product_id, quantity, ?reason, new_quantity, "Stock removed");
        Ok(record)
    }

    /// Corrects a recorded stock entry and moves `quantity` by the difference.
    ///
    /// `unit_cost` and `notes` replace the recorded values when given; empty
    /// notes clear them.
    ///
    /// ## Errors
    /// * `NotFound` - no such entry
    /// * `InsufficientStock` - lowering the entry would take more units than
    ///   are still on hand
    pub async fn correct_stock_entry(
        &self,
        entry_id: &str,
        quantity: i64,
        unit_cost: Option<Money>,
        notes: Option<&str>,
    ) -> DbResult<StockEntry> {
        if let Some(cost) = unit_cost {
            validate_price_cents(cost.cents())?;
        }
        if let Some(notes) = notes {
            validate_note(notes)?;
        }

        let mut tx = self.pool.begin().await?;
        let product_id: String = sqlx::query_scalar("SELECT product_id FROM stock_entries WHERE id = ?1")
            .bind(entry_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Stock entry", entry_id))?;
        let product = lock_product(&mut tx, &product_id).await?;

        let mut entry = sqlx::query_as::<_, StockEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM stock_entries WHERE id = ?1"
        ))
        .bind(entry_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Stock entry", entry_id))?;

        let new_quantity = plan_entry_correction(&product, entry.quantity, quantity)?;
        let recorded = entry.quantity;
        entry.quantity = quantity;
        if let Some(cost) = unit_cost {
            entry.unit_cost_cents = cost.cents();
        }
        if let Some(notes) = notes {
            entry.notes = Some(notes.trim()).filter(|n| !n.is_empty()).map(str::to_string);
        }

        sqlx::query(
            "UPDATE stock_entries SET quantity = ?2, unit_cost_cents = ?3, notes = ?4 WHERE id = ?1",
        )
        .bind(entry_id)
        .bind(entry.quantity)
        .bind(entry.unit_cost_cents)
        .bind(&entry.notes)
        .execute(&mut *tx)
        .await?;

        persist_quantity(&mut tx, &product_id, new_quantity).await?;
        tx.commit().await?;

        info!(entry_id = %entry_id, recorded, corrected = quantity, new_quantity, "Stock entry corrected");
        Ok(entry)
    }

    /// Corrects a recorded stock-out and moves `quantity` by the difference.
    /// Raising a stock-out past what is on hand clamps at zero.
    pub async fn correct_stock_out(
        &self,
        out_id: &str,
        quantity: i64,
        reason: Option<StockOutReason>,
    ) -> DbResult<StockOut> {
        let mut tx = self.pool.begin().await?;
        let product_id: String = sqlx::query_scalar("SELECT product_id FROM stock_outs WHERE id = ?1")
            .bind(out_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Stock out", out_id))?;
        let product = lock_product(&mut tx, &product_id).await?;

        let mut record = sqlx::query_as::<_, StockOut>(&format!(
            "SELECT {OUT_COLUMNS} FROM stock_outs WHERE id = ?1"
        ))
        .bind(out_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Stock out", out_id))?;

        let new_quantity = plan_out_correction(&product, record.quantity, quantity)?;
        let recorded = record.quantity;
        if quantity - recorded > product.quantity {
            warn!(
                product_id = %product_id,
                on_hand = product.quantity,
                extra = quantity - recorded,
                "Corrected stock-out exceeds quantity on hand; clamped at zero"
            );
        }
        record.quantity = quantity;
        if let Some(reason) = reason {
            record.reason = reason;
        }

        sqlx::query("UPDATE stock_outs SET quantity = ?2, reason = ?3 WHERE id = ?1")
            .bind(out_id)
            .bind(record.quantity)
            .bind(record.reason)
            .execute(&mut *tx)
            .await?;

        persist_quantity(&mut tx, &product_id, new_quantity).await?;
        tx.commit().await?;

        info!(out_id = %out_id, recorded, corrected = quantity, new_quantity, "Stock-out corrected");
        Ok(record)
    }

    /// Stock entries of a product, newest first.
    pub async fn list_stock_entries(&self, product_id: &str) -> DbResult<Vec<StockEntry>> {
        let entries = sqlx::query_as::<_, StockEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM stock_entries WHERE product_id = ?1 ORDER BY created_at DESC, id"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Stock-outs of a product, newest first.
    pub async fn list_stock_outs(&self, product_id: &str) -> DbResult<Vec<StockOut>> {
        let outs = sqlx::query_as::<_, StockOut>(&format!(
            "SELECT {OUT_COLUMNS} FROM stock_outs WHERE product_id = ?1 ORDER BY created_at DESC, id"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(outs)
    }

    /// Active unit-tracked products at or below their reorder threshold.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
              AND track_method = 'unit'
              AND quantity <= min_quantity_alert
            ORDER BY quantity, name
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
