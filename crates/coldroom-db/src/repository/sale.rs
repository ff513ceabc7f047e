//! # Sale Repository
//!
//! Sale creation and lookup.
//!
//! ## Sale Creation (one transaction)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   ├── INSERT sales header       ← takes the write lock, numbers receipt │
//! │   ├── for each item:                                                    │
//! │   │     lock product, read pack size                                    │
//! │   │     plan_sale_item          ← price frozen, draw decided            │
//! │   │     draw units / consume_weight_in                                  │
//! │   │     INSERT sale_items                                               │
//! │   ├── compute_totals + opening_settlement                               │
//! │   ├── UPDATE sales totals                                               │
//! │   └── INSERT credit_payments    ← deposit of a credit sale, if any      │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure (third item out of stock, bad deposit...) rolls back the  │
//! │  whole sale, including stock already drawn for earlier items.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::credit::{fetch_payments, insert_payment};
use crate::repository::inventory::{consume_weight_in, draw_units_in, lock_product};
use crate::repository::weight_price::fetch_weight_price;
use coldroom_core::sale::{
    check_sale_size, compute_totals, opening_settlement, plan_sale_item, PlannedLine, StockDraw,
};
use coldroom_core::validation::validate_phone;
use coldroom_core::{
    CoreError, CreditPayment, NewSale, PaymentMethod, Sale, SaleItem, TaxRate, ValidationError,
};

/// Column list for `query_as::<_, Sale>`.
pub(crate) const SALE_COLUMNS: &str = r#"
    id, receipt_number, sale_type, customer_name, customer_phone, payment_method,
    subtotal_cents, discount_cents, apply_vat, vat_cents, total_cents,
    is_credit, amount_paid_cents, due_date, created_by, created_at
"#;

const SALE_ITEM_COLUMNS: &str = r#"
    id, sale_id, product_id, weight_price_id, name_snapshot, quantity,
    unit_price_cents, line_total_cents, weight_sold, created_at
"#;

/// Receipt numbers are `CR-YYYYMMDD-NNNN`, counted per day.
const RECEIPT_PREFIX: &str = "CR";

/// Reads a sale on an existing connection or transaction.
pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(sale)
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(&format!(
        "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid"
    ))
    .bind(sale_id)
    .fetch_all(conn)
    .await?;

    Ok(items)
}

/// A sale with its lines and credit payments, as printed.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub payments: Vec<CreditPayment>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Creates a sale, drawing stock for every line.
    ///
    /// ## Snapshot Pattern
    /// Each line keeps the product name (plus pack weight) and the price at
    /// the moment of sale, so later catalog edits don't rewrite history.
    ///
    /// ## Errors
    /// * `EmptySale` / `SaleTooLarge` - line count out of range
    /// * `ProductNotFound` / `WeightPriceNotFound` - unknown or inactive ids
    /// * any `StockError` from the depletion engine
    /// * `InvalidPaymentAmount` - deposit outside `0..=total`
    /// * `LockTimeout` - another sale held a product for too long (retryable)
    pub async fn create_sale(&self, new: &NewSale, vat_rate: TaxRate) -> DbResult<SaleReceipt> {
        check_sale_size(new.items.len())?;

        let customer_name = new
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let customer_phone = new
            .customer_phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        if let Some(phone) = &customer_phone {
            validate_phone(phone)?;
        }

        let is_credit_sale = new.payment_method == PaymentMethod::Credit;
        if is_credit_sale && customer_name.is_none() {
            return Err(ValidationError::Required {
                field: "customer_name".to_string(),
            }
            .into());
        }
        let deposit_method = new.deposit_method.unwrap_or(PaymentMethod::Cash);
        if !deposit_method.is_tender() {
            return Err(ValidationError::NotAllowed {
                field: "deposit_method".to_string(),
                allowed: vec!["cash".into(), "momo".into(), "card".into()],
            }
            .into());
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let prefix = format!("{RECEIPT_PREFIX}-{}-", now.format("%Y%m%d"));
        let due_date = if is_credit_sale { new.due_date } else { None };

        debug!(id = %id, items = new.items.len(), sale_type = ?new.sale_type, "Creating sale");

        let mut tx = self.pool.begin().await?;

        // Header first: the insert is the transaction's first write, so the
        // day's receipt count below is read under the write lock.
        let receipt_number: String = sqlx::query_scalar(
            r#"
            INSERT INTO sales (
                id, receipt_number, sale_type, customer_name, customer_phone, payment_method,
                subtotal_cents, discount_cents, apply_vat, vat_cents, total_cents,
                is_credit, amount_paid_cents, due_date, created_by, created_at
            ) VALUES (
                ?1,
                ?2 || printf('%04d', (SELECT COUNT(*) + 1 FROM sales WHERE receipt_number LIKE ?2 || '%')),
                ?3, ?4, ?5, ?6,
                0, 0, ?7, 0, 0,
                ?8, 0, ?9, ?10, ?11
            )
            RETURNING receipt_number
            "#,
        )
        .bind(&id)
        .bind(&prefix)
        .bind(new.sale_type)
        .bind(&customer_name)
        .bind(&customer_phone)
        .bind(new.payment_method)
        .bind(new.apply_vat)
        .bind(is_credit_sale)
        .bind(due_date)
        .bind(&new.created_by)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut lines: Vec<PlannedLine> = Vec::with_capacity(new.items.len());
        let mut items: Vec<SaleItem> = Vec::with_capacity(new.items.len());

        for request in &new.items {
            let product = lock_product(&mut tx, &request.product_id).await?;
            let size = match &request.weight_price_id {
                Some(size_id) => Some(
                    fetch_weight_price(&mut tx, size_id)
                        .await?
                        .ok_or_else(|| CoreError::WeightPriceNotFound(size_id.clone()))?,
                ),
                None => None,
            };

            let line = plan_sale_item(&product, size.as_ref(), request.quantity, new.sale_type)?;

            let weight_sold = match line.draw {
                StockDraw::Units(units) => {
                    draw_units_in(&mut tx, &line.product_id, units).await?;
                    None
                }
                StockDraw::Weight(kg) => {
                    consume_weight_in(&mut tx, &line.product_id, kg).await?;
                    Some(kg)
                }
            };

            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: id.clone(),
                product_id: line.product_id.clone(),
                weight_price_id: line.weight_price_id.clone(),
                name_snapshot: line.name_snapshot.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                line_total_cents: line.line_total.cents(),
                weight_sold,
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, weight_price_id, name_snapshot, quantity,
                    unit_price_cents, line_total_cents, weight_sold, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.weight_price_id)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.line_total_cents)
            .bind(item.weight_sold)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;

            lines.push(line);
            items.push(item);
        }

        let totals = compute_totals(&lines, new.discount, new.apply_vat, vat_rate)?;
        let settlement = opening_settlement(new.payment_method, new.deposit, totals.total)?;

        sqlx::query(
            r#"
            UPDATE sales SET
                subtotal_cents = ?2, discount_cents = ?3, vat_cents = ?4, total_cents = ?5,
                is_credit = ?6, amount_paid_cents = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&id)
        .bind(totals.subtotal.cents())
        .bind(totals.discount.cents())
        .bind(totals.vat.cents())
        .bind(totals.total.cents())
        .bind(settlement.is_credit)
        .bind(settlement.amount_paid.cents())
        .execute(&mut *tx)
        .await?;

        let mut payments = Vec::new();
        if is_credit_sale && settlement.amount_paid.is_positive() {
            let deposit = CreditPayment {
                id: Uuid::new_v4().to_string(),
                sale_id: id.clone(),
                amount_cents: settlement.amount_paid.cents(),
                method: deposit_method,
                reference: None,
                received_by: new.created_by.clone(),
                paid_on: now,
            };
            insert_payment(&mut tx, &deposit).await?;
            payments.push(deposit);
        }

        tx.commit().await?;

        let sale = Sale {
            id,
            receipt_number,
            sale_type: new.sale_type,
            customer_name,
            customer_phone,
            payment_method: new.payment_method,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            apply_vat: new.apply_vat,
            vat_cents: totals.vat.cents(),
            total_cents: totals.total.cents(),
            is_credit: settlement.is_credit,
            amount_paid_cents: settlement.amount_paid.cents(),
            due_date,
            created_by: new.created_by.clone(),
            created_at: now,
        };

        info!(
            id = %sale.id,
            receipt_number = %sale.receipt_number,
            total = %sale.total(),
            is_credit = sale.is_credit,
            "Sale created"
        );
        Ok(SaleReceipt {
            sale,
            items,
            payments,
        })
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    /// Gets all items for a sale, in entry order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, sale_id).await
    }

    /// Sale, lines and payments for printing.
    pub async fn get_receipt(&self, id: &str) -> DbResult<Option<SaleReceipt>> {
        let mut conn = self.pool.acquire().await?;
        let Some(sale) = fetch_sale(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = fetch_items(&mut conn, id).await?;
        let payments = fetch_payments(&mut conn, id).await?;

        Ok(Some(SaleReceipt {
            sale,
            items,
            payments,
        }))
    }

    /// Latest sales first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::test_support::{boxed_product, memory_db, unit_product, TempDb};
    use crate::DbConfig;
    use coldroom_core::{
        Money, NewSaleItem, SaleType, StockError, Weight, WeightLedger, DEFAULT_VAT_RATE,
    };

    fn cash_sale(items: Vec<NewSaleItem>) -> NewSale {
        NewSale {
            sale_type: SaleType::Retail,
            customer_name: None,
            customer_phone: None,
            payment_method: PaymentMethod::Cash,
            discount: Money::zero(),
            apply_vat: false,
            deposit: None,
            deposit_method: None,
            due_date: None,
            created_by: Some("cashier-1".into()),
            items,
        }
    }

    fn item(product_id: &str, quantity: i64, weight_price_id: Option<&str>) -> NewSaleItem {
        NewSaleItem {
            product_id: product_id.to_string(),
            weight_price_id: weight_price_id.map(str::to_string),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_mixed_sale_draws_stock_and_totals() {
        let db = memory_db().await;
        let ice = unit_product(&db, "Ice Pack", 10).await;
        let salmon = boxed_product(&db, "Salmon", Weight::from_kg(30), 2, Weight::from_kg(5)).await;
        let five_kg = db
            .weight_prices()
            .add(&salmon, Weight::from_kg(5), Money::from_cents(26_000), Money::from_cents(23_000))
            .await
            .unwrap();

        let mut new = cash_sale(vec![item(&ice, 2, None), item(&salmon, 2, Some(&five_kg.id))]);
        new.apply_vat = true;
        new.discount = Money::from_cents(2_000);

        let receipt = db.sales().create_sale(&new, DEFAULT_VAT_RATE).await.unwrap();

        // 2 × 50.00 + 2 × 260.00 = 620.00; less 20.00 = 600.00; VAT 90.00
        assert_eq!(receipt.sale.subtotal_cents, 62_000);
        assert_eq!(receipt.sale.vat_cents, 9_000);
        assert_eq!(receipt.sale.total_cents, 69_000);
        assert!(receipt.sale.is_paid());
        assert!(!receipt.sale.is_credit);
        assert!(receipt.sale.receipt_number.starts_with("CR-"));
        assert!(receipt.sale.receipt_number.ends_with("-0001"));

        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[1].name_snapshot, "Salmon 5.00kg");
        assert_eq!(receipt.items[1].weight_sold, Some(Weight::from_kg(10)));

        let ice_after = db.products().get_by_id(&ice).await.unwrap().unwrap();
        assert_eq!(ice_after.quantity, 8);
        let salmon_after = db.products().get_by_id(&salmon).await.unwrap().unwrap();
        assert_eq!(
            WeightLedger::of(&salmon_after),
            WeightLedger::new(Weight::from_kg(30), 1, Weight::from_kg(25))
        );

        let stored = db.sales().get_receipt(&receipt.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.sale, receipt.sale);
        assert_eq!(stored.items, receipt.items);
        assert!(stored.payments.is_empty());
    }

    #[tokio::test]
    async fn test_failed_item_rolls_back_whole_sale() {
        let db = memory_db().await;
        let ice = unit_product(&db, "Ice Pack", 10).await;
        let salmon = boxed_product(&db, "Salmon", Weight::from_kg(10), 1, Weight::from_kg(10)).await;
        let big = db
            .weight_prices()
            .add(&salmon, Weight::from_kg(20), Money::from_cents(1), Money::from_cents(1))
            .await
            .unwrap();

        let new = cash_sale(vec![item(&ice, 3, None), item(&salmon, 1, Some(&big.id))]);
        let err = db.sales().create_sale(&new, DEFAULT_VAT_RATE).await.unwrap_err();
        assert!(matches!(
            err.as_stock_error(),
            Some(StockError::InsufficientStock { .. })
        ));

        let ice_after = db.products().get_by_id(&ice).await.unwrap().unwrap();
        assert_eq!(ice_after.quantity, 10);
        assert!(db.sales().list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ids_and_empty_sale() {
        let db = memory_db().await;
        let salmon = boxed_product(&db, "Salmon", Weight::from_kg(10), 1, Weight::from_kg(10)).await;

        let err = db
            .sales()
            .create_sale(&cash_sale(vec![]), DEFAULT_VAT_RATE)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptySale)));

        let err = db
            .sales()
            .create_sale(&cash_sale(vec![item("missing", 1, None)]), DEFAULT_VAT_RATE)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));

        let err = db
            .sales()
            .create_sale(&cash_sale(vec![item(&salmon, 1, Some("nope"))]), DEFAULT_VAT_RATE)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::WeightPriceNotFound(_))));

        let err = db
            .sales()
            .create_sale(&cash_sale(vec![item(&salmon, 1, None)]), DEFAULT_VAT_RATE)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_stock_error(),
            Some(StockError::MissingWeightSelection { .. })
        ));
    }

    #[tokio::test]
    async fn test_credit_sale_records_deposit() {
        let db = memory_db().await;
        let ice = unit_product(&db, "Ice Pack", 10).await;

        let mut new = cash_sale(vec![item(&ice, 4, None)]);
        new.payment_method = PaymentMethod::Credit;
        new.customer_name = Some("Kofi Mensah".into());
        new.deposit = Some(Money::from_cents(5_000));
        new.deposit_method = Some(PaymentMethod::MobileMoney);
        new.due_date = chrono::NaiveDate::from_ymd_opt(2026, 12, 1);

        let receipt = db.sales().create_sale(&new, DEFAULT_VAT_RATE).await.unwrap();
        assert!(receipt.sale.is_credit);
        assert_eq!(receipt.sale.amount_paid_cents, 5_000);
        assert_eq!(receipt.sale.balance_due().cents(), 15_000);
        assert_eq!(receipt.payments.len(), 1);
        assert_eq!(receipt.payments[0].method, PaymentMethod::MobileMoney);

        let stored = db.sales().get_receipt(&receipt.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.payments, receipt.payments);
        assert_eq!(stored.sale.due_date, new.due_date);
    }

    #[tokio::test]
    async fn test_credit_sale_needs_customer_and_sane_deposit() {
        let db = memory_db().await;
        let ice = unit_product(&db, "Ice Pack", 10).await;

        let mut new = cash_sale(vec![item(&ice, 1, None)]);
        new.payment_method = PaymentMethod::Credit;
        let err = db.sales().create_sale(&new, DEFAULT_VAT_RATE).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Required { .. }))
        ));

        new.customer_name = Some("Kofi".into());
        new.deposit = Some(Money::from_cents(5_001));
        let err = db.sales().create_sale(&new, DEFAULT_VAT_RATE).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidPaymentAmount { .. })));

        let ice_after = db.products().get_by_id(&ice).await.unwrap().unwrap();
        assert_eq!(ice_after.quantity, 10);
    }

    #[tokio::test]
    async fn test_receipt_numbers_count_up() {
        let db = memory_db().await;
        let ice = unit_product(&db, "Ice Pack", 10).await;

        let first = db
            .sales()
            .create_sale(&cash_sale(vec![item(&ice, 1, None)]), DEFAULT_VAT_RATE)
            .await
            .unwrap();
        let second = db
            .sales()
            .create_sale(&cash_sale(vec![item(&ice, 1, None)]), DEFAULT_VAT_RATE)
            .await
            .unwrap();

        assert!(first.sale.receipt_number.ends_with("-0001"));
        assert!(second.sale.receipt_number.ends_with("-0002"));
        assert_eq!(db.sales().list_recent(10).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sales_of_last_box_sell_once() {
        let temp = TempDb::new(DbConfig::new("unused").max_connections(4)).await;
        let db = temp.db.clone();
        let salmon = boxed_product(&db, "Salmon", Weight::from_kg(10), 1, Weight::from_kg(10)).await;
        let six_kg = db
            .weight_prices()
            .add(&salmon, Weight::from_kg(6), Money::from_cents(30_000), Money::from_cents(27_000))
            .await
            .unwrap();

        let sale = cash_sale(vec![item(&salmon, 1, Some(&six_kg.id))]);
        let first = tokio::spawn({
            let sales = db.sales();
            let sale = sale.clone();
            async move { sales.create_sale(&sale, DEFAULT_VAT_RATE).await }
        });
        let second = tokio::spawn({
            let sales = db.sales();
            async move { sales.create_sale(&sale, DEFAULT_VAT_RATE).await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(
                    r.as_ref().err().and_then(DbError::as_stock_error),
                    Some(StockError::InsufficientStock { .. })
                ))
                .count(),
            1
        );

        let stored = db.products().get_by_id(&salmon).await.unwrap().unwrap();
        assert_eq!(
            WeightLedger::of(&stored),
            WeightLedger::new(Weight::from_kg(10), 1, Weight::from_kg(4))
        );

        let recorded = db.sales().list_recent(10).await.unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].receipt_number.ends_with("-0001"));
    }
}
