//! # Credit Repository
//!
//! Instalments against credit (pay-later) sales.
//!
//! A sale's `amount_paid_cents` is always the sum of its credit payments,
//! recomputed under the sale's row lock after every instalment. Once it
//! reaches the total the sale flips off credit.

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::sale::{fetch_sale, SALE_COLUMNS};
use coldroom_core::sale::{validate_credit_payment, Settlement};
use coldroom_core::validation::validate_reference;
use coldroom_core::{CoreError, CreditPayment, Money, PaymentMethod, Sale};

const PAYMENT_COLUMNS: &str = "id, sale_id, amount_cents, method, reference, received_by, paid_on";

/// Credit payments of a sale, oldest first.
pub(crate) async fn fetch_payments(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<CreditPayment>> {
    let payments = sqlx::query_as::<_, CreditPayment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM credit_payments WHERE sale_id = ?1 ORDER BY paid_on, id"
    ))
    .bind(sale_id)
    .fetch_all(conn)
    .await?;

    Ok(payments)
}

/// Inserts a credit payment row.
pub(crate) async fn insert_payment(
    conn: &mut SqliteConnection,
    payment: &CreditPayment,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO credit_payments (id, sale_id, amount_cents, method, reference, received_by, paid_on)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(payment.amount_cents)
    .bind(payment.method)
    .bind(&payment.reference)
    .bind(&payment.received_by)
    .bind(payment.paid_on)
    .execute(conn)
    .await?;

    Ok(())
}

/// Locks a sale row for the rest of the transaction and returns it.
async fn lock_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Sale> {
    let locked = sqlx::query("UPDATE sales SET created_at = created_at WHERE id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    if locked.rows_affected() == 0 {
        return Err(CoreError::SaleNotFound(sale_id.to_string()).into());
    }

    fetch_sale(conn, sale_id)
        .await?
        .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()).into())
}

/// A recorded instalment and the sale after it.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payment: CreditPayment,
    pub sale: Sale,
}

/// Repository for credit collection.
#[derive(Debug, Clone)]
pub struct CreditRepository {
    pool: SqlitePool,
}

impl CreditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CreditRepository { pool }
    }

    /// Records an instalment against an outstanding credit sale.
    ///
    /// ## Errors
    /// * `SaleNotFound` - unknown sale
    /// * `SaleAlreadySettled` - not a credit sale, or nothing owed
    /// * `InvalidPaymentAmount` - non-positive, or more than the balance due
    pub async fn record_payment(
        &self,
        sale_id: &str,
        amount: Money,
        method: PaymentMethod,
        reference: Option<&str>,
        received_by: Option<&str>,
    ) -> DbResult<PaymentReceipt> {
        let reference = reference.map(str::trim).filter(|r| !r.is_empty());
        if let Some(reference) = reference {
            validate_reference(reference)?;
        }

        debug!(sale_id = %sale_id, amount = %amount, ?method, "Recording credit payment");

        let mut tx = self.pool.begin().await?;
        let mut sale = lock_sale(&mut tx, sale_id).await?;
        validate_credit_payment(&sale, amount, method)?;

        let payment = CreditPayment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            amount_cents: amount.cents(),
            method,
            reference: reference.map(str::to_string),
            received_by: received_by.map(str::to_string),
            paid_on: Utc::now(),
        };
        insert_payment(&mut tx, &payment).await?;

        let total_paid: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM credit_payments WHERE sale_id = ?1",
        )
        .bind(sale_id)
        .fetch_one(&mut *tx)
        .await?;

        let settlement = Settlement::from_payments(sale.total(), Money::from_cents(total_paid));
        sqlx::query("UPDATE sales SET amount_paid_cents = ?2, is_credit = ?3 WHERE id = ?1")
            .bind(sale_id)
            .bind(settlement.amount_paid.cents())
            .bind(settlement.is_credit)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        sale.amount_paid_cents = settlement.amount_paid.cents();
        sale.is_credit = settlement.is_credit;

        info!(
            sale_id = %sale_id,
            amount = %amount,
            balance_due = %sale.balance_due(),
            settled = !sale.is_credit,
            "Credit payment recorded"
        );
        Ok(PaymentReceipt { payment, sale })
    }

    /// Credit sales that still owe money, oldest first.
    pub async fn list_outstanding(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE is_credit = 1 AND total_cents > amount_paid_cents
            ORDER BY created_at ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    pub async fn payments_for(&self, sale_id: &str) -> DbResult<Vec<CreditPayment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_payments(&mut conn, sale_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::test_support::{credit_sale, memory_db, unit_product};

    #[tokio::test]
    async fn test_instalments_settle_the_sale() {
        let db = memory_db().await;
        let product_id = unit_product(&db, "Ice Pack", 10).await;
        // 2 × 50.00, no VAT, 20.00 deposit
        let sale = credit_sale(&db, &product_id, 2, Some(Money::from_cents(2_000))).await;
        assert_eq!(sale.balance_due().cents(), 8_000);

        let outstanding = db.credit().list_outstanding().await.unwrap();
        assert_eq!(outstanding.len(), 1);

        let receipt = db
            .credit()
            .record_payment(&sale.id, Money::from_cents(3_000), PaymentMethod::MobileMoney, Some("MM-991"), None)
            .await
            .unwrap();
        assert!(receipt.sale.is_credit);
        assert_eq!(receipt.sale.amount_paid_cents, 5_000);

        let receipt = db
            .credit()
            .record_payment(&sale.id, Money::from_cents(5_000), PaymentMethod::Cash, None, Some("ama"))
            .await
            .unwrap();
        assert!(!receipt.sale.is_credit);
        assert!(receipt.sale.is_paid());

        let stored = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_paid_cents, 10_000);
        assert!(!stored.is_credit);
        assert!(db.credit().list_outstanding().await.unwrap().is_empty());

        let payments = db.credit().payments_for(&sale.id).await.unwrap();
        let paid: Vec<i64> = payments.iter().map(|p| p.amount_cents).collect();
        assert_eq!(paid, vec![2_000, 3_000, 5_000]);

        let err = db
            .credit()
            .record_payment(&sale.id, Money::from_cents(1), PaymentMethod::Cash, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SaleAlreadySettled { .. })));
    }

    #[tokio::test]
    async fn test_overpayment_is_rejected() {
        let db = memory_db().await;
        let product_id = unit_product(&db, "Ice Pack", 10).await;
        let sale = credit_sale(&db, &product_id, 1, None).await;

        let err = db
            .credit()
            .record_payment(&sale.id, Money::from_cents(5_001), PaymentMethod::Cash, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidPaymentAmount { .. })));

        assert!(db.credit().payments_for(&sale.id).await.unwrap().is_empty());
        let stored = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_paid_cents, 0);
    }

    #[tokio::test]
    async fn test_payment_against_unknown_sale() {
        let db = memory_db().await;
        let err = db
            .credit()
            .record_payment("missing", Money::from_cents(100), PaymentMethod::Cash, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SaleNotFound(_))));
    }

    #[tokio::test]
    async fn test_credit_is_not_a_payment_method_for_instalments() {
        let db = memory_db().await;
        let product_id = unit_product(&db, "Ice Pack", 10).await;
        let sale = credit_sale(&db, &product_id, 1, None).await;

        let err = db
            .credit()
            .record_payment(&sale.id, Money::from_cents(100), PaymentMethod::Credit, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }
}
