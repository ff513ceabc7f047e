//! # Credit Commands
//!
//! Who owes what, and collecting instalments.

use std::fmt::Write as _;

use coldroom_core::{Money, PaymentMethod};
use coldroom_db::Database;

use super::with_retry;
use crate::config::AppConfig;
use crate::error::ApiError;

pub async fn list_outstanding(db: &Database, config: &AppConfig) -> Result<String, ApiError> {
    let sales = db.credit().list_outstanding().await?;
    if sales.is_empty() {
        return Ok("No outstanding credit".to_string());
    }

    let mut owed = Money::zero();
    let mut out = String::new();
    for sale in &sales {
        owed += sale.balance_due();
        let _ = writeln!(
            out,
            "{}  {:<20} total {:>11}  owes {:>11}  due {}  [{}]",
            sale.receipt_number,
            sale.customer_name.as_deref().unwrap_or("-"),
            config.format_money(sale.total()),
            config.format_money(sale.balance_due()),
            sale.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            sale.id
        );
    }
    let _ = write!(out, "{} sales, {} outstanding", sales.len(), config.format_money(owed));

    Ok(out)
}

pub async fn record_payment(
    db: &Database,
    config: &AppConfig,
    sale_id: &str,
    amount: Money,
    method: PaymentMethod,
    reference: Option<&str>,
) -> Result<String, ApiError> {
    let credit = db.credit();
    let receipt = with_retry("record_payment", || {
        credit.record_payment(sale_id, amount, method, reference, None)
    })
    .await?;

    let sale = &receipt.sale;
    if sale.is_credit {
        Ok(format!(
            "Received {} on {}; {} still owed",
            config.format_money(amount),
            sale.receipt_number,
            config.format_money(sale.balance_due())
        ))
    } else {
        Ok(format!(
            "Received {} on {}; sale settled",
            config.format_money(amount),
            sale.receipt_number
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{test_env, unit_product};
    use coldroom_core::{NewSale, NewSaleItem, SaleType};

    #[tokio::test]
    async fn test_collect_until_settled() {
        let (db, config) = test_env().await;
        let ice = unit_product(&db, "Ice Pack", 10).await;
        let sale = db
            .sales()
            .create_sale(
                &NewSale {
                    sale_type: SaleType::Retail,
                    customer_name: Some("Kofi".into()),
                    customer_phone: None,
                    payment_method: PaymentMethod::Credit,
                    discount: Money::zero(),
                    apply_vat: false,
                    deposit: None,
                    deposit_method: None,
                    due_date: None,
                    created_by: None,
                    items: vec![NewSaleItem {
                        product_id: ice,
                        weight_price_id: None,
                        quantity: 1,
                    }],
                },
                config.vat_rate,
            )
            .await
            .unwrap()
            .sale;

        let listing = list_outstanding(&db, &config).await.unwrap();
        assert!(listing.ends_with("1 sales, ₵50.00 outstanding"));

        let out = record_payment(&db, &config, &sale.id, Money::from_cents(2_000), PaymentMethod::Cash, None)
            .await
            .unwrap();
        assert!(out.ends_with("₵30.00 still owed"));

        let err = record_payment(&db, &config, &sale.id, Money::from_cents(9_999), PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);

        let out = record_payment(&db, &config, &sale.id, Money::from_cents(3_000), PaymentMethod::Card, Some("slip 42"))
            .await
            .unwrap();
        assert!(out.ends_with("sale settled"));
        assert_eq!(list_outstanding(&db, &config).await.unwrap(), "No outstanding credit");
    }
}
