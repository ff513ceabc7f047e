//! # Stock Commands
//!
//! Box receipts for boxed-weight products, unit stock movements and their
//! corrections for the rest. Each runs under the product lock in
//! coldroom-db and is retried once on lock contention.

use std::fmt::Write as _;

use coldroom_core::{Money, StockOutReason, Weight};
use coldroom_db::Database;

use super::with_retry;
use crate::config::AppConfig;
use crate::error::ApiError;

pub async fn receive_boxes(
    db: &Database,
    product_id: &str,
    boxes: i64,
    box_weight: Weight,
) -> Result<String, ApiError> {
    let inventory = db.inventory();
    let product = with_retry("receive_boxes", || {
        inventory.receive_boxes(product_id, boxes, box_weight)
    })
    .await?;

    Ok(format!(
        "Received {} x {} of {}: {} boxes in stock, {} available",
        boxes,
        box_weight,
        product.name,
        product.boxes_in_stock,
        product.available_weight()
    ))
}

pub async fn stock_in(
    db: &Database,
    product_id: &str,
    quantity: i64,
    unit_cost: Money,
    notes: Option<&str>,
) -> Result<String, ApiError> {
    let inventory = db.inventory();
    let entry = with_retry("stock_in", || {
        inventory.stock_in(product_id, quantity, unit_cost, notes, None)
    })
    .await?;

    Ok(format!("Stock entry {}: +{} units", entry.id, entry.quantity))
}

pub async fn stock_out(
    db: &Database,
    product_id: &str,
    quantity: i64,
    reason: StockOutReason,
) -> Result<String, ApiError> {
    let inventory = db.inventory();
    let record = with_retry("stock_out", || inventory.stock_out(product_id, quantity, reason)).await?;

    Ok(format!(
        "Stock out {}: -{} units ({:?})",
        record.id, record.quantity, record.reason
    ))
}

/// Stock entries then stock-outs of one product, newest first.
pub async fn history(db: &Database, config: &AppConfig, product_id: &str) -> Result<String, ApiError> {
    let product = db
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;
    let inventory = db.inventory();
    let entries = inventory.list_stock_entries(product_id).await?;
    let outs = inventory.list_stock_outs(product_id).await?;

    let mut out = format!("{}: {} units on hand\n", product.name, product.quantity);
    if entries.is_empty() && outs.is_empty() {
        out.push_str("No stock movements");
        return Ok(out);
    }
    for entry in &entries {
        let _ = writeln!(
            out,
            "in   {}  {}  +{:<5} at {} {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.id,
            entry.quantity,
            config.format_money(Money::from_cents(entry.unit_cost_cents)),
            entry.notes.as_deref().unwrap_or("")
        );
    }
    for record in &outs {
        let _ = writeln!(
            out,
            "out  {}  {}  -{:<5} {:?}",
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.id,
            record.quantity,
            record.reason
        );
    }
    Ok(out.trim_end().to_string())
}

pub async fn edit_entry(
    db: &Database,
    entry_id: &str,
    quantity: i64,
    unit_cost: Option<Money>,
    notes: Option<&str>,
) -> Result<String, ApiError> {
    let inventory = db.inventory();
    let entry = with_retry("correct_stock_entry", || {
        inventory.correct_stock_entry(entry_id, quantity, unit_cost, notes)
    })
    .await?;

    Ok(format!("Stock entry {} now +{} units", entry.id, entry.quantity))
}

pub async fn edit_out(
    db: &Database,
    out_id: &str,
    quantity: i64,
    reason: Option<StockOutReason>,
) -> Result<String, ApiError> {
    let inventory = db.inventory();
    let record = with_retry("correct_stock_out", || {
        inventory.correct_stock_out(out_id, quantity, reason)
    })
    .await?;

    Ok(format!(
        "Stock out {} now -{} units ({:?})",
        record.id, record.quantity, record.reason
    ))
}

pub async fn low_stock(db: &Database) -> Result<String, ApiError> {
    let products = db.inventory().list_low_stock().await?;
    if products.is_empty() {
        return Ok("No products at or below their alert level".to_string());
    }

    let mut out = String::new();
    for product in &products {
        let _ = writeln!(
            out,
            "{:<24} {:>5} on hand (alert at {})",
            product.name, product.quantity, product.min_quantity_alert
        );
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{test_env, unit_product};

    #[tokio::test]
    async fn test_receive_boxes_reports_availability() {
        let (db, _config) = test_env().await;
        let id = unit_product(&db, "Mackerel", 0).await;

        let out = receive_boxes(&db, &id, 3, Weight::from_kg(20)).await.unwrap();
        assert!(out.ends_with("3 boxes in stock, 60.00kg available"));

        let err = receive_boxes(&db, &id, 0, Weight::from_kg(20)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_unit_movements_and_low_stock() {
        let (db, _config) = test_env().await;
        let id = unit_product(&db, "Ice Pack", 10).await;

        stock_out(&db, &id, 7, StockOutReason::Disposed).await.unwrap();
        let out = low_stock(&db).await.unwrap();
        assert!(out.contains("Ice Pack"));
        assert!(out.contains("3 on hand"));

        stock_in(&db, &id, 20, Money::from_cents(250), Some("restock")).await.unwrap();
        assert_eq!(
            low_stock(&db).await.unwrap(),
            "No products at or below their alert level"
        );
    }

    #[tokio::test]
    async fn test_corrections_show_in_history() {
        let (db, config) = test_env().await;
        let id = unit_product(&db, "Ice Pack", 0).await;

        let entry = db
            .inventory()
            .stock_in(&id, 10, Money::from_cents(250), Some("supplier A"), None)
            .await
            .unwrap();
        let removed = db.inventory().stock_out(&id, 3, StockOutReason::Disposed).await.unwrap();

        let out = edit_entry(&db, &entry.id, 12, None, None).await.unwrap();
        assert!(out.ends_with("now +12 units"));
        let out = edit_out(&db, &removed.id, 1, Some(StockOutReason::Transfer)).await.unwrap();
        assert!(out.ends_with("now -1 units (Transfer)"));

        let listing = history(&db, &config, &id).await.unwrap();
        assert!(listing.starts_with("Ice Pack: 11 units on hand"));
        assert!(listing.contains("+12"));
        assert!(listing.contains("supplier A"));
        assert!(listing.contains("-1     Transfer"));

        let err = edit_entry(&db, &entry.id, 0, None, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        let err = edit_out(&db, &entry.id, 2, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
