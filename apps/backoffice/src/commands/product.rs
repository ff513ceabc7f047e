//! # Product Commands
//!
//! Catalog maintenance: products, their catalog edits, and the pack sizes
//! boxed-weight products are sold in.

use std::fmt::Write as _;

use coldroom_core::{Money, NewProduct, Product, ProductUpdate, Weight};
use coldroom_db::Database;
use tracing::info;

use super::with_retry;
use crate::cli::{ProductArgs, ProductEditArgs};
use crate::config::AppConfig;
use crate::error::ApiError;

const LIST_LIMIT: u32 = 50;

/// One line per product: stock shown the way it is tracked.
fn stock_summary(product: &Product) -> String {
    if product.is_weight_tracked() {
        format!(
            "{} ({} boxes of {}, open box {})",
            product.available_weight(),
            product.boxes_in_stock,
            product.box_weight,
            product.box_remaining
        )
    } else {
        format!("{} units", product.quantity)
    }
}

pub async fn add_product(db: &Database, config: &AppConfig, args: ProductArgs) -> Result<String, ApiError> {
    let product = db
        .products()
        .create(&NewProduct {
            sku: args.sku,
            name: args.name,
            category: args.category,
            unit_price: args.retail,
            wholesale_price: args.wholesale,
            min_quantity_alert: args.min_alert,
        })
        .await?;

    info!(id = %product.id, name = %product.name, "Product added from back office");
    Ok(format!(
        "Added {} [{}] retail {} wholesale {}",
        product.name,
        product.id,
        config.format_money(product.unit_price()),
        config.format_money(product.wholesale_price())
    ))
}

impl ProductEditArgs {
    pub fn to_update(&self) -> ProductUpdate {
        ProductUpdate {
            name: self.name.clone(),
            sku: self.sku.clone(),
            category: self.category.clone(),
            unit_price: self.retail,
            wholesale_price: self.wholesale,
            min_quantity_alert: self.min_alert,
        }
    }
}

pub async fn edit_product(db: &Database, config: &AppConfig, args: ProductEditArgs) -> Result<String, ApiError> {
    let changes = args.to_update();
    let products = db.products();
    let product = with_retry("edit_product", || products.update(&args.product_id, &changes)).await?;

    info!(id = %product.id, "Product edited from back office");
    Ok(format!(
        "Updated {} [{}] sku {} retail {} wholesale {} alert at {}",
        product.name,
        product.id,
        product.sku.as_deref().unwrap_or("-"),
        config.format_money(product.unit_price()),
        config.format_money(product.wholesale_price()),
        product.min_quantity_alert
    ))
}

pub async fn list_products(db: &Database, config: &AppConfig, query: &str) -> Result<String, ApiError> {
    let products = db.products().search(query, LIST_LIMIT).await?;
    if products.is_empty() {
        return Ok("No products found".to_string());
    }

    let sizes = db.weight_prices();
    let mut out = String::new();
    for product in &products {
        let _ = writeln!(
            out,
            "{:<36}  {:<24} {:<12} {}",
            product.id,
            product.name,
            product.track_method.to_string(),
            stock_summary(product)
        );

        if product.is_weight_tracked() {
            for size in sizes.list_for_product(&product.id, true).await? {
                let _ = writeln!(
                    out,
                    "    {:<36}  {:>8}  retail {}  wholesale {}",
                    size.id,
                    size.weight.to_string(),
                    config.format_money(Money::from_cents(size.retail_price_cents)),
                    config.format_money(Money::from_cents(size.wholesale_price_cents))
                );
            }
        }
    }

    Ok(out.trim_end().to_string())
}

pub async fn add_size(
    db: &Database,
    config: &AppConfig,
    product_id: &str,
    weight: Weight,
    retail: Money,
    wholesale: Money,
) -> Result<String, ApiError> {
    let size = db.weight_prices().add(product_id, weight, retail, wholesale).await?;

    Ok(format!(
        "Added {} pack [{}] retail {} wholesale {}",
        size.weight,
        size.id,
        config.format_money(retail),
        config.format_money(wholesale)
    ))
}
