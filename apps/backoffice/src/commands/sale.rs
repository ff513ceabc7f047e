//! # Sale Commands
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  coldroom sale create --vat --item <salmon>:2:<5kg> --item <ice>:4     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleArgs ──► NewSale (credit → PaymentMethod::Credit, deposit)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.sales().create_sale(&new, config.vat_rate)   (retried once)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Receipt text: lines, totals, balance due                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt::Write as _;

use coldroom_core::{Money, NewSale, PaymentMethod, SaleType};
use coldroom_db::{Database, SaleReceipt};
use tracing::info;

use super::with_retry;
use crate::cli::SaleArgs;
use crate::config::AppConfig;
use crate::error::ApiError;

impl SaleArgs {
    /// The sale request the database layer expects.
    pub fn into_new_sale(self) -> NewSale {
        let (payment_method, deposit, deposit_method) = if self.credit {
            (PaymentMethod::Credit, self.paid, Some(self.method))
        } else {
            (self.method, None, None)
        };

        NewSale {
            sale_type: if self.wholesale {
                SaleType::Wholesale
            } else {
                SaleType::Retail
            },
            customer_name: self.customer,
            customer_phone: self.phone,
            payment_method,
            discount: self.discount,
            apply_vat: self.apply_vat,
            deposit,
            deposit_method,
            due_date: self.due,
            created_by: None,
            items: self.items,
        }
    }
}

/// Printable receipt.
pub fn format_receipt(config: &AppConfig, receipt: &SaleReceipt) -> String {
    let sale = &receipt.sale;
    let mut out = String::new();

    let _ = writeln!(out, "{}", config.store_name);
    let _ = writeln!(out, "Receipt {}  [{}]", sale.receipt_number, sale.id);
    if let Some(customer) = &sale.customer_name {
        let _ = writeln!(out, "Customer: {customer}");
    }
    let _ = writeln!(out, "{}", "-".repeat(48));

    for item in &receipt.items {
        let _ = writeln!(
            out,
            "{:<24} {:>3} x {:>9} {:>10}",
            item.name_snapshot,
            item.quantity,
            config.format_money(Money::from_cents(item.unit_price_cents)),
            config.format_money(item.line_total())
        );
    }

    let _ = writeln!(out, "{}", "-".repeat(48));
    let _ = writeln!(out, "{:<36} {:>11}", "Subtotal", config.format_money(Money::from_cents(sale.subtotal_cents)));
    if sale.discount_cents > 0 {
        let _ = writeln!(
            out,
            "{:<36} {:>11}",
            "Discount",
            config.format_money(Money::from_cents(-sale.discount_cents))
        );
    }
    if sale.apply_vat {
        let _ = writeln!(
            out,
            "{:<36} {:>11}",
            format!("VAT {}", config.vat_rate),
            config.format_money(Money::from_cents(sale.vat_cents))
        );
    }
    let _ = writeln!(out, "{:<36} {:>11}", "Total", config.format_money(sale.total()));
    let _ = writeln!(out, "{:<36} {:>11}", "Paid", config.format_money(sale.amount_paid()));
    if sale.is_credit {
        let _ = write!(out, "{:<36} {:>11}", "Balance due", config.format_money(sale.balance_due()));
        if let Some(due) = sale.due_date {
            let _ = write!(out, "  by {due}");
        }
    }

    out.trim_end().to_string()
}

pub async fn create_sale(db: &Database, config: &AppConfig, args: SaleArgs) -> Result<String, ApiError> {
    let new = args.into_new_sale();
    let sales = db.sales();
    let receipt = with_retry("create_sale", || sales.create_sale(&new, config.vat_rate)).await?;

    info!(
        receipt_number = %receipt.sale.receipt_number,
        items = receipt.items.len(),
        "Sale rung up from back office"
    );
    Ok(format_receipt(config, &receipt))
}

/// The stored receipt as JSON.
pub async fn show_sale(db: &Database, sale_id: &str) -> Result<String, ApiError> {
    let receipt = db
        .sales()
        .get_receipt(sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;

    serde_json::to_string_pretty(&receipt).map_err(|e| {
        tracing::error!("Receipt serialization failed: {}", e);
        ApiError::internal("Could not render receipt")
    })
}
