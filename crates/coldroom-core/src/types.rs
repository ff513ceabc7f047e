//! # Domain Types
//!
//! Core domain types used throughout Coldroom POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product       │  │      Sale       │   │  CreditPayment  │       │
//! │  │  ──────────────  │  │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)       │  │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  track_method    │  │  receipt_number │   │  sale_id (FK)   │       │
//! │  │  quantity        │  │  sale_type      │   │  method         │       │
//! │  │  box_weight      │  │  total_cents    │   │  amount_cents   │       │
//! │  │  boxes_in_stock  │  │  amount_paid    │   └─────────────────┘       │
//! │  │  box_remaining   │  │  is_credit      │                             │
//! │  └────────┬─────────┘  └────────┬────────┘                             │
//! │           │ 1..n                │ 1..n                                  │
//! │  ┌────────▼─────────┐  ┌────────▼────────┐                             │
//! │  │ProductWeightPrice│  │    SaleItem     │                             │
//! │  │  weight (pack)   │◄─│ weight_price_id │                             │
//! │  │  retail/wholesale│  │ weight_sold     │                             │
//! │  └──────────────────┘  └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tracking Modes
//! A product is either counted in units (`quantity`) or weighed in boxes
//! (`box_weight`, `boxes_in_stock`, `box_remaining`). Never both. The box
//! counters stay at zero until the first box receipt.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{parse_hundredths, Money};
use crate::weight::Weight;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1500 bps = 15% (standard VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Parses a percentage: `"15"` → 1500 bps, `"12.5"` → 1250 bps.
///
/// A percentage with two decimals is exactly a count of basis points.
impl FromStr for TaxRate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bps = parse_hundredths(s.trim().trim_end_matches('%'))
            .ok_or_else(|| ValidationError::invalid_format("vat_rate", format!("'{s}' is not a percentage")))?;
        if !(0..=10_000).contains(&bps) {
            return Err(ValidationError::OutOfRange {
                field: "vat_rate".to_string(),
                min: 0,
                max: 100,
            });
        }
        Ok(TaxRate(bps as u32))
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}%", self.0 / 100)
        } else {
            write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
        }
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// How a product's stock is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TrackMethod {
    /// Discrete units (`quantity`).
    Unit,
    /// Sealed boxes of a nominal weight, sold by the kilogram.
    BoxedWeight,
}

impl Default for TrackMethod {
    fn default() -> Self {
        TrackMethod::Unit
    }
}

impl fmt::Display for TrackMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackMethod::Unit => f.write_str("unit"),
            TrackMethod::BoxedWeight => f.write_str("boxed-weight"),
        }
    }
}

/// Which price list a sale uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleType {
    Retail,
    Wholesale,
}

impl Default for SaleType {
    fn default() -> Self {
        SaleType::Retail
    }
}

/// How a sale (or a credit instalment) is paid.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Mobile money transfer.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "momo"))]
    #[serde(rename = "momo")]
    MobileMoney,
    /// Card payment on external terminal.
    Card,
    /// Pay later. Only valid for the sale itself, never an instalment.
    Credit,
}

impl PaymentMethod {
    /// Money actually changes hands with this method.
    #[inline]
    pub const fn is_tender(&self) -> bool {
        !matches!(self, PaymentMethod::Credit)
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "momo" | "mobile_money" => Ok(PaymentMethod::MobileMoney),
            "card" => Ok(PaymentMethod::Card),
            "credit" => Ok(PaymentMethod::Credit),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec!["cash".into(), "momo".into(), "card".into(), "credit".into()],
            }),
        }
    }
}

/// Why units left the store room outside a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockOutReason {
    Sold,
    Disposed,
    Transfer,
}

impl FromStr for StockOutReason {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sold" => Ok(StockOutReason::Sold),
            "disposed" => Ok(StockOutReason::Disposed),
            "transfer" => Ok(StockOutReason::Transfer),
            _ => Err(ValidationError::NotAllowed {
                field: "reason".to_string(),
                allowed: vec!["sold".into(), "disposed".into(), "transfer".into()],
            }),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Optional business identifier, unique when present.
    pub sku: Option<String>,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Free-text grouping ("Fish", "Poultry", ...).
    pub category: Option<String>,

    /// Unit or boxed-weight.
    pub track_method: TrackMethod,

    /// Retail price in cents.
    pub unit_price_cents: i64,

    /// Wholesale price in cents.
    pub wholesale_price_cents: i64,

    /// Units on hand (unit-tracked products).
    pub quantity: i64,

    /// Reorder threshold (unit-tracked products).
    pub min_quantity_alert: i64,

    /// Nominal weight of one sealed box.
    pub box_weight: Weight,

    /// Boxes on hand, the open box included while it has weight left.
    pub boxes_in_stock: i64,

    /// Weight left in the open box.
    pub box_remaining: Weight,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn wholesale_price(&self) -> Money {
        Money::from_cents(self.wholesale_price_cents)
    }

    /// Price per unit for the given sale type.
    pub fn price_for(&self, sale_type: SaleType) -> Money {
        match sale_type {
            SaleType::Retail => self.unit_price(),
            SaleType::Wholesale => self.wholesale_price(),
        }
    }

    #[inline]
    pub fn is_weight_tracked(&self) -> bool {
        self.track_method == TrackMethod::BoxedWeight
    }

    /// Unit-tracked and at or below its reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        !self.is_weight_tracked() && self.quantity <= self.min_quantity_alert
    }
}

// =============================================================================
// Product Weight Price
// =============================================================================

/// A pack size of a boxed-weight product with its own prices.
///
/// Unique on (`product_id`, `weight`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductWeightPrice {
    pub id: String,
    pub product_id: String,
    /// Weight of one pack.
    pub weight: Weight,
    pub retail_price_cents: i64,
    pub wholesale_price_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl ProductWeightPrice {
    /// Price per pack for the given sale type.
    pub fn price_for(&self, sale_type: SaleType) -> Money {
        match sale_type {
            SaleType::Retail => Money::from_cents(self.retail_price_cents),
            SaleType::Wholesale => Money::from_cents(self.wholesale_price_cents),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Human-readable, `CR-YYYYMMDD-NNNN`.
    pub receipt_number: String,
    pub sale_type: SaleType,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: PaymentMethod,
    /// Sum of line totals, before discount.
    pub subtotal_cents: i64,
    /// Absolute discount as entered.
    pub discount_cents: i64,
    pub apply_vat: bool,
    pub vat_cents: i64,
    pub total_cents: i64,
    /// True while a credit sale still owes money.
    pub is_credit: bool,
    pub amount_paid_cents: i64,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    /// `max(total - amount_paid, 0)`.
    pub fn balance_due(&self) -> Money {
        (self.total() - self.amount_paid()).clamp_non_negative()
    }

    #[inline]
    pub fn is_paid(&self) -> bool {
        self.balance_due().is_zero()
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Pack size sold (boxed-weight lines only).
    pub weight_price_id: Option<String>,
    /// Product name (and pack size) at time of sale.
    pub name_snapshot: String,
    /// Units, or number of packs.
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    /// Kilograms drawn from the box ledger (boxed-weight lines only).
    pub weight_sold: Option<Weight>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Credit Payment
// =============================================================================

/// An instalment paid against a credit sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CreditPayment {
    pub id: String,
    pub sale_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// MoMo transaction id, card slip number, ...
    pub reference: Option<String>,
    pub received_by: Option<String>,
    #[ts(as = "String")]
    pub paid_on: DateTime<Utc>,
}

impl CreditPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Stock Movements
// =============================================================================

/// Units received into stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockEntry {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Units removed from stock outside the sale flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockOut {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    pub reason: StockOutReason,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Expenses
// =============================================================================

/// Grouping for running costs (fuel, electricity, ice).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ExpenseCategory {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Money paid out of the till or the business account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    /// Uncategorised when the category is unknown or was never chosen.
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub amount_cents: i64,
    pub note: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Expense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Request DTOs
// =============================================================================

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub sku: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub unit_price: Money,
    pub wholesale_price: Money,
    pub min_quantity_alert: Option<i64>,
}

/// Catalog changes to an existing product. `None` leaves a field as is.
///
/// Stock counters are not editable here: they only move through stock
/// receipts, stock-outs, corrections and sales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    /// Empty text clears the SKU.
    pub sku: Option<String>,
    /// Empty text clears the category.
    pub category: Option<String>,
    pub unit_price: Option<Money>,
    pub wholesale_price: Option<Money>,
    pub min_quantity_alert: Option<i64>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sku.is_none()
            && self.category.is_none()
            && self.unit_price.is_none()
            && self.wholesale_price.is_none()
            && self.min_quantity_alert.is_none()
    }
}

/// Input for recording an expense.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewExpense {
    pub category_id: Option<String>,
    pub amount: Money,
    pub note: Option<String>,
    pub created_by: Option<String>,
}

/// One requested sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleItem {
    pub product_id: String,
    /// Required for boxed-weight products.
    pub weight_price_id: Option<String>,
    pub quantity: i64,
}

/// Input for creating a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub sale_type: SaleType,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: PaymentMethod,
    pub discount: Money,
    pub apply_vat: bool,
    /// Deposit taken at the counter on a credit sale.
    pub deposit: Option<Money>,
    /// Method the deposit was paid with.
    pub deposit_method: Option<PaymentMethod>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub created_by: Option<String>,
    pub items: Vec<NewSaleItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
