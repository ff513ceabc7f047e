//! # coldroom-core: Pure Business Logic for Coldroom POS
//!
//! This crate is the **heart** of Coldroom POS. It decides how stock moves
//! and what sales cost, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Coldroom POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Back-office app (apps/backoffice)               │   │
//! │  │    product / size / stock / sale / credit commands              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               coldroom-db (locks + transactions)                │   │
//! │  │    lock product row ─► plan (this crate) ─► write counters      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ coldroom-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │ weight  │ │  ledger  │ │depletion│ │  sale   │  │   │
//! │  │   │  Money  │ │ Weight  │ │ counters │ │ receive │ │ totals  │  │   │
//! │  │   │ TaxRate │ │  (kg)   │ │available │ │ consume │ │ credit  │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, ProductWeightPrice, Sale, CreditPayment)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`weight`] - Kilograms as hundredths, same rules as money
//! - [`ledger`] - The box counters and derived availability
//! - [`depletion`] - Receive / consume planning with box rollover
//! - [`sale`] - Sale line planning, totals, credit settlement
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use coldroom_core::ledger::WeightLedger;
//! use coldroom_core::weight::Weight;
//!
//! // 2 boxes of 30kg, 5kg left in the open one
//! let ledger = WeightLedger::new(Weight::from_kg(30), 2, Weight::from_kg(5));
//! assert_eq!(ledger.available().to_string(), "35.00kg");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod depletion;
pub mod error;
pub mod ledger;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;
pub mod weight;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, StockAmount, StockError, ValidationError};
pub use ledger::{available_weight_kg, WeightLedger};
pub use money::Money;
pub use types::*;
pub use weight::Weight;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single sale.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity (units or packs) on a single line.
///
/// ## Business Reason
/// Catches typing 10000 instead of 10 on a wholesale order.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Highest accepted price or payment, 100,000,000.00.
///
/// Keeps `price × MAX_ITEM_QUANTITY × MAX_SALE_ITEMS` well inside i64.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Reorder threshold given to new unit-tracked products.
pub const DEFAULT_MIN_QUANTITY_ALERT: i64 = 5;

/// Standard VAT, 15%.
pub const DEFAULT_VAT_RATE: TaxRate = TaxRate::from_bps(1500);

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use crate::types::{Product, ProductWeightPrice, TrackMethod};
    use crate::weight::Weight;

    /// A unit-tracked product priced at 50.00 retail / 45.00 wholesale.
    pub fn unit_product(quantity: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "prod-ice-pack".to_string(),
            sku: Some("ICE-PACK".to_string()),
            name: "Ice Pack".to_string(),
            category: None,
            track_method: TrackMethod::Unit,
            unit_price_cents: 5_000,
            wholesale_price_cents: 4_500,
            quantity,
            min_quantity_alert: crate::DEFAULT_MIN_QUANTITY_ALERT,
            box_weight: Weight::zero(),
            boxes_in_stock: 0,
            box_remaining: Weight::zero(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// A boxed-weight "Salmon" with the given counters.
    pub fn boxed_product(box_weight: Weight, boxes_in_stock: i64, box_remaining: Weight) -> Product {
        Product {
            id: "prod-salmon".to_string(),
            sku: Some("SALMON".to_string()),
            name: "Salmon".to_string(),
            category: Some("Fish".to_string()),
            track_method: TrackMethod::BoxedWeight,
            box_weight,
            boxes_in_stock,
            box_remaining,
            ..unit_product(0)
        }
    }

    pub fn weight_price(
        product_id: &str,
        weight: Weight,
        retail_cents: i64,
        wholesale_cents: i64,
    ) -> ProductWeightPrice {
        ProductWeightPrice {
            id: format!("size-{}-{}", product_id, weight.hundredths()),
            product_id: product_id.to_string(),
            weight,
            retail_price_cents: retail_cents,
            wholesale_price_cents: wholesale_cents,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
