//! # Stock Ledger
//!
//! The weight state of a boxed-weight product, as three counters on the
//! product row.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  box_weight = 30kg   boxes_in_stock = 3   box_remaining = 12.5kg        │
//! │                                                                         │
//! │   ┌──────────┐   ┌──────────┐   ┌──────────┐                            │
//! │   │ open box │   │  sealed  │   │  sealed  │                            │
//! │   │  12.5kg  │   │   30kg   │   │   30kg   │                            │
//! │   └──────────┘   └──────────┘   └──────────┘                            │
//! │                                                                         │
//! │   available = (3 - 1) × 30kg + 12.5kg = 72.50kg                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `boxes_in_stock >= 0`
//! - `0 <= box_remaining <= box_weight`
//! - `boxes_in_stock == 0` implies `box_remaining == 0`
//!
//! Reading availability is pure and safe without a lock. Changing the
//! counters goes through [`crate::depletion`] and a locked row.

use serde::{Deserialize, Serialize};

use crate::error::{StockError, StockResult};
use crate::types::Product;
use crate::weight::Weight;

/// Snapshot of the three box counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeightLedger {
    pub box_weight: Weight,
    pub boxes_in_stock: i64,
    pub box_remaining: Weight,
}

impl WeightLedger {
    pub fn new(box_weight: Weight, boxes_in_stock: i64, box_remaining: Weight) -> Self {
        WeightLedger {
            box_weight,
            boxes_in_stock,
            box_remaining,
        }
    }

    /// Reads the counters off a product row.
    pub fn of(product: &Product) -> Self {
        WeightLedger {
            box_weight: product.box_weight,
            boxes_in_stock: product.boxes_in_stock,
            box_remaining: product.box_remaining,
        }
    }

    /// Writes the counters back onto a product.
    pub fn apply_to(&self, product: &mut Product) {
        product.box_weight = self.box_weight;
        product.boxes_in_stock = self.boxes_in_stock;
        product.box_remaining = self.box_remaining;
    }

    /// Total sellable weight.
    ///
    /// A zero or negative remainder while boxes exist means the first box has
    /// not been opened yet, so it counts as full.
    pub fn available(&self) -> Weight {
        if self.boxes_in_stock <= 0 || !self.box_weight.is_positive() {
            return Weight::zero();
        }

        let effective_remaining = if self.box_remaining.is_positive() {
            self.box_remaining
        } else {
            self.box_weight
        };

        let behind = (self.boxes_in_stock - 1).max(0);
        let sealed = self
            .box_weight
            .hundredths()
            .saturating_mul(behind)
            .saturating_add(effective_remaining.hundredths());
        Weight::from_hundredths(sealed)
    }

    /// Fails with `LedgerInvariant` when the counters are impossible.
    pub fn check_invariants(&self, product: &str) -> StockResult<()> {
        if self.boxes_in_stock < 0 {
            return Err(StockError::invariant(
                product,
                format!("boxes_in_stock is {}", self.boxes_in_stock),
            ));
        }
        if self.box_remaining.is_negative() || self.box_remaining > self.box_weight {
            return Err(StockError::invariant(
                product,
                format!(
                    "box_remaining {} outside 0..={}",
                    self.box_remaining, self.box_weight
                ),
            ));
        }
        if self.boxes_in_stock == 0 && !self.box_remaining.is_zero() {
            return Err(StockError::invariant(
                product,
                format!("no boxes but {} remaining", self.box_remaining),
            ));
        }
        Ok(())
    }
}

/// Sellable kilograms of a product; zero for unit-tracked products.
///
/// Never fails. Display code calls this without locking; the depletion
/// engine re-derives it under the row lock before drawing.
pub fn available_weight_kg(product: &Product) -> Weight {
    if !product.is_weight_tracked() {
        return Weight::zero();
    }
    WeightLedger::of(product).available()
}

impl Product {
    /// See [`available_weight_kg`].
    #[inline]
    pub fn available_weight(&self) -> Weight {
        available_weight_kg(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::boxed_product;

    #[test]
    fn test_available_with_open_box() {
        let ledger = WeightLedger::new(Weight::from_kg(30), 3, Weight::from_hundredths(1250));
        assert_eq!(ledger.available(), Weight::from_hundredths(7250));
    }

    #[test]
    fn test_unopened_box_counts_full() {
        let ledger = WeightLedger::new(Weight::from_kg(20), 3, Weight::zero());
        assert_eq!(ledger.available(), Weight::from_kg(60));

        let negative = WeightLedger::new(Weight::from_kg(20), 1, Weight::from_hundredths(-5));
        assert_eq!(negative.available(), Weight::from_kg(20));
    }

    #[test]
    fn test_available_is_zero_without_boxes_or_weight() {
        assert_eq!(
            WeightLedger::new(Weight::from_kg(30), 0, Weight::zero()).available(),
            Weight::zero()
        );
        assert_eq!(
            WeightLedger::new(Weight::zero(), 4, Weight::zero()).available(),
            Weight::zero()
        );
        assert_eq!(
            WeightLedger::new(Weight::from_kg(30), -2, Weight::zero()).available(),
            Weight::zero()
        );
    }

    #[test]
    fn test_unit_product_has_no_weight() {
        let mut product = boxed_product(Weight::from_kg(30), 2, Weight::from_kg(5));
        product.track_method = crate::types::TrackMethod::Unit;
        assert_eq!(available_weight_kg(&product), Weight::zero());
    }

    #[test]
    fn test_check_invariants() {
        let ok = WeightLedger::new(Weight::from_kg(30), 2, Weight::from_kg(5));
        assert!(ok.check_invariants("Salmon").is_ok());

        let over = WeightLedger::new(Weight::from_kg(30), 2, Weight::from_kg(31));
        assert!(matches!(
            over.check_invariants("Salmon"),
            Err(StockError::LedgerInvariant { .. })
        ));

        let orphan = WeightLedger::new(Weight::from_kg(30), 0, Weight::from_kg(1));
        assert!(orphan.check_invariants("Salmon").is_err());
    }
}
