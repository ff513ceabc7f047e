//! # Depletion Engine (pure half)
//!
//! Decides how the Stock Ledger changes for a receipt or a sale. The
//! database crate locks the product row, calls into here with the freshly
//! read product, and writes back whatever ledger comes out.
//!
//! ## Consume Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  plan_consume(product, 35kg)    box_weight 30kg, 2 boxes, 5kg open     │
//! │                                                                         │
//! │   1. preconditions                                                      │
//! │      not boxed-weight?   → NotWeightTracked                            │
//! │      box_weight <= 0?    → MisconfiguredProduct                        │
//! │      no boxes?           → OutOfStock                                  │
//! │      kg <= 0?            → Ok(None)  (no-op)                           │
//! │      kg > available?     → InsufficientStock { available, requested }  │
//! │                                                                         │
//! │   2. draw                                                               │
//! │      take 5kg   → open box empty → boxes 1, open next at 30kg          │
//! │      take 30kg  → open box empty → boxes 0, remaining 0                │
//! │                                                                         │
//! │   3. Ok(Some(ledger))                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A box leaves `boxes_in_stock` only at the moment its remainder reaches
//! exactly zero.

use crate::error::{StockAmount, StockError, StockResult};
use crate::ledger::WeightLedger;
use crate::types::{Product, TrackMethod};
use crate::weight::Weight;

// =============================================================================
// Receive
// =============================================================================

/// Result of planning a box receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOutcome {
    pub ledger: WeightLedger,
    /// Set when a smaller box size forced the open box's remainder down.
    pub clamped_from: Option<Weight>,
}

/// Rejects non-positive box counts and weights.
///
/// Runs before any lock is taken.
pub fn validate_receive(boxes_received: i64, box_weight: Weight) -> StockResult<()> {
    if boxes_received <= 0 {
        return Err(StockError::invalid_quantity(format!(
            "boxes received must be positive, got {boxes_received}"
        )));
    }
    if !box_weight.is_positive() {
        return Err(StockError::invalid_quantity(format!(
            "box weight must be positive, got {box_weight}"
        )));
    }
    Ok(())
}

/// Plans a receipt of `boxes_received` boxes of `box_weight` each.
///
/// The product becomes boxed-weight tracked. The nominal box weight is
/// overwritten, and an empty ledger opens its first box at full weight.
pub fn plan_receive(
    product: &Product,
    boxes_received: i64,
    box_weight: Weight,
) -> StockResult<ReceiveOutcome> {
    validate_receive(boxes_received, box_weight)?;

    if product.track_method == TrackMethod::Unit && product.quantity > 0 {
        return Err(StockError::TrackingConflict {
            product: product.name.clone(),
            current: TrackMethod::Unit.to_string(),
            reason: format!(
                "{} units still on hand; clear them before receiving boxes",
                product.quantity
            ),
        });
    }

    let mut ledger = WeightLedger::of(product);
    let was_empty = !ledger.box_remaining.is_positive();

    ledger.box_weight = box_weight;
    ledger.boxes_in_stock = ledger
        .boxes_in_stock
        .max(0)
        .checked_add(boxes_received)
        .ok_or_else(|| StockError::invalid_quantity("box count overflow"))?;

    let mut clamped_from = None;
    if was_empty {
        ledger.box_remaining = box_weight;
    } else if ledger.box_remaining > box_weight {
        clamped_from = Some(ledger.box_remaining);
        ledger.box_remaining = box_weight;
    }

    ledger.check_invariants(&product.name)?;
    Ok(ReceiveOutcome {
        ledger,
        clamped_from,
    })
}

// =============================================================================
// Consume
// =============================================================================

/// Plans drawing `kg_to_sell` from a boxed-weight product.
///
/// Returns `Ok(None)` when there is nothing to draw (`kg_to_sell <= 0`).
/// Every error is raised before the ledger is touched.
pub fn plan_consume(product: &Product, kg_to_sell: Weight) -> StockResult<Option<WeightLedger>> {
    if product.track_method != TrackMethod::BoxedWeight {
        return Err(StockError::NotWeightTracked {
            product: product.name.clone(),
        });
    }
    if !product.box_weight.is_positive() {
        return Err(StockError::MisconfiguredProduct {
            product: product.name.clone(),
        });
    }
    if product.boxes_in_stock <= 0 {
        return Err(StockError::OutOfStock {
            product: product.name.clone(),
        });
    }
    if !kg_to_sell.is_positive() {
        return Ok(None);
    }

    let mut ledger = WeightLedger::of(product);
    let available = ledger.available();
    if kg_to_sell > available {
        return Err(StockError::InsufficientStock {
            product: product.name.clone(),
            available: StockAmount::Kilograms(available),
            requested: StockAmount::Kilograms(kg_to_sell),
        });
    }

    // unopened first box
    if !ledger.box_remaining.is_positive() {
        ledger.box_remaining = ledger.box_weight;
    }

    let owed = draw(&mut ledger, kg_to_sell, &product.name)?;
    if owed.is_positive() {
        return Err(StockError::invariant(
            &product.name,
            format!("ran out of boxes with {owed} still owed"),
        ));
    }

    ledger.check_invariants(&product.name)?;
    Ok(Some(ledger))
}

/// The rollover loop. Returns whatever could not be drawn.
fn draw(ledger: &mut WeightLedger, kg_to_sell: Weight, product: &str) -> StockResult<Weight> {
    let mut owed = kg_to_sell;

    loop {
        if !ledger.box_remaining.is_positive() {
            ledger.boxes_in_stock -= 1;
            if ledger.boxes_in_stock <= 0 {
                ledger.boxes_in_stock = 0;
                ledger.box_remaining = Weight::zero();
                break;
            }
            ledger.box_remaining = ledger.box_weight;
        }

        let take = ledger.box_remaining.min(owed);
        if !take.is_positive() {
            return Err(StockError::invariant(product, "draw made no progress"));
        }
        ledger.box_remaining -= take;
        owed -= take;

        if ledger.box_remaining.is_zero() {
            ledger.boxes_in_stock -= 1;
            if ledger.boxes_in_stock > 0 {
                ledger.box_remaining = ledger.box_weight;
            } else {
                ledger.boxes_in_stock = 0;
                ledger.box_remaining = Weight::zero();
                break;
            }
        }

        if !owed.is_positive() {
            break;
        }
    }

    Ok(owed)
}

// =============================================================================
// Unit Stock
// =============================================================================

/// New `quantity` after selling `requested` units.
///
/// Fails with `InsufficientStock` when fewer are on hand.
pub fn plan_unit_draw(product: &Product, requested: i64) -> StockResult<i64> {
    if requested <= 0 {
        return Err(StockError::invalid_quantity(format!(
            "quantity must be positive, got {requested}"
        )));
    }
    if product.track_method != TrackMethod::Unit {
        return Err(StockError::TrackingConflict {
            product: product.name.clone(),
            current: product.track_method.to_string(),
            reason: "sell it by weight size".to_string(),
        });
    }
    if requested > product.quantity {
        return Err(StockError::InsufficientStock {
            product: product.name.clone(),
            available: StockAmount::Units(product.quantity.max(0)),
            requested: StockAmount::Units(requested),
        });
    }
    Ok((product.quantity - requested).max(0))
}

/// New `quantity` after a stock-in of `received` units.
pub fn plan_stock_in(product: &Product, received: i64) -> StockResult<i64> {
    if received <= 0 {
        return Err(StockError::invalid_quantity(format!(
            "quantity must be positive, got {received}"
        )));
    }
    if product.track_method != TrackMethod::Unit {
        return Err(StockError::TrackingConflict {
            product: product.name.clone(),
            current: product.track_method.to_string(),
            reason: "receive boxes instead".to_string(),
        });
    }
    product
        .quantity
        .checked_add(received)
        .ok_or_else(|| StockError::invalid_quantity("quantity overflow"))
}

/// New `quantity` after removing `removed` units. Clamped at zero.
pub fn plan_stock_out(product: &Product, removed: i64) -> StockResult<i64> {
    if removed <= 0 {
        return Err(StockError::invalid_quantity(format!(
            "quantity must be positive, got {removed}"
        )));
    }
    if product.track_method != TrackMethod::Unit {
        return Err(StockError::TrackingConflict {
            product: product.name.clone(),
            current: product.track_method.to_string(),
            reason: "weighted stock only leaves through sales".to_string(),
        });
    }
    Ok((product.quantity - removed).max(0))
}

// =============================================================================
// Corrections
// =============================================================================
//
// A correction applies only the difference between the recorded and the
// corrected quantity, so re-saving a record never counts it twice.
//
// ```text
// entry 10 → 12   quantity + 2
// entry 10 → 4    quantity - 6   (refused if fewer than 6 are left)
// out    2 → 5    quantity - 3   (clamped at zero)
// out    5 → 2    quantity + 3
// ```

fn ensure_unit_correction(product: &Product, corrected: i64) -> StockResult<()> {
    if corrected <= 0 {
        return Err(StockError::invalid_quantity(format!(
            "quantity must be positive, got {corrected}"
        )));
    }
    if product.track_method != TrackMethod::Unit {
        return Err(StockError::TrackingConflict {
            product: product.name.clone(),
            current: product.track_method.to_string(),
            reason: "only unit stock movements can be corrected".to_string(),
        });
    }
    Ok(())
}

/// New `quantity` after a stock entry of `recorded` units becomes `corrected`.
///
/// Lowering an entry below what is still on hand is refused: those units
/// have already left.
pub fn plan_entry_correction(product: &Product, recorded: i64, corrected: i64) -> StockResult<i64> {
    ensure_unit_correction(product, corrected)?;

    let delta = corrected - recorded;
    let new_quantity = product
        .quantity
        .checked_add(delta)
        .ok_or_else(|| StockError::invalid_quantity("quantity overflow"))?;
    if new_quantity < 0 {
        return Err(StockError::InsufficientStock {
            product: product.name.clone(),
            available: StockAmount::Units(product.quantity.max(0)),
            requested: StockAmount::Units(-delta),
        });
    }
    Ok(new_quantity)
}

/// New `quantity` after a stock-out of `recorded` units becomes `corrected`.
/// Clamped at zero, like the stock-out itself.
pub fn plan_out_correction(product: &Product, recorded: i64, corrected: i64) -> StockResult<i64> {
    ensure_unit_correction(product, corrected)?;

    let delta = corrected - recorded;
    let new_quantity = product
        .quantity
        .checked_sub(delta)
        .ok_or_else(|| StockError::invalid_quantity("quantity overflow"))?;
    Ok(new_quantity.max(0))
}

// =============================================================================
// Unit Tests
// =============================================================================
