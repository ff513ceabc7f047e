//! # Error Types
//!
//! Domain-specific error types for coldroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  coldroom-core errors (this file)                                      │
//! │  ├── StockError       - Stock ledger / depletion precondition failures │
//! │  ├── CoreError        - General domain errors (wraps the other two)    │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  coldroom-db errors (separate crate)                                   │
//! │  └── DbError          - Database failures, lock timeouts               │
//! │                                                                         │
//! │  back-office errors (in app)                                           │
//! │  └── ApiError         - What the operator sees                         │
//! │                                                                         │
//! │  Flow: StockError → CoreError → DbError → ApiError → Operator          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `StockError` is detected BEFORE the ledger is mutated. The enclosing
//! transaction is dropped, so nothing partial is ever committed.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::weight::Weight;

// =============================================================================
// Stock Amount
// =============================================================================

/// An amount of stock, either discrete units or kilograms.
///
/// Used in `InsufficientStock` so the message reads naturally for both
/// tracking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum StockAmount {
    Units(i64),
    Kilograms(Weight),
}

impl fmt::Display for StockAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockAmount::Units(n) => write!(f, "{n} units"),
            StockAmount::Kilograms(w) => write!(f, "{w}"),
        }
    }
}

// =============================================================================
// Stock Error
// =============================================================================

/// Failures of the Stock Ledger, the Depletion Engine and the sale-item
/// stock coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    /// Non-positive box count, box weight or quantity.
    #[error("Invalid quantity: {reason}")]
    InvalidQuantity { reason: String },

    /// `consume_weight` called on a unit-tracked product.
    #[error("{product} is not configured for boxed-weight sales")]
    NotWeightTracked { product: String },

    /// Box weight is zero or unset on a weight-tracked product.
    #[error("{product} has no box weight set")]
    MisconfiguredProduct { product: String },

    /// No boxes left at all.
    #[error("{product} has no boxes in stock")]
    OutOfStock { product: String },

    /// Request exceeds what is on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell 2 × 5kg Salmon (10kg)
    ///      │
    ///      ▼
    /// Lock product, re-derive availability: 7.50kg
    ///      │
    ///      ▼
    /// InsufficientStock { available: 7.50kg, requested: 10.00kg }
    ///      │
    ///      ▼
    /// Operator sees: "Not enough stock for Salmon: available 7.50kg, requested 10.00kg"
    /// ```
    #[error("Not enough stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: StockAmount,
        requested: StockAmount,
    },

    /// A weighted product was put on a sale without choosing a pack size.
    #[error("{product} is sold by weight: choose a weight size")]
    MissingWeightSelection { product: String },

    /// The chosen pack size belongs to a different product.
    #[error("Weight size {weight_price_id} does not belong to {product}")]
    SizeProductMismatch {
        product: String,
        weight_price_id: String,
    },

    /// The chosen pack size has been switched off.
    #[error("Weight size {weight} of {product} is not active")]
    InactiveWeightSize { product: String, weight: Weight },

    /// A product cannot be tracked both by unit and by weight.
    #[error("{product} is {current}-tracked: {reason}")]
    TrackingConflict {
        product: String,
        current: String,
        reason: String,
    },

    /// The depletion loop stopped making progress or left the ledger in an
    /// impossible state. Indicates corrupt counters, never user input.
    #[error("Stock ledger invariant violated for {product}: {reason}")]
    LedgerInvariant { product: String, reason: String },
}

impl StockError {
    /// Creates an InvalidQuantity error.
    pub fn invalid_quantity(reason: impl Into<String>) -> Self {
        StockError::InvalidQuantity {
            reason: reason.into(),
        }
    }

    /// Creates a LedgerInvariant error.
    pub fn invariant(product: impl Into<String>, reason: impl Into<String>) -> Self {
        StockError::LedgerInvariant {
            product: product.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to operator-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product cannot be found (or was soft-deleted).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Weight size (ProductWeightPrice) cannot be found.
    #[error("Weight size not found: {0}")]
    WeightPriceNotFound(String),

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// A sale needs at least one line.
    #[error("A sale needs at least one item")]
    EmptySale,

    /// Sale has too many lines.
    #[error("A sale cannot have more than {max} items")]
    SaleTooLarge { max: usize },

    /// Payment amount is invalid (zero, negative, more than owed).
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Credit payment against a sale that owes nothing.
    ///
    /// ## When This Occurs
    /// - Sale was paid in full at the counter
    /// - Credit sale has already been settled by earlier payments
    #[error("Sale {sale_id} is already settled")]
    SaleAlreadySettled { sale_id: String },

    /// Stock ledger / depletion failure (wraps StockError).
    #[error(transparent)]
    Stock(#[from] StockError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when operator input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Arithmetic on the value would overflow.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Invalid format (e.g., invalid UUID, invalid decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Creates an InvalidFormat error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with StockError.
pub type StockResult<T> = Result<T, StockError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_weight_message() {
        let err = StockError::InsufficientStock {
            product: "Salmon".to_string(),
            available: StockAmount::Kilograms(Weight::from_hundredths(750)),
            requested: StockAmount::Kilograms(Weight::from_kg(10)),
        };
        assert_eq!(
            err.to_string(),
            "Not enough stock for Salmon: available 7.50kg, requested 10.00kg"
        );
    }

    #[test]
    fn test_insufficient_units_message() {
        let err = StockError::InsufficientStock {
            product: "Ice Pack".to_string(),
            available: StockAmount::Units(3),
            requested: StockAmount::Units(5),
        };
        assert_eq!(
            err.to_string(),
            "Not enough stock for Ice Pack: available 3 units, requested 5 units"
        );
    }

    #[test]
    fn test_stock_error_is_transparent_in_core_error() {
        let core_err: CoreError = StockError::OutOfStock {
            product: "Tilapia".to_string(),
        }
        .into();
        assert_eq!(core_err.to_string(), "Tilapia has no boxes in stock");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: name is required");
    }
}
