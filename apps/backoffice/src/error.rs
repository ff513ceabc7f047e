//! # API Error Type
//!
//! Unified error type for back-office commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Coldroom POS                           │
//! │                                                                         │
//! │  coldroom sale create ...                                               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<String, ApiError>                                        │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Infrastructure? ── DbError::QueryFailed ── logged, generic ────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Business rule? ─── CoreError / StockError ── shown verbatim ───►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stderr: [INSUFFICIENT_STOCK] Not enough stock for Salmon: ...         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use coldroom_core::{CoreError, StockError, ValidationError};
use coldroom_db::DbError;

/// Error returned from back-office commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Not enough stock for Salmon: available 7.50kg, requested 10.00kg"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, pack size, sale, stock record or expense category not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Not enough stock, or no stock at all
    InsufficientStock,

    /// Stock rule refused the operation (tracking, pack size...)
    StockError,

    /// Deposit or instalment refused
    PaymentError,

    /// Another sale held the product for too long
    Busy,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ErrorCode {
    /// Screaming-snake name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::StockError => "STOCK_ERROR",
            ErrorCode::PaymentError => "PAYMENT_ERROR",
            ErrorCode::Busy => "BUSY",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::LockTimeout(e) => {
                tracing::warn!("Lock wait timed out: {}", e);
                ApiError::new(
                    ErrorCode::Busy,
                    "The product is busy with another sale, try again",
                )
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::Busy, "The store database is busy, try again")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::WeightPriceNotFound(id) => ApiError::not_found("Weight size", &id),
            CoreError::SaleNotFound(id) => ApiError::not_found("Sale", &id),
            CoreError::EmptySale | CoreError::SaleTooLarge { .. } => {
                ApiError::validation(err.to_string())
            }
            CoreError::InvalidPaymentAmount { .. } | CoreError::SaleAlreadySettled { .. } => {
                ApiError::new(ErrorCode::PaymentError, err.to_string())
            }
            CoreError::Stock(stock) => stock.into(),
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::InsufficientStock { .. } | StockError::OutOfStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            StockError::InvalidQuantity { .. } => ApiError::validation(err.to_string()),
            StockError::LedgerInvariant { .. } => {
                tracing::error!("{}", err);
                ApiError::internal("Stock records for this product need attention")
            }
            _ => ApiError::new(ErrorCode::StockError, err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use coldroom_core::{StockAmount, Weight};

    #[test]
    fn test_business_errors_pass_through() {
        let err: ApiError = DbError::from(StockError::InsufficientStock {
            product: "Salmon".into(),
            available: StockAmount::Kilograms(Weight::from_hundredths(750)),
            requested: StockAmount::Kilograms(Weight::from_kg(10)),
        })
        .into();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(
            err.message,
            "Not enough stock for Salmon: available 7.50kg, requested 10.00kg"
        );
    }

    #[test]
    fn test_infrastructure_errors_are_generic() {
        let err: ApiError = DbError::QueryFailed("no such column: secret".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("secret"));

        let err: ApiError = DbError::LockTimeout("database is locked".into()).into();
        assert_eq!(err.code, ErrorCode::Busy);
    }

    #[test]
    fn test_display_and_json() {
        let err = ApiError::not_found("Sale", "abc");
        assert_eq!(err.to_string(), "[NOT_FOUND] Sale not found: abc");

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
    }
}
