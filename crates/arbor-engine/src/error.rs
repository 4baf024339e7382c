//! # Engine Error Types
//!
//! The error taxonomy callers of the order engine see.
//!
//! ## Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine Error Taxonomy                              │
//! │                                                                         │
//! │  Validation        - malformed request, rejected before any tx starts  │
//! │  NotFound          - unknown item / coupon / delivery zone             │
//! │  InsufficientStock - a specific counter cannot cover a line            │
//! │  InvalidItem       - business-rule violation with a field reason       │
//! │  CouponRejected    - expired / inactive / exhausted / below minimum    │
//! │  Transaction       - storage failure during persist or mutate          │
//! │                                                                         │
//! │  Every kind aborts and rolls back the whole order. Only Transaction    │
//! │  is possibly-transient; nothing is retried by the engine itself.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use arbor_core::{CoreError, CouponRejection, ValidationError};
use arbor_db::DbError;

/// Errors surfaced by order submission and the related engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or missing request fields. Rejected before any
    /// transaction starts.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown item, coupon, or delivery zone.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Requested quantity exceeds available stock for a specific counter.
    /// `item` names the exact configuration, down to color and size.
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// Business-rule violation on a single line.
    #[error("Invalid item {item}: {field} {reason}")]
    InvalidItem {
        item: String,
        field: String,
        reason: String,
    },

    /// Coupon failed a validity gate on the explicit validate path, or
    /// lost its last use between pricing and consumption.
    #[error("Coupon rejected: {0}")]
    CouponRejected(#[from] CouponRejection),

    /// Underlying storage failure during persist/mutate. The only kind
    /// considered possibly-transient; retry is the caller's decision.
    #[error("Transaction failure: {0}")]
    Transaction(#[from] DbError),
}

impl EngineError {
    /// Machine-readable kind for the response contract.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::NotFound(_) => "not_found",
            EngineError::InsufficientStock { .. } => "insufficient_stock",
            EngineError::InvalidItem { .. } => "invalid_item",
            EngineError::CouponRejected(_) => "coupon_rejected",
            EngineError::Transaction(_) => "transaction_failure",
        }
    }

    /// Whether a retry of the identical request could succeed. Everything
    /// except storage failures is deterministic given the same input.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transaction(_))
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotFound(item) => EngineError::NotFound(item),
            CoreError::InsufficientStock {
                item,
                available,
                requested,
            } => EngineError::InsufficientStock {
                item,
                available,
                requested,
            },
            CoreError::InvalidItem {
                item,
                field,
                reason,
            } => EngineError::InvalidItem {
                item,
                field,
                reason,
            },
            CoreError::CouponRejected(rejection) => EngineError::CouponRejected(rejection),
            CoreError::Validation(validation) => EngineError::Validation(validation),
        }
    }
}

/// Converts raw sqlx errors via the db layer's categorization.
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Transaction(DbError::from(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        let err = EngineError::NotFound("x".to_string());
        assert_eq!(err.kind(), "not_found");

        let err = EngineError::InsufficientStock {
            item: "SOFA / Walnut / Large".to_string(),
            available: 0,
            requested: 1,
        };
        assert_eq!(err.kind(), "insufficient_stock");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_only_transaction_is_transient() {
        let err = EngineError::Transaction(DbError::PoolExhausted);
        assert!(err.is_transient());

        let err = EngineError::CouponRejected(CouponRejection::Expired);
        assert!(!err.is_transient());
    }
}
