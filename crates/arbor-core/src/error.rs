//! # Error Types
//!
//! Domain-specific error types for arbor-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  arbor-core errors (this file)                                         │
//! │  ├── CoreError         - Business rule failures                        │
//! │  ├── CouponRejection   - Why a coupon cannot apply                     │
//! │  └── ValidationError   - Input validation failures                     │
//! │                                                                         │
//! │  arbor-db errors (separate crate)                                      │
//! │  └── DbError           - Database operation failures                   │
//! │                                                                         │
//! │  arbor-engine errors (separate crate)                                  │
//! │  └── EngineError       - What callers of submit_order see              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item label, quantities)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a machine-readable kind

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations raised while an order
/// is being validated or priced. Any of them aborts the whole order.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Catalog item (or the requested variant of it) cannot be found.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Insufficient stock to cover a requested line.
    ///
    /// `item` names the exact counter that fell short, down to the
    /// color+size configuration ("SOFA-3S / Walnut / 3-Seater"), so a
    /// multi-line failure pinpoints the offending variant.
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// Business-rule violation on a single line, with a field-level reason.
    ///
    /// ## Example
    /// A raw-material line carrying a color selection: materials have no
    /// variant hierarchy, so color/size on a material line is always wrong.
    #[error("Invalid item {item}: {field} {reason}")]
    InvalidItem {
        item: String,
        field: String,
        reason: String,
    },

    /// Coupon failed a validity gate (explicit validate path).
    #[error("Coupon rejected: {0}")]
    CouponRejected(#[from] CouponRejection),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Coupon Rejection
// =============================================================================

/// Why a coupon cannot be applied to a bill.
///
/// The checkout path treats any of these as "no discount" and proceeds;
/// the dedicated validate-coupon operation surfaces the exact reason.
/// Both behaviors are intentional and preserved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("coupon is not active")]
    Inactive,

    #[error("coupon is not valid yet")]
    NotStarted,

    #[error("coupon has expired")]
    Expired,

    #[error("coupon usage limit reached")]
    UsageExhausted,

    #[error("subtotal {subtotal_cents} is below the minimum spend {minimum_cents}")]
    BelowMinimum {
        subtotal_cents: i64,
        minimum_cents: i64,
    },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a request doesn't meet shape requirements and are
/// rejected before any transaction starts.
#[derive(Debug, Error)]
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

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
