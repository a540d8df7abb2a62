//! # Error Types
//!
//! Domain-specific error types for roomline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  roomline-core errors (this file)                                      │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  roomline-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── AllocationError  - Allocation engine failures                     │
//! │                                                                         │
//! │  roomline-jobs errors (separate crate)                                 │
//! │  └── JobError         - Queue/worker failures                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, quantities)
//! 3. Errors are enum variants, never String
//! 4. `InsufficientStock` is the only error meant to surface to a
//!    user-facing workflow; everything else is absorbed as no-op/no-match

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Candidate hotels could not cover the requested quantity.
    ///
    /// ## When This Occurs
    /// - `allocate` walked every candidate hotel and still has unmet
    ///   quantity left over
    ///
    /// Recoverable: callers decide between back-order, partial
    /// fulfillment, or a user-facing "not available" message. The
    /// allocations already made remain valid.
    #[error("Insufficient stock for order line {order_line_id}: {unmet_quantity} unmet")]
    InsufficientStock {
        order_line_id: String,
        unmet_quantity: i64,
    },

    /// Room cannot be found.
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Promotion rule cannot be found.
    #[error("Promotion rule not found: {0}")]
    RuleNotFound(String),

    /// Order line cannot be found.
    #[error("Order line not found: {0}")]
    OrderLineNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements. Used for early
/// validation before any engine or repository runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., bad currency code).
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            order_line_id: "line-1".to_string(),
            unmet_quantity: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for order line line-1: 3 unmet"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "room_id".to_string(),
        };
        assert_eq!(err.to_string(), "room_id is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
