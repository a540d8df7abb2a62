//! # Validation Module
//!
//! Input validation utilities for Roomline.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (order placement, catalog mutations)                  │
//! │  └── THIS MODULE: business rule validation on input                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints ((order_line, stock), (hotel, variant))        │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: each layer catches different errors                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::DiscountKind;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates an allocation / order line quantity.
///
/// ## Rules
/// - Must be strictly positive; allocating or releasing zero units is a
///   caller bug, not a no-op we silently accept
///
/// ## Example
/// ```rust
/// use roomline_core::validation::validate_quantity;
///
/// assert!(validate_quantity(3).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-1).is_err());
/// ```
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Discount Value Validators
// =============================================================================

/// Validates a promotion rule's discount value for its kind.
///
/// ## Rules
/// - `Percentage`: basis points in 0..=10000 (0% to 100%)
/// - `Fixed`: non-negative cents
///
/// ## Example
/// ```rust
/// use roomline_core::types::DiscountKind;
/// use roomline_core::validation::validate_discount_value;
///
/// assert!(validate_discount_value(DiscountKind::Percentage, 2500).is_ok());
/// assert!(validate_discount_value(DiscountKind::Percentage, 10001).is_err());
/// assert!(validate_discount_value(DiscountKind::Fixed, -100).is_err());
/// ```
pub fn validate_discount_value(kind: DiscountKind, value: i64) -> ValidationResult<()> {
    match kind {
        DiscountKind::Percentage => {
            if !(0..=10_000).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field: "discount value (bps)".to_string(),
                    min: 0,
                    max: 10_000,
                });
            }
        }
        DiscountKind::Fixed => {
            if value < 0 {
                return Err(ValidationError::MustBePositive {
                    field: "discount value (cents)".to_string(),
                });
            }
        }
    }
    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a currency code (ISO 4217 shape: three ASCII uppercase).
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "currency".to_string(),
        });
    }
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "expected three uppercase letters".to_string(),
        });
    }
    Ok(())
}

/// Validates a slug (non-empty, lowercase alphanumeric plus hyphens).
pub fn validate_slug(slug: &str) -> ValidationResult<()> {
    let slug = slug.trim();

    if slug.is_empty() {
        return Err(ValidationError::Required {
            field: "slug".to_string(),
        });
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "slug".to_string(),
            reason: "expected lowercase alphanumeric and hyphens".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
