//! # roomline-core: Pure Business Logic for Roomline
//!
//! This crate is the **heart** of Roomline. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Roomline Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Surrounding application (out of scope)             │   │
//! │  │    catalog mutations ──► order placement ──► fulfillment       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ roomline-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ discount  │  │ validation│  │   │
//! │  │   │   Room    │  │   Money   │  │ Resolver  │  │   rules   │  │   │
//! │  │   │   Stock   │  │  bps math │  │ min-price │  │   checks  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                roomline-db (Database Layer)                     │   │
//! │  │    SQLite repositories, pricing + allocation engines            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Room, Stock, PromotionRule, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`discount`] - The Discount Resolver (pure price resolution)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use roomline_core::money::Money;
//!
//! // Create money from cents (never from floats!)
//! let nightly = Money::from_cents(12000); // $120.00
//!
//! // 15% promotion, in basis points
//! let discounted = nightly.discount_by_bps(1500);
//! assert_eq!(discounted.cents(), 10200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use roomline_core::Money` instead of
// `use roomline_core::money::Money`

pub use discount::{candidate_price, is_on_sale, resolve_discounted_price, rule_matches_room};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
