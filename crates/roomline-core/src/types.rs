//! # Domain Types
//!
//! Core domain types used throughout Roomline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐   ┌─────────────────┐  │
//! │  │      Room       │   │     RoomVariant      │   │     Channel     │  │
//! │  │  ─────────────  │   │  ──────────────────  │   │  ─────────────  │  │
//! │  │  id (UUID)      │──►│  id (UUID)           │   │  id (UUID)      │  │
//! │  │  category_id    │   │  sku (business)      │   │  slug           │  │
//! │  │  collections    │   │                      │   │  currency       │  │
//! │  └───────┬─────────┘   └─────────┬────────────┘   └─────────────────┘  │
//! │          │                       │                                      │
//! │          ▼                       ▼                                      │
//! │  ┌──────────────────┐   ┌───────────────────────┐                      │
//! │  │RoomChannelListing│   │VariantChannelListing  │                      │
//! │  │ ──────────────── │   │ ───────────────────── │                      │
//! │  │ discounted_price │   │ price_cents           │                      │
//! │  │ (CACHE, not      │   │ cost_price_cents      │                      │
//! │  │  source of truth)│   │                       │                      │
//! │  └──────────────────┘   └───────────────────────┘                      │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐      │
//! │  │     Hotel       │──►│     Stock       │◄──│   Allocation    │      │
//! │  │   (warehouse)   │   │  quantity       │   │  quantity_      │      │
//! │  └─────────────────┘   └─────────────────┘   │  allocated      │      │
//! │                                               └────────┬────────┘      │
//! │                                                        │               │
//! │                                               ┌────────▼────────┐      │
//! │                                               │   OrderLine     │      │
//! │                                               └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: (sku, slug) - human-readable

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Channel
// =============================================================================

/// A sales channel: a storefront/currency pairing under which rooms are
/// independently published and priced.
///
/// All monetary values attached to a channel (variant prices, fixed
/// discount values, the cached discounted price) are denominated in this
/// channel's currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Channel {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// URL-friendly business identifier (e.g., "default-channel").
    pub slug: String,

    /// Display name.
    pub name: String,

    /// ISO 4217 currency code (e.g., "USD").
    pub currency: String,
}

// =============================================================================
// Room & Variants
// =============================================================================

/// A sellable room (the catalog item).
///
/// A room itself carries no price. Prices live on its variants'
/// per-channel listings; the room's channel listing only caches the
/// cheapest discounted variant price ("from" price).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Room {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on the storefront.
    pub name: String,

    /// Optional category membership (single category per room).
    pub category_id: Option<String>,

    /// When the room was created.
    pub created_at: DateTime<Utc>,

    /// When the room was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A specific bookable configuration of a room (e.g., "Deluxe King,
/// sea view"), the unit that actually carries a price and stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RoomVariant {
    pub id: String,
    pub room_id: String,
    /// Stock Keeping Unit - business identifier.
    pub sku: String,
    pub name: String,
}

/// Per-channel price of a variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct VariantChannelListing {
    pub id: String,
    pub variant_id: String,
    pub channel_id: String,
    /// Base price in cents (channel currency).
    pub price_cents: i64,
    /// Optional cost price for margin reporting.
    pub cost_price_cents: Option<i64>,
}

impl VariantChannelListing {
    /// Returns the base price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Per-channel publication state of a room, carrying the denormalized
/// discounted-price snapshot.
///
/// ## Invariant
/// `discounted_price_cents` must equal the minimum, over all of the room's
/// variants listed in this channel, of the discount-adjusted variant
/// price. It is a cache, recomputed on demand by the pricing engine, never
/// the source of truth. NULL when the room has no variant listings in the
/// channel (unsellable configuration).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RoomChannelListing {
    pub id: String,
    pub room_id: String,
    pub channel_id: String,
    /// Cached lowest post-discount variant price, in cents.
    pub discounted_price_cents: Option<i64>,
    /// Whether the room is visible in this channel.
    pub is_published: bool,
    /// Date from which the room may be booked in this channel.
    pub available_for_purchase: Option<DateTime<Utc>>,
}

impl RoomChannelListing {
    /// Returns the cached discounted price as Money, if set.
    #[inline]
    pub fn discounted_price(&self) -> Option<Money> {
        self.discounted_price_cents.map(Money::from_cents)
    }
}

// =============================================================================
// Promotion Rules
// =============================================================================

/// How a promotion rule discounts the base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Subtract a fixed amount (channel currency cents), floored at zero.
    Fixed,
    /// Subtract a percentage of the base price (value in basis points).
    Percentage,
}

/// A sale or voucher: a scoped, time-bounded discount definition.
///
/// ## Scope Invariant
/// The three scope sets form a union (OR), not an intersection: a room
/// qualifies if it matches ANY of room ids, category ids, or collection
/// ids. A dangling id in a scope set simply matches nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionRule {
    pub id: String,
    pub name: String,
    pub kind: DiscountKind,

    /// Start of the validity window.
    pub starts_at: DateTime<Utc>,
    /// End of the validity window; open-ended when None.
    pub ends_at: Option<DateTime<Utc>>,

    /// Rooms directly in scope.
    pub room_ids: HashSet<String>,
    /// Categories in scope.
    pub category_ids: HashSet<String>,
    /// Collections in scope.
    pub collection_ids: HashSet<String>,

    /// Per-channel discount value, keyed by channel id.
    ///
    /// Interpretation depends on `kind`: cents for `Fixed`, basis points
    /// for `Percentage`. A rule with no entry for a channel does not apply
    /// in that channel at all.
    pub channel_values: HashMap<String, i64>,
}

impl PromotionRule {
    /// Whether the rule's validity window covers the given instant.
    ///
    /// The window is half-open: `starts_at <= at < ends_at`.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && self.ends_at.map_or(true, |ends| at < ends)
    }

    /// The rule's discount value for a channel, if it is listed there.
    #[inline]
    pub fn value_for_channel(&self, channel_id: &str) -> Option<i64> {
        self.channel_values.get(channel_id).copied()
    }
}

// =============================================================================
// Hotels & Stock
// =============================================================================

/// A hotel acts as the warehouse of the system: the physical location
/// stock records belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Hotel {
    pub id: String,
    /// URL-friendly business identifier.
    pub slug: String,
    pub name: String,
    /// ISO 3166-1 alpha-2 country code, used by callers to order
    /// candidate hotels for allocation.
    pub country: String,
}

/// Physical stock of one variant at one hotel.
///
/// ## Invariant
/// `sum(quantity_allocated over this stock's allocations) <= quantity`.
/// Enforced structurally by the allocation engine's write transaction,
/// not checked after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Stock {
    pub id: String,
    pub hotel_id: String,
    pub variant_id: String,
    /// Physical count on hand.
    pub quantity: i64,
}

/// A line on a placed order, requesting `quantity` units of a variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub variant_id: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// A reservation of stock quantity against an order line.
///
/// ## Lifecycle
/// ```text
/// {none} ──allocate──► allocated (quantity_allocated > 0)
///    ▲                     │
///    │                     ├──deallocate(part)──► reduced, row kept
///    └──deallocate(all)────┴──────────────────► row deleted
/// ```
/// Fulfillment does not change allocations; only cancellation and returns
/// release them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Allocation {
    pub id: String,
    pub order_line_id: String,
    pub stock_id: String,
    pub quantity_allocated: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Catalogue Filter
// =============================================================================

/// Identifies the set of rooms affected by a catalogue or promotion
/// change: the deduplicated union of rooms listed directly, rooms in the
/// named categories, and rooms in the named collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogueFilter {
    pub room_ids: Vec<String>,
    pub category_ids: Vec<String>,
    pub collection_ids: Vec<String>,
}

impl CatalogueFilter {
    /// Filter matching exactly the given rooms.
    pub fn rooms<I: IntoIterator<Item = String>>(room_ids: I) -> Self {
        CatalogueFilter {
            room_ids: room_ids.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Filter derived from a promotion rule's own scope, used when the
    /// rule itself is created, updated or deleted.
    pub fn from_rule(rule: &PromotionRule) -> Self {
        CatalogueFilter {
            room_ids: rule.room_ids.iter().cloned().collect(),
            category_ids: rule.category_ids.iter().cloned().collect(),
            collection_ids: rule.collection_ids.iter().cloned().collect(),
        }
    }

    /// True when no dimension names any id; such a filter matches nothing
    /// (it is NOT a match-all).
    pub fn is_empty(&self) -> bool {
        self.room_ids.is_empty() && self.category_ids.is_empty() && self.collection_ids.is_empty()
    }
}

// =============================================================================
// Job Queue
// =============================================================================

/// An entry in the background job queue.
///
/// Uses the outbox pattern: the row is written in the same database as the
/// change that triggered it, and a worker polls for unfinished entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JobQueueEntry {
    pub id: String,
    /// Job discriminator: "recalculate_room", "recalculate_catalogue", ...
    pub kind: String,
    /// The job arguments as JSON.
    pub payload: String,
    /// Number of execution attempts so far.
    pub attempts: i64,
    /// Last error message if execution failed.
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When execution was last attempted.
    pub attempted_at: Option<DateTime<Utc>>,
    /// When successfully completed.
    pub completed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================
