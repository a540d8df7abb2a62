//! # Discount Resolver
//!
//! Computes the discount-adjusted price of one variant at one instant,
//! given a snapshot of active promotion rules. Pure functions, no I/O.
//!
//! ## Resolution Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    resolve_discounted_price                             │
//! │                                                                         │
//! │  active_rules (pre-filtered to the current instant)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. SCOPE FILTER: keep rules matching the room                         │
//! │     room.id ∈ rule.room_ids                                            │
//! │       OR room.category_id ∈ rule.category_ids                          │
//! │       OR room.collections ∩ rule.collection_ids ≠ ∅                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. CHANNEL FILTER: skip rules with no value for this channel          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. CANDIDATES: one price per surviving rule                           │
//! │     percentage → base × (1 − bps/10000)                                │
//! │     fixed      → base − value, floored at zero                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. MINIMUM: lowest candidate wins; no rule matched → base unchanged   │
//! │                                                                         │
//! │  Discounts NEVER stack: the single best rule wins, not a sum.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::money::Money;
use crate::types::{DiscountKind, PromotionRule, Room};

// =============================================================================
// Scope Matching
// =============================================================================

/// Whether a rule's catalog scope covers the given room.
///
/// ## Union Semantics
/// The three scope dimensions are OR-ed: matching any one of them
/// qualifies the room. A rule scoped to `category_ids={7}` discounts a
/// room in category 7 even if the room appears in none of the rule's
/// collections and is not listed by id.
///
/// Dangling references (a scope id pointing at a deleted room, category
/// or collection) simply never match; they are not an error.
pub fn rule_matches_room(
    rule: &PromotionRule,
    room: &Room,
    room_collections: &HashSet<String>,
) -> bool {
    if rule.room_ids.contains(&room.id) {
        return true;
    }

    if let Some(category_id) = &room.category_id {
        if rule.category_ids.contains(category_id) {
            return true;
        }
    }

    !rule.collection_ids.is_disjoint(room_collections)
}

// =============================================================================
// Candidate Prices
// =============================================================================

/// The price this rule would produce for `base_price` in `channel_id`.
///
/// Returns `None` when the rule has no per-channel value for the target
/// channel - such a rule is treated as non-matching for that channel
/// entirely, not as a zero discount.
///
/// Computed prices are floored at zero; a discount can make a room free,
/// never paid-to-book.
pub fn candidate_price(rule: &PromotionRule, base_price: Money, channel_id: &str) -> Option<Money> {
    let value = rule.value_for_channel(channel_id)?;

    let candidate = match rule.kind {
        // Value is basis points. The write boundary rejects out-of-range
        // values; clamping here keeps a bad stored row from amplifying.
        DiscountKind::Percentage => base_price.discount_by_bps(value.clamp(0, 10_000) as u32),
        // Value is cents in the channel currency. Negative values are
        // clamped: a discount can never push the price ABOVE base.
        DiscountKind::Fixed => base_price.saturating_sub(Money::from_cents(value.max(0))),
    };

    Some(candidate.max(Money::zero()))
}

// =============================================================================
// Resolution
// =============================================================================

/// Computes the discount-adjusted price of one variant price.
///
/// ## Arguments
/// * `room` - the room the variant belongs to (scope matching)
/// * `base_price` - the variant's listed price in the channel currency
/// * `room_collections` - ids of the collections the room belongs to
/// * `active_rules` - rules already filtered to be temporally active
/// * `channel_id` - the channel whose per-rule value applies
///
/// ## Returns
/// The minimum candidate price across all matching rules, or `base_price`
/// unchanged when no rule matches. Matching rules apply independently:
/// only the single best (lowest-price) discount wins, discounts are never
/// summed.
///
/// ## Example
/// ```rust
/// use std::collections::{HashMap, HashSet};
/// use chrono::Utc;
/// use roomline_core::discount::resolve_discounted_price;
/// use roomline_core::money::Money;
/// use roomline_core::types::{DiscountKind, PromotionRule, Room};
///
/// let room = Room {
///     id: "room-1".into(),
///     name: "Sea View Double".into(),
///     category_id: Some("cat-7".into()),
///     created_at: Utc::now(),
///     updated_at: Utc::now(),
/// };
/// let rule = PromotionRule {
///     id: "sale-1".into(),
///     name: "Spring sale".into(),
///     kind: DiscountKind::Percentage,
///     starts_at: Utc::now(),
///     ends_at: None,
///     room_ids: HashSet::new(),
///     category_ids: HashSet::from(["cat-7".to_string()]),
///     collection_ids: HashSet::new(),
///     channel_values: HashMap::from([("channel-1".to_string(), 2000)]), // 20%
/// };
///
/// let price = resolve_discounted_price(
///     &room,
///     Money::from_cents(10000),
///     &HashSet::new(),
///     &[rule],
///     "channel-1",
/// );
/// assert_eq!(price.cents(), 8000);
/// ```
pub fn resolve_discounted_price(
    room: &Room,
    base_price: Money,
    room_collections: &HashSet<String>,
    active_rules: &[PromotionRule],
    channel_id: &str,
) -> Money {
    active_rules
        .iter()
        .filter(|rule| rule_matches_room(rule, room, room_collections))
        .filter_map(|rule| candidate_price(rule, base_price, channel_id))
        .min()
        .unwrap_or(base_price)
}

/// Whether a computed price counts as "on sale" relative to the base.
///
/// Strict comparison: a rule that produces a price equal to the
/// undiscounted price (a 0% sale) does not badge the room as on sale.
#[inline]
pub fn is_on_sale(base_price: Money, discounted_price: Money) -> bool {
    discounted_price < base_price
}

// =============================================================================
// Unit Tests
// =============================================================================
