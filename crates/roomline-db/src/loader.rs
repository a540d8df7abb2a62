//! # Room Snapshot Loader
//!
//! Batch-by-key loading of everything the pricing engine needs to
//! recompute a set of rooms.
//!
//! ## Why a Loader?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE N+1 PROBLEM                                                        │
//! │                                                                         │
//! │  Naive recompute of 500 rooms:                                          │
//! │    500 × (1 room query + 1 collections query                            │
//! │           + 1 variant-prices query + 1 listings query) = 2000 queries   │
//! │                                                                         │
//! │  With the loader:                                                       │
//! │    1 rooms query + 1 collections query                                  │
//! │    + 1 variant-prices query + 1 listings query = 4 queries              │
//! │                                                                         │
//! │  Keyed by room id, deduplicated, assembled in memory.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::sql_placeholders;
use roomline_core::{Money, Room, RoomChannelListing};

// =============================================================================
// Snapshot
// =============================================================================

/// Everything needed to recompute one room's discounted prices.
#[derive(Debug)]
pub struct RoomSnapshot {
    /// The room itself (id + category for scope matching).
    pub room: Room,

    /// Ids of the collections the room belongs to.
    pub collections: HashSet<String>,

    /// Base prices of the room's variants, grouped by channel id.
    ///
    /// A channel with no entry means the room has no variant listings
    /// there - an unsellable configuration whose cache must stay NULL.
    pub variant_prices: HashMap<String, Vec<Money>>,

    /// The room's channel listings (the rows carrying the cache).
    pub channel_listings: Vec<RoomChannelListing>,
}

// =============================================================================
// Loader
// =============================================================================

/// Batch loader for room snapshots.
#[derive(Debug, Clone)]
pub struct RoomSnapshotLoader {
    pool: SqlitePool,
}

impl RoomSnapshotLoader {
    /// Creates a new RoomSnapshotLoader.
    pub fn new(pool: SqlitePool) -> Self {
        RoomSnapshotLoader { pool }
    }

    /// Loads snapshots for the given rooms in four batch queries.
    ///
    /// Input ids are deduplicated; unknown ids are silently dropped
    /// (a deleted room needs no recompute). Output order follows the
    /// deduplicated input order.
    pub async fn load(&self, room_ids: &[String]) -> DbResult<Vec<RoomSnapshot>> {
        // Dedup, preserving first-seen order.
        let mut seen = HashSet::new();
        let ids: Vec<&String> = room_ids.iter().filter(|id| seen.insert(id.as_str())).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = sql_placeholders(ids.len());

        // 1. Rooms.
        let sql = format!(
            "SELECT id, name, category_id, created_at, updated_at FROM rooms WHERE id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, Room>(&sql);
        for id in &ids {
            query = query.bind(id.as_str());
        }
        let mut rooms: HashMap<String, Room> = query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        // 2. Collection memberships.
        let sql = format!(
            "SELECT room_id, collection_id FROM room_collections WHERE room_id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for id in &ids {
            query = query.bind(id.as_str());
        }
        let mut collections: HashMap<String, HashSet<String>> = HashMap::new();
        for (room_id, collection_id) in query.fetch_all(&self.pool).await? {
            collections.entry(room_id).or_default().insert(collection_id);
        }

        // 3. Variant prices per channel.
        let sql = format!(
            r#"
            SELECT v.room_id, l.channel_id, l.price_cents
            FROM variant_channel_listings l
            INNER JOIN room_variants v ON v.id = l.variant_id
            WHERE v.room_id IN ({placeholders})
            "#
        );
        let mut query = sqlx::query_as::<_, (String, String, i64)>(&sql);
        for id in &ids {
            query = query.bind(id.as_str());
        }
        let mut variant_prices: HashMap<String, HashMap<String, Vec<Money>>> = HashMap::new();
        for (room_id, channel_id, price_cents) in query.fetch_all(&self.pool).await? {
            variant_prices
                .entry(room_id)
                .or_default()
                .entry(channel_id)
                .or_default()
                .push(Money::from_cents(price_cents));
        }

        // 4. Room channel listings.
        let sql = format!(
            r#"
            SELECT id, room_id, channel_id, discounted_price_cents, is_published,
                   available_for_purchase
            FROM room_channel_listings
            WHERE room_id IN ({placeholders})
            ORDER BY channel_id
            "#
        );
        let mut query = sqlx::query_as::<_, RoomChannelListing>(&sql);
        for id in &ids {
            query = query.bind(id.as_str());
        }
        let mut channel_listings: HashMap<String, Vec<RoomChannelListing>> = HashMap::new();
        for listing in query.fetch_all(&self.pool).await? {
            channel_listings
                .entry(listing.room_id.clone())
                .or_default()
                .push(listing);
        }

        let snapshots: Vec<RoomSnapshot> = ids
            .iter()
            .filter_map(|id| rooms.remove(id.as_str()))
            .map(|room| RoomSnapshot {
                collections: collections.remove(&room.id).unwrap_or_default(),
                variant_prices: variant_prices.remove(&room.id).unwrap_or_default(),
                channel_listings: channel_listings.remove(&room.id).unwrap_or_default(),
                room,
            })
            .collect();

        debug!(
            requested = ids.len(),
            loaded = snapshots.len(),
            "Loaded room snapshots"
        );
        Ok(snapshots)
    }
}
