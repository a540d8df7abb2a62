//! # Price Recalculation Engine
//!
//! Keeps the denormalized `discounted_price_cents` on each room channel
//! listing consistent with the current catalog and promotion state.
//!
//! ## Recalculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  recalculate_catalogue(filter)                          │
//! │                                                                         │
//! │  1. Resolve affected rooms: union of filter dimensions, deduped        │
//! │  2. Fetch promotion rules active right now                             │
//! │  3. Load room snapshots (4 batch queries, no N+1)                      │
//! │  4. Per room × channel listing:                                        │
//! │       computed = min over variant prices of resolve_discounted_price  │
//! │       no variant listings in the channel → computed = NULL            │
//! │  5. Write back ONLY listings whose cache actually changed             │
//! │                                                                         │
//! │  Idempotent: a second run with the same inputs computes the same      │
//! │  values and writes nothing. Safe to re-trigger freely on failure.     │
//! │  Last-writer-wins between concurrent runs is acceptable for the       │
//! │  same reason.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::loader::{RoomSnapshot, RoomSnapshotLoader};
use crate::repository::catalog::CatalogRepository;
use crate::repository::discount::DiscountRepository;
use roomline_core::{resolve_discounted_price, CatalogueFilter, PromotionRule};

/// The price recalculation engine.
///
/// Constructed with its data-access collaborators explicitly; nothing
/// here reaches into ambient global state.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    loader: RoomSnapshotLoader,
    catalog: CatalogRepository,
    discounts: DiscountRepository,
}

impl PricingEngine {
    /// Creates a new PricingEngine on the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        PricingEngine {
            loader: RoomSnapshotLoader::new(pool.clone()),
            catalog: CatalogRepository::new(pool.clone()),
            discounts: DiscountRepository::new(pool),
        }
    }

    /// Recomputes the discounted-price cache for one room.
    ///
    /// ## Returns
    /// The number of channel listings actually written. Unchanged values
    /// are skipped to avoid write amplification on bulk recompute.
    pub async fn recalculate_room(
        &self,
        room_id: &str,
        active_rules: &[PromotionRule],
    ) -> DbResult<usize> {
        self.recalculate_many(&[room_id.to_string()], active_rules)
            .await
    }

    /// Recomputes the discounted-price cache for a set of rooms.
    ///
    /// Rooms with zero variants or zero channel listings are skipped
    /// silently; a missing room id is not an error.
    pub async fn recalculate_many(
        &self,
        room_ids: &[String],
        active_rules: &[PromotionRule],
    ) -> DbResult<usize> {
        let snapshots = self.loader.load(room_ids).await?;

        let mut written = 0;
        for snapshot in &snapshots {
            written += self.write_changed(snapshot, active_rules).await?;
        }

        debug!(
            rooms = snapshots.len(),
            listings_written = written,
            "Recalculated discounted prices"
        );
        Ok(written)
    }

    /// Recomputes every room affected by a catalogue change: the
    /// deduplicated union of rooms named directly, rooms in the named
    /// categories, and rooms in the named collections.
    ///
    /// Fetches the promotion rules active at the time of execution, not
    /// at the time of the triggering change; jobs that run late simply
    /// converge on the fresher state.
    pub async fn recalculate_catalogue(&self, filter: &CatalogueFilter) -> DbResult<usize> {
        if filter.is_empty() {
            return Ok(0);
        }

        let room_ids = self.catalog.rooms_matching(filter).await?;
        if room_ids.is_empty() {
            // Dangling references in the filter: nothing to do.
            return Ok(0);
        }

        let active_rules = self.discounts.fetch_active(Utc::now()).await?;
        let written = self.recalculate_many(&room_ids, &active_rules).await?;

        info!(
            rooms = room_ids.len(),
            listings_written = written,
            "Catalogue recalculation complete"
        );
        Ok(written)
    }

    /// Recomputes every room in a promotion rule's own scope.
    ///
    /// Used when a rule is created, updated or deleted: recompute is
    /// scope-based and idempotent, so the same call covers both "these
    /// rooms are now discounted" and "a deleted rule may have
    /// un-discounted these rooms". For deletion, pass the rule as it was
    /// before the delete.
    pub async fn recalculate_rule(&self, rule: &PromotionRule) -> DbResult<usize> {
        self.recalculate_catalogue(&CatalogueFilter::from_rule(rule))
            .await
    }

    /// Computes and persists one room's caches, returning the number of
    /// listings written.
    async fn write_changed(
        &self,
        snapshot: &RoomSnapshot,
        active_rules: &[PromotionRule],
    ) -> DbResult<usize> {
        let mut written = 0;

        for listing in &snapshot.channel_listings {
            // A room's "from" price is its cheapest variant after
            // discounts. No variant listings in the channel → the room is
            // unsellable there and the cache must be NULL.
            let computed = snapshot
                .variant_prices
                .get(&listing.channel_id)
                .and_then(|prices| {
                    prices
                        .iter()
                        .map(|price| {
                            resolve_discounted_price(
                                &snapshot.room,
                                *price,
                                &snapshot.collections,
                                active_rules,
                                &listing.channel_id,
                            )
                        })
                        .min()
                });

            let computed_cents = computed.map(|m| m.cents());
            if computed_cents != listing.discounted_price_cents {
                self.catalog
                    .set_discounted_price(&listing.id, computed_cents)
                    .await?;
                written += 1;
            }
        }

        Ok(written)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use roomline_core::{
        Channel, DiscountKind, Room, RoomChannelListing, RoomVariant, VariantChannelListing,
    };
    use std::collections::{HashMap, HashSet};
    use uuid::Uuid;

    fn id() -> String {
        Uuid::new_v4().to_string()
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_channel(db: &Database, slug: &str) -> String {
        let channel = Channel {
            id: id(),
            slug: slug.to_string(),
            name: slug.to_string(),
            currency: "USD".to_string(),
        };
        db.catalog().insert_channel(&channel).await.unwrap();
        channel.id
    }

    /// Creates a room with one variant priced `price_cents` in the
    /// channel, plus the room's channel listing. Returns (room_id,
    /// listing_id).
    async fn seed_room(
        db: &Database,
        channel_id: &str,
        category_id: Option<&str>,
        price_cents: i64,
    ) -> (String, String) {
        let catalog = db.catalog();
        let now = Utc::now();

        let room = Room {
            id: id(),
            name: "Sea View Double".to_string(),
            category_id: category_id.map(String::from),
            created_at: now,
            updated_at: now,
        };
        catalog.insert_room(&room).await.unwrap();

        let variant = RoomVariant {
            id: id(),
            room_id: room.id.clone(),
            sku: format!("SKU-{}", id()),
            name: "Standard".to_string(),
        };
        catalog.insert_variant(&variant).await.unwrap();

        catalog
            .upsert_variant_listing(&VariantChannelListing {
                id: id(),
                variant_id: variant.id.clone(),
                channel_id: channel_id.to_string(),
                price_cents,
                cost_price_cents: None,
            })
            .await
            .unwrap();

        let listing = RoomChannelListing {
            id: id(),
            room_id: room.id.clone(),
            channel_id: channel_id.to_string(),
            discounted_price_cents: None,
            is_published: true,
            available_for_purchase: None,
        };
        catalog.insert_room_listing(&listing).await.unwrap();

        (room.id, listing.id)
    }

    fn percentage_rule(channel_id: &str, bps: i64) -> PromotionRule {
        let now = Utc::now();
        PromotionRule {
            id: id(),
            name: "Sale".to_string(),
            kind: DiscountKind::Percentage,
            starts_at: now - Duration::hours(1),
            ends_at: None,
            room_ids: HashSet::new(),
            category_ids: HashSet::new(),
            collection_ids: HashSet::new(),
            channel_values: HashMap::from([(channel_id.to_string(), bps)]),
        }
    }

    #[tokio::test]
    async fn test_recalculate_writes_discounted_minimum() {
        let db = db().await;
        let channel_id = seed_channel(&db, "web").await;
        let (room_id, _) = seed_room(&db, &channel_id, Some("cat-7"), 10000).await;

        // Second, cheaper variant: the "from" price must track the
        // cheapest variant.
        let catalog = db.catalog();
        let variant = RoomVariant {
            id: id(),
            room_id: room_id.clone(),
            sku: format!("SKU-{}", id()),
            name: "Compact".to_string(),
        };
        catalog.insert_variant(&variant).await.unwrap();
        catalog
            .upsert_variant_listing(&VariantChannelListing {
                id: id(),
                variant_id: variant.id,
                channel_id: channel_id.clone(),
                price_cents: 8000,
                cost_price_cents: None,
            })
            .await
            .unwrap();

        let mut rule = percentage_rule(&channel_id, 1000); // 10%
        rule.category_ids.insert("cat-7".to_string());

        let written = db
            .pricing()
            .recalculate_room(&room_id, &[rule])
            .await
            .unwrap();
        assert_eq!(written, 1);

        let listing = catalog
            .get_room_listing(&room_id, &channel_id)
            .await
            .unwrap()
            .unwrap();
        // min(10000, 8000) discounted 10% = 7200
        assert_eq!(listing.discounted_price_cents, Some(7200));
    }

    #[tokio::test]
    async fn test_recalculation_is_idempotent() {
        let db = db().await;
        let channel_id = seed_channel(&db, "web").await;
        let (room_id, _) = seed_room(&db, &channel_id, None, 10000).await;

        let mut rule = percentage_rule(&channel_id, 2500);
        rule.room_ids.insert(room_id.clone());
        let rules = vec![rule];

        let first = db.pricing().recalculate_room(&room_id, &rules).await.unwrap();
        assert_eq!(first, 1);

        // Same inputs: same stored value, and the second call performs no
        // write at all.
        let second = db.pricing().recalculate_room(&room_id, &rules).await.unwrap();
        assert_eq!(second, 0);

        let listing = db
            .catalog()
            .get_room_listing(&room_id, &channel_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.discounted_price_cents, Some(7500));
    }

    #[tokio::test]
    async fn test_no_rules_caches_base_price() {
        let db = db().await;
        let channel_id = seed_channel(&db, "web").await;
        let (room_id, _) = seed_room(&db, &channel_id, None, 12000).await;

        let written = db.pricing().recalculate_room(&room_id, &[]).await.unwrap();
        assert_eq!(written, 1);

        let listing = db
            .catalog()
            .get_room_listing(&room_id, &channel_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.discounted_price_cents, Some(12000));
    }

    #[tokio::test]
    async fn test_unsellable_channel_stays_null() {
        let db = db().await;
        let channel_id = seed_channel(&db, "web").await;
        let empty_channel = seed_channel(&db, "mobile").await;
        let (room_id, _) = seed_room(&db, &channel_id, None, 10000).await;

        // Listing in a channel where the room has no variant listings at
        // all: the engine must never write a price for an unsellable
        // configuration.
        let listing = RoomChannelListing {
            id: id(),
            room_id: room_id.clone(),
            channel_id: empty_channel.clone(),
            discounted_price_cents: None,
            is_published: true,
            available_for_purchase: None,
        };
        db.catalog().insert_room_listing(&listing).await.unwrap();

        db.pricing().recalculate_room(&room_id, &[]).await.unwrap();

        let listing = db
            .catalog()
            .get_room_listing(&room_id, &empty_channel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.discounted_price_cents, None);
    }

    #[tokio::test]
    async fn test_stale_cache_in_unsellable_channel_reset_to_null() {
        let db = db().await;
        let channel_id = seed_channel(&db, "web").await;
        let empty_channel = seed_channel(&db, "mobile").await;
        let (room_id, _) = seed_room(&db, &channel_id, None, 10000).await;

        let listing = RoomChannelListing {
            id: id(),
            room_id: room_id.clone(),
            channel_id: empty_channel.clone(),
            // Stale leftover from before the variant listing was removed.
            discounted_price_cents: Some(9999),
            is_published: true,
            available_for_purchase: None,
        };
        db.catalog().insert_room_listing(&listing).await.unwrap();

        let written = db.pricing().recalculate_room(&room_id, &[]).await.unwrap();
        assert_eq!(written, 2); // web cache written + mobile reset

        let listing = db
            .catalog()
            .get_room_listing(&room_id, &empty_channel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.discounted_price_cents, None);
    }

    #[tokio::test]
    async fn test_catalogue_union_dedup() {
        let db = db().await;
        let channel_id = seed_channel(&db, "web").await;

        // Room in category 7 AND collection 2: matched by two filter
        // dimensions, recomputed once.
        let (room_a, _) = seed_room(&db, &channel_id, Some("cat-7"), 10000).await;
        db.catalog().add_to_collection(&room_a, "col-2").await.unwrap();

        // Room matched only through its collection.
        let (room_b, _) = seed_room(&db, &channel_id, Some("cat-8"), 20000).await;
        db.catalog().add_to_collection(&room_b, "col-2").await.unwrap();

        // Unrelated room: must not be touched.
        let (room_c, _) = seed_room(&db, &channel_id, None, 30000).await;

        let filter = CatalogueFilter {
            room_ids: vec![],
            category_ids: vec!["cat-7".to_string()],
            collection_ids: vec!["col-2".to_string()],
        };
        let written = db.pricing().recalculate_catalogue(&filter).await.unwrap();
        assert_eq!(written, 2);

        let untouched = db
            .catalog()
            .get_room_listing(&room_c, &channel_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.discounted_price_cents, None);
    }

    #[tokio::test]
    async fn test_catalogue_with_dangling_ids_is_noop() {
        let db = db().await;
        let channel_id = seed_channel(&db, "web").await;
        seed_room(&db, &channel_id, None, 10000).await;

        let filter = CatalogueFilter {
            room_ids: vec!["no-such-room".to_string()],
            category_ids: vec!["no-such-category".to_string()],
            collection_ids: vec![],
        };
        let written = db.pricing().recalculate_catalogue(&filter).await.unwrap();
        assert_eq!(written, 0);
    }

    #[tokio::test]
    async fn test_rule_lifecycle_recalculation() {
        let db = db().await;
        let channel_id = seed_channel(&db, "web").await;
        let (room_id, _) = seed_room(&db, &channel_id, Some("cat-7"), 10000).await;

        let mut rule = percentage_rule(&channel_id, 1000);
        rule.category_ids.insert("cat-7".to_string());
        db.discounts().insert_rule(&rule).await.unwrap();

        // Rule created: its scope gets recomputed against active rules
        // fetched from the database.
        db.pricing().recalculate_rule(&rule).await.unwrap();
        let listing = db
            .catalog()
            .get_room_listing(&room_id, &channel_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.discounted_price_cents, Some(9000));

        // Rule deleted: the same scope-based recompute un-discounts.
        db.discounts().delete_rule(&rule.id).await.unwrap();
        db.pricing().recalculate_rule(&rule).await.unwrap();
        let listing = db
            .catalog()
            .get_room_listing(&room_id, &channel_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.discounted_price_cents, Some(10000));
    }
}
