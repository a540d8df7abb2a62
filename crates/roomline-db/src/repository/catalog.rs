//! # Catalog Repository
//!
//! Database operations for channels, rooms, variants and their
//! per-channel listings.
//!
//! ## The Catalogue Union Query
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            rooms_matching(CatalogueFilter)                              │
//! │                                                                         │
//! │  filter = { room_ids, category_ids, collection_ids }                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT DISTINCT r.id FROM rooms r                                     │
//! │  LEFT JOIN room_collections rc ON rc.room_id = r.id                    │
//! │  WHERE r.id IN (...) OR r.category_id IN (...)                         │
//! │     OR rc.collection_id IN (...)                                       │
//! │                                                                         │
//! │  Only non-empty dimensions contribute a clause. An entirely empty      │
//! │  filter matches NOTHING (not everything). Dangling ids match           │
//! │  nothing - a deleted category in the filter is a silent no-op.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::sql_placeholders;
use roomline_core::validation::{validate_currency, validate_slug};
use roomline_core::{Channel, Room, RoomChannelListing, RoomVariant, VariantChannelListing};

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Channels
    // =========================================================================

    /// Inserts a sales channel.
    pub async fn insert_channel(&self, channel: &Channel) -> DbResult<()> {
        debug!(slug = %channel.slug, currency = %channel.currency, "Inserting channel");

        validate_slug(&channel.slug)?;
        validate_currency(&channel.currency)?;

        sqlx::query("INSERT INTO channels (id, slug, name, currency) VALUES (?1, ?2, ?3, ?4)")
            .bind(&channel.id)
            .bind(&channel.slug)
            .bind(&channel.name)
            .bind(&channel.currency)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Gets a channel by its slug.
    pub async fn get_channel_by_slug(&self, slug: &str) -> DbResult<Option<Channel>> {
        let channel = sqlx::query_as::<_, Channel>(
            "SELECT id, slug, name, currency FROM channels WHERE slug = ?1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(channel)
    }

    // =========================================================================
    // Rooms & Variants
    // =========================================================================

    /// Inserts a room.
    pub async fn insert_room(&self, room: &Room) -> DbResult<()> {
        debug!(id = %room.id, name = %room.name, "Inserting room");

        sqlx::query(
            r#"
            INSERT INTO rooms (id, name, category_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&room.id)
        .bind(&room.name)
        .bind(&room.category_id)
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a room by its ID.
    pub async fn get_room(&self, id: &str) -> DbResult<Option<Room>> {
        let room = sqlx::query_as::<_, Room>(
            "SELECT id, name, category_id, created_at, updated_at FROM rooms WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(room)
    }

    /// Moves a room to a category (or out of any, with None).
    pub async fn set_room_category(&self, room_id: &str, category_id: Option<&str>) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE rooms SET category_id = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(room_id)
        .bind(category_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Room", room_id));
        }

        Ok(())
    }

    /// Adds a room to a collection. Idempotent.
    pub async fn add_to_collection(&self, room_id: &str, collection_id: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO room_collections (room_id, collection_id)
            VALUES (?1, ?2)
            ON CONFLICT (room_id, collection_id) DO NOTHING
            "#,
        )
        .bind(room_id)
        .bind(collection_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes a room from a collection.
    pub async fn remove_from_collection(&self, room_id: &str, collection_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM room_collections WHERE room_id = ?1 AND collection_id = ?2")
            .bind(room_id)
            .bind(collection_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Inserts a room variant.
    pub async fn insert_variant(&self, variant: &RoomVariant) -> DbResult<()> {
        debug!(sku = %variant.sku, room_id = %variant.room_id, "Inserting variant");

        sqlx::query("INSERT INTO room_variants (id, room_id, sku, name) VALUES (?1, ?2, ?3, ?4)")
            .bind(&variant.id)
            .bind(&variant.room_id)
            .bind(&variant.sku)
            .bind(&variant.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Channel Listings
    // =========================================================================

    /// Creates or updates a variant's price in a channel.
    pub async fn upsert_variant_listing(&self, listing: &VariantChannelListing) -> DbResult<()> {
        debug!(
            variant_id = %listing.variant_id,
            channel_id = %listing.channel_id,
            price_cents = listing.price_cents,
            "Upserting variant listing"
        );

        sqlx::query(
            r#"
            INSERT INTO variant_channel_listings
                (id, variant_id, channel_id, price_cents, cost_price_cents)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (variant_id, channel_id) DO UPDATE SET
                price_cents = excluded.price_cents,
                cost_price_cents = excluded.cost_price_cents
            "#,
        )
        .bind(&listing.id)
        .bind(&listing.variant_id)
        .bind(&listing.channel_id)
        .bind(listing.price_cents)
        .bind(listing.cost_price_cents)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Creates a room's channel listing. The discounted-price cache starts
    /// NULL; only the pricing engine ever writes it.
    pub async fn insert_room_listing(&self, listing: &RoomChannelListing) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO room_channel_listings
                (id, room_id, channel_id, discounted_price_cents, is_published,
                 available_for_purchase)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&listing.id)
        .bind(&listing.room_id)
        .bind(&listing.channel_id)
        .bind(listing.discounted_price_cents)
        .bind(listing.is_published)
        .bind(listing.available_for_purchase)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a room's listing in a channel.
    pub async fn get_room_listing(
        &self,
        room_id: &str,
        channel_id: &str,
    ) -> DbResult<Option<RoomChannelListing>> {
        let listing = sqlx::query_as::<_, RoomChannelListing>(
            r#"
            SELECT id, room_id, channel_id, discounted_price_cents, is_published,
                   available_for_purchase
            FROM room_channel_listings
            WHERE room_id = ?1 AND channel_id = ?2
            "#,
        )
        .bind(room_id)
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(listing)
    }

    /// Writes the discounted-price cache on a listing.
    ///
    /// Only the pricing engine calls this; everybody else treats the
    /// column as read-only derived data.
    pub async fn set_discounted_price(
        &self,
        listing_id: &str,
        discounted_price_cents: Option<i64>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE room_channel_listings SET discounted_price_cents = ?2 WHERE id = ?1",
        )
        .bind(listing_id)
        .bind(discounted_price_cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RoomChannelListing", listing_id));
        }

        Ok(())
    }

    // =========================================================================
    // Catalogue Union
    // =========================================================================

    /// Resolves the deduplicated union of rooms matching any filter
    /// dimension. An empty filter matches nothing.
    pub async fn rooms_matching(
        &self,
        filter: &roomline_core::CatalogueFilter,
    ) -> DbResult<Vec<String>> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }

        let mut clauses: Vec<String> = Vec::new();
        if !filter.room_ids.is_empty() {
            clauses.push(format!(
                "r.id IN ({})",
                sql_placeholders(filter.room_ids.len())
            ));
        }
        if !filter.category_ids.is_empty() {
            clauses.push(format!(
                "r.category_id IN ({})",
                sql_placeholders(filter.category_ids.len())
            ));
        }
        if !filter.collection_ids.is_empty() {
            clauses.push(format!(
                "rc.collection_id IN ({})",
                sql_placeholders(filter.collection_ids.len())
            ));
        }

        let sql = format!(
            r#"
            SELECT DISTINCT r.id
            FROM rooms r
            LEFT JOIN room_collections rc ON rc.room_id = r.id
            WHERE {}
            ORDER BY r.id
            "#,
            clauses.join(" OR ")
        );

        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for id in &filter.room_ids {
            query = query.bind(id);
        }
        for id in &filter.category_ids {
            query = query.bind(id);
        }
        for id in &filter.collection_ids {
            query = query.bind(id);
        }

        let room_ids = query.fetch_all(&self.pool).await?;

        debug!(count = room_ids.len(), "Catalogue filter matched rooms");
        Ok(room_ids)
    }
}

/// Helper to generate a new catalog entity ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn channel(slug: &str, currency: &str) -> Channel {
        Channel {
            id: generate_id(),
            slug: slug.to_string(),
            name: "Web storefront".to_string(),
            currency: currency.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_channel_rejects_malformed_slug() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        let err = repo.insert_channel(&channel("Web Store", "USD")).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_insert_channel_rejects_malformed_currency() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        for currency in ["usd", "EURO", ""] {
            let err = repo.insert_channel(&channel("web", currency)).await.unwrap_err();
            assert!(matches!(err, DbError::Validation(_)), "currency {currency:?}: {err:?}");
        }
        assert!(repo.get_channel_by_slug("web").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_channel_accepts_well_formed_input() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.insert_channel(&channel("web-eu", "EUR")).await.unwrap();
        let loaded = repo.get_channel_by_slug("web-eu").await.unwrap().unwrap();
        assert_eq!(loaded.currency, "EUR");
    }
}
