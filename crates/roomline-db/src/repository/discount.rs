//! # Promotion Rule Repository
//!
//! Database operations for promotion rules (sales/vouchers), their catalog
//! scopes and per-channel discount values.
//!
//! ## Assembly
//! A rule spans five tables (header + three scope sets + channel values).
//! Reads fetch the headers first, then batch-load the side tables for all
//! fetched rule ids at once - one query per table, never one per rule.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::sql_placeholders;
use roomline_core::{validation::validate_discount_value, DiscountKind, PromotionRule};

/// Rule header as stored in `promotion_rules`.
#[derive(Debug, sqlx::FromRow)]
struct RuleHeader {
    id: String,
    name: String,
    kind: DiscountKind,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
}

/// Repository for promotion rule database operations.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Inserts a rule with its scopes and channel values, atomically.
    ///
    /// Every channel value is validated against the rule kind first: out
    /// of range percentages and negative fixed amounts never become rows.
    pub async fn insert_rule(&self, rule: &PromotionRule) -> DbResult<()> {
        debug!(id = %rule.id, name = %rule.name, "Inserting promotion rule");

        for value in rule.channel_values.values() {
            validate_discount_value(rule.kind, *value)?;
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO promotion_rules (id, name, kind, starts_at, ends_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(rule.kind)
        .bind(rule.starts_at)
        .bind(rule.ends_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for room_id in &rule.room_ids {
            sqlx::query("INSERT INTO rule_rooms (rule_id, room_id) VALUES (?1, ?2)")
                .bind(&rule.id)
                .bind(room_id)
                .execute(&mut *tx)
                .await?;
        }
        for category_id in &rule.category_ids {
            sqlx::query("INSERT INTO rule_categories (rule_id, category_id) VALUES (?1, ?2)")
                .bind(&rule.id)
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
        }
        for collection_id in &rule.collection_ids {
            sqlx::query("INSERT INTO rule_collections (rule_id, collection_id) VALUES (?1, ?2)")
                .bind(&rule.id)
                .bind(collection_id)
                .execute(&mut *tx)
                .await?;
        }
        for (channel_id, value) in &rule.channel_values {
            sqlx::query(
                "INSERT INTO rule_channel_listings (rule_id, channel_id, value) VALUES (?1, ?2, ?3)",
            )
            .bind(&rule.id)
            .bind(channel_id)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a rule by ID, fully assembled.
    pub async fn get_rule(&self, id: &str) -> DbResult<Option<PromotionRule>> {
        let header = sqlx::query_as::<_, RuleHeader>(
            "SELECT id, name, kind, starts_at, ends_at FROM promotion_rules WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let mut rules = self.assemble(vec![header]).await?;
        Ok(rules.pop())
    }

    /// Fetches all rules whose validity window covers `at`, fully
    /// assembled with scopes and channel values.
    ///
    /// This is the "discounts active at time T" query the engines consume.
    pub async fn fetch_active(&self, at: DateTime<Utc>) -> DbResult<Vec<PromotionRule>> {
        let headers = sqlx::query_as::<_, RuleHeader>(
            r#"
            SELECT id, name, kind, starts_at, ends_at
            FROM promotion_rules
            WHERE starts_at <= ?1 AND (ends_at IS NULL OR ends_at > ?1)
            ORDER BY created_at
            "#,
        )
        .bind(at)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = headers.len(), "Fetched active promotion rules");
        self.assemble(headers).await
    }

    /// Deletes a rule. Scope and channel-value rows cascade.
    ///
    /// Callers are expected to enqueue a catalogue recalculation with the
    /// rule's former scope; recomputation is scope-based and idempotent,
    /// so it handles both "now discounted" and "no longer discounted".
    pub async fn delete_rule(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM promotion_rules WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PromotionRule", id));
        }

        Ok(())
    }

    /// Loads scope sets and channel values for the given headers, one
    /// batch query per side table.
    async fn assemble(&self, headers: Vec<RuleHeader>) -> DbResult<Vec<PromotionRule>> {
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let rule_ids: Vec<&str> = headers.iter().map(|h| h.id.as_str()).collect();
        let placeholders = sql_placeholders(rule_ids.len());

        let mut room_ids: HashMap<String, HashSet<String>> = HashMap::new();
        let sql = format!(
            "SELECT rule_id, room_id FROM rule_rooms WHERE rule_id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for id in &rule_ids {
            query = query.bind(id);
        }
        for (rule_id, room_id) in query.fetch_all(&self.pool).await? {
            room_ids.entry(rule_id).or_default().insert(room_id);
        }

        let mut category_ids: HashMap<String, HashSet<String>> = HashMap::new();
        let sql = format!(
            "SELECT rule_id, category_id FROM rule_categories WHERE rule_id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for id in &rule_ids {
            query = query.bind(id);
        }
        for (rule_id, category_id) in query.fetch_all(&self.pool).await? {
            category_ids.entry(rule_id).or_default().insert(category_id);
        }

        let mut collection_ids: HashMap<String, HashSet<String>> = HashMap::new();
        let sql = format!(
            "SELECT rule_id, collection_id FROM rule_collections WHERE rule_id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for id in &rule_ids {
            query = query.bind(id);
        }
        for (rule_id, collection_id) in query.fetch_all(&self.pool).await? {
            collection_ids
                .entry(rule_id)
                .or_default()
                .insert(collection_id);
        }

        let mut channel_values: HashMap<String, HashMap<String, i64>> = HashMap::new();
        let sql = format!(
            "SELECT rule_id, channel_id, value FROM rule_channel_listings WHERE rule_id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, (String, String, i64)>(&sql);
        for id in &rule_ids {
            query = query.bind(id);
        }
        for (rule_id, channel_id, value) in query.fetch_all(&self.pool).await? {
            channel_values
                .entry(rule_id)
                .or_default()
                .insert(channel_id, value);
        }

        Ok(headers
            .into_iter()
            .map(|h| PromotionRule {
                room_ids: room_ids.remove(&h.id).unwrap_or_default(),
                category_ids: category_ids.remove(&h.id).unwrap_or_default(),
                collection_ids: collection_ids.remove(&h.id).unwrap_or_default(),
                channel_values: channel_values.remove(&h.id).unwrap_or_default(),
                id: h.id,
                name: h.name,
                kind: h.kind,
                starts_at: h.starts_at,
                ends_at: h.ends_at,
            })
            .collect())
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
    use uuid::Uuid;

    fn rule(kind: DiscountKind, value: i64) -> PromotionRule {
        let now = Utc::now();
        PromotionRule {
            id: Uuid::new_v4().to_string(),
            name: "Test rule".to_string(),
            kind,
            starts_at: now - Duration::hours(1),
            ends_at: None,
            room_ids: HashSet::from(["room-1".to_string()]),
            category_ids: HashSet::new(),
            collection_ids: HashSet::new(),
            channel_values: HashMap::from([("channel-1".to_string(), value)]),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_negative_fixed_value() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.discounts();

        // A negative fixed amount would subtract below zero cents of
        // discount, landing the resolved price above base. Must never
        // become a row.
        let bad = rule(DiscountKind::Fixed, -100);
        let err = repo.insert_rule(&bad).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)), "got {err:?}");
        assert!(repo.get_rule(&bad.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_out_of_range_percentage() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.discounts();

        for value in [-1, 10_001] {
            let bad = rule(DiscountKind::Percentage, value);
            let err = repo.insert_rule(&bad).await.unwrap_err();
            assert!(matches!(err, DbError::Validation(_)), "value {value}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_rule_round_trips_fully_assembled() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.discounts();

        // rule_channel_listings.channel_id has a foreign key on channels,
        // so the round trip needs a real channel row to reference.
        let channel = roomline_core::Channel {
            id: Uuid::new_v4().to_string(),
            slug: "web".to_string(),
            name: "web".to_string(),
            currency: "USD".to_string(),
        };
        db.catalog().insert_channel(&channel).await.unwrap();

        let mut sale = rule(DiscountKind::Percentage, 1500);
        sale.channel_values = HashMap::from([(channel.id.clone(), 1500)]);
        sale.category_ids.insert("cat-7".to_string());
        sale.collection_ids.insert("col-2".to_string());
        repo.insert_rule(&sale).await.unwrap();

        let loaded = repo.get_rule(&sale.id).await.unwrap().unwrap();
        assert_eq!(loaded.room_ids, sale.room_ids);
        assert_eq!(loaded.category_ids, sale.category_ids);
        assert_eq!(loaded.collection_ids, sale.collection_ids);
        assert_eq!(loaded.channel_values, sale.channel_values);
        assert_eq!(loaded.kind, DiscountKind::Percentage);

        let active = repo.fetch_active(Utc::now()).await.unwrap();
        assert_eq!(active.len(), 1);
    }
}
