//! # Stock Repository
//!
//! Database operations for hotels, stock records, order lines and
//! allocation rows.
//!
//! ## Available Quantity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  available(stock) = stock.quantity                                      │
//! │                   - COALESCE(SUM(allocations.quantity_allocated), 0)   │
//! │                                                                         │
//! │  quantity   = physical count on hand                                   │
//! │  allocated  = reserved for order lines, not yet released               │
//! │  available  = what a new allocation may still claim                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Plain reads of availability live here; the read-then-write allocation
//! path lives in the allocation engine, inside its write transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::sql_placeholders;
use roomline_core::validation::{validate_quantity, validate_slug};
use roomline_core::{Allocation, Hotel, OrderLine, Stock};

/// Repository for stock database operations.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    // =========================================================================
    // Hotels
    // =========================================================================

    /// Inserts a hotel.
    pub async fn insert_hotel(&self, hotel: &Hotel) -> DbResult<()> {
        debug!(slug = %hotel.slug, country = %hotel.country, "Inserting hotel");

        validate_slug(&hotel.slug)?;

        sqlx::query("INSERT INTO hotels (id, slug, name, country) VALUES (?1, ?2, ?3, ?4)")
            .bind(&hotel.id)
            .bind(&hotel.slug)
            .bind(&hotel.name)
            .bind(&hotel.country)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Lists hotels in a country, ordered by id for deterministic
    /// candidate ordering. Callers reorder as they see fit (e.g., by
    /// shipping-zone preference) before passing to `allocate`.
    pub async fn hotels_for_country(&self, country: &str) -> DbResult<Vec<Hotel>> {
        let hotels = sqlx::query_as::<_, Hotel>(
            "SELECT id, slug, name, country FROM hotels WHERE country = ?1 ORDER BY id",
        )
        .bind(country)
        .fetch_all(&self.pool)
        .await?;

        Ok(hotels)
    }

    // =========================================================================
    // Stocks
    // =========================================================================

    /// Inserts a stock record for a (hotel, variant) pair.
    pub async fn insert_stock(&self, stock: &Stock) -> DbResult<()> {
        debug!(
            hotel_id = %stock.hotel_id,
            variant_id = %stock.variant_id,
            quantity = stock.quantity,
            "Inserting stock"
        );

        sqlx::query(
            "INSERT INTO stocks (id, hotel_id, variant_id, quantity) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&stock.id)
        .bind(&stock.hotel_id)
        .bind(&stock.variant_id)
        .bind(stock.quantity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets the stock record for a (hotel, variant) pair.
    pub async fn get_stock(&self, hotel_id: &str, variant_id: &str) -> DbResult<Option<Stock>> {
        let stock = sqlx::query_as::<_, Stock>(
            r#"
            SELECT id, hotel_id, variant_id, quantity
            FROM stocks
            WHERE hotel_id = ?1 AND variant_id = ?2
            "#,
        )
        .bind(hotel_id)
        .bind(variant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stock)
    }

    /// Adjusts physical stock by a delta (restock positive, shrinkage
    /// negative).
    ///
    /// Delta updates compose under concurrency where absolute writes
    /// would race: `quantity = quantity + ?` never loses a concurrent
    /// adjustment.
    pub async fn adjust_quantity(&self, stock_id: &str, delta: i64) -> DbResult<()> {
        debug!(stock_id = %stock_id, delta = delta, "Adjusting stock quantity");

        let result = sqlx::query("UPDATE stocks SET quantity = quantity + ?2 WHERE id = ?1")
            .bind(stock_id)
            .bind(delta)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Stock", stock_id));
        }

        Ok(())
    }

    /// Available quantity of a stock record: physical count minus the sum
    /// of its allocations.
    pub async fn available_quantity(&self, stock_id: &str) -> DbResult<i64> {
        let available: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT s.quantity - COALESCE(
                (SELECT SUM(a.quantity_allocated) FROM allocations a WHERE a.stock_id = s.id),
                0
            )
            FROM stocks s
            WHERE s.id = ?1
            "#,
        )
        .bind(stock_id)
        .fetch_optional(&self.pool)
        .await?;

        available.ok_or_else(|| DbError::not_found("Stock", stock_id))
    }

    // =========================================================================
    // Order Lines
    // =========================================================================

    /// Inserts an order line.
    pub async fn insert_order_line(&self, line: &OrderLine) -> DbResult<()> {
        debug!(
            id = %line.id,
            variant_id = %line.variant_id,
            quantity = line.quantity,
            "Inserting order line"
        );

        validate_quantity(line.quantity)?;

        sqlx::query(
            r#"
            INSERT INTO order_lines (id, order_id, variant_id, quantity, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&line.id)
        .bind(&line.order_id)
        .bind(&line.variant_id)
        .bind(line.quantity)
        .bind(line.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an order line by ID.
    pub async fn get_order_line(&self, id: &str) -> DbResult<Option<OrderLine>> {
        let line = sqlx::query_as::<_, OrderLine>(
            "SELECT id, order_id, variant_id, quantity, created_at FROM order_lines WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(line)
    }

    // =========================================================================
    // Allocations (reads)
    // =========================================================================

    /// Gets all allocations for an order line, in allocation order.
    pub async fn allocations_for_line(&self, order_line_id: &str) -> DbResult<Vec<Allocation>> {
        let allocations = sqlx::query_as::<_, Allocation>(
            r#"
            SELECT id, order_line_id, stock_id, quantity_allocated, created_at
            FROM allocations
            WHERE order_line_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_line_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(allocations)
    }

    /// Total quantity allocated across a set of stock records.
    pub async fn total_allocated(&self, stock_ids: &[String]) -> DbResult<i64> {
        if stock_ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "SELECT COALESCE(SUM(quantity_allocated), 0) FROM allocations WHERE stock_id IN ({})",
            sql_placeholders(stock_ids.len())
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for id in stock_ids {
            query = query.bind(id);
        }

        Ok(query.fetch_one(&self.pool).await?)
    }

    /// Helper to create a new order line with a fresh UUID.
    pub fn new_order_line(order_id: &str, variant_id: &str, quantity: i64) -> OrderLine {
        OrderLine {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            variant_id: variant_id.to_string(),
            quantity,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_insert_hotel_rejects_malformed_slug() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.stocks();

        let hotel = Hotel {
            id: Uuid::new_v4().to_string(),
            slug: "Lisbon Grand".to_string(),
            name: "Lisbon Grand".to_string(),
            country: "PT".to_string(),
        };
        let err = repo.insert_hotel(&hotel).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)), "got {err:?}");
        assert!(repo.hotels_for_country("PT").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_order_line_rejects_non_positive_quantity() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.stocks();

        for quantity in [0, -3] {
            let line = StockRepository::new_order_line("order-1", "variant-1", quantity);
            let err = repo.insert_order_line(&line).await.unwrap_err();
            assert!(matches!(err, DbError::Validation(_)), "quantity {quantity}: {err:?}");
            assert!(repo.get_order_line(&line.id).await.unwrap().is_none());
        }
    }
}
