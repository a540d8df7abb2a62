//! # Stock Allocation Engine
//!
//! Reserves physical inventory against order lines. An allocation is a
//! claim: `stocks.quantity` never changes at allocation time, only the
//! sum of claims against it does, with availability always derived as
//! `quantity - sum(quantity_allocated)`.
//!
//! ## Serialization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every read-then-write sequence (compute availability, then insert     │
//! │  or increment allocation rows) runs inside ONE immediate              │
//! │  transaction. BEGIN IMMEDIATE takes the SQLite write lock up front,   │
//! │  so two concurrent allocate() calls serialize: the second observes    │
//! │  the first's claims and can never double-book the same unit.          │
//! │                                                                       │
//! │  allocate() walks candidate hotels IN CALLER ORDER and drains each    │
//! │  stock greedily. When the candidates run dry it COMMITS the partial   │
//! │  claims (they are real reservations) and reports the shortfall;      │
//! │  callers wanting all-or-nothing follow up with deallocate_all().     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbError;
use roomline_core::{Allocation, OrderLine};

/// Errors from the allocation engine.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The candidate hotels could not cover the requested quantity.
    ///
    /// The claims made before exhaustion are already committed; the
    /// shortfall is what remains unclaimed.
    #[error("insufficient stock for order line {order_line_id}: {unmet_quantity} unit(s) unmet")]
    InsufficientStock {
        order_line_id: String,
        unmet_quantity: i64,
    },

    /// The order line does not exist.
    #[error("order line not found: {0}")]
    OrderLineNotFound(String),

    /// Underlying database failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for AllocationError {
    fn from(err: sqlx::Error) -> Self {
        AllocationError::Db(DbError::from(err))
    }
}

/// One stock's share of a successful allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockClaim {
    pub stock_id: String,
    pub quantity: i64,
}

/// Result of a fully satisfied `allocate` call.
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub order_line_id: String,
    /// Units claimed by this call, in the order the stocks were drained.
    pub claims: Vec<StockClaim>,
}

impl AllocationOutcome {
    /// Total units claimed by this call.
    pub fn allocated(&self) -> i64 {
        self.claims.iter().map(|c| c.quantity).sum()
    }
}

/// Availability of one stock row, as seen inside the transaction.
#[derive(Debug, sqlx::FromRow)]
struct StockAvailability {
    id: String,
    quantity: i64,
    allocated: i64,
}

impl StockAvailability {
    fn available(&self) -> i64 {
        (self.quantity - self.allocated).max(0)
    }
}

/// The stock allocation engine.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    pool: SqlitePool,
}

impl AllocationEngine {
    /// Creates a new AllocationEngine on the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        AllocationEngine { pool }
    }

    /// Allocates `quantity` units for an order line from the given
    /// hotels, walking them in the order the caller passed them.
    ///
    /// The request is capped at what the line still needs
    /// (`order_line.quantity` minus its existing claims), so repeated
    /// calls can never over-allocate a line.
    ///
    /// ## Returns
    /// - `Ok(outcome)` when every requested unit was claimed.
    /// - `Err(InsufficientStock)` when the hotels ran dry first. The
    ///   partial claims are COMMITTED before returning.
    pub async fn allocate(
        &self,
        order_line_id: &str,
        quantity: i64,
        hotel_ids: &[String],
    ) -> Result<AllocationOutcome, AllocationError> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;

        // Take the write lock before reading availability.
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = self
            .allocate_locked(&mut conn, order_line_id, quantity, hotel_ids)
            .await;

        match result {
            Ok(outcome) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                debug!(
                    order_line_id,
                    allocated = outcome.allocated(),
                    stocks = outcome.claims.len(),
                    "Allocation committed"
                );
                Ok(outcome)
            }
            Err(AllocationError::InsufficientStock {
                order_line_id,
                unmet_quantity,
            }) => {
                // Partial claims stay valid reservations.
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                warn!(
                    order_line_id = %order_line_id,
                    unmet_quantity,
                    "Allocation exhausted candidate hotels"
                );
                Err(AllocationError::InsufficientStock {
                    order_line_id,
                    unmet_quantity,
                })
            }
            Err(err) => {
                rollback_quietly(&mut conn).await;
                Err(err)
            }
        }
    }

    async fn allocate_locked(
        &self,
        conn: &mut sqlx::SqliteConnection,
        order_line_id: &str,
        quantity: i64,
        hotel_ids: &[String],
    ) -> Result<AllocationOutcome, AllocationError> {
        let line = sqlx::query_as::<_, OrderLine>(
            "SELECT id, order_id, variant_id, quantity, created_at
             FROM order_lines WHERE id = ?",
        )
        .bind(order_line_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AllocationError::OrderLineNotFound(order_line_id.to_string()))?;

        let already_claimed: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity_allocated), 0)
             FROM allocations WHERE order_line_id = ?",
        )
        .bind(order_line_id)
        .fetch_one(&mut *conn)
        .await?;

        // Never let a line's claims exceed its quantity.
        let line_headroom = (line.quantity - already_claimed).max(0);
        let mut remaining = quantity.max(0).min(line_headroom);

        let mut claims = Vec::new();
        for hotel_id in hotel_ids {
            if remaining == 0 {
                break;
            }

            let stocks = sqlx::query_as::<_, StockAvailability>(
                "SELECT s.id, s.quantity,
                        COALESCE(SUM(a.quantity_allocated), 0) AS allocated
                 FROM stocks s
                 LEFT JOIN allocations a ON a.stock_id = s.id
                 WHERE s.hotel_id = ? AND s.variant_id = ?
                 GROUP BY s.id, s.quantity
                 ORDER BY s.id",
            )
            .bind(hotel_id)
            .bind(&line.variant_id)
            .fetch_all(&mut *conn)
            .await?;

            for stock in stocks {
                if remaining == 0 {
                    break;
                }
                let take = stock.available().min(remaining);
                if take == 0 {
                    continue;
                }

                sqlx::query(
                    "INSERT INTO allocations
                         (id, order_line_id, stock_id, quantity_allocated, created_at)
                     VALUES (?, ?, ?, ?, ?)
                     ON CONFLICT (order_line_id, stock_id)
                     DO UPDATE SET quantity_allocated = quantity_allocated + excluded.quantity_allocated",
                )
                .bind(Uuid::new_v4().to_string())
                .bind(order_line_id)
                .bind(&stock.id)
                .bind(take)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;

                claims.push(StockClaim {
                    stock_id: stock.id,
                    quantity: take,
                });
                remaining -= take;
            }
        }

        if remaining > 0 {
            return Err(AllocationError::InsufficientStock {
                order_line_id: order_line_id.to_string(),
                unmet_quantity: remaining,
            });
        }

        Ok(AllocationOutcome {
            order_line_id: order_line_id.to_string(),
            claims,
        })
    }

    /// Releases up to `quantity` units from an order line's claims,
    /// last-allocated-first. Rows that reach zero are deleted.
    ///
    /// Releasing more than is allocated releases everything and stops;
    /// it is not an error.
    ///
    /// ## Returns
    /// The number of units actually released.
    pub async fn deallocate(
        &self,
        order_line_id: &str,
        quantity: i64,
    ) -> Result<i64, AllocationError> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = self
            .deallocate_locked(&mut conn, order_line_id, quantity)
            .await;

        match result {
            Ok(released) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                debug!(order_line_id, released, "Deallocation committed");
                Ok(released)
            }
            Err(err) => {
                rollback_quietly(&mut conn).await;
                Err(err)
            }
        }
    }

    async fn deallocate_locked(
        &self,
        conn: &mut sqlx::SqliteConnection,
        order_line_id: &str,
        quantity: i64,
    ) -> Result<i64, AllocationError> {
        // rowid breaks ties between claims created in the same instant.
        let rows = sqlx::query_as::<_, Allocation>(
            "SELECT id, order_line_id, stock_id, quantity_allocated, created_at
             FROM allocations
             WHERE order_line_id = ?
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(order_line_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut remaining = quantity.max(0);
        let mut released: i64 = 0;

        for row in rows {
            if remaining == 0 {
                break;
            }
            let take = row.quantity_allocated.min(remaining);

            if take == row.quantity_allocated {
                sqlx::query("DELETE FROM allocations WHERE id = ?")
                    .bind(&row.id)
                    .execute(&mut *conn)
                    .await?;
            } else {
                sqlx::query(
                    "UPDATE allocations SET quantity_allocated = quantity_allocated - ?
                     WHERE id = ?",
                )
                .bind(take)
                .bind(&row.id)
                .execute(&mut *conn)
                .await?;
            }

            remaining -= take;
            released += take;
        }

        Ok(released)
    }

    /// Deletes every allocation for an order line, restoring the full
    /// claimed quantity to availability.
    ///
    /// ## Returns
    /// The number of units released.
    pub async fn deallocate_all(&self, order_line_id: &str) -> Result<i64, AllocationError> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let released: i64 = match sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity_allocated), 0)
             FROM allocations WHERE order_line_id = ?",
        )
        .bind(order_line_id)
        .fetch_one(&mut *conn)
        .await
        {
            Ok(total) => total,
            Err(err) => {
                rollback_quietly(&mut conn).await;
                return Err(err.into());
            }
        };

        if let Err(err) = sqlx::query("DELETE FROM allocations WHERE order_line_id = ?")
            .bind(order_line_id)
            .execute(&mut *conn)
            .await
        {
            rollback_quietly(&mut conn).await;
            return Err(err.into());
        }

        sqlx::query("COMMIT").execute(&mut *conn).await?;
        debug!(order_line_id, released, "All allocations released");
        Ok(released)
    }
}

/// Best-effort rollback for the error paths; the original error is what
/// the caller needs to see, not a secondary rollback failure.
async fn rollback_quietly(conn: &mut sqlx::SqliteConnection) {
    if let Err(err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        warn!(error = %err, "Rollback failed after aborted allocation transaction");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::stock::StockRepository;
    use roomline_core::{Hotel, Room, RoomVariant, Stock};
    use uuid::Uuid;

    fn id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Units currently claimed by an order line.
    async fn line_total(db: &Database, line_id: &str) -> i64 {
        db.stocks()
            .allocations_for_line(line_id)
            .await
            .unwrap()
            .iter()
            .map(|a| a.quantity_allocated)
            .sum()
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Seeds a variant plus one stock row per entry of `quantities`,
    /// each in its own hotel. Returns (variant_id, hotel_ids).
    async fn seed_stocks(db: &Database, quantities: &[i64]) -> (String, Vec<String>) {
        let catalog = db.catalog();
        let stocks = db.stocks();
        let now = chrono::Utc::now();

        let room = Room {
            id: id(),
            name: "Garden Twin".to_string(),
            category_id: None,
            created_at: now,
            updated_at: now,
        };
        catalog.insert_room(&room).await.unwrap();

        let variant = RoomVariant {
            id: id(),
            room_id: room.id,
            sku: format!("SKU-{}", id()),
            name: "Standard".to_string(),
        };
        catalog.insert_variant(&variant).await.unwrap();

        let mut hotel_ids = Vec::new();
        for (i, &quantity) in quantities.iter().enumerate() {
            let hotel = Hotel {
                id: id(),
                slug: format!("hotel-{}-{}", i, id()),
                name: format!("Hotel {i}"),
                country: "PT".to_string(),
            };
            stocks.insert_hotel(&hotel).await.unwrap();
            stocks
                .insert_stock(&Stock {
                    id: id(),
                    hotel_id: hotel.id.clone(),
                    variant_id: variant.id.clone(),
                    quantity,
                })
                .await
                .unwrap();
            hotel_ids.push(hotel.id);
        }

        (variant.id, hotel_ids)
    }

    async fn seed_line(db: &Database, variant_id: &str, quantity: i64) -> String {
        let line = StockRepository::new_order_line(&id(), variant_id, quantity);
        db.stocks().insert_order_line(&line).await.unwrap();
        line.id
    }

    #[tokio::test]
    async fn test_allocation_spans_hotels_in_caller_order() {
        let db = db().await;
        let (variant_id, hotels) = seed_stocks(&db, &[4, 3]).await;
        let line_id = seed_line(&db, &variant_id, 6).await;

        let outcome = db.allocation().allocate(&line_id, 6, &hotels).await.unwrap();
        assert_eq!(outcome.allocated(), 6);
        assert_eq!(outcome.claims.len(), 2);
        assert_eq!(outcome.claims[0].quantity, 4);
        assert_eq!(outcome.claims[1].quantity, 2);

        assert_eq!(line_total(&db, &line_id).await, 6);
    }

    #[tokio::test]
    async fn test_country_lookup_feeds_allocation_candidates() {
        let db = db().await;
        let (variant_id, hotels) = seed_stocks(&db, &[2, 5]).await;
        let line_id = seed_line(&db, &variant_id, 7).await;

        // Candidate hotels come from a country lookup rather than a
        // hand-built list.
        let candidates: Vec<String> = db
            .stocks()
            .hotels_for_country("PT")
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(candidates.len(), hotels.len());
        assert!(hotels.iter().all(|h| candidates.contains(h)));

        let outcome = db
            .allocation()
            .allocate(&line_id, 7, &candidates)
            .await
            .unwrap();
        assert_eq!(outcome.allocated(), 7);

        // Both stock rows drained in full, whichever order was walked.
        let mut stock_ids = Vec::new();
        for hotel_id in &hotels {
            let stock = db
                .stocks()
                .get_stock(hotel_id, &variant_id)
                .await
                .unwrap()
                .unwrap();
            stock_ids.push(stock.id);
        }
        assert_eq!(db.stocks().total_allocated(&stock_ids).await.unwrap(), 7);
        assert_eq!(db.stocks().total_allocated(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_commits_partial_claims() {
        let db = db().await;
        let (variant_id, hotels) = seed_stocks(&db, &[4, 3]).await;
        let line_id = seed_line(&db, &variant_id, 10).await;

        let err = db
            .allocation()
            .allocate(&line_id, 10, &hotels)
            .await
            .unwrap_err();
        match err {
            AllocationError::InsufficientStock {
                order_line_id,
                unmet_quantity,
            } => {
                assert_eq!(order_line_id, line_id);
                assert_eq!(unmet_quantity, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The 7 claimable units are reserved despite the error.
        assert_eq!(line_total(&db, &line_id).await, 7);
    }

    #[tokio::test]
    async fn test_conservation_under_allocate_deallocate() {
        let db = db().await;
        let (variant_id, hotels) = seed_stocks(&db, &[5]).await;
        let line_id = seed_line(&db, &variant_id, 5).await;
        let stocks = db.stocks();
        let engine = db.allocation();

        let stock = stocks.get_stock(&hotels[0], &variant_id).await.unwrap().unwrap();
        assert_eq!(stocks.available_quantity(&stock.id).await.unwrap(), 5);

        engine.allocate(&line_id, 3, &hotels).await.unwrap();
        assert_eq!(stocks.available_quantity(&stock.id).await.unwrap(), 2);

        let released = engine.deallocate(&line_id, 2).await.unwrap();
        assert_eq!(released, 2);
        assert_eq!(stocks.available_quantity(&stock.id).await.unwrap(), 4);

        engine.allocate(&line_id, 1, &hotels).await.unwrap();
        assert_eq!(stocks.available_quantity(&stock.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_line_quantity_caps_repeated_allocation() {
        let db = db().await;
        let (variant_id, hotels) = seed_stocks(&db, &[10]).await;
        let line_id = seed_line(&db, &variant_id, 4).await;
        let engine = db.allocation();

        engine.allocate(&line_id, 4, &hotels).await.unwrap();
        // A second call finds no headroom on the line and claims nothing.
        let outcome = engine.allocate(&line_id, 4, &hotels).await.unwrap();
        assert_eq!(outcome.allocated(), 0);

        assert_eq!(line_total(&db, &line_id).await, 4);
    }

    #[tokio::test]
    async fn test_deallocate_releases_last_allocated_first() {
        let db = db().await;
        let (variant_id, hotels) = seed_stocks(&db, &[4, 3]).await;
        let line_id = seed_line(&db, &variant_id, 6).await;
        let engine = db.allocation();

        engine.allocate(&line_id, 6, &hotels).await.unwrap();

        // Releasing 2 undoes the second hotel's claim entirely.
        let released = engine.deallocate(&line_id, 2).await.unwrap();
        assert_eq!(released, 2);

        let rows = db.stocks().allocations_for_line(&line_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity_allocated, 4);
    }

    #[tokio::test]
    async fn test_over_deallocation_releases_everything() {
        let db = db().await;
        let (variant_id, hotels) = seed_stocks(&db, &[4]).await;
        let line_id = seed_line(&db, &variant_id, 3).await;
        let engine = db.allocation();

        engine.allocate(&line_id, 3, &hotels).await.unwrap();
        let released = engine.deallocate(&line_id, 999).await.unwrap();
        assert_eq!(released, 3);
        assert!(db.stocks().allocations_for_line(&line_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deallocate_all_restores_availability() {
        let db = db().await;
        let (variant_id, hotels) = seed_stocks(&db, &[4, 3]).await;
        let line_id = seed_line(&db, &variant_id, 7).await;
        let engine = db.allocation();
        let stocks = db.stocks();

        engine.allocate(&line_id, 7, &hotels).await.unwrap();

        let released = engine.deallocate_all(&line_id).await.unwrap();
        assert_eq!(released, 7);
        assert!(stocks.allocations_for_line(&line_id).await.unwrap().is_empty());

        for hotel_id in &hotels {
            let stock = stocks.get_stock(hotel_id, &variant_id).await.unwrap().unwrap();
            let available = stocks.available_quantity(&stock.id).await.unwrap();
            assert_eq!(available, stock.quantity);
        }
    }

    #[tokio::test]
    async fn test_allocate_unknown_line_errors() {
        let db = db().await;
        let (_, hotels) = seed_stocks(&db, &[4]).await;

        let err = db
            .allocation()
            .allocate("no-such-line", 1, &hotels)
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::OrderLineNotFound(_)));
    }

    #[tokio::test]
    async fn test_two_lines_cannot_double_book() {
        let db = db().await;
        let (variant_id, hotels) = seed_stocks(&db, &[5]).await;
        let line_a = seed_line(&db, &variant_id, 3).await;
        let line_b = seed_line(&db, &variant_id, 3).await;
        let engine = db.allocation();

        engine.allocate(&line_a, 3, &hotels).await.unwrap();

        // Only 2 units left: the second line falls short by 1.
        let err = engine.allocate(&line_b, 3, &hotels).await.unwrap_err();
        match err {
            AllocationError::InsufficientStock { unmet_quantity, .. } => {
                assert_eq!(unmet_quantity, 1)
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let total = line_total(&db, &line_a).await + line_total(&db, &line_b).await;
        assert_eq!(total, 5);
    }
}
