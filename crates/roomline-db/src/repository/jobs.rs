//! # Job Queue Repository
//!
//! Manages the background job queue for price recalculation.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  CATALOG MUTATION (e.g., sale created, room moved to a collection)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Apply the catalog change                                           │
//! │  2. INSERT INTO job_queue (kind, payload)                              │
//! │     VALUES ('recalculate_catalogue', <filter JSON>)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  The triggering request returns immediately - it never blocks on       │
//! │  recomputation.                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            BACKGROUND WORKER (roomline-jobs)                    │   │
//! │  │                                                                 │   │
//! │  │  1. SELECT * FROM job_queue WHERE completed_at IS NULL         │   │
//! │  │  2. Run each job through the pricing engine                    │   │
//! │  │  3. On success: UPDATE job_queue SET completed_at = NOW()      │   │
//! │  │  4. On failure: UPDATE job_queue SET attempts += 1,            │   │
//! │  │                 last_error = ?                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • At-least-once: completion is recorded only after success           │
//! │  • Replays converge: recalculation is idempotent                      │
//! │  • Ordering between unrelated jobs does not matter                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use roomline_core::JobQueueEntry;

/// Repository for job queue operations.
#[derive(Debug, Clone)]
pub struct JobQueueRepository {
    pool: SqlitePool,
}

impl JobQueueRepository {
    /// Creates a new JobQueueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        JobQueueRepository { pool }
    }

    /// Enqueues a job.
    ///
    /// ## Arguments
    /// * `kind` - Job discriminator, e.g., "recalculate_room"
    /// * `payload` - JSON serialization of the job arguments
    pub async fn enqueue(&self, kind: &str, payload: &str) -> DbResult<JobQueueEntry> {
        let entry = JobQueueEntry {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            payload: payload.to_string(),
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            completed_at: None,
        };

        debug!(kind = %kind, id = %entry.id, "Enqueuing job");

        sqlx::query(
            r#"
            INSERT INTO job_queue (
                id, kind, payload, attempts, last_error,
                created_at, attempted_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.kind)
        .bind(&entry.payload)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets pending jobs (not yet completed), oldest first.
    ///
    /// ## Arguments
    /// * `limit` - Maximum entries to return
    pub async fn get_pending(&self, limit: u32) -> DbResult<Vec<JobQueueEntry>> {
        let entries = sqlx::query_as::<_, JobQueueEntry>(
            r#"
            SELECT id, kind, payload, attempts, last_error,
                   created_at, attempted_at, completed_at
            FROM job_queue
            WHERE completed_at IS NULL
            ORDER BY created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks a job as successfully completed.
    pub async fn mark_completed(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            "UPDATE job_queue SET completed_at = ?2, attempted_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a failed execution attempt.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE job_queue SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts pending jobs.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job_queue WHERE completed_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes old completed jobs (cleanup).
    ///
    /// ## Arguments
    /// * `days_old` - Delete jobs completed more than this many days ago
    ///
    /// ## Returns
    /// Number of deleted entries.
    pub async fn cleanup_completed(&self, days_old: u32) -> DbResult<u64> {
        // The cutoff is computed here and bound as a chrono value so the
        // comparison uses the same text encoding the writes use. SQLite's
        // datetime() renders a different format and would compare wrong.
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days_old));

        let result = sqlx::query(
            r#"
            DELETE FROM job_queue
            WHERE completed_at IS NOT NULL
            AND completed_at < ?1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
