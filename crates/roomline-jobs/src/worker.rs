//! # Job Worker
//!
//! Polls the `job_queue` table and runs each pending job through the
//! pricing engine.
//!
//! ## Worker Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Job Worker Flow                                  │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      job_queue Table                            │   │
//! │  │                                                                 │   │
//! │  │  id | kind                  | payload | attempts | completed_at │   │
//! │  │  ───┼───────────────────────┼─────────┼──────────┼──────────────│   │
//! │  │  1  │ recalculate_room      │ {...}   │ 0        │ NULL         │   │
//! │  │  2  │ recalculate_catalogue │ {...}   │ 1        │ NULL         │   │
//! │  │  3  │ recalculate_rule      │ {...}   │ 0        │ NULL         │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                        JobWorker                                │   │
//! │  │                                                                 │   │
//! │  │  1. Poll: pending rows, oldest first, up to batch_size         │   │
//! │  │  2. Skip: rows with attempts >= max_attempts (logged)          │   │
//! │  │  3. Run:  deserialize Job, run PricingEngine recompute         │   │
//! │  │  4. Mark: completed_at = NOW() only AFTER the work committed   │   │
//! │  │  5. Fail: attempts += 1, last_error recorded, row stays        │   │
//! │  │           pending for the next poll                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  A crash between step 3 and 4 replays the job on restart.             │
//! │  Recomputation is idempotent, so the replay converges.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::JobsConfig;
use crate::error::{JobError, JobResult};
use crate::queue::{check_known_kind, Job};
use roomline_core::JobQueueEntry;
use roomline_db::Database;

/// Handle for controlling a running worker.
#[derive(Clone)]
pub struct JobWorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl JobWorkerHandle {
    /// Triggers graceful shutdown. The worker finishes its current batch
    /// before stopping.
    pub async fn shutdown(&self) -> JobResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| JobError::ChannelClosed)
    }
}

/// The polling job worker.
pub struct JobWorker {
    db: Arc<Database>,
    config: JobsConfig,
    shutdown_rx: mpsc::Receiver<()>,
}

impl JobWorker {
    /// Creates a new worker and returns a handle.
    pub fn new(db: Arc<Database>, config: JobsConfig) -> (Self, JobWorkerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = JobWorker {
            db,
            config,
            shutdown_rx,
        };
        let handle = JobWorkerHandle { shutdown_tx };

        (worker, handle)
    }

    /// Spawns the worker loop as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs the worker loop.
    pub async fn run(mut self) {
        info!("Job worker starting");

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.process_batch().await {
                        error!(?e, "Failed to process job batch");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Job worker shutting down");
                    break;
                }
            }
        }

        info!("Job worker stopped");
    }

    /// Processes one batch of pending jobs.
    async fn process_batch(&mut self) -> JobResult<()> {
        let entries = self.db.jobs().get_pending(self.config.batch_size).await?;
        if entries.is_empty() {
            debug!("No pending jobs");
            return Ok(());
        }

        let (runnable, skipped): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| e.attempts < self.config.max_attempts);

        for entry in skipped {
            warn!(
                id = %entry.id,
                kind = %entry.kind,
                attempts = entry.attempts,
                last_error = entry.last_error.as_deref().unwrap_or("-"),
                "Skipping job that exceeded max attempts"
            );
        }

        for entry in runnable {
            match self.run_job(&entry).await {
                Ok(()) => {
                    self.db.jobs().mark_completed(&entry.id).await?;
                    debug!(id = %entry.id, kind = %entry.kind, "Job completed");
                }
                Err(e) => {
                    warn!(id = %entry.id, kind = %entry.kind, error = %e, "Job failed");
                    self.db.jobs().mark_failed(&entry.id, &e.to_string()).await?;
                }
            }
        }

        Ok(())
    }

    /// Executes one queue row. Completion is the caller's responsibility,
    /// so a crash mid-run leaves the row pending.
    async fn run_job(&self, entry: &JobQueueEntry) -> JobResult<()> {
        check_known_kind(&entry.kind)?;
        let job = Job::from_payload(&entry.payload)?;

        match &job {
            Job::RecalculateRule { rule_id } => {
                let Some(rule) = self.db.discounts().get_rule(rule_id).await? else {
                    // Deleted between enqueue and run; the deletion flow
                    // enqueues its own scope snapshot, nothing to do here.
                    warn!(rule_id = %rule_id, "Rule vanished before recalculation");
                    return Ok(());
                };
                self.db.pricing().recalculate_rule(&rule).await?;
            }
            _ => {
                // RecalculateRoom and RecalculateCatalogue carry their
                // scope inline.
                if let Some(filter) = job.filter() {
                    self.db.pricing().recalculate_catalogue(&filter).await?;
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::JobQueue;
    use chrono::{Duration as ChronoDuration, Utc};
    use roomline_core::{
        Channel, DiscountKind, PromotionRule, Room, RoomChannelListing, RoomVariant,
        VariantChannelListing,
    };
    use roomline_db::DbConfig;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;
    use uuid::Uuid;

    fn id() -> String {
        Uuid::new_v4().to_string()
    }

    async fn db() -> Arc<Database> {
        Arc::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    /// One channel, one room with a single 100.00 variant, plus the
    /// room's channel listing. Returns (channel_id, room_id).
    async fn seed(db: &Database) -> (String, String) {
        let catalog = db.catalog();
        let now = Utc::now();

        let channel = Channel {
            id: id(),
            slug: "web".to_string(),
            name: "Web".to_string(),
            currency: "USD".to_string(),
        };
        catalog.insert_channel(&channel).await.unwrap();

        let room = Room {
            id: id(),
            name: "Harbour King".to_string(),
            category_id: Some("city".to_string()),
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
                variant_id: variant.id,
                channel_id: channel.id.clone(),
                price_cents: 10000,
                cost_price_cents: None,
            })
            .await
            .unwrap();

        catalog
            .insert_room_listing(&RoomChannelListing {
                id: id(),
                room_id: room.id.clone(),
                channel_id: channel.id.clone(),
                discounted_price_cents: None,
                is_published: true,
                available_for_purchase: None,
            })
            .await
            .unwrap();

        (channel.id, room.id)
    }

    /// Polls until the queue drains or the deadline passes.
    async fn wait_for_drain(queue: &JobQueue) {
        for _ in 0..200 {
            if queue.pending().await.unwrap() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job queue did not drain");
    }

    #[tokio::test]
    async fn test_worker_recalculates_end_to_end() {
        let db = db().await;
        let (channel_id, room_id) = seed(&db).await;

        // 20% off the city category.
        let rule = PromotionRule {
            id: id(),
            name: "City Break".to_string(),
            kind: DiscountKind::Percentage,
            starts_at: Utc::now() - ChronoDuration::hours(1),
            ends_at: None,
            room_ids: HashSet::new(),
            category_ids: HashSet::from(["city".to_string()]),
            collection_ids: HashSet::new(),
            channel_values: HashMap::from([(channel_id.clone(), 2000)]),
        };
        db.discounts().insert_rule(&rule).await.unwrap();

        let queue = JobQueue::new(db.clone());
        queue
            .enqueue(&Job::RecalculateRule {
                rule_id: rule.id.clone(),
            })
            .await
            .unwrap();

        let (worker, handle) = JobWorker::new(db.clone(), JobsConfig::fast());
        let join = worker.spawn();

        wait_for_drain(&queue).await;
        handle.shutdown().await.unwrap();
        join.await.unwrap();

        let listing = db
            .catalog()
            .get_room_listing(&room_id, &channel_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.discounted_price_cents, Some(8000));
    }

    #[tokio::test]
    async fn test_worker_completes_job_for_vanished_rule() {
        let db = db().await;
        seed(&db).await;

        let queue = JobQueue::new(db.clone());
        queue
            .enqueue(&Job::RecalculateRule {
                rule_id: "never-existed".to_string(),
            })
            .await
            .unwrap();

        let (worker, handle) = JobWorker::new(db.clone(), JobsConfig::fast());
        let join = worker.spawn();

        // Completed, not retried forever.
        wait_for_drain(&queue).await;
        handle.shutdown().await.unwrap();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_payload_retries_then_parks() {
        let db = db().await;

        // Bypass JobQueue to plant a corrupt payload.
        db.jobs()
            .enqueue("recalculate_room", "{not json")
            .await
            .unwrap();

        let config = JobsConfig::fast();
        let max_attempts = config.max_attempts;
        let (mut worker, _handle) = JobWorker::new(db.clone(), config);

        // Drive batches directly instead of racing the poll loop.
        for _ in 0..max_attempts + 2 {
            worker.process_batch().await.unwrap();
        }

        // Still pending (never completed), parked at max attempts.
        let pending = db.jobs().get_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, max_attempts);
        assert!(pending[0].last_error.is_some());
    }

    #[tokio::test]
    async fn test_catalogue_job_recomputes_room() {
        let db = db().await;
        let (channel_id, room_id) = seed(&db).await;

        let queue = JobQueue::new(db.clone());
        queue
            .enqueue(&Job::RecalculateRoom {
                room_id: room_id.clone(),
            })
            .await
            .unwrap();

        let (mut worker, _handle) = JobWorker::new(db.clone(), JobsConfig::fast());
        worker.process_batch().await.unwrap();

        // No active rules: the cache settles on the base price.
        let listing = db
            .catalog()
            .get_room_listing(&room_id, &channel_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.discounted_price_cents, Some(10000));
    }
}
