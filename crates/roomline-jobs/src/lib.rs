//! # roomline-jobs: Background Jobs for Roomline
//!
//! Catalog and promotion mutations do not recompute discounted prices
//! inline. They enqueue a [`Job`] and a [`JobWorker`] picks it up,
//! runs the recompute through `roomline_db::PricingEngine`, and marks
//! the queue row completed only once the work has committed.
//!
//! ## Delivery Semantics
//! At-least-once: a crash after the recompute but before the completion
//! mark replays the job on the next poll. Every job body is an
//! idempotent recomputation, so replays converge on the same cached
//! values instead of corrupting them.
//!
//! ## Usage
//! ```rust,ignore
//! use roomline_jobs::{Job, JobQueue, JobWorker, JobsConfig};
//!
//! let queue = JobQueue::new(db.clone());
//! queue.enqueue(&Job::RecalculateRoom { room_id }).await?;
//!
//! let (worker, handle) = JobWorker::new(db, JobsConfig::default());
//! let join = worker.spawn();
//! // ...
//! handle.shutdown().await?;
//! join.await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod queue;
pub mod worker;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::JobsConfig;
pub use error::{JobError, JobResult};
pub use queue::{Job, JobQueue};
pub use worker::{JobWorker, JobWorkerHandle};
