//! # roomline-db: Database Layer for Roomline
//!
//! This crate provides database access for the Roomline booking
//! platform. It uses SQLite for storage with sqlx for async operations,
//! and hosts the two engines that do read-then-write work against it:
//! price recalculation and stock allocation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Roomline Data Flow                                │
//! │                                                                         │
//! │  Catalog / promotion mutation          Booking request                 │
//! │       │                                     │                          │
//! │       ▼                                     ▼                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    roomline-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────────┐  ┌───────────────┐  ┌───────────────────┐   │   │
//! │  │  │   Database   │  │ Repositories  │  │      Engines      │   │   │
//! │  │  │  (pool.rs)   │  │ catalog.rs    │  │ PricingEngine     │   │   │
//! │  │  │              │  │ discount.rs   │  │ AllocationEngine  │   │   │
//! │  │  │ SqlitePool   │◄─│ stock.rs      │◄─│                   │   │   │
//! │  │  │ WAL + FKs    │  │ jobs.rs       │  │ RoomSnapshotLoader│   │   │
//! │  │  └──────────────┘  └───────────────┘  └───────────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Pure pricing math lives in roomline-core; this crate only feeds       │
//! │  it rows and persists what it computes.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (catalog, discount, stock, jobs)
//! - [`loader`] - Batch room snapshot loading
//! - [`pricing`] - Discounted-price cache recalculation
//! - [`allocation`] - Stock allocation against order lines
//!
//! ## Usage
//! ```rust,ignore
//! use roomline_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/roomline.db")).await?;
//!
//! // Repositories for plain CRUD
//! let channel = db.catalog().get_channel_by_slug("web").await?;
//!
//! // Engines for read-then-write workflows
//! db.pricing().recalculate_catalogue(&filter).await?;
//! db.allocation().allocate(&line_id, 2, &hotel_ids).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod error;
pub mod loader;
pub mod migrations;
pub mod pool;
pub mod pricing;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

pub use allocation::{AllocationEngine, AllocationError, AllocationOutcome, StockClaim};
pub use loader::{RoomSnapshot, RoomSnapshotLoader};
pub use pricing::PricingEngine;

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::discount::DiscountRepository;
pub use repository::jobs::JobQueueRepository;
pub use repository::stock::StockRepository;
