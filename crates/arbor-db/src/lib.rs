//! # arbor-db: Database Layer for Arbor Commerce
//!
//! This crate provides database access for the Arbor order fulfillment
//! engine. It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Arbor Data Flow                                  │
//! │                                                                         │
//! │  Order Coordinator (arbor-engine)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     arbor-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ catalog/stock │    │  (embedded)  │  │   │
//! │  │   │               │    │ coupon/order  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ tax/zone      │    │ 001_init.sql │  │   │
//! │  │   │ Transactions  │    │ outbox        │    │ 002_idx.sql  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                        SQLite Database                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use arbor_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/arbor.db")).await?;
//!
//! // Transactional composition: the coordinator owns begin/commit
//! let mut tx = db.pool().begin().await?;
//! let line = db.catalog().resolve(&mut tx, kind, id, None, None).await?;
//! db.stock().sell(&mut tx, &line.unwrap().locator, 2, "order-1").await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::{CatalogRepository, ResolvedLine};
pub use repository::coupon::CouponRepository;
pub use repository::order::OrderRepository;
pub use repository::outbox::{NotificationOutboxEntry, NotificationOutboxRepository};
pub use repository::stock::{MaterialConsumption, StockLedger, StockMutation};
pub use repository::tax::TaxRepository;
pub use repository::zone::ZoneRepository;
