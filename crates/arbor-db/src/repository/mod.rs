//! # Repository Module
//!
//! Database repository implementations for Arbor Commerce.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Order Coordinator                                                     │
//! │       │                                                                 │
//! │       │  let mut tx = db.pool().begin().await?;                        │
//! │       │  catalog.resolve(&mut tx, ...).await?                          │
//! │       │  stock.sell(&mut tx, ...).await?                               │
//! │       │  tx.commit().await?;                                           │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Convention:                                                            │
//! │  • Methods the coordinator calls INSIDE the order transaction take     │
//! │    an explicit `&mut SqliteConnection`, so every read and write of     │
//! │    one order shares the same begin...commit window.                    │
//! │  • Management/seed/fetch-back helpers take no connection and use the   │
//! │    repository's pool directly.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Catalog items, variants, addons, resolution
//! - [`stock::StockLedger`] - Conditional stock mutations and aggregates
//! - [`coupon::CouponRepository`] - Coupon lookup and usage consumption
//! - [`tax::TaxRepository`] - Active tax set
//! - [`zone::ZoneRepository`] - Delivery zone charge table
//! - [`order::OrderRepository`] - Order header/item persistence
//! - [`outbox::NotificationOutboxRepository`] - Post-commit notification queue

pub mod catalog;
pub mod coupon;
pub mod order;
pub mod outbox;
pub mod stock;
pub mod tax;
pub mod zone;
