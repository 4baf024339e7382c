//! # arbor-engine: Order Transaction Coordinator
//!
//! The orchestration layer of Arbor Commerce: one coordinator serves the
//! point-of-sale, e-commerce and goods-received flows, running each order
//! as a single all-or-nothing transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Arbor Engine Data Flow                             │
//! │                                                                         │
//! │  POS / E-commerce / Goods-received caller                              │
//! │       │  OrderRequest { source, customer, items, coupon, zone }        │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  OrderCoordinator (THIS CRATE)                  │   │
//! │  │                                                                 │   │
//! │  │  Validating → Pricing → Persisting → Mutating Stock            │   │
//! │  │       └──────────── one transaction ────────────┘              │   │
//! │  │                          │                                      │   │
//! │  │                   COMMIT │ ROLLBACK on any failure             │   │
//! │  │                          ▼                                      │   │
//! │  │  Committed ──► NotificationWorker (best-effort) + AuditLog     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  OrderReceipt { order_id, status, persisted breakdown }                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`coordinator`] - The order lifecycle state machine
//! - [`request`] - Submission contract (request/response DTOs)
//! - [`error`] - The caller-facing error taxonomy
//! - [`ids`] - Injectable identifier generation
//! - [`notify`] - Notification dispatch (outbox-backed, best-effort)
//! - [`audit`] - Fire-and-forget audit trail interface

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod coordinator;
pub mod error;
pub mod ids;
pub mod notify;
pub mod request;

// =============================================================================
// Re-exports
// =============================================================================

pub use audit::{AuditLog, TracingAuditLog};
pub use coordinator::OrderCoordinator;
pub use error::{EngineError, EngineResult};
pub use ids::{IdGenerator, SequenceGenerator, UuidGenerator};
pub use notify::{
    LoggingDispatcher, NotificationDispatcher, NotificationWorker, NotifyError, OrderSnapshot,
};
pub use request::{CustomerInfo, OrderLineRequest, OrderReceipt, OrderRequest};
