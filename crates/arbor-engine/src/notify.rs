//! # Notification Dispatch
//!
//! Best-effort confirmation delivery for committed orders.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Notification Semantics                                │
//! │                                                                         │
//! │  • The coordinator enqueues the order snapshot INSIDE the order        │
//! │    transaction (outbox pattern): the intent to notify commits or       │
//! │    rolls back with the order.                                          │
//! │                                                                         │
//! │  • Delivery happens strictly AFTER commit. A delivery failure is       │
//! │    logged and recorded on the outbox row; it never moves the order     │
//! │    back to Aborted and never fails the caller.                         │
//! │                                                                         │
//! │  • No retry contract beyond "log and continue": rows keep their       │
//! │    attempts/last_error for a later drain or manual reconciliation.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use arbor_core::{Order, OrderItem};
use arbor_db::{Database, NotificationOutboxEntry};

/// Maximum delivery attempts before a row is skipped by the drain.
const MAX_DISPATCH_ATTEMPTS: i64 = 10;

/// A committed order as handed to the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Delivery failure. Always recovered locally; never propagated to the
/// order submission caller.
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers order confirmations. Implementations wrap whatever transport
/// the deployment uses (email service, webhook, message bus).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Attempts to deliver a confirmation for one committed order.
    async fn notify(&self, snapshot: &OrderSnapshot) -> Result<(), NotifyError>;
}

/// Default dispatcher: logs the confirmation. Deployments without a
/// configured transport still get an observable record.
#[derive(Debug, Default, Clone)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn notify(&self, snapshot: &OrderSnapshot) -> Result<(), NotifyError> {
        info!(
            order_id = %snapshot.order.id,
            customer = %snapshot.order.customer_name,
            total_cents = snapshot.order.total_cents,
            "Order confirmation"
        );
        Ok(())
    }
}

/// Drains the notification outbox through a dispatcher.
///
/// The worker is deliberately dumb: fetch pending rows, attempt each once,
/// mark the outcome, swallow failures. Callers run it post-commit or on a
/// schedule.
pub struct NotificationWorker {
    db: Database,
    dispatcher: std::sync::Arc<dyn NotificationDispatcher>,
}

impl NotificationWorker {
    /// Creates a worker over the given database and dispatcher.
    pub fn new(db: Database, dispatcher: std::sync::Arc<dyn NotificationDispatcher>) -> Self {
        NotificationWorker { db, dispatcher }
    }

    /// Attempts every pending outbox entry once. Returns the number
    /// delivered. Never fails: every error is logged and recorded on the
    /// row.
    pub async fn drain(&self) -> usize {
        let pending = match self.db.outbox().pending(100).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Could not read notification outbox");
                return 0;
            }
        };

        let mut delivered = 0;
        for entry in pending {
            if entry.attempts >= MAX_DISPATCH_ATTEMPTS {
                debug!(id = %entry.id, attempts = entry.attempts, "Skipping exhausted outbox entry");
                continue;
            }

            match self.attempt(&entry).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(id = %entry.id, order_id = %entry.order_id, error = %e, "Notification attempt failed");
                    if let Err(mark_err) = self.db.outbox().mark_failed(&entry.id, &e.to_string()).await
                    {
                        warn!(id = %entry.id, error = %mark_err, "Could not record outbox failure");
                    }
                }
            }
        }

        delivered
    }

    async fn attempt(&self, entry: &NotificationOutboxEntry) -> Result<(), NotifyError> {
        let snapshot: OrderSnapshot = serde_json::from_str(&entry.payload)
            .map_err(|e| NotifyError(format!("snapshot parse: {e}")))?;

        self.dispatcher.notify(&snapshot).await?;

        self.db
            .outbox()
            .mark_dispatched(&entry.id)
            .await
            .map_err(|e| NotifyError(format!("outbox mark: {e}")))?;

        debug!(order_id = %snapshot.order.id, "Notification dispatched");
        Ok(())
    }
}
