//! # Notification Outbox Repository
//!
//! Manages the notification outbox queue.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  ORDER SUBMISSION (coordinator)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. INSERT INTO orders / order_items ...                       │   │
//! │  │  2. UPDATE stock counters ...                                  │   │
//! │  │  3. INSERT INTO notification_outbox (order_id, payload)        │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Order and its notification intent succeed or fail together  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            DISPATCHER (post-commit, best-effort)                │   │
//! │  │                                                                 │   │
//! │  │  1. SELECT pending rows (dispatched_at IS NULL)                │   │
//! │  │  2. notify(payload)                                            │   │
//! │  │     On success: mark_dispatched                                │   │
//! │  │     On failure: mark_failed (attempts += 1, last_error)        │   │
//! │  │                                                                 │   │
//! │  │  Dispatcher failures are logged and never touch the order.    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// An entry in the notification outbox queue.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationOutboxEntry {
    pub id: String,
    pub order_id: String,
    /// The full order snapshot as JSON.
    pub payload: String,
    /// Number of dispatch attempts.
    pub attempts: i64,
    /// Last error message if dispatch failed.
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

/// Repository for notification outbox operations.
#[derive(Debug, Clone)]
pub struct NotificationOutboxRepository {
    pool: SqlitePool,
}

impl NotificationOutboxRepository {
    /// Creates a new NotificationOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationOutboxRepository { pool }
    }

    /// Enqueues an order snapshot on the order's transaction connection,
    /// so the intent to notify commits atomically with the order itself.
    pub async fn enqueue(
        &self,
        conn: &mut SqliteConnection,
        order_id: &str,
        payload: &str,
    ) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(order_id = %order_id, "Queuing notification");

        sqlx::query(
            r#"
            INSERT INTO notification_outbox (
                id, order_id, payload, attempts, last_error,
                created_at, attempted_at, dispatched_at
            ) VALUES (?1, ?2, ?3, 0, NULL, ?4, NULL, NULL)
            "#,
        )
        .bind(&id)
        .bind(order_id)
        .bind(payload)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(id)
    }

    /// Lists pending entries, oldest first.
    pub async fn pending(&self, limit: i64) -> DbResult<Vec<NotificationOutboxEntry>> {
        let entries = sqlx::query_as::<_, NotificationOutboxEntry>(
            r#"
            SELECT id, order_id, payload, attempts, last_error,
                   created_at, attempted_at, dispatched_at
            FROM notification_outbox
            WHERE dispatched_at IS NULL
            ORDER BY created_at
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks an entry as successfully dispatched.
    pub async fn mark_dispatched(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE notification_outbox
            SET dispatched_at = ?2, attempted_at = ?2, attempts = attempts + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("NotificationOutboxEntry", id));
        }

        Ok(())
    }

    /// Records a failed dispatch attempt.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE notification_outbox
            SET attempts = attempts + 1, last_error = ?2, attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("NotificationOutboxEntry", id));
        }

        Ok(())
    }
}
