//! # Stock Ledger
//!
//! Owns every stock counter mutation, at every granularity.
//!
//! ## The Read-Then-Write Race
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Mutation Strategy                              │
//! │                                                                         │
//! │  ❌ WRONG: read stock, check, write new value                          │
//! │     Order A reads 1, Order B reads 1, both write 0 → oversold          │
//! │                                                                         │
//! │  ✅ CORRECT: single conditional mutation                               │
//! │     UPDATE variant_sizes SET stock = stock - ?                         │
//! │     WHERE id = ? AND stock >= ?                                        │
//! │                                                                         │
//! │     rows_affected == 0 means the counter no longer covers the          │
//! │     request; the ledger reports Insufficient and the order aborts.     │
//! │     Two orders racing for the last unit: exactly one row update        │
//! │     wins, the other aborts, stock ends at 0 and never below.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Aggregate Invariant
//! After any size-level mutation the owning product's denormalized `stock`
//! is recomputed as the SUM of its variant sizes. The aggregate is never
//! an independently mutated counter.
//!
//! ## Movement Trail
//! Every mutation records a `stock_movements` row (requested vs applied)
//! in the same transaction, so floored material consumptions stay
//! observable for reconciliation.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use arbor_core::StockLocator;

/// Outcome of a conditional sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockMutation {
    /// The decrement applied; the counter now reads `new_stock`.
    Applied { new_stock: i64 },
    /// The counter did not cover the request; nothing changed.
    Insufficient { available: i64 },
}

/// Outcome of a floored raw-material consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialConsumption {
    /// Stock after the mutation.
    pub new_stock: i64,
    /// Units requested beyond what was available (0 when fully covered).
    pub shortfall: i64,
}

/// The stock ledger. All mutating methods take the order's transaction
/// connection; nothing here commits.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    // =========================================================================
    // Sales (conditional decrement)
    // =========================================================================

    /// Decrements a counter for a sale, if and only if it still covers the
    /// requested quantity. Recomputes the product aggregate for size-level
    /// mutations and records a movement row.
    pub async fn sell(
        &self,
        conn: &mut SqliteConnection,
        locator: &StockLocator,
        quantity: i64,
        order_id: &str,
    ) -> DbResult<StockMutation> {
        let new_stock = match locator {
            StockLocator::VariantSize { product_id, size_id } => {
                let result = sqlx::query(
                    r#"
                    UPDATE variant_sizes
                    SET stock = stock - ?1
                    WHERE id = ?2 AND stock >= ?1
                    "#,
                )
                .bind(quantity)
                .bind(size_id)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 0 {
                    let available = self.size_stock(&mut *conn, size_id).await?;
                    return Ok(StockMutation::Insufficient { available });
                }

                self.recompute_product_stock(&mut *conn, product_id).await?;
                self.size_stock(&mut *conn, size_id).await?
            }

            StockLocator::Product { product_id } => {
                let result = sqlx::query(
                    r#"
                    UPDATE catalog_items
                    SET stock = stock - ?1, updated_at = ?3
                    WHERE id = ?2 AND kind = 'product' AND stock >= ?1
                    "#,
                )
                .bind(quantity)
                .bind(product_id)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 0 {
                    let available = self.item_stock(&mut *conn, product_id).await?;
                    return Ok(StockMutation::Insufficient { available });
                }

                self.item_stock(&mut *conn, product_id).await?
            }

            StockLocator::Material { material_id } => {
                let result = sqlx::query(
                    r#"
                    UPDATE catalog_items
                    SET stock = stock - ?1, updated_at = ?3
                    WHERE id = ?2 AND kind = 'material' AND stock >= ?1
                    "#,
                )
                .bind(quantity)
                .bind(material_id)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 0 {
                    let available = self.item_stock(&mut *conn, material_id).await?;
                    return Ok(StockMutation::Insufficient { available });
                }

                self.item_stock(&mut *conn, material_id).await?
            }
        };

        debug!(?locator, quantity, new_stock, "Stock sold");

        self.record_movement(&mut *conn, locator, -quantity, -quantity, "sale", Some(order_id))
            .await?;

        Ok(StockMutation::Applied { new_stock })
    }

    // =========================================================================
    // Receiving (increment)
    // =========================================================================

    /// Increments a counter for goods received or a refund. Recomputes the
    /// product aggregate for size-level mutations and records a movement.
    pub async fn receive(
        &self,
        conn: &mut SqliteConnection,
        locator: &StockLocator,
        quantity: i64,
        order_id: &str,
    ) -> DbResult<i64> {
        let new_stock = match locator {
            StockLocator::VariantSize { product_id, size_id } => {
                let result = sqlx::query(
                    r#"
                    UPDATE variant_sizes SET stock = stock + ?1 WHERE id = ?2
                    "#,
                )
                .bind(quantity)
                .bind(size_id)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("VariantSize", size_id));
                }

                self.recompute_product_stock(&mut *conn, product_id).await?;
                self.size_stock(&mut *conn, size_id).await?
            }

            StockLocator::Product { product_id } => {
                self.increment_item(&mut *conn, product_id, quantity).await?
            }

            StockLocator::Material { material_id } => {
                self.increment_item(&mut *conn, material_id, quantity).await?
            }
        };

        debug!(?locator, quantity, new_stock, "Stock received");

        self.record_movement(&mut *conn, locator, quantity, quantity, "receive", Some(order_id))
            .await?;

        Ok(new_stock)
    }

    // =========================================================================
    // Addon material consumption (floored, observable)
    // =========================================================================

    /// Consumes raw material backing an addon: floors at zero rather than
    /// failing the order, but the shortfall is reported to the caller,
    /// logged, and recorded in the movement trail (requested vs applied).
    ///
    /// The prior read is stable here: the order transaction holds the
    /// SQLite write lock from its first mutation until commit.
    pub async fn consume_material(
        &self,
        conn: &mut SqliteConnection,
        material_id: &str,
        quantity: i64,
        order_id: &str,
    ) -> DbResult<MaterialConsumption> {
        let available: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT stock FROM catalog_items WHERE id = ?1 AND kind = 'material'
            "#,
        )
        .bind(material_id)
        .fetch_optional(&mut *conn)
        .await?;

        let available = available.ok_or_else(|| DbError::not_found("Material", material_id))?;

        let applied = quantity.min(available.max(0));
        let shortfall = quantity - applied;

        if applied > 0 {
            sqlx::query(
                r#"
                UPDATE catalog_items
                SET stock = stock - ?1, updated_at = ?3
                WHERE id = ?2 AND kind = 'material' AND stock >= ?1
                "#,
            )
            .bind(applied)
            .bind(material_id)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
        }

        if shortfall > 0 {
            warn!(
                material_id = %material_id,
                requested = quantity,
                applied,
                shortfall,
                "Material consumption floored at zero"
            );
        }

        let locator = StockLocator::Material {
            material_id: material_id.to_string(),
        };
        self.record_movement(
            &mut *conn,
            &locator,
            -quantity,
            -applied,
            "addon_consume",
            Some(order_id),
        )
        .await?;

        Ok(MaterialConsumption {
            new_stock: available - applied,
            shortfall,
        })
    }

    // =========================================================================
    // Aggregate recomputation
    // =========================================================================

    /// Recomputes a product's denormalized stock as the sum of its variant
    /// size stocks. Bottom-up: the aggregate is derived, never adjusted.
    pub async fn recompute_product_stock(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE catalog_items
            SET stock = (
                SELECT COALESCE(SUM(vs.stock), 0)
                FROM variant_sizes vs
                INNER JOIN variants v ON vs.variant_id = v.id
                WHERE v.product_id = catalog_items.id
            ), updated_at = ?2
            WHERE id = ?1 AND has_variants = 1
            "#,
        )
        .bind(product_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current stock behind a locator (pool read; diagnostics and tests).
    pub async fn stock_of(&self, locator: &StockLocator) -> DbResult<i64> {
        let stock = match locator {
            StockLocator::VariantSize { size_id, .. } => {
                sqlx::query_scalar::<_, i64>("SELECT stock FROM variant_sizes WHERE id = ?1")
                    .bind(size_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| DbError::not_found("VariantSize", size_id))?
            }
            StockLocator::Product { product_id } => {
                sqlx::query_scalar::<_, i64>("SELECT stock FROM catalog_items WHERE id = ?1")
                    .bind(product_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| DbError::not_found("CatalogItem", product_id))?
            }
            StockLocator::Material { material_id } => {
                sqlx::query_scalar::<_, i64>("SELECT stock FROM catalog_items WHERE id = ?1")
                    .bind(material_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| DbError::not_found("CatalogItem", material_id))?
            }
        };

        Ok(stock)
    }

    async fn size_stock(&self, conn: &mut SqliteConnection, size_id: &str) -> DbResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM variant_sizes WHERE id = ?1")
            .bind(size_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(stock.unwrap_or(0))
    }

    async fn item_stock(&self, conn: &mut SqliteConnection, item_id: &str) -> DbResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM catalog_items WHERE id = ?1")
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(stock.unwrap_or(0))
    }

    async fn increment_item(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
        quantity: i64,
    ) -> DbResult<i64> {
        let result = sqlx::query(
            r#"
            UPDATE catalog_items SET stock = stock + ?1, updated_at = ?3 WHERE id = ?2
            "#,
        )
        .bind(quantity)
        .bind(item_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CatalogItem", item_id));
        }

        self.item_stock(&mut *conn, item_id).await
    }

    // =========================================================================
    // Movement trail
    // =========================================================================

    async fn record_movement(
        &self,
        conn: &mut SqliteConnection,
        locator: &StockLocator,
        requested: i64,
        applied: i64,
        reason: &str,
        order_id: Option<&str>,
    ) -> DbResult<()> {
        let locator_json = serde_json::to_string(locator)
            .map_err(|e| DbError::Internal(format!("locator serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO stock_movements (id, locator, requested, applied, reason, order_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(locator_json)
        .bind(requested)
        .bind(applied)
        .bind(reason)
        .bind(order_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
