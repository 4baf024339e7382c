//! # Order Repository
//!
//! Persistence for order headers, items and captured addon charges.
//!
//! ## Atomicity
//! The header and every item row are written on the coordinator's
//! transaction connection. A partially-inserted order is never observable:
//! either the whole order commits or none of it does.
//!
//! ## Snapshot Pattern
//! Item rows freeze name, color, size and unit price at time of sale, so
//! order history stays intact when the catalog changes later.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use arbor_core::{Order, OrderItem, OrderItemAddon, OrderStatus};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Writes (transactional)
    // =========================================================================

    /// Inserts an order header.
    pub async fn insert_order(&self, conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, source = ?order.source, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, source, status, customer_name, customer_phone, customer_email,
                payment_method, applied_coupon_code, delivery_zone_id,
                subtotal_cents, category_tax_cents, full_bill_tax_cents,
                discount_cents, delivery_charge_cents, total_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(&order.id)
        .bind(order.source)
        .bind(order.status)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.customer_email)
        .bind(order.payment_method)
        .bind(&order.applied_coupon_code)
        .bind(&order.delivery_zone_id)
        .bind(order.subtotal_cents)
        .bind(order.category_tax_cents)
        .bind(order.full_bill_tax_cents)
        .bind(order.discount_cents)
        .bind(order.delivery_charge_cents)
        .bind(order.total_cents)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts an order line item.
    pub async fn insert_item(&self, conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, item_id, kind, name_snapshot,
                color_snapshot, size_snapshot, unit_price_cents,
                quantity, line_total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.item_id)
        .bind(item.kind)
        .bind(&item.name_snapshot)
        .bind(&item.color_snapshot)
        .bind(&item.size_snapshot)
        .bind(item.unit_price_cents)
        .bind(item.quantity)
        .bind(item.line_total_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts a captured addon charge for an order item.
    pub async fn insert_item_addon(
        &self,
        conn: &mut SqliteConnection,
        addon: &OrderItemAddon,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_item_addons (
                id, order_item_id, material_id, name_snapshot,
                quantity_per_unit, sale_price_cents, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&addon.id)
        .bind(&addon.order_item_id)
        .bind(&addon.material_id)
        .bind(&addon.name_snapshot)
        .bind(addon.quantity_per_unit)
        .bind(addon.sale_price_cents)
        .bind(addon.line_total_cents)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Transitions an order's status. Status is the only mutable field
    /// after commit.
    pub async fn set_status(&self, order_id: &str, status: OrderStatus) -> DbResult<()> {
        let now = chrono::Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1
            "#,
        )
        .bind(order_id)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }

    // =========================================================================
    // Reads (pool-based)
    // =========================================================================

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, source, status, customer_name, customer_phone, customer_email,
                   payment_method, applied_coupon_code, delivery_zone_id,
                   subtotal_cents, category_tax_cents, full_bill_tax_cents,
                   discount_cents, delivery_charge_cents, total_cents,
                   created_at, updated_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets all items for an order, in insertion order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, item_id, kind, name_snapshot,
                   color_snapshot, size_snapshot, unit_price_cents,
                   quantity, line_total_cents, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets the captured addon charges for an order item.
    pub async fn get_item_addons(&self, order_item_id: &str) -> DbResult<Vec<OrderItemAddon>> {
        let addons = sqlx::query_as::<_, OrderItemAddon>(
            r#"
            SELECT id, order_item_id, material_id, name_snapshot,
                   quantity_per_unit, sale_price_cents, line_total_cents
            FROM order_item_addons
            WHERE order_item_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(addons)
    }

    /// Counts persisted orders (diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
