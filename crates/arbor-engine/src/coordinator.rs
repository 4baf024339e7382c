//! # Order Transaction Coordinator
//!
//! Owns the atomic begin-to-commit lifecycle of one order.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Order Lifecycle (one transaction)                    │
//! │                                                                         │
//! │  submit_order(request)                                                 │
//! │       │                                                                 │
//! │       ▼ (request shape checks happen BEFORE the transaction)           │
//! │  BEGIN ─────────────────────────────────────────────────────┐          │
//! │       │                                                     │          │
//! │       ▼                                                     │          │
//! │  Validating ── resolve lines, availability, business rules  │          │
//! │       │                                                     │          │
//! │       ▼                                                     │          │
//! │  Pricing ───── pipeline once, on the validated snapshot     │          │
//! │       │                                                     │          │
//! │       ▼                                                     │          │
//! │  Persisting ── order header + items + captured addons       │          │
//! │       │                                                     │          │
//! │       ▼                                                     │          │
//! │  Mutating ──── conditional stock updates, material          │          │
//! │   Stock        consumption, coupon used_count, outbox row   │          │
//! │       │                                                     │          │
//! │       ▼                                                     │          │
//! │  COMMIT ──► Committed ──► notify (best-effort) + audit      │          │
//! │                                                             │          │
//! │  Any error anywhere above ──► Aborted: the transaction ─────┘          │
//! │  rolls back and every write vanishes as a unit. Partial stock          │
//! │  decrements or partially-inserted items are never observable.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! The coordinator runs its states sequentially for one order, but many
//! orders run concurrently against the same catalog rows. Stock and coupon
//! counters are therefore only ever changed through single conditional
//! UPDATE statements (see the stock ledger); the availability numbers read
//! during Validating are advisory, the conditional mutation is the
//! authority.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use arbor_core::validation::{
    validate_coupon_code, validate_customer_name, validate_order_lines, validate_quantity,
};
use arbor_core::{
    coupon_discount, price_order, validate_coupon as check_coupon_gates, Addon, CouponRejection,
    ItemKind, Money, Order, OrderItem, OrderItemAddon, OrderSource, OrderStatus, PricingLine,
};
use arbor_db::{Database, DbError, ResolvedLine, StockMutation};

use crate::audit::{AuditLog, TracingAuditLog};
use crate::error::{EngineError, EngineResult};
use crate::ids::{IdGenerator, UuidGenerator};
use crate::notify::{LoggingDispatcher, NotificationDispatcher, NotificationWorker, OrderSnapshot};
use crate::request::{OrderLineRequest, OrderReceipt, OrderRequest};

/// One line after Validating: the resolved snapshot, the quantity, and the
/// addon rules selected for it. Prices live in `resolved` and are never
/// re-read after this point.
struct ValidatedLine {
    resolved: ResolvedLine,
    quantity: i64,
    addons: Vec<Addon>,
}

/// The order transaction coordinator.
///
/// One instance serves all three flows (POS, e-commerce, goods received);
/// the request's `source` supplies the flow-specific behavior.
pub struct OrderCoordinator {
    db: Database,
    ids: Arc<dyn IdGenerator>,
    audit: Arc<dyn AuditLog>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl OrderCoordinator {
    /// Creates a coordinator with the default collaborators: UUID ids,
    /// tracing audit sink, logging dispatcher.
    pub fn new(db: Database) -> Self {
        OrderCoordinator {
            db,
            ids: Arc::new(UuidGenerator),
            audit: Arc::new(TracingAuditLog),
            dispatcher: Arc::new(LoggingDispatcher),
        }
    }

    /// Replaces the id generation capability.
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replaces the audit sink.
    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the notification dispatcher.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    // =========================================================================
    // Order Submission
    // =========================================================================

    /// Submits one order: the whole five-state lifecycle inside a single
    /// transaction.
    ///
    /// On success the order is durable, stock and coupon counters moved
    /// with it, and a confirmation was handed to the dispatcher
    /// (best-effort). On any failure every write is rolled back and no
    /// order id is returned.
    pub async fn submit_order(&self, request: OrderRequest) -> EngineResult<OrderReceipt> {
        // Request shape checks reject before any transaction starts
        validate_customer_name(&request.customer.name)?;
        validate_order_lines(request.items.len())?;
        for line in &request.items {
            validate_quantity(line.quantity)?;
        }
        let coupon_code = match &request.coupon_code {
            Some(code) => Some(validate_coupon_code(code)?),
            None => None,
        };

        let mut tx = self.db.pool().begin().await?;

        // ---- Validating ----------------------------------------------------
        let validated = self.validate_lines(&mut tx, &request).await?;

        // ---- Pricing -------------------------------------------------------
        // Goods received records cost only: no taxes, coupon, or delivery.
        let selling = request.source.decrements_stock();

        let taxes = if selling {
            self.db.taxes().active(&mut tx).await?
        } else {
            Vec::new()
        };

        let coupon = match (&coupon_code, selling) {
            (Some(code), true) => self.db.coupons().find_by_code(&mut tx, code).await?,
            _ => None,
        };

        let delivery_charge = match (&request.delivery_zone_id, selling) {
            (Some(zone_id), true) => {
                let charge = self
                    .db
                    .zones()
                    .charge_for(&mut tx, zone_id)
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("Delivery zone {zone_id}")))?;
                Money::from_cents(charge)
            }
            _ => Money::zero(),
        };

        let now = Utc::now();
        let pricing_lines: Vec<PricingLine> = validated
            .iter()
            .map(|v| PricingLine {
                label: v.resolved.label(),
                category: v.resolved.category.clone(),
                unit_price: Money::from_cents(v.resolved.unit_price_cents),
                quantity: v.quantity,
                addon_unit_price: v
                    .addons
                    .iter()
                    .fold(Money::zero(), |acc, a| acc + a.sale_price()),
            })
            .collect();

        // An unknown coupon or one failing a gate is silently dropped on
        // this path (discount 0); the explicit validate operation rejects.
        // Applied means: it will be consumed on commit, exactly once.
        let subtotal = pricing_lines
            .iter()
            .fold(Money::zero(), |acc, l| acc + l.line_total() + l.addon_total());
        let applied_coupon = coupon
            .as_ref()
            .filter(|c| check_coupon_gates(c, subtotal, now).is_ok());

        let breakdown = price_order(&pricing_lines, &taxes, coupon.as_ref(), delivery_charge, now);
        debug_assert!(breakdown.reconstructs());

        debug!(
            subtotal = breakdown.subtotal.cents(),
            total = breakdown.total.cents(),
            "Order priced"
        );

        // ---- Persisting ----------------------------------------------------
        let order_id = self.ids.generate();
        let status = match request.source {
            OrderSource::Ecommerce => OrderStatus::Pending,
            OrderSource::Pos | OrderSource::PurchaseReceipt => OrderStatus::Completed,
        };

        let order = Order {
            id: order_id.clone(),
            source: request.source,
            status,
            customer_name: request.customer.name.clone(),
            customer_phone: request.customer.phone.clone(),
            customer_email: request.customer.email.clone(),
            payment_method: request.payment_method,
            applied_coupon_code: applied_coupon.map(|c| c.code.clone()),
            delivery_zone_id: request.delivery_zone_id.clone(),
            subtotal_cents: breakdown.subtotal.cents(),
            category_tax_cents: breakdown.category_tax_total.cents(),
            full_bill_tax_cents: breakdown.full_bill_tax_total.cents(),
            discount_cents: breakdown.discount.cents(),
            delivery_charge_cents: breakdown.delivery_charge.cents(),
            total_cents: breakdown.total.cents(),
            created_at: now,
            updated_at: now,
        };

        self.db.orders().insert_order(&mut tx, &order).await?;

        let mut order_items = Vec::with_capacity(validated.len());
        for v in &validated {
            let item = OrderItem {
                id: self.ids.generate(),
                order_id: order_id.clone(),
                item_id: v.resolved.item_id.clone(),
                kind: v.resolved.kind,
                name_snapshot: v.resolved.name.clone(),
                color_snapshot: v.resolved.color_name.clone(),
                size_snapshot: v.resolved.size_name.clone(),
                unit_price_cents: v.resolved.unit_price_cents,
                quantity: v.quantity,
                line_total_cents: v.resolved.unit_price_cents * v.quantity,
                created_at: now,
            };
            self.db.orders().insert_item(&mut tx, &item).await?;

            for addon in &v.addons {
                let captured = OrderItemAddon {
                    id: self.ids.generate(),
                    order_item_id: item.id.clone(),
                    material_id: addon.material_id.clone(),
                    name_snapshot: addon.material_name.clone(),
                    quantity_per_unit: addon.quantity_per_unit,
                    sale_price_cents: addon.sale_price_cents,
                    line_total_cents: addon.sale_price_cents * v.quantity,
                };
                self.db.orders().insert_item_addon(&mut tx, &captured).await?;
            }

            order_items.push(item);
        }

        // ---- Mutating Stock ------------------------------------------------
        for v in &validated {
            if selling {
                match self
                    .db
                    .stock()
                    .sell(&mut tx, &v.resolved.locator, v.quantity, &order_id)
                    .await?
                {
                    StockMutation::Applied { .. } => {}
                    StockMutation::Insufficient { available } => {
                        // The conditional update is the authority; a race
                        // since Validating lands here and aborts the order.
                        return Err(EngineError::InsufficientStock {
                            item: v.resolved.label(),
                            available,
                            requested: v.quantity,
                        });
                    }
                }

                for addon in &v.addons {
                    self.db
                        .stock()
                        .consume_material(
                            &mut tx,
                            &addon.material_id,
                            addon.quantity_per_unit * v.quantity,
                            &order_id,
                        )
                        .await?;
                }
            } else {
                self.db
                    .stock()
                    .receive(&mut tx, &v.resolved.locator, v.quantity, &order_id)
                    .await?;
            }
        }

        if let Some(coupon) = applied_coupon {
            let consumed = self.db.coupons().consume(&mut tx, &coupon.id).await?;
            if !consumed {
                // Lost the last use since pricing: abort rather than
                // commit an uncounted discount.
                return Err(EngineError::CouponRejected(CouponRejection::UsageExhausted));
            }
        }

        // Notification intent commits with the order (outbox pattern)
        let snapshot = OrderSnapshot {
            order: order.clone(),
            items: order_items,
        };
        let payload = serde_json::to_string(&snapshot)
            .map_err(|e| EngineError::Transaction(DbError::Internal(format!("snapshot: {e}"))))?;
        self.db.outbox().enqueue(&mut tx, &order_id, &payload).await?;

        // ---- Committed -----------------------------------------------------
        tx.commit().await?;

        info!(
            order_id = %order_id,
            source = ?request.source,
            total_cents = breakdown.total.cents(),
            "Order committed"
        );
        self.audit.record(
            "order_committed",
            "orders",
            &format!("order {} total {}", order_id, breakdown.total),
        );

        // Best-effort delivery; failures are logged and never un-commit
        let worker = NotificationWorker::new(self.db.clone(), self.dispatcher.clone());
        worker.drain().await;

        Ok(OrderReceipt::new(order_id, status, &breakdown))
    }

    // =========================================================================
    // Coupon Validation (explicit-reject path)
    // =========================================================================

    /// Validates a coupon against a subtotal and returns the discount it
    /// would grant, in cents.
    ///
    /// Unlike checkout, which silently drops an inapplicable coupon, this
    /// operation rejects with the precise reason. Both behaviors are
    /// intentional.
    pub async fn validate_coupon(&self, code: &str, subtotal_cents: i64) -> EngineResult<i64> {
        let normalized = validate_coupon_code(code)?;

        let mut conn = self.db.pool().acquire().await?;
        let coupon = self
            .db
            .coupons()
            .find_by_code(&mut conn, &normalized)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Coupon {normalized}")))?;

        let discount = coupon_discount(&coupon, Money::from_cents(subtotal_cents), Utc::now())?;

        Ok(discount.cents())
    }

    // =========================================================================
    // Validating
    // =========================================================================

    /// Resolves and checks every requested line against the catalog.
    async fn validate_lines(
        &self,
        conn: &mut SqliteConnection,
        request: &OrderRequest,
    ) -> EngineResult<Vec<ValidatedLine>> {
        let mut validated = Vec::with_capacity(request.items.len());

        for line in &request.items {
            // Materials have no variant hierarchy
            if line.kind == ItemKind::Material && (line.color_id.is_some() || line.size.is_some()) {
                let field = if line.color_id.is_some() { "color_id" } else { "size" };
                return Err(EngineError::InvalidItem {
                    item: line.item_id.clone(),
                    field: field.to_string(),
                    reason: "materials do not carry variant selections".to_string(),
                });
            }

            // Variant coordinates come as a pair
            if line.color_id.is_some() != line.size.is_some() {
                return Err(EngineError::InvalidItem {
                    item: line.item_id.clone(),
                    field: "size".to_string(),
                    reason: "color and size must be given together".to_string(),
                });
            }

            let resolved = self
                .db
                .catalog()
                .resolve(
                    &mut *conn,
                    line.kind,
                    &line.item_id,
                    line.color_id.as_deref(),
                    line.size.as_deref(),
                )
                .await?
                .ok_or_else(|| EngineError::NotFound(describe_line(line)))?;

            // Availability gate; the conditional decrement re-checks on write
            if request.source.decrements_stock() && line.quantity > resolved.available_stock {
                return Err(EngineError::InsufficientStock {
                    item: resolved.label(),
                    available: resolved.available_stock,
                    requested: line.quantity,
                });
            }

            // Addon selections must reference rules attached to this product
            let mut addons = Vec::with_capacity(line.addons.len());
            for addon_id in &line.addons {
                let rule = resolved
                    .addons
                    .iter()
                    .find(|a| &a.id == addon_id)
                    .cloned()
                    .ok_or_else(|| EngineError::InvalidItem {
                        item: resolved.label(),
                        field: "addons".to_string(),
                        reason: format!("addon {addon_id} is not attached to this product"),
                    })?;
                addons.push(rule);
            }

            validated.push(ValidatedLine {
                resolved,
                quantity: line.quantity,
                addons,
            });
        }

        Ok(validated)
    }
}

/// Human-readable description of an unresolvable request line.
fn describe_line(line: &OrderLineRequest) -> String {
    match (&line.color_id, &line.size) {
        (Some(color), Some(size)) => {
            format!("Item {} (color {}, size {})", line.item_id, color, size)
        }
        _ => format!("Item {}", line.item_id),
    }
}
