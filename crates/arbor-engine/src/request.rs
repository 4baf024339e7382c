//! # Order Request & Response Contract
//!
//! The conceptual submission contract, independent of transport. POS,
//! e-commerce and goods-received callers build the same request shape with
//! a different `source`; the engine treats them uniformly.

use serde::{Deserialize, Serialize};

use arbor_core::{ItemKind, OrderSource, OrderStatus, PaymentMethod, PriceBreakdown};

/// Customer header fields. POS walk-ins may carry just a name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// One requested line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub kind: ItemKind,
    pub item_id: String,
    /// Variant color id; products with variants only.
    pub color_id: Option<String>,
    /// Size name within the color; products with variants only.
    pub size: Option<String>,
    pub quantity: i64,
    /// Ids of addon rules (attached to the product) to apply to this line.
    #[serde(default)]
    pub addons: Vec<String>,
}

/// A full order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub source: OrderSource,
    pub customer: CustomerInfo,
    pub items: Vec<OrderLineRequest>,
    pub delivery_zone_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
}

/// The success response: the committed order id plus the persisted
/// breakdown. No partial order id is ever returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub category_tax_cents: i64,
    pub full_bill_tax_cents: i64,
    pub discount_cents: i64,
    pub delivery_charge_cents: i64,
    pub total_cents: i64,
}

impl OrderReceipt {
    /// Builds a receipt from a committed order id and its breakdown.
    pub fn new(order_id: String, status: OrderStatus, breakdown: &PriceBreakdown) -> Self {
        OrderReceipt {
            order_id,
            status,
            subtotal_cents: breakdown.subtotal.cents(),
            category_tax_cents: breakdown.category_tax_total.cents(),
            full_bill_tax_cents: breakdown.full_bill_tax_total.cents(),
            discount_cents: breakdown.discount.cents(),
            delivery_charge_cents: breakdown.delivery_charge.cents(),
            total_cents: breakdown.total.cents(),
        }
    }
}
