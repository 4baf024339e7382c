//! # Domain Types
//!
//! Core domain types used throughout Arbor Commerce.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogItem    │   │     Order       │   │     Coupon      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  code (unique)  │       │
//! │  │  kind           │   │  source         │   │  discount_type  │       │
//! │  │  category       │   │  status         │   │  used_count     │       │
//! │  │  stock          │   │  total_cents    │   │  usage_limit    │       │
//! │  └───────┬─────────┘   └─────────────────┘   └─────────────────┘       │
//! │          │                                                              │
//! │          │ products may carry variants                                  │
//! │          ▼                                                              │
//! │  ┌─────────────────┐       ┌─────────────────┐                         │
//! │  │    Variant      │       │  VariantSize    │                         │
//! │  │  (color level)  │──────►│  (size level)   │                         │
//! │  │                 │       │  stock counter  │                         │
//! │  └─────────────────┘       └─────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Invariant
//! A product with variants keeps a denormalized `stock` that always equals
//! the sum of its variant size stocks. A product without variants owns its
//! counter directly. The ledger recomputes the aggregate bottom-up after
//! every size-level mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Money, TaxRate};

// =============================================================================
// Item Kind
// =============================================================================

/// What kind of catalog entry a line refers to.
///
/// Products are finished goods (may carry color/size variants).
/// Materials are raw stock consumed by addons and sold by unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Product,
    Material,
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A catalog entry: finished product or raw material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CatalogItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Product or material.
    pub kind: ItemKind,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Category name (matched against category-type taxes).
    pub category: String,

    /// Selling unit ("piece", "meter", "kg").
    pub unit: String,

    /// Price in cents per unit.
    pub unit_price_cents: i64,

    /// Current stock. For a product with variants this is the denormalized
    /// sum of all variant size stocks; otherwise it is authoritative.
    pub stock: i64,

    /// Whether the product carries color/size variants.
    pub has_variants: bool,

    /// Whether the item is active (soft delete).
    pub is_active: bool,

    /// When the item was created.
    pub created_at: DateTime<Utc>,

    /// When the item was last updated.
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

/// A color-level variant of a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    /// Color name ("Walnut", "Oak").
    pub color_name: String,
    /// Optional hex code for display.
    pub color_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A size within a color variant. Owns its stock counter and dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct VariantSize {
    pub id: String,
    pub variant_id: String,
    /// Size name ("Small", "3-Seater", "180x90").
    pub size_name: String,
    /// Stock counter for this exact color+size configuration.
    pub stock: i64,
    /// Dimensions in centimeters, where known.
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub depth_cm: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A raw-material consumption rule attached to a product.
///
/// Selling N units of the product consumes `N × quantity_per_unit` of the
/// material's stock and adds `N × sale_price` to the bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Addon {
    pub id: String,
    pub product_id: String,
    pub material_id: String,
    /// Material name at definition time (for display).
    pub material_name: String,
    /// Units of material consumed per unit of product sold.
    pub quantity_per_unit: i64,
    /// Price charged per unit of product sold.
    pub sale_price_cents: i64,
}

impl Addon {
    /// Returns the addon sale price as Money.
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }
}

// =============================================================================
// Stock Locator
// =============================================================================

/// Addresses a stock counter at any granularity the ledger can mutate.
///
/// ## Granularities
/// - `Material`: a raw material's own counter
/// - `Product`: a product without variants (top-level counter authoritative)
/// - `VariantSize`: a specific size within a color within a product; the
///   owning product's aggregate is recomputed after mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum StockLocator {
    Material { material_id: String },
    Product { product_id: String },
    VariantSize { product_id: String, size_id: String },
}

impl StockLocator {
    /// Product id whose aggregate needs recomputation after a size-level
    /// mutation, if any.
    pub fn aggregate_product_id(&self) -> Option<&str> {
        match self {
            StockLocator::VariantSize { product_id, .. } => Some(product_id),
            _ => None,
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// How a coupon reduces the bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Percentage of subtotal, optionally capped by `max_discount_cents`.
    Percentage,
    /// Fixed amount, not capped by subtotal.
    Fixed,
}

/// A discount coupon.
///
/// ## Invariants
/// - `code` is unique case-insensitively (stored uppercase)
/// - `used_count` only increases, and only on a committed order
/// - `used_count` never exceeds `usage_limit` when a limit is set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Coupon {
    pub id: String,
    /// Unique code, stored uppercase; lookups are case-insensitive.
    pub code: String,
    pub discount_type: DiscountType,
    /// Percentage in basis points (2000 = 20%); percentage type only.
    pub percent_bps: Option<u32>,
    /// Fixed discount amount in cents; fixed type only.
    pub amount_cents: Option<i64>,
    /// Minimum subtotal required to apply the coupon.
    pub minimum_amount_cents: i64,
    /// Cap on the computed discount; percentage type only.
    pub max_discount_cents: Option<i64>,
    /// Maximum number of committed orders that may apply this coupon.
    pub usage_limit: Option<i64>,
    /// Committed orders that applied this coupon so far.
    pub used_count: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Tax
// =============================================================================

/// Where in the pipeline a tax applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TaxType {
    /// Applied per line, only to items whose category is in the tax's set.
    Category,
    /// Applied to the whole taxable amount after discount and delivery.
    FullBill,
}

/// A tax rate definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tax {
    pub id: String,
    pub name: String,
    /// Rate in basis points (500 = 5%).
    pub rate_bps: u32,
    pub tax_type: TaxType,
    /// Category names this tax applies to; relevant for `Category` type only.
    pub applicable_categories: Vec<String>,
    pub is_active: bool,
}

impl Tax {
    /// Returns the rate as a TaxRate.
    #[inline]
    pub fn rate(&self) -> TaxRate {
        TaxRate::from_bps(self.rate_bps)
    }

    /// Whether this category tax covers the given category name.
    pub fn covers_category(&self, category: &str) -> bool {
        self.applicable_categories.iter().any(|c| c == category)
    }
}

// =============================================================================
// Order Source / Status / Payment
// =============================================================================

/// Which flow produced the order. One engine serves all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    /// Point-of-sale transaction (walk-in, stock decremented).
    Pos,
    /// E-commerce checkout (stock decremented).
    Ecommerce,
    /// Purchase-order goods received (stock incremented).
    PurchaseReceipt,
}

impl OrderSource {
    /// Whether this flow removes stock (sale) or adds it (receiving).
    pub fn decrements_stock(&self) -> bool {
        !matches!(self, OrderSource::PurchaseReceipt)
    }
}

/// The status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Committed, awaiting fulfillment (e-commerce default).
    Pending,
    /// Committed and settled (POS and goods-received default).
    Completed,
    /// Cancelled after commit (status transition only; no pricing impact).
    Voided,
}

/// How the order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    CashOnDelivery,
}

// =============================================================================
// Order
// =============================================================================

/// A committed order. POS, e-commerce and goods-received flows all produce
/// this shape with different header fields.
///
/// Immutable once committed, except for `status` transitions. The persisted
/// breakdown fields reconstruct the total exactly:
/// `total = subtotal + category_tax + full_bill_tax - discount + delivery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub source: OrderSource,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub payment_method: PaymentMethod,
    /// Coupon code captured at commit time, if one was applied.
    pub applied_coupon_code: Option<String>,
    pub delivery_zone_id: Option<String>,
    pub subtotal_cents: i64,
    pub category_tax_cents: i64,
    pub full_bill_tax_cents: i64,
    pub discount_cents: i64,
    pub delivery_charge_cents: i64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item in an order.
/// Uses snapshot pattern to freeze catalog data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub item_id: String,
    pub kind: ItemKind,
    /// Name at time of sale (frozen).
    pub name_snapshot: String,
    /// Color at time of sale, for variant lines (frozen).
    pub color_snapshot: Option<String>,
    /// Size at time of sale, for variant lines (frozen).
    pub size_snapshot: Option<String>,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Line total before tax (unit_price × quantity, addons excluded).
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A captured addon charge on an order item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItemAddon {
    pub id: String,
    pub order_item_id: String,
    pub material_id: String,
    /// Material name at time of sale (frozen).
    pub name_snapshot: String,
    /// Material units consumed per product unit (frozen).
    pub quantity_per_unit: i64,
    /// Charge per product unit (frozen).
    pub sale_price_cents: i64,
    /// Total addon charge: sale_price × order item quantity.
    pub line_total_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
