//! # Catalog Repository
//!
//! Read-side resolution of catalog items plus management operations for
//! items, variants, sizes and addons.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              resolve(kind, item_id, color_id?, size_name?)              │
//! │                                                                         │
//! │  catalog_items ──┬── no variant coords ──► stock from item row         │
//! │                  │                         locator: Product/Material   │
//! │                  │                                                      │
//! │                  └── color_id + size_name                              │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                      variants (color) ──► variant_sizes (size)         │
//! │                                           stock from size row          │
//! │                                           locator: VariantSize         │
//! │                                                                         │
//! │  Plus: addons attached to the product, joined with their material     │
//! │  rows for the captured name.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Resolution is read-only. It runs on the order's transaction connection
//! so the availability snapshot and the later conditional decrement belong
//! to the same unit of work.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use arbor_core::{Addon, CatalogItem, ItemKind, StockLocator, Variant, VariantSize};

/// A catalog line resolved for one order request line.
///
/// Prices and names are captured here, at validation time, and never
/// re-read within the same transaction.
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub item_id: String,
    pub kind: ItemKind,
    pub name: String,
    pub category: String,
    pub unit_price_cents: i64,
    pub available_stock: i64,
    pub locator: StockLocator,
    pub color_name: Option<String>,
    pub size_name: Option<String>,
    pub addons: Vec<Addon>,
}

impl ResolvedLine {
    /// Display label naming the exact configuration, down to color and size.
    pub fn label(&self) -> String {
        match (&self.color_name, &self.size_name) {
            (Some(color), Some(size)) => format!("{} / {} / {}", self.name, color, size),
            _ => self.name.clone(),
        }
    }
}

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Resolution (transactional read)
    // =========================================================================

    /// Resolves an order line to its current attributes and stock location.
    ///
    /// ## Returns
    /// * `Ok(Some(ResolvedLine))` - item (and variant, when requested) found
    /// * `Ok(None)` - unknown item, inactive item, or unknown variant coords
    pub async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        kind: ItemKind,
        item_id: &str,
        color_id: Option<&str>,
        size_name: Option<&str>,
    ) -> DbResult<Option<ResolvedLine>> {
        let item = sqlx::query_as::<_, CatalogItem>(
            r#"
            SELECT id, kind, sku, name, category, unit, unit_price_cents,
                   stock, has_variants, is_active, created_at, updated_at
            FROM catalog_items
            WHERE id = ?1 AND kind = ?2 AND is_active = 1
            "#,
        )
        .bind(item_id)
        .bind(kind)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(item) = item else {
            return Ok(None);
        };

        // Variant coordinates select the size-level counter
        if let (Some(color_id), Some(size_name)) = (color_id, size_name) {
            let variant = sqlx::query_as::<_, Variant>(
                r#"
                SELECT id, product_id, color_name, color_code, created_at
                FROM variants
                WHERE id = ?1 AND product_id = ?2
                "#,
            )
            .bind(color_id)
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?;

            let Some(variant) = variant else {
                return Ok(None);
            };

            let size = sqlx::query_as::<_, VariantSize>(
                r#"
                SELECT id, variant_id, size_name, stock,
                       width_cm, height_cm, depth_cm, created_at
                FROM variant_sizes
                WHERE variant_id = ?1 AND size_name = ?2
                "#,
            )
            .bind(&variant.id)
            .bind(size_name)
            .fetch_optional(&mut *conn)
            .await?;

            let Some(size) = size else {
                return Ok(None);
            };

            let addons = self.addons_for(&mut *conn, item_id).await?;

            debug!(item = %item.sku, color = %variant.color_name, size = %size.size_name, "Resolved variant line");

            return Ok(Some(ResolvedLine {
                item_id: item.id.clone(),
                kind: item.kind,
                name: item.name.clone(),
                category: item.category.clone(),
                unit_price_cents: item.unit_price_cents,
                available_stock: size.stock,
                locator: StockLocator::VariantSize {
                    product_id: item.id,
                    size_id: size.id,
                },
                color_name: Some(variant.color_name),
                size_name: Some(size.size_name),
                addons,
            }));
        }

        // No variant coordinates: the item's own counter is the target
        let locator = match item.kind {
            ItemKind::Product => StockLocator::Product {
                product_id: item.id.clone(),
            },
            ItemKind::Material => StockLocator::Material {
                material_id: item.id.clone(),
            },
        };

        let addons = match item.kind {
            ItemKind::Product => self.addons_for(&mut *conn, item_id).await?,
            ItemKind::Material => Vec::new(),
        };

        debug!(item = %item.sku, "Resolved line");

        Ok(Some(ResolvedLine {
            item_id: item.id,
            kind: item.kind,
            name: item.name,
            category: item.category,
            unit_price_cents: item.unit_price_cents,
            available_stock: item.stock,
            locator,
            color_name: None,
            size_name: None,
            addons,
        }))
    }

    /// Lists the addon rules attached to a product, with material names.
    async fn addons_for(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> DbResult<Vec<Addon>> {
        let addons = sqlx::query_as::<_, Addon>(
            r#"
            SELECT a.id, a.product_id, a.material_id, m.name AS material_name,
                   a.quantity_per_unit, a.sale_price_cents
            FROM addons a
            INNER JOIN catalog_items m ON a.material_id = m.id
            WHERE a.product_id = ?1
            ORDER BY a.id
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(addons)
    }

    // =========================================================================
    // Management (pool-based)
    // =========================================================================

    /// Inserts a catalog item (product or material).
    pub async fn insert_item(&self, item: &CatalogItem) -> DbResult<()> {
        debug!(sku = %item.sku, "Inserting catalog item");

        sqlx::query(
            r#"
            INSERT INTO catalog_items (
                id, kind, sku, name, category, unit, unit_price_cents,
                stock, has_variants, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(item.kind)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.unit)
        .bind(item.unit_price_cents)
        .bind(item.stock)
        .bind(item.has_variants)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a color variant for a product.
    pub async fn insert_variant(&self, variant: &Variant) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO variants (id, product_id, color_name, color_code, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.color_name)
        .bind(&variant.color_code)
        .bind(variant.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a size under a variant and refreshes the owning product's
    /// denormalized aggregate so the invariant holds from the start.
    pub async fn insert_size(&self, product_id: &str, size: &VariantSize) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO variant_sizes (
                id, variant_id, size_name, stock,
                width_cm, height_cm, depth_cm, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&size.id)
        .bind(&size.variant_id)
        .bind(&size.size_name)
        .bind(size.stock)
        .bind(size.width_cm)
        .bind(size.height_cm)
        .bind(size.depth_cm)
        .bind(size.created_at)
        .execute(&self.pool)
        .await?;

        let now = Utc::now();
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
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Attaches a raw-material addon rule to a product.
    pub async fn attach_addon(&self, addon: &Addon) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO addons (id, product_id, material_id, quantity_per_unit, sale_price_cents)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&addon.id)
        .bind(&addon.product_id)
        .bind(&addon.material_id)
        .bind(addon.quantity_per_unit)
        .bind(addon.sale_price_cents)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a catalog item by its ID.
    pub async fn get_item(&self, id: &str) -> DbResult<Option<CatalogItem>> {
        let item = sqlx::query_as::<_, CatalogItem>(
            r#"
            SELECT id, kind, sku, name, category, unit, unit_price_cents,
                   stock, has_variants, is_active, created_at, updated_at
            FROM catalog_items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets a catalog item, failing when it does not exist.
    pub async fn require_item(&self, id: &str) -> DbResult<CatalogItem> {
        self.get_item(id)
            .await?
            .ok_or_else(|| DbError::not_found("CatalogItem", id))
    }

    /// Soft-deletes a catalog item.
    ///
    /// ## Why Soft Delete?
    /// Historical orders still reference the item via snapshots, and the
    /// deletion can be reversed.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE catalog_items SET is_active = 0, updated_at = ?2 WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CatalogItem", id));
        }

        Ok(())
    }
}

/// Helper to generate a new catalog entity ID.
pub fn generate_catalog_id() -> String {
    Uuid::new_v4().to_string()
}
