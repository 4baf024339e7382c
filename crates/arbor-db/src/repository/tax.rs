//! # Tax Repository
//!
//! Storage for the active tax set. Category sets are stored as a JSON
//! array column and parsed at the edge.

use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use arbor_core::{Tax, TaxType};

/// Raw tax row; `applicable_categories` is JSON TEXT.
#[derive(Debug, FromRow)]
struct TaxRow {
    id: String,
    name: String,
    rate_bps: u32,
    tax_type: TaxType,
    applicable_categories: String,
    is_active: bool,
}

impl TaxRow {
    fn into_tax(self) -> DbResult<Tax> {
        let applicable_categories: Vec<String> = serde_json::from_str(&self.applicable_categories)
            .map_err(|e| DbError::Internal(format!("tax categories parse: {e}")))?;

        Ok(Tax {
            id: self.id,
            name: self.name,
            rate_bps: self.rate_bps,
            tax_type: self.tax_type,
            applicable_categories,
            is_active: self.is_active,
        })
    }
}

/// Repository for tax database operations.
#[derive(Debug, Clone)]
pub struct TaxRepository {
    pool: SqlitePool,
}

impl TaxRepository {
    /// Creates a new TaxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TaxRepository { pool }
    }

    /// Lists active taxes on the order's transaction connection, so pricing
    /// sees the tax set as of the order's snapshot.
    pub async fn active(&self, conn: &mut SqliteConnection) -> DbResult<Vec<Tax>> {
        let rows = sqlx::query_as::<_, TaxRow>(
            r#"
            SELECT id, name, rate_bps, tax_type, applicable_categories, is_active
            FROM taxes
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(TaxRow::into_tax).collect()
    }

    /// Inserts a tax definition.
    pub async fn insert(&self, tax: &Tax) -> DbResult<()> {
        debug!(name = %tax.name, "Inserting tax");

        let categories = serde_json::to_string(&tax.applicable_categories)
            .map_err(|e| DbError::Internal(format!("tax categories serialize: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO taxes (id, name, rate_bps, tax_type, applicable_categories, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&tax.id)
        .bind(&tax.name)
        .bind(tax.rate_bps)
        .bind(tax.tax_type)
        .bind(categories)
        .bind(tax.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
