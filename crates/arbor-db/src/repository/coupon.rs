//! # Coupon Repository
//!
//! Coupon lookup and usage consumption.
//!
//! ## Usage Consumption Discipline
//! `used_count` has the same read-then-write race as stock counters, so it
//! uses the same cure: a single conditional UPDATE that only fires while
//! the limit still has headroom. The coordinator calls `consume` inside
//! the order transaction, so the increment commits or rolls back with the
//! order as one unit.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use arbor_core::Coupon;

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Finds a coupon by code, case-insensitively, on the order's
    /// transaction connection.
    pub async fn find_by_code(
        &self,
        conn: &mut SqliteConnection,
        code: &str,
    ) -> DbResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT id, code, discount_type, percent_bps, amount_cents,
                   minimum_amount_cents, max_discount_cents, usage_limit,
                   used_count, valid_from, valid_to, is_active, created_at
            FROM coupons
            WHERE UPPER(code) = UPPER(?1)
            "#,
        )
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(coupon)
    }

    /// Consumes one use of a coupon, if and only if the usage limit still
    /// has headroom.
    ///
    /// ## Returns
    /// * `Ok(true)` - the increment applied
    /// * `Ok(false)` - the limit was already reached; nothing changed
    pub async fn consume(&self, conn: &mut SqliteConnection, coupon_id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET used_count = used_count + 1
            WHERE id = ?1
              AND is_active = 1
              AND (usage_limit IS NULL OR used_count < usage_limit)
            "#,
        )
        .bind(coupon_id)
        .execute(&mut *conn)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(coupon_id = %coupon_id, applied, "Coupon consumption");
        Ok(applied)
    }

    // =========================================================================
    // Management (pool-based)
    // =========================================================================

    /// Inserts a coupon. The code is stored as given; uniqueness is
    /// enforced case-insensitively at lookup by normalized comparison,
    /// callers store uppercase codes.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(code = %coupon.code, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, discount_type, percent_bps, amount_cents,
                minimum_amount_cents, max_discount_cents, usage_limit,
                used_count, valid_from, valid_to, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&coupon.id)
        .bind(coupon.code.to_uppercase())
        .bind(coupon.discount_type)
        .bind(coupon.percent_bps)
        .bind(coupon.amount_cents)
        .bind(coupon.minimum_amount_cents)
        .bind(coupon.max_discount_cents)
        .bind(coupon.usage_limit)
        .bind(coupon.used_count)
        .bind(coupon.valid_from)
        .bind(coupon.valid_to)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a coupon by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Coupon> {
        let coupon = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT id, code, discount_type, percent_bps, amount_cents,
                   minimum_amount_cents, max_discount_cents, usage_limit,
                   used_count, valid_from, valid_to, is_active, created_at
            FROM coupons
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        coupon.ok_or_else(|| DbError::not_found("Coupon", id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use arbor_core::DiscountType;
    use chrono::{Duration, Utc};

    fn coupon(id: &str, code: &str, usage_limit: Option<i64>) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: id.to_string(),
            code: code.to_string(),
            discount_type: DiscountType::Percentage,
            percent_bps: Some(1000),
            amount_cents: None,
            minimum_amount_cents: 0,
            max_discount_cents: None,
            usage_limit,
            used_count: 0,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(30),
            is_active: true,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_find_by_code_is_case_insensitive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.coupons().insert(&coupon("c1", "Save10", None)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let found = db
            .coupons()
            .find_by_code(&mut conn, "save10")
            .await
            .unwrap();

        assert!(found.is_some());
        assert_eq!(found.unwrap().code, "SAVE10");
    }

    #[tokio::test]
    async fn test_consume_respects_usage_limit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.coupons().insert(&coupon("c2", "LAST2", Some(2))).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(db.coupons().consume(&mut conn, "c2").await.unwrap());
        assert!(db.coupons().consume(&mut conn, "c2").await.unwrap());
        // Third consumption finds no headroom and changes nothing
        assert!(!db.coupons().consume(&mut conn, "c2").await.unwrap());
        drop(conn);

        let stored = db.coupons().get_by_id("c2").await.unwrap();
        assert_eq!(stored.used_count, 2);
    }

    #[tokio::test]
    async fn test_consume_unlimited_coupon() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.coupons().insert(&coupon("c3", "FOREVER", None)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        for _ in 0..5 {
            assert!(db.coupons().consume(&mut conn, "c3").await.unwrap());
        }
        drop(conn);

        let stored = db.coupons().get_by_id("c3").await.unwrap();
        assert_eq!(stored.used_count, 5);
    }
}
