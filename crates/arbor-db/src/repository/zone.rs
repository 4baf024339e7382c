//! # Delivery Zone Repository
//!
//! The zone charge table. Delivery charges are fixed lookups by zone id,
//! never computed.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;

/// Repository for delivery zone operations.
#[derive(Debug, Clone)]
pub struct ZoneRepository {
    pool: SqlitePool,
}

impl ZoneRepository {
    /// Creates a new ZoneRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ZoneRepository { pool }
    }

    /// Looks up the delivery charge for a zone on the order's transaction
    /// connection. `None` means the zone is unknown.
    pub async fn charge_for(
        &self,
        conn: &mut SqliteConnection,
        zone_id: &str,
    ) -> DbResult<Option<i64>> {
        let charge: Option<i64> =
            sqlx::query_scalar("SELECT charge_cents FROM delivery_zones WHERE id = ?1")
                .bind(zone_id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(charge)
    }

    /// Inserts a delivery zone.
    pub async fn insert(&self, id: &str, name: &str, charge_cents: i64) -> DbResult<()> {
        sqlx::query("INSERT INTO delivery_zones (id, name, charge_cents) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(name)
            .bind(charge_cents)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
