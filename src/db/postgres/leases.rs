use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{error::DbResult, repos::LeaseRepo};

/// Leases always use the primary; a replica could hand out stale holders.
pub struct PostgresLeaseRepo {
    write_pool: PgPool,
}

impl PostgresLeaseRepo {
    pub fn new(write_pool: PgPool, _read_pool: Option<PgPool>) -> Self {
        Self { write_pool }
    }
}

#[async_trait]
impl LeaseRepo for PostgresLeaseRepo {
    async fn acquire(
        &self,
        name: &str,
        holder: Uuid,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO sweep_leases (name, holder, acquired_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE SET
                holder = EXCLUDED.holder,
                acquired_at = EXCLUDED.acquired_at,
                expires_at = EXCLUDED.expires_at
            WHERE sweep_leases.expires_at <= EXCLUDED.acquired_at
               OR sweep_leases.holder = EXCLUDED.holder
            "#,
        )
        .bind(name)
        .bind(holder)
        .bind(now)
        .bind(now + ttl)
        .execute(&self.write_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, name: &str, holder: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM sweep_leases WHERE name = $1 AND holder = $2")
            .bind(name)
            .bind(holder)
            .execute(&self.write_pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
