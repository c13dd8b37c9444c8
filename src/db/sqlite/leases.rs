use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{error::DbResult, repos::LeaseRepo};

pub struct SqliteLeaseRepo {
    pool: SqlitePool,
}

impl SqliteLeaseRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaseRepo for SqliteLeaseRepo {
    async fn acquire(
        &self,
        name: &str,
        holder: Uuid,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DbResult<bool> {
        // The upsert only fires when the existing row is expired or ours, so
        // rows_affected is 0 exactly when someone else holds the lease.
        let result = sqlx::query(
            r#"
            INSERT INTO sweep_leases (name, holder, acquired_at, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                holder = excluded.holder,
                acquired_at = excluded.acquired_at,
                expires_at = excluded.expires_at
            WHERE sweep_leases.expires_at <= excluded.acquired_at
               OR sweep_leases.holder = excluded.holder
            "#,
        )
        .bind(name)
        .bind(holder.to_string())
        .bind(now)
        .bind(now + ttl)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, name: &str, holder: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM sweep_leases WHERE name = ? AND holder = ?")
            .bind(name)
            .bind(holder.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
