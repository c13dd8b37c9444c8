use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::{
    db::{error::DbResult, repos::OperationalLogRepo},
    models::LogKind,
};

pub struct PostgresOperationalLogRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresOperationalLogRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }
}

#[async_trait]
impl OperationalLogRepo for PostgresOperationalLogRepo {
    async fn count_before(&self, kind: LogKind, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS count FROM {} WHERE modified_at < $1",
            kind.table()
        ))
        .bind(cutoff)
        .fetch_one(&self.read_pool)
        .await?;

        Ok(row.get::<i64, _>("count") as u64)
    }

    async fn delete_before(
        &self,
        kind: LogKind,
        cutoff: DateTime<Utc>,
        batch_size: u32,
        max_deletes: u64,
    ) -> DbResult<u64> {
        let table = kind.table();
        // Batched deletion using ctid
        let sql = format!(
            r#"
            DELETE FROM {table}
            WHERE ctid IN (
                SELECT ctid FROM {table}
                WHERE modified_at < $1
                LIMIT $2
            )
            "#
        );
        let mut total_deleted: u64 = 0;

        loop {
            if total_deleted >= max_deletes {
                break;
            }

            let remaining = max_deletes - total_deleted;
            let limit = std::cmp::min(batch_size as u64, remaining) as i64;

            let result = sqlx::query(&sql)
                .bind(cutoff)
                .bind(limit)
                .execute(&self.write_pool)
                .await?;

            let rows_deleted = result.rows_affected();
            total_deleted += rows_deleted;

            if rows_deleted < limit as u64 {
                break;
            }
        }

        Ok(total_deleted)
    }
}
