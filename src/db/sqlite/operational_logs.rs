use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::{
    db::{error::DbResult, repos::OperationalLogRepo},
    models::LogKind,
};

pub struct SqliteOperationalLogRepo {
    pool: SqlitePool,
}

impl SqliteOperationalLogRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OperationalLogRepo for SqliteOperationalLogRepo {
    async fn count_before(&self, kind: LogKind, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS count FROM {} WHERE modified_at < ?",
            kind.table()
        ))
        .bind(cutoff)
        .fetch_one(&self.pool)
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
        let sql = format!(
            r#"
            DELETE FROM {table}
            WHERE id IN (
                SELECT id FROM {table}
                WHERE modified_at < ?
                LIMIT ?
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
                .execute(&self.pool)
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
