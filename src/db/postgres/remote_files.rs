use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::RemoteFileRepo,
    },
    models::{DeletionState, RemoteFile, RemoteFileStatus},
};

const COLUMNS: &str = "id, file_path, status, deletion_state, deletion_dispatched_at, \
                       deletion_confirmed_at, created_at";

pub struct PostgresRemoteFileRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresRemoteFileRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_remote_file(row: &sqlx::postgres::PgRow) -> DbResult<RemoteFile> {
        let status: RemoteFileStatus = row
            .get::<String, _>("status")
            .parse()
            .map_err(|e: String| DbError::Internal(e))?;
        let deletion_state: DeletionState = row
            .get::<String, _>("deletion_state")
            .parse()
            .map_err(|e: String| DbError::Internal(e))?;

        Ok(RemoteFile {
            id: row.get("id"),
            file_path: row.get("file_path"),
            status,
            deletion_state,
            deletion_dispatched_at: row.get("deletion_dispatched_at"),
            deletion_confirmed_at: row.get("deletion_confirmed_at"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl RemoteFileRepo for PostgresRemoteFileRepo {
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<RemoteFile>> {
        // Read from the primary: the sweeper checks status right after writing it
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM remote_files WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.write_pool)
            .await?;

        row.as_ref().map(Self::parse_remote_file).transpose()
    }

    async fn mark_delete_dispatched(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE remote_files
            SET status = $1, deletion_state = $2, deletion_dispatched_at = $3
            WHERE id = $4 AND status = $5
            "#,
        )
        .bind(RemoteFileStatus::Unavailable.as_str())
        .bind(DeletionState::DeleteDispatched.as_str())
        .bind(at)
        .bind(id)
        .bind(RemoteFileStatus::Available.as_str())
        .execute(&self.write_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_delete_dispatched(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE remote_files
            SET deletion_dispatched_at = $1
            WHERE id = $2 AND deletion_state = $3
            "#,
        )
        .bind(at)
        .bind(id)
        .bind(DeletionState::DeleteDispatched.as_str())
        .execute(&self.write_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_pending_confirmation(
        &self,
        dispatched_before: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<RemoteFile>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS}
            FROM remote_files
            WHERE deletion_state = $1 AND deletion_dispatched_at < $2
            ORDER BY deletion_dispatched_at, id
            LIMIT $3
            "#
        ))
        .bind(DeletionState::DeleteDispatched.as_str())
        .bind(dispatched_before)
        .bind(limit as i64)
        .fetch_all(&self.read_pool)
        .await?;

        rows.iter().map(Self::parse_remote_file).collect()
    }

    async fn confirm_deleted(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE remote_files
            SET deletion_state = $1, deletion_confirmed_at = $2
            WHERE id = $3 AND deletion_state = $4
            "#,
        )
        .bind(DeletionState::Deleted.as_str())
        .bind(at)
        .bind(id)
        .bind(DeletionState::DeleteDispatched.as_str())
        .execute(&self.write_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
