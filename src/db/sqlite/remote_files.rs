use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::common::{parse_enum, parse_uuid};
use crate::{
    db::{error::DbResult, repos::RemoteFileRepo},
    models::{DeletionState, RemoteFile, RemoteFileStatus},
};

const COLUMNS: &str = "id, file_path, status, deletion_state, deletion_dispatched_at, \
                       deletion_confirmed_at, created_at";

pub struct SqliteRemoteFileRepo {
    pool: SqlitePool,
}

impl SqliteRemoteFileRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_remote_file(row: &sqlx::sqlite::SqliteRow) -> DbResult<RemoteFile> {
        Ok(RemoteFile {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            file_path: row.get("file_path"),
            status: parse_enum(&row.get::<String, _>("status"))?,
            deletion_state: parse_enum(&row.get::<String, _>("deletion_state"))?,
            deletion_dispatched_at: row.get("deletion_dispatched_at"),
            deletion_confirmed_at: row.get("deletion_confirmed_at"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl RemoteFileRepo for SqliteRemoteFileRepo {
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<RemoteFile>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM remote_files WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_remote_file).transpose()
    }

    async fn mark_delete_dispatched(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE remote_files
            SET status = ?, deletion_state = ?, deletion_dispatched_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(RemoteFileStatus::Unavailable.as_str())
        .bind(DeletionState::DeleteDispatched.as_str())
        .bind(at)
        .bind(id.to_string())
        .bind(RemoteFileStatus::Available.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_delete_dispatched(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE remote_files
            SET deletion_dispatched_at = ?
            WHERE id = ? AND deletion_state = ?
            "#,
        )
        .bind(at)
        .bind(id.to_string())
        .bind(DeletionState::DeleteDispatched.as_str())
        .execute(&self.pool)
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
            WHERE deletion_state = ? AND deletion_dispatched_at < ?
            ORDER BY deletion_dispatched_at, id
            LIMIT ?
            "#
        ))
        .bind(DeletionState::DeleteDispatched.as_str())
        .bind(dispatched_before)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_remote_file).collect()
    }

    async fn confirm_deleted(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE remote_files
            SET deletion_state = ?, deletion_confirmed_at = ?
            WHERE id = ? AND deletion_state = ?
            "#,
        )
        .bind(DeletionState::Deleted.as_str())
        .bind(at)
        .bind(id.to_string())
        .bind(DeletionState::DeleteDispatched.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
