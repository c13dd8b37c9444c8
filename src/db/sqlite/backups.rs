use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::common::{parse_enum, parse_optional_uuid, parse_uuid};
use crate::{
    db::{error::DbResult, repos::BackupRepo},
    models::{BackupStatus, FilesAvailability, SiteBackup},
};

pub struct SqliteBackupRepo {
    pool: SqlitePool,
}

impl SqliteBackupRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_backup(row: &sqlx::sqlite::SqliteRow) -> DbResult<SiteBackup> {
        Ok(SiteBackup {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            site_id: parse_uuid(&row.get::<String, _>("site_id"))?,
            status: parse_enum(&row.get::<String, _>("status"))?,
            files_availability: parse_enum(&row.get::<String, _>("files_availability"))?,
            offsite: row.get("offsite"),
            remote_database_file: parse_optional_uuid(row.get("remote_database_file"))?,
            remote_private_file: parse_optional_uuid(row.get("remote_private_file"))?,
            remote_public_file: parse_optional_uuid(row.get("remote_public_file"))?,
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl BackupRepo for SqliteBackupRepo {
    async fn list_retainable(&self, site_id: Uuid) -> DbResult<Vec<SiteBackup>> {
        let rows = sqlx::query(
            r#"
            SELECT id, site_id, status, files_availability, offsite,
                   remote_database_file, remote_private_file, remote_public_file,
                   created_at
            FROM site_backups
            WHERE site_id = ? AND status = ? AND files_availability = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(site_id.to_string())
        .bind(BackupStatus::Success.as_str())
        .bind(FilesAvailability::Available.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_backup).collect()
    }

    async fn mark_unavailable(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE site_backups
            SET files_availability = ?
            WHERE id = ? AND files_availability = ?
            "#,
        )
        .bind(FilesAvailability::Unavailable.as_str())
        .bind(id.to_string())
        .bind(FilesAvailability::Available.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
