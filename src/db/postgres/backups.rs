use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::BackupRepo,
    },
    models::{BackupStatus, FilesAvailability, SiteBackup},
};

pub struct PostgresBackupRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresBackupRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_backup(row: &sqlx::postgres::PgRow) -> DbResult<SiteBackup> {
        let status: BackupStatus = row
            .get::<String, _>("status")
            .parse()
            .map_err(|e: String| DbError::Internal(e))?;
        let files_availability: FilesAvailability = row
            .get::<String, _>("files_availability")
            .parse()
            .map_err(|e: String| DbError::Internal(e))?;

        Ok(SiteBackup {
            id: row.get("id"),
            site_id: row.get("site_id"),
            status,
            files_availability,
            offsite: row.get("offsite"),
            remote_database_file: row.get("remote_database_file"),
            remote_private_file: row.get("remote_private_file"),
            remote_public_file: row.get("remote_public_file"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl BackupRepo for PostgresBackupRepo {
    async fn list_retainable(&self, site_id: Uuid) -> DbResult<Vec<SiteBackup>> {
        let rows = sqlx::query(
            r#"
            SELECT id, site_id, status, files_availability, offsite,
                   remote_database_file, remote_private_file, remote_public_file,
                   created_at
            FROM site_backups
            WHERE site_id = $1 AND status = $2 AND files_availability = $3
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(site_id)
        .bind(BackupStatus::Success.as_str())
        .bind(FilesAvailability::Available.as_str())
        .fetch_all(&self.read_pool)
        .await?;

        rows.iter().map(Self::parse_backup).collect()
    }

    async fn mark_unavailable(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE site_backups
            SET files_availability = $1
            WHERE id = $2 AND files_availability = $3
            "#,
        )
        .bind(FilesAvailability::Unavailable.as_str())
        .bind(id)
        .bind(FilesAvailability::Available.as_str())
        .execute(&self.write_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
