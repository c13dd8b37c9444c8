use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::common::{parse_enum, parse_uuid};
use crate::{
    db::{
        error::DbResult,
        repos::{
            SiteRepo, has_file_reference_predicate, is_blank_reference, managed_status_list,
            reference_present,
        },
    },
    models::{SiteBaggage, SiteFileField, SiteStatus},
};

pub struct SqliteSiteRepo {
    pool: SqlitePool,
}

impl SqliteSiteRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_baggage(row: &sqlx::sqlite::SqliteRow) -> DbResult<SiteBaggage> {
        let references = SiteFileField::ALL
            .iter()
            .filter_map(|field| {
                row.get::<Option<String>, _>(field.column())
                    .filter(|value| !is_blank_reference(value))
                    .map(|value| (*field, value))
            })
            .collect();

        Ok(SiteBaggage {
            site_id: parse_uuid(&row.get::<String, _>("id"))?,
            status: parse_enum(&row.get::<String, _>("status"))?,
            created_at: row.get("created_at"),
            references,
        })
    }
}

#[async_trait]
impl SiteRepo for SqliteSiteRepo {
    async fn list_unarchived_ids(&self) -> DbResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM sites WHERE status != ? ORDER BY created_at, id")
            .bind(SiteStatus::Archived.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| parse_uuid(&row.get::<String, _>("id")))
            .collect()
    }

    async fn list_baggage_candidates(
        &self,
        created_before: DateTime<Utc>,
    ) -> DbResult<Vec<SiteBaggage>> {
        let columns = SiteFileField::ALL
            .iter()
            .map(|f| f.column())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            SELECT id, status, created_at, {columns}
            FROM sites
            WHERE status NOT IN ({managed})
              AND created_at < ?
              AND ({has_reference})
            ORDER BY created_at, id
            "#,
            managed = managed_status_list(),
            has_reference = has_file_reference_predicate(),
        );

        let rows = sqlx::query(&sql)
            .bind(created_before)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::parse_baggage).collect()
    }

    async fn clear_file_reference(&self, site_id: Uuid, field: SiteFileField) -> DbResult<bool> {
        let column = field.column();
        let sql = format!(
            "UPDATE sites SET {column} = NULL WHERE id = ? AND {present}",
            present = reference_present(column),
        );

        let result = sqlx::query(&sql)
            .bind(site_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
