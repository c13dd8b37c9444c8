use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{
            SiteRepo, has_file_reference_predicate, is_blank_reference, managed_status_list,
            reference_present,
        },
    },
    models::{SiteBaggage, SiteFileField, SiteStatus},
};

pub struct PostgresSiteRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresSiteRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_baggage(row: &sqlx::postgres::PgRow) -> DbResult<SiteBaggage> {
        let status: SiteStatus = row
            .get::<String, _>("status")
            .parse()
            .map_err(|e: String| DbError::Internal(e))?;

        let references = SiteFileField::ALL
            .iter()
            .filter_map(|field| {
                row.get::<Option<String>, _>(field.column())
                    .filter(|value| !is_blank_reference(value))
                    .map(|value| (*field, value))
            })
            .collect();

        Ok(SiteBaggage {
            site_id: row.get("id"),
            status,
            created_at: row.get("created_at"),
            references,
        })
    }
}

#[async_trait]
impl SiteRepo for PostgresSiteRepo {
    async fn list_unarchived_ids(&self) -> DbResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM sites WHERE status != $1 ORDER BY created_at, id")
            .bind(SiteStatus::Archived.as_str())
            .fetch_all(&self.read_pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
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
              AND created_at < $1
              AND ({has_reference})
            ORDER BY created_at, id
            "#,
            managed = managed_status_list(),
            has_reference = has_file_reference_predicate(),
        );

        let rows = sqlx::query(&sql)
            .bind(created_before)
            .fetch_all(&self.read_pool)
            .await?;

        rows.iter().map(Self::parse_baggage).collect()
    }

    async fn clear_file_reference(&self, site_id: Uuid, field: SiteFileField) -> DbResult<bool> {
        let column = field.column();
        let sql = format!(
            "UPDATE sites SET {column} = NULL WHERE id = $1 AND {present}",
            present = reference_present(column),
        );

        let result = sqlx::query(&sql)
            .bind(site_id)
            .execute(&self.write_pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
