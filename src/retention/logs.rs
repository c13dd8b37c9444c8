//! Operational log retention.
//!
//! Each log kind has its own window and is purged independently: an error
//! on one kind is logged and the remaining kinds still run.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};

use super::{SweepError, lease::SweepKind};
use crate::{
    config::{LogRetentionConfig, RetentionSafety},
    db::DbPool,
    models::LogKind,
    observability::metrics,
};

/// Results from a single log retention run.
#[derive(Debug, Default, Clone)]
pub struct LogSweepResult {
    /// Rows deleted per kind. In dry-run mode, rows that would be deleted.
    pub deleted: BTreeMap<LogKind, u64>,
    /// Kinds whose purge failed.
    pub failed: Vec<LogKind>,
    pub dry_run: bool,
}

impl LogSweepResult {
    pub fn total(&self) -> u64 {
        self.deleted.values().sum()
    }

    pub fn deleted_for(&self, kind: LogKind) -> u64 {
        self.deleted.get(&kind).copied().unwrap_or(0)
    }
}

pub struct LogRetentionSweeper {
    db: Arc<DbPool>,
    config: LogRetentionConfig,
    safety: RetentionSafety,
}

impl LogRetentionSweeper {
    pub fn new(db: Arc<DbPool>, config: LogRetentionConfig, safety: RetentionSafety) -> Self {
        Self { db, config, safety }
    }

    pub fn kind(&self) -> SweepKind {
        SweepKind::LogRetention
    }

    /// Purge every kind with a non-zero window. Only fails when every
    /// attempted kind failed.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<LogSweepResult, SweepError> {
        let mut result = LogSweepResult {
            dry_run: self.safety.dry_run,
            ..Default::default()
        };
        let mut attempted = 0;
        let mut last_error = None;

        for kind in LogKind::ALL {
            let days = self.config.windows.days_for(kind);
            if days == 0 {
                continue;
            }
            attempted += 1;
            let cutoff = now - Duration::days(i64::from(days));

            match self.purge(kind, cutoff).await {
                Ok(deleted) => {
                    result.deleted.insert(kind, deleted);
                }
                Err(e) => {
                    tracing::error!(kind = %kind, cutoff = %cutoff, error = %e, "Failed to purge logs");
                    result.failed.push(kind);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if result.failed.len() == attempted => Err(e),
            _ => Ok(result),
        }
    }

    async fn purge(&self, kind: LogKind, cutoff: DateTime<Utc>) -> Result<u64, SweepError> {
        let logs = self.db.operational_logs();

        if self.safety.dry_run {
            let count = logs.count_before(kind, cutoff).await?;
            tracing::info!(
                kind = %kind,
                cutoff = %cutoff,
                count,
                "DRY RUN: Would delete {} rows before {}",
                kind,
                cutoff
            );
            return Ok(count);
        }

        let deleted = logs
            .delete_before(kind, cutoff, self.safety.batch_size, self.safety.max_deletes())
            .await?;

        if deleted > 0 {
            tracing::debug!(kind = %kind, deleted, cutoff = %cutoff, "Deleted log rows");
            metrics::record_retention_deletion(kind.as_str(), deleted);
        }
        Ok(deleted)
    }
}
