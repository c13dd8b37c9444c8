//! Deletion reconciliation.
//!
//! A successful bulk delete call only means the store accepted the request.
//! Remote files stay in `DeleteDispatched` until a later pass confirms that
//! the object is gone; objects that are still present get their delete
//! re-issued.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{SweepError, lease::SweepKind};
use crate::{
    config::ReconcileConfig, db::DbPool, observability::metrics, storage::ObjectStoreClient,
};

const SWEEP: &str = "deletion_reconcile";

/// Results from a single reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileResult {
    pub checked: u64,
    /// Files confirmed gone and moved to `Deleted`.
    pub confirmed: u64,
    /// Files still present whose delete was issued again.
    pub redispatched: u64,
    /// Files whose existence check failed or that have no storage path.
    pub check_failed: u64,
    pub dry_run: bool,
}

pub struct DeletionReconciler {
    db: Arc<DbPool>,
    client: ObjectStoreClient,
    config: ReconcileConfig,
    dry_run: bool,
}

impl DeletionReconciler {
    pub fn new(
        db: Arc<DbPool>,
        client: ObjectStoreClient,
        config: ReconcileConfig,
        dry_run: bool,
    ) -> Self {
        Self {
            db,
            client,
            config,
            dry_run,
        }
    }

    pub fn kind(&self) -> SweepKind {
        SweepKind::DeletionReconcile
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<ReconcileResult, SweepError> {
        let settled_before =
            now - Duration::minutes(i64::from(self.config.reconcile_after_minutes));
        let pending = self
            .db
            .remote_files()
            .list_pending_confirmation(settled_before, self.config.batch_size)
            .await?;

        let mut result = ReconcileResult {
            checked: pending.len() as u64,
            dry_run: self.dry_run,
            ..Default::default()
        };
        let mut still_present: BTreeMap<String, Vec<Uuid>> = BTreeMap::new();

        for file in pending {
            if file.file_path.trim().is_empty() {
                tracing::warn!(remote_file_id = %file.id, "Dispatched remote file has an empty storage path");
                metrics::record_skipped_record(SWEEP, "empty_file_path");
                result.check_failed += 1;
                continue;
            }

            match self.client.exists(&file.file_path).await {
                Ok(false) => {
                    if self.dry_run {
                        tracing::info!(
                            remote_file_id = %file.id,
                            key = %file.file_path,
                            "DRY RUN: Would confirm deletion"
                        );
                        continue;
                    }
                    if self.db.remote_files().confirm_deleted(file.id, now).await? {
                        result.confirmed += 1;
                    }
                }
                Ok(true) => {
                    tracing::warn!(
                        remote_file_id = %file.id,
                        key = %file.file_path,
                        dispatched_at = ?file.deletion_dispatched_at,
                        "Object still present after dispatched delete"
                    );
                    still_present.entry(file.file_path).or_default().push(file.id);
                }
                Err(e) => {
                    tracing::warn!(
                        remote_file_id = %file.id,
                        key = %file.file_path,
                        error = %e,
                        "Existence check failed, will retry next pass"
                    );
                    metrics::record_skipped_record(SWEEP, "exists_check_failed");
                    result.check_failed += 1;
                }
            }
        }

        if result.confirmed > 0 {
            metrics::record_reconcile("confirmed", result.confirmed);
        }
        if result.check_failed > 0 {
            metrics::record_reconcile("check_failed", result.check_failed);
        }

        if still_present.is_empty() {
            return Ok(result);
        }
        if self.dry_run {
            for key in still_present.keys() {
                tracing::info!(key = %key, "DRY RUN: Would re-issue delete");
            }
            return Ok(result);
        }

        let keys: Vec<String> = still_present.keys().cloned().collect();
        let run = self.client.delete_keys(&keys).await;
        for key in &run.dispatched {
            for id in still_present.get(key).into_iter().flatten() {
                if self.db.remote_files().touch_delete_dispatched(*id, now).await? {
                    result.redispatched += 1;
                }
            }
        }
        if result.redispatched > 0 {
            metrics::record_reconcile("redispatched", result.redispatched);
        }

        match run.error {
            None => Ok(result),
            Some(e) => Err(SweepError::Incomplete {
                sweep: SWEEP,
                pending: run.not_dispatched.len(),
                reason: e.to_string(),
            }),
        }
    }
}
