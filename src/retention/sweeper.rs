//! Backup artifact sweep.
//!
//! Each run evaluates the retention policy for every non-archived site,
//! retires expired local backups, deletes the object store payloads of
//! expired offsite backups and records the outcome.
//!
//! An expired offsite backup is marked `Unavailable` only once every remote
//! file it references has been handled (delete dispatched, already retired,
//! or skipped as inconsistent). When a bulk delete call fails, backups with
//! undispatched keys stay `Available`, so the next run selects them again
//! and retries just those keys.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use uuid::Uuid;

use super::{
    SweepError,
    lease::SweepKind,
    policy::{self, RetentionThresholds},
};
use crate::{
    config::BackupRetentionConfig,
    db::DbPool,
    models::{RemoteFileStatus, SiteBackup},
    observability::metrics,
    storage::ObjectStoreClient,
};

const SWEEP: &str = "backup_retention";

/// Results from a single backup sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackupSweepResult {
    pub sites_scanned: u64,
    /// Sites whose records could not be read or evaluated.
    pub sites_failed: u64,
    pub local_retired: u64,
    pub offsite_retired: u64,
    pub remote_files_retired: u64,
    pub keys_dispatched: u64,
    pub delete_calls: u64,
    /// Per-object errors reported inside successful delete calls.
    pub object_errors: u64,
    pub skipped_missing: u64,
    pub skipped_empty_path: u64,
    pub skipped_already_retired: u64,
    /// Keys left for the next run after a failed delete call.
    pub keys_pending: u64,
    pub dry_run: bool,
}

impl BackupSweepResult {
    pub fn has_changes(&self) -> bool {
        self.local_retired + self.offsite_retired + self.remote_files_retired > 0
    }
}

/// Expired backups found for one site.
#[derive(Default)]
struct SiteOutcome {
    local_retired: u64,
    expired_offsite: Vec<SiteBackup>,
}

/// Orchestrates policy evaluation, object deletion and status updates for
/// backup artifacts.
pub struct ArtifactSweeper {
    db: Arc<DbPool>,
    client: ObjectStoreClient,
    config: BackupRetentionConfig,
    dry_run: bool,
}

impl ArtifactSweeper {
    pub fn new(
        db: Arc<DbPool>,
        client: ObjectStoreClient,
        config: BackupRetentionConfig,
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
        SweepKind::BackupRetention
    }

    /// Run one sweep as of `now`.
    ///
    /// Configuration problems fail before anything is changed. A failed
    /// delete call ends the object store phase and is reported as
    /// [`SweepError::Incomplete`] after the dispatched part has been recorded.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<BackupSweepResult, SweepError> {
        let thresholds = RetentionThresholds::new(
            self.config.offsite_keep_count,
            self.config.resolve_local_retention_hours()?,
        )?;

        let mut result = BackupSweepResult {
            dry_run: self.dry_run,
            ..Default::default()
        };

        let site_ids = self.db.sites().list_unarchived_ids().await?;
        result.sites_scanned = site_ids.len() as u64;

        let outcomes: Vec<(Uuid, Result<SiteOutcome, SweepError>)> = stream::iter(site_ids)
            .map(|site_id| async move { (site_id, self.sweep_site(site_id, thresholds, now).await) })
            .buffer_unordered(self.config.site_concurrency.max(1))
            .collect()
            .await;

        let mut expired_offsite = Vec::new();
        for (site_id, outcome) in outcomes {
            match outcome {
                Ok(outcome) => {
                    result.local_retired += outcome.local_retired;
                    expired_offsite.extend(outcome.expired_offsite);
                }
                Err(e) => {
                    tracing::warn!(site_id = %site_id, error = %e, "Skipping site");
                    result.sites_failed += 1;
                }
            }
        }
        if result.local_retired > 0 && !self.dry_run {
            metrics::record_records_retired("local_backup", result.local_retired);
        }

        if expired_offsite.is_empty() {
            return Ok(result);
        }

        self.retire_offsite(expired_offsite, now, &mut result).await
    }

    /// Evaluate one site and retire its expired local backups.
    async fn sweep_site(
        &self,
        site_id: Uuid,
        thresholds: RetentionThresholds,
        now: DateTime<Utc>,
    ) -> Result<SiteOutcome, SweepError> {
        let backups = self.db.backups().list_retainable(site_id).await?;
        let decision = policy::evaluate(site_id, thresholds, now, &backups)?;

        let mut outcome = SiteOutcome::default();
        for backup in &decision.expired_local {
            if self.dry_run {
                tracing::info!(
                    site_id = %site_id,
                    backup_id = %backup.id,
                    created_at = %backup.created_at,
                    "DRY RUN: Would mark local backup unavailable"
                );
                continue;
            }
            if self.db.backups().mark_unavailable(backup.id).await? {
                outcome.local_retired += 1;
            }
        }

        if !decision.expired_offsite.is_empty() {
            tracing::debug!(
                site_id = %site_id,
                expired = decision.expired_offsite.len(),
                keep = thresholds.offsite_keep_count(),
                "Offsite backups beyond keep count"
            );
        }
        outcome.expired_offsite = decision.expired_offsite;
        Ok(outcome)
    }

    async fn retire_offsite(
        &self,
        backups: Vec<SiteBackup>,
        now: DateTime<Utc>,
        result: &mut BackupSweepResult,
    ) -> Result<BackupSweepResult, SweepError> {
        let remote_ids: BTreeSet<Uuid> = backups.iter().flat_map(|b| b.remote_file_ids()).collect();

        // Remote files that need no further work this run.
        let mut handled: HashSet<Uuid> = HashSet::new();
        // Storage path -> remote files sharing it.
        let mut by_path: BTreeMap<String, Vec<Uuid>> = BTreeMap::new();

        for id in remote_ids {
            let Some(file) = self.db.remote_files().get_by_id(id).await? else {
                tracing::warn!(remote_file_id = %id, "Backup references a missing remote file");
                metrics::record_skipped_record(SWEEP, "missing_remote_file");
                result.skipped_missing += 1;
                handled.insert(id);
                continue;
            };
            if file.status == RemoteFileStatus::Unavailable {
                result.skipped_already_retired += 1;
                handled.insert(id);
                continue;
            }
            if file.file_path.trim().is_empty() {
                tracing::warn!(remote_file_id = %id, "Remote file has an empty storage path");
                metrics::record_skipped_record(SWEEP, "empty_file_path");
                result.skipped_empty_path += 1;
                handled.insert(id);
                continue;
            }
            by_path.entry(file.file_path).or_default().push(id);
        }

        if self.dry_run {
            for (path, ids) in &by_path {
                tracing::info!(key = %path, remote_files = ids.len(), "DRY RUN: Would delete object");
            }
            for backup in &backups {
                tracing::info!(
                    site_id = %backup.site_id,
                    backup_id = %backup.id,
                    created_at = %backup.created_at,
                    "DRY RUN: Would mark offsite backup unavailable"
                );
            }
            return Ok(result.clone());
        }

        let keys: Vec<String> = by_path.keys().cloned().collect();
        let run = self.client.delete_keys(&keys).await;
        result.delete_calls = run.calls as u64;
        result.object_errors = run.object_errors.len() as u64;
        result.keys_dispatched = run.dispatched.len() as u64;
        result.keys_pending = run.not_dispatched.len() as u64;

        for key in &run.dispatched {
            for id in by_path.get(key).into_iter().flatten() {
                if self.db.remote_files().mark_delete_dispatched(*id, now).await? {
                    result.remote_files_retired += 1;
                }
                handled.insert(*id);
            }
        }
        if result.remote_files_retired > 0 {
            metrics::record_records_retired("remote_file", result.remote_files_retired);
        }

        for backup in &backups {
            if !backup.remote_file_ids().all(|id| handled.contains(&id)) {
                continue;
            }
            if self.db.backups().mark_unavailable(backup.id).await? {
                result.offsite_retired += 1;
            }
        }
        if result.offsite_retired > 0 {
            metrics::record_records_retired("offsite_backup", result.offsite_retired);
        }

        match run.error {
            None => Ok(result.clone()),
            Some(e) => {
                tracing::warn!(
                    error = %e,
                    dispatched = result.keys_dispatched,
                    pending = result.keys_pending,
                    offsite_retired = result.offsite_retired,
                    "Object store phase stopped early, remaining keys deferred to next run"
                );
                Err(SweepError::Incomplete {
                    sweep: SWEEP,
                    pending: run.not_dispatched.len(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
