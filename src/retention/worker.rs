//! Background workers, one per sweep type.
//!
//! Every worker logs its configuration, then loops: run the sweep under its
//! lease, log the result, sleep for the interval. Run errors are logged and
//! counted; the worker carries on at the next interval. Workers exit when
//! the shutdown token is cancelled.

use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::{
    ArtifactSweeper, BackupSweepResult, BaggageSweepResult, BaggageSweeper, DeletionReconciler,
    LogRetentionSweeper, LogSweepResult, ReconcileResult, SweepError, SweepKind, SweepLease,
};
use crate::{
    config::RetentionConfig, db::DbPool, observability::metrics, storage::ObjectStoreClient,
};

/// Run one sweep under its lease and record the outcome.
///
/// Returns `Ok(None)` when the lease is held by another process.
pub async fn run_sweep<T, F, Fut>(
    lease: &SweepLease,
    kind: SweepKind,
    sweep: F,
) -> Result<Option<T>, SweepError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, SweepError>>,
{
    let start = std::time::Instant::now();
    let result = lease.run_exclusive(kind, sweep).await;
    let outcome = match &result {
        Ok(Some(_)) => "success",
        Ok(None) => "skipped",
        Err(_) => "error",
    };
    metrics::record_sweep_run(kind.lease_name(), outcome, start.elapsed().as_secs_f64());
    result
}

async fn sweep_loop<T, F, Fut>(
    kind: SweepKind,
    interval: Duration,
    lease: SweepLease,
    shutdown: CancellationToken,
    mut sweep: F,
    report: impl Fn(&T),
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SweepError>>,
{
    loop {
        match run_sweep(&lease, kind, || sweep()).await {
            Ok(Some(result)) => report(&result),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(sweep = %kind, error = %e, "Error running sweep");
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!(sweep = %kind, "Sweep worker stopped");
}

fn dry_run_suffix(dry_run: bool) -> &'static str {
    if dry_run { " (DRY RUN)" } else { "" }
}

/// Starts the backup retention worker.
pub async fn start_backup_retention_worker(
    db: Arc<DbPool>,
    client: ObjectStoreClient,
    config: RetentionConfig,
    lease: SweepLease,
    shutdown: CancellationToken,
) {
    let backups = config.backups;
    if !backups.enabled {
        tracing::info!("Backup retention worker disabled by configuration");
        return;
    }

    let dry_run = config.safety.dry_run;
    tracing::info!(
        interval_hours = backups.interval_hours,
        offsite_keep_count = backups.offsite_keep_count,
        local_retention_hours = ?backups.local_retention_hours,
        site_concurrency = backups.site_concurrency,
        backend = client.backend_name(),
        dry_run,
        "Starting backup retention worker{}",
        dry_run_suffix(dry_run)
    );

    let interval = backups.interval();
    let sweeper = ArtifactSweeper::new(db, client, backups, dry_run);
    let sweeper = &sweeper;
    sweep_loop(
        sweeper.kind(),
        interval,
        lease,
        shutdown,
        move || sweeper.run(Utc::now()),
        report_backup_sweep,
    )
    .await;
}

pub fn report_backup_sweep(result: &BackupSweepResult) {
    if result.has_changes() || result.dry_run {
        tracing::info!(
            sites = result.sites_scanned,
            local_retired = result.local_retired,
            offsite_retired = result.offsite_retired,
            remote_files_retired = result.remote_files_retired,
            delete_calls = result.delete_calls,
            object_errors = result.object_errors,
            skipped_missing = result.skipped_missing,
            skipped_empty_path = result.skipped_empty_path,
            dry_run = result.dry_run,
            "Backup retention run complete{}",
            dry_run_suffix(result.dry_run)
        );
    } else {
        tracing::debug!(sites = result.sites_scanned, "Backup retention run complete, nothing expired");
    }
}

/// Starts the provisioning baggage removal worker.
pub async fn start_baggage_worker(
    db: Arc<DbPool>,
    config: RetentionConfig,
    lease: SweepLease,
    shutdown: CancellationToken,
) {
    let baggage = config.baggage;
    if !baggage.enabled {
        tracing::info!("Baggage removal worker disabled by configuration");
        return;
    }

    let dry_run = config.safety.dry_run;
    tracing::info!(
        interval_hours = baggage.interval_hours,
        min_site_age_hours = baggage.min_site_age_hours,
        store_expiry_hours = baggage.store_expiry_hours,
        expiry_margin_hours = baggage.expiry_margin_hours(),
        dry_run,
        "Starting baggage removal worker{}",
        dry_run_suffix(dry_run)
    );

    let interval = baggage.interval();
    let sweeper = BaggageSweeper::new(db, baggage, dry_run);
    let sweeper = &sweeper;
    sweep_loop(
        sweeper.kind(),
        interval,
        lease,
        shutdown,
        move || sweeper.run(Utc::now()),
        report_baggage_sweep,
    )
    .await;
}

pub fn report_baggage_sweep(result: &BaggageSweepResult) {
    if result.sites_matched > 0 {
        tracing::info!(
            sites = result.sites_matched,
            references_cleared = result.references_cleared,
            dry_run = result.dry_run,
            "Baggage removal run complete{}",
            dry_run_suffix(result.dry_run)
        );
    } else {
        tracing::debug!("Baggage removal run complete, no sites to clean");
    }
}

/// Starts the operational log retention worker.
pub async fn start_log_retention_worker(
    db: Arc<DbPool>,
    config: RetentionConfig,
    lease: SweepLease,
    shutdown: CancellationToken,
) {
    let logs = config.logs;
    if !logs.enabled {
        tracing::info!("Log retention worker disabled by configuration");
        return;
    }
    if !logs.windows.has_any_retention() {
        tracing::info!("Log retention worker enabled but every window is 0");
        return;
    }

    let dry_run = config.safety.dry_run;
    tracing::info!(
        interval_hours = logs.interval_hours,
        site_uptime_log_days = logs.windows.site_uptime_log_days,
        site_request_log_days = logs.windows.site_request_log_days,
        site_job_log_days = logs.windows.site_job_log_days,
        batch_size = config.safety.batch_size,
        max_deletes_per_run = config.safety.max_deletes_per_run,
        dry_run,
        "Starting log retention worker{}",
        dry_run_suffix(dry_run)
    );

    let interval = logs.interval();
    let sweeper = LogRetentionSweeper::new(db, logs, config.safety);
    let sweeper = &sweeper;
    sweep_loop(
        sweeper.kind(),
        interval,
        lease,
        shutdown,
        move || sweeper.run(Utc::now()),
        report_log_sweep,
    )
    .await;
}

pub fn report_log_sweep(result: &LogSweepResult) {
    if result.total() > 0 || !result.failed.is_empty() {
        let counts = result
            .deleted
            .iter()
            .map(|(kind, n)| format!("{kind}={n}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(
            total = result.total(),
            deleted = %counts,
            failed_kinds = result.failed.len(),
            dry_run = result.dry_run,
            "Log retention run complete{}",
            dry_run_suffix(result.dry_run)
        );
    } else {
        tracing::debug!("Log retention run complete, no rows to delete");
    }
}

/// Starts the deletion reconciliation worker.
pub async fn start_reconcile_worker(
    db: Arc<DbPool>,
    client: ObjectStoreClient,
    config: RetentionConfig,
    lease: SweepLease,
    shutdown: CancellationToken,
) {
    let reconcile = config.reconcile;
    if !reconcile.enabled {
        tracing::info!("Deletion reconcile worker disabled by configuration");
        return;
    }

    let dry_run = config.safety.dry_run;
    tracing::info!(
        interval_minutes = reconcile.interval_minutes,
        reconcile_after_minutes = reconcile.reconcile_after_minutes,
        batch_size = reconcile.batch_size,
        backend = client.backend_name(),
        dry_run,
        "Starting deletion reconcile worker{}",
        dry_run_suffix(dry_run)
    );

    let interval = reconcile.interval();
    let reconciler = DeletionReconciler::new(db, client, reconcile, dry_run);
    let reconciler = &reconciler;
    sweep_loop(
        reconciler.kind(),
        interval,
        lease,
        shutdown,
        move || reconciler.run(Utc::now()),
        report_reconcile,
    )
    .await;
}

pub fn report_reconcile(result: &ReconcileResult) {
    if result.checked > 0 {
        tracing::info!(
            checked = result.checked,
            confirmed = result.confirmed,
            redispatched = result.redispatched,
            check_failed = result.check_failed,
            dry_run = result.dry_run,
            "Deletion reconcile run complete{}",
            dry_run_suffix(result.dry_run)
        );
    } else {
        tracing::debug!("Deletion reconcile run complete, nothing pending");
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::{LogRetentionConfig, LogRetentionWindows},
        db::tests::{fixtures::Fixtures, harness::create_sqlite_db},
        models::LogKind,
    };

    fn lease(db: &DbPool) -> SweepLease {
        SweepLease::with_holder(db.leases(), Uuid::new_v4(), ChronoDuration::minutes(5))
    }

    #[tokio::test]
    async fn test_log_worker_runs_then_stops_on_shutdown() {
        let (db, fx) = create_sqlite_db().await;
        let db = Arc::new(db);
        let now = Utc::now();
        fx.insert_log(LogKind::SiteJobLog, now - ChronoDuration::days(30)).await;
        fx.insert_log(LogKind::SiteJobLog, now - ChronoDuration::hours(1)).await;

        let config = RetentionConfig {
            logs: LogRetentionConfig {
                enabled: true,
                windows: LogRetentionWindows::default(),
                ..Default::default()
            },
            ..Default::default()
        };
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(start_log_retention_worker(
            db.clone(),
            config,
            lease(&db),
            shutdown.clone(),
        ));

        let logs = db.operational_logs();
        let later = now + ChronoDuration::days(1);
        for _ in 0..100 {
            if logs.count_before(LogKind::SiteJobLog, later).await.unwrap() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(logs.count_before(LogKind::SiteJobLog, later).await.unwrap(), 1);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_disabled_worker_returns_immediately() {
        let (db, _) = create_sqlite_db().await;
        let db = Arc::new(db);
        let shutdown = CancellationToken::new();

        tokio::time::timeout(
            Duration::from_secs(1),
            start_baggage_worker(db.clone(), RetentionConfig::default(), lease(&db), shutdown),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_run_sweep_skips_when_lease_is_held() {
        let (db, _) = create_sqlite_db().await;
        assert!(
            db.leases()
                .acquire("log_retention", Uuid::new_v4(), Utc::now(), ChronoDuration::minutes(5))
                .await
                .unwrap()
        );

        let out = run_sweep(&lease(&db), SweepKind::LogRetention, || async { Ok(1) })
            .await
            .unwrap();
        assert_eq!(out, None);
    }
}
