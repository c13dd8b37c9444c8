//! Prometheus metrics for the retention sweeps.
//!
//! Provides metrics for:
//! - Sweep runs, outcomes and durations
//! - Records retired and log rows deleted
//! - Object store delete calls and per-object errors
//! - Deletion reconciliation outcomes
//!
//! Every recording function is a no-op without the `prometheus` feature.

#[cfg(feature = "prometheus")]
use metrics::{counter, histogram};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;

/// Initialize the metrics system and start the scrape listener.
///
/// Must be called from within a Tokio runtime.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    let addr: std::net::SocketAddr = config
        .listen_address
        .parse()
        .map_err(|e| MetricsError::Setup(format!("invalid metrics listen address: {e}")))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Suffix("_duration_seconds".to_string()),
            &config.duration_buckets_secs,
        )
        .map_err(|e| MetricsError::Setup(e.to_string()))?
        .install()?;

    tracing::info!(address = %addr, "Prometheus metrics listener started");
    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if config.enabled {
        tracing::warn!("Metrics enabled in config but the 'prometheus' feature is not compiled in");
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Sweep Metrics
// ─────────────────────────────────────────────────────────────────────────────

/// Record a completed sweep run.
///
/// # Arguments
/// * `sweep` - The sweep name (e.g., "backup_retention", "log_retention")
/// * `outcome` - "success", "error" or "skipped" (lease held elsewhere)
/// * `duration_secs` - Wall time of the run
pub fn record_sweep_run(sweep: &str, outcome: &str, duration_secs: f64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "retention_sweep_runs_total",
            "sweep" => sweep.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
        histogram!(
            "retention_sweep_duration_seconds",
            "sweep" => sweep.to_string()
        )
        .record(duration_secs);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (sweep, outcome, duration_secs);
    }
}

/// Record rows deleted by the log retention sweep.
///
/// # Arguments
/// * `kind` - The log kind (e.g., "site_uptime_log")
/// * `count` - The number of rows deleted
pub fn record_retention_deletion(kind: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "retention_deletions_total",
            "kind" => kind.to_string()
        )
        .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (kind, count);
    }
}

/// Record records moved to `Unavailable`.
///
/// # Arguments
/// * `entity` - "local_backup", "offsite_backup" or "remote_file"
/// * `count` - The number of records transitioned
pub fn record_records_retired(entity: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "retention_records_retired_total",
            "entity" => entity.to_string()
        )
        .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (entity, count);
    }
}

/// Record site reference fields cleared by the baggage sweep.
pub fn record_baggage_cleared(count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("retention_baggage_references_cleared_total").increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = count;
    }
}

/// Record records skipped because they were inconsistent.
///
/// # Arguments
/// * `sweep` - The sweep that skipped the record
/// * `reason` - e.g. "missing_remote_file", "empty_file_path", "exists_check_failed"
pub fn record_skipped_record(sweep: &str, reason: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "retention_skipped_records_total",
            "sweep" => sweep.to_string(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (sweep, reason);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Object Store Metrics
// ─────────────────────────────────────────────────────────────────────────────

/// Record one bulk delete call against the object store.
pub fn record_object_delete_call(backend: &str, keys: u64, success: bool) {
    #[cfg(feature = "prometheus")]
    {
        let result = if success { "success" } else { "error" };
        counter!(
            "retention_object_delete_calls_total",
            "backend" => backend.to_string(),
            "result" => result
        )
        .increment(1);
        counter!(
            "retention_object_delete_keys_total",
            "backend" => backend.to_string(),
            "result" => result
        )
        .increment(keys);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (backend, keys, success);
    }
}

/// Record per-object errors reported inside successful bulk delete calls.
pub fn record_object_delete_errors(backend: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "retention_object_delete_errors_total",
            "backend" => backend.to_string()
        )
        .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (backend, count);
    }
}

/// Record reconciler outcomes.
///
/// # Arguments
/// * `outcome` - "confirmed", "redispatched" or "check_failed"
/// * `count` - Number of remote files with that outcome
pub fn record_reconcile(outcome: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "retention_reconcile_files_total",
            "outcome" => outcome.to_string()
        )
        .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (outcome, count);
    }
}

/// Metrics initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
