//! Retention configuration for backups, provisioning baggage and logs.
//!
//! Every sweep runs on its own interval and can be enabled independently.
//!
//! # Example
//!
//! ```toml
//! [retention.backups]
//! enabled = true
//! interval_hours = 6
//! offsite_keep_count = 30
//! bench_configuration = '{"keep_backups_for_hours": 24}'
//!
//! [retention.baggage]
//! enabled = true
//! min_site_age_hours = 12
//! store_expiry_hours = 24
//!
//! [retention.logs]
//! enabled = true
//!
//! [retention.logs.windows]
//! site_uptime_log_days = 10
//! site_request_log_days = 10
//! site_job_log_days = 1
//!
//! [retention.safety]
//! dry_run = false
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::models::LogKind;

/// Retention configuration for all sweeps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Backup artifact retention.
    #[serde(default)]
    pub backups: BackupRetentionConfig,

    /// Removal of provisioning file references from unmanaged sites.
    #[serde(default)]
    pub baggage: BaggageConfig,

    /// Operational log retention.
    #[serde(default)]
    pub logs: LogRetentionConfig,

    /// Verification of dispatched object deletions.
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Mutual exclusion between sweep runs.
    #[serde(default)]
    pub lease: LeaseConfig,

    /// Safety settings to prevent accidental data loss.
    #[serde(default)]
    pub safety: RetentionSafety,
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backups.validate()?;
        self.baggage.validate()?;
        self.reconcile.validate()?;
        self.lease.validate()?;
        if self.safety.batch_size == 0 {
            return Err(ConfigError::Validation(
                "retention.safety.batch_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backups
// ─────────────────────────────────────────────────────────────────────────────

/// Backup retention configuration.
///
/// Offsite backups are retained by count, local backups by age.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupRetentionConfig {
    /// Whether the backup retention worker runs.
    /// Default: false (must be explicitly enabled)
    #[serde(default)]
    pub enabled: bool,

    /// How often to run the sweep (in hours).
    /// Default: 24
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Number of most recent offsite backups to keep per site.
    /// Must be at least 1.
    /// Default: 30
    #[serde(default = "default_offsite_keep_count")]
    pub offsite_keep_count: u32,

    /// Hours to keep local backups before marking them unavailable.
    /// Takes precedence over `bench_configuration`.
    #[serde(default)]
    pub local_retention_hours: Option<u32>,

    /// JSON blob shared with the bench agents. Its `keep_backups_for_hours`
    /// key is used when `local_retention_hours` is not set.
    #[serde(default)]
    pub bench_configuration: Option<String>,

    /// Number of sites evaluated concurrently.
    /// Default: 8
    #[serde(default = "default_site_concurrency")]
    pub site_concurrency: usize,
}

impl Default for BackupRetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: default_interval_hours(),
            offsite_keep_count: default_offsite_keep_count(),
            local_retention_hours: None,
            bench_configuration: None,
            site_concurrency: default_site_concurrency(),
        }
    }
}

fn default_interval_hours() -> u64 {
    24
}

fn default_offsite_keep_count() -> u32 {
    30
}

fn default_site_concurrency() -> usize {
    8
}

const DEFAULT_LOCAL_RETENTION_HOURS: u32 = 24;

impl BackupRetentionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.offsite_keep_count == 0 {
            return Err(ConfigError::Validation(
                "retention.backups.offsite_keep_count must be at least 1".into(),
            ));
        }
        if self.site_concurrency == 0 {
            return Err(ConfigError::Validation(
                "retention.backups.site_concurrency must be at least 1".into(),
            ));
        }
        self.resolve_local_retention_hours()?;
        Ok(())
    }

    /// Resolve the local retention window.
    ///
    /// Order: explicit `local_retention_hours`, then `keep_backups_for_hours`
    /// from `bench_configuration`, then 24. `null` and `0` in the blob mean
    /// 24; an unparseable blob or a value that is not a non-negative whole
    /// number of hours is an error.
    pub fn resolve_local_retention_hours(&self) -> Result<u32, ConfigError> {
        let hours = match (self.local_retention_hours, &self.bench_configuration) {
            (Some(hours), _) => hours,
            (None, Some(blob)) => {
                let value: serde_json::Value = serde_json::from_str(blob).map_err(|e| {
                    ConfigError::Validation(format!(
                        "retention.backups.bench_configuration is not valid JSON: {e}"
                    ))
                })?;
                match value.get("keep_backups_for_hours") {
                    None | Some(serde_json::Value::Null) => DEFAULT_LOCAL_RETENTION_HOURS,
                    Some(v) => match v.as_u64().map(u32::try_from) {
                        // 0 means "unset" in the provisioning blob.
                        Some(Ok(0)) => DEFAULT_LOCAL_RETENTION_HOURS,
                        Some(Ok(hours)) => hours,
                        _ => {
                            return Err(ConfigError::Validation(format!(
                                "retention.backups.bench_configuration keep_backups_for_hours \
                                 must be a whole number of hours, got {v}"
                            )));
                        }
                    },
                }
            }
            (None, None) => DEFAULT_LOCAL_RETENTION_HOURS,
        };

        if hours == 0 {
            return Err(ConfigError::Validation(
                "retention.backups.local_retention_hours must be greater than 0".into(),
            ));
        }
        Ok(hours)
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_hours * 3600)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Baggage
// ─────────────────────────────────────────────────────────────────────────────

/// Provisioning baggage removal.
///
/// References are cleared once a site has been unmanaged for
/// `min_site_age_hours`; the object store's own lifecycle rule deletes the
/// bytes after `store_expiry_hours`. The first must be smaller than the
/// second so references never outlive the objects they point to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaggageConfig {
    /// Default: false
    #[serde(default)]
    pub enabled: bool,

    /// Default: 1
    #[serde(default = "default_baggage_interval_hours")]
    pub interval_hours: u64,

    /// Minimum age of a site before its references are cleared.
    /// Default: 12
    #[serde(default = "default_min_site_age_hours")]
    pub min_site_age_hours: u32,

    /// Expiry applied by the object store's lifecycle policy to provisioning
    /// uploads. Not enforced here, only used to validate the margin.
    /// Default: 24
    #[serde(default = "default_store_expiry_hours")]
    pub store_expiry_hours: u32,
}

impl Default for BaggageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: default_baggage_interval_hours(),
            min_site_age_hours: default_min_site_age_hours(),
            store_expiry_hours: default_store_expiry_hours(),
        }
    }
}

fn default_baggage_interval_hours() -> u64 {
    1
}

fn default_min_site_age_hours() -> u32 {
    12
}

fn default_store_expiry_hours() -> u32 {
    24
}

impl BaggageConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_site_age_hours >= self.store_expiry_hours {
            return Err(ConfigError::Validation(format!(
                "retention.baggage.min_site_age_hours ({}) must be smaller than \
                 store_expiry_hours ({})",
                self.min_site_age_hours, self.store_expiry_hours
            )));
        }
        Ok(())
    }

    /// Hours between clearing a reference and the store reclaiming the object.
    pub fn expiry_margin_hours(&self) -> u32 {
        self.store_expiry_hours
            .saturating_sub(self.min_site_age_hours)
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_hours * 3600)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logs
// ─────────────────────────────────────────────────────────────────────────────

/// Operational log retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogRetentionConfig {
    /// Default: false
    #[serde(default)]
    pub enabled: bool,

    /// Default: 24
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    #[serde(default)]
    pub windows: LogRetentionWindows,
}

impl Default for LogRetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: default_interval_hours(),
            windows: LogRetentionWindows::default(),
        }
    }
}

impl LogRetentionConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_hours * 3600)
    }
}

/// Days to keep each log kind. Set to 0 to keep a kind forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogRetentionWindows {
    /// Default: 10
    #[serde(default = "default_log_days")]
    pub site_uptime_log_days: u32,

    /// Default: 10
    #[serde(default = "default_log_days")]
    pub site_request_log_days: u32,

    /// Default: 10
    #[serde(default = "default_log_days")]
    pub site_job_log_days: u32,
}

impl Default for LogRetentionWindows {
    fn default() -> Self {
        Self {
            site_uptime_log_days: default_log_days(),
            site_request_log_days: default_log_days(),
            site_job_log_days: default_log_days(),
        }
    }
}

fn default_log_days() -> u32 {
    10
}

impl LogRetentionWindows {
    pub fn days_for(&self, kind: LogKind) -> u32 {
        match kind {
            LogKind::SiteUptimeLog => self.site_uptime_log_days,
            LogKind::SiteRequestLog => self.site_request_log_days,
            LogKind::SiteJobLog => self.site_job_log_days,
        }
    }

    pub fn has_any_retention(&self) -> bool {
        LogKind::ALL.iter().any(|kind| self.days_for(*kind) > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reconciliation
// ─────────────────────────────────────────────────────────────────────────────

/// Confirms that objects whose delete was dispatched are gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Default: false
    #[serde(default)]
    pub enabled: bool,

    /// Default: 60
    #[serde(default = "default_reconcile_interval_minutes")]
    pub interval_minutes: u64,

    /// Minimum time since dispatch before a file is checked, giving the store
    /// time to settle.
    /// Default: 60
    #[serde(default = "default_reconcile_after_minutes")]
    pub reconcile_after_minutes: u32,

    /// Maximum number of files checked per run.
    /// Default: 1000
    #[serde(default = "default_reconcile_batch_size")]
    pub batch_size: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: default_reconcile_interval_minutes(),
            reconcile_after_minutes: default_reconcile_after_minutes(),
            batch_size: default_reconcile_batch_size(),
        }
    }
}

fn default_reconcile_interval_minutes() -> u64 {
    60
}

fn default_reconcile_after_minutes() -> u32 {
    60
}

fn default_reconcile_batch_size() -> u32 {
    1000
}

impl ReconcileConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Validation(
                "retention.reconcile.batch_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_minutes * 60)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lease
// ─────────────────────────────────────────────────────────────────────────────

/// Sweep lease configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeaseConfig {
    /// How long a lease is held before another process may take it over.
    /// Must exceed the longest expected sweep run.
    /// Default: 3600
    #[serde(default = "default_lease_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_lease_ttl_secs(),
        }
    }
}

fn default_lease_ttl_secs() -> u64 {
    3600
}

impl LeaseConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "retention.lease.ttl_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs as i64)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Safety
// ─────────────────────────────────────────────────────────────────────────────

/// Safety settings for retention operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionSafety {
    /// If true, log what would be deleted without changing anything.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// Maximum number of log rows deleted per kind per run.
    /// Set to 0 for unlimited.
    /// Default: 100000
    #[serde(default = "default_max_deletes_per_run")]
    pub max_deletes_per_run: u64,

    /// Batch size for log row deletion.
    /// Default: 1000
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl Default for RetentionSafety {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_deletes_per_run: default_max_deletes_per_run(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_max_deletes_per_run() -> u64 {
    100_000
}

fn default_batch_size() -> u32 {
    1000
}

impl RetentionSafety {
    /// `max_deletes_per_run` with 0 mapped to unlimited.
    pub fn max_deletes(&self) -> u64 {
        if self.max_deletes_per_run == 0 {
            u64::MAX
        } else {
            self.max_deletes_per_run
        }
    }
}
