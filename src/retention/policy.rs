//! Backup retention policy.
//!
//! Pure decision logic: given one site's retainable backups and the
//! thresholds, compute which local backups are too old and which offsite
//! backups fall outside the newest `offsite_keep_count`. No I/O.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::SiteBackup;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("offsite keep count must be at least 1")]
    InvalidKeepCount,

    #[error("local retention hours must be greater than 0")]
    InvalidRetentionHours,

    #[error("backup {backup_id} belongs to site {actual}, not {expected}")]
    ForeignBackup {
        backup_id: Uuid,
        expected: Uuid,
        actual: Uuid,
    },

    #[error("backup {0} is not a successful, available backup")]
    NotRetainable(Uuid),
}

/// Validated retention thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionThresholds {
    offsite_keep_count: u32,
    local_retention_hours: u32,
}

impl RetentionThresholds {
    pub fn new(offsite_keep_count: u32, local_retention_hours: u32) -> Result<Self, PolicyError> {
        if offsite_keep_count == 0 {
            return Err(PolicyError::InvalidKeepCount);
        }
        if local_retention_hours == 0 {
            return Err(PolicyError::InvalidRetentionHours);
        }
        Ok(Self {
            offsite_keep_count,
            local_retention_hours,
        })
    }

    pub fn offsite_keep_count(&self) -> u32 {
        self.offsite_keep_count
    }

    pub fn local_retention_hours(&self) -> u32 {
        self.local_retention_hours
    }
}

/// Backups to retire for one site. The two sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetentionDecision {
    /// Local backups older than the retention window, in input order.
    pub expired_local: Vec<SiteBackup>,
    /// Offsite backups beyond the keep count, newest first.
    pub expired_offsite: Vec<SiteBackup>,
}

impl RetentionDecision {
    pub fn is_empty(&self) -> bool {
        self.expired_local.is_empty() && self.expired_offsite.is_empty()
    }
}

/// Decide which of `site_id`'s backups have expired at `now`.
///
/// A local backup expires when it is strictly older than the retention
/// window; one exactly at the threshold is kept. Offsite backups are ordered
/// newest first (ties broken by id, descending) and everything after the
/// first `offsite_keep_count` expires.
pub fn evaluate(
    site_id: Uuid,
    thresholds: RetentionThresholds,
    now: DateTime<Utc>,
    backups: &[SiteBackup],
) -> Result<RetentionDecision, PolicyError> {
    for backup in backups {
        if backup.site_id != site_id {
            return Err(PolicyError::ForeignBackup {
                backup_id: backup.id,
                expected: site_id,
                actual: backup.site_id,
            });
        }
        if !backup.is_retainable() {
            return Err(PolicyError::NotRetainable(backup.id));
        }
    }

    let window = Duration::hours(i64::from(thresholds.local_retention_hours));
    let expired_local = backups
        .iter()
        .filter(|b| !b.offsite && now - b.created_at > window)
        .cloned()
        .collect();

    let mut offsite: Vec<&SiteBackup> = backups.iter().filter(|b| b.offsite).collect();
    offsite.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let expired_offsite = offsite
        .into_iter()
        .skip(thresholds.offsite_keep_count as usize)
        .cloned()
        .collect();

    Ok(RetentionDecision {
        expired_local,
        expired_offsite,
    })
}
