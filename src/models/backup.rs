use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a backup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupStatus {
    Pending,
    Running,
    Success,
    Failure,
}

impl BackupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupStatus::Pending => "Pending",
            BackupStatus::Running => "Running",
            BackupStatus::Success => "Success",
            BackupStatus::Failure => "Failure",
        }
    }
}

impl std::str::FromStr for BackupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(BackupStatus::Pending),
            "Running" => Ok(BackupStatus::Running),
            "Success" => Ok(BackupStatus::Success),
            "Failure" => Ok(BackupStatus::Failure),
            _ => Err(format!("Invalid backup status: {}", s)),
        }
    }
}

/// Whether the files of a backup can still be restored from.
///
/// Only ever moves from `Available` to `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilesAvailability {
    Available,
    Unavailable,
}

impl FilesAvailability {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilesAvailability::Available => "Available",
            FilesAvailability::Unavailable => "Unavailable",
        }
    }
}

impl std::str::FromStr for FilesAvailability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(FilesAvailability::Available),
            "Unavailable" => Ok(FilesAvailability::Unavailable),
            _ => Err(format!("Invalid files availability: {}", s)),
        }
    }
}

/// One backup operation of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteBackup {
    pub id: Uuid,
    pub site_id: Uuid,
    pub status: BackupStatus,
    pub files_availability: FilesAvailability,
    /// `true` when the backup lives in the durable object store rather than
    /// on the host that produced it.
    pub offsite: bool,
    pub remote_database_file: Option<Uuid>,
    pub remote_private_file: Option<Uuid>,
    pub remote_public_file: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl SiteBackup {
    /// Remote file references held by this backup, skipping empty slots.
    pub fn remote_file_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        [
            self.remote_database_file,
            self.remote_private_file,
            self.remote_public_file,
        ]
        .into_iter()
        .flatten()
    }

    pub fn is_retainable(&self) -> bool {
        self.status == BackupStatus::Success
            && self.files_availability == FilesAvailability::Available
    }
}
