use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a hosted site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteStatus {
    Pending,
    Installing,
    Updating,
    Active,
    Inactive,
    Suspended,
    Broken,
    Archived,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Pending => "Pending",
            SiteStatus::Installing => "Installing",
            SiteStatus::Updating => "Updating",
            SiteStatus::Active => "Active",
            SiteStatus::Inactive => "Inactive",
            SiteStatus::Suspended => "Suspended",
            SiteStatus::Broken => "Broken",
            SiteStatus::Archived => "Archived",
        }
    }

    /// Statuses under which a site is still being managed and its provisioning
    /// files may still be needed.
    pub const MANAGED: [SiteStatus; 5] = [
        SiteStatus::Pending,
        SiteStatus::Installing,
        SiteStatus::Updating,
        SiteStatus::Active,
        SiteStatus::Broken,
    ];

    pub fn is_managed(&self) -> bool {
        Self::MANAGED.contains(self)
    }
}

impl std::str::FromStr for SiteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(SiteStatus::Pending),
            "Installing" => Ok(SiteStatus::Installing),
            "Updating" => Ok(SiteStatus::Updating),
            "Active" => Ok(SiteStatus::Active),
            "Inactive" => Ok(SiteStatus::Inactive),
            "Suspended" => Ok(SiteStatus::Suspended),
            "Broken" => Ok(SiteStatus::Broken),
            "Archived" => Ok(SiteStatus::Archived),
            _ => Err(format!("Invalid site status: {}", s)),
        }
    }
}

/// Provisioning file reference columns carried on a site record.
///
/// The column names are fixed, so they are safe to interpolate into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteFileField {
    DatabaseFile,
    PublicFile,
    PrivateFile,
    RemoteConfigFile,
    RemoteDatabaseFile,
    RemotePublicFile,
    RemotePrivateFile,
}

impl SiteFileField {
    pub const ALL: [SiteFileField; 7] = [
        SiteFileField::DatabaseFile,
        SiteFileField::PublicFile,
        SiteFileField::PrivateFile,
        SiteFileField::RemoteConfigFile,
        SiteFileField::RemoteDatabaseFile,
        SiteFileField::RemotePublicFile,
        SiteFileField::RemotePrivateFile,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            SiteFileField::DatabaseFile => "database_file",
            SiteFileField::PublicFile => "public_file",
            SiteFileField::PrivateFile => "private_file",
            SiteFileField::RemoteConfigFile => "remote_config_file",
            SiteFileField::RemoteDatabaseFile => "remote_database_file",
            SiteFileField::RemotePublicFile => "remote_public_file",
            SiteFileField::RemotePrivateFile => "remote_private_file",
        }
    }
}

/// A site that is no longer managed but still carries provisioning file
/// references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteBaggage {
    pub site_id: Uuid,
    pub status: SiteStatus,
    pub created_at: DateTime<Utc>,
    /// Non-empty reference fields with their current values.
    pub references: Vec<(SiteFileField, String)>,
}
