use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Logical status of a remote file: whether it still counts as an
/// available copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteFileStatus {
    Available,
    Unavailable,
}

impl RemoteFileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteFileStatus::Available => "Available",
            RemoteFileStatus::Unavailable => "Unavailable",
        }
    }
}

impl std::str::FromStr for RemoteFileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(RemoteFileStatus::Available),
            "Unavailable" => Ok(RemoteFileStatus::Unavailable),
            _ => Err(format!("Invalid remote file status: {}", s)),
        }
    }
}

/// Physical state of the object behind a remote file, tracked separately
/// from [`RemoteFileStatus`] so that a delete the provider silently dropped
/// can be detected and retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionState {
    /// No delete has been issued.
    #[default]
    Present,
    /// A delete call containing this key was accepted by the store.
    DeleteDispatched,
    /// The store confirmed the object no longer exists.
    Deleted,
}

impl DeletionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionState::Present => "present",
            DeletionState::DeleteDispatched => "delete_dispatched",
            DeletionState::Deleted => "deleted",
        }
    }
}

impl std::str::FromStr for DeletionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(DeletionState::Present),
            "delete_dispatched" => Ok(DeletionState::DeleteDispatched),
            "deleted" => Ok(DeletionState::Deleted),
            _ => Err(format!("Invalid deletion state: {}", s)),
        }
    }
}

/// Pointer to one object in the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: Uuid,
    /// Storage key of the object. May be empty on malformed records.
    pub file_path: String,
    pub status: RemoteFileStatus,
    pub deletion_state: DeletionState,
    pub deletion_dispatched_at: Option<DateTime<Utc>>,
    pub deletion_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_state_round_trip() {
        for state in [
            DeletionState::Present,
            DeletionState::DeleteDispatched,
            DeletionState::Deleted,
        ] {
            assert_eq!(state.as_str().parse::<DeletionState>().unwrap(), state);
        }
        assert_eq!(DeletionState::default(), DeletionState::Present);
    }

    #[test]
    fn test_remote_file_status_parse() {
        assert_eq!(
            "Available".parse::<RemoteFileStatus>().unwrap(),
            RemoteFileStatus::Available
        );
        assert!("gone".parse::<RemoteFileStatus>().is_err());
    }
}
