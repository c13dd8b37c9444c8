use async_trait::async_trait;
use uuid::Uuid;

use crate::{db::error::DbResult, models::SiteBackup};

#[async_trait]
pub trait BackupRepo: Send + Sync {
    /// Backups of a site with status `Success` and files still `Available`,
    /// newest first.
    async fn list_retainable(&self, site_id: Uuid) -> DbResult<Vec<SiteBackup>>;

    /// Move a backup's files availability to `Unavailable`.
    ///
    /// Returns `false` if it was already unavailable or does not exist.
    async fn mark_unavailable(&self, id: Uuid) -> DbResult<bool>;
}
