use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{db::error::DbResult, models::RemoteFile};

#[async_trait]
pub trait RemoteFileRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<RemoteFile>>;

    /// Mark an available file `Unavailable` with deletion state
    /// `DeleteDispatched`, recording `at` as the dispatch time.
    ///
    /// Returns `false` if the file was not `Available`.
    async fn mark_delete_dispatched(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<bool>;

    /// Refresh the dispatch time of a file whose delete was re-issued.
    async fn touch_delete_dispatched(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<bool>;

    /// Files in `DeleteDispatched` whose dispatch happened before
    /// `dispatched_before`, oldest dispatch first.
    async fn list_pending_confirmation(
        &self,
        dispatched_before: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<RemoteFile>>;

    /// Record that the object is gone from the store.
    ///
    /// Returns `false` if the file was not in `DeleteDispatched`.
    async fn confirm_deleted(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<bool>;
}
