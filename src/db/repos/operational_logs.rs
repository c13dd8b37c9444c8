use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{db::error::DbResult, models::LogKind};

#[async_trait]
pub trait OperationalLogRepo: Send + Sync {
    /// Count rows of `kind` last modified before `cutoff`.
    async fn count_before(&self, kind: LogKind, cutoff: DateTime<Utc>) -> DbResult<u64>;

    /// Delete rows of `kind` last modified before `cutoff`.
    ///
    /// Deletes in batches to avoid locking the table.
    /// Returns the total number of rows deleted.
    async fn delete_before(
        &self,
        kind: LogKind,
        cutoff: DateTime<Utc>,
        batch_size: u32,
        max_deletes: u64,
    ) -> DbResult<u64>;
}
