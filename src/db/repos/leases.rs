use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::db::error::DbResult;

#[async_trait]
pub trait LeaseRepo: Send + Sync {
    /// Take the named lease for `holder` until `now + ttl`.
    ///
    /// Succeeds when the lease is free, expired at `now`, or already held by
    /// `holder` (which renews it). Returns `false` when another holder owns
    /// an unexpired lease.
    async fn acquire(
        &self,
        name: &str,
        holder: Uuid,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DbResult<bool>;

    /// Drop the lease if it is still held by `holder`.
    async fn release(&self, name: &str, holder: Uuid) -> DbResult<bool>;
}
