use std::{future::Future, sync::Arc, sync::OnceLock, time::Duration as StdDuration};

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::SweepError;
use crate::db::LeaseRepo;

/// The sweep types, each guarded by its own lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepKind {
    BackupRetention,
    BaggageRemoval,
    LogRetention,
    DeletionReconcile,
}

impl SweepKind {
    pub const ALL: [SweepKind; 4] = [
        SweepKind::BackupRetention,
        SweepKind::BaggageRemoval,
        SweepKind::LogRetention,
        SweepKind::DeletionReconcile,
    ];

    /// Lease name; also used as the `sweep` metrics label.
    pub fn lease_name(&self) -> &'static str {
        match self {
            SweepKind::BackupRetention => "backup_retention",
            SweepKind::BaggageRemoval => "baggage_removal",
            SweepKind::LogRetention => "log_retention",
            SweepKind::DeletionReconcile => "deletion_reconcile",
        }
    }
}

impl std::fmt::Display for SweepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.lease_name())
    }
}

static PROCESS_HOLDER: OnceLock<Uuid> = OnceLock::new();

/// Lease holder id of this process, generated on first use.
pub fn process_holder_id() -> Uuid {
    *PROCESS_HOLDER.get_or_init(Uuid::new_v4)
}

/// Runs sweeps under a named database lease so that only one process
/// executes a given sweep type at a time.
#[derive(Clone)]
pub struct SweepLease {
    repo: Arc<dyn LeaseRepo>,
    holder: Uuid,
    ttl: Duration,
}

impl SweepLease {
    pub fn new(repo: Arc<dyn LeaseRepo>, ttl: Duration) -> Self {
        Self::with_holder(repo, process_holder_id(), ttl)
    }

    pub fn with_holder(repo: Arc<dyn LeaseRepo>, holder: Uuid, ttl: Duration) -> Self {
        Self { repo, holder, ttl }
    }

    pub fn holder(&self) -> Uuid {
        self.holder
    }

    /// How often a running sweep extends its lease: a third of the TTL.
    fn renew_every(&self) -> StdDuration {
        (self.ttl / 3)
            .to_std()
            .unwrap_or(StdDuration::ZERO)
            .max(StdDuration::from_millis(100))
    }

    /// Extend the lease until it is lost. Only returns once another holder
    /// owns it; renewal errors are logged and retried.
    async fn keep_alive(&self, name: &'static str) {
        let mut ticker = tokio::time::interval(self.renew_every());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match self.repo.acquire(name, self.holder, Utc::now(), self.ttl).await {
                Ok(true) => tracing::trace!(lease = name, "Sweep lease renewed"),
                Ok(false) => {
                    tracing::error!(
                        lease = name,
                        holder = %self.holder,
                        "Sweep lease taken over by another holder, stopping run"
                    );
                    return;
                }
                Err(e) => tracing::warn!(lease = name, error = %e, "Failed to renew sweep lease"),
            }
        }
    }

    /// Run `sweep` while holding the lease for `kind`.
    ///
    /// Returns `Ok(None)` without running anything when another holder owns
    /// an unexpired lease. While the sweep runs the lease is renewed every
    /// third of its TTL; if another holder takes it over anyway the sweep is
    /// dropped and [`SweepError::LeaseLost`] returned. The lease is released
    /// after the sweep finishes, whether or not it succeeded; a failed
    /// release is left to expire.
    pub async fn run_exclusive<T, F, Fut>(
        &self,
        kind: SweepKind,
        sweep: F,
    ) -> Result<Option<T>, SweepError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SweepError>>,
    {
        let name = kind.lease_name();
        let acquired = self
            .repo
            .acquire(name, self.holder, Utc::now(), self.ttl)
            .await?;
        if !acquired {
            tracing::info!(
                lease = name,
                holder = %self.holder,
                "Sweep lease held by another process, skipping run"
            );
            return Ok(None);
        }

        tracing::debug!(lease = name, holder = %self.holder, "Sweep lease acquired");
        let result = tokio::select! {
            result = sweep() => result,
            () = self.keep_alive(name) => Err(SweepError::LeaseLost { sweep: name }),
        };

        match self.repo.release(name, self.holder).await {
            Ok(true) => tracing::debug!(lease = name, "Sweep lease released"),
            Ok(false) => tracing::warn!(lease = name, "Sweep lease was no longer held at release"),
            Err(e) => tracing::warn!(
                lease = name,
                error = %e,
                "Failed to release sweep lease, it will expire on its own"
            ),
        }

        result.map(Some)
    }
}
