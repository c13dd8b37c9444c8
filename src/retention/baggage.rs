//! Provisioning baggage removal.
//!
//! Sites that are no longer managed keep references to the files they were
//! provisioned from. Once a site is older than `min_site_age_hours` those
//! references are cleared. The objects themselves are left to the store's
//! lifecycle expiry, so this sweep never calls the object store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::{SweepError, lease::SweepKind};
use crate::{config::BaggageConfig, db::DbPool, observability::metrics};

/// Results from a single baggage sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BaggageSweepResult {
    pub sites_matched: u64,
    pub references_cleared: u64,
    pub dry_run: bool,
}

pub struct BaggageSweeper {
    db: Arc<DbPool>,
    config: BaggageConfig,
    dry_run: bool,
}

impl BaggageSweeper {
    pub fn new(db: Arc<DbPool>, config: BaggageConfig, dry_run: bool) -> Self {
        Self {
            db,
            config,
            dry_run,
        }
    }

    pub fn kind(&self) -> SweepKind {
        SweepKind::BaggageRemoval
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<BaggageSweepResult, SweepError> {
        let cutoff = now - Duration::hours(i64::from(self.config.min_site_age_hours));
        let candidates = self.db.sites().list_baggage_candidates(cutoff).await?;

        let mut result = BaggageSweepResult {
            sites_matched: candidates.len() as u64,
            dry_run: self.dry_run,
            ..Default::default()
        };

        for site in candidates {
            for (field, value) in &site.references {
                if self.dry_run {
                    tracing::info!(
                        site_id = %site.site_id,
                        status = site.status.as_str(),
                        field = field.column(),
                        value = %value,
                        "DRY RUN: Would clear provisioning file reference"
                    );
                    continue;
                }
                if self.db.sites().clear_file_reference(site.site_id, *field).await? {
                    result.references_cleared += 1;
                }
            }
            tracing::debug!(
                site_id = %site.site_id,
                status = site.status.as_str(),
                fields = site.references.len(),
                "Processed site baggage"
            );
        }

        if result.references_cleared > 0 {
            metrics::record_baggage_cleared(result.references_cleared);
        }
        Ok(result)
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use super::*;
    use crate::{
        db::tests::{
            fixtures::{Fixtures, TestSite},
            harness::create_sqlite_db,
        },
        models::{SiteFileField, SiteStatus},
    };

    fn sweeper(db: &Arc<DbPool>, dry_run: bool) -> BaggageSweeper {
        BaggageSweeper::new(db.clone(), BaggageConfig::default(), dry_run)
    }

    #[tokio::test]
    async fn test_old_archived_site_cleared() {
        let (db, fx) = create_sqlite_db().await;
        let db = Arc::new(db);
        let now = Utc::now();

        let old = TestSite::new(SiteStatus::Archived, now - Duration::hours(13))
            .with_reference(SiteFileField::RemoteDatabaseFile, "uploads/db.sql.gz")
            .with_reference(SiteFileField::PublicFile, "uploads/public.tar");
        let young = TestSite::new(SiteStatus::Archived, now - Duration::hours(11))
            .with_reference(SiteFileField::RemoteDatabaseFile, "uploads/young.sql.gz");
        fx.insert_site(&old).await;
        fx.insert_site(&young).await;

        let result = sweeper(&db, false).run(now).await.unwrap();
        assert_eq!(result.sites_matched, 1);
        assert_eq!(result.references_cleared, 2);

        for field in SiteFileField::ALL {
            assert_eq!(fx.site_reference(old.id, field).await, None);
        }
        assert_eq!(
            fx.site_reference(young.id, SiteFileField::RemoteDatabaseFile)
                .await
                .as_deref(),
            Some("uploads/young.sql.gz")
        );
    }

    #[tokio::test]
    async fn test_managed_sites_untouched() {
        let (db, fx) = create_sqlite_db().await;
        let db = Arc::new(db);
        let now = Utc::now();

        let mut managed = Vec::new();
        for status in SiteStatus::MANAGED {
            let site = TestSite::new(status, now - Duration::days(30))
                .with_reference(SiteFileField::RemoteConfigFile, "uploads/config.json");
            fx.insert_site(&site).await;
            managed.push(site);
        }
        let suspended = TestSite::new(SiteStatus::Suspended, now - Duration::days(30))
            .with_reference(SiteFileField::RemoteConfigFile, "uploads/config.json");
        fx.insert_site(&suspended).await;

        let result = sweeper(&db, false).run(now).await.unwrap();
        assert_eq!(result.sites_matched, 1);
        assert_eq!(result.references_cleared, 1);

        for site in &managed {
            assert!(
                fx.site_reference(site.id, SiteFileField::RemoteConfigFile)
                    .await
                    .is_some(),
                "{:?}",
                site.status
            );
        }
    }

    #[tokio::test]
    async fn test_dry_run_keeps_references() {
        let (db, fx) = create_sqlite_db().await;
        let db = Arc::new(db);
        let now = Utc::now();
        let site = TestSite::new(SiteStatus::Inactive, now - Duration::days(2))
            .with_reference(SiteFileField::PrivateFile, "uploads/private.tar");
        fx.insert_site(&site).await;

        let result = sweeper(&db, true).run(now).await.unwrap();
        assert_eq!(result.sites_matched, 1);
        assert_eq!(result.references_cleared, 0);
        assert!(
            fx.site_reference(site.id, SiteFileField::PrivateFile)
                .await
                .is_some()
        );

        // A real run afterwards clears it, and the next run finds nothing.
        assert_eq!(sweeper(&db, false).run(now).await.unwrap().references_cleared, 1);
        assert_eq!(sweeper(&db, false).run(now).await.unwrap().sites_matched, 0);
    }
}
