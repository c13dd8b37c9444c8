//! Shared tests for SiteRepo implementations

use chrono::{Duration, Utc};

use super::{
    RepoTestContext,
    fixtures::TestSite,
};
use crate::models::{SiteFileField, SiteStatus};

pub async fn test_list_unarchived_ids(ctx: &RepoTestContext<'_>) {
    let now = Utc::now();
    let active = TestSite::new(SiteStatus::Active, now - Duration::days(3));
    let suspended = TestSite::new(SiteStatus::Suspended, now - Duration::days(2));
    let archived = TestSite::new(SiteStatus::Archived, now - Duration::days(1));
    for site in [&active, &suspended, &archived] {
        ctx.fixtures.insert_site(site).await;
    }

    let ids = ctx
        .db
        .sites()
        .list_unarchived_ids()
        .await
        .expect("Failed to list sites");

    assert_eq!(ids, vec![active.id, suspended.id]);
}

pub async fn test_baggage_candidates_exclude_managed_statuses(ctx: &RepoTestContext<'_>) {
    let created = Utc::now() - Duration::hours(48);
    for status in SiteStatus::MANAGED {
        let site = TestSite::new(status, created)
            .with_reference(SiteFileField::RemoteDatabaseFile, "uploads/db.sql.gz");
        ctx.fixtures.insert_site(&site).await;
    }
    let archived = TestSite::new(SiteStatus::Archived, created)
        .with_reference(SiteFileField::RemoteDatabaseFile, "uploads/db.sql.gz");
    ctx.fixtures.insert_site(&archived).await;

    let candidates = ctx
        .db
        .sites()
        .list_baggage_candidates(Utc::now() - Duration::hours(12))
        .await
        .expect("Failed to list candidates");

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].site_id, archived.id);
    assert_eq!(candidates[0].status, SiteStatus::Archived);
}

pub async fn test_baggage_candidates_respect_age(ctx: &RepoTestContext<'_>) {
    let now = Utc::now();
    let old = TestSite::new(SiteStatus::Archived, now - Duration::hours(13))
        .with_reference(SiteFileField::RemoteDatabaseFile, "a");
    let young = TestSite::new(SiteStatus::Archived, now - Duration::hours(11))
        .with_reference(SiteFileField::RemoteDatabaseFile, "b");
    ctx.fixtures.insert_site(&old).await;
    ctx.fixtures.insert_site(&young).await;

    let candidates = ctx
        .db
        .sites()
        .list_baggage_candidates(now - Duration::hours(12))
        .await
        .expect("Failed to list candidates");

    let ids: Vec<_> = candidates.iter().map(|c| c.site_id).collect();
    assert_eq!(ids, vec![old.id]);
}

pub async fn test_baggage_candidates_ignore_empty_references(ctx: &RepoTestContext<'_>) {
    let created = Utc::now() - Duration::days(2);
    let clean = TestSite::new(SiteStatus::Inactive, created);
    let blank = TestSite::new(SiteStatus::Inactive, created)
        .with_reference(SiteFileField::PublicFile, "");
    let loaded = TestSite::new(SiteStatus::Inactive, created)
        .with_reference(SiteFileField::PublicFile, "")
        .with_reference(SiteFileField::RemoteConfigFile, "cfg.json")
        .with_reference(SiteFileField::PrivateFile, "private.tar");
    for site in [&clean, &blank, &loaded] {
        ctx.fixtures.insert_site(site).await;
    }

    let candidates = ctx
        .db
        .sites()
        .list_baggage_candidates(Utc::now())
        .await
        .expect("Failed to list candidates");

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].site_id, loaded.id);
    assert_eq!(
        candidates[0].references,
        vec![
            (SiteFileField::PrivateFile, "private.tar".to_string()),
            (SiteFileField::RemoteConfigFile, "cfg.json".to_string()),
        ]
    );
}

pub async fn test_clear_file_reference(ctx: &RepoTestContext<'_>) {
    let site = TestSite::new(SiteStatus::Archived, Utc::now() - Duration::days(1))
        .with_reference(SiteFileField::RemotePublicFile, "public.tar")
        .with_reference(SiteFileField::RemotePrivateFile, "private.tar");
    ctx.fixtures.insert_site(&site).await;
    let repo = ctx.db.sites();

    let cleared = repo
        .clear_file_reference(site.id, SiteFileField::RemotePublicFile)
        .await
        .expect("Failed to clear");
    assert!(cleared);
    assert_eq!(
        ctx.fixtures
            .site_reference(site.id, SiteFileField::RemotePublicFile)
            .await,
        None
    );
    assert_eq!(
        ctx.fixtures
            .site_reference(site.id, SiteFileField::RemotePrivateFile)
            .await,
        Some("private.tar".to_string())
    );

    let again = repo
        .clear_file_reference(site.id, SiteFileField::RemotePublicFile)
        .await
        .expect("Failed to clear");
    assert!(!again, "clearing an empty field is a no-op");
}

pub async fn test_space_only_references_count_as_unset(ctx: &RepoTestContext<'_>) {
    let created = Utc::now() - Duration::days(2);
    let blank = TestSite::new(SiteStatus::Inactive, created)
        .with_reference(SiteFileField::RemoteDatabaseFile, "   ");
    let mixed = TestSite::new(SiteStatus::Inactive, created)
        .with_reference(SiteFileField::RemoteDatabaseFile, "  ")
        .with_reference(SiteFileField::PublicFile, "public.tar");
    ctx.fixtures.insert_site(&blank).await;
    ctx.fixtures.insert_site(&mixed).await;
    let repo = ctx.db.sites();

    let candidates = repo
        .list_baggage_candidates(Utc::now())
        .await
        .expect("Failed to list candidates");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].site_id, mixed.id);
    assert_eq!(
        candidates[0].references,
        vec![(SiteFileField::PublicFile, "public.tar".to_string())]
    );

    let cleared = repo
        .clear_file_reference(blank.id, SiteFileField::RemoteDatabaseFile)
        .await
        .expect("Failed to clear");
    assert!(!cleared);
    assert_eq!(
        ctx.fixtures
            .site_reference(blank.id, SiteFileField::RemoteDatabaseFile)
            .await,
        Some("   ".to_string())
    );
}

// ============================================================================
// SQLite Tests
// ============================================================================

#[cfg(all(test, feature = "database-sqlite"))]
mod sqlite_tests {
    use crate::db::tests::{RepoTestContext, harness::create_sqlite_db};

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let (db, fixtures) = create_sqlite_db().await;
                let ctx = RepoTestContext {
                    db: &db,
                    fixtures: &fixtures,
                };
                super::$name(&ctx).await;
            }
        };
    }

    sqlite_test!(test_list_unarchived_ids);
    sqlite_test!(test_baggage_candidates_exclude_managed_statuses);
    sqlite_test!(test_baggage_candidates_respect_age);
    sqlite_test!(test_baggage_candidates_ignore_empty_references);
    sqlite_test!(test_clear_file_reference);
    sqlite_test!(test_space_only_references_count_as_unset);
}

// ============================================================================
// PostgreSQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(all(test, feature = "database-postgres"))]
mod postgres_tests {
    use crate::db::tests::{RepoTestContext, harness::postgres::create_postgres_db};

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let (db, fixtures) = create_postgres_db().await;
                let ctx = RepoTestContext {
                    db: &db,
                    fixtures: &fixtures,
                };
                super::$name(&ctx).await;
            }
        };
    }

    postgres_test!(test_list_unarchived_ids);
    postgres_test!(test_baggage_candidates_exclude_managed_statuses);
    postgres_test!(test_baggage_candidates_respect_age);
    postgres_test!(test_baggage_candidates_ignore_empty_references);
    postgres_test!(test_clear_file_reference);
    postgres_test!(test_space_only_references_count_as_unset);
}
