//! Shared tests for BackupRepo implementations

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{
    RepoTestContext,
    fixtures::{TestSite, success_backup},
};
use crate::models::{BackupStatus, FilesAvailability, SiteStatus};

async fn create_site(ctx: &RepoTestContext<'_>) -> Uuid {
    let site = TestSite::new(SiteStatus::Active, Utc::now() - Duration::days(30));
    ctx.fixtures.insert_site(&site).await;
    site.id
}

pub async fn test_list_retainable_filters_and_orders(ctx: &RepoTestContext<'_>) {
    let site_id = create_site(ctx).await;
    let other_site = create_site(ctx).await;
    let now = Utc::now();

    let older = success_backup(site_id, true, now - Duration::days(2));
    let newer = success_backup(site_id, false, now - Duration::days(1));
    let failed = {
        let mut b = success_backup(site_id, true, now);
        b.status = BackupStatus::Failure;
        b
    };
    let gone = {
        let mut b = success_backup(site_id, true, now);
        b.files_availability = FilesAvailability::Unavailable;
        b
    };
    let foreign = success_backup(other_site, true, now);
    for backup in [&older, &newer, &failed, &gone, &foreign] {
        ctx.fixtures.insert_backup(backup).await;
    }

    let listed = ctx
        .db
        .backups()
        .list_retainable(site_id)
        .await
        .expect("Failed to list backups");

    let ids: Vec<_> = listed.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
    assert!(!listed[0].offsite);
    assert!(listed[1].offsite);
}

pub async fn test_list_retainable_reads_remote_references(ctx: &RepoTestContext<'_>) {
    let site_id = create_site(ctx).await;
    let mut backup = success_backup(site_id, true, Utc::now());
    backup.remote_database_file = Some(Uuid::new_v4());
    backup.remote_public_file = Some(Uuid::new_v4());
    ctx.fixtures.insert_backup(&backup).await;

    let listed = ctx
        .db
        .backups()
        .list_retainable(site_id)
        .await
        .expect("Failed to list backups");

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, backup.id);
    assert_eq!(listed[0].remote_database_file, backup.remote_database_file);
    assert_eq!(listed[0].remote_private_file, None);
    assert_eq!(listed[0].remote_public_file, backup.remote_public_file);
    assert_eq!(
        listed[0].remote_file_ids().collect::<Vec<_>>(),
        backup.remote_file_ids().collect::<Vec<_>>()
    );
}

pub async fn test_mark_unavailable_is_idempotent(ctx: &RepoTestContext<'_>) {
    let site_id = create_site(ctx).await;
    let backup = success_backup(site_id, true, Utc::now());
    ctx.fixtures.insert_backup(&backup).await;
    let repo = ctx.db.backups();

    assert!(repo.mark_unavailable(backup.id).await.expect("mark failed"));
    assert_eq!(
        ctx.fixtures.backup_availability(backup.id).await,
        FilesAvailability::Unavailable
    );

    assert!(!repo.mark_unavailable(backup.id).await.expect("mark failed"));
    assert!(!repo.mark_unavailable(Uuid::new_v4()).await.expect("mark failed"));
    assert!(repo.list_retainable(site_id).await.unwrap().is_empty());
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

    sqlite_test!(test_list_retainable_filters_and_orders);
    sqlite_test!(test_list_retainable_reads_remote_references);
    sqlite_test!(test_mark_unavailable_is_idempotent);
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

    postgres_test!(test_list_retainable_filters_and_orders);
    postgres_test!(test_list_retainable_reads_remote_references);
    postgres_test!(test_mark_unavailable_is_idempotent);
}
