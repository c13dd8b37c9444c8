//! Shared tests for RemoteFileRepo implementations

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{RepoTestContext, fixtures::available_file};
use crate::models::{DeletionState, RemoteFileStatus};

pub async fn test_get_by_id(ctx: &RepoTestContext<'_>) {
    let file = available_file("backups/site-a/db.sql.gz");
    ctx.fixtures.insert_remote_file(&file).await;
    let repo = ctx.db.remote_files();

    let fetched = repo
        .get_by_id(file.id)
        .await
        .expect("Failed to get")
        .expect("File should exist");
    assert_eq!(fetched.file_path, "backups/site-a/db.sql.gz");
    assert_eq!(fetched.status, RemoteFileStatus::Available);
    assert_eq!(fetched.deletion_state, DeletionState::Present);
    assert!(fetched.deletion_dispatched_at.is_none());

    assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

pub async fn test_mark_delete_dispatched(ctx: &RepoTestContext<'_>) {
    let file = available_file("backups/site-a/public.tar");
    ctx.fixtures.insert_remote_file(&file).await;
    let repo = ctx.db.remote_files();
    let at = Utc::now();

    assert!(repo.mark_delete_dispatched(file.id, at).await.unwrap());
    let fetched = repo.get_by_id(file.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, RemoteFileStatus::Unavailable);
    assert_eq!(fetched.deletion_state, DeletionState::DeleteDispatched);
    assert!(fetched.deletion_dispatched_at.is_some());

    // Already unavailable: no-op
    assert!(!repo.mark_delete_dispatched(file.id, at).await.unwrap());
}

pub async fn test_pending_confirmation_respects_age_and_limit(ctx: &RepoTestContext<'_>) {
    let repo = ctx.db.remote_files();
    let now = Utc::now();

    let mut ids = Vec::new();
    for minutes_ago in [180, 120, 90, 5] {
        let file = available_file(&format!("backups/{minutes_ago}.tar"));
        ctx.fixtures.insert_remote_file(&file).await;
        repo.mark_delete_dispatched(file.id, now - Duration::minutes(minutes_ago))
            .await
            .unwrap();
        ids.push(file.id);
    }
    let untouched = available_file("backups/live.tar");
    ctx.fixtures.insert_remote_file(&untouched).await;

    let cutoff = now - Duration::minutes(60);
    let pending = repo.list_pending_confirmation(cutoff, 10).await.unwrap();
    let pending_ids: Vec<_> = pending.iter().map(|f| f.id).collect();
    assert_eq!(pending_ids, ids[..3].to_vec(), "oldest dispatch first");

    let limited = repo.list_pending_confirmation(cutoff, 2).await.unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].id, ids[0]);
}

pub async fn test_confirm_deleted(ctx: &RepoTestContext<'_>) {
    let file = available_file("backups/site-b/db.sql.gz");
    ctx.fixtures.insert_remote_file(&file).await;
    let repo = ctx.db.remote_files();
    let now = Utc::now();

    // Not dispatched yet
    assert!(!repo.confirm_deleted(file.id, now).await.unwrap());

    repo.mark_delete_dispatched(file.id, now - Duration::hours(2))
        .await
        .unwrap();
    assert!(repo.confirm_deleted(file.id, now).await.unwrap());

    let fetched = repo.get_by_id(file.id).await.unwrap().unwrap();
    assert_eq!(fetched.deletion_state, DeletionState::Deleted);
    assert!(fetched.deletion_confirmed_at.is_some());
    assert!(
        repo.list_pending_confirmation(now, 10)
            .await
            .unwrap()
            .is_empty()
    );
}

pub async fn test_touch_delete_dispatched_postpones_check(ctx: &RepoTestContext<'_>) {
    let file = available_file("backups/site-c/db.sql.gz");
    ctx.fixtures.insert_remote_file(&file).await;
    let repo = ctx.db.remote_files();
    let now = Utc::now();

    repo.mark_delete_dispatched(file.id, now - Duration::hours(2))
        .await
        .unwrap();
    assert!(repo.touch_delete_dispatched(file.id, now).await.unwrap());

    let pending = repo
        .list_pending_confirmation(now - Duration::hours(1), 10)
        .await
        .unwrap();
    assert!(pending.is_empty());

    let fetched = repo.get_by_id(file.id).await.unwrap().unwrap();
    assert_eq!(fetched.deletion_state, DeletionState::DeleteDispatched);
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

    sqlite_test!(test_get_by_id);
    sqlite_test!(test_mark_delete_dispatched);
    sqlite_test!(test_pending_confirmation_respects_age_and_limit);
    sqlite_test!(test_confirm_deleted);
    sqlite_test!(test_touch_delete_dispatched_postpones_check);
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

    postgres_test!(test_get_by_id);
    postgres_test!(test_mark_delete_dispatched);
    postgres_test!(test_pending_confirmation_respects_age_and_limit);
    postgres_test!(test_confirm_deleted);
    postgres_test!(test_touch_delete_dispatched_postpones_check);
}
