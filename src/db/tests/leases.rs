//! Shared tests for LeaseRepo implementations

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::RepoTestContext;

const LEASE: &str = "backup_retention";

pub async fn test_acquire_free_lease(ctx: &RepoTestContext<'_>) {
    let repo = ctx.db.leases();
    let holder = Uuid::new_v4();

    let acquired = repo
        .acquire(LEASE, holder, Utc::now(), Duration::minutes(10))
        .await
        .expect("Failed to acquire");
    assert!(acquired);
}

pub async fn test_second_holder_blocked_until_expiry(ctx: &RepoTestContext<'_>) {
    let repo = ctx.db.leases();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let now = Utc::now();
    let ttl = Duration::minutes(10);

    assert!(repo.acquire(LEASE, first, now, ttl).await.unwrap());
    assert!(
        !repo
            .acquire(LEASE, second, now + Duration::minutes(5), ttl)
            .await
            .unwrap()
    );
    assert!(
        repo.acquire(LEASE, second, now + Duration::minutes(11), ttl)
            .await
            .unwrap(),
        "expired lease can be taken over"
    );
    // The original holder lost it
    assert!(
        !repo
            .acquire(LEASE, first, now + Duration::minutes(12), ttl)
            .await
            .unwrap()
    );
}

pub async fn test_holder_can_renew(ctx: &RepoTestContext<'_>) {
    let repo = ctx.db.leases();
    let holder = Uuid::new_v4();
    let now = Utc::now();

    assert!(repo.acquire(LEASE, holder, now, Duration::minutes(10)).await.unwrap());
    assert!(
        repo.acquire(LEASE, holder, now + Duration::minutes(1), Duration::minutes(10))
            .await
            .unwrap()
    );
}

pub async fn test_release(ctx: &RepoTestContext<'_>) {
    let repo = ctx.db.leases();
    let holder = Uuid::new_v4();
    let other = Uuid::new_v4();
    let now = Utc::now();

    assert!(repo.acquire(LEASE, holder, now, Duration::hours(1)).await.unwrap());
    assert!(!repo.release(LEASE, other).await.unwrap(), "only the holder releases");
    assert!(repo.release(LEASE, holder).await.unwrap());
    assert!(repo.acquire(LEASE, other, now, Duration::hours(1)).await.unwrap());
}

pub async fn test_leases_are_independent_by_name(ctx: &RepoTestContext<'_>) {
    let repo = ctx.db.leases();
    let now = Utc::now();

    assert!(repo.acquire(LEASE, Uuid::new_v4(), now, Duration::hours(1)).await.unwrap());
    assert!(
        repo.acquire("log_retention", Uuid::new_v4(), now, Duration::hours(1))
            .await
            .unwrap()
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

    sqlite_test!(test_acquire_free_lease);
    sqlite_test!(test_second_holder_blocked_until_expiry);
    sqlite_test!(test_holder_can_renew);
    sqlite_test!(test_release);
    sqlite_test!(test_leases_are_independent_by_name);
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

    postgres_test!(test_acquire_free_lease);
    postgres_test!(test_second_holder_blocked_until_expiry);
    postgres_test!(test_holder_can_renew);
    postgres_test!(test_release);
    postgres_test!(test_leases_are_independent_by_name);
}
