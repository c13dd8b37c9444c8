//! Shared database repository test infrastructure
//!
//! The same test logic runs against both SQLite and PostgreSQL implementations:
//!
//! - **Unit tests (SQLite)**: Fast, in-memory tests that run with every `cargo test`
//! - **Integration tests (PostgreSQL)**: Slower tests using testcontainers, run with `cargo test -- --ignored`
//!
//! Each repository has a test module (e.g., `backups.rs`) containing shared
//! test functions that take a [`RepoTestContext`], followed by SQLite and
//! PostgreSQL entry points generated by `sqlite_test!` / `postgres_test!`.
//!
//! # Running tests
//!
//! ```bash
//! cargo test                       # Run fast SQLite tests only
//! cargo test -- --ignored          # Run PostgreSQL integration tests (requires Docker)
//! cargo test -- --include-ignored  # Run all tests
//! ```

mod backups;
mod leases;
mod remote_files;
mod sites;

use super::DbPool;
use fixtures::Fixtures;

/// Database under test plus a way to seed rows into it
pub struct RepoTestContext<'a> {
    pub db: &'a DbPool,
    pub fixtures: &'a dyn Fixtures,
}
