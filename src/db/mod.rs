mod error;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, any(feature = "database-sqlite", feature = "database-postgres")))]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    sites: Arc<dyn SiteRepo>,
    backups: Arc<dyn BackupRepo>,
    remote_files: Arc<dyn RemoteFileRepo>,
    operational_logs: Arc<dyn OperationalLogRepo>,
    leases: Arc<dyn LeaseRepo>,
}

impl CachedRepos {
    #[cfg(feature = "database-sqlite")]
    fn sqlite(pool: &sqlx::SqlitePool) -> Self {
        Self {
            sites: Arc::new(sqlite::SqliteSiteRepo::new(pool.clone())),
            backups: Arc::new(sqlite::SqliteBackupRepo::new(pool.clone())),
            remote_files: Arc::new(sqlite::SqliteRemoteFileRepo::new(pool.clone())),
            operational_logs: Arc::new(sqlite::SqliteOperationalLogRepo::new(pool.clone())),
            leases: Arc::new(sqlite::SqliteLeaseRepo::new(pool.clone())),
        }
    }

    #[cfg(feature = "database-postgres")]
    fn postgres(write_pool: &sqlx::PgPool, read_pool: &Option<sqlx::PgPool>) -> Self {
        Self {
            sites: Arc::new(postgres::PostgresSiteRepo::new(
                write_pool.clone(),
                read_pool.clone(),
            )),
            backups: Arc::new(postgres::PostgresBackupRepo::new(
                write_pool.clone(),
                read_pool.clone(),
            )),
            remote_files: Arc::new(postgres::PostgresRemoteFileRepo::new(
                write_pool.clone(),
                read_pool.clone(),
            )),
            operational_logs: Arc::new(postgres::PostgresOperationalLogRepo::new(
                write_pool.clone(),
                read_pool.clone(),
            )),
            leases: Arc::new(postgres::PostgresLeaseRepo::new(
                write_pool.clone(),
                read_pool.clone(),
            )),
        }
    }
}

/// PostgreSQL pool configuration with optional read replica.
#[cfg(feature = "database-postgres")]
struct PgPoolPair {
    write: sqlx::PgPool,
    read: Option<sqlx::PgPool>,
}

enum PoolStorage {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(feature = "database-postgres")]
    Postgres(PgPoolPair),
    #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
    _None(std::convert::Infallible),
}

/// Database pool supporting both SQLite and PostgreSQL.
///
/// Repositories are cached at construction time to avoid allocation on each access.
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        DbPool {
            repos: CachedRepos::sqlite(&pool),
            inner: PoolStorage::Sqlite(pool),
        }
    }

    /// Create a DbPool from existing PostgreSQL pools.
    /// Primarily useful for testing.
    #[cfg(feature = "database-postgres")]
    pub fn from_postgres(write_pool: sqlx::PgPool, read_pool: Option<sqlx::PgPool>) -> Self {
        DbPool {
            repos: CachedRepos::postgres(&write_pool, &read_pool),
            inner: PoolStorage::Postgres(PgPoolPair {
                write: write_pool,
                read: read_pool,
            }),
        }
    }

    /// Create a database pool from configuration
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.pool_size())
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                let db = Self::from_sqlite(pool);
                if cfg.run_migrations {
                    db.run_migrations().await?;
                }
                Ok(db)
            }
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(cfg) => {
                let write_pool = Self::connect_postgres(cfg, &cfg.url).await?;

                let read_pool = if let Some(read_url) = &cfg.read_url {
                    tracing::info!("Configuring read replica pool");
                    Some(Self::connect_postgres(cfg, read_url).await?)
                } else {
                    None
                };

                let db = Self::from_postgres(write_pool, read_pool);
                if cfg.run_migrations {
                    db.run_migrations().await?;
                }
                Ok(db)
            }
        }
    }

    #[cfg(feature = "database-postgres")]
    async fn connect_postgres(
        cfg: &crate::config::PostgresConfig,
        url: &str,
    ) -> DbResult<sqlx::PgPool> {
        use std::str::FromStr;

        use sqlx::postgres::{PgConnectOptions, PgSslMode};

        use crate::config::PostgresSslMode;

        let ssl_mode = match cfg.ssl_mode {
            PostgresSslMode::Disable => PgSslMode::Disable,
            PostgresSslMode::Prefer => PgSslMode::Prefer,
            PostgresSslMode::Require => PgSslMode::Require,
            PostgresSslMode::VerifyCa => PgSslMode::VerifyCa,
            PostgresSslMode::VerifyFull => PgSslMode::VerifyFull,
        };
        let options = PgConnectOptions::from_str(url)?.ssl_mode(ssl_mode);

        let pool = sqlx::postgres::PgPoolOptions::new()
            .min_connections(cfg.min_connections)
            .max_connections(cfg.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(cfg.connect_timeout_secs))
            .idle_timeout(std::time::Duration::from_secs(cfg.idle_timeout_secs))
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    /// Run database migrations using sqlx's migration runner
    /// This automatically creates and manages a _sqlx_migrations table
    /// Migrations always run on the primary (write) pool.
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Running SQLite migrations");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                tracing::info!("SQLite migrations completed successfully");
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => {
                tracing::info!("Running PostgreSQL migrations");
                sqlx::migrate!("./migrations_sqlx/postgres")
                    .run(&pools.write)
                    .await?;
                tracing::info!("PostgreSQL migrations completed successfully");
                Ok(())
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Get site repository
    pub fn sites(&self) -> Arc<dyn SiteRepo> {
        Arc::clone(&self.repos.sites)
    }

    /// Get site backup repository
    pub fn backups(&self) -> Arc<dyn BackupRepo> {
        Arc::clone(&self.repos.backups)
    }

    /// Get remote file repository
    pub fn remote_files(&self) -> Arc<dyn RemoteFileRepo> {
        Arc::clone(&self.repos.remote_files)
    }

    /// Get operational log repository
    pub fn operational_logs(&self) -> Arc<dyn OperationalLogRepo> {
        Arc::clone(&self.repos.operational_logs)
    }

    /// Get sweep lease repository
    pub fn leases(&self) -> Arc<dyn LeaseRepo> {
        Arc::clone(&self.repos.leases)
    }

    /// Health check for database connectivity
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => {
                sqlx::query("SELECT 1").execute(&pools.write).await?;
                if let Some(read) = &pools.read {
                    sqlx::query("SELECT 1").execute(read).await?;
                }
                Ok(())
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}
