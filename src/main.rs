use std::{process::ExitCode, sync::Arc, time::Duration};

use backup_retention::{
    config::{AppConfig, RetentionSafety},
    db::DbPool,
    observability::{self, metrics},
    retention::{
        self, ArtifactSweeper, BaggageSweeper, DeletionReconciler, LogRetentionSweeper,
        SweepError, SweepKind, SweepLease,
    },
    storage::{self, ObjectStoreClient},
};
use chrono::Utc;
use clap::Parser;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// CLI arguments for the retention service
#[derive(Parser, Debug)]
#[command(version, about = "Backup, baggage and log retention sweeps", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "backup-retention.toml")]
    config: String,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run every enabled sweep on its interval until SIGINT/SIGTERM (default)
    Serve,
    /// Run the backup retention sweep once and exit
    SweepBackups {
        /// Log decisions without changing records or deleting objects
        #[arg(long)]
        dry_run: bool,
    },
    /// Clear provisioning file references from unmanaged sites once and exit
    RemoveBaggage {
        /// Log decisions without changing records
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete expired operational log rows once and exit
    RemoveLogs {
        /// Count matching rows without deleting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Confirm dispatched object deletions once and exit
    Reconcile {
        /// Check existence without changing records or re-issuing deletes
        #[arg(long)]
        dry_run: bool,
    },
    /// Run database migrations and exit
    ///
    /// Useful for Kubernetes init containers or CI/CD pipelines.
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match AppConfig::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(config_file = %args.config, "Configuration loaded");

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::SweepBackups { dry_run } => {
            run_once(config, SweepKind::BackupRetention, dry_run).await
        }
        Command::RemoveBaggage { dry_run } => {
            run_once(config, SweepKind::BaggageRemoval, dry_run).await
        }
        Command::RemoveLogs { dry_run } => run_once(config, SweepKind::LogRetention, dry_run).await,
        Command::Reconcile { dry_run } => {
            run_once(config, SweepKind::DeletionReconcile, dry_run).await
        }
        Command::Migrate => run_migrate(config).await,
    }
}

async fn connect_database(config: &AppConfig) -> Option<Arc<DbPool>> {
    match DbPool::from_config(&config.database).await {
        Ok(pool) => match pool.health_check().await {
            Ok(()) => Some(Arc::new(pool)),
            Err(e) => {
                tracing::error!(error = %e, "Database health check failed");
                None
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            None
        }
    }
}

async fn offsite_client(config: &AppConfig, purpose: &str) -> Option<ObjectStoreClient> {
    let offsite = match config.require_offsite(purpose) {
        Ok(offsite) => offsite,
        Err(e) => {
            tracing::error!(error = %e, "Object store not configured");
            return None;
        }
    };
    match storage::create_client(offsite).await {
        Ok(client) => {
            tracing::info!(
                backend = client.backend_name(),
                max_batch_size = client.max_batch_size(),
                "Object store initialized"
            );
            Some(client)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize object store");
            None
        }
    }
}

/// Run every enabled sweep until a shutdown signal arrives.
async fn run_server(config: AppConfig) -> ExitCode {
    if let Err(e) = metrics::init_metrics(&config.observability.metrics) {
        tracing::error!(error = %e, "Failed to initialize metrics");
        return ExitCode::FAILURE;
    }

    let Some(db) = connect_database(&config).await else {
        return ExitCode::FAILURE;
    };

    let settings = &config.retention;
    let needs_store = settings.backups.enabled || settings.reconcile.enabled;
    let client = if needs_store {
        match offsite_client(&config, "retention.backups / retention.reconcile").await {
            Some(client) => Some(client),
            None => return ExitCode::FAILURE,
        }
    } else {
        None
    };

    if !(settings.backups.enabled
        || settings.baggage.enabled
        || settings.logs.enabled
        || settings.reconcile.enabled)
    {
        tracing::warn!("No sweeps are enabled, nothing to do until shutdown");
    }

    let lease = SweepLease::new(db.leases(), settings.lease.ttl());
    tracing::info!(holder = %lease.holder(), ttl_secs = settings.lease.ttl_secs, "Sweep lease holder");

    let task_tracker = TaskTracker::new();
    let shutdown = CancellationToken::new();

    if let Some(client) = client {
        task_tracker.spawn(retention::start_backup_retention_worker(
            db.clone(),
            client.clone(),
            settings.clone(),
            lease.clone(),
            shutdown.clone(),
        ));
        task_tracker.spawn(retention::start_reconcile_worker(
            db.clone(),
            client,
            settings.clone(),
            lease.clone(),
            shutdown.clone(),
        ));
    }
    task_tracker.spawn(retention::start_baggage_worker(
        db.clone(),
        settings.clone(),
        lease.clone(),
        shutdown.clone(),
    ));
    task_tracker.spawn(retention::start_log_retention_worker(
        db.clone(),
        settings.clone(),
        lease,
        shutdown.clone(),
    ));

    shutdown_signal().await;

    tracing::info!("Shutdown signal received, waiting for running sweeps to complete...");
    shutdown.cancel();
    task_tracker.close();

    match tokio::time::timeout(Duration::from_secs(30), task_tracker.wait()).await {
        Ok(()) => tracing::info!("All sweep workers stopped"),
        Err(_) => {
            tracing::warn!("Timeout waiting for sweep workers, some runs may not have completed")
        }
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Run a single sweep under its lease.
///
/// The sweep's `enabled` flag is not consulted: invoking it explicitly is
/// the opt-in. `--dry-run` adds to `retention.safety.dry_run`, it never
/// turns a configured dry run off.
async fn run_once(config: AppConfig, kind: SweepKind, dry_run: bool) -> ExitCode {
    let Some(db) = connect_database(&config).await else {
        return ExitCode::FAILURE;
    };

    let settings = config.retention.clone();
    let dry_run = dry_run || settings.safety.dry_run;
    let lease = SweepLease::new(db.leases(), settings.lease.ttl());

    tracing::info!(sweep = %kind, dry_run, holder = %lease.holder(), "Running sweep once");

    let result: Result<Option<()>, SweepError> = match kind {
        SweepKind::BackupRetention => {
            let Some(client) = offsite_client(&config, "sweep-backups").await else {
                return ExitCode::FAILURE;
            };
            let sweeper = ArtifactSweeper::new(db, client, settings.backups, dry_run);
            retention::run_sweep(&lease, kind, || sweeper.run(Utc::now()))
                .await
                .map(|r| r.map(|r| retention::report_backup_sweep(&r)))
        }
        SweepKind::BaggageRemoval => {
            let sweeper = BaggageSweeper::new(db, settings.baggage, dry_run);
            retention::run_sweep(&lease, kind, || sweeper.run(Utc::now()))
                .await
                .map(|r| r.map(|r| retention::report_baggage_sweep(&r)))
        }
        SweepKind::LogRetention => {
            let safety = RetentionSafety {
                dry_run,
                ..settings.safety
            };
            let sweeper = LogRetentionSweeper::new(db, settings.logs, safety);
            retention::run_sweep(&lease, kind, || sweeper.run(Utc::now()))
                .await
                .map(|r| r.map(|r| retention::report_log_sweep(&r)))
        }
        SweepKind::DeletionReconcile => {
            let Some(client) = offsite_client(&config, "reconcile").await else {
                return ExitCode::FAILURE;
            };
            let reconciler = DeletionReconciler::new(db, client, settings.reconcile, dry_run);
            retention::run_sweep(&lease, kind, || reconciler.run(Utc::now()))
                .await
                .map(|r| r.map(|r| retention::report_reconcile(&r)))
        }
    };

    match result {
        Ok(Some(())) => ExitCode::SUCCESS,
        Ok(None) => {
            tracing::warn!(sweep = %kind, "Another process holds the sweep lease, nothing was done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(sweep = %kind, error = %e, "Sweep failed");
            eprintln!("Error: {} sweep failed: {}", kind, e);
            ExitCode::FAILURE
        }
    }
}

/// Run database migrations and exit.
async fn run_migrate(config: AppConfig) -> ExitCode {
    tracing::info!("Running database migrations");

    match DbPool::from_config(&config.database).await {
        Ok(pool) => match pool.run_migrations().await {
            Ok(()) => {
                tracing::info!("Database migrations completed successfully");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "Database migrations failed");
                eprintln!("Error: Database migrations failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {}", e);
            ExitCode::FAILURE
        }
    }
}
