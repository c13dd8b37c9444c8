//! Retention sweeps for backups, provisioning baggage and operational logs.
//!
//! Four sweep types run independently, each on its own interval and under
//! its own [`SweepLease`]:
//! 1. Backup retention: retire expired local backups, delete the payloads
//!    of offsite backups beyond the keep count
//! 2. Baggage removal: clear provisioning file references from sites that
//!    are no longer managed
//! 3. Log retention: batched deletion of old operational log rows
//! 4. Deletion reconciliation: confirm that dispatched deletes took effect
//!
//! Every sweep supports dry-run mode, which logs its decisions without
//! writing to the database or calling the object store.

mod baggage;
mod error;
mod lease;
mod logs;
pub mod policy;
mod reconcile;
mod sweeper;
mod worker;

pub use baggage::{BaggageSweepResult, BaggageSweeper};
pub use error::SweepError;
pub use lease::{SweepKind, SweepLease, process_holder_id};
pub use logs::{LogRetentionSweeper, LogSweepResult};
pub use policy::{PolicyError, RetentionDecision, RetentionThresholds};
pub use reconcile::{DeletionReconciler, ReconcileResult};
pub use sweeper::{ArtifactSweeper, BackupSweepResult};
pub use worker::{
    report_backup_sweep, report_baggage_sweep, report_log_sweep, report_reconcile, run_sweep,
    start_backup_retention_worker, start_baggage_worker, start_log_retention_worker,
    start_reconcile_worker,
};
