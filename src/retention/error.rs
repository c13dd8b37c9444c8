use thiserror::Error;

use super::policy::PolicyError;
use crate::{config::ConfigError, db::DbError, storage::ObjectStoreError};

/// Errors that abort a sweep run.
///
/// Per-record problems are logged and counted in the run result instead.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),

    /// Another holder took over the lease while the run was in progress.
    /// The run is stopped at its next await point.
    #[error("{sweep} lease lost during run")]
    LeaseLost { sweep: &'static str },

    /// The object store phase stopped early. Writes made before the failure
    /// stand and the remaining keys are picked up by the next run.
    #[error("{sweep} run incomplete: {pending} keys not dispatched ({reason})")]
    Incomplete {
        sweep: &'static str,
        pending: usize,
        reason: String,
    },
}
