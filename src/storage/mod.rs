//! Offsite object store access.
//!
//! Backup artifacts live in a durable object store. This module exposes a
//! small trait over the two operations the retention sweeps need, bulk delete
//! and existence checks, with two backends:
//!
//! - **S3**: AWS S3 and S3-compatible services (`s3-storage` feature)
//! - **Filesystem**: keys resolved under a local directory
//!
//! [`ObjectStoreClient`] wraps a backend with chunking and per-call timeouts.

pub(crate) mod client;
mod filesystem;
#[cfg(feature = "s3-storage")]
mod s3;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
pub use client::{DeleteRun, ObjectStoreClient};
pub use filesystem::FilesystemObjectStore;
#[cfg(feature = "s3-storage")]
pub use s3::S3ObjectStore;
use thiserror::Error;
use tracing::info;

use crate::config::{ObjectStoreBackend, ObjectStoreConfig};

/// Errors that can occur during object store operations.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Object store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// A key the store reported it could not delete within an otherwise
/// successful bulk call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFailure {
    pub key: String,
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Outcome of one successful bulk delete call.
#[derive(Debug, Clone, Default)]
pub struct BatchDeleteOutcome {
    /// Per-object errors. The call itself succeeded.
    pub failed: Vec<ObjectFailure>,
}

impl BatchDeleteOutcome {
    /// Keys out of `sent` that the provider did not report an error for.
    ///
    /// Providers may repeat a key in their error list, so this never
    /// goes below zero.
    pub fn deleted_count(&self, sent: usize) -> usize {
        sent.saturating_sub(self.failed.len())
    }
}

/// Trait for pluggable object store backends.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Delete every key in one provider call.
    ///
    /// Callers never pass more than [`crate::config::MAX_DELETE_BATCH`] keys.
    /// Deleting a key that does not exist is a success.
    async fn delete_objects(&self, keys: &[String]) -> ObjectStoreResult<BatchDeleteOutcome>;

    /// Check whether an object is still present.
    async fn exists(&self, key: &str) -> ObjectStoreResult<bool>;

    /// Get the backend type name (for logging/metrics).
    fn backend_name(&self) -> &'static str;
}

/// Create an object store backend from configuration.
pub async fn create_object_store(
    config: &ObjectStoreConfig,
) -> ObjectStoreResult<Arc<dyn ObjectStore>> {
    match config.backend {
        ObjectStoreBackend::Filesystem => {
            let fs_config = config.filesystem.clone().ok_or_else(|| {
                ObjectStoreError::Config(
                    "Filesystem backend requires [storage.offsite.filesystem] config".to_string(),
                )
            })?;
            info!(path = %fs_config.path, "Using filesystem object store backend");
            Ok(Arc::new(FilesystemObjectStore::new(fs_config)))
        }
        #[cfg(feature = "s3-storage")]
        ObjectStoreBackend::S3 => {
            let s3_config = config.s3.clone().ok_or_else(|| {
                ObjectStoreError::Config(
                    "S3 backend requires [storage.offsite.s3] config".to_string(),
                )
            })?;
            info!(bucket = %s3_config.bucket, "Using S3 object store backend");
            Ok(Arc::new(S3ObjectStore::new(s3_config).await))
        }
        #[cfg(not(feature = "s3-storage"))]
        ObjectStoreBackend::S3 => Err(ObjectStoreError::Config(
            "S3 object store backend requires the 's3-storage' feature. \
                Rebuild with: cargo build --features s3-storage"
                .to_string(),
        )),
    }
}

/// Build a chunking client for the configured offsite store.
pub async fn create_client(config: &ObjectStoreConfig) -> ObjectStoreResult<ObjectStoreClient> {
    let store = create_object_store(config).await?;
    Ok(ObjectStoreClient::new(
        store,
        config.max_batch_size,
        config.request_timeout(),
    ))
}
