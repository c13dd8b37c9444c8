use std::{collections::HashSet, sync::Arc, time::Duration};

use tracing::{debug, warn};

use super::{ObjectFailure, ObjectStore, ObjectStoreError, ObjectStoreResult};
use crate::{config::MAX_DELETE_BATCH, observability::metrics};

/// Result of [`ObjectStoreClient::delete_keys`].
#[derive(Debug, Default)]
pub struct DeleteRun {
    /// Keys whose chunk call succeeded, in input order.
    pub dispatched: Vec<String>,
    /// Number of provider calls issued, including a failed one.
    pub calls: usize,
    /// Per-object errors reported inside successful calls.
    pub object_errors: Vec<ObjectFailure>,
    /// The call failure that stopped the run, if any.
    pub error: Option<ObjectStoreError>,
    /// Keys of the failed chunk and every chunk after it.
    pub not_dispatched: Vec<String>,
}

impl DeleteRun {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Chunking, timeout-bounded front end to an [`ObjectStore`].
#[derive(Clone)]
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    max_batch_size: usize,
    timeout: Duration,
}

impl ObjectStoreClient {
    /// `max_batch_size` is clamped to `1..=1000`.
    pub fn new(store: Arc<dyn ObjectStore>, max_batch_size: usize, timeout: Duration) -> Self {
        Self {
            store,
            max_batch_size: max_batch_size.clamp(1, MAX_DELETE_BATCH),
            timeout,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Delete `keys` in ordered chunks of at most `max_batch_size`.
    ///
    /// Duplicate keys are sent once. Chunks run one after another; the first
    /// failed or timed out call ends the run and neither it nor any later
    /// chunk is reported as dispatched.
    pub async fn delete_keys(&self, keys: &[String]) -> DeleteRun {
        let mut seen = HashSet::with_capacity(keys.len());
        let keys: Vec<String> = keys
            .iter()
            .filter(|k| seen.insert(*k))
            .cloned()
            .collect();

        let backend = self.store.backend_name();
        let mut run = DeleteRun::default();
        let mut chunks = keys.chunks(self.max_batch_size);

        while let Some(chunk) = chunks.next() {
            run.calls += 1;
            match self.delete_chunk(chunk).await {
                Ok(outcome) => {
                    debug!(
                        backend,
                        keys = chunk.len(),
                        deleted = outcome.deleted_count(chunk.len()),
                        object_errors = outcome.failed.len(),
                        "Bulk delete call succeeded"
                    );
                    metrics::record_object_delete_call(backend, chunk.len() as u64, true);
                    for failure in &outcome.failed {
                        warn!(
                            backend,
                            key = %failure.key,
                            code = failure.code.as_deref().unwrap_or("unknown"),
                            message = failure.message.as_deref().unwrap_or(""),
                            "Object store reported a per-object delete error"
                        );
                    }
                    if !outcome.failed.is_empty() {
                        metrics::record_object_delete_errors(backend, outcome.failed.len() as u64);
                    }
                    run.object_errors.extend(outcome.failed);
                    run.dispatched.extend_from_slice(chunk);
                }
                Err(e) => {
                    warn!(
                        backend,
                        keys = chunk.len(),
                        error = %e,
                        "Bulk delete call failed, stopping object store phase"
                    );
                    metrics::record_object_delete_call(backend, chunk.len() as u64, false);
                    run.not_dispatched.extend_from_slice(chunk);
                    for rest in chunks.by_ref() {
                        run.not_dispatched.extend_from_slice(rest);
                    }
                    run.error = Some(e);
                    break;
                }
            }
        }

        run
    }

    async fn delete_chunk(
        &self,
        chunk: &[String],
    ) -> ObjectStoreResult<super::BatchDeleteOutcome> {
        tokio::time::timeout(self.timeout, self.store.delete_objects(chunk))
            .await
            .map_err(|_| ObjectStoreError::Timeout(self.timeout))?
    }

    /// Check whether `key` is still present, bounded by the request timeout.
    pub async fn exists(&self, key: &str) -> ObjectStoreResult<bool> {
        tokio::time::timeout(self.timeout, self.store.exists(key))
            .await
            .map_err(|_| ObjectStoreError::Timeout(self.timeout))?
    }
}
