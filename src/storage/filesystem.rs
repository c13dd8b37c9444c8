use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{BatchDeleteOutcome, ObjectFailure, ObjectStore, ObjectStoreError, ObjectStoreResult};
use crate::config::FilesystemStorageConfig;

/// Filesystem object store backend.
///
/// Objects are files stored as `{base_path}/{key}`. Keys may contain `/` but
/// must stay inside the base directory.
pub struct FilesystemObjectStore {
    config: FilesystemStorageConfig,
}

impl FilesystemObjectStore {
    pub fn new(config: FilesystemStorageConfig) -> Self {
        Self { config }
    }

    fn object_path(&self, key: &str) -> ObjectStoreResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        Ok(Path::new(&self.config.path).join(relative))
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    #[instrument(skip(self, keys), fields(keys = keys.len()))]
    async fn delete_objects(&self, keys: &[String]) -> ObjectStoreResult<BatchDeleteOutcome> {
        let mut outcome = BatchDeleteOutcome::default();

        for key in keys {
            let path = match self.object_path(key) {
                Ok(path) => path,
                Err(e) => {
                    outcome.failed.push(ObjectFailure {
                        key: key.clone(),
                        code: Some("InvalidKey".to_string()),
                        message: Some(e.to_string()),
                    });
                    continue;
                }
            };

            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Object deleted from filesystem"),
                // Idempotent - not an error if already gone
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => outcome.failed.push(ObjectFailure {
                    key: key.clone(),
                    code: Some(format!("{:?}", e.kind())),
                    message: Some(e.to_string()),
                }),
            }
        }

        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn exists(&self, key: &str) -> ObjectStoreResult<bool> {
        let path = self.object_path(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
