//! Offsite object store configuration.
//!
//! Offsite backup artifacts live in an S3-compatible bucket. A filesystem
//! backend is available for single-host deployments and local testing.
//!
//! # Example Configuration
//!
//! ```toml
//! [storage.offsite]
//! backend = "s3"
//! max_batch_size = 1000
//! request_timeout_secs = 60
//!
//! [storage.offsite.s3]
//! bucket = "site-backups"
//! region = "ap-south-1"
//! access_key_id = "${BACKUP_ACCESS_KEY}"
//! secret_access_key = "${BACKUP_SECRET_KEY}"
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Hard limit on keys per bulk delete call imposed by S3-compatible stores.
pub const MAX_DELETE_BATCH: usize = 1000;

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Object store holding offsite backup artifacts.
    /// Required by the backup sweep and the reconciler.
    #[serde(default)]
    pub offsite: Option<ObjectStoreConfig>,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.offsite {
            Some(offsite) => offsite.validate().map_err(ConfigError::Validation),
            None => Ok(()),
        }
    }
}

/// Object store backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectStoreConfig {
    /// Storage backend to use.
    #[serde(default)]
    pub backend: ObjectStoreBackend,

    /// S3 configuration (required when backend = "s3").
    #[serde(default)]
    pub s3: Option<S3StorageConfig>,

    /// Filesystem configuration (required when backend = "filesystem").
    #[serde(default)]
    pub filesystem: Option<FilesystemStorageConfig>,

    /// Keys per bulk delete call. Capped at 1000.
    /// Default: 1000
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Timeout applied to each bulk delete or existence check, in seconds.
    /// Default: 60
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_batch_size() -> usize {
    MAX_DELETE_BATCH
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl ObjectStoreConfig {
    /// Validate the storage configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_batch_size == 0 || self.max_batch_size > MAX_DELETE_BATCH {
            return Err(format!(
                "storage.offsite.max_batch_size must be between 1 and {MAX_DELETE_BATCH}"
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err("storage.offsite.request_timeout_secs must be greater than 0".to_string());
        }
        match self.backend {
            ObjectStoreBackend::S3 => match &self.s3 {
                Some(s3) => s3.validate(),
                None => Err(
                    "S3 storage backend requires [storage.offsite.s3] configuration".to_string(),
                ),
            },
            ObjectStoreBackend::Filesystem => match &self.filesystem {
                Some(fs) => fs.validate(),
                None => Err(
                    "Filesystem storage backend requires [storage.offsite.filesystem] configuration"
                        .to_string(),
                ),
            },
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStoreBackend {
    /// S3-compatible object storage (AWS S3, MinIO, R2, Spaces, ...).
    #[default]
    S3,

    /// Objects are files under a base directory.
    Filesystem,
}

/// S3-compatible object storage configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3StorageConfig {
    /// S3 bucket name.
    pub bucket: String,

    /// AWS region (e.g., "ap-south-1").
    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint URL for S3-compatible services.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Access key ID. Falls back to the default AWS credential chain.
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Secret access key. Falls back to the default AWS credential chain.
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Use path-style URLs instead of virtual-hosted style.
    /// Required for MinIO and some S3-compatible services.
    #[serde(default)]
    pub force_path_style: bool,
}

impl std::fmt::Debug for S3StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3StorageConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field(
                "access_key_id",
                &self.access_key_id.as_ref().map(|_| "****"),
            )
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "****"),
            )
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl S3StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.is_empty() {
            return Err("S3 bucket name cannot be empty".to_string());
        }
        if self.region.is_none() && self.endpoint.is_none() {
            return Err("S3 requires either 'region' or 'endpoint' to be specified".to_string());
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(
                "S3 'access_key_id' and 'secret_access_key' must be configured together"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Local filesystem object store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesystemStorageConfig {
    /// Base directory. Object keys resolve to `{path}/{key}`.
    pub path: String,
}

impl FilesystemStorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.path.is_empty() {
            return Err("Filesystem storage path cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s3_config_parse() {
        let toml = r#"
            backend = "s3"
            max_batch_size = 500

            [s3]
            bucket = "site-backups"
            region = "ap-south-1"
        "#;
        let config: ObjectStoreConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.backend, ObjectStoreBackend::S3);
        assert_eq!(config.max_batch_size, 500);
        assert_eq!(config.request_timeout(), std::time::Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_size_capped() {
        let toml = r#"
            backend = "filesystem"
            max_batch_size = 1001

            [filesystem]
            path = "/tmp/offsite"
        "#;
        let config: ObjectStoreConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("max_batch_size"));
    }

    #[test]
    fn test_s3_backend_requires_section() {
        let config: ObjectStoreConfig = toml::from_str(r#"backend = "s3""#).unwrap();
        assert!(config.validate().unwrap_err().contains("[storage.offsite.s3]"));
    }

    #[test]
    fn test_s3_requires_region_or_endpoint() {
        let s3 = S3StorageConfig {
            bucket: "b".into(),
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        };
        assert!(s3.validate().is_err());
        let s3 = S3StorageConfig {
            endpoint: Some("http://localhost:9000".into()),
            ..s3
        };
        assert!(s3.validate().is_ok());
    }

    #[test]
    fn test_s3_partial_credentials_rejected() {
        let s3 = S3StorageConfig {
            bucket: "b".into(),
            region: Some("ap-south-1".into()),
            endpoint: None,
            access_key_id: Some("AKIA".into()),
            secret_access_key: None,
            force_path_style: false,
        };
        assert!(s3.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let s3 = S3StorageConfig {
            bucket: "b".into(),
            region: Some("ap-south-1".into()),
            endpoint: None,
            access_key_id: Some("AKIAEXAMPLE".into()),
            secret_access_key: Some("very-secret".into()),
            force_path_style: false,
        };
        let debug = format!("{:?}", s3);
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("AKIAEXAMPLE"));
        assert!(debug.contains("****"));
    }
}
