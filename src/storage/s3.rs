use async_trait::async_trait;
use aws_sdk_s3::{
    error::DisplayErrorContext,
    types::{Delete, ObjectIdentifier},
};
use tracing::{debug, error, info, instrument};

use super::{BatchDeleteOutcome, ObjectFailure, ObjectStore, ObjectStoreError, ObjectStoreResult};
use crate::config::S3StorageConfig;

/// S3-compatible object storage backend.
///
/// Works with AWS S3, MinIO, Cloudflare R2, DigitalOcean Spaces and any other
/// service implementing `DeleteObjects` and `HeadObject`.
pub struct S3ObjectStore {
    bucket: String,
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub async fn new(config: S3StorageConfig) -> Self {
        info!(bucket = %config.bucket, "Initializing S3 object store");

        let mut sdk_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            sdk_config_builder = sdk_config_builder.region(aws_config::Region::new(region.clone()));
        }

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = aws_credential_types::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None, // session token
                None, // expiry
                "backup-retention-config",
            );
            sdk_config_builder = sdk_config_builder.credentials_provider(credentials);
        }

        let sdk_config = sdk_config_builder.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(s3_config_builder.build());

        Self {
            bucket: config.bucket,
            client,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, keys), fields(bucket = %self.bucket, keys = keys.len()))]
    async fn delete_objects(&self, keys: &[String]) -> ObjectStoreResult<BatchDeleteOutcome> {
        if keys.is_empty() {
            return Ok(BatchDeleteOutcome::default());
        }

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ObjectStoreError::S3(e.to_string()))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| ObjectStoreError::S3(e.to_string()))?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| {
                error!(error = %DisplayErrorContext(&e), "S3 DeleteObjects call failed");
                ObjectStoreError::S3(DisplayErrorContext(&e).to_string())
            })?;

        let failed: Vec<ObjectFailure> = output
            .errors()
            .iter()
            .map(|e| ObjectFailure {
                key: e.key().unwrap_or_default().to_string(),
                code: e.code().map(str::to_string),
                message: e.message().map(str::to_string),
            })
            .collect();

        let outcome = BatchDeleteOutcome { failed };
        debug!(
            deleted = outcome.deleted_count(keys.len()),
            failed = outcome.failed.len(),
            "S3 DeleteObjects call completed"
        );
        Ok(outcome)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn exists(&self, key: &str) -> ObjectStoreResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(ObjectStoreError::S3(DisplayErrorContext(&e).to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
