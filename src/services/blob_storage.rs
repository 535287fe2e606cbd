//! Pluggable blob storage backends for photo copies.
//!
//! Photos are stored three times (original, processed, thumbnail) under
//! per-folder prefixes `{folder}/{event_id}/`. The lifecycle jobs only ever
//! list keys under a prefix and delete keys in bulk, so that is all the
//! trait exposes.
//!
//! - **Memory**: process-local map, for local runs and tests
//! - **S3**: S3-compatible object storage (requires the `s3-storage` feature)

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
#[cfg(feature = "s3-storage")]
use tracing::{debug, error, info, instrument};

#[cfg(feature = "s3-storage")]
use crate::config::S3StorageConfig;
use crate::config::{BlobStorageBackend, BlobStorageConfig};

/// Largest number of keys the blob store accepts in one batch delete call.
pub const MAX_BLOB_BATCH_SIZE: usize = 1000;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobStorageError {
    #[error("Batch of {size} keys exceeds the store limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("{failed} of {requested} keys could not be deleted (first: {first_key}: {message})")]
    PartialDelete {
        requested: usize,
        failed: usize,
        first_key: String,
        message: String,
    },

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type BlobStorageResult<T> = Result<T, BlobStorageError>;

/// Trait for pluggable blob storage backends.
///
/// Implementations must be `Send + Sync` to support async contexts.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Every key that starts with `prefix`, across all pages.
    async fn list_keys_by_prefix(&self, prefix: &str) -> BlobStorageResult<Vec<String>>;

    /// Delete up to [`MAX_BLOB_BATCH_SIZE`] keys in a single call.
    /// Deleting a key that does not exist succeeds.
    async fn batch_delete_keys(&self, keys: &[String]) -> BlobStorageResult<()>;

    /// Get the backend type name (for logging/debugging).
    fn backend_name(&self) -> &'static str;
}

fn check_batch_size(size: usize) -> BlobStorageResult<()> {
    if size > MAX_BLOB_BATCH_SIZE {
        return Err(BlobStorageError::BatchTooLarge {
            size,
            max: MAX_BLOB_BATCH_SIZE,
        });
    }
    Ok(())
}

/// In-memory blob storage backend.
#[derive(Default)]
pub struct MemoryBlobStorage {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: impl Into<String>, content: Vec<u8>) {
        self.objects.insert(key.into(), content);
    }

    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        self.objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .count()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn list_keys_by_prefix(&self, prefix: &str) -> BlobStorageResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        // S3 lists in lexicographic key order; match it.
        keys.sort();
        Ok(keys)
    }

    async fn batch_delete_keys(&self, keys: &[String]) -> BlobStorageResult<()> {
        check_batch_size(keys.len())?;
        for key in keys {
            self.objects.remove(key);
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// S3-compatible object storage backend.
///
/// Works with AWS S3 and any service speaking the same API
/// (MinIO, Cloudflare R2, DigitalOcean Spaces).
///
/// Requires the `s3-storage` feature.
#[cfg(feature = "s3-storage")]
pub struct S3BlobStorage {
    config: S3StorageConfig,
    client: aws_sdk_s3::Client,
}

#[cfg(feature = "s3-storage")]
impl S3BlobStorage {
    pub async fn new(config: S3StorageConfig) -> BlobStorageResult<Self> {
        info!(bucket = %config.bucket, "Initializing S3 blob storage");

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
                "eventlens-config",
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

        Ok(Self { config, client })
    }
}

#[cfg(feature = "s3-storage")]
#[async_trait]
impl BlobStorage for S3BlobStorage {
    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn list_keys_by_prefix(&self, prefix: &str) -> BlobStorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.config.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| {
                    error!(error = %e, prefix, "Failed to list objects in S3");
                    BlobStorageError::S3(e.to_string())
                })?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(prefix, count = keys.len(), "Listed S3 keys");
        Ok(keys)
    }

    #[instrument(skip(self, keys), fields(bucket = %self.config.bucket, count = keys.len()))]
    async fn batch_delete_keys(&self, keys: &[String]) -> BlobStorageResult<()> {
        use aws_sdk_s3::types::{Delete, ObjectIdentifier};

        check_batch_size(keys.len())?;
        if keys.is_empty() {
            return Ok(());
        }

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BlobStorageError::S3(e.to_string()))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| BlobStorageError::S3(e.to_string()))?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.config.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to delete objects from S3");
                BlobStorageError::S3(e.to_string())
            })?;

        // Quiet mode only reports the keys that failed.
        let errors = output.errors();
        if let Some(first) = errors.first() {
            return Err(BlobStorageError::PartialDelete {
                requested: keys.len(),
                failed: errors.len(),
                first_key: first.key().unwrap_or_default().to_string(),
                message: first.message().unwrap_or("unknown error").to_string(),
            });
        }

        debug!(count = keys.len(), "Deleted S3 objects");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

/// Create a blob storage backend from configuration.
pub async fn create_blob_storage(
    config: &BlobStorageConfig,
) -> BlobStorageResult<Arc<dyn BlobStorage>> {
    match config.backend {
        BlobStorageBackend::Memory => {
            tracing::warn!("Using in-memory blob storage; no real photo copies will be deleted");
            Ok(Arc::new(MemoryBlobStorage::new()))
        }
        #[cfg(feature = "s3-storage")]
        BlobStorageBackend::S3 => {
            let s3_config = config.s3.clone().ok_or_else(|| {
                BlobStorageError::Config("S3 backend requires [storage.blobs.s3] config".into())
            })?;
            tracing::info!(bucket = %s3_config.bucket, "Using S3 blob storage backend");
            Ok(Arc::new(S3BlobStorage::new(s3_config).await?))
        }
        #[cfg(not(feature = "s3-storage"))]
        BlobStorageBackend::S3 => Err(BlobStorageError::Config(
            "S3 blob storage backend requires the 's3-storage' feature. \
                Rebuild with: cargo build --features s3-storage"
                .into(),
        )),
    }
}
