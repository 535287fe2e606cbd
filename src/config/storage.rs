//! Blob storage configuration for photo copies.
//!
//! # Example Configuration
//!
//! ```toml
//! [storage.blobs]
//! backend = "s3"
//!
//! [storage.blobs.s3]
//! bucket = "eventlens-photos"
//! region = "us-east-1"
//! # Credentials via env vars AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY
//! # or IAM role
//! ```

use serde::{Deserialize, Serialize};

/// Storage configuration for binary data.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Photo blob storage.
    #[serde(default)]
    pub blobs: BlobStorageConfig,
}

/// Where the original, processed, and thumbnail copies of each photo live.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct BlobStorageConfig {
    /// Storage backend to use.
    #[serde(default)]
    pub backend: BlobStorageBackend,

    /// S3 configuration (required when backend = "s3").
    #[serde(default)]
    pub s3: Option<S3StorageConfig>,
}

impl BlobStorageConfig {
    /// Validate the storage configuration.
    pub fn validate(&self) -> Result<(), String> {
        match self.backend {
            BlobStorageBackend::Memory => Ok(()),
            BlobStorageBackend::S3 => match &self.s3 {
                Some(s3) => s3.validate(),
                None => Err(
                    "S3 storage backend requires [storage.blobs.s3] configuration".to_string(),
                ),
            },
        }
    }
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlobStorageBackend {
    /// Process-local map. Nothing real is deleted.
    #[default]
    Memory,

    /// S3-compatible object storage.
    /// Supports AWS S3, MinIO, R2, DigitalOcean Spaces, etc.
    S3,
}

/// S3-compatible object storage configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3StorageConfig {
    /// S3 bucket name.
    pub bucket: String,

    /// AWS region (e.g., "us-east-1").
    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint URL for S3-compatible services, e.g.
    /// "http://localhost:9000" for MinIO.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// If not specified, uses environment variables or IAM role.
    #[serde(default)]
    pub access_key_id: Option<String>,

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
        // Region is required unless using a custom endpoint
        if self.region.is_none() && self.endpoint.is_none() {
            return Err("S3 requires either 'region' or 'endpoint' to be specified".to_string());
        }
        Ok(())
    }
}
