use thiserror::Error;

use super::batch::BatchDeleteError;
use crate::{db::DbError, services::BlobStorageError};

/// Errors raised while running a lifecycle job.
///
/// Only [`LifecycleError::Scan`] ever escapes a run. Every other variant is
/// caught at the per-event boundary and recorded in the run report.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to scan candidate events: {0}")]
    Scan(#[source] DbError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Blob storage error: {0}")]
    Blob(#[from] BlobStorageError),

    #[error("Record batch delete failed: {0}")]
    RecordBatch(#[from] BatchDeleteError<DbError>),

    #[error("Blob batch delete failed: {0}")]
    BlobBatch(#[from] BatchDeleteError<BlobStorageError>),
}

impl LifecycleError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scan(_) => "scan",
            Self::Db(_) => "database",
            Self::Blob(_) => "blob_storage",
            Self::RecordBatch(_) => "record_batch",
            Self::BlobBatch(_) => "blob_batch",
        }
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
