//! Chunked deletion under a store's per-call batch limit.

use async_trait::async_trait;
use tracing::debug;

use crate::{
    db::{DbError, PhotoRepo, SessionRepo},
    services::{BlobStorage, BlobStorageError},
};

/// A store that deletes a batch of ids in one call.
#[async_trait]
pub trait BatchDelete: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn delete_batch(&self, ids: &[String]) -> Result<(), Self::Error>;
}

#[async_trait]
impl<'a> BatchDelete for dyn SessionRepo + 'a {
    type Error = DbError;

    async fn delete_batch(&self, ids: &[String]) -> Result<(), DbError> {
        self.batch_delete(ids).await
    }
}

#[async_trait]
impl<'a> BatchDelete for dyn PhotoRepo + 'a {
    type Error = DbError;

    async fn delete_batch(&self, ids: &[String]) -> Result<(), DbError> {
        self.batch_delete(ids).await
    }
}

#[async_trait]
impl<'a> BatchDelete for dyn BlobStorage + 'a {
    type Error = BlobStorageError;

    async fn delete_batch(&self, ids: &[String]) -> Result<(), BlobStorageError> {
        self.batch_delete_keys(ids).await
    }
}

/// A chunk call failed. Earlier chunks stay deleted.
#[derive(Debug, thiserror::Error)]
#[error("batch {failed_batch} of {total_batches} failed after {deleted} items were deleted: {source}")]
pub struct BatchDeleteError<E: std::error::Error + 'static> {
    /// Items removed by the chunks that succeeded before the failure.
    pub deleted: usize,
    /// 1-based index of the chunk that failed.
    pub failed_batch: usize,
    pub total_batches: usize,
    #[source]
    pub source: E,
}

/// Deletes ids in consecutive chunks of at most `max_batch_size`, one call per
/// chunk, in order.
///
/// There is no rollback: if a chunk fails, the chunks before it stay deleted
/// and the error is returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchDeleter {
    max_batch_size: usize,
}

impl BatchDeleter {
    /// A batch size of zero is treated as one.
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Delete all `ids` from `target`. Returns the number of ids submitted.
    pub async fn delete_all<T>(
        &self,
        target: &T,
        ids: &[String],
    ) -> Result<usize, BatchDeleteError<T::Error>>
    where
        T: BatchDelete + ?Sized,
    {
        let total_batches = ids.len().div_ceil(self.max_batch_size);
        let mut deleted = 0;

        for (index, chunk) in ids.chunks(self.max_batch_size).enumerate() {
            target
                .delete_batch(chunk)
                .await
                .map_err(|source| BatchDeleteError {
                    deleted,
                    failed_batch: index + 1,
                    total_batches,
                    source,
                })?;
            deleted += chunk.len();
            debug!(
                batch = index + 1,
                total_batches,
                batch_size = chunk.len(),
                "Deleted batch"
            );
        }

        Ok(deleted)
    }
}
