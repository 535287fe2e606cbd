use std::sync::Arc;

use tracing::{debug, warn};

use crate::services::{FaceCollectionService, FaceIndexError};

/// What happened when retiring a face collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireOutcome {
    Deleted,
    /// The collection did not exist. Counts as success.
    AlreadyAbsent,
    /// Any other error. Logged and swallowed.
    Failed,
}

/// Deletes an event's face collection without ever failing the caller.
///
/// A missing collection must not block archiving, and neither may a transient
/// face-index error; otherwise the event would stay in its download period
/// forever.
#[derive(Clone)]
pub struct CollectionRetirer {
    service: Arc<dyn FaceCollectionService>,
}

impl CollectionRetirer {
    pub fn new(service: Arc<dyn FaceCollectionService>) -> Self {
        Self { service }
    }

    pub async fn retire(&self, collection_id: &str) -> RetireOutcome {
        match self.service.delete_collection(collection_id).await {
            Ok(()) => {
                debug!(collection_id, "Retired face collection");
                RetireOutcome::Deleted
            }
            Err(FaceIndexError::NotFound(_)) => {
                debug!(collection_id, "Face collection already absent");
                RetireOutcome::AlreadyAbsent
            }
            Err(e) => {
                warn!(
                    collection_id,
                    backend = self.service.backend_name(),
                    error = %e,
                    "Failed to retire face collection, continuing"
                );
                RetireOutcome::Failed
            }
        }
    }
}
