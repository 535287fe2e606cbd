use async_trait::async_trait;

use crate::{db::error::DbResult, models::Session};

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn list_by_event(&self, event_id: &str) -> DbResult<Vec<Session>>;

    /// Delete sessions by id in a single call.
    ///
    /// Fails with [`DbError::BatchTooLarge`](crate::db::DbError::BatchTooLarge)
    /// when given more than [`MAX_RECORD_BATCH_SIZE`](super::MAX_RECORD_BATCH_SIZE)
    /// ids. Unknown ids are ignored.
    async fn batch_delete(&self, ids: &[String]) -> DbResult<()>;
}
