use async_trait::async_trait;

use crate::{db::error::DbResult, models::Photo};

#[async_trait]
pub trait PhotoRepo: Send + Sync {
    async fn list_by_event(&self, event_id: &str) -> DbResult<Vec<Photo>>;

    /// Delete photo metadata rows by id in a single call.
    ///
    /// Same batch limit and unknown-id behaviour as
    /// [`SessionRepo::batch_delete`](super::SessionRepo::batch_delete).
    async fn batch_delete(&self, ids: &[String]) -> DbResult<()>;
}
