use async_trait::async_trait;

use crate::{db::error::DbResult, models::User};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_id(&self, id: &str) -> DbResult<Option<User>>;
}
