use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    db::error::DbResult,
    models::{Event, EventStatus},
};

#[async_trait]
pub trait EventRepo: Send + Sync {
    /// All events whose status is one of `statuses`, in no particular order.
    async fn list_by_status(&self, statuses: &[EventStatus]) -> DbResult<Vec<Event>>;

    async fn get(&self, id: &str) -> DbResult<Option<Event>>;

    /// Conditionally advance an event's status.
    ///
    /// Writes `status` and `updated_at` only while the stored status is one of
    /// `expected`. Returns `false` without writing when the stored status has
    /// moved on (or the event is gone). Returns a validation error when the
    /// write would move the event backward or skip `DOWNLOAD_PERIOD`.
    async fn update_status(
        &self,
        id: &str,
        expected: &[EventStatus],
        status: EventStatus,
        updated_at: DateTime<Utc>,
    ) -> DbResult<bool>;
}

/// Shared precondition for [`EventRepo::update_status`] implementations.
pub(crate) fn check_transition(
    id: &str,
    current: EventStatus,
    expected: &[EventStatus],
    next: EventStatus,
) -> DbResult<bool> {
    if !expected.contains(&current) {
        return Ok(false);
    }
    if !current.can_advance_to(next) {
        return Err(crate::db::DbError::Validation(format!(
            "event {id} cannot move from {current} to {next}"
        )));
    }
    Ok(true)
}
