//! In-memory repositories backed by `DashMap`.
//!
//! Used for local dry runs and as the default backend in tests. Listing is a
//! full scan with a filter, and batch deletes enforce the same per-call limit
//! as the hosted record store, so an oversized batch fails here exactly as it
//! would in production.
//!
//! State lives in the process only; nothing is persisted between runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{
    error::DbResult,
    repos::{EventRepo, PhotoRepo, SessionRepo, UserRepo, check_batch_size, check_transition},
};
use crate::models::{Event, EventStatus, Photo, Session, User};

#[derive(Default)]
pub struct MemoryEventRepo {
    events: DashMap<String, Event>,
}

impl MemoryEventRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, event: Event) {
        self.events.insert(event.id.clone(), event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait]
impl EventRepo for MemoryEventRepo {
    async fn list_by_status(&self, statuses: &[EventStatus]) -> DbResult<Vec<Event>> {
        Ok(self
            .events
            .iter()
            .filter(|entry| statuses.contains(&entry.status))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get(&self, id: &str) -> DbResult<Option<Event>> {
        Ok(self.events.get(id).map(|entry| entry.value().clone()))
    }

    async fn update_status(
        &self,
        id: &str,
        expected: &[EventStatus],
        status: EventStatus,
        updated_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        // The entry guard holds the shard lock, making check-and-set atomic.
        let Some(mut entry) = self.events.get_mut(id) else {
            return Ok(false);
        };
        if !check_transition(id, entry.status, expected, status)? {
            return Ok(false);
        }
        entry.status = status;
        entry.updated_at = updated_at;
        Ok(true)
    }
}

#[derive(Default)]
pub struct MemorySessionRepo {
    sessions: DashMap<String, Session>,
}

impl MemorySessionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) {
        self.sessions.insert(session.id.clone(), session);
    }

    pub fn count_for_event(&self, event_id: &str) -> usize {
        self.sessions
            .iter()
            .filter(|entry| entry.event_id == event_id)
            .count()
    }
}

#[async_trait]
impl SessionRepo for MemorySessionRepo {
    async fn list_by_event(&self, event_id: &str) -> DbResult<Vec<Session>> {
        Ok(self
            .sessions
            .iter()
            .filter(|entry| entry.event_id == event_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn batch_delete(&self, ids: &[String]) -> DbResult<()> {
        check_batch_size(ids.len())?;
        for id in ids {
            self.sessions.remove(id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPhotoRepo {
    photos: DashMap<String, Photo>,
}

impl MemoryPhotoRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, photo: Photo) {
        self.photos.insert(photo.id.clone(), photo);
    }

    pub fn count_for_event(&self, event_id: &str) -> usize {
        self.photos
            .iter()
            .filter(|entry| entry.event_id == event_id)
            .count()
    }
}

#[async_trait]
impl PhotoRepo for MemoryPhotoRepo {
    async fn list_by_event(&self, event_id: &str) -> DbResult<Vec<Photo>> {
        Ok(self
            .photos
            .iter()
            .filter(|entry| entry.event_id == event_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn batch_delete(&self, ids: &[String]) -> DbResult<()> {
        check_batch_size(ids.len())?;
        for id in ids {
            self.photos.remove(id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUserRepo {
    users: DashMap<String, User>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }
}
