//! Fixtures and fault-injecting collaborators for lifecycle tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
    db::{DbError, DbResult, EventRepo, SessionRepo, memory::MemorySessionRepo},
    models::{Event, EventStatus, Photo, PhotoVariant, Session},
    services::{
        BlobStorage, BlobStorageError, BlobStorageResult, FaceCollectionService, FaceIndexError,
        FaceIndexResult, MemoryBlobStorage, Notification, NotificationError, NotificationResult,
        NotificationSender,
    },
};

pub fn event_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Event that ended 2024-01-01T00:00:00Z with a 3-day grace period and a
/// 7-day retention period, organized by `org-1`.
pub fn event(id: &str, status: EventStatus) -> Event {
    let end = event_end();
    Event {
        id: id.into(),
        name: format!("Event {id}"),
        start_date_time: end - Duration::hours(6),
        end_date_time: end,
        grace_period_days: 3,
        retention_period_days: 7,
        status,
        organizer_id: "org-1".into(),
        face_collection_id: Some(format!("faces-{id}")),
        updated_at: end,
    }
}

pub fn sessions_for(event_id: &str, count: usize) -> Vec<Session> {
    (0..count)
        .map(|i| Session {
            id: format!("{event_id}-session-{i:03}"),
            event_id: event_id.into(),
            expires_at: event_end(),
        })
        .collect()
}

pub fn photos_for(event_id: &str, count: usize) -> Vec<Photo> {
    (0..count)
        .map(|i| Photo {
            id: format!("{event_id}-photo-{i:03}"),
            event_id: event_id.into(),
            blob_name: format!("IMG_{i:04}.jpg"),
            uploaded_at: event_end(),
        })
        .collect()
}

/// Store all three copies of each of `count` photos for `event_id`.
pub fn seed_blobs(blobs: &MemoryBlobStorage, event_id: &str, count: usize) {
    for photo in photos_for(event_id, count) {
        for variant in PhotoVariant::ALL {
            blobs.put(photo.blob_key(variant), vec![0u8; 4]);
        }
    }
}

/// Captures sent notifications; can be switched to fail every send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> NotificationResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Api {
                status: 500,
                message: "mail api down".into(),
            });
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

/// Blob storage that fails every list and delete touching `failing_prefix`.
pub struct FailingBlobFolder {
    inner: Arc<MemoryBlobStorage>,
    failing_prefix: String,
}

impl FailingBlobFolder {
    pub fn new(inner: Arc<MemoryBlobStorage>, failing_prefix: &str) -> Self {
        Self {
            inner,
            failing_prefix: failing_prefix.into(),
        }
    }
}

#[async_trait]
impl BlobStorage for FailingBlobFolder {
    async fn list_keys_by_prefix(&self, prefix: &str) -> BlobStorageResult<Vec<String>> {
        if prefix.starts_with(&self.failing_prefix) {
            return Err(BlobStorageError::S3("access denied".into()));
        }
        self.inner.list_keys_by_prefix(prefix).await
    }

    async fn batch_delete_keys(&self, keys: &[String]) -> BlobStorageResult<()> {
        if keys.iter().any(|k| k.starts_with(&self.failing_prefix)) {
            return Err(BlobStorageError::S3("access denied".into()));
        }
        self.inner.batch_delete_keys(keys).await
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Session store that fails every call for one event, optionally fails one
/// batch delete call, and records the size of every batch delete call.
pub struct FaultySessionRepo {
    inner: Arc<MemorySessionRepo>,
    failing_event: Option<String>,
    failing_batch: Option<usize>,
    batch_sizes: Mutex<Vec<usize>>,
}

impl FaultySessionRepo {
    pub fn new(inner: Arc<MemorySessionRepo>, failing_event: Option<&str>) -> Self {
        Self {
            inner,
            failing_event: failing_event.map(str::to_string),
            failing_batch: None,
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Fail the `n`th batch delete call (1-based, counted across runs) and
    /// delete nothing in it.
    pub fn failing_batch(mut self, n: usize) -> Self {
        self.failing_batch = Some(n);
        self
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    fn is_failing(&self, event_id: &str) -> bool {
        self.failing_event.as_deref() == Some(event_id)
    }
}

#[async_trait]
impl SessionRepo for FaultySessionRepo {
    async fn list_by_event(&self, event_id: &str) -> DbResult<Vec<Session>> {
        if self.is_failing(event_id) {
            return Err(DbError::Internal("session store unavailable".into()));
        }
        self.inner.list_by_event(event_id).await
    }

    async fn batch_delete(&self, ids: &[String]) -> DbResult<()> {
        let call = {
            let mut sizes = self.batch_sizes.lock().unwrap();
            sizes.push(ids.len());
            sizes.len()
        };
        if self.failing_batch == Some(call) {
            return Err(DbError::Internal("throughput exceeded".into()));
        }
        self.inner.batch_delete(ids).await
    }
}

/// Face-index service that always fails with a non-"not found" error.
#[derive(Default)]
pub struct UnavailableFaces {
    pub calls: AtomicUsize,
}

#[async_trait]
impl FaceCollectionService for UnavailableFaces {
    async fn delete_collection(&self, _collection_id: &str) -> FaceIndexResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FaceIndexError::Http("connection reset".into()))
    }

    fn backend_name(&self) -> &'static str {
        "unavailable"
    }
}

/// Event store whose scan always fails.
pub struct BrokenEventScan;

#[async_trait]
impl EventRepo for BrokenEventScan {
    async fn list_by_status(&self, _statuses: &[EventStatus]) -> DbResult<Vec<Event>> {
        Err(DbError::Internal("table scan failed".into()))
    }

    async fn get(&self, _id: &str) -> DbResult<Option<Event>> {
        Ok(None)
    }

    async fn update_status(
        &self,
        _id: &str,
        _expected: &[EventStatus],
        _status: EventStatus,
        _updated_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        Ok(false)
    }
}
