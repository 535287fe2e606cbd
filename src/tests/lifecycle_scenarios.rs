use std::sync::{Arc, atomic::Ordering};

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    config::{GracePeriodJobConfig, RetentionJobConfig},
    db::{
        DbPool, EventRepo, PhotoRepo, SessionRepo,
        memory::{MemoryEventRepo, MemoryPhotoRepo, MemorySessionRepo, MemoryUserRepo},
    },
    jobs::{
        BatchDeleter, GracePeriodTransitioner, LifecycleError, RetentionTransitioner,
        test_utils::{
            BrokenEventScan, FaultySessionRepo, RecordingNotifier, UnavailableFaces, event,
            photos_for, seed_blobs, sessions_for,
        },
    },
    models::{EventStatus, PhotoVariant, User},
    services::{FaceCollectionService, MemoryBlobStorage, MemoryFaceCollections},
};

/// In-memory platform with every collaborator reachable for assertions.
struct Platform {
    events: Arc<MemoryEventRepo>,
    sessions: Arc<MemorySessionRepo>,
    photos: Arc<MemoryPhotoRepo>,
    users: Arc<MemoryUserRepo>,
    blobs: Arc<MemoryBlobStorage>,
    faces: Arc<MemoryFaceCollections>,
    notifier: Arc<RecordingNotifier>,
}

impl Platform {
    fn new() -> Self {
        let users = Arc::new(MemoryUserRepo::new());
        users.insert(User {
            id: "org-1".into(),
            email: Some("organizer@example.com".into()),
            name: Some("Organizer".into()),
        });
        Self {
            events: Arc::new(MemoryEventRepo::new()),
            sessions: Arc::new(MemorySessionRepo::new()),
            photos: Arc::new(MemoryPhotoRepo::new()),
            users,
            blobs: Arc::new(MemoryBlobStorage::new()),
            faces: Arc::new(MemoryFaceCollections::new()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    fn db_with_sessions(&self, sessions: Arc<dyn SessionRepo>) -> DbPool {
        DbPool::from_repos(
            self.events.clone(),
            sessions,
            self.photos.clone(),
            self.users.clone(),
        )
    }

    fn db(&self) -> DbPool {
        self.db_with_sessions(self.sessions.clone())
    }

    fn grace(&self) -> GracePeriodTransitioner {
        GracePeriodTransitioner::new(
            &self.db(),
            self.notifier.clone(),
            GracePeriodJobConfig::default(),
        )
    }

    fn retention_with_faces(&self, faces: Arc<dyn FaceCollectionService>) -> RetentionTransitioner {
        RetentionTransitioner::new(
            &self.db(),
            self.blobs.clone(),
            faces,
            RetentionJobConfig::default(),
        )
    }

    fn retention(&self) -> RetentionTransitioner {
        self.retention_with_faces(self.faces.clone())
    }

    fn add_active(&self, id: &str, sessions: usize) {
        self.events.insert(event(id, EventStatus::Active));
        for session in sessions_for(id, sessions) {
            self.sessions.insert(session);
        }
    }

    fn add_downloadable(&self, id: &str, photos: usize) {
        self.events.insert(event(id, EventStatus::DownloadPeriod));
        self.faces.create_collection(format!("faces-{id}"));
        for photo in photos_for(id, photos) {
            self.photos.insert(photo);
        }
        seed_blobs(&self.blobs, id, photos);
    }

    async fn status(&self, id: &str) -> EventStatus {
        self.events.get(id).await.unwrap().unwrap().status
    }
}

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

#[tokio::test]
async fn test_grace_deadline_is_exclusive_of_the_boundary() {
    let platform = Platform::new();
    platform.add_active("gala", 4);
    let grace = platform.grace();

    let early = grace.run(utc(2024, 1, 3, 23, 0, 0)).await.unwrap();
    assert_eq!(early.transitioned, 0);
    assert_eq!(early.not_due, 1);
    assert_eq!(platform.status("gala").await, EventStatus::Active);
    assert_eq!(platform.sessions.count_for_event("gala"), 4);

    let at_boundary = grace.run(utc(2024, 1, 4, 0, 0, 0)).await.unwrap();
    assert_eq!(at_boundary.transitioned, 0);

    let late = grace.run(utc(2024, 1, 4, 0, 0, 1)).await.unwrap();
    assert_eq!(late.transitioned, 1);
    assert_eq!(platform.status("gala").await, EventStatus::DownloadPeriod);
    assert_eq!(platform.sessions.count_for_event("gala"), 0);
}

#[tokio::test]
async fn test_retention_deadline_purges_everything_for_the_event() {
    let platform = Platform::new();
    platform.add_downloadable("gala", 40);
    platform.add_downloadable("other", 2);
    // "other" ends later, so only "gala" is due.
    let mut later = event("other", EventStatus::DownloadPeriod);
    later.end_date_time = utc(2024, 6, 1, 0, 0, 0);
    platform.events.insert(later);

    let report = platform
        .retention()
        .run(utc(2024, 1, 11, 0, 0, 1))
        .await
        .unwrap();

    assert_eq!(report.transitioned, 1);
    assert_eq!(platform.status("gala").await, EventStatus::Archived);
    assert!(platform.photos.list_by_event("gala").await.unwrap().is_empty());
    for variant in PhotoVariant::ALL {
        assert_eq!(
            platform.blobs.count_with_prefix(&variant.event_prefix("gala")),
            0,
            "{variant:?} copies left behind"
        );
        assert_eq!(
            platform.blobs.count_with_prefix(&variant.event_prefix("other")),
            2
        );
    }
    assert!(!platform.faces.contains("faces-gala"));
    assert!(platform.faces.contains("faces-other"));
    assert_eq!(platform.status("other").await, EventStatus::DownloadPeriod);
}

#[tokio::test]
async fn test_second_grace_run_is_a_no_op() {
    let platform = Platform::new();
    platform.add_active("a", 30);
    platform.add_active("b", 0);
    let grace = platform.grace();
    let now = utc(2024, 1, 10, 0, 0, 0);

    let first = grace.run(now).await.unwrap();
    assert_eq!(first.transitioned, 2);
    assert_eq!(platform.notifier.sent().len(), 2);
    let after_first = platform.events.get("a").await.unwrap().unwrap();

    let second = grace.run(now).await.unwrap();
    assert_eq!(second.scanned, 0);
    assert_eq!(second.transitioned, 0);
    assert_eq!(platform.notifier.sent().len(), 2, "no duplicate emails");
    assert_eq!(platform.events.get("a").await.unwrap().unwrap(), after_first);
}

#[tokio::test]
async fn test_second_retention_run_is_a_no_op() {
    let platform = Platform::new();
    platform.add_downloadable("a", 5);
    let retention = platform.retention();
    let now = utc(2024, 2, 1, 0, 0, 0);

    retention.run(now).await.unwrap();
    let after_first = platform.events.get("a").await.unwrap().unwrap();

    let second = retention.run(now).await.unwrap();
    assert_eq!(second.scanned, 0);
    assert!(!second.has_deletions());
    assert_eq!(platform.events.get("a").await.unwrap().unwrap(), after_first);
}

#[tokio::test]
async fn test_one_failing_event_does_not_block_the_others() {
    let platform = Platform::new();
    for id in ["a", "b", "c", "d", "e"] {
        platform.add_active(id, 3);
    }
    let faulty = Arc::new(FaultySessionRepo::new(platform.sessions.clone(), Some("c")));
    let grace = GracePeriodTransitioner::new(
        &platform.db_with_sessions(faulty),
        platform.notifier.clone(),
        GracePeriodJobConfig::default(),
    );

    let report = grace.run(utc(2024, 1, 10, 0, 0, 0)).await.unwrap();

    assert_eq!(report.scanned, 5);
    assert_eq!(report.transitioned, 4);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.failed[0].event_id, "c");
    assert!(report.failed[0].error.contains("session store unavailable"));

    assert_eq!(platform.status("c").await, EventStatus::Active);
    assert_eq!(platform.sessions.count_for_event("c"), 3);
    for id in ["a", "b", "d", "e"] {
        assert_eq!(platform.status(id).await, EventStatus::DownloadPeriod);
        assert_eq!(platform.sessions.count_for_event(id), 0);
    }
}

#[tokio::test]
async fn test_failed_photo_metadata_delete_keeps_event_in_download_period() {
    use async_trait::async_trait;

    use crate::{
        db::{DbError, DbResult},
        models::Photo,
    };

    struct BrokenPhotoDelete(Arc<MemoryPhotoRepo>);

    #[async_trait]
    impl PhotoRepo for BrokenPhotoDelete {
        async fn list_by_event(&self, event_id: &str) -> DbResult<Vec<Photo>> {
            self.0.list_by_event(event_id).await
        }

        async fn batch_delete(&self, _ids: &[String]) -> DbResult<()> {
            Err(DbError::Internal("throughput exceeded".into()))
        }
    }

    let platform = Platform::new();
    platform.add_downloadable("a", 3);
    platform.add_downloadable("b", 3);
    let db = DbPool::from_repos(
        platform.events.clone(),
        platform.sessions.clone(),
        Arc::new(BrokenPhotoDelete(platform.photos.clone())),
        platform.users.clone(),
    );
    let retention = RetentionTransitioner::new(
        &db,
        platform.blobs.clone(),
        platform.faces.clone(),
        RetentionJobConfig::default(),
    );

    let report = retention.run(utc(2024, 2, 1, 0, 0, 0)).await.unwrap();

    assert_eq!(report.failed_count(), 2);
    assert_eq!(report.transitioned, 0);
    // Blobs went first and stay deleted; the status write never happened.
    assert!(platform.blobs.is_empty());
    assert_eq!(platform.status("a").await, EventStatus::DownloadPeriod);
    // The collection step comes after metadata, so it was never reached.
    assert!(platform.faces.contains("faces-a"));
}

#[tokio::test]
async fn test_sessions_are_deleted_in_batches_of_25() {
    let platform = Platform::new();
    platform.add_active("big", 57);
    let faulty = Arc::new(FaultySessionRepo::new(platform.sessions.clone(), None));
    let grace = GracePeriodTransitioner::new(
        &platform.db_with_sessions(faulty.clone()),
        platform.notifier.clone(),
        GracePeriodJobConfig::default(),
    );

    let report = grace.run(utc(2024, 1, 10, 0, 0, 0)).await.unwrap();

    assert_eq!(report.sessions_deleted, 57);
    assert_eq!(faulty.batch_sizes(), vec![25, 25, 7]);
}

#[tokio::test]
async fn test_session_delete_failing_mid_way_keeps_event_active_until_rerun() {
    let platform = Platform::new();
    platform.add_active("big", 57);
    let faulty = Arc::new(FaultySessionRepo::new(platform.sessions.clone(), None).failing_batch(2));
    let grace = GracePeriodTransitioner::new(
        &platform.db_with_sessions(faulty.clone()),
        platform.notifier.clone(),
        GracePeriodJobConfig::default(),
    );
    let now = utc(2024, 1, 10, 0, 0, 0);

    let first = grace.run(now).await.unwrap();

    assert_eq!(first.transitioned, 0);
    assert_eq!(first.failed_count(), 1);
    assert_eq!(first.failed[0].event_id, "big");
    assert!(first.failed[0].error.contains("batch 2 of 3"));
    // The first chunk stays deleted; nothing after the failing chunk ran.
    assert_eq!(faulty.batch_sizes(), vec![25, 25]);
    assert_eq!(platform.sessions.count_for_event("big"), 32);
    assert_eq!(platform.status("big").await, EventStatus::Active);
    assert!(platform.notifier.sent().is_empty());

    let second = grace.run(now).await.unwrap();

    assert_eq!(second.transitioned, 1);
    assert_eq!(second.sessions_deleted, 32);
    assert!(!second.has_failures());
    assert_eq!(faulty.batch_sizes(), vec![25, 25, 25, 7]);
    assert_eq!(platform.sessions.count_for_event("big"), 0);
    assert_eq!(platform.status("big").await, EventStatus::DownloadPeriod);
    assert_eq!(platform.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_unrepresentable_retention_deadline_does_not_stop_the_run() {
    let platform = Platform::new();
    platform.add_downloadable("good", 2);
    platform.add_downloadable("forever", 2);
    let mut forever = event("forever", EventStatus::DownloadPeriod);
    forever.retention_period_days = u32::MAX;
    platform.events.insert(forever);

    let report = platform
        .retention()
        .run(utc(2024, 2, 1, 0, 0, 0))
        .await
        .unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.transitioned, 1);
    assert_eq!(report.not_due, 1);
    assert_eq!(platform.status("good").await, EventStatus::Archived);
    assert_eq!(platform.status("forever").await, EventStatus::DownloadPeriod);
    assert_eq!(platform.photos.count_for_event("forever"), 2);
}

#[tokio::test]
async fn test_batch_deleter_direct_against_session_store() {
    let sessions = Arc::new(MemorySessionRepo::new());
    for session in sessions_for("evt", 57) {
        sessions.insert(session);
    }
    let recorder = Arc::new(FaultySessionRepo::new(sessions.clone(), None));
    let target: Arc<dyn SessionRepo> = recorder.clone();
    let ids: Vec<String> = sessions_for("evt", 57).into_iter().map(|s| s.id).collect();

    let deleted = BatchDeleter::new(25)
        .delete_all(target.as_ref(), &ids)
        .await
        .unwrap();

    assert_eq!(deleted, 57);
    assert_eq!(recorder.batch_sizes(), vec![25, 25, 7]);
    assert_eq!(sessions.count_for_event("evt"), 0);
}

#[tokio::test]
async fn test_face_index_outage_does_not_block_archiving() {
    let platform = Platform::new();
    platform.add_downloadable("a", 2);
    platform.add_downloadable("b", 2);
    let faces = Arc::new(UnavailableFaces::default());

    let report = platform
        .retention_with_faces(faces.clone())
        .run(utc(2024, 2, 1, 0, 0, 0))
        .await
        .unwrap();

    assert_eq!(faces.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.collection_failures, 2);
    assert_eq!(report.transitioned, 2);
    assert!(!report.has_failures());
    assert_eq!(platform.status("a").await, EventStatus::Archived);
    assert_eq!(platform.status("b").await, EventStatus::Archived);
}

#[tokio::test]
async fn test_scan_failure_aborts_the_run() {
    let platform = Platform::new();
    let db = DbPool::from_repos(
        Arc::new(BrokenEventScan),
        platform.sessions.clone(),
        platform.photos.clone(),
        platform.users.clone(),
    );
    let grace = GracePeriodTransitioner::new(
        &db,
        platform.notifier.clone(),
        GracePeriodJobConfig::default(),
    );

    let result = grace.run(utc(2024, 1, 10, 0, 0, 0)).await;
    assert!(matches!(result, Err(LifecycleError::Scan(_))));
}

#[tokio::test]
async fn test_event_moved_by_another_run_is_skipped() {
    use async_trait::async_trait;

    use crate::{db::DbResult, models::Event};

    /// Returns a stale scan result, as if another run archived the event
    /// between this run's scan and its first destructive step.
    struct StaleScan(Arc<MemoryEventRepo>);

    #[async_trait]
    impl EventRepo for StaleScan {
        async fn list_by_status(&self, _statuses: &[EventStatus]) -> DbResult<Vec<Event>> {
            Ok(vec![event("a", EventStatus::DownloadPeriod)])
        }

        async fn get(&self, id: &str) -> DbResult<Option<Event>> {
            self.0.get(id).await
        }

        async fn update_status(
            &self,
            id: &str,
            expected: &[EventStatus],
            status: EventStatus,
            updated_at: DateTime<Utc>,
        ) -> DbResult<bool> {
            self.0.update_status(id, expected, status, updated_at).await
        }
    }

    let platform = Platform::new();
    platform.events.insert(event("a", EventStatus::Archived));
    seed_blobs(&platform.blobs, "a", 2);
    let db = DbPool::from_repos(
        Arc::new(StaleScan(platform.events.clone())),
        platform.sessions.clone(),
        platform.photos.clone(),
        platform.users.clone(),
    );
    let retention = RetentionTransitioner::new(
        &db,
        platform.blobs.clone(),
        platform.faces.clone(),
        RetentionJobConfig::default(),
    );

    let report = retention.run(utc(2024, 2, 1, 0, 0, 0)).await.unwrap();

    assert_eq!(report.stale, 1);
    assert_eq!(report.transitioned, 0);
    assert_eq!(platform.blobs.len(), 6, "nothing deleted for a stale event");
}

#[tokio::test]
async fn test_max_duration_stops_before_the_next_event() {
    let platform = Platform::new();
    for id in ["a", "b", "c"] {
        platform.add_active(id, 1);
    }
    let config = GracePeriodJobConfig {
        max_duration_secs: Some(0),
        ..Default::default()
    };
    let grace = GracePeriodTransitioner::new(&platform.db(), platform.notifier.clone(), config);

    let report = grace.run(utc(2024, 1, 10, 0, 0, 0)).await.unwrap();

    assert!(report.stopped_early);
    assert_eq!(report.scanned, 3);
    assert_eq!(report.transitioned, 0);
    for id in ["a", "b", "c"] {
        assert_eq!(platform.status(id).await, EventStatus::Active);
    }
}

#[tokio::test]
async fn test_grace_then_retention_full_lifecycle() {
    let platform = Platform::new();
    platform.add_active("gala", 10);
    platform.faces.create_collection("faces-gala");
    for photo in photos_for("gala", 12) {
        platform.photos.insert(photo);
    }
    seed_blobs(&platform.blobs, "gala", 12);

    // Retention does nothing while the event is still active.
    let early = platform
        .retention()
        .run(utc(2024, 3, 1, 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(early.scanned, 0);
    assert_eq!(platform.blobs.len(), 36);

    platform
        .grace()
        .run(utc(2024, 1, 5, 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(platform.status("gala").await, EventStatus::DownloadPeriod);
    assert_eq!(platform.photos.count_for_event("gala"), 12);

    let notification = &platform.notifier.sent()[0];
    assert!(notification.text_body.contains("January 11, 2024"));

    platform
        .retention()
        .run(utc(2024, 1, 12, 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(platform.status("gala").await, EventStatus::Archived);
    assert!(platform.blobs.is_empty());
    assert_eq!(platform.photos.count_for_event("gala"), 0);
}
