//! Retention expiry: `DOWNLOAD_PERIOD` -> `ARCHIVED`.
//!
//! Order per event: blobs in all three folders, then photo metadata, then
//! the face collection, then the status write. Blob folders are isolated
//! from each other and from the rest of the event; a metadata failure aborts
//! the event; collection retirement never does.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument};

use super::{
    batch::BatchDeleter,
    collection::{CollectionRetirer, RetireOutcome},
    error::{LifecycleError, LifecycleResult},
    report::{JobKind, RunReport},
    transition::{LifecycleJob, TransitionOutcome, run_job},
};
use crate::{
    config::RetentionJobConfig,
    db::{DbPool, EventRepo, PhotoRepo},
    models::{Event, EventStatus, PhotoVariant},
    observability::metrics,
    services::{BlobStorage, FaceCollectionService},
};

const CANDIDATES: &[EventStatus] = &[EventStatus::DownloadPeriod];

pub struct RetentionTransitioner {
    events: Arc<dyn EventRepo>,
    photos: Arc<dyn PhotoRepo>,
    blobs: Arc<dyn BlobStorage>,
    retirer: CollectionRetirer,
    blob_deleter: BatchDeleter,
    photo_deleter: BatchDeleter,
    config: RetentionJobConfig,
}

impl RetentionTransitioner {
    pub fn new(
        db: &DbPool,
        blobs: Arc<dyn BlobStorage>,
        faces: Arc<dyn FaceCollectionService>,
        config: RetentionJobConfig,
    ) -> Self {
        Self {
            events: db.events(),
            photos: db.photos(),
            blobs,
            retirer: CollectionRetirer::new(faces),
            blob_deleter: BatchDeleter::new(config.blob_batch_size),
            photo_deleter: BatchDeleter::new(config.photo_batch_size),
            config,
        }
    }

    pub fn config(&self) -> &RetentionJobConfig {
        &self.config
    }

    /// Archive every event whose retention period ended before `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> LifecycleResult<RunReport> {
        run_job(self, now).await
    }

    /// List and delete every key under one folder prefix.
    async fn purge_prefix(&self, prefix: &str) -> Result<usize, LifecycleError> {
        let keys = self.blobs.list_keys_by_prefix(prefix).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        Ok(self
            .blob_deleter
            .delete_all(self.blobs.as_ref(), &keys)
            .await?)
    }

    /// Purge all three photo folders. A failing folder is logged and counted;
    /// the others are still attempted.
    async fn purge_blobs(&self, event: &Event, report: &mut RunReport) {
        for variant in PhotoVariant::ALL {
            let prefix = variant.event_prefix(&event.id);
            match self.purge_prefix(&prefix).await {
                Ok(deleted) => {
                    debug!(event_id = %event.id, prefix = %prefix, deleted, "Purged blob folder");
                    report.blobs_deleted += deleted;
                    metrics::record_lifecycle_deletion(
                        JobKind::Retention.as_str(),
                        "blobs",
                        deleted as u64,
                    );
                }
                Err(e) => {
                    error!(
                        event_id = %event.id,
                        prefix = %prefix,
                        backend = self.blobs.backend_name(),
                        error = %e,
                        "Failed to purge blob folder, continuing with the rest"
                    );
                    report.folder_failures += 1;
                    metrics::record_lifecycle_error(JobKind::Retention.as_str(), "blob_folder");
                }
            }
        }
    }

    async fn retire_collection(&self, event: &Event, report: &mut RunReport) {
        let Some(collection_id) = event.face_collection_id.as_deref() else {
            debug!(event_id = %event.id, "Event has no face collection");
            return;
        };

        match self.retirer.retire(collection_id).await {
            RetireOutcome::Deleted => report.collections_retired += 1,
            RetireOutcome::AlreadyAbsent => report.collections_absent += 1,
            RetireOutcome::Failed => {
                report.collection_failures += 1;
                metrics::record_lifecycle_error(JobKind::Retention.as_str(), "collection");
            }
        }
    }
}

#[async_trait]
impl LifecycleJob for RetentionTransitioner {
    fn kind(&self) -> JobKind {
        JobKind::Retention
    }

    fn events(&self) -> &Arc<dyn EventRepo> {
        &self.events
    }

    fn candidate_statuses(&self) -> &'static [EventStatus] {
        CANDIDATES
    }

    fn is_due(&self, event: &Event, now: DateTime<Utc>) -> bool {
        event.is_retention_over(now)
    }

    fn dry_run(&self) -> bool {
        self.config.dry_run
    }

    fn max_duration(&self) -> Option<std::time::Duration> {
        self.config.max_duration()
    }

    fn describe(&self, event: &Event) -> String {
        format!(
            "purge photos, blobs, and face collection for event '{}' and archive it",
            event.name
        )
    }

    #[instrument(skip_all, fields(event_id = %event.id))]
    async fn transition(
        &self,
        event: &Event,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) -> Result<TransitionOutcome, LifecycleError> {
        self.purge_blobs(event, report).await;

        let photo_ids: Vec<String> = self
            .photos
            .list_by_event(&event.id)
            .await?
            .into_iter()
            .map(|photo| photo.id)
            .collect();
        let deleted = self
            .photo_deleter
            .delete_all(self.photos.as_ref(), &photo_ids)
            .await?;
        report.photos_deleted += deleted;
        metrics::record_lifecycle_deletion(JobKind::Retention.as_str(), "photos", deleted as u64);

        self.retire_collection(event, report).await;

        if !self
            .events
            .update_status(&event.id, CANDIDATES, EventStatus::Archived, now)
            .await?
        {
            return Ok(TransitionOutcome::Stale);
        }

        info!(
            event_id = %event.id,
            photos_deleted = deleted,
            "Retention period ended, event archived"
        );
        Ok(TransitionOutcome::Transitioned)
    }
}
