//! Grace period expiry: `ACTIVE`/`GRACE_PERIOD` -> `DOWNLOAD_PERIOD`.
//!
//! Once an event's grace period is over, attendees can no longer scan their
//! faces, so every session for the event is deleted before the status moves
//! on. The organizer then gets a best-effort email with the date their
//! photos will be deleted.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::{
    batch::BatchDeleter,
    error::{LifecycleError, LifecycleResult},
    report::{JobKind, RunReport},
    transition::{LifecycleJob, TransitionOutcome, run_job},
};
use crate::{
    config::GracePeriodJobConfig,
    db::{DbPool, EventRepo, SessionRepo, UserRepo},
    models::{Event, EventStatus},
    observability::metrics,
    services::{Notification, NotificationSender},
};

const CANDIDATES: &[EventStatus] = &[EventStatus::Active, EventStatus::GracePeriod];

pub struct GracePeriodTransitioner {
    events: Arc<dyn EventRepo>,
    sessions: Arc<dyn SessionRepo>,
    users: Arc<dyn UserRepo>,
    notifier: Arc<dyn NotificationSender>,
    session_deleter: BatchDeleter,
    config: GracePeriodJobConfig,
}

impl GracePeriodTransitioner {
    pub fn new(
        db: &DbPool,
        notifier: Arc<dyn NotificationSender>,
        config: GracePeriodJobConfig,
    ) -> Self {
        Self {
            events: db.events(),
            sessions: db.sessions(),
            users: db.users(),
            notifier,
            session_deleter: BatchDeleter::new(config.session_batch_size),
            config,
        }
    }

    pub fn config(&self) -> &GracePeriodJobConfig {
        &self.config
    }

    /// Transition every event whose grace period ended before `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> LifecycleResult<RunReport> {
        run_job(self, now).await
    }

    /// Email the organizer. Never fails the transition.
    async fn notify_organizer(&self, event: &Event, report: &mut RunReport) {
        let user = match self.users.get_by_id(&event.organizer_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(
                    event_id = %event.id,
                    organizer_id = %event.organizer_id,
                    "Organizer not found, skipping notification"
                );
                return;
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Failed to load organizer, skipping notification");
                report.notification_failures += 1;
                metrics::record_lifecycle_error(JobKind::GracePeriod.as_str(), "notification");
                return;
            }
        };

        let Some(address) = user.notification_address() else {
            debug!(event_id = %event.id, "Organizer has no email address on file");
            return;
        };

        let notification = Notification::grace_period_ended(event, address);
        match self.notifier.send(&notification).await {
            Ok(()) => {
                debug!(event_id = %event.id, backend = self.notifier.backend_name(), "Organizer notified");
                report.notifications_sent += 1;
            }
            Err(e) => {
                warn!(
                    event_id = %event.id,
                    backend = self.notifier.backend_name(),
                    error = %e,
                    "Failed to notify organizer"
                );
                report.notification_failures += 1;
                metrics::record_lifecycle_error(JobKind::GracePeriod.as_str(), "notification");
            }
        }
    }
}

#[async_trait]
impl LifecycleJob for GracePeriodTransitioner {
    fn kind(&self) -> JobKind {
        JobKind::GracePeriod
    }

    fn events(&self) -> &Arc<dyn EventRepo> {
        &self.events
    }

    fn candidate_statuses(&self) -> &'static [EventStatus] {
        CANDIDATES
    }

    fn is_due(&self, event: &Event, now: DateTime<Utc>) -> bool {
        event.is_grace_period_over(now)
    }

    fn dry_run(&self) -> bool {
        self.config.dry_run
    }

    fn max_duration(&self) -> Option<std::time::Duration> {
        self.config.max_duration()
    }

    fn describe(&self, event: &Event) -> String {
        format!(
            "delete sessions for event '{}' and move it from {} to {}",
            event.name,
            event.status,
            EventStatus::DownloadPeriod
        )
    }

    #[instrument(skip_all, fields(event_id = %event.id))]
    async fn transition(
        &self,
        event: &Event,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) -> Result<TransitionOutcome, LifecycleError> {
        let session_ids: Vec<String> = self
            .sessions
            .list_by_event(&event.id)
            .await?
            .into_iter()
            .map(|session| session.id)
            .collect();

        let deleted = self
            .session_deleter
            .delete_all(self.sessions.as_ref(), &session_ids)
            .await?;
        report.sessions_deleted += deleted;
        metrics::record_lifecycle_deletion(JobKind::GracePeriod.as_str(), "sessions", deleted as u64);

        if !self
            .events
            .update_status(&event.id, CANDIDATES, EventStatus::DownloadPeriod, now)
            .await?
        {
            return Ok(TransitionOutcome::Stale);
        }

        info!(
            event_id = %event.id,
            from = %event.status,
            sessions_deleted = deleted,
            "Grace period ended, event moved to download period"
        );

        if self.config.notify_organizer {
            self.notify_organizer(event, report).await;
        }

        Ok(TransitionOutcome::Transitioned)
    }
}
