//! Entry point for scheduled lifecycle runs.
//!
//! `run_once` is what an external scheduler triggers; `run_workers` is the
//! built-in alternative that loops each enabled job on its own interval.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::{
    error::LifecycleError,
    grace_period::GracePeriodTransitioner,
    report::{JobKind, RunReport},
    retention::RetentionTransitioner,
};
use crate::{
    config::JobsConfig,
    db::DbPool,
    services::{BlobStorage, FaceCollectionService, NotificationSender},
};

pub struct LifecycleRunner {
    grace_period: GracePeriodTransitioner,
    retention: RetentionTransitioner,
}

impl LifecycleRunner {
    pub fn new(
        db: &DbPool,
        blobs: Arc<dyn BlobStorage>,
        faces: Arc<dyn FaceCollectionService>,
        notifier: Arc<dyn NotificationSender>,
        config: JobsConfig,
    ) -> Self {
        Self {
            grace_period: GracePeriodTransitioner::new(db, notifier, config.grace_period),
            retention: RetentionTransitioner::new(db, blobs, faces, config.retention),
        }
    }

    /// Run one job once and log its summary.
    pub async fn run_once(
        &self,
        job: JobKind,
        now: DateTime<Utc>,
    ) -> Result<RunReport, LifecycleError> {
        let result = match job {
            JobKind::GracePeriod => self.grace_period.run(now).await,
            JobKind::Retention => self.retention.run(now).await,
        };

        match &result {
            Ok(report) => log_report(report),
            Err(e) => error!(job = %job, error = %e, "Lifecycle run aborted"),
        }
        result
    }

    /// Run both jobs once, grace period first. A scan failure in one job does
    /// not stop the other.
    pub async fn run_all(
        &self,
        now: DateTime<Utc>,
    ) -> Vec<(JobKind, Result<RunReport, LifecycleError>)> {
        let mut results = Vec::with_capacity(JobKind::ALL.len());
        for job in JobKind::ALL {
            results.push((job, self.run_once(job, now).await));
        }
        results
    }

    /// Loop every enabled job on its configured interval. Never returns
    /// unless no job is enabled; stop it by dropping the future.
    pub async fn run_workers(&self) {
        tokio::join!(
            self.worker_loop(JobKind::GracePeriod),
            self.worker_loop(JobKind::Retention)
        );
        warn!("No lifecycle jobs are enabled, worker has nothing to do");
    }

    async fn worker_loop(&self, job: JobKind) {
        let (enabled, interval) = match job {
            JobKind::GracePeriod => {
                let config = self.grace_period.config();
                (config.enabled, config.interval())
            }
            JobKind::Retention => {
                let config = self.retention.config();
                (config.enabled, config.interval())
            }
        };

        if !enabled {
            info!(job = %job, "Lifecycle job disabled");
            return;
        }

        info!(
            job = %job,
            interval_hours = interval.as_secs() / 3600,
            "Starting lifecycle worker"
        );

        loop {
            // Errors are already logged by run_once; the next tick retries.
            let _ = self.run_once(job, Utc::now()).await;
            tokio::time::sleep(interval).await;
        }
    }
}

fn log_report(report: &RunReport) {
    if report.has_failures() {
        warn!(
            job = %report.job,
            dry_run = report.dry_run,
            scanned = report.scanned,
            transitioned = report.transitioned,
            failed = report.failed_count(),
            stale = report.stale,
            duration_ms = report.duration_ms,
            "Lifecycle run completed with failures"
        );
        for failure in &report.failed {
            warn!(job = %report.job, event_id = %failure.event_id, error = %failure.error, "Event not transitioned");
        }
    } else {
        info!(
            job = %report.job,
            dry_run = report.dry_run,
            stopped_early = report.stopped_early,
            scanned = report.scanned,
            not_due = report.not_due,
            transitioned = report.transitioned,
            stale = report.stale,
            sessions_deleted = report.sessions_deleted,
            blobs_deleted = report.blobs_deleted,
            photos_deleted = report.photos_deleted,
            duration_ms = report.duration_ms,
            "Lifecycle run completed"
        );
    }
}
