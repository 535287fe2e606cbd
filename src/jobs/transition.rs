//! The per-event loop shared by both lifecycle jobs.
//!
//! A job supplies the candidate statuses, its deadline predicate, and the
//! destructive work for one event. [`run_job`] owns everything else: the
//! scan, the pre-action re-check, dry-run, the duration budget, per-event
//! failure isolation, and the run report.

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::{
    error::LifecycleError,
    report::{JobKind, RunReport},
};
use crate::{
    db::EventRepo,
    models::{Event, EventStatus},
    observability::metrics,
};

/// Result of applying a transition to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Transitioned,
    /// Another writer moved the event first; the conditional status write
    /// was a no-op.
    Stale,
}

/// One lifecycle job, driven by [`run_job`].
#[async_trait]
pub trait LifecycleJob: Send + Sync {
    fn kind(&self) -> JobKind;

    fn events(&self) -> &Arc<dyn EventRepo>;

    /// Statuses the job scans for and is allowed to move an event out of.
    fn candidate_statuses(&self) -> &'static [EventStatus];

    fn is_due(&self, event: &Event, now: DateTime<Utc>) -> bool;

    fn dry_run(&self) -> bool;

    fn max_duration(&self) -> Option<std::time::Duration>;

    /// Human-readable description for dry-run logs.
    fn describe(&self, event: &Event) -> String;

    /// Do the destructive work for a due, freshly re-checked event and write
    /// its new status last.
    async fn transition(
        &self,
        event: &Event,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) -> Result<TransitionOutcome, LifecycleError>;
}

/// Run a job once against `now`.
///
/// Returns `Err` only when the initial scan fails. Everything that goes wrong
/// for a single event is logged, recorded in the report, and skipped.
pub async fn run_job<J>(job: &J, now: DateTime<Utc>) -> Result<RunReport, LifecycleError>
where
    J: LifecycleJob + ?Sized,
{
    let start = Instant::now();
    let kind = job.kind();
    let candidates = job.candidate_statuses();
    let mut report = RunReport::new(kind, now, job.dry_run());

    let events = job
        .events()
        .list_by_status(candidates)
        .await
        .map_err(|e| {
            error!(job = %kind, error = %e, "Failed to scan candidate events, aborting run");
            metrics::record_lifecycle_error(kind.as_str(), "scan");
            LifecycleError::Scan(e)
        })?;
    report.scanned = events.len();
    debug!(job = %kind, candidates = events.len(), "Scanned candidate events");

    for scanned in events {
        if let Some(max) = job.max_duration()
            && start.elapsed() >= max
        {
            warn!(
                job = %kind,
                elapsed_secs = start.elapsed().as_secs(),
                max_secs = max.as_secs(),
                "Run exceeded max duration, stopping early"
            );
            report.stopped_early = true;
            break;
        }

        if !job.is_due(&scanned, now) {
            debug!(job = %kind, event_id = %scanned.id, "Not due yet");
            report.not_due += 1;
            continue;
        }

        // Re-read right before acting so an overlapping run that already
        // moved this event turns into a skip.
        let event = match job.events().get(&scanned.id).await {
            Ok(Some(event)) if candidates.contains(&event.status) => event,
            Ok(current) => {
                info!(
                    job = %kind,
                    event_id = %scanned.id,
                    status = ?current.map(|e| e.status),
                    "Event changed since scan, skipping"
                );
                report.stale += 1;
                metrics::record_lifecycle_transition(kind.as_str(), "stale");
                continue;
            }
            Err(e) => {
                error!(job = %kind, event_id = %scanned.id, error = %e, "Failed to re-read event");
                report.record_failure(&scanned.id, LifecycleError::Db(e));
                metrics::record_lifecycle_transition(kind.as_str(), "failed");
                metrics::record_lifecycle_error(kind.as_str(), "database");
                continue;
            }
        };

        if !job.is_due(&event, now) {
            debug!(job = %kind, event_id = %event.id, "Not due after re-read");
            report.not_due += 1;
            continue;
        }

        if job.dry_run() {
            info!(
                job = %kind,
                event_id = %event.id,
                "DRY RUN: Would {}",
                job.describe(&event)
            );
            report.transitioned += 1;
            metrics::record_lifecycle_transition(kind.as_str(), "dry_run");
            continue;
        }

        match job.transition(&event, now, &mut report).await {
            Ok(TransitionOutcome::Transitioned) => {
                report.transitioned += 1;
                metrics::record_lifecycle_transition(kind.as_str(), "transitioned");
            }
            Ok(TransitionOutcome::Stale) => {
                warn!(
                    job = %kind,
                    event_id = %event.id,
                    "Status changed during transition, status write skipped"
                );
                report.stale += 1;
                metrics::record_lifecycle_transition(kind.as_str(), "stale");
            }
            Err(e) => {
                error!(
                    job = %kind,
                    event_id = %event.id,
                    error = %e,
                    "Event transition failed, will retry next run"
                );
                metrics::record_lifecycle_transition(kind.as_str(), "failed");
                metrics::record_lifecycle_error(kind.as_str(), e.kind());
                report.record_failure(&event.id, e);
            }
        }
    }

    report.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    metrics::record_lifecycle_run(
        kind.as_str(),
        start.elapsed().as_secs_f64(),
        report.stopped_early,
    );

    Ok(report)
}
