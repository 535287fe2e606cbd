use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which lifecycle job produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    GracePeriod,
    Retention,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::GracePeriod, JobKind::Retention];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::GracePeriod => "grace_period",
            JobKind::Retention => "retention",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event whose transition attempt failed. It keeps its prior status and is
/// re-evaluated on the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventFailure {
    pub event_id: String,
    pub error: String,
}

/// Outcome of one lifecycle job run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub job: JobKind,
    /// The `now` the run evaluated deadlines against.
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub dry_run: bool,
    /// The run hit its duration budget before visiting every candidate.
    pub stopped_early: bool,

    /// Candidate events returned by the scan.
    pub scanned: usize,
    pub not_due: usize,
    pub transitioned: usize,
    /// Events whose status changed underneath the run.
    pub stale: usize,
    pub failed: Vec<EventFailure>,

    pub sessions_deleted: usize,
    pub blobs_deleted: usize,
    pub photos_deleted: usize,
    pub collections_retired: usize,
    pub collections_absent: usize,
    pub collection_failures: usize,
    pub folder_failures: usize,
    pub notifications_sent: usize,
    pub notification_failures: usize,
}

impl RunReport {
    pub fn new(job: JobKind, started_at: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            job,
            started_at,
            duration_ms: 0,
            dry_run,
            stopped_early: false,
            scanned: 0,
            not_due: 0,
            transitioned: 0,
            stale: 0,
            failed: Vec::new(),
            sessions_deleted: 0,
            blobs_deleted: 0,
            photos_deleted: 0,
            collections_retired: 0,
            collections_absent: 0,
            collection_failures: 0,
            folder_failures: 0,
            notifications_sent: 0,
            notification_failures: 0,
        }
    }

    pub fn record_failure(&mut self, event_id: &str, error: impl fmt::Display) {
        self.failed.push(EventFailure {
            event_id: event_id.to_string(),
            error: error.to_string(),
        });
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Check if any data was deleted.
    pub fn has_deletions(&self) -> bool {
        self.sessions_deleted > 0 || self.blobs_deleted > 0 || self.photos_deleted > 0
    }
}
