//! Event lifecycle jobs.
//!
//! Two jobs move events through the tail of their lifecycle and delete the
//! data that goes with each step:
//!
//! - [`GracePeriodTransitioner`]: `ACTIVE`/`GRACE_PERIOD` -> `DOWNLOAD_PERIOD`,
//!   deleting attendee sessions and notifying the organizer.
//! - [`RetentionTransitioner`]: `DOWNLOAD_PERIOD` -> `ARCHIVED`, deleting photo
//!   blobs, photo metadata, and the event's face collection.
//!
//! Events are processed one at a time. A failure for one event is recorded
//! and the run moves on; only a failed candidate scan aborts a run. There is
//! no lock between overlapping runs: each event is re-read right before any
//! destructive step and the status write is conditional, so a second run
//! skips events the first already moved.

mod batch;
mod collection;
mod error;
mod grace_period;
mod report;
mod retention;
mod runner;
#[cfg(test)]
pub(crate) mod test_utils;
mod transition;

pub use batch::{BatchDelete, BatchDeleteError, BatchDeleter};
pub use collection::{CollectionRetirer, RetireOutcome};
pub use error::{LifecycleError, LifecycleResult};
pub use grace_period::GracePeriodTransitioner;
pub use report::{EventFailure, JobKind, RunReport};
pub use retention::RetentionTransitioner;
pub use runner::LifecycleRunner;
pub use transition::{LifecycleJob, TransitionOutcome, run_job};
