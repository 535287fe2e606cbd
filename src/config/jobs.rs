//! Lifecycle job configuration.
//!
//! # Example
//!
//! ```toml
//! [jobs.grace_period]
//! interval_hours = 24
//! notify_organizer = true
//!
//! [jobs.retention]
//! interval_hours = 24
//! dry_run = true
//! max_duration_secs = 3600
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::{db::MAX_RECORD_BATCH_SIZE, services::MAX_BLOB_BATCH_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    #[serde(default)]
    pub grace_period: GracePeriodJobConfig,

    #[serde(default)]
    pub retention: RetentionJobConfig,
}

impl JobsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grace_period.validate()?;
        self.retention.validate()
    }

    /// Force dry-run on every job.
    pub fn set_dry_run(&mut self) {
        self.grace_period.dry_run = true;
        self.retention.dry_run = true;
    }
}

/// Moves events whose grace period has ended into their download period.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GracePeriodJobConfig {
    /// Whether the worker runs this job. One-shot `run` ignores it.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How often to run the job in worker mode (in hours).
    /// Default: 24 (once per day)
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// If true, log what would be transitioned without changing anything.
    #[serde(default)]
    pub dry_run: bool,

    /// Stop starting new events after this many seconds. Unset means no limit.
    #[serde(default)]
    pub max_duration_secs: Option<u64>,

    /// Session ids per batch delete call.
    /// Default: 25 (the record store's limit)
    #[serde(default = "default_record_batch_size")]
    pub session_batch_size: usize,

    /// Email the organizer when their event enters its download period.
    #[serde(default = "default_true")]
    pub notify_organizer: bool,
}

impl Default for GracePeriodJobConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_hours: default_interval_hours(),
            dry_run: false,
            max_duration_secs: None,
            session_batch_size: default_record_batch_size(),
            notify_organizer: true,
        }
    }
}

impl GracePeriodJobConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours * 3600)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_interval("jobs.grace_period", self.interval_hours)?;
        validate_batch_size(
            "jobs.grace_period.session_batch_size",
            self.session_batch_size,
            MAX_RECORD_BATCH_SIZE,
        )
    }
}

/// Archives events whose retention period has ended, purging their photos.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionJobConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub max_duration_secs: Option<u64>,

    /// Blob keys per batch delete call.
    /// Default: 1000 (the blob store's limit)
    #[serde(default = "default_blob_batch_size")]
    pub blob_batch_size: usize,

    /// Photo metadata rows per batch delete call.
    /// Default: 25
    #[serde(default = "default_record_batch_size")]
    pub photo_batch_size: usize,
}

impl Default for RetentionJobConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_hours: default_interval_hours(),
            dry_run: false,
            max_duration_secs: None,
            blob_batch_size: default_blob_batch_size(),
            photo_batch_size: default_record_batch_size(),
        }
    }
}

impl RetentionJobConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours * 3600)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_interval("jobs.retention", self.interval_hours)?;
        validate_batch_size(
            "jobs.retention.blob_batch_size",
            self.blob_batch_size,
            MAX_BLOB_BATCH_SIZE,
        )?;
        validate_batch_size(
            "jobs.retention.photo_batch_size",
            self.photo_batch_size,
            MAX_RECORD_BATCH_SIZE,
        )
    }
}

fn default_true() -> bool {
    true
}

fn default_interval_hours() -> u64 {
    24
}

fn default_record_batch_size() -> usize {
    MAX_RECORD_BATCH_SIZE
}

fn default_blob_batch_size() -> usize {
    MAX_BLOB_BATCH_SIZE
}

fn validate_interval(job: &str, hours: u64) -> Result<(), ConfigError> {
    if hours == 0 {
        return Err(ConfigError::Validation(format!(
            "{job}.interval_hours must be greater than 0"
        )));
    }
    Ok(())
}

fn validate_batch_size(field: &str, size: usize, max: usize) -> Result<(), ConfigError> {
    if size == 0 || size > max {
        return Err(ConfigError::Validation(format!(
            "{field} must be between 1 and {max}, got {size}"
        )));
    }
    Ok(())
}
