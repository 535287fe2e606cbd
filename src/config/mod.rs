//! Configuration for the lifecycle jobs.
//!
//! Loaded from a TOML file, with support for environment variable
//! interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [database]
//! type = "sqlite"
//! path = "/var/lib/eventlens/eventlens.db"
//!
//! [storage.blobs]
//! backend = "s3"
//!
//! [storage.blobs.s3]
//! bucket = "eventlens-photos"
//! region = "eu-west-1"
//!
//! [face_index]
//! type = "http"
//! base_url = "https://faces.internal"
//! api_key = "${FACE_INDEX_API_KEY}"
//! ```

mod database;
mod jobs;
mod observability;
mod services;
mod storage;

use std::path::Path;

pub use database::*;
pub use jobs::*;
pub use observability::*;
use serde::{Deserialize, Serialize};
pub use services::*;
pub use storage::*;

/// Root configuration.
///
/// Every section is optional. An empty file runs both jobs against
/// in-memory collaborators, which is only useful for trying things out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Event, session, photo, and user records.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Photo blob storage.
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub face_index: FaceIndexConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl LifecycleConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        // Catch feature-gated values before typed deserialization turns them
        // into "unknown variant" errors.
        let raw: toml::Value = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        check_disabled_features(&raw)?;

        let config: LifecycleConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.storage
            .blobs
            .validate()
            .map_err(ConfigError::Validation)?;
        self.face_index.validate()?;
        self.notifications.validate()?;
        self.jobs.validate()?;
        self.observability.metrics.validate()?;

        if self.database.is_memory() && (self.jobs.grace_period.enabled || self.jobs.retention.enabled)
        {
            tracing::warn!(
                "Lifecycle jobs are configured against in-memory record stores; \
                 runs will find no events"
            );
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Check for feature-gated configuration values before typed deserialization.
///
/// Reports every value that needs a cargo feature this binary was built
/// without, and which features to rebuild with.
fn check_disabled_features(raw: &toml::Value) -> Result<(), ConfigError> {
    let mut issues: Vec<(String, &str)> = Vec::new();

    if let Some(type_val) = raw
        .get("database")
        .and_then(|v| v.get("type"))
        .and_then(|v| v.as_str())
    {
        check_database_feature(type_val, &mut issues);
    }

    if let Some(backend) = raw
        .get("storage")
        .and_then(|v| v.get("blobs"))
        .and_then(|v| v.get("backend"))
        .and_then(|v| v.as_str())
    {
        check_blob_storage_feature(backend, &mut issues);
    }

    if raw
        .get("observability")
        .and_then(|v| v.get("metrics"))
        .and_then(|v| v.get("enabled"))
        .and_then(|v| v.as_bool())
        == Some(true)
    {
        check_metrics_feature(&mut issues);
    }

    if issues.is_empty() {
        return Ok(());
    }

    let details = issues
        .iter()
        .map(|(msg, _)| msg.as_str())
        .collect::<Vec<_>>()
        .join("\n  - ");
    let features = issues
        .iter()
        .map(|(_, feat)| *feat)
        .collect::<Vec<_>>()
        .join(",");

    Err(ConfigError::Validation(format!(
        "Configuration requires features not compiled in this build:\n  \
         - {details}\n\n\
         Rebuild with: cargo build --features {features}\n\
         Or use the 'full' profile: cargo build --features full\n\
         Run 'eventlens features' to see all available features."
    )))
}

fn check_database_feature(type_val: &str, _issues: &mut Vec<(String, &str)>) {
    match type_val {
        #[cfg(not(feature = "database-sqlite"))]
        "sqlite" => _issues.push((
            "database type 'sqlite' requires the 'database-sqlite' feature".into(),
            "database-sqlite",
        )),
        _ => {}
    }
}

fn check_blob_storage_feature(backend: &str, _issues: &mut Vec<(String, &str)>) {
    match backend {
        #[cfg(not(feature = "s3-storage"))]
        "s3" => _issues.push((
            "storage.blobs.backend 's3' requires the 's3-storage' feature".into(),
            "s3-storage",
        )),
        _ => {}
    }
}

fn check_metrics_feature(_issues: &mut Vec<(String, &str)>) {
    #[cfg(not(feature = "prometheus"))]
    _issues.push((
        "observability.metrics.enabled requires the 'prometheus' feature".into(),
        "prometheus",
    ));
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips variables that appear after a `#` on the same line.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(format!("Invalid interpolation pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);
            let value = std::env::var(name.as_str())
                .map_err(|_| ConfigError::EnvVarNotFound(name.as_str().to_string()))?;
            result.push_str(&value);
            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

/// Commented starter configuration written by `eventlens init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# EventLens lifecycle jobs configuration

# Record stores holding events, sessions, photos, and users.
[database]
type = "sqlite"
path = "eventlens.db"

# Photo copies live under originals/, processed/, and thumbnails/.
[storage.blobs]
backend = "memory"
# backend = "s3"
#
# [storage.blobs.s3]
# bucket = "eventlens-photos"
# region = "us-east-1"

# Face-index service holding one collection per event.
[face_index]
type = "memory"
# type = "http"
# base_url = "https://faces.example.com"
# api_key = "${FACE_INDEX_API_KEY}"

# Organizer emails. "log" writes them to the log instead of sending.
[notifications]
type = "log"
# type = "http"
# endpoint = "https://mail.example.com/send"
# from_address = "EventLens <noreply@example.com>"

[jobs.grace_period]
enabled = true
interval_hours = 24
dry_run = false
session_batch_size = 25
notify_organizer = true

[jobs.retention]
enabled = true
interval_hours = 24
dry_run = false
blob_batch_size = 1000
photo_batch_size = 25
# max_duration_secs = 3600

[observability.logging]
level = "info"
format = "compact"
"#;
