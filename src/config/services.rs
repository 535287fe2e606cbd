//! External service configuration: the face-index service and the mail API
//! used for organizer notifications.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Face-index service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum FaceIndexConfig {
    /// Process-local collections. Every retirement reports the collection
    /// as already absent.
    #[default]
    Memory,

    /// HTTP face-index service.
    Http(HttpFaceIndexConfig),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpFaceIndexConfig {
    /// Base URL, e.g. "https://faces.internal:8443/v1".
    pub base_url: String,

    /// Bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for HttpFaceIndexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFaceIndexConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl FaceIndexConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            FaceIndexConfig::Memory => "memory",
            FaceIndexConfig::Http(_) => "http",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            FaceIndexConfig::Memory => Ok(()),
            FaceIndexConfig::Http(http) => {
                validate_url("face_index.base_url", &http.base_url)?;
                validate_timeout("face_index.timeout_secs", http.timeout_secs)
            }
        }
    }
}

/// Organizer notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum NotificationsConfig {
    /// Log notifications instead of sending them.
    #[default]
    Log,

    /// Send through a JSON mail API.
    Http(HttpNotificationsConfig),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpNotificationsConfig {
    /// Full URL messages are POSTed to.
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Sender address, e.g. "EventLens <noreply@example.com>".
    pub from_address: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for HttpNotificationsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNotificationsConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("from_address", &self.from_address)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl NotificationsConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            NotificationsConfig::Log => "log",
            NotificationsConfig::Http(_) => "http",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            NotificationsConfig::Log => Ok(()),
            NotificationsConfig::Http(http) => {
                validate_url("notifications.endpoint", &http.endpoint)?;
                if http.from_address.trim().is_empty() {
                    return Err(ConfigError::Validation(
                        "notifications.from_address cannot be empty".into(),
                    ));
                }
                validate_timeout("notifications.timeout_secs", http.timeout_secs)
            }
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "{field} must be an http(s) URL, got '{url}'"
        )));
    }
    Ok(())
}

fn validate_timeout(field: &str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}
