use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One attendee's face-scan session for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub event_id: String,
    pub expires_at: DateTime<Utc>,
}
