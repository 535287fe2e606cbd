use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Physical copies kept for every uploaded photo.
///
/// Each variant lives under its own top-level folder in the blob store,
/// keyed as `{folder}/{event_id}/{blob_name}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoVariant {
    Original,
    Processed,
    Thumbnail,
}

impl PhotoVariant {
    pub const ALL: [PhotoVariant; 3] = [Self::Original, Self::Processed, Self::Thumbnail];

    pub fn folder(&self) -> &'static str {
        match self {
            Self::Original => "originals",
            Self::Processed => "processed",
            Self::Thumbnail => "thumbnails",
        }
    }

    /// Prefix under which every blob of this variant for `event_id` lives.
    pub fn event_prefix(&self, event_id: &str) -> String {
        format!("{}/{}/", self.folder(), event_id)
    }
}

/// Photo metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub event_id: String,
    /// File name shared by the three stored copies.
    pub blob_name: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Photo {
    /// Blob key of one stored copy.
    pub fn blob_key(&self, variant: PhotoVariant) -> String {
        format!("{}{}", variant.event_prefix(&self.event_id), self.blob_name)
    }
}
