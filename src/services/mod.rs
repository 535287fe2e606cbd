//! Adapters for the collaborators the lifecycle jobs consume besides the
//! record stores: blob storage, the face-index service, and organizer
//! notifications.

pub mod blob_storage;
pub mod face_index;
pub mod notifications;

pub use blob_storage::{
    BlobStorage, BlobStorageError, BlobStorageResult, MAX_BLOB_BATCH_SIZE, MemoryBlobStorage,
    create_blob_storage,
};
pub use face_index::{
    FaceCollectionService, FaceIndexError, FaceIndexResult, HttpFaceCollections,
    MemoryFaceCollections, create_face_collection_service,
};
pub use notifications::{
    HttpNotificationSender, LogNotificationSender, Notification, NotificationError,
    NotificationResult, NotificationSender, create_notification_sender,
};
