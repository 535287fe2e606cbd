//! Face-index collection service.
//!
//! Each event has one collection of indexed faces in the face-recognition
//! service. The lifecycle jobs only ever delete collections, and need to tell
//! "already gone" apart from every other failure.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashSet;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::FaceIndexConfig;

#[derive(Debug, Error)]
pub enum FaceIndexError {
    #[error("Collection not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Face index service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type FaceIndexResult<T> = Result<T, FaceIndexError>;

#[async_trait]
pub trait FaceCollectionService: Send + Sync {
    /// Delete a collection and every face indexed in it.
    ///
    /// Must return [`FaceIndexError::NotFound`] when the collection does not
    /// exist.
    async fn delete_collection(&self, collection_id: &str) -> FaceIndexResult<()>;

    fn backend_name(&self) -> &'static str;
}

/// In-memory face collection service.
#[derive(Default)]
pub struct MemoryFaceCollections {
    collections: DashSet<String>,
}

impl MemoryFaceCollections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_collection(&self, collection_id: impl Into<String>) {
        self.collections.insert(collection_id.into());
    }

    pub fn contains(&self, collection_id: &str) -> bool {
        self.collections.contains(collection_id)
    }
}

#[async_trait]
impl FaceCollectionService for MemoryFaceCollections {
    async fn delete_collection(&self, collection_id: &str) -> FaceIndexResult<()> {
        match self.collections.remove(collection_id) {
            Some(_) => Ok(()),
            None => Err(FaceIndexError::NotFound(collection_id.to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// HTTP face-index client.
///
/// Deletes collections with `DELETE {base_url}/collections/{id}`. A 404
/// response maps to [`FaceIndexError::NotFound`].
pub struct HttpFaceCollections {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpFaceCollections {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> FaceIndexResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FaceIndexError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build a request with optional bearer token.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let req = self.client.request(method, &url);
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[async_trait]
impl FaceCollectionService for HttpFaceCollections {
    #[instrument(skip(self), fields(backend = "http"))]
    async fn delete_collection(&self, collection_id: &str) -> FaceIndexResult<()> {
        let resp = self
            .request(
                reqwest::Method::DELETE,
                &format!("/collections/{collection_id}"),
            )
            .send()
            .await
            .map_err(|e| FaceIndexError::Http(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FaceIndexError::NotFound(collection_id.to_string()));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FaceIndexError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!(collection_id, "Deleted face collection");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

/// Create the face collection service from configuration.
pub fn create_face_collection_service(
    config: &FaceIndexConfig,
) -> FaceIndexResult<Arc<dyn FaceCollectionService>> {
    match config {
        FaceIndexConfig::Memory => {
            tracing::warn!(
                "Using in-memory face collections; retiring a collection will report it absent"
            );
            Ok(Arc::new(MemoryFaceCollections::new()))
        }
        FaceIndexConfig::Http(http) => Ok(Arc::new(HttpFaceCollections::new(
            &http.base_url,
            http.api_key.clone(),
            Duration::from_secs(http.timeout_secs),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    use super::*;

    #[tokio::test]
    async fn test_memory_delete_then_not_found() {
        let faces = MemoryFaceCollections::new();
        faces.create_collection("evt-1");

        faces.delete_collection("evt-1").await.unwrap();
        assert!(!faces.contains("evt-1"));
        assert!(matches!(
            faces.delete_collection("evt-1").await,
            Err(FaceIndexError::NotFound(id)) if id == "evt-1"
        ));
    }

    #[tokio::test]
    async fn test_http_delete_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/collections/evt-1"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let faces = HttpFaceCollections::new(
            &format!("{}/", server.uri()),
            Some("secret".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        faces.delete_collection("evt-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_http_404_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/collections/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let faces = HttpFaceCollections::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        assert!(matches!(
            faces.delete_collection("gone").await,
            Err(FaceIndexError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_http_server_error_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/collections/evt-2"))
            .respond_with(ResponseTemplate::new(503).set_body_string("throttled"))
            .mount(&server)
            .await;

        let faces = HttpFaceCollections::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        match faces.delete_collection("evt-2").await {
            Err(FaceIndexError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "throttled");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
