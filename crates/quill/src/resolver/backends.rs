//! Storage backends consulted by the document resolver.
//!
//! Two production backends, consulted in order: an HTTP object store
//! keyed by an opaque storage key, and a document record store keyed
//! by a logical document id whose records either carry inline content
//! or point back at an object-store key.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, LAST_MODIFIED};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::warn;

use super::{DocumentBackend, RawObject};

const BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Get-by-key access to an S3-style HTTP object store.
#[derive(Clone)]
pub struct ObjectStoreBackend {
    client: Client,
    endpoint: String,
    bucket: String,
}

impl ObjectStoreBackend {
    pub fn new<E, B>(endpoint: E, bucket: B) -> Result<Self>
    where
        E: Into<String>,
        B: Into<String>,
    {
        let client = Client::builder().timeout(BACKEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            bucket: bucket.into(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket,
            key
        )
    }
}

#[async_trait]
impl DocumentBackend for ObjectStoreBackend {
    fn name(&self) -> &str {
        "object-store"
    }

    async fn fetch(&self, key: &str) -> Result<Option<RawObject>> {
        let response = self.client.get(self.object_url(key)).send().await?;

        match response.status() {
            StatusCode::OK => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let last_modified = response
                    .headers()
                    .get(LAST_MODIFIED)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
                    .map(|dt| dt.with_timezone(&Utc));
                let bytes = response.bytes().await?.to_vec();
                Ok(Some(RawObject {
                    bytes,
                    content_type,
                    last_modified,
                    key: key.to_string(),
                }))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(anyhow!("object store returned {status} for key {key}")),
        }
    }
}

/// Get-by-id access to the document record store.
///
/// A record may carry its content inline (`content`), or point at an
/// object-store key (`storageKey`, historically `s3Key`) which is
/// then fetched through the object store.
pub struct RecordStoreBackend {
    client: Client,
    endpoint: String,
    store: ObjectStoreBackend,
}

impl RecordStoreBackend {
    pub fn new<E: Into<String>>(endpoint: E, store: ObjectStoreBackend) -> Result<Self> {
        let client = Client::builder().timeout(BACKEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            store,
        })
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/documents/{}", self.endpoint.trim_end_matches('/'), id)
    }
}

#[async_trait]
impl DocumentBackend for RecordStoreBackend {
    fn name(&self) -> &str {
        "record-store"
    }

    async fn fetch(&self, id: &str) -> Result<Option<RawObject>> {
        let response = self.client.get(self.record_url(id)).send().await?;

        let record: Value = match response.status() {
            StatusCode::OK => response.json().await?,
            StatusCode::NOT_FOUND => return Ok(None),
            status => return Err(anyhow!("record store returned {status} for document {id}")),
        };

        if let Some(content) = record.get("content").and_then(Value::as_str) {
            let content_type = record
                .get("contentType")
                .and_then(Value::as_str)
                .unwrap_or("text/plain")
                .to_string();
            let last_modified = record
                .get("updatedAt")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            return Ok(Some(RawObject {
                bytes: content.as_bytes().to_vec(),
                content_type: Some(content_type),
                last_modified,
                key: id.to_string(),
            }));
        }

        let storage_key = record
            .get("storageKey")
            .or_else(|| record.get("s3Key"))
            .and_then(Value::as_str);
        match storage_key {
            Some(key) => self.store.fetch(key).await,
            None => {
                warn!(document_id = id, "record has neither content nor storage key");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_object_store_fetch_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documents/reports/q3.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes("third quarter report")
                    .insert_header("Content-Type", "text/plain")
                    .insert_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
            )
            .mount(&server)
            .await;

        let backend = ObjectStoreBackend::new(server.uri(), "documents").unwrap();
        let raw = backend.fetch("reports/q3.txt").await.unwrap().unwrap();

        assert_eq!(raw.bytes, b"third quarter report");
        assert_eq!(raw.content_type.as_deref(), Some("text/plain"));
        assert_eq!(raw.key, "reports/q3.txt");
        assert_eq!(raw.last_modified.unwrap().timestamp(), 1445412480);
    }

    #[tokio::test]
    async fn test_object_store_missing_key_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let backend = ObjectStoreBackend::new(server.uri(), "documents").unwrap();
        assert!(backend.fetch("nope.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_object_store_server_error_is_err() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let backend = ObjectStoreBackend::new(server.uri(), "documents").unwrap();
        assert!(backend.fetch("boom.txt").await.is_err());
    }

    #[tokio::test]
    async fn test_record_store_inline_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documents/doc-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "doc-42",
                "name": "Test Document",
                "content": "This is a sample document for testing purposes.",
                "updatedAt": "2024-05-01T12:00:00Z"
            })))
            .mount(&server)
            .await;

        let store = ObjectStoreBackend::new(server.uri(), "documents").unwrap();
        let backend = RecordStoreBackend::new(server.uri(), store).unwrap();
        let raw = backend.fetch("doc-42").await.unwrap().unwrap();

        assert_eq!(raw.bytes, b"This is a sample document for testing purposes.");
        assert_eq!(raw.content_type.as_deref(), Some("text/plain"));
        assert!(raw.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_record_store_storage_key_indirection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documents/doc-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "doc-7",
                "s3Key": "uploads/doc-7.txt"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bucket/uploads/doc-7.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes("pointed-to content")
                    .insert_header("Content-Type", "text/plain"),
            )
            .mount(&server)
            .await;

        let store = ObjectStoreBackend::new(server.uri(), "bucket").unwrap();
        let backend = RecordStoreBackend::new(server.uri(), store).unwrap();
        let raw = backend.fetch("doc-7").await.unwrap().unwrap();

        assert_eq!(raw.bytes, b"pointed-to content");
        assert_eq!(raw.key, "uploads/doc-7.txt");
    }

    #[tokio::test]
    async fn test_record_store_unknown_id_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = ObjectStoreBackend::new(server.uri(), "bucket").unwrap();
        let backend = RecordStoreBackend::new(server.uri(), store).unwrap();
        assert!(backend.fetch("missing").await.unwrap().is_none());
    }
}
