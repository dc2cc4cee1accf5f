pub mod backends;
pub mod extract;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use extract::{extract_text, DocumentFormat};

/// A raw object as fetched from a storage backend, before any
/// format-specific extraction.
#[derive(Debug, Clone)]
pub struct RawObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    /// The storage key the object was fetched under.
    pub key: String,
}

/// Metadata describing a resolved document. Attached to responses and
/// to the terminal frame of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub content_type: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub storage_key: String,
    pub filename: String,
}

impl DocumentMetadata {
    fn from_raw(raw: &RawObject) -> Self {
        let filename = raw
            .key
            .rsplit('/')
            .next()
            .unwrap_or(raw.key.as_str())
            .to_string();
        DocumentMetadata {
            content_type: raw.content_type.clone().unwrap_or_default(),
            size: raw.bytes.len() as u64,
            last_modified: raw.last_modified,
            storage_key: raw.key.clone(),
            filename,
        }
    }
}

/// Resolved text plus metadata for one document, valid for the
/// duration of a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentContext {
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// One external content store the resolver can consult.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Backend name, used for logging only.
    fn name(&self) -> &str;

    /// Fetch the raw object for an identifier. `Ok(None)` means the
    /// backend does not know the document; `Err` means the backend
    /// call itself failed.
    async fn fetch(&self, id: &str) -> anyhow::Result<Option<RawObject>>;
}

/// Resolves a document identifier to plain text by consulting an
/// ordered chain of backends.
///
/// The first backend producing extractable content wins; backend
/// errors and extraction failures degrade to trying the next backend
/// rather than propagating. Adding a backend means appending to the
/// chain, not branching here.
pub struct DocumentResolver {
    backends: Vec<Box<dyn DocumentBackend>>,
}

impl DocumentResolver {
    pub fn new(backends: Vec<Box<dyn DocumentBackend>>) -> Self {
        Self { backends }
    }

    /// Resolve a document id to text content and metadata.
    ///
    /// `None` means no backend could produce content for the id; this
    /// is distinct from a document whose content is the empty string.
    pub async fn resolve(&self, document_id: &str) -> Option<DocumentContext> {
        for backend in &self.backends {
            let raw = match backend.fetch(document_id).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    debug!(backend = backend.name(), document_id, "backend has no entry");
                    continue;
                }
                Err(e) => {
                    warn!(
                        backend = backend.name(),
                        document_id,
                        error = %e,
                        "document backend failed"
                    );
                    continue;
                }
            };

            let format = DocumentFormat::detect(raw.content_type.as_deref(), &raw.key);
            match extract_text(format, &raw.bytes) {
                Some(content) => {
                    debug!(
                        backend = backend.name(),
                        document_id,
                        ?format,
                        bytes = raw.bytes.len(),
                        "resolved document"
                    );
                    let metadata = DocumentMetadata::from_raw(&raw);
                    return Some(DocumentContext { content, metadata });
                }
                None => {
                    warn!(
                        backend = backend.name(),
                        document_id,
                        ?format,
                        "could not extract text from document"
                    );
                    continue;
                }
            }
        }
        None
    }
}
