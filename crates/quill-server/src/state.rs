use std::sync::Arc;

use quill::providers::base::Provider;
use quill::registry::AgentRegistry;
use quill::resolver::DocumentResolver;

/// Where issued upload URLs point.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub base_url: String,
    pub bucket: String,
    pub expiry_secs: u64,
}

/// Shared application state.
///
/// Everything is behind an `Arc` so tests can assemble a router with
/// stub providers and backends and inspect the registry afterwards.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AgentRegistry>,
    pub resolver: Arc<DocumentResolver>,
    pub provider: Arc<dyn Provider>,
    pub upload: Arc<UploadTarget>,
}

impl AppState {
    pub fn new(
        registry: Arc<AgentRegistry>,
        resolver: Arc<DocumentResolver>,
        provider: Arc<dyn Provider>,
        upload: UploadTarget,
    ) -> Self {
        Self {
            registry,
            resolver,
            provider,
            upload: Arc::new(upload),
        }
    }
}
