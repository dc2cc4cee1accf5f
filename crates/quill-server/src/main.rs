use anyhow::Result;
use quill::providers::openai::OpenAiProvider;
use quill::registry::AgentRegistry;
use quill::resolver::DocumentResolver;
use quill_server::configuration::Settings;
use quill_server::routes;
use quill_server::state::{AppState, UploadTarget};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::new()?;
    let addr = settings.server.socket_addr();

    let (provider_config, model) = settings.provider.into_parts();
    let provider: Arc<dyn quill::providers::base::Provider> =
        Arc::new(OpenAiProvider::new(provider_config)?);
    let registry = Arc::new(AgentRegistry::new(model));

    let resolver = Arc::new(DocumentResolver::new(
        settings.storage.document_backends()?,
    ));

    let state = AppState::new(
        registry,
        resolver,
        provider,
        UploadTarget {
            base_url: settings.storage.object_store_url.clone(),
            bucket: settings.storage.bucket.clone(),
            expiry_secs: settings.storage.upload_expiry_secs,
        },
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
