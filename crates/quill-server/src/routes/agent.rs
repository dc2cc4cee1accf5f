use crate::state::AppState;
use axum::{
    extract::State,
    http::{self, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use quill::conversation::build_conversation;
use quill::dispatch;
use quill::models::Message;
use quill::registry::Mode;
use quill::resolver::{DocumentContext, DocumentMetadata};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize)]
pub struct AgentMessageRequest {
    #[serde(default)]
    messages: Vec<IncomingMessage>,
    #[serde(rename = "documentId", alias = "document_id", default)]
    document_id: Option<String>,
    #[serde(default)]
    instruction: Option<String>,
    #[serde(default = "default_mode")]
    mode: String,
    #[serde(default)]
    stream: bool,
}

fn default_mode() -> String {
    "analyze".to_string()
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    role: String,
    content: String,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Serialize)]
struct AgentResponse {
    message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<DocumentMetadata>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

fn invalid_mode_error(mode: &str) -> String {
    format!("Invalid mode: {mode}. Must be one of analyze, edit, create")
}

// Convert incoming messages to our internal Message type
fn convert_messages(incoming: Vec<IncomingMessage>) -> Vec<Message> {
    let mut messages = Vec::with_capacity(incoming.len());
    for msg in incoming {
        let mut message = match msg.role.as_str() {
            "user" => Message::user(msg.content),
            "assistant" => Message::assistant(msg.content),
            "system" => Message::system(msg.content),
            other => {
                warn!("Unknown role: {}", other);
                continue;
            }
        };
        message.id = msg.id;
        messages.push(message);
    }
    messages
}

/// Resolve the request's document reference, if any. An unresolvable
/// id is a not-found outcome, distinct from "no document requested".
async fn resolve_document(
    state: &AppState,
    document_id: Option<&str>,
) -> Result<Option<DocumentContext>, String> {
    match document_id {
        Some(document_id) => match state.resolver.resolve(document_id).await {
            Some(context) => Ok(Some(context)),
            None => Err(format!("Document not found: {document_id}")),
        },
        None => Ok(None),
    }
}

async fn message_handler(
    State(state): State<AppState>,
    Json(request): Json<AgentMessageRequest>,
) -> axum::response::Response {
    // Mode is validated before any backend or registry call.
    let mode: Mode = match request.mode.parse() {
        Ok(mode) => mode,
        Err(_) => {
            return error_response(StatusCode::BAD_REQUEST, invalid_mode_error(&request.mode))
        }
    };
    if request.stream {
        debug!("stream flag set on synchronous endpoint; use /api/agent/message/stream");
    }

    let document = match resolve_document(&state, request.document_id.as_deref()).await {
        Ok(document) => document,
        Err(message) => return error_response(StatusCode::NOT_FOUND, message),
    };

    let Some(config) = state.registry.get(mode) else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to initialize agent for mode: {mode}"),
        );
    };

    let history = convert_messages(request.messages);
    let conversation = build_conversation(
        &config,
        request.instruction.as_deref(),
        document.as_ref(),
        &history,
    );

    match dispatch::reply(state.provider.as_ref(), &config, &conversation).await {
        Ok(message) => (
            StatusCode::OK,
            Json(AgentResponse {
                message,
                document: document.map(|d| d.metadata),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "agent invocation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// Custom SSE response type over line-oriented "data: {json}" framing
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        http::Response::builder()
            .header("Content-Type", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .body(body)
            .unwrap()
    }
}

async fn send_error(tx: &mpsc::Sender<String>, message: String) {
    let _ = tx
        .send(format!("data: {}\n\n", json!({ "error": message })))
        .await;
}

async fn stream_handler(
    State(state): State<AppState>,
    Json(request): Json<AgentMessageRequest>,
) -> SseResponse {
    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    tokio::spawn(async move {
        // Pre-stream failures become a single error frame: the
        // consumer always sees a terminating signal.
        let mode: Mode = match request.mode.parse() {
            Ok(mode) => mode,
            Err(_) => {
                send_error(&tx, invalid_mode_error(&request.mode)).await;
                return;
            }
        };

        let document = match resolve_document(&state, request.document_id.as_deref()).await {
            Ok(document) => document,
            Err(message) => {
                send_error(&tx, message).await;
                return;
            }
        };

        let Some(config) = state.registry.get(mode) else {
            send_error(&tx, format!("Failed to initialize agent for mode: {mode}")).await;
            return;
        };

        let history = convert_messages(request.messages);
        let conversation = build_conversation(
            &config,
            request.instruction.as_deref(),
            document.as_ref(),
            &history,
        );

        let mut frames = dispatch::reply_stream(
            state.provider.clone(),
            config,
            conversation,
            document.map(|d| d.metadata),
        );
        while let Some(frame) = frames.next().await {
            let encoded = match serde_json::to_string(&frame) {
                Ok(encoded) => encoded,
                Err(e) => {
                    error!(error = %e, "could not encode stream frame");
                    break;
                }
            };
            // A closed receiver means the client disconnected; stop
            // producing and let the upstream call drop.
            if tx.send(format!("data: {encoded}\n\n")).await.is_err() {
                break;
            }
        }
    });

    SseResponse::new(stream)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/agent/message", post(message_handler))
        .route("/api/agent/message/stream", post(stream_handler))
        .route("/api/agent/health", get(health_handler))
        .with_state(state)
}
