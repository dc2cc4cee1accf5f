//! Turns one logical agent invocation into either a synchronous
//! result or an ordered event stream with exactly one terminal frame.

use std::sync::Arc;

use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::errors::{AgentError, AgentResult};
use crate::models::{Message, Role};
use crate::providers::base::Provider;
use crate::registry::AgentConfig;
use crate::resolver::DocumentMetadata;

/// One frame of an incremental response.
///
/// The message id is stable across every frame of a stream. The
/// resolved document metadata rides only on the terminal frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentEvent {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorFrame {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamFrame {
    Event(AgentEvent),
    Error(ErrorFrame),
}

impl StreamFrame {
    /// Terminal frames end the stream: either the completed event or
    /// an error in its place, never both.
    pub fn is_terminal(&self) -> bool {
        match self {
            StreamFrame::Event(event) => event.is_complete,
            StreamFrame::Error(_) => true,
        }
    }
}

/// Invoke the agent and wait for the complete response.
pub async fn reply(
    provider: &dyn Provider,
    config: &AgentConfig,
    messages: &[Message],
) -> AgentResult<Message> {
    let (message, usage) = provider
        .complete(&config.model, messages, &config.tools)
        .await
        .map_err(|e| AgentError::Invocation(e.to_string()))?;

    debug!(
        agent = %config.name,
        input_tokens = ?usage.input_tokens,
        output_tokens = ?usage.output_tokens,
        "model call completed"
    );
    Ok(message.with_id(Uuid::new_v4().to_string()))
}

/// Invoke the agent and stream the response incrementally.
///
/// Yields zero or more non-terminal delta events followed by exactly
/// one terminal frame: the completed event carrying the accumulated
/// content (and document metadata, if any), or an error frame when
/// the model call fails mid-stream. Dropping the stream cancels the
/// underlying call at the next yield point.
pub fn reply_stream(
    provider: Arc<dyn Provider>,
    config: Arc<AgentConfig>,
    messages: Vec<Message>,
    document: Option<DocumentMetadata>,
) -> BoxStream<'static, StreamFrame> {
    let id = Uuid::new_v4().to_string();

    stream! {
        let deltas = match provider
            .complete_stream(&config.model, &messages, &config.tools)
            .await
        {
            Ok(deltas) => deltas,
            Err(e) => {
                error!(agent = %config.name, error = %e, "failed to start model stream");
                yield StreamFrame::Error(ErrorFrame {
                    error: AgentError::Invocation(e.to_string()).to_string(),
                });
                return;
            }
        };
        futures::pin_mut!(deltas);

        let mut accumulated = String::new();
        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(delta) => {
                    accumulated.push_str(&delta);
                    yield StreamFrame::Event(AgentEvent {
                        id: id.clone(),
                        role: Role::Assistant,
                        content: delta,
                        is_complete: false,
                        document: None,
                    });
                }
                Err(e) => {
                    error!(agent = %config.name, error = %e, "model stream failed");
                    yield StreamFrame::Error(ErrorFrame {
                        error: AgentError::Invocation(e.to_string()).to_string(),
                    });
                    return;
                }
            }
        }

        yield StreamFrame::Event(AgentEvent {
            id: id.clone(),
            role: Role::Assistant,
            content: accumulated,
            is_complete: true,
            document,
        });
    }
    .boxed()
}
