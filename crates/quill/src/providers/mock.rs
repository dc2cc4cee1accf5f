use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::models::Message;
use crate::providers::base::{Provider, Usage};
use crate::tool::Tool;

/// Scripted delta sequence for one streaming call; an error, when
/// set, is delivered after the deltas.
pub struct StreamScript {
    pub deltas: Vec<String>,
    pub error: Option<String>,
}

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Message>>>,
    stream_script: Arc<Mutex<Option<StreamScript>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            stream_script: Arc::new(Mutex::new(None)),
        }
    }

    /// Script the next streaming call to deliver these deltas.
    pub fn with_stream(self, deltas: Vec<&str>) -> Self {
        *self.stream_script.lock().unwrap() = Some(StreamScript {
            deltas: deltas.into_iter().map(String::from).collect(),
            error: None,
        });
        self
    }

    /// Script the next streaming call to fail after these deltas.
    pub fn with_failing_stream(self, deltas: Vec<&str>, error: &str) -> Self {
        *self.stream_script.lock().unwrap() = Some(StreamScript {
            deltas: deltas.into_iter().map(String::from).collect(),
            error: Some(error.to_string()),
        });
        self
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _model: &str,
        _messages: &[Message],
        _tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            Ok((Message::assistant(""), Usage::default()))
        } else {
            Ok((responses.remove(0), Usage::default()))
        }
    }

    async fn complete_stream(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let script = self.stream_script.lock().unwrap().take();
        match script {
            Some(script) => {
                let mut items: Vec<Result<String>> =
                    script.deltas.into_iter().map(Ok).collect();
                if let Some(error) = script.error {
                    items.push(Err(anyhow!(error)));
                }
                Ok(futures::stream::iter(items).boxed())
            }
            None => {
                // No script: degrade to the whole completion in one delta.
                let (message, _) = self.complete(model, messages, tools).await?;
                Ok(futures::stream::iter(vec![Ok(message.content)]).boxed())
            }
        }
    }
}
