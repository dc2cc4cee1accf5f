use std::time::Duration;

use anyhow::{anyhow, Result};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::base::{Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::sse::parse_sse_stream;
use super::utils::{
    get_usage, messages_to_openai_spec, openai_response_to_message, tools_to_openai_spec,
};
use crate::models::Message;
use crate::tool::Tool;

const DEFAULT_TIMEOUT_SECS: u64 = 600;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        )
    }

    fn build_payload(&self, model: &str, messages: &[Message], tools: &[Tool], stream: bool) -> Value {
        let mut payload = json!({
            "model": model,
            "messages": messages_to_openai_spec(messages),
        });
        let map = payload.as_object_mut().unwrap();
        if !tools.is_empty() {
            map.insert("tools".to_string(), json!(tools_to_openai_spec(tools)));
        }
        if let Some(temperature) = self.config.temperature {
            map.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = self.config.max_tokens {
            map.insert("max_tokens".to_string(), json!(max_tokens));
        }
        if stream {
            map.insert("stream".to_string(), json!(true));
        }
        payload
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => Err(anyhow!("Request failed: {}", status)),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let payload = self.build_payload(model, messages, tools, false);
        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(anyhow!("OpenAI API error: {}", error));
        }

        let message = openai_response_to_message(&response)?;
        let usage = get_usage(&response)?;
        Ok((message, usage))
    }

    async fn complete_stream(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let payload = self.build_payload(model, messages, tools, true);
        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Streaming request failed: {status}: {body}"));
        }

        let deltas = try_stream! {
            let events = parse_sse_stream(response.bytes_stream());
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                let event = event?;
                if event.data == "[DONE]" {
                    break;
                }
                let chunk: Value = serde_json::from_str(&event.data)?;
                if let Some(error) = chunk.get("error") {
                    Err(anyhow!("OpenAI API error: {}", error))?;
                }
                if let Some(delta) = chunk
                    .pointer("/choices/0/delta/content")
                    .and_then(Value::as_str)
                {
                    if !delta.is_empty() {
                        yield delta.to_string();
                    }
                }
            }
        };

        Ok(deltas.boxed())
    }
}
