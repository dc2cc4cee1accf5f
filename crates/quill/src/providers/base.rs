use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::models::Message;
use crate::tool::Tool;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// The language-model service, treated as a black box.
///
/// `messages` is the full ordered conversation including system
/// messages; implementations pass the order through unchanged.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the complete next message in one call.
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)>;

    /// Generate the next message as a stream of content deltas.
    ///
    /// A provider with no incremental delivery implements this by
    /// yielding the whole completion as a single delta; the dispatch
    /// layer treats that as the degraded single-frame path.
    async fn complete_stream(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<BoxStream<'static, Result<String>>>;
}
