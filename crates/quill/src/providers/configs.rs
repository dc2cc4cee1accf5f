use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
    /// Request timeout in seconds; defaults to 600 when unset.
    pub timeout_secs: Option<u64>,
}
