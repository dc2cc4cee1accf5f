use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Failed to initialize agent: {0}")]
    Registry(String),

    #[error("Model invocation failed: {0}")]
    Invocation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
