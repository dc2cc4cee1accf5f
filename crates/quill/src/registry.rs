use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::json;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{error, info};

use crate::errors::{AgentError, AgentResult};
use crate::tool::Tool;

/// The closed set of agent modes. Anything else is rejected at the
/// request boundary before any backend or registry call.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Analyze,
    Edit,
    Create,
}

/// Immutable per-mode bundle of instructions, tools and model id.
///
/// Built at most once per mode per registry lifetime and shared out
/// behind an `Arc`; a registry reset does not invalidate configs
/// already handed to in-flight requests.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub instructions: String,
    pub tools: Vec<Tool>,
    pub model: String,
}

const ANALYZER_INSTRUCTIONS: &str = "\
You are a document analysis assistant that helps users understand, summarize, and extract insights from documents.

Your capabilities:
1. Summarize documents concisely
2. Extract key information and insights
3. Answer questions about the document content
4. Identify main themes, topics, and arguments
5. Analyze document structure and organization
6. Detect tone, sentiment, and writing style

Guidelines:
- Always base your responses on the document content provided
- When answering questions, cite specific parts of the document
- If information isn't in the document, clearly state that
- Be objective in your analysis unless asked for opinions
- Format your responses clearly with headings and bullet points when appropriate";

const EDITOR_INSTRUCTIONS: &str = "\
You are a document editing assistant that helps users improve their documents.

Your capabilities:
1. Fix grammar, spelling, and punctuation errors
2. Improve clarity, conciseness, and coherence
3. Suggest better phrasing and word choices
4. Restructure sentences and paragraphs for better flow
5. Format documents according to style guidelines
6. Adapt tone and style based on the document purpose

Guidelines:
- Preserve the original meaning and intent of the text
- Explain significant changes you suggest
- When possible, provide both the original and your suggested revision
- Consider the document's purpose and audience
- Be specific in your recommendations
- Focus on substantive improvements, not just surface-level edits";

const CREATOR_INSTRUCTIONS: &str = "\
You are a document creation assistant that helps users generate new documents.

Your capabilities:
1. Draft documents based on user specifications
2. Create outlines and structure for new documents
3. Generate content for specific sections
4. Write in different styles, tones, and formats
5. Adapt content for different audiences and purposes
6. Create templates for future use

Guidelines:
- Ask for clarification on document requirements if needed
- Organize content logically with appropriate headings and structure
- Tailor your writing to the specified audience and purpose
- Provide explanations for your organizational choices when helpful
- Be creative while staying within the user's guidelines
- Suggest improvements or alternatives when appropriate";

fn analyzer_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "summarize_document",
            "Summarize the document or a specified section.",
            json!({
                "type": "object",
                "required": [],
                "properties": {
                    "section": {
                        "type": "string",
                        "description": "Optional section to summarize. If not provided, summarize the entire document."
                    },
                    "length": {
                        "enum": ["brief", "detailed"],
                        "description": "Length of summary: brief (1-2 paragraphs) or detailed (3-5 paragraphs)."
                    }
                }
            }),
        ),
        Tool::new(
            "extract_key_points",
            "Extract key points from the document.",
            json!({
                "type": "object",
                "required": ["max_points"],
                "properties": {
                    "max_points": {
                        "type": "integer",
                        "description": "Maximum number of key points to extract."
                    },
                    "section": {
                        "type": "string",
                        "description": "Optional section to extract from. If not provided, extract from the entire document."
                    }
                }
            }),
        ),
    ]
}

fn editor_tools() -> Vec<Tool> {
    vec![Tool::new(
        "edit_section",
        "Edit a section of the document.",
        json!({
            "type": "object",
            "required": ["section", "new_content", "edit_reason"],
            "properties": {
                "section": {
                    "type": "string",
                    "description": "Section to edit."
                },
                "new_content": {
                    "type": "string",
                    "description": "New content for the section."
                },
                "edit_reason": {
                    "type": "string",
                    "description": "Reason for the edit."
                }
            }
        }),
    )]
}

fn creator_tools() -> Vec<Tool> {
    vec![Tool::new(
        "create_section",
        "Create a new section for the document.",
        json!({
            "type": "object",
            "required": ["section_title", "content", "position"],
            "properties": {
                "section_title": {
                    "type": "string",
                    "description": "Title for the new section."
                },
                "content": {
                    "type": "string",
                    "description": "Content for the new section."
                },
                "position": {
                    "type": "string",
                    "description": "Position in the document (start, end, or after a specific section)."
                }
            }
        }),
    )]
}

/// Caches one lazily-built [`AgentConfig`] per mode.
///
/// An owned, injectable instance rather than process-global state so
/// tests can construct independent registries without leakage.
pub struct AgentRegistry {
    model: String,
    configs: Mutex<HashMap<Mode, Arc<AgentConfig>>>,
    constructions: AtomicUsize,
}

impl AgentRegistry {
    pub fn new<S: Into<String>>(model: S) -> Self {
        Self {
            model: model.into(),
            configs: Mutex::new(HashMap::new()),
            constructions: AtomicUsize::new(0),
        }
    }

    /// Get or build the configuration for a mode.
    ///
    /// Construction failures are logged and surface as `None`; they
    /// never propagate past the registry boundary.
    pub fn get(&self, mode: Mode) -> Option<Arc<AgentConfig>> {
        let mut cache = self.configs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = cache.get(&mode) {
            return Some(Arc::clone(config));
        }

        match self.build(mode) {
            Ok(config) => {
                self.constructions.fetch_add(1, Ordering::SeqCst);
                info!(%mode, agent = %config.name, "constructed agent configuration");
                let config = Arc::new(config);
                cache.insert(mode, Arc::clone(&config));
                Some(config)
            }
            Err(e) => {
                error!(%mode, error = %e, "failed to construct agent configuration");
                None
            }
        }
    }

    /// Clear the cache. Future lookups rebuild; configs already handed
    /// out remain valid.
    pub fn reset(&self) {
        self.configs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// How many times a configuration has been built over the
    /// registry's lifetime. Resets do not rewind this counter.
    pub fn construction_count(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    fn build(&self, mode: Mode) -> AgentResult<AgentConfig> {
        if self.model.trim().is_empty() {
            return Err(AgentError::Registry(
                "model identifier is not configured".to_string(),
            ));
        }

        let (name, instructions, tools) = match mode {
            Mode::Analyze => ("document_analyzer", ANALYZER_INSTRUCTIONS, analyzer_tools()),
            Mode::Edit => ("document_editor", EDITOR_INSTRUCTIONS, editor_tools()),
            Mode::Create => ("document_creator", CREATOR_INSTRUCTIONS, creator_tools()),
        };

        Ok(AgentConfig {
            name: name.to_string(),
            instructions: instructions.to_string(),
            tools,
            model: self.model.clone(),
        })
    }
}
