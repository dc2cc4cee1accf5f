//! Assembles the ordered message sequence handed to the model call.
//!
//! Order is a functional requirement: agent instructions first, then
//! the document context (when present and non-empty), then the prior
//! turns exactly as given.

use crate::models::Message;
use crate::registry::AgentConfig;
use crate::resolver::DocumentContext;

/// Upper bound, in characters, on document content injected into the
/// conversation. Longer documents are cut at this bound; the rest of
/// the text is not sent to the model.
pub const DOCUMENT_CONTENT_LIMIT: usize = 16_000;

pub fn build_conversation(
    config: &AgentConfig,
    instruction: Option<&str>,
    document: Option<&DocumentContext>,
    history: &[Message],
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);

    let mut system = config.instructions.clone();
    if let Some(extra) = instruction {
        if !extra.is_empty() {
            system.push_str("\n\n");
            system.push_str(extra);
        }
    }
    messages.push(Message::system(system));

    if let Some(document) = document {
        if !document.content.is_empty() {
            let content = truncate_chars(&document.content, DOCUMENT_CONTENT_LIMIT);
            messages.push(Message::system(format!("Document content:\n{content}")));
        }
    }

    messages.extend(history.iter().cloned());
    messages
}

/// Cut at a character boundary, never mid code point.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
