use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use super::base::Usage;
use crate::models::Message;
use crate::tool::Tool;

/// Convert messages to the chat-completions wire format, preserving
/// their order exactly.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role,
                "content": message.content,
            })
        })
        .collect()
}

pub fn tools_to_openai_spec(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            })
        })
        .collect()
}

pub fn openai_response_to_message(response: &Value) -> Result<Message> {
    let message = response
        .pointer("/choices/0/message")
        .ok_or_else(|| anyhow!("response has no message"))?;

    // Content is null when the model answered with tool calls only.
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok(Message::assistant(content))
}

pub fn get_usage(data: &Value) -> Result<Usage> {
    let usage = data
        .get("usage")
        .ok_or_else(|| anyhow!("No usage data in response"))?;

    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(Value::as_i64)
        .map(|v| v as i32);
    let output_tokens = usage
        .get("completion_tokens")
        .and_then(Value::as_i64)
        .map(|v| v as i32);
    let total_tokens = usage
        .get("total_tokens")
        .and_then(Value::as_i64)
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

    Ok(Usage::new(input_tokens, output_tokens, total_tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_messages_to_spec_preserves_order_and_roles() {
        let messages = vec![
            Message::system("instructions"),
            Message::system("Document content:\n..."),
            Message::user("Fix grammar"),
        ];

        let spec = messages_to_openai_spec(&messages);
        assert_eq!(spec.len(), 3);
        assert_eq!(spec[0]["role"], "system");
        assert_eq!(spec[1]["content"], "Document content:\n...");
        assert_eq!(spec[2]["role"], "user");
    }

    #[test]
    fn test_tools_to_spec() {
        let tools = vec![Tool::new(
            "edit_section",
            "Edit a section",
            json!({"type": "object"}),
        )];

        let spec = tools_to_openai_spec(&tools);
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "edit_section");
    }

    #[test]
    fn test_response_to_message() {
        let response = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "Corrected text."}
            }]
        });

        let message = openai_response_to_message(&response).unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "Corrected text.");
    }

    #[test]
    fn test_response_without_choices_is_err() {
        assert!(openai_response_to_message(&json!({})).is_err());
    }

    #[test]
    fn test_usage_totals_are_derived_when_missing() {
        let usage = get_usage(&json!({
            "usage": {"prompt_tokens": 12, "completion_tokens": 15}
        }))
        .unwrap();
        assert_eq!(usage.total_tokens, Some(27));
    }
}
