//! Conversation messages.
//!
//! Messages are immutable once appended to a conversation; the conversation
//! itself is owned exclusively by the multi-step orchestrator for the
//! duration of one top-level call.

use serde::{Deserialize, Serialize};

use super::tools::{ToolCall, ToolResult};

/// Message role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One tagged content part of a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    /// Plain text.
    Text { text: String },
    /// A tool call requested by the assistant.
    ToolCall {
        id: String,
        name: String,
        raw_args: String,
    },
    /// The result of a tool call. `call_id` must reference a tool call
    /// emitted in the same or a prior step; orphan results are a
    /// construction error.
    ToolResult {
        call_id: String,
        name: String,
        result: serde_json::Value,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// A conversation message: a role plus an ordered sequence of content parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role.
    pub role: Role,
    /// Ordered content parts.
    pub content: Vec<ContentPart>,
    /// Provider-specific metadata, passed through unmodified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Message {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentPart::text(text)],
            metadata: None,
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::text(text)],
            metadata: None,
        }
    }

    /// Create an assistant message from response text and tool calls.
    ///
    /// Empty text with tool calls produces a message of tool-call parts only.
    pub fn assistant(text: impl Into<String>, tool_calls: &[ToolCall]) -> Self {
        let text = text.into();
        let mut content = Vec::with_capacity(1 + tool_calls.len());
        if !text.is_empty() || tool_calls.is_empty() {
            content.push(ContentPart::text(text));
        }
        for call in tool_calls {
            content.push(ContentPart::ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                raw_args: call.raw_args.clone(),
            });
        }
        Self {
            role: Role::Assistant,
            content,
            metadata: None,
        }
    }

    /// Create a tool message carrying one step's ordered tool results.
    pub fn tool_results(results: &[ToolResult]) -> Self {
        Self {
            role: Role::Tool,
            content: results
                .iter()
                .map(|r| ContentPart::ToolResult {
                    call_id: r.call_id.clone(),
                    name: r.name.clone(),
                    result: r.result.clone(),
                })
                .collect(),
            metadata: None,
        }
    }

    /// Attach provider-specific metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.content {
            if let ContentPart::Text { text } = part {
                out.push_str(text);
            }
        }
        out
    }

    /// Tool calls carried by this message, in order.
    pub fn tool_calls(&self) -> impl Iterator<Item = ToolCall> + '_ {
        self.content.iter().filter_map(|part| match part {
            ContentPart::ToolCall { id, name, raw_args } => {
                Some(ToolCall::new(id.clone(), name.clone(), raw_args.clone()))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_message_threads_tool_calls() {
        let calls = vec![ToolCall::new("call-1", "search", r#"{"q":"rust"}"#)];
        let msg = Message::assistant("Let me look that up.", &calls);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.text(), "Let me look that up.");
        assert_eq!(msg.tool_calls().collect::<Vec<_>>(), calls);
    }

    #[test]
    fn content_parts_serialize_kebab_case_tagged() {
        let part = ContentPart::ToolResult {
            call_id: "call-1".into(),
            name: "search".into(),
            result: json!({"hits": 3}),
        };
        let v = serde_json::to_value(&part).unwrap();
        assert_eq!(v["type"], "tool-result");
        assert_eq!(v["call_id"], "call-1");
    }
}
