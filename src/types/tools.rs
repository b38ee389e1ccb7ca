//! Tool call and tool result types.

use serde::{Deserialize, Serialize};

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    /// Provider-assigned call id, referenced by the matching result.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Raw argument text exactly as produced by the model (stringified JSON).
    pub raw_args: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        raw_args: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            raw_args: raw_args.into(),
        }
    }
}

/// The outcome of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    /// Id of the tool call this result answers.
    pub call_id: String,
    /// Name of the tool that produced the result.
    pub name: String,
    /// Structured tool output.
    pub result: serde_json::Value,
}

/// How the model is allowed to use tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Let the model decide whether to call tools (default).
    #[default]
    Auto,
    /// Require the model to call at least one tool.
    Required,
    /// Prevent the model from calling any tools.
    None,
    /// Force the model to call a specific tool.
    #[serde(rename = "tool")]
    Tool {
        /// Name of the tool to call.
        name: String,
    },
}

impl ToolChoice {
    /// Create a tool choice that forces a specific tool.
    pub fn tool(name: impl Into<String>) -> Self {
        Self::Tool { name: name.into() }
    }
}
