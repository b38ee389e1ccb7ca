//! Canonical stream parts (typed).
//!
//! The post-normalization unit consumed by the rest of the core. A normalized
//! stream is terminated by exactly one `Finish` or `Error` part; no parts
//! follow it.

use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::types::{FinishReason, ResponseMetadata, ToolCall, ToolResult, Usage};

/// Canonical stream part union.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamPart {
    /// Incremental text.
    TextDelta { delta: String },
    /// A complete tool call.
    ToolCall(ToolCall),
    /// Partial streamed tool-call arguments.
    ToolCallDelta {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        args_delta: String,
    },
    /// The result of an executed tool call.
    ToolResult(ToolResult),
    /// Stream completion with aggregated usage. Emitted exactly once, last.
    Finish {
        reason: FinishReason,
        usage: Usage,
        #[serde(default)]
        metadata: ResponseMetadata,
    },
    /// Terminal failure; no parts follow.
    Error { message: String },
}

/// A lazy, cooperatively-pulled sequence of canonical stream parts.
pub type PartStream = Pin<Box<dyn Stream<Item = StreamPart> + Send>>;
