//! Canonical chunk taxonomy and the provider schema seam.
//!
//! One `ChunkSchema` implementation per provider adapter maps raw incremental
//! payloads into this closed taxonomy. Unknown chunk kinds map to `Ok(None)`
//! and are silently ignored by the normalizer (forward-compatibility policy);
//! malformed chunks map to `Err` and terminate normalization.

use crate::error::Error;
use crate::types::{FinishReason, ResponseMetadata, ToolCall, Usage};

/// A recognized provider chunk, pre-normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// Incremental text.
    TextDelta { delta: String },
    /// A complete tool call in one chunk.
    ToolCall(ToolCall),
    /// Partial tool-call arguments; `name` arrives with the first delta.
    ToolCallDelta {
        id: String,
        name: Option<String>,
        args_delta: String,
    },
    /// Response identity, attached to the final `Finish` part.
    ResponseMetadata(ResponseMetadata),
    /// Provider "completed" signal. Buffered by the normalizer and emitted
    /// as the terminal `Finish` part once the source ends.
    Completion { reason: FinishReason, usage: Usage },
}

/// Provider-declared chunk shape.
pub trait ChunkSchema: Send + Sync {
    /// Parse one raw provider payload.
    ///
    /// - `Ok(Some(_))` for a recognized chunk kind,
    /// - `Ok(None)` for an unknown kind (ignored),
    /// - `Err(_)` for a malformed chunk (terminates the stream).
    fn parse(&self, raw: &serde_json::Value) -> Result<Option<StreamChunk>, Error>;
}
