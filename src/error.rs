//! Error types for the orchestration core.
//!
//! A single `Error` enum covers every failure the core can surface. The
//! orchestrator boundary wraps it in `GenerateError` (see `orchestrator::types`)
//! so callers can inspect how far a multi-step call got before failing.

use thiserror::Error;

use crate::utils::cancel::CancelReason;

/// Errors produced by the generation core.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying model capability rejected the invocation
    /// (network failure, non-success status, unparsable batch body).
    /// The core never retries; retry policy belongs to the adapter.
    #[error("model invocation failed: {0}")]
    ModelInvocation(String),

    /// A single malformed chunk terminated stream normalization.
    /// Distinct from a capability-level failure.
    #[error("malformed stream chunk: {0}")]
    StreamParse(String),

    /// Tool arguments failed schema validation before execution.
    /// Nothing was executed.
    #[error("invalid arguments for tool '{tool_name}' (call '{tool_call_id}'): {reason}")]
    InvalidToolArguments {
        /// Name of the offending tool.
        tool_name: String,
        /// The tool call id the arguments belonged to.
        tool_call_id: String,
        /// The raw argument text as received from the model.
        raw_args: String,
        /// Human-readable validation failure.
        reason: String,
    },

    /// A tool's own execution failed. Fatal for the current call.
    #[error("tool '{tool_name}' (call '{tool_call_id}') failed: {source}")]
    ToolExecution {
        tool_name: String,
        tool_call_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The effective cancellation signal fired.
    #[error("operation cancelled ({reason})")]
    Cancelled {
        /// Whether the caller aborted or the timeout elapsed.
        reason: CancelReason,
    },

    /// The capability does not support the requested operation
    /// (e.g. streaming on a batch-only model).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A schema could not be compiled or an input was structurally invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a model invocation error.
    pub fn model_invocation(message: impl Into<String>) -> Self {
        Self::ModelInvocation(message.into())
    }

    /// Create a stream parse error.
    pub fn stream_parse(message: impl Into<String>) -> Self {
        Self::StreamParse(message.into())
    }

    /// Whether this error was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
