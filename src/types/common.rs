//! Common enums and response metadata.

use serde::{Deserialize, Serialize};

/// Reason why the model stopped generating tokens.
///
/// Unit variants serialize as plain snake_case strings; provider-specific
/// reasons that have no canonical mapping are carried in `Other`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Model generated a stop sequence or completed naturally.
    Stop,
    /// Model reached the maximum number of output tokens.
    Length,
    /// Model requested tool/function calls.
    ToolCalls,
    /// Content was filtered due to safety/policy violations.
    ContentFilter,
    /// An error occurred during generation.
    Error,
    /// Other provider-specific finish reason.
    Other(String),
    /// The provider did not report a finish reason, or it was not recognized.
    Unknown,
}

/// Provider-supplied response identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseMetadata {
    /// Response ID.
    pub id: Option<String>,
    /// Model that produced the response.
    pub model_id: Option<String>,
    /// Creation time reported by the provider.
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
}
