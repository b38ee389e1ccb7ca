//! Model capability contract.
//!
//! The core consumes this trait instead of talking to providers directly.
//! Request construction, authentication, and wire formats live entirely in
//! the adapter implementing it. Adapters must honor the effective signal and
//! abort promptly when it fires; the executors additionally race every await
//! against the signal so cancellation wins even over a slow adapter.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::Error;
use crate::streaming::ChunkSchema;
use crate::types::{FinishReason, Message, ResponseMetadata, ToolCall, ToolChoice, Usage};
use crate::utils::cancel::EffectiveSignal;

/// Tool declaration sent to the model (name, description, JSON schema).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One model invocation request: the full prior conversation plus tool
/// declarations. Serialization is entirely the adapter's concern.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDeclaration>,
    pub tool_choice: ToolChoice,
}

/// A batch model response.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    pub finish_reason: FinishReason,
    pub metadata: ResponseMetadata,
}

/// Raw provider chunks, pre-normalization.
pub type RawChunkStream =
    Pin<Box<dyn Stream<Item = Result<serde_json::Value, Error>> + Send>>;

/// An incremental provider response plus the schema that maps its chunks
/// into the canonical taxonomy.
pub struct ProviderStream {
    pub chunks: RawChunkStream,
    pub schema: Arc<dyn ChunkSchema>,
}

/// The model capability consumed by the step executor.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Perform one batch invocation.
    async fn generate(
        &self,
        request: ModelRequest,
        signal: &EffectiveSignal,
    ) -> Result<ModelResponse, Error>;

    /// Start one streaming invocation. Batch-only models keep the default.
    async fn stream(
        &self,
        _request: ModelRequest,
        _signal: &EffectiveSignal,
    ) -> Result<ProviderStream, Error> {
        Err(Error::UnsupportedOperation(
            "model does not support streaming".into(),
        ))
    }

    /// Whether the executor should prefer [`LanguageModel::stream`].
    fn supports_streaming(&self) -> bool {
        false
    }
}
