//! Client-side multi-step LLM generation orchestration.
//!
//! The crate turns a single logical "generate" call into a loop of model
//! invocations and client-side tool executions:
//!
//! - [`orchestrator::generate`] runs the loop and returns a buffered result;
//!   [`orchestrator::stream_generate`] surfaces the same loop as a live
//!   stream of canonical parts.
//! - [`model::LanguageModel`] is the seam a provider adapter implements;
//!   the core never constructs provider requests itself.
//! - [`streaming`] normalizes raw provider chunks into one canonical part
//!   taxonomy, independent of provider wire formats.
//! - [`tools`] holds the tool registry, argument validation, and the
//!   concurrent invocation engine.
//! - [`utils::cancel`] composes caller cancellation and timeouts into the
//!   single signal every long-running await observes.
//! - [`telemetry`] records per-call span trees through a caller-supplied
//!   sink; disabled by default.
//!
//! # Example
//!
//! ```rust,ignore
//! use genloop::prelude::*;
//!
//! let result = generate(
//!     &model,
//!     vec![Message::user("What is the weather in Paris?")],
//!     Some(&tools),
//!     GenerateOptions::default().max_steps(3),
//! )
//! .await?;
//! println!("{}", result.text);
//! ```

pub mod error;
pub mod model;
pub mod orchestrator;
pub mod streaming;
pub mod telemetry;
pub mod tools;
pub mod types;
pub mod utils;

pub use error::Error;

/// Common imports for crate users.
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::model::{
        LanguageModel, ModelRequest, ModelResponse, ProviderStream, RawChunkStream,
        ToolDeclaration,
    };
    pub use crate::orchestrator::{
        GenerateError, GenerateOptions, GenerateResult, StepResult, StreamOrchestration,
        generate, stream_generate,
    };
    pub use crate::streaming::{ChunkSchema, PartStream, StreamChunk, StreamPart};
    pub use crate::telemetry::{TelemetryConfig, TelemetryEvent, TelemetrySink};
    pub use crate::tools::{
        ArgumentSchema, JsonSchema, ToolDefinition, ToolExecutor, ToolRegistry,
    };
    pub use crate::types::{
        ContentPart, FinishReason, Message, ResponseMetadata, Role, ToolCall, ToolChoice,
        ToolResult, Usage,
    };
    pub use crate::utils::cancel::{CancelHandle, CancelReason};
}
