//! Shared data model for the generation core.

mod common;
mod message;
mod tools;
mod usage;

pub use common::{FinishReason, ResponseMetadata};
pub use message::{ContentPart, Message, Role};
pub use tools::{ToolCall, ToolChoice, ToolResult};
pub use usage::Usage;
