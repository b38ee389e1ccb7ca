//! Orchestrator options and results.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::telemetry::TelemetryConfig;
use crate::types::{FinishReason, Message, ResponseMetadata, ToolCall, ToolChoice, ToolResult, Usage};
use crate::utils::cancel::CancelHandle;

/// Everything one model-call/tool-execution round produced.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Zero-based position of this step within the call.
    pub step_index: usize,
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    /// The messages this step appended to the conversation: the assistant
    /// message, then one tool message when tools ran.
    pub messages: Vec<Message>,
    pub metadata: ResponseMetadata,
}

/// Called after each completed step, before the next one starts.
pub type StepObserver = Arc<dyn Fn(&StepResult) + Send + Sync>;

/// Options for one orchestrated call.
#[derive(Clone)]
pub struct GenerateOptions {
    /// Maximum number of model-call rounds. Zero is coerced to one.
    pub max_steps: usize,
    /// Deadline for the whole call, all steps included. `None` and
    /// `Some(Duration::ZERO)` both mean no deadline.
    pub timeout: Option<Duration>,
    /// Caller-held cancellation handle.
    pub cancel: Option<CancelHandle>,
    pub tool_choice: ToolChoice,
    pub on_step_finish: Option<StepObserver>,
    pub telemetry: TelemetryConfig,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_steps: 1,
            timeout: None,
            cancel: None,
            tool_choice: ToolChoice::Auto,
            on_step_finish: None,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl GenerateOptions {
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }

    pub fn on_step_finish(mut self, observer: StepObserver) -> Self {
        self.on_step_finish = Some(observer);
        self
    }

    pub fn telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }
}

/// Aggregate outcome of an orchestrated call.
///
/// `text`, `finish_reason`, `tool_calls`, and `tool_results` come from the
/// final step only; `usage` is summed across all steps.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    pub steps: Vec<StepResult>,
    /// All messages appended across every step, ready to extend the caller's
    /// conversation history.
    pub response_messages: Vec<Message>,
}

/// A failed orchestrated call, carrying the steps that completed before the
/// failure.
#[derive(Debug, thiserror::Error)]
#[error("generation failed at step {step}: {source}")]
pub struct GenerateError {
    /// Zero-based index of the step that failed.
    pub step: usize,
    /// Steps that completed before the failure.
    pub steps: Vec<StepResult>,
    #[source]
    pub source: Error,
}
