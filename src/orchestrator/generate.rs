//! The multi-step orchestration loop.

use super::step::{StepContext, execute_step};
use super::types::{GenerateError, GenerateOptions, GenerateResult, StepResult};
use crate::model::LanguageModel;
use crate::telemetry::Tracer;
use crate::tools::ToolRegistry;
use crate::types::{FinishReason, Message, Usage};
use crate::utils::cancel;

/// Run a model-call/tool-execution loop until the model produces a final
/// answer or the step bound is reached.
///
/// The loop continues to another step only when the previous step finished
/// with tool calls AND produced at least one tool result AND steps remain.
/// Every step sees the full conversation so far: the caller's messages plus
/// the assistant and tool messages of every prior step.
///
/// On failure the returned [`GenerateError`] carries every step that
/// completed before the failing one.
pub async fn generate(
    model: &dyn LanguageModel,
    messages: Vec<Message>,
    tools: Option<&ToolRegistry>,
    opts: GenerateOptions,
) -> Result<GenerateResult, GenerateError> {
    let (signal, mut guard) = cancel::compose(opts.cancel.as_ref(), opts.timeout);
    let tracer = Tracer::new(opts.telemetry.clone());
    let result = run_loop(model, messages, tools, &opts, &signal, &tracer).await;
    guard.dispose();
    result
}

async fn run_loop(
    model: &dyn LanguageModel,
    messages: Vec<Message>,
    tools: Option<&ToolRegistry>,
    opts: &GenerateOptions,
    signal: &cancel::EffectiveSignal,
    tracer: &Tracer,
) -> Result<GenerateResult, GenerateError> {
    let span = tracer
        .span("ai.generate")
        .with_attribute("max_steps", opts.max_steps.max(1).to_string());

    let ctx = StepContext {
        model,
        registry: tools,
        tool_choice: opts.tool_choice.clone(),
        signal,
        tracer,
    };

    let max_steps = opts.max_steps.max(1);
    let mut history = messages;
    let mut steps: Vec<StepResult> = Vec::new();
    let mut total_usage = Usage::default();

    loop {
        let step_index = steps.len();
        let step = match execute_step(&ctx, step_index, &history).await {
            Ok(step) => step,
            Err(source) => {
                span.end_error(source.to_string());
                return Err(GenerateError {
                    step: step_index,
                    steps,
                    source,
                });
            }
        };

        history.extend(step.messages.iter().cloned());
        total_usage.add(&step.usage);

        if let Some(observer) = &opts.on_step_finish {
            observer(&step);
        }

        let continues = step.finish_reason == FinishReason::ToolCalls
            && !step.tool_results.is_empty()
            && step_index + 1 < max_steps;
        steps.push(step);
        if !continues {
            break;
        }
    }

    span.end_ok();
    Ok(assemble(steps, total_usage))
}

fn assemble(steps: Vec<StepResult>, usage: Usage) -> GenerateResult {
    let last = steps.last().expect("loop always produces a step");
    GenerateResult {
        text: last.text.clone(),
        finish_reason: last.finish_reason.clone(),
        usage,
        tool_calls: last.tool_calls.clone(),
        tool_results: last.tool_results.clone(),
        response_messages: steps
            .iter()
            .flat_map(|s| s.messages.iter().cloned())
            .collect(),
        steps,
    }
}
