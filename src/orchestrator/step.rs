//! Single-step execution: one model invocation plus its tool round.

use futures_util::StreamExt;

use super::types::StepResult;
use crate::error::Error;
use crate::model::{LanguageModel, ModelRequest, ModelResponse};
use crate::streaming::{StreamPart, normalize};
use crate::telemetry::Tracer;
use crate::tools::{ToolRegistry, invoke_tools};
use crate::types::{FinishReason, Message, ResponseMetadata, ToolChoice, Usage};
use crate::utils::cancel::EffectiveSignal;

pub(crate) struct StepContext<'a> {
    pub model: &'a dyn LanguageModel,
    pub registry: Option<&'a ToolRegistry>,
    pub tool_choice: ToolChoice,
    pub signal: &'a EffectiveSignal,
    pub tracer: &'a Tracer,
}

/// Execute one step against the current conversation.
///
/// The model await races the effective signal, so a cancelled or timed-out
/// call aborts between chunks even if the adapter ignores the signal. When
/// the model finishes with tool calls and executable tools are registered,
/// the tool round runs before the step result is assembled.
pub(crate) async fn execute_step(
    ctx: &StepContext<'_>,
    step_index: usize,
    messages: &[Message],
) -> Result<StepResult, Error> {
    if ctx.signal.is_cancelled() {
        return Err(ctx.signal.cancellation());
    }

    let request = ModelRequest {
        messages: messages.to_vec(),
        tools: ctx
            .registry
            .map(|r| r.declarations())
            .unwrap_or_default(),
        tool_choice: ctx.tool_choice.clone(),
    };

    let span = ctx
        .tracer
        .span("ai.generate.step")
        .with_attribute("step.index", step_index.to_string());

    let response = match invoke_model(ctx, request).await {
        Ok(response) => response,
        Err(e) => {
            span.end_error(e.to_string());
            return Err(e);
        }
    };

    let tool_results = if response.finish_reason == FinishReason::ToolCalls
        && !response.tool_calls.is_empty()
    {
        match ctx.registry {
            Some(registry) => {
                match invoke_tools(&response.tool_calls, registry, ctx.signal, ctx.tracer).await {
                    Ok(results) => results,
                    Err(e) => {
                        span.end_error(e.to_string());
                        return Err(e);
                    }
                }
            }
            None => Vec::new(),
        }
    } else {
        Vec::new()
    };

    // Every result must answer a call issued in this step.
    debug_assert!(
        tool_results
            .iter()
            .all(|r| response.tool_calls.iter().any(|c| c.id == r.call_id))
    );

    let text = response.text.clone().unwrap_or_default();
    let mut step_messages =
        vec![Message::assistant(text.clone(), &response.tool_calls)];
    if !tool_results.is_empty() {
        step_messages.push(Message::tool_results(&tool_results));
    }

    span.end_ok();
    Ok(StepResult {
        step_index,
        text,
        finish_reason: response.finish_reason,
        usage: response.usage,
        tool_calls: response.tool_calls,
        tool_results,
        messages: step_messages,
        metadata: response.metadata,
    })
}

async fn invoke_model(
    ctx: &StepContext<'_>,
    request: ModelRequest,
) -> Result<ModelResponse, Error> {
    if ctx.model.supports_streaming() {
        let provider = race(ctx.signal, ctx.model.stream(request, ctx.signal)).await??;
        let parts = normalize(provider.chunks, provider.schema);
        drain_parts(ctx.signal, parts).await
    } else {
        race(ctx.signal, ctx.model.generate(request, ctx.signal)).await?
    }
}

pub(crate) async fn race<F, T>(signal: &EffectiveSignal, fut: F) -> Result<T, Error>
where
    F: std::future::Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(signal.cancellation()),
        out = fut => Ok(out),
    }
}

/// Fold a normalized part stream into a batch-shaped response.
async fn drain_parts(
    signal: &EffectiveSignal,
    mut parts: crate::streaming::PartStream,
) -> Result<ModelResponse, Error> {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    let mut finish: Option<(FinishReason, Usage, ResponseMetadata)> = None;

    loop {
        let part = match race(signal, parts.next()).await? {
            Some(part) => part,
            None => break,
        };
        match part {
            StreamPart::TextDelta { delta } => text.push_str(&delta),
            StreamPart::ToolCall(call) => tool_calls.push(call),
            StreamPart::ToolCallDelta { .. } => {}
            StreamPart::ToolResult(_) => {}
            StreamPart::Finish {
                reason,
                usage,
                metadata,
            } => finish = Some((reason, usage, metadata)),
            StreamPart::Error { message } => return Err(Error::stream_parse(message)),
        }
    }

    let (finish_reason, usage, metadata) =
        finish.unwrap_or((FinishReason::Unknown, Usage::default(), ResponseMetadata::default()));
    Ok(ModelResponse {
        text: (!text.is_empty()).then_some(text),
        tool_calls,
        usage,
        finish_reason,
        metadata,
    })
}
