//! Streaming orchestration.
//!
//! Same loop as [`generate`](super::generate::generate), surfaced as a live
//! part stream instead of a buffered result. Steps against a streaming model
//! are forwarded part-by-part as the model produces them; tool rounds
//! surface as `ToolResult` parts; batch-only models surface each step as
//! whole parts. Exactly one terminal `Finish` (with summed usage) or `Error`
//! part closes the stream.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};

use super::step::{StepContext, execute_step, race};
use super::types::{GenerateOptions, StepResult};
use crate::error::Error;
use crate::model::{LanguageModel, ModelRequest};
use crate::streaming::{PartStream, StreamPart, normalize};
use crate::telemetry::Tracer;
use crate::tools::{ToolRegistry, invoke_tools};
use crate::types::{FinishReason, Message, ResponseMetadata, Usage};
use crate::utils::cancel::{self, CancelHandle, CancelReason};

/// A live orchestrated call.
pub struct StreamOrchestration {
    /// Canonical parts as they are produced.
    pub stream: PartStream,
    /// Resolves with every completed step once the stream is drained.
    pub steps: oneshot::Receiver<Vec<StepResult>>,
    /// Cancels the whole orchestration, in addition to any handle passed in
    /// the options.
    pub cancel: CancelHandle,
}

/// Start an orchestrated call and return its live part stream.
///
/// The loop runs on a spawned task; dropping the returned stream stops it
/// via channel closure, and `cancel` stops it eagerly.
pub fn stream_generate(
    model: Arc<dyn LanguageModel>,
    messages: Vec<Message>,
    tools: Option<ToolRegistry>,
    opts: GenerateOptions,
) -> StreamOrchestration {
    let (tx, mut rx) = mpsc::channel::<StreamPart>(32);
    let (steps_tx, steps_rx) = oneshot::channel();
    let cancel = CancelHandle::new();

    tokio::spawn(drive(model, messages, tools, opts, cancel.clone(), tx, steps_tx));

    let stream: PartStream = Box::pin(async_stream::stream! {
        while let Some(part) = rx.recv().await {
            yield part;
        }
    });

    StreamOrchestration {
        stream,
        steps: steps_rx,
        cancel,
    }
}

async fn drive(
    model: Arc<dyn LanguageModel>,
    messages: Vec<Message>,
    tools: Option<ToolRegistry>,
    opts: GenerateOptions,
    handle: CancelHandle,
    tx: mpsc::Sender<StreamPart>,
    steps_tx: oneshot::Sender<Vec<StepResult>>,
) {
    // Link the caller-supplied handle into the orchestration handle so one
    // composed signal observes both.
    let linker = opts.cancel.clone().map(|caller| {
        let own = handle.clone();
        tokio::spawn(async move {
            caller.cancelled().await;
            own.cancel();
        })
    });

    let (signal, mut guard) = cancel::compose(Some(&handle), opts.timeout);
    let tracer = Tracer::new(opts.telemetry.clone());
    let ctx = StepContext {
        model: &*model,
        registry: tools.as_ref(),
        tool_choice: opts.tool_choice.clone(),
        signal: &signal,
        tracer: &tracer,
    };

    let max_steps = opts.max_steps.max(1);
    let mut history = messages;
    let mut steps: Vec<StepResult> = Vec::new();
    let mut total_usage = Usage::default();

    'steps: loop {
        // Nobody can observe further output; stop calling the model.
        if tx.is_closed() {
            break;
        }

        let step_index = steps.len();
        let live = model.supports_streaming();
        let outcome = if live {
            live_step(&ctx, step_index, &history, &tx).await
        } else {
            execute_step(&ctx, step_index, &history).await
        };

        let step = match outcome {
            Ok(step) => step,
            Err(e) => {
                let _ = tx
                    .send(StreamPart::Error {
                        message: e.to_string(),
                    })
                    .await;
                break;
            }
        };

        // Batch-shaped steps surface their content as whole parts.
        if !live {
            if !step.text.is_empty() {
                let delta = step.text.clone();
                if forward(&tx, StreamPart::TextDelta { delta }).await.is_err() {
                    break;
                }
            }
            for call in &step.tool_calls {
                if forward(&tx, StreamPart::ToolCall(call.clone())).await.is_err() {
                    break 'steps;
                }
            }
        }
        for result in &step.tool_results {
            if forward(&tx, StreamPart::ToolResult(result.clone())).await.is_err() {
                break 'steps;
            }
        }

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
            let last = steps.last().expect("just pushed");
            let _ = tx
                .send(StreamPart::Finish {
                    reason: last.finish_reason.clone(),
                    usage: total_usage,
                    metadata: last.metadata.clone(),
                })
                .await;
            break;
        }
    }

    guard.dispose();
    if let Some(linker) = linker {
        linker.abort();
    }
    let _ = steps_tx.send(steps);
}

/// Execute one live step: forward parts as they arrive while accumulating
/// the step result. Per-step `Finish` parts are withheld; the driver emits
/// one terminal part for the whole call.
async fn live_step(
    ctx: &StepContext<'_>,
    step_index: usize,
    messages: &[Message],
    tx: &mpsc::Sender<StreamPart>,
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

    let result = forward_model_parts(ctx, request, tx).await;
    let (text, tool_calls, finish_reason, usage, metadata) = match result {
        Ok(acc) => acc,
        Err(e) => {
            span.end_error(e.to_string());
            return Err(e);
        }
    };

    let tool_results = if finish_reason == FinishReason::ToolCalls && !tool_calls.is_empty() {
        match ctx.registry {
            Some(registry) => {
                match invoke_tools(&tool_calls, registry, ctx.signal, ctx.tracer).await {
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
            .all(|r| tool_calls.iter().any(|c| c.id == r.call_id))
    );

    let mut step_messages = vec![Message::assistant(text.clone(), &tool_calls)];
    if !tool_results.is_empty() {
        step_messages.push(Message::tool_results(&tool_results));
    }

    span.end_ok();
    Ok(StepResult {
        step_index,
        text,
        finish_reason,
        usage,
        tool_calls,
        tool_results,
        messages: step_messages,
        metadata,
    })
}

/// A closed channel means the consumer dropped the stream; treat it like a
/// caller abort so in-flight work stops instead of running unobserved.
async fn forward(tx: &mpsc::Sender<StreamPart>, part: StreamPart) -> Result<(), Error> {
    tx.send(part).await.map_err(|_| Error::Cancelled {
        reason: CancelReason::Aborted,
    })
}

type LiveAccumulation = (
    String,
    Vec<crate::types::ToolCall>,
    FinishReason,
    Usage,
    ResponseMetadata,
);

async fn forward_model_parts(
    ctx: &StepContext<'_>,
    request: ModelRequest,
    tx: &mpsc::Sender<StreamPart>,
) -> Result<LiveAccumulation, Error> {
    let provider = race(ctx.signal, ctx.model.stream(request, ctx.signal)).await??;
    let mut parts = normalize(provider.chunks, provider.schema);

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    let mut finish: Option<(FinishReason, Usage, ResponseMetadata)> = None;

    loop {
        let part = match race(ctx.signal, parts.next()).await? {
            Some(part) => part,
            None => break,
        };
        match part {
            StreamPart::TextDelta { delta } => {
                text.push_str(&delta);
                forward(tx, StreamPart::TextDelta { delta }).await?;
            }
            StreamPart::ToolCall(call) => {
                tool_calls.push(call.clone());
                forward(tx, StreamPart::ToolCall(call)).await?;
            }
            part @ StreamPart::ToolCallDelta { .. } => {
                forward(tx, part).await?;
            }
            StreamPart::ToolResult(_) => {}
            StreamPart::Finish {
                reason,
                usage,
                metadata,
            } => finish = Some((reason, usage, metadata)),
            StreamPart::Error { message } => return Err(Error::stream_parse(message)),
        }
    }

    let (finish_reason, usage, metadata) = finish.unwrap_or((
        FinishReason::Unknown,
        Usage::default(),
        ResponseMetadata::default(),
    ));
    Ok((text, tool_calls, finish_reason, usage, metadata))
}
