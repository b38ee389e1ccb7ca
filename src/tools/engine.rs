//! The tool invocation engine.
//!
//! Executes one batch of model-issued tool calls: validate everything first,
//! then run all executable calls concurrently, reassembling results in the
//! original call order. The whole batch races the effective signal so
//! cancellation preempts slow tools.

use futures::future::join_all;
use serde_json::Value;

use super::ToolRegistry;
use crate::error::Error;
use crate::telemetry::Tracer;
use crate::types::{ToolCall, ToolResult};
use crate::utils::cancel::EffectiveSignal;

/// Invoke a batch of tool calls against the registry.
///
/// Pipeline per batch:
/// 1. Skip calls naming tools that are unregistered or declare-only.
/// 2. Parse and validate ALL remaining argument payloads. Any failure aborts
///    the batch before any tool runs, so a partially-executed batch can only
///    mean an execution error, never a validation one.
/// 3. Execute all validated calls concurrently; results come back in the
///    original call order regardless of completion order.
pub(crate) async fn invoke_tools(
    calls: &[ToolCall],
    registry: &ToolRegistry,
    signal: &EffectiveSignal,
    tracer: &Tracer,
) -> Result<Vec<ToolResult>, Error> {
    // Phase 1+2: resolve and validate every call up front.
    let mut validated: Vec<(&ToolCall, Value)> = Vec::with_capacity(calls.len());
    for call in calls {
        let Some(tool) = registry.get(&call.name) else {
            tracing::debug!(tool = %call.name, call_id = %call.id, "skipping unregistered tool call");
            continue;
        };
        let Some(_) = tool.execute.as_ref() else {
            tracing::debug!(tool = %call.name, call_id = %call.id, "skipping declare-only tool call");
            continue;
        };

        let parsed: Value =
            serde_json::from_str(&call.raw_args).map_err(|e| Error::InvalidToolArguments {
                tool_name: call.name.clone(),
                tool_call_id: call.id.clone(),
                raw_args: call.raw_args.clone(),
                reason: format!("arguments are not valid JSON: {e}"),
            })?;
        let args = tool
            .schema
            .validate(&parsed)
            .map_err(|reason| Error::InvalidToolArguments {
                tool_name: call.name.clone(),
                tool_call_id: call.id.clone(),
                raw_args: call.raw_args.clone(),
                reason,
            })?;
        validated.push((call, args));
    }

    if validated.is_empty() {
        return Ok(Vec::new());
    }

    // Phase 3: run everything concurrently; join_all preserves input order.
    let futures = validated.into_iter().map(|(call, args)| {
        let executor = registry
            .get(&call.name)
            .and_then(|t| t.execute.clone())
            .expect("validated call has executor");
        let span = tracer
            .span("ai.tool.execute")
            .with_attribute("tool.name", call.name.clone())
            .with_attribute("tool.call_id", call.id.clone());
        async move {
            match executor.execute(args).await {
                Ok(result) => {
                    span.end_ok();
                    Ok(ToolResult {
                        call_id: call.id.clone(),
                        name: call.name.clone(),
                        result,
                    })
                }
                Err(source) => {
                    span.end_error(source.to_string());
                    Err(Error::ToolExecution {
                        tool_name: call.name.clone(),
                        tool_call_id: call.id.clone(),
                        source,
                    })
                }
            }
        }
    });

    let batch = join_all(futures);
    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(signal.cancellation()),
        results = batch => results.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryConfig;
    use crate::tools::{ArgumentSchema, JsonSchema, ToolDefinition, ToolExecutor};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    struct EchoTool {
        delay: Duration,
    }

    #[async_trait]
    impl ToolExecutor for EchoTool {
        async fn execute(
            &self,
            args: Value,
        ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
            tokio::time::sleep(self.delay).await;
            Ok(json!({"echo": args}))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolExecutor for FailingTool {
        async fn execute(
            &self,
            _args: Value,
        ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
            Err("backend unavailable".into())
        }
    }

    fn any_schema() -> Arc<dyn ArgumentSchema> {
        Arc::new(JsonSchema::compile(json!({"type": "object"})).unwrap())
    }

    fn echo_registry(names_and_delays: &[(&str, u64)]) -> ToolRegistry {
        names_and_delays
            .iter()
            .fold(ToolRegistry::new(), |reg, (name, delay_ms)| {
                reg.register(
                    *name,
                    ToolDefinition {
                        description: "echo".into(),
                        schema: any_schema(),
                        execute: Some(Arc::new(EchoTool {
                            delay: Duration::from_millis(*delay_ms),
                        })),
                    },
                )
            })
    }

    fn tracer() -> Tracer {
        Tracer::new(TelemetryConfig::default())
    }

    #[tokio::test]
    async fn results_follow_call_order_not_completion_order() {
        // c finishes first, a last; results must still come back a, b, c.
        let registry = echo_registry(&[("a", 90), ("b", 60), ("c", 30)]);
        let calls = vec![
            ToolCall::new("1", "a", "{}"),
            ToolCall::new("2", "b", "{}"),
            ToolCall::new("3", "c", "{}"),
        ];

        let results = invoke_tools(&calls, &registry, &EffectiveSignal::never(), &tracer())
            .await
            .unwrap();
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(results[0].call_id, "1");
        assert_eq!(results[2].call_id, "3");
    }

    #[tokio::test]
    async fn unregistered_and_declare_only_calls_are_skipped() {
        let registry = echo_registry(&[("known", 0)]).register(
            "declare-only",
            ToolDefinition {
                description: "no executor".into(),
                schema: any_schema(),
                execute: None,
            },
        );
        let calls = vec![
            ToolCall::new("1", "missing", "{}"),
            ToolCall::new("2", "declare-only", "{}"),
            ToolCall::new("3", "known", "{}"),
        ];

        let results = invoke_tools(&calls, &registry, &EffectiveSignal::never(), &tracer())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].call_id, "3");
    }

    #[tokio::test]
    async fn validation_failure_aborts_before_any_execution() {
        let registry = ToolRegistry::new().register(
            "strict",
            ToolDefinition {
                description: "strict".into(),
                schema: Arc::new(
                    JsonSchema::compile(json!({
                        "type": "object",
                        "properties": {"q": {"type": "string"}},
                        "required": ["q"]
                    }))
                    .unwrap(),
                ),
                execute: Some(Arc::new(EchoTool {
                    delay: Duration::ZERO,
                })),
            },
        );
        let calls = vec![
            ToolCall::new("1", "strict", r#"{"q": "ok"}"#),
            ToolCall::new("2", "strict", r#"{"wrong": true}"#),
        ];

        let err = invoke_tools(&calls, &registry, &EffectiveSignal::never(), &tracer())
            .await
            .unwrap_err();
        match err {
            Error::InvalidToolArguments { tool_call_id, .. } => assert_eq!(tool_call_id, "2"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_arguments_are_invalid() {
        let registry = echo_registry(&[("echo", 0)]);
        let calls = vec![ToolCall::new("1", "echo", "{not json")];

        let err = invoke_tools(&calls, &registry, &EffectiveSignal::never(), &tracer())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidToolArguments { .. }));
    }

    #[tokio::test]
    async fn execution_failure_is_fatal() {
        let registry = ToolRegistry::new().register(
            "broken",
            ToolDefinition {
                description: "always fails".into(),
                schema: any_schema(),
                execute: Some(Arc::new(FailingTool)),
            },
        );
        let calls = vec![ToolCall::new("1", "broken", "{}")];

        let err = invoke_tools(&calls, &registry, &EffectiveSignal::never(), &tracer())
            .await
            .unwrap_err();
        match err {
            Error::ToolExecution { tool_name, .. } => assert_eq!(tool_name, "broken"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_preempts_slow_tools() {
        let registry = echo_registry(&[("slow", 60_000)]);
        let calls = vec![ToolCall::new("1", "slow", "{}")];

        let handle = crate::utils::cancel::CancelHandle::new();
        let (signal, _guard) =
            crate::utils::cancel::compose(Some(&handle), Some(Duration::from_millis(50)));

        let err = invoke_tools(&calls, &registry, &signal, &tracer())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
