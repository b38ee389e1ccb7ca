//! The stream normalizer.

use std::sync::Arc;

use futures_util::StreamExt;

use super::chunk::{ChunkSchema, StreamChunk};
use super::part::{PartStream, StreamPart};
use crate::model::RawChunkStream;
use crate::types::{FinishReason, ResponseMetadata, ToolCall, Usage};

/// Normalize a raw provider chunk stream into canonical stream parts.
///
/// Single-threaded and cooperative: each underlying chunk is parsed before
/// the next is requested, so back-pressure is inherited from the source and
/// at most one part is pending.
///
/// Guarantees:
/// - unknown chunk kinds are skipped without altering the emitted sequence;
/// - a malformed chunk yields one `Error` part and halts the sequence;
/// - the provider "completed" chunk is buffered and emitted as the terminal
///   `Finish` part once the source ends (total usage is often only known at
///   stream end);
/// - a source that ends without a completion chunk still terminates with a
///   synthetic `Finish { reason: Unknown }` carrying the last observed usage.
pub fn normalize(chunks: RawChunkStream, schema: Arc<dyn ChunkSchema>) -> PartStream {
    let out = async_stream::stream! {
        let mut chunks = chunks;
        let mut completion: Option<(FinishReason, Usage)> = None;
        let mut metadata = ResponseMetadata::default();
        // Tool calls streamed as argument deltas, keyed by call id in
        // first-seen order.
        let mut pending_calls: Vec<(String, Option<String>, String)> = Vec::new();

        while let Some(item) = chunks.next().await {
            let raw = match item {
                Ok(v) => v,
                Err(e) => {
                    yield StreamPart::Error { message: e.to_string() };
                    return;
                }
            };

            let chunk = match schema.parse(&raw) {
                Ok(Some(chunk)) => chunk,
                Ok(None) => {
                    tracing::debug!("ignoring unknown stream chunk kind");
                    continue;
                }
                Err(e) => {
                    yield StreamPart::Error { message: e.to_string() };
                    return;
                }
            };

            match chunk {
                StreamChunk::TextDelta { delta } => {
                    yield StreamPart::TextDelta { delta };
                }
                StreamChunk::ToolCall(call) => {
                    yield StreamPart::ToolCall(call);
                }
                StreamChunk::ToolCallDelta { id, name, args_delta } => {
                    match pending_calls.iter_mut().find(|(pid, _, _)| *pid == id) {
                        Some((_, pending_name, args)) => {
                            if pending_name.is_none() {
                                *pending_name = name.clone();
                            }
                            args.push_str(&args_delta);
                        }
                        None => {
                            pending_calls.push((id.clone(), name.clone(), args_delta.clone()));
                        }
                    }
                    yield StreamPart::ToolCallDelta { id, name, args_delta };
                }
                StreamChunk::ResponseMetadata(meta) => {
                    metadata = meta;
                }
                StreamChunk::Completion { reason, usage } => {
                    completion = Some((reason, usage));
                }
            }
        }

        // Flush accumulated streamed tool calls before the terminal part,
        // in first-seen order. Deltas that never carried a name cannot be
        // resolved into a call and are dropped.
        for (id, name, args) in pending_calls {
            match name {
                Some(name) => yield StreamPart::ToolCall(ToolCall::new(id, name, args)),
                None => tracing::warn!(call_id = %id, "dropping unnamed streamed tool call"),
            }
        }

        let (reason, usage) = completion.unwrap_or((FinishReason::Unknown, Usage::default()));
        yield StreamPart::Finish { reason, usage, metadata };
    };

    Box::pin(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::{Value, json};

    struct TestSchema;

    impl ChunkSchema for TestSchema {
        fn parse(&self, raw: &Value) -> Result<Option<StreamChunk>, Error> {
            match raw["kind"].as_str() {
                Some("text") => Ok(Some(StreamChunk::TextDelta {
                    delta: raw["delta"].as_str().unwrap_or_default().to_string(),
                })),
                Some("tool-delta") => Ok(Some(StreamChunk::ToolCallDelta {
                    id: raw["id"].as_str().unwrap_or_default().to_string(),
                    name: raw["name"].as_str().map(str::to_string),
                    args_delta: raw["args"].as_str().unwrap_or_default().to_string(),
                })),
                Some("done") => Ok(Some(StreamChunk::Completion {
                    reason: if raw["reason"] == "tool_calls" {
                        FinishReason::ToolCalls
                    } else {
                        FinishReason::Stop
                    },
                    usage: Usage::new(
                        raw["prompt"].as_u64().unwrap_or(0),
                        raw["completion"].as_u64().unwrap_or(0),
                    ),
                })),
                Some(_) | None if raw["kind"].is_string() => Ok(None),
                _ => Err(Error::stream_parse(format!("chunk has no kind: {raw}"))),
            }
        }
    }

    fn chunk_stream(chunks: Vec<Value>) -> RawChunkStream {
        Box::pin(futures_util::stream::iter(chunks.into_iter().map(Ok)))
    }

    async fn collect(chunks: Vec<Value>) -> Vec<StreamPart> {
        normalize(chunk_stream(chunks), Arc::new(TestSchema))
            .collect::<Vec<_>>()
            .await
    }

    #[tokio::test]
    async fn buffers_completion_until_source_end() {
        let parts = collect(vec![
            json!({"kind": "text", "delta": "Hel"}),
            json!({"kind": "done", "reason": "stop", "prompt": 3, "completion": 7}),
            json!({"kind": "text", "delta": "lo"}),
        ])
        .await;

        assert_eq!(
            parts,
            vec![
                StreamPart::TextDelta { delta: "Hel".into() },
                StreamPart::TextDelta { delta: "lo".into() },
                StreamPart::Finish {
                    reason: FinishReason::Stop,
                    usage: Usage::new(3, 7),
                    metadata: ResponseMetadata::default(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn unknown_chunks_do_not_alter_the_sequence() {
        let base = vec![
            json!({"kind": "text", "delta": "a"}),
            json!({"kind": "done", "reason": "stop", "prompt": 1, "completion": 1}),
        ];
        let mut with_unknown = base.clone();
        with_unknown.insert(1, json!({"kind": "future-chunk", "payload": 42}));

        assert_eq!(collect(base).await, collect(with_unknown).await);
    }

    #[tokio::test]
    async fn source_without_completion_gets_synthetic_finish() {
        let parts = collect(vec![json!({"kind": "text", "delta": "hi"})]).await;
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[1],
            StreamPart::Finish {
                reason: FinishReason::Unknown,
                usage: Usage::default(),
                metadata: ResponseMetadata::default(),
            }
        );
    }

    #[tokio::test]
    async fn malformed_chunk_halts_the_sequence() {
        let parts = collect(vec![
            json!({"kind": "text", "delta": "ok"}),
            json!({"no": "kind"}),
            json!({"kind": "text", "delta": "never seen"}),
        ])
        .await;

        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], StreamPart::TextDelta { delta } if delta == "ok"));
        assert!(matches!(&parts[1], StreamPart::Error { .. }));
    }

    #[tokio::test]
    async fn accumulated_tool_deltas_flush_as_complete_calls() {
        let parts = collect(vec![
            json!({"kind": "tool-delta", "id": "call-1", "name": "search", "args": "{\"q\":"}),
            json!({"kind": "tool-delta", "id": "call-1", "args": "\"rust\"}"}),
            json!({"kind": "done", "reason": "tool_calls", "prompt": 2, "completion": 2}),
        ])
        .await;

        let calls: Vec<_> = parts
            .iter()
            .filter_map(|p| match p {
                StreamPart::ToolCall(c) => Some(c.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(calls, vec![ToolCall::new("call-1", "search", "{\"q\":\"rust\"}")]);

        match parts.last() {
            Some(StreamPart::Finish { reason, .. }) => {
                assert_eq!(*reason, FinishReason::ToolCalls)
            }
            other => panic!("expected finish part, got {other:?}"),
        }
    }
}
