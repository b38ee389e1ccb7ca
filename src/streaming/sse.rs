//! SSE JSON chunk helper
//!
//! For providers that emit JSON objects as SSE `data:` payloads (one JSON
//! object per SSE message). Protocol-agnostic: the returned values feed the
//! normalizer through the adapter's [`ChunkSchema`](super::ChunkSchema).

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};

use crate::error::Error;
use crate::model::RawChunkStream;

#[derive(Debug, Clone)]
pub struct SseChunkConfig {
    /// Label used in error messages (e.g. "openai chat").
    pub label: String,
    /// SSE `data` payloads that indicate end-of-stream and should be ignored.
    pub done_markers: Vec<String>,
}

impl SseChunkConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            done_markers: vec!["[DONE]".to_string()],
        }
    }
}

/// Convert a bytes stream into a raw JSON chunk stream by parsing SSE
/// `data:` payloads.
///
/// - Ignores empty payloads and configurable done markers.
/// - Parses JSON strictly (`serde_json::from_str`).
pub fn sse_json_chunks<S, B>(byte_stream: S, cfg: SseChunkConfig) -> RawChunkStream
where
    S: Stream<Item = Result<B, Error>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let done_markers = cfg.done_markers;
    let label = cfg.label;

    let out = async_stream::stream! {
        let mut sse_stream = byte_stream.eventsource();

        while let Some(item) = sse_stream.next().await {
            let event = match item {
                Ok(ev) => ev,
                Err(e) => {
                    yield Err(Error::stream_parse(format!("SSE stream error ({label}): {e}")));
                    return;
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if done_markers.iter().any(|m| m == data) {
                continue;
            }

            match serde_json::from_str::<serde_json::Value>(data) {
                Ok(v) => yield Ok(v),
                Err(e) => {
                    yield Err(Error::stream_parse(format!(
                        "failed to parse SSE JSON ({label}): {e}"
                    )));
                    return;
                }
            }
        }
    };

    Box::pin(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_json_events_and_skips_done_markers() {
        let data: Vec<Result<&[u8], Error>> = vec![
            Ok(b": keep-alive\n\n".as_slice()),
            Ok(b"data: {\"a\":1}\n\n".as_slice()),
            Ok(b"data: [DONE]\n\n".as_slice()),
            Ok(b"data: {\"b\":2}\n\n".as_slice()),
        ];

        let mut stream = sse_json_chunks(
            futures_util::stream::iter(data),
            SseChunkConfig::new("test"),
        );

        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.expect("json"));
        }

        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["a"], 1);
        assert_eq!(out[1]["b"], 2);
    }

    #[tokio::test]
    async fn returns_parse_error_on_invalid_json() {
        let data: Vec<Result<&[u8], Error>> = vec![Ok(b"data: {not-json}\n\n".as_slice())];
        let mut stream = sse_json_chunks(
            futures_util::stream::iter(data),
            SseChunkConfig::new("test"),
        );

        let err = stream.next().await.expect("one").expect_err("err");
        match err {
            Error::StreamParse(msg) => assert!(msg.contains("failed to parse SSE JSON")),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }
}
