//! Telemetry event model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Span lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    InProgress,
    Ok,
    Error,
}

/// One recorded span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanEvent {
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub trace_id: String,
    /// Operation name, e.g. `ai.generate` or `ai.tool.execute`.
    pub name: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock duration in milliseconds, present once the span ends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub attributes: HashMap<String, String>,
    pub status: SpanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpanEvent {
    pub fn start(
        trace_id: impl Into<String>,
        parent_span_id: Option<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            span_id: uuid::Uuid::new_v4().to_string(),
            parent_span_id,
            trace_id: trace_id.into(),
            name: name.into(),
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            attributes: HashMap::new(),
            status: SpanStatus::InProgress,
            error: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn end_ok(mut self) -> Self {
        self.close(SpanStatus::Ok, None);
        self
    }

    pub fn end_error(mut self, error: impl Into<String>) -> Self {
        self.close(SpanStatus::Error, Some(error.into()));
        self
    }

    fn close(&mut self, status: SpanStatus, error: Option<String>) {
        let end = Utc::now();
        self.duration_ms = Some(
            (end - self.start_time)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.end_time = Some(end);
        self.status = status;
        self.error = error;
    }
}

/// Event delivered to a telemetry sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum TelemetryEvent {
    SpanStart(SpanEvent),
    SpanEnd(SpanEvent),
}
