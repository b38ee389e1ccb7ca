//! Telemetry recording.
//!
//! Telemetry is scoped to one call via [`TelemetryConfig`], never global.
//! When disabled (the default) the tracer is a no-op and the orchestrated
//! call behaves identically with or without it.

pub mod events;

use std::sync::Arc;

pub use events::{SpanEvent, SpanStatus, TelemetryEvent};

/// Receives telemetry events. Implementations must be cheap and
/// non-blocking; export happens inline on the calling task.
pub trait TelemetrySink: Send + Sync {
    fn export(&self, event: &TelemetryEvent);
}

/// Per-call telemetry configuration.
#[derive(Clone, Default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub sink: Option<Arc<dyn TelemetrySink>>,
}

impl TelemetryConfig {
    pub fn with_sink(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            enabled: true,
            sink: Some(sink),
        }
    }
}

/// Per-call span factory. One tracer per orchestrated call; all of its
/// spans share a trace id.
#[derive(Clone)]
pub(crate) struct Tracer {
    config: TelemetryConfig,
    trace_id: String,
}

impl Tracer {
    pub(crate) fn new(config: TelemetryConfig) -> Self {
        Self {
            config,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    fn active(&self) -> bool {
        self.config.enabled && self.config.sink.is_some()
    }

    /// Start a root-level span. No-op when telemetry is disabled.
    pub(crate) fn span(&self, name: &str) -> SpanHandle {
        self.child_span(name, None)
    }

    pub(crate) fn child_span(&self, name: &str, parent: Option<&SpanHandle>) -> SpanHandle {
        if !self.active() {
            return SpanHandle {
                config: self.config.clone(),
                span: None,
            };
        }
        let span = SpanEvent::start(
            self.trace_id.clone(),
            parent.and_then(|p| p.span.as_ref().map(|s| s.span_id.clone())),
            name,
        );
        if let Some(sink) = &self.config.sink {
            sink.export(&TelemetryEvent::SpanStart(span.clone()));
        }
        SpanHandle {
            config: self.config.clone(),
            span: Some(span),
        }
    }
}

/// An in-flight span. Ending it exports a `SpanEnd` event.
pub(crate) struct SpanHandle {
    config: TelemetryConfig,
    span: Option<SpanEvent>,
}

impl SpanHandle {
    pub(crate) fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        if let Some(span) = self.span.take() {
            self.span = Some(span.with_attribute(key, value));
        }
        self
    }

    pub(crate) fn end_ok(self) {
        self.end(|span| span.end_ok());
    }

    pub(crate) fn end_error(self, error: impl Into<String>) {
        self.end(|span| span.end_error(error));
    }

    fn end(self, close: impl FnOnce(SpanEvent) -> SpanEvent) {
        let Some(span) = self.span else { return };
        let done = close(span);
        if let Some(sink) = &self.config.sink {
            sink.export(&TelemetryEvent::SpanEnd(done));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl TelemetrySink for RecordingSink {
        fn export(&self, event: &TelemetryEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn enabled_tracer_exports_start_and_end() {
        let sink = Arc::new(RecordingSink::default());
        let tracer = Tracer::new(TelemetryConfig::with_sink(sink.clone()));

        let root = tracer.span("ai.generate");
        let child = tracer.child_span("ai.generate.step", Some(&root));
        child.end_ok();
        root.end_ok();

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 4);
        match (&events[1], &events[2]) {
            (TelemetryEvent::SpanStart(step), TelemetryEvent::SpanEnd(ended)) => {
                assert_eq!(step.name, "ai.generate.step");
                assert!(step.parent_span_id.is_some());
                assert_eq!(ended.span_id, step.span_id);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn disabled_tracer_exports_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let tracer = Tracer::new(TelemetryConfig {
            enabled: false,
            sink: Some(sink.clone()),
        });

        let span = tracer.span("ai.generate");
        span.end_error("boom");

        assert!(sink.events.lock().unwrap().is_empty());
    }
}
