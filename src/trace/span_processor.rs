// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::trace::export::{Deadline, SpanExporter, TraceError};
use crate::trace::id::SpanContext;
use crate::trace::span::{Span, SpanData};

/// Hook invoked on span start and end.
///
/// Both notifications run synchronously, in registration order, on the thread
/// that started or ended the span. That guarantees per-span start/end ordering
/// but means a slow processor blocks the caller: processors doing expensive
/// work (exporting) must hand off internally to an asynchronous pipeline, as
/// [`BatchSpanProcessor`](crate::trace::BatchSpanProcessor) does.
pub trait SpanProcessor: Send + Sync {
    /// Called when a span is started, with the parent context it was started
    /// under
    fn on_start(&self, span: &mut Span, parent: Option<&SpanContext>);

    /// Called after a span is ended, with its frozen read-only data
    fn on_end(&self, span: SpanData);

    /// Export whatever the processor is holding, bounded by `deadline`
    fn force_flush(&self, deadline: Deadline) -> Result<(), TraceError>;

    /// Stop the processor. Must be safe to call more than once.
    fn shutdown(&self, deadline: Deadline) -> Result<(), TraceError>;
}

/// Passes every ended span to the exporter on the caller's thread, without
/// batching. Useful for debugging and tests, not for production throughput.
pub struct SimpleSpanProcessor {
    exporter: Box<dyn SpanExporter>,
}

impl SimpleSpanProcessor {
    pub fn new(exporter: Box<dyn SpanExporter>) -> Self {
        Self { exporter }
    }
}

impl std::fmt::Debug for SimpleSpanProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleSpanProcessor").finish()
    }
}

impl SpanProcessor for SimpleSpanProcessor {
    fn on_start(&self, _span: &mut Span, _parent: Option<&SpanContext>) {}

    fn on_end(&self, span: SpanData) {
        if !span.span_context.trace_flags().is_sampled() {
            return;
        }
        if let Err(e) = self.exporter.export_spans(Deadline::none(), vec![span]) {
            crate::tp_debug!("SimpleSpanProcessor.on_end failed to export span: {e}");
        }
    }

    fn force_flush(&self, _deadline: Deadline) -> Result<(), TraceError> {
        // Nothing buffered
        Ok(())
    }

    fn shutdown(&self, deadline: Deadline) -> Result<(), TraceError> {
        self.exporter.shutdown(deadline)
    }
}
