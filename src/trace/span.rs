// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Span state machine.
//!
//! A [`Span`] is mutable while active and owned by the caller that started
//! it. Ending it takes the recording out of the span, freezes it into a
//! read-only [`SpanData`] and hands that to the provider's processor chain.
//! Every mutator after that point is a silent no-op, and repeated `end` calls
//! keep reporting the end timestamp fixed by the first one.

use std::borrow::Cow;
use std::time::SystemTime;

use crate::trace::attribute::KeyValue;
use crate::trace::config::{SpanConfig, SpanEndOption};
use crate::trace::id::{SpanContext, SpanId};
use crate::trace::provider::TracerProvider;
use crate::trace::tracer::InstrumentationScope;

/// Role of a span relative to its trace neighbours
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Internal => "internal",
            SpanKind::Server => "server",
            SpanKind::Client => "client",
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
        }
    }
}

/// Outcome recorded on a span
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum Status {
    #[default]
    Unset,
    Error {
        description: Cow<'static, str>,
    },
    Ok,
}

impl Status {
    pub fn error(description: impl Into<Cow<'static, str>>) -> Self {
        Status::Error {
            description: description.into(),
        }
    }

    // Ok is final: Unset < Error < Ok
    fn priority(&self) -> u8 {
        match self {
            Status::Unset => 0,
            Status::Error { .. } => 1,
            Status::Ok => 2,
        }
    }
}

/// Timed annotation on a span
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: Cow<'static, str>,
    pub timestamp: SystemTime,
    pub attributes: Vec<KeyValue>,
}

impl Event {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) -> Self {
        Event {
            name: name.into(),
            timestamp,
            attributes,
        }
    }
}

/// Reference to another span's context, immutable once constructed
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub span_context: SpanContext,
    pub attributes: Vec<KeyValue>,
}

impl Link {
    pub fn new(span_context: SpanContext, attributes: Vec<KeyValue>) -> Self {
        Link {
            span_context,
            attributes,
        }
    }
}

/// Read-only snapshot of an ended span.
///
/// This is the value transferred through the processor chain and consumed by
/// exporters, nothing mutates it after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanData {
    pub span_context: SpanContext,
    pub parent_span_id: SpanId,
    pub name: Cow<'static, str>,
    pub span_kind: SpanKind,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
    pub attributes: Vec<KeyValue>,
    pub events: Vec<Event>,
    pub links: Vec<Link>,
    pub status: Status,
    pub instrumentation_scope: InstrumentationScope,
}

/// The mutable state of an active span, taken out when the span ends
#[derive(Debug)]
pub(crate) struct SpanRecording {
    pub(crate) name: Cow<'static, str>,
    pub(crate) span_kind: SpanKind,
    pub(crate) start_time: SystemTime,
    pub(crate) attributes: Vec<KeyValue>,
    pub(crate) events: Vec<Event>,
    pub(crate) links: Vec<Link>,
    pub(crate) status: Status,
    pub(crate) instrumentation_scope: InstrumentationScope,
}

/// Single operation within a trace
#[derive(Debug)]
pub struct Span {
    span_context: SpanContext,
    parent_span_id: SpanId,
    recording: Option<SpanRecording>,
    ended_at: Option<SystemTime>,
    provider: TracerProvider,
}

impl Span {
    pub(crate) fn start(
        span_context: SpanContext,
        parent_span_id: SpanId,
        recording: SpanRecording,
        provider: TracerProvider,
    ) -> Self {
        Span {
            span_context,
            parent_span_id,
            recording: Some(recording),
            ended_at: None,
            provider,
        }
    }

    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    pub fn parent_span_id(&self) -> SpanId {
        self.parent_span_id
    }

    /// Returns `true` until the span is ended
    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// End timestamp, `None` exactly while the span has not been ended
    pub fn end_time(&self) -> Option<SystemTime> {
        self.ended_at
    }

    /// Sets a single attribute. No-op once the span has ended.
    pub fn set_attribute(&mut self, attribute: KeyValue) {
        if let Some(recording) = &mut self.recording {
            recording.attributes.push(attribute);
        }
    }

    /// Adds an event timestamped now. No-op once the span has ended.
    pub fn add_event(&mut self, name: impl Into<Cow<'static, str>>, attributes: Vec<KeyValue>) {
        self.add_event_with_timestamp(name, SystemTime::now(), attributes)
    }

    /// Adds an event at a specific time. No-op once the span has ended.
    pub fn add_event_with_timestamp(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) {
        if let Some(recording) = &mut self.recording {
            recording.events.push(Event::new(name, timestamp, attributes));
        }
    }

    /// Adds a link to another span's context. No-op once the span has ended.
    pub fn add_link(&mut self, span_context: SpanContext, attributes: Vec<KeyValue>) {
        if let Some(recording) = &mut self.recording {
            recording.links.push(Link::new(span_context, attributes));
        }
    }

    /// Records a status. A status can only be upgraded, `Ok` is final and an
    /// error never replaces it. No-op once the span has ended.
    pub fn set_status(&mut self, status: Status) {
        if let Some(recording) = &mut self.recording {
            if status.priority() > recording.status.priority() {
                recording.status = status;
            }
        }
    }

    /// Renames the span. No-op once the span has ended.
    pub fn update_name(&mut self, name: impl Into<Cow<'static, str>>) {
        if let Some(recording) = &mut self.recording {
            recording.name = name.into();
        }
    }

    /// Ends the span at the current wall clock time
    pub fn end(&mut self) {
        self.end_internal(SpanConfig::default())
    }

    /// Ends the span at an explicit timestamp
    pub fn end_with_timestamp(&mut self, timestamp: SystemTime) {
        self.end_internal(SpanConfig {
            timestamp: Some(timestamp),
            ..Default::default()
        })
    }

    /// Ends the span with end options applied in argument order
    pub fn end_with_options(&mut self, options: impl IntoIterator<Item = SpanEndOption>) {
        self.end_internal(SpanConfig::from_end_options(options))
    }

    /// The `Active -> Ended` transition. Runs exactly once, repeated end
    /// calls are no-ops and do not renotify processors.
    fn end_internal(&mut self, config: SpanConfig) {
        let Some(mut recording) = self.recording.take() else {
            return;
        };
        let end_time = config.timestamp.unwrap_or_else(SystemTime::now);
        if config.stack_trace {
            recording.attributes.push(KeyValue::new(
                "code.stacktrace",
                std::backtrace::Backtrace::force_capture().to_string(),
            ));
        }
        self.ended_at = Some(end_time);

        let data = SpanData {
            span_context: self.span_context,
            parent_span_id: self.parent_span_id,
            name: recording.name,
            span_kind: recording.span_kind,
            start_time: recording.start_time,
            end_time,
            attributes: recording.attributes,
            events: recording.events,
            links: recording.links,
            status: recording.status,
            instrumentation_scope: recording.instrumentation_scope,
        };
        self.provider.on_span_end(data);
    }
}
