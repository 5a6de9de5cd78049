// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;
use std::time::SystemTime;

use crate::trace::config::{SpanConfig, SpanStartOption, TracerConfig};
use crate::trace::id::{SpanContext, SpanId, TraceFlags};
use crate::trace::provider::TracerProvider;
use crate::trace::span::{Span, SpanRecording};

/// Identity of the instrumentation library that produces spans
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstrumentationScope {
    pub name: Cow<'static, str>,
    pub version: Option<String>,
    pub schema_url: Option<String>,
}

impl InstrumentationScope {
    pub(crate) fn from_tracer_config(
        name: impl Into<Cow<'static, str>>,
        config: TracerConfig,
    ) -> Self {
        InstrumentationScope {
            name: name.into(),
            version: config.instrumentation_version,
            schema_url: config.schema_url,
        }
    }
}

/// Span factory. Assigns identifiers and parentage and notifies the
/// provider's processor chain on start.
#[derive(Debug, Clone)]
pub struct Tracer {
    scope: InstrumentationScope,
    provider: TracerProvider,
}

impl Tracer {
    pub(crate) fn new(scope: InstrumentationScope, provider: TracerProvider) -> Self {
        Tracer { scope, provider }
    }

    pub fn instrumentation_scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    /// Starts a root span with default options
    pub fn start(&self, name: impl Into<Cow<'static, str>>) -> Span {
        self.start_with_options(name, None, [])
    }

    /// Starts a child of `parent`
    pub fn start_with_parent(
        &self,
        name: impl Into<Cow<'static, str>>,
        parent: &SpanContext,
    ) -> Span {
        self.start_with_options(name, Some(parent), [])
    }

    /// Starts a span with explicit parentage and start options.
    ///
    /// The span joins the parent's trace unless the parent is missing or
    /// invalid, or the new root option is set, in which case a fresh trace ID
    /// is assigned.
    pub fn start_with_options(
        &self,
        name: impl Into<Cow<'static, str>>,
        parent: Option<&SpanContext>,
        options: impl IntoIterator<Item = SpanStartOption>,
    ) -> Span {
        let config = SpanConfig::from_start_options(options);

        let parent = if config.new_root {
            None
        } else {
            parent.filter(|ctx| ctx.is_valid())
        };

        let id_generator = self.provider.id_generator();
        let (trace_id, trace_flags, parent_span_id) = match parent {
            Some(ctx) => (ctx.trace_id(), ctx.trace_flags(), ctx.span_id()),
            None => (
                id_generator.new_trace_id(),
                TraceFlags::SAMPLED,
                SpanId::INVALID,
            ),
        };
        let span_context = SpanContext::new(trace_id, id_generator.new_span_id(), trace_flags);

        let recording = SpanRecording {
            name: name.into(),
            span_kind: config.span_kind,
            start_time: config.timestamp.unwrap_or_else(SystemTime::now),
            attributes: config.attributes,
            events: Vec::new(),
            links: config.links,
            status: Default::default(),
            instrumentation_scope: self.scope.clone(),
        };

        let mut span = Span::start(
            span_context,
            parent_span_id,
            recording,
            self.provider.clone(),
        );
        self.provider.on_span_start(&mut span, parent);
        span
    }
}
