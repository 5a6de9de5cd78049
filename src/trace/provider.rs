// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::core::configuration::Config;
use crate::trace::batch_pipeline::BatchSpanProcessor;
use crate::trace::config::{TracerConfig, TracerOption};
use crate::trace::export::{Deadline, SpanExporter, TraceError};
use crate::trace::id::{IdGenerator, RandomIdGenerator, SpanContext};
use crate::trace::span::{Span, SpanData};
use crate::trace::span_processor::SpanProcessor;
use crate::trace::tracer::{InstrumentationScope, Tracer};

struct ProviderInner {
    processors: Vec<Box<dyn SpanProcessor>>,
    id_generator: Box<dyn IdGenerator>,
    config: Config,
    is_shutdown: AtomicBool,
}

/// Shared owner of the span processor chain.
///
/// Tracers created from one provider dispatch span start/end notifications to
/// the same registered processors, synchronously and in registration order.
/// After [`TracerProvider::shutdown`] both notifications become no-ops, spans
/// are silently dropped rather than erroring.
#[derive(Clone)]
pub struct TracerProvider {
    inner: Arc<ProviderInner>,
}

impl std::fmt::Debug for TracerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracerProvider")
            .field("processors", &self.inner.processors.len())
            .field("is_shutdown", &self.inner.is_shutdown.load(Ordering::Relaxed))
            .finish()
    }
}

impl TracerProvider {
    pub fn builder() -> TracerProviderBuilder {
        TracerProviderBuilder::default()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns a tracer with the given instrumentation scope name
    pub fn tracer(&self, name: impl Into<Cow<'static, str>>) -> Tracer {
        self.tracer_with_options(name, [])
    }

    /// Returns a tracer with scope options applied in argument order
    pub fn tracer_with_options(
        &self,
        name: impl Into<Cow<'static, str>>,
        options: impl IntoIterator<Item = TracerOption>,
    ) -> Tracer {
        let config = TracerConfig::from_options(options);
        Tracer::new(
            InstrumentationScope::from_tracer_config(name, config),
            self.clone(),
        )
    }

    pub(crate) fn id_generator(&self) -> &dyn IdGenerator {
        self.inner.id_generator.as_ref()
    }

    pub(crate) fn on_span_start(&self, span: &mut Span, parent: Option<&SpanContext>) {
        if self.dropping_spans() {
            return;
        }
        for processor in &self.inner.processors {
            processor.on_start(span, parent);
        }
    }

    pub(crate) fn on_span_end(&self, span: SpanData) {
        if self.dropping_spans() {
            return;
        }
        let Some((last, head)) = self.inner.processors.split_last() else {
            return;
        };
        for processor in head {
            processor.on_end(span.clone());
        }
        last.on_end(span);
    }

    fn dropping_spans(&self) -> bool {
        self.inner.is_shutdown.load(Ordering::Relaxed) || !self.inner.config.enabled()
    }

    /// Drains every processor, bounded by `deadline`.
    ///
    /// All processors are flushed even if one fails; the first error is
    /// returned.
    pub fn force_flush(&self, deadline: Deadline) -> Result<(), TraceError> {
        if self.inner.is_shutdown.load(Ordering::Relaxed) {
            return Err(TraceError::AlreadyShutdown);
        }
        let mut result = Ok(());
        for processor in &self.inner.processors {
            let flush_result = processor.force_flush(deadline);
            if result.is_ok() {
                result = flush_result;
            }
        }
        result
    }

    /// Shuts down every processor. Only the first call takes effect,
    /// subsequent calls return `Ok(())` immediately.
    pub fn shutdown(&self, deadline: Deadline) -> Result<(), TraceError> {
        if self.inner.is_shutdown.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        deadline.check()?;
        let mut result = Ok(());
        for processor in &self.inner.processors {
            let shutdown_result = processor.shutdown(deadline);
            if result.is_ok() {
                result = shutdown_result;
            }
        }
        result
    }
}

/// Builder for [`TracerProvider`]
#[derive(Default)]
pub struct TracerProviderBuilder {
    processors: Vec<Box<dyn SpanProcessor>>,
    batch_exporters: Vec<Box<dyn SpanExporter>>,
    config: Option<Config>,
    id_generator: Option<Box<dyn IdGenerator>>,
}

impl TracerProviderBuilder {
    /// Registers a span processor. Processors run in registration order.
    pub fn with_span_processor(mut self, processor: Box<dyn SpanProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Registers an exporter behind a [`BatchSpanProcessor`] tuned by the
    /// provider configuration
    pub fn with_batch_exporter(mut self, exporter: Box<dyn SpanExporter>) -> Self {
        self.batch_exporters.push(exporter);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_id_generator(mut self, id_generator: Box<dyn IdGenerator>) -> Self {
        self.id_generator = Some(id_generator);
        self
    }

    pub fn build(self) -> TracerProvider {
        let config = self.config.unwrap_or_else(|| Config::builder().build());
        crate::core::log::set_max_level(config.log_level());

        let mut processors = self.processors;
        for exporter in self.batch_exporters {
            processors.push(Box::new(BatchSpanProcessor::new(exporter, &config)));
        }

        TracerProvider {
            inner: Arc::new(ProviderInner {
                processors,
                id_generator: self
                    .id_generator
                    .unwrap_or_else(|| Box::new(RandomIdGenerator)),
                config,
                is_shutdown: AtomicBool::new(false),
            }),
        }
    }
}
