// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Span lifecycle and export pipeline
//!
//! Spans are started by a [`Tracer`], mutated by the application, and frozen
//! into read-only [`SpanData`] when ended. Ended spans travel through the
//! registered [`SpanProcessor`] chain; the [`BatchSpanProcessor`] buffers them
//! in a bounded queue and hands batches to a [`SpanExporter`] from a dedicated
//! worker thread.

mod attribute;
mod batch_pipeline;
mod config;
mod export;
mod id;
mod provider;
mod span;
mod span_processor;
mod tracer;

pub use attribute::{Key, KeyValue, Value};
pub use batch_pipeline::BatchSpanProcessor;
pub use config::{SpanConfig, SpanEndOption, SpanStartOption, TracerConfig, TracerOption};
pub use export::{Deadline, SpanExporter, TraceError};
pub use id::{IdGenerator, RandomIdGenerator, SpanContext, SpanId, TraceFlags, TraceId};
pub use provider::{TracerProvider, TracerProviderBuilder};
pub use span::{Event, Link, Span, SpanData, SpanKind, Status};
pub use span_processor::{SimpleSpanProcessor, SpanProcessor};
pub use tracer::{InstrumentationScope, Tracer};
