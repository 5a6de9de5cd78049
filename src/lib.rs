// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Span lifecycle and export pipeline.
//!
//! The crate covers the path from starting a span to handing batches of
//! finished spans to an exporter: span/tracer configuration snapshots,
//! the span state machine, the processor chain, and a batching pipeline
//! with bounded buffering and deadline-bounded flush/shutdown.
//!
//! # Usage
//! ```rust
//! use tracepipe::{Config, StdoutExporter, TracerProvider};
//!
//! // Picks up env var configuration, with manual overrides
//! let mut builder = Config::builder();
//! builder.set_service("my-service".to_string());
//! let config = builder.build();
//!
//! let provider = TracerProvider::builder()
//!     .with_config(config)
//!     .with_batch_exporter(Box::new(StdoutExporter::builder().build()))
//!     .build();
//!
//! let tracer = provider.tracer("my-component");
//! let mut span = tracer.start("operation");
//! span.end();
//!
//! provider.shutdown(tracepipe::Deadline::none()).unwrap();
//! ```

pub mod core;
pub mod exporters;
pub mod trace;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::core::configuration::Config;
pub use crate::exporters::stdout::StdoutExporter;
pub use crate::trace::{
    BatchSpanProcessor, Deadline, KeyValue, Span, SpanExporter, SpanProcessor, TraceError, Tracer,
    TracerProvider,
};
