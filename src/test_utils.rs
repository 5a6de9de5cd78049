// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Test scaffolding, gated behind the `test-utils` feature.
//!
//! Not part of the public API, do not use in production builds.

use std::sync::{Arc, Mutex, RwLock};

use crate::trace::{Deadline, SpanData, SpanExporter, TraceError};

/// Exporter that records every exported span in memory.
///
/// Shares the storage through [`InMemorySpanExporter::spans`] so tests keep a
/// handle after moving the exporter into a processor.
#[derive(Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
    stopped: RwLock<bool>,
}

impl InMemorySpanExporter {
    /// Handle to the recorded spans, valid after the exporter is moved
    pub fn spans(&self) -> Arc<Mutex<Vec<SpanData>>> {
        self.spans.clone()
    }

    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.spans.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.spans.lock().unwrap().clear();
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export_spans(&self, _deadline: Deadline, spans: Vec<SpanData>) -> Result<(), TraceError> {
        let stopped = *self
            .stopped
            .read()
            .map_err(|_| TraceError::Export("stopped flag lock poisoned".to_string()))?;
        if stopped {
            return Ok(());
        }
        self.spans
            .lock()
            .map_err(|_| TraceError::Export("span storage lock poisoned".to_string()))?
            .extend(spans);
        Ok(())
    }

    fn shutdown(&self, deadline: Deadline) -> Result<(), TraceError> {
        {
            let mut stopped = self
                .stopped
                .write()
                .map_err(|_| TraceError::Export("stopped flag lock poisoned".to_string()))?;
            *stopped = true;
        }
        deadline.check()
    }
}
