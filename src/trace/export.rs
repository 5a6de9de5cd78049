// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::{Duration, Instant};

use crate::trace::span::SpanData;

/// Error surface of the export pipeline.
///
/// Export failures are reported to the caller of `force_flush`/`shutdown` and
/// never retried by the pipeline itself; a retrying exporter decorator is the
/// place for retry policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    #[error("pipeline has already shut down")]
    AlreadyShutdown,
    /// A deadline expired before the operation completed. Carries the time
    /// spent waiting, zero when the deadline was expired on entry.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("export failed: {0}")]
    Export(String),
}

impl From<crate::core::Error> for TraceError {
    fn from(error: crate::core::Error) -> Self {
        TraceError::Export(error.to_string())
    }
}

/// Time bound carried by flush and shutdown operations.
///
/// The equivalent of a cancellable context deadline: `Deadline::none()` never
/// expires, `Deadline::after(d)` expires `d` from now. Operations that may
/// block must check the deadline before starting blocking work and propagate
/// [`TraceError::Timeout`] if it has already passed.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// An unbounded deadline, never expires
    pub const fn none() -> Self {
        Deadline(None)
    }

    pub fn at(instant: Instant) -> Self {
        Deadline(Some(instant))
    }

    pub fn after(timeout: Duration) -> Self {
        Deadline(Some(Instant::now() + timeout))
    }

    pub fn expired(&self) -> bool {
        match self.0 {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Time left before expiry, or `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Errors with [`TraceError::Timeout`] if the deadline has already passed
    pub(crate) fn check(&self) -> Result<(), TraceError> {
        if self.expired() {
            Err(TraceError::Timeout(Duration::ZERO))
        } else {
            Ok(())
        }
    }
}

/// Sink for batches of ended spans.
///
/// Implementations must be safe to call from the pipeline worker thread while
/// another thread shuts them down: once `shutdown` has completed,
/// `export_spans` is a guaranteed no-op returning `Ok(())`, never a partial
/// write.
pub trait SpanExporter: Send + Sync {
    /// Export a batch of read-only spans. The batch is transferred, not
    /// shared: its spans are consumed whether or not the export succeeds.
    fn export_spans(&self, deadline: Deadline, spans: Vec<SpanData>) -> Result<(), TraceError>;

    /// Stop the exporter. Checks `deadline` before any teardown of its own
    /// and returns [`TraceError::Timeout`] if it is already expired.
    fn shutdown(&self, deadline: Deadline) -> Result<(), TraceError>;
}
