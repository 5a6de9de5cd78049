// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching export pipeline.
//!
//! Ended spans are buffered in a bounded queue guarded by a single mutex; a
//! dedicated worker thread drains the queue into the exporter. A flush is
//! triggered when the queue reaches the configured batch size, when the
//! scheduled delay elapses since the last flush, or explicitly through
//! `force_flush`/`shutdown`. Enqueueing never blocks the producer: when the
//! queue is full the incoming span is dropped and counted.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Condvar, Mutex, MutexGuard,
};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::configuration::Config;
use crate::trace::export::{Deadline, SpanExporter, TraceError};
use crate::trace::id::SpanContext;
use crate::trace::span::{Span, SpanData};
use crate::trace::span_processor::SpanProcessor;

/// A reasonable amount of time that shouldn't impact the app while allowing
/// the leftover data to be almost always flushed
const EXPORTER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// Pre-allocate the queue buffer to avoid reallocations on small sizes
const PRE_ALLOCATED_SPANS: usize = 512;

/// Bounded buffer of ended spans waiting for the next flush
struct SpanQueue {
    spans: Vec<SpanData>,
    max_queue_size: usize,
    dropped: u64,
}

impl SpanQueue {
    fn new(max_queue_size: usize) -> Self {
        Self {
            spans: Vec::with_capacity(max_queue_size.min(PRE_ALLOCATED_SPANS)),
            max_queue_size,
            dropped: 0,
        }
    }

    /// Accepts the span unless the queue is full, in which case the incoming
    /// span is dropped and counted. Never blocks.
    fn enqueue(&mut self, span: SpanData) -> bool {
        if self.spans.len() >= self.max_queue_size {
            self.dropped += 1;
            return false;
        }
        self.spans.push(span);
        true
    }

    fn len(&self) -> usize {
        self.spans.len()
    }

    /// Takes the whole buffer, leaving an empty one with the same headroom
    fn drain(&mut self) -> Vec<SpanData> {
        std::mem::replace(
            &mut self.spans,
            Vec::with_capacity(self.max_queue_size.min(PRE_ALLOCATED_SPANS)),
        )
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SenderError {
    AlreadyShutdown,
    MutexPoisoned,
}

#[derive(Debug, PartialEq, Eq)]
enum EnqueueResult {
    Accepted,
    /// The queue was full; carries the total number of spans dropped so far
    Dropped { total_dropped: u64 },
}

#[derive(Debug, PartialEq)]
enum WorkerMessage {
    FlushSpans,
    FlushSpansAfterTimeout,
    Shutdown,
}

struct SharedState {
    queue: SpanQueue,
    flush_requested: bool,
    shutdown_requested: bool,
    has_shutdown: bool,
    /// Number of flushes the worker has started (queue drained)
    flushes_started: u64,
    /// Number of flushes the worker has completed (export returned)
    flushes_completed: u64,
    /// Result of the most recently completed flush
    last_flush_result: Result<(), TraceError>,
    /// Result recorded by the worker when it exits
    shutdown_result: Result<(), TraceError>,
}

struct Waiter {
    state: Mutex<SharedState>,
    notifier: Condvar,
}

fn channel(flush_trigger_size: usize, max_queue_size: usize) -> (Sender, Receiver) {
    let waiter = Arc::new(Waiter {
        state: Mutex::new(SharedState {
            queue: SpanQueue::new(max_queue_size),
            flush_requested: false,
            shutdown_requested: false,
            has_shutdown: false,
            flushes_started: 0,
            flushes_completed: 0,
            last_flush_result: Ok(()),
            shutdown_result: Ok(()),
        }),
        notifier: Condvar::new(),
    });
    (
        Sender {
            waiter: waiter.clone(),
            flush_trigger_size,
        },
        Receiver { waiter },
    )
}

/// Producer half: called from application threads ending spans
struct Sender {
    waiter: Arc<Waiter>,
    flush_trigger_size: usize,
}

impl Drop for Sender {
    fn drop(&mut self) {
        let _ = self.trigger_shutdown();
    }
}

impl Sender {
    fn get_state(&self) -> Result<MutexGuard<'_, SharedState>, SenderError> {
        self.waiter
            .state
            .lock()
            .map_err(|_| SenderError::MutexPoisoned)
    }

    fn get_running_state(&self) -> Result<MutexGuard<'_, SharedState>, SenderError> {
        let state = self.get_state()?;
        if state.has_shutdown || state.shutdown_requested {
            return Err(SenderError::AlreadyShutdown);
        }
        Ok(state)
    }

    fn enqueue_span(&self, span: SpanData) -> Result<EnqueueResult, SenderError> {
        let mut state = self.get_running_state()?;
        if !state.queue.enqueue(span) {
            return Ok(EnqueueResult::Dropped {
                total_dropped: state.queue.dropped,
            });
        }
        if state.queue.len() >= self.flush_trigger_size {
            state.flush_requested = true;
            self.waiter.notifier.notify_all();
        }
        Ok(EnqueueResult::Accepted)
    }

    fn dropped_spans(&self) -> u64 {
        self.get_state().map(|state| state.queue.dropped).unwrap_or(0)
    }

    /// Requests a flush and blocks until a flush that drained the current
    /// queue completes, or the deadline expires.
    fn force_flush(&self, deadline: Deadline) -> Result<(), TraceError> {
        let mut state = self
            .get_state()
            .map_err(|_| TraceError::Export("batch pipeline lock poisoned".to_string()))?;
        if state.has_shutdown || state.shutdown_requested {
            return Err(TraceError::AlreadyShutdown);
        }
        deadline.check()?;

        // Any flush started after this request drains the spans enqueued
        // before it, a flush already in progress may not.
        let target = state.flushes_started + 1;
        state.flush_requested = true;
        self.waiter.notifier.notify_all();

        let started_waiting = Instant::now();
        while state.flushes_completed < target {
            if state.has_shutdown {
                return state.shutdown_result.clone();
            }
            state = match deadline.remaining() {
                None => self
                    .waiter
                    .notifier
                    .wait(state)
                    .map_err(|_| TraceError::Export("batch pipeline lock poisoned".to_string()))?,
                Some(leftover) => {
                    if leftover.is_zero() {
                        return Err(TraceError::Timeout(started_waiting.elapsed()));
                    }
                    let (state, timeout_result) = self
                        .waiter
                        .notifier
                        .wait_timeout(state, leftover)
                        .map_err(|_| {
                            TraceError::Export("batch pipeline lock poisoned".to_string())
                        })?;
                    if timeout_result.timed_out() && state.flushes_completed < target {
                        return Err(TraceError::Timeout(started_waiting.elapsed()));
                    }
                    state
                }
            };
        }
        state.last_flush_result.clone()
    }

    fn trigger_shutdown(&self) -> Result<(), SenderError> {
        let mut state = self.get_state()?;
        if state.has_shutdown {
            return Err(SenderError::AlreadyShutdown);
        }
        state.shutdown_requested = true;
        self.waiter.notifier.notify_all();
        Ok(())
    }

    /// Blocks until the worker has exited, bounded by the deadline, and
    /// returns the result of the final flush and exporter teardown.
    fn wait_shutdown_done(&self, deadline: Deadline) -> Result<(), TraceError> {
        let mut state = self
            .get_state()
            .map_err(|_| TraceError::Export("batch pipeline lock poisoned".to_string()))?;
        let started_waiting = Instant::now();
        while !state.has_shutdown {
            state = match deadline.remaining() {
                None => self
                    .waiter
                    .notifier
                    .wait(state)
                    .map_err(|_| TraceError::Export("batch pipeline lock poisoned".to_string()))?,
                Some(leftover) => {
                    if leftover.is_zero() {
                        return Err(TraceError::Timeout(started_waiting.elapsed()));
                    }
                    let (state, timeout_result) = self
                        .waiter
                        .notifier
                        .wait_timeout(state, leftover)
                        .map_err(|_| {
                            TraceError::Export("batch pipeline lock poisoned".to_string())
                        })?;
                    if timeout_result.timed_out() && !state.has_shutdown {
                        return Err(TraceError::Timeout(started_waiting.elapsed()));
                    }
                    state
                }
            };
        }
        state.shutdown_result.clone()
    }
}

/// Consumer half: owned by the worker thread
struct Receiver {
    waiter: Arc<Waiter>,
}

impl Drop for Receiver {
    fn drop(&mut self) {
        // Wake any waiter even if the worker died without a clean exit
        if let Ok(mut state) = self.waiter.state.lock() {
            state.has_shutdown = true;
            self.waiter.notifier.notify_all();
        }
    }
}

struct MutexPoisonedError;

impl Receiver {
    /// Blocks until a flush or shutdown is requested, or `scheduled_delay`
    /// elapses. Returns the drained queue together with the reason.
    fn receive(
        &self,
        scheduled_delay: Duration,
    ) -> Result<(WorkerMessage, Vec<SpanData>), MutexPoisonedError> {
        let deadline = Instant::now() + scheduled_delay;
        let mut state = self.waiter.state.lock().map_err(|_| MutexPoisonedError)?;
        loop {
            // If shutdown was asked, grab the whole queue for the final flush
            if state.shutdown_requested {
                state.flushes_started += 1;
                return Ok((WorkerMessage::Shutdown, state.queue.drain()));
            }
            if state.flush_requested {
                state.flush_requested = false;
                state.flushes_started += 1;
                return Ok((WorkerMessage::FlushSpans, state.queue.drain()));
            }
            let leftover = deadline.saturating_duration_since(Instant::now());
            if leftover.is_zero() {
                // The schedule interval elapsed, flush whatever is buffered
                state.flushes_started += 1;
                return Ok((WorkerMessage::FlushSpansAfterTimeout, state.queue.drain()));
            }
            let timeout_result;
            (state, timeout_result) = self
                .waiter
                .notifier
                .wait_timeout(state, leftover)
                .map_err(|_| MutexPoisonedError)?;
            if timeout_result.timed_out() {
                state.flushes_started += 1;
                return Ok((WorkerMessage::FlushSpansAfterTimeout, state.queue.drain()));
            }
        }
    }

    fn complete_flush(&self, result: Result<(), TraceError>) {
        if let Ok(mut state) = self.waiter.state.lock() {
            state.flushes_completed += 1;
            state.last_flush_result = result;
            self.waiter.notifier.notify_all();
        }
    }

    fn shutdown_done(&self, result: Result<(), TraceError>) {
        if let Ok(mut state) = self.waiter.state.lock() {
            state.has_shutdown = true;
            state.shutdown_result = result;
            self.waiter.notifier.notify_all();
        }
    }
}

/// The export loop running on the dedicated worker thread
struct BatchWorker {
    exporter: Box<dyn SpanExporter>,
    rx: Receiver,
    scheduled_delay: Duration,
    export_timeout: Duration,
}

impl BatchWorker {
    fn spawn(
        exporter: Box<dyn SpanExporter>,
        rx: Receiver,
        scheduled_delay: Duration,
        export_timeout: Duration,
    ) -> thread::JoinHandle<()> {
        let worker = BatchWorker {
            exporter,
            rx,
            scheduled_delay,
            export_timeout,
        };
        thread::Builder::new()
            .name("tracepipe-batch-export".to_string())
            .spawn(move || worker.run())
            .expect("failed to spawn batch export worker thread")
    }

    fn run(self) {
        let final_flush_result = loop {
            let Ok((message, spans)) = self.rx.receive(self.scheduled_delay) else {
                // Poisoned lock, the Receiver drop marks the pipeline done
                return;
            };
            let result = self.export_batch(spans);
            self.rx.complete_flush(result.clone());
            if message == WorkerMessage::Shutdown {
                break result;
            }
        };
        let teardown_result = self
            .exporter
            .shutdown(Deadline::after(EXPORTER_SHUTDOWN_TIMEOUT));
        self.rx.shutdown_done(final_flush_result.and(teardown_result));
    }

    /// One export call per drained batch. The batch is consumed whether or
    /// not the export succeeds, there is no retry.
    fn export_batch(&self, spans: Vec<SpanData>) -> Result<(), TraceError> {
        if spans.is_empty() {
            return Ok(());
        }
        let result = self
            .exporter
            .export_spans(Deadline::after(self.export_timeout), spans);
        if let Err(e) = &result {
            crate::tp_debug!("BatchWorker.export_batch export error: {e}");
        }
        result
    }
}

/// Span processor that buffers ended spans and exports them in batches from a
/// dedicated worker thread.
///
/// `on_end` never blocks: a full queue drops the incoming span and counts it,
/// favoring producer availability over trace completeness. The total is
/// available through [`BatchSpanProcessor::dropped_spans`].
pub struct BatchSpanProcessor {
    tx: Sender,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    is_shutdown: AtomicBool,
}

impl std::fmt::Debug for BatchSpanProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSpanProcessor").finish()
    }
}

impl BatchSpanProcessor {
    pub fn new(exporter: Box<dyn SpanExporter>, config: &Config) -> Self {
        let (tx, rx) = channel(config.max_export_batch_size(), config.max_queue_size());
        let handle = BatchWorker::spawn(
            exporter,
            rx,
            config.scheduled_delay(),
            config.export_timeout(),
        );
        Self {
            tx,
            handle: Mutex::new(Some(handle)),
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Total number of spans dropped because the queue was full
    pub fn dropped_spans(&self) -> u64 {
        self.tx.dropped_spans()
    }

    fn join(&self) -> Result<(), TraceError> {
        let handle = self
            .handle
            .lock()
            .map_err(|_| TraceError::Export("batch worker handle lock poisoned".to_string()))?
            .take();
        match handle {
            Some(handle) => handle
                .join()
                .map_err(|_| TraceError::Export("batch export worker panicked".to_string())),
            None => Ok(()),
        }
    }
}

impl SpanProcessor for BatchSpanProcessor {
    fn on_start(&self, _span: &mut Span, _parent: Option<&SpanContext>) {}

    fn on_end(&self, span: SpanData) {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return;
        }
        match self.tx.enqueue_span(span) {
            Ok(EnqueueResult::Accepted) => {}
            Ok(EnqueueResult::Dropped { total_dropped }) => {
                // Log the first drop only, the total is reported at shutdown
                if total_dropped == 1 {
                    crate::tp_warn!(
                        "BatchSpanProcessor dropped a span because the queue is full. \
                         Further drops will not be logged until shutdown."
                    );
                }
            }
            // Racing a shutdown, the span is silently dropped
            Err(_) => {}
        }
    }

    fn force_flush(&self, deadline: Deadline) -> Result<(), TraceError> {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(TraceError::AlreadyShutdown);
        }
        self.tx.force_flush(deadline)
    }

    fn shutdown(&self, deadline: Deadline) -> Result<(), TraceError> {
        // Only the first call takes effect, the rest return immediately
        if self.is_shutdown.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        deadline.check()?;

        let dropped = self.tx.dropped_spans();
        if dropped > 0 {
            crate::tp_warn!("BatchSpanProcessor dropped {dropped} spans due to a full queue");
        }

        match self.tx.trigger_shutdown() {
            Ok(()) | Err(SenderError::AlreadyShutdown) => {}
            Err(SenderError::MutexPoisoned) => {
                return Err(TraceError::Export(
                    "batch pipeline lock poisoned".to_string(),
                ));
            }
        }
        let result = self.tx.wait_shutdown_done(deadline);
        match result {
            // Joining after a timeout would block past the deadline, the
            // worker keeps winding down detached
            Err(TraceError::Timeout(_)) => result,
            _ => {
                let join_result = self.join();
                result.and(join_result)
            }
        }
    }
}

impl Drop for BatchSpanProcessor {
    fn drop(&mut self) {
        // Sender's own drop asks the worker to stop; detach the handle
        let _ = self.handle.lock().map(|mut handle| handle.take());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use super::{channel, BatchSpanProcessor, EnqueueResult, SenderError, WorkerMessage};
    use crate::core::configuration::Config;
    use crate::core::sources::CompositeSource;
    use crate::test_utils::InMemorySpanExporter;
    use crate::trace::export::{Deadline, SpanExporter, TraceError};
    use crate::trace::id::{SpanContext, SpanId};
    use crate::trace::span::SpanData;
    use crate::trace::span_processor::SpanProcessor;
    use crate::trace::tracer::InstrumentationScope;

    fn empty_span_data() -> SpanData {
        SpanData {
            span_context: SpanContext::empty_context(),
            parent_span_id: SpanId::INVALID,
            name: "".into(),
            span_kind: Default::default(),
            start_time: SystemTime::now(),
            end_time: SystemTime::now(),
            attributes: vec![],
            events: vec![],
            links: vec![],
            status: Default::default(),
            instrumentation_scope: InstrumentationScope::default(),
        }
    }

    fn test_config(queue: usize, batch: usize, delay: Duration) -> Config {
        let mut builder = Config::builder_with_sources(&CompositeSource::new());
        builder
            .set_max_queue_size(queue)
            .set_max_export_batch_size(batch)
            .set_scheduled_delay(delay)
            .set_export_timeout(Duration::from_secs(2));
        builder.build()
    }

    #[test]
    fn test_receiver_sender_flush() {
        let (tx, rx) = channel(2, 4);
        std::thread::scope(|s| {
            s.spawn(|| tx.enqueue_span(empty_span_data()));
            s.spawn(|| {
                tx.enqueue_span(empty_span_data()).unwrap();
                tx.enqueue_span(empty_span_data()).unwrap();
            });

            let (message, spans) = rx
                .receive(Duration::from_secs(1))
                .unwrap_or_else(|_| panic!("Failed to receive spans"));

            assert_eq!(message, WorkerMessage::FlushSpans);
            assert!(!spans.is_empty());
        });
    }

    #[test]
    fn test_receiver_sender_queue_drop() {
        let (tx, rx) = channel(100, 4);
        for _ in 0..4 {
            assert_eq!(
                tx.enqueue_span(empty_span_data()),
                Ok(EnqueueResult::Accepted)
            );
        }

        assert_eq!(
            tx.enqueue_span(empty_span_data()),
            Ok(EnqueueResult::Dropped { total_dropped: 1 })
        );
        assert_eq!(
            tx.enqueue_span(empty_span_data()),
            Ok(EnqueueResult::Dropped { total_dropped: 2 })
        );
        assert_eq!(tx.dropped_spans(), 2);

        let (message, spans) = rx
            .receive(Duration::from_millis(1))
            .unwrap_or_else(|_| panic!("Failed to receive spans"));
        assert_eq!(message, WorkerMessage::FlushSpansAfterTimeout);
        assert_eq!(spans.len(), 4);
    }

    #[test]
    fn test_concurrent_producers_bounded_queue() {
        // 150 concurrent end-events against a queue of capacity 100 must
        // retain exactly 100 and count 50 drops, without blocking anyone
        let (tx, rx) = channel(1000, 100);
        std::thread::scope(|s| {
            for _ in 0..150 {
                s.spawn(|| {
                    tx.enqueue_span(empty_span_data()).unwrap();
                });
            }
        });

        assert_eq!(tx.dropped_spans(), 50);
        let (_, spans) = rx
            .receive(Duration::from_millis(1))
            .unwrap_or_else(|_| panic!("Failed to receive spans"));
        assert_eq!(spans.len(), 100);
    }

    #[test]
    fn test_receiver_sender_timeout() {
        let (tx, rx) = channel(2, 4);
        tx.enqueue_span(empty_span_data()).unwrap();

        let (message, spans) = rx
            .receive(Duration::from_millis(1))
            .unwrap_or_else(|_| panic!("Failed to receive spans"));

        assert_eq!(message, WorkerMessage::FlushSpansAfterTimeout);
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn test_trigger_shutdown() {
        let (tx, rx) = channel(10, 10);
        std::thread::scope(|s| {
            s.spawn(|| tx.enqueue_span(empty_span_data()).unwrap());
            s.spawn(|| {
                tx.enqueue_span(empty_span_data()).unwrap();
            });
            s.spawn(|| tx.trigger_shutdown().unwrap());
        });
        let (message, spans) = rx
            .receive(Duration::from_secs(1))
            .unwrap_or_else(|_| panic!("Failed to receive spans"));
        assert_eq!(message, WorkerMessage::Shutdown);
        assert_eq!(spans.len(), 2);

        let (message, spans) = rx
            .receive(Duration::from_secs(1))
            .unwrap_or_else(|_| panic!("Failed to receive spans"));
        assert_eq!(message, WorkerMessage::Shutdown);
        assert_eq!(spans.len(), 0);
    }

    #[test]
    fn test_wait_for_shutdown() {
        let (tx, rx) = channel(2, 4);

        std::thread::scope(|s| {
            s.spawn(|| {
                tx.trigger_shutdown()
                    .unwrap_or_else(|_| panic!("Failed to trigger shutdown"));
                tx.wait_shutdown_done(Deadline::after(Duration::from_secs(1)))
                    .unwrap_or_else(|_| panic!("Failed to wait for shutdown"));
            });
            s.spawn(|| {
                let (msg, spans) = rx
                    .receive(Duration::from_secs(1))
                    .unwrap_or_else(|_| panic!("Failed to receive spans"));
                assert_eq!(msg, WorkerMessage::Shutdown);
                assert_eq!(spans.len(), 0);
                rx.shutdown_done(Ok(()));
                drop(rx);
            });
        });
    }

    #[test]
    fn test_already_shutdown() {
        let (tx, rx) = channel(2, 4);
        drop(rx);
        assert_eq!(tx.trigger_shutdown(), Err(SenderError::AlreadyShutdown));
        assert_eq!(
            tx.enqueue_span(empty_span_data()),
            Err(SenderError::AlreadyShutdown)
        );
    }

    #[test]
    fn test_force_flush_exports_buffered_spans() {
        let exporter = InMemorySpanExporter::default();
        let exported = exporter.spans();
        let processor = BatchSpanProcessor::new(
            Box::new(exporter),
            &test_config(10, 10, Duration::from_secs(5)),
        );

        processor.on_end(empty_span_data());
        processor
            .force_flush(Deadline::after(Duration::from_secs(2)))
            .unwrap();

        assert_eq!(exported.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_flush_triggered_by_batch_size() {
        let exporter = InMemorySpanExporter::default();
        let exported = exporter.spans();
        // Scheduled delay far in the future, only the size trigger can flush
        let processor = BatchSpanProcessor::new(
            Box::new(exporter),
            &test_config(10, 2, Duration::from_secs(30)),
        );

        processor.on_end(empty_span_data());
        processor.on_end(empty_span_data());

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while exported.lock().unwrap().len() < 2 {
            assert!(
                std::time::Instant::now() < deadline,
                "size-triggered flush did not happen"
            );
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_flush_triggered_by_timer() {
        let exporter = InMemorySpanExporter::default();
        let exported = exporter.spans();
        let processor = BatchSpanProcessor::new(
            Box::new(exporter),
            &test_config(10, 10, Duration::from_millis(50)),
        );

        processor.on_end(empty_span_data());

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while exported.lock().unwrap().is_empty() {
            assert!(
                std::time::Instant::now() < deadline,
                "timer-triggered flush did not happen"
            );
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[derive(Debug)]
    struct FailingExporter {
        calls: Arc<AtomicUsize>,
    }

    impl SpanExporter for FailingExporter {
        fn export_spans(
            &self,
            _deadline: Deadline,
            _spans: Vec<SpanData>,
        ) -> Result<(), TraceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TraceError::Export("sink unavailable".to_string()))
        }

        fn shutdown(&self, _deadline: Deadline) -> Result<(), TraceError> {
            Ok(())
        }
    }

    #[test]
    fn test_force_flush_surfaces_export_error_without_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = BatchSpanProcessor::new(
            Box::new(FailingExporter {
                calls: calls.clone(),
            }),
            &test_config(10, 10, Duration::from_secs(5)),
        );

        processor.on_end(empty_span_data());
        let result = processor.force_flush(Deadline::after(Duration::from_secs(2)));
        assert_eq!(
            result,
            Err(TraceError::Export("sink unavailable".to_string()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The failed batch was consumed, the next flush has nothing to export
        processor
            .force_flush(Deadline::after(Duration::from_secs(2)))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_flushes_and_is_idempotent() {
        let exporter = InMemorySpanExporter::default();
        let exported = exporter.spans();
        let processor = BatchSpanProcessor::new(
            Box::new(exporter),
            &test_config(10, 10, Duration::from_secs(5)),
        );

        processor.on_end(empty_span_data());
        processor.on_end(empty_span_data());

        assert_eq!(processor.shutdown(Deadline::after(Duration::from_secs(2))), Ok(()));
        assert_eq!(exported.lock().unwrap().len(), 2);

        // Only the first shutdown takes effect
        assert_eq!(processor.shutdown(Deadline::after(Duration::from_secs(2))), Ok(()));

        // Ended spans after shutdown are silently dropped
        processor.on_end(empty_span_data());
        assert_eq!(exported.lock().unwrap().len(), 2);
        assert_eq!(
            processor.force_flush(Deadline::after(Duration::from_secs(2))),
            Err(TraceError::AlreadyShutdown)
        );
    }

    #[test]
    fn test_shutdown_with_expired_deadline() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(
            Box::new(exporter),
            &test_config(10, 10, Duration::from_secs(5)),
        );

        let expired = Deadline::at(std::time::Instant::now() - Duration::from_millis(1));
        assert_eq!(
            processor.shutdown(expired),
            Err(TraceError::Timeout(Duration::ZERO))
        );
    }

    #[derive(Debug)]
    struct GateExporter {
        entered: Arc<AtomicBool>,
        release: Arc<AtomicBool>,
    }

    impl SpanExporter for GateExporter {
        fn export_spans(
            &self,
            _deadline: Deadline,
            _spans: Vec<SpanData>,
        ) -> Result<(), TraceError> {
            self.entered.store(true, Ordering::SeqCst);
            while !self.release.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        }

        fn shutdown(&self, _deadline: Deadline) -> Result<(), TraceError> {
            Ok(())
        }
    }

    #[test]
    fn test_first_drop_logs_once() {
        let _guard = crate::core::log::test_logger::activate_test_logger();

        let entered = Arc::new(AtomicBool::new(false));
        let release = Arc::new(AtomicBool::new(true));
        let processor = BatchSpanProcessor::new(
            Box::new(GateExporter {
                entered: entered.clone(),
                release: release.clone(),
            }),
            &test_config(5, 5, Duration::from_secs(30)),
        );

        // Fill the queue up to the size trigger and wait for the worker to
        // drain it and park inside the exporter
        release.store(false, Ordering::SeqCst);
        for _ in 0..5 {
            processor.on_end(empty_span_data());
        }
        let wait_deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !entered.load(Ordering::SeqCst) {
            assert!(std::time::Instant::now() < wait_deadline, "worker never drained");
            std::thread::sleep(Duration::from_millis(1));
        }

        // Refill the queue behind the parked worker, then overflow it
        for _ in 0..5 {
            processor.on_end(empty_span_data());
        }
        processor.on_end(empty_span_data());
        processor.on_end(empty_span_data());

        assert_eq!(processor.dropped_spans(), 2);
        let logs = crate::core::log::test_logger::take_test_logs().unwrap();
        let drop_warnings = logs
            .iter()
            .filter(|(_, msg)| msg.contains("dropped a span"))
            .count();
        assert_eq!(drop_warnings, 1);

        release.store(true, Ordering::SeqCst);
    }
}
