// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::fmt;

use rand::{Rng, SeedableRng};

/// 16 byte trace identifier, shared by every span of a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId([u8; 16]);

impl TraceId {
    pub const INVALID: TraceId = TraceId([0; 16]);

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        TraceId(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 != [0; 16]
    }
}

impl fmt::LowerHex for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

/// 8 byte span identifier, unique within a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId([u8; 8]);

impl SpanId {
    pub const INVALID: SpanId = SpanId([0; 8]);

    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        SpanId(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 8] {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 != [0; 8]
    }
}

impl fmt::LowerHex for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", u64::from_be_bytes(self.0))
    }
}

/// W3C style trace flags. Only the sampled bit is defined.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceFlags(u8);

impl TraceFlags {
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    pub const fn new(flags: u8) -> Self {
        TraceFlags(flags)
    }

    pub const fn to_u8(self) -> u8 {
        self.0
    }

    pub fn is_sampled(&self) -> bool {
        self.0 & Self::SAMPLED.0 != 0
    }
}

/// Identity of a span: trace ID, span ID and flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    trace_flags: TraceFlags,
}

impl SpanContext {
    pub const fn new(trace_id: TraceId, span_id: SpanId, trace_flags: TraceFlags) -> Self {
        SpanContext {
            trace_id,
            span_id,
            trace_flags,
        }
    }

    pub const fn empty_context() -> Self {
        SpanContext {
            trace_id: TraceId::INVALID,
            span_id: SpanId::INVALID,
            trace_flags: TraceFlags::new(0),
        }
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    pub fn trace_flags(&self) -> TraceFlags {
        self.trace_flags
    }

    /// Both the trace ID and the span ID are nonzero
    pub fn is_valid(&self) -> bool {
        self.trace_id.is_valid() && self.span_id.is_valid()
    }
}

/// Source of trace and span identifiers
pub trait IdGenerator: Send + Sync + std::fmt::Debug {
    fn new_trace_id(&self) -> TraceId;
    fn new_span_id(&self) -> SpanId;
}

thread_local! {
    static RNG: RefCell<rand::rngs::SmallRng> = RefCell::new(rand::rngs::SmallRng::from_entropy());
}

/// Default identifier source
#[derive(Debug, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        // The trace id follows the following format:
        // 32 bits timestamp | 32 bits of zeroes | 64 bits of random
        // The timestamp is the number of seconds since the UNIX epoch
        let lower_half = RNG.with(|rng| rng.borrow_mut().gen::<u64>());
        let timestamp = std::time::UNIX_EPOCH
            .elapsed()
            .map(|d| d.as_secs())
            .unwrap_or(1 << 31);
        let upper_half = timestamp << 32;
        let mut trace_id = [0_u8; 16];
        trace_id[..8].copy_from_slice(&upper_half.to_be_bytes());
        trace_id[8..].copy_from_slice(&lower_half.to_be_bytes());

        TraceId::from_bytes(trace_id)
    }

    fn new_span_id(&self) -> SpanId {
        let span_id = RNG.with(|rng| rng.borrow_mut().gen::<u64>()).to_be_bytes();
        SpanId::from_bytes(span_id)
    }
}
