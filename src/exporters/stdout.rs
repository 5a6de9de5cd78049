// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Stdout reference exporter.
//!
//! Encodes each non-empty batch as one newline-terminated JSON array of span
//! stubs. The stopped flag sits behind a read/write lock: concurrent exports
//! take the cheap read path, the single shutdown writer serializes against
//! them, and once shutdown has completed every export is a no-op returning
//! `Ok` without a partial write.

use std::io::Write;
use std::sync::{Mutex, RwLock};
use std::time::SystemTime;

use serde::Serialize;

use crate::trace::{
    Deadline, Event, KeyValue, Link, SpanContext, SpanData, SpanExporter, TraceError, Value,
};

/// Builder for [`StdoutExporter`]
pub struct StdoutExporterBuilder {
    pretty_print: bool,
    timestamps: bool,
    writer: Option<Box<dyn Write + Send>>,
}

impl Default for StdoutExporterBuilder {
    fn default() -> Self {
        StdoutExporterBuilder {
            pretty_print: false,
            timestamps: true,
            writer: None,
        }
    }
}

impl StdoutExporterBuilder {
    /// Indent the JSON output with tabs instead of emitting a single line
    pub fn with_pretty_print(mut self) -> Self {
        self.pretty_print = true;
        self
    }

    /// Reset span start/end times and every event time to the zero instant
    /// before encoding, for deterministic output in tests and snapshots. The
    /// time fields stay in the schema.
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Redirect output away from stdout
    pub fn with_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn build(self) -> StdoutExporter {
        StdoutExporter {
            pretty_print: self.pretty_print,
            timestamps: self.timestamps,
            writer: Mutex::new(self.writer.unwrap_or_else(|| Box::new(std::io::stdout()))),
            stopped: RwLock::new(false),
        }
    }
}

/// Exporter that writes spans in JSON format to stdout
pub struct StdoutExporter {
    pretty_print: bool,
    timestamps: bool,
    writer: Mutex<Box<dyn Write + Send>>,
    stopped: RwLock<bool>,
}

impl std::fmt::Debug for StdoutExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdoutExporter")
            .field("pretty_print", &self.pretty_print)
            .field("timestamps", &self.timestamps)
            .finish()
    }
}

impl StdoutExporter {
    pub fn builder() -> StdoutExporterBuilder {
        StdoutExporterBuilder::default()
    }

    /// marshal the stubs with the configured indentation
    fn marshal(&self, stubs: &[SpanStub]) -> Result<Vec<u8>, TraceError> {
        if self.pretty_print {
            let mut out = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
            let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
            stubs
                .serialize(&mut serializer)
                .map_err(crate::core::Error::from)?;
            Ok(out)
        } else {
            serde_json::to_vec(stubs).map_err(|e| crate::core::Error::from(e).into())
        }
    }
}

impl SpanExporter for StdoutExporter {
    fn export_spans(&self, _deadline: Deadline, spans: Vec<SpanData>) -> Result<(), TraceError> {
        let stopped = *self
            .stopped
            .read()
            .map_err(|_| TraceError::Export("stopped flag lock poisoned".to_string()))?;
        if stopped {
            return Ok(());
        }

        if spans.is_empty() {
            return Ok(());
        }

        let mut stubs: Vec<SpanStub> = spans.iter().map(SpanStub::from).collect();
        if !self.timestamps {
            for stub in &mut stubs {
                stub.start_time = 0;
                stub.end_time = 0;
                for event in &mut stub.events {
                    event.time = 0;
                }
            }
        }

        let out = self.marshal(&stubs)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| TraceError::Export("writer lock poisoned".to_string()))?;
        writer
            .write_all(&out)
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush())
            .map_err(|e| crate::core::Error::from(e).into())
    }

    fn shutdown(&self, deadline: Deadline) -> Result<(), TraceError> {
        {
            let mut stopped = self
                .stopped
                .write()
                .map_err(|_| TraceError::Export("stopped flag lock poisoned".to_string()))?;
            *stopped = true;
        }

        // There is no teardown of our own, but a caller with an expired
        // deadline still sees its cancellation
        deadline.check()
    }
}

fn unix_nanos(time: SystemTime) -> u128 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(v) => serde_json::Value::from(*v),
        Value::I64(v) => serde_json::Value::from(*v),
        Value::F64(v) => serde_json::Value::from(*v),
        Value::String(v) => serde_json::Value::from(v.as_ref()),
    }
}

/// Serializable snapshot of one span
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SpanStub {
    name: String,
    span_context: SpanContextStub,
    parent_span_id: String,
    span_kind: &'static str,
    start_time: u128,
    end_time: u128,
    attributes: Vec<KeyValueStub>,
    events: Vec<EventStub>,
    links: Vec<LinkStub>,
    status: StatusStub,
    instrumentation_scope: ScopeStub,
}

impl From<&SpanData> for SpanStub {
    fn from(span: &SpanData) -> Self {
        SpanStub {
            name: span.name.to_string(),
            span_context: SpanContextStub::from(&span.span_context),
            parent_span_id: format!("{:x}", span.parent_span_id),
            span_kind: span.span_kind.as_str(),
            start_time: unix_nanos(span.start_time),
            end_time: unix_nanos(span.end_time),
            attributes: span.attributes.iter().map(KeyValueStub::from).collect(),
            events: span.events.iter().map(EventStub::from).collect(),
            links: span.links.iter().map(LinkStub::from).collect(),
            status: StatusStub::from(&span.status),
            instrumentation_scope: ScopeStub {
                name: span.instrumentation_scope.name.to_string(),
                version: span.instrumentation_scope.version.clone(),
                schema_url: span.instrumentation_scope.schema_url.clone(),
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SpanContextStub {
    trace_id: String,
    span_id: String,
    trace_flags: u8,
}

impl From<&SpanContext> for SpanContextStub {
    fn from(ctx: &SpanContext) -> Self {
        SpanContextStub {
            trace_id: format!("{:x}", ctx.trace_id()),
            span_id: format!("{:x}", ctx.span_id()),
            trace_flags: ctx.trace_flags().to_u8(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct KeyValueStub {
    key: String,
    value: serde_json::Value,
}

impl From<&KeyValue> for KeyValueStub {
    fn from(kv: &KeyValue) -> Self {
        KeyValueStub {
            key: kv.key.to_string(),
            value: json_value(&kv.value),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct EventStub {
    name: String,
    time: u128,
    attributes: Vec<KeyValueStub>,
}

impl From<&Event> for EventStub {
    fn from(event: &Event) -> Self {
        EventStub {
            name: event.name.to_string(),
            time: unix_nanos(event.timestamp),
            attributes: event.attributes.iter().map(KeyValueStub::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LinkStub {
    span_context: SpanContextStub,
    attributes: Vec<KeyValueStub>,
}

impl From<&Link> for LinkStub {
    fn from(link: &Link) -> Self {
        LinkStub {
            span_context: SpanContextStub::from(&link.span_context),
            attributes: link.attributes.iter().map(KeyValueStub::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StatusStub {
    code: &'static str,
    description: String,
}

impl From<&crate::trace::Status> for StatusStub {
    fn from(status: &crate::trace::Status) -> Self {
        use crate::trace::Status;
        match status {
            Status::Unset => StatusStub {
                code: "Unset",
                description: String::new(),
            },
            Status::Ok => StatusStub {
                code: "Ok",
                description: String::new(),
            },
            Status::Error { description } => StatusStub {
                code: "Error",
                description: description.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ScopeStub {
    name: String,
    version: Option<String>,
    schema_url: Option<String>,
}
