// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::SystemTime;

use crate::trace::attribute::KeyValue;
use crate::trace::span::{Link, SpanKind};

/// Snapshot of the options applied when starting or ending a span.
///
/// Built by folding options over a zero value strictly in argument order:
/// attribute and link options append, scalar options overwrite with
/// last-write-wins, `new_root` stays true once set. Option values are not
/// validated, a zero timestamp is accepted verbatim.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SpanConfig {
    pub(crate) attributes: Vec<KeyValue>,
    pub(crate) timestamp: Option<SystemTime>,
    pub(crate) links: Vec<Link>,
    pub(crate) new_root: bool,
    pub(crate) span_kind: SpanKind,
    pub(crate) stack_trace: bool,
}

impl SpanConfig {
    /// Applies start options to a zero-valued config, in argument order
    pub fn from_start_options(options: impl IntoIterator<Item = SpanStartOption>) -> Self {
        let mut config = SpanConfig::default();
        for option in options {
            option.apply(&mut config);
        }
        config
    }

    /// Applies end options to a zero-valued config, in argument order
    pub fn from_end_options(options: impl IntoIterator<Item = SpanEndOption>) -> Self {
        let mut config = SpanConfig::default();
        for option in options {
            option.apply(&mut config);
        }
        config
    }

    pub fn attributes(&self) -> &[KeyValue] {
        &self.attributes
    }

    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn new_root(&self) -> bool {
        self.new_root
    }

    pub fn span_kind(&self) -> SpanKind {
        self.span_kind
    }

    pub fn stack_trace(&self) -> bool {
        self.stack_trace
    }
}

/// An option applied when a span is started
#[derive(Debug, Clone)]
pub enum SpanStartOption {
    Attributes(Vec<KeyValue>),
    Timestamp(SystemTime),
    Links(Vec<Link>),
    NewRoot,
    SpanKind(SpanKind),
}

impl SpanStartOption {
    pub fn attributes(attributes: impl IntoIterator<Item = KeyValue>) -> Self {
        SpanStartOption::Attributes(attributes.into_iter().collect())
    }

    pub fn timestamp(timestamp: SystemTime) -> Self {
        SpanStartOption::Timestamp(timestamp)
    }

    pub fn links(links: impl IntoIterator<Item = Link>) -> Self {
        SpanStartOption::Links(links.into_iter().collect())
    }

    pub fn new_root() -> Self {
        SpanStartOption::NewRoot
    }

    pub fn span_kind(kind: SpanKind) -> Self {
        SpanStartOption::SpanKind(kind)
    }

    fn apply(self, config: &mut SpanConfig) {
        match self {
            SpanStartOption::Attributes(attributes) => config.attributes.extend(attributes),
            SpanStartOption::Timestamp(timestamp) => config.timestamp = Some(timestamp),
            SpanStartOption::Links(links) => config.links.extend(links),
            SpanStartOption::NewRoot => config.new_root = true,
            SpanStartOption::SpanKind(kind) => config.span_kind = kind,
        }
    }
}

/// An option applied when a span is ended
#[derive(Debug, Clone)]
pub enum SpanEndOption {
    Timestamp(SystemTime),
    StackTrace(bool),
}

impl SpanEndOption {
    pub fn timestamp(timestamp: SystemTime) -> Self {
        SpanEndOption::Timestamp(timestamp)
    }

    pub fn stack_trace(record: bool) -> Self {
        SpanEndOption::StackTrace(record)
    }

    fn apply(self, config: &mut SpanConfig) {
        match self {
            SpanEndOption::Timestamp(timestamp) => config.timestamp = Some(timestamp),
            SpanEndOption::StackTrace(record) => config.stack_trace = record,
        }
    }
}

/// Snapshot of the options applied when requesting a tracer
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TracerConfig {
    pub(crate) instrumentation_version: Option<String>,
    pub(crate) schema_url: Option<String>,
}

impl TracerConfig {
    /// Applies tracer options to a zero-valued config, in argument order
    pub fn from_options(options: impl IntoIterator<Item = TracerOption>) -> Self {
        let mut config = TracerConfig::default();
        for option in options {
            option.apply(&mut config);
        }
        config
    }

    pub fn instrumentation_version(&self) -> Option<&str> {
        self.instrumentation_version.as_deref()
    }

    pub fn schema_url(&self) -> Option<&str> {
        self.schema_url.as_deref()
    }
}

/// An option applied when requesting a tracer
#[derive(Debug, Clone)]
pub enum TracerOption {
    InstrumentationVersion(String),
    SchemaUrl(String),
}

impl TracerOption {
    pub fn instrumentation_version(version: impl Into<String>) -> Self {
        TracerOption::InstrumentationVersion(version.into())
    }

    pub fn schema_url(url: impl Into<String>) -> Self {
        TracerOption::SchemaUrl(url.into())
    }

    fn apply(self, config: &mut TracerConfig) {
        match self {
            TracerOption::InstrumentationVersion(version) => {
                config.instrumentation_version = Some(version)
            }
            TracerOption::SchemaUrl(url) => config.schema_url = Some(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::{SpanConfig, SpanEndOption, SpanStartOption, TracerConfig, TracerOption};
    use crate::trace::attribute::KeyValue;
    use crate::trace::id::{SpanContext, SpanId, TraceFlags, TraceId};
    use crate::trace::span::{Link, SpanKind};

    fn link_context() -> SpanContext {
        SpanContext::new(
            TraceId::from_bytes([1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            SpanId::from_bytes([3, 0, 0, 0, 0, 0, 0, 0]),
            TraceFlags::new(0),
        )
    }

    #[test]
    fn test_new_span_config() {
        let k1v1 = || KeyValue::new("key1", "value1");
        let k1v2 = || KeyValue::new("key1", "value2");
        let k2v2 = || KeyValue::new("key2", "value2");

        let timestamp0 = SystemTime::UNIX_EPOCH;
        let timestamp1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1);

        let link1 = || Link::new(link_context(), vec![k1v1()]);
        let link2 = || Link::new(link_context(), vec![k1v2(), k2v2()]);

        let tests: Vec<(Vec<SpanStartOption>, SpanConfig)> = vec![
            // No non-zero-values should be set.
            (vec![], SpanConfig::default()),
            (
                vec![SpanStartOption::attributes([k1v1()])],
                SpanConfig {
                    attributes: vec![k1v1()],
                    ..Default::default()
                },
            ),
            // Multiple calls should append not overwrite.
            (
                vec![
                    SpanStartOption::attributes([k1v1()]),
                    SpanStartOption::attributes([k1v2()]),
                    SpanStartOption::attributes([k2v2()]),
                ],
                SpanConfig {
                    // No uniqueness is guaranteed by the API.
                    attributes: vec![k1v1(), k1v2(), k2v2()],
                    ..Default::default()
                },
            ),
            (
                vec![SpanStartOption::attributes([k1v1(), k1v2(), k2v2()])],
                SpanConfig {
                    // No uniqueness is guaranteed by the API.
                    attributes: vec![k1v1(), k1v2(), k2v2()],
                    ..Default::default()
                },
            ),
            (
                vec![SpanStartOption::timestamp(timestamp0)],
                SpanConfig {
                    timestamp: Some(timestamp0),
                    ..Default::default()
                },
            ),
            // Multiple calls overwrite with last-one-wins.
            (
                vec![
                    SpanStartOption::timestamp(timestamp0),
                    SpanStartOption::timestamp(timestamp1),
                ],
                SpanConfig {
                    timestamp: Some(timestamp1),
                    ..Default::default()
                },
            ),
            (
                vec![SpanStartOption::links([link1()])],
                SpanConfig {
                    links: vec![link1()],
                    ..Default::default()
                },
            ),
            // Multiple calls should append not overwrite.
            (
                vec![
                    SpanStartOption::links([link1()]),
                    SpanStartOption::links([link1(), link2()]),
                ],
                SpanConfig {
                    // No uniqueness is guaranteed by the API.
                    links: vec![link1(), link1(), link2()],
                    ..Default::default()
                },
            ),
            (
                vec![SpanStartOption::new_root()],
                SpanConfig {
                    new_root: true,
                    ..Default::default()
                },
            ),
            // Multiple calls should not change the new root state.
            (
                vec![SpanStartOption::new_root(), SpanStartOption::new_root()],
                SpanConfig {
                    new_root: true,
                    ..Default::default()
                },
            ),
            (
                vec![SpanStartOption::span_kind(SpanKind::Consumer)],
                SpanConfig {
                    span_kind: SpanKind::Consumer,
                    ..Default::default()
                },
            ),
            // Multiple calls overwrite with last-one-wins.
            (
                vec![
                    SpanStartOption::span_kind(SpanKind::Client),
                    SpanStartOption::span_kind(SpanKind::Consumer),
                ],
                SpanConfig {
                    span_kind: SpanKind::Consumer,
                    ..Default::default()
                },
            ),
            // Everything should work together.
            (
                vec![
                    SpanStartOption::attributes([k1v1()]),
                    SpanStartOption::timestamp(timestamp0),
                    SpanStartOption::links([link1(), link2()]),
                    SpanStartOption::new_root(),
                    SpanStartOption::span_kind(SpanKind::Consumer),
                ],
                SpanConfig {
                    attributes: vec![k1v1()],
                    timestamp: Some(timestamp0),
                    links: vec![link1(), link2()],
                    new_root: true,
                    span_kind: SpanKind::Consumer,
                    stack_trace: false,
                },
            ),
        ];

        for (options, expected) in tests {
            assert_eq!(SpanConfig::from_start_options(options), expected);
        }
    }

    #[test]
    fn test_end_span_config() {
        let timestamp = SystemTime::UNIX_EPOCH;

        let tests: Vec<(Vec<SpanEndOption>, SpanConfig)> = vec![
            (vec![], SpanConfig::default()),
            (
                vec![SpanEndOption::stack_trace(true)],
                SpanConfig {
                    stack_trace: true,
                    ..Default::default()
                },
            ),
            (
                vec![SpanEndOption::timestamp(timestamp)],
                SpanConfig {
                    timestamp: Some(timestamp),
                    ..Default::default()
                },
            ),
        ];

        for (options, expected) in tests {
            assert_eq!(SpanConfig::from_end_options(options), expected);
        }
    }

    #[test]
    fn test_tracer_config() {
        let v1 = "semver:0.0.1";
        let v2 = "semver:1.0.0";
        let schema_url = "https://opentelemetry.io/schemas/1.2.0";

        let tests: Vec<(Vec<TracerOption>, TracerConfig)> = vec![
            // No non-zero-values should be set.
            (vec![], TracerConfig::default()),
            (
                vec![TracerOption::instrumentation_version(v1)],
                TracerConfig {
                    instrumentation_version: Some(v1.to_string()),
                    ..Default::default()
                },
            ),
            // Multiple calls should overwrite.
            (
                vec![
                    TracerOption::instrumentation_version(v1),
                    TracerOption::instrumentation_version(v2),
                ],
                TracerConfig {
                    instrumentation_version: Some(v2.to_string()),
                    ..Default::default()
                },
            ),
            (
                vec![TracerOption::schema_url(schema_url)],
                TracerConfig {
                    schema_url: Some(schema_url.to_string()),
                    ..Default::default()
                },
            ),
        ];

        for (options, expected) in tests {
            assert_eq!(TracerConfig::from_options(options), expected);
        }
    }
}
