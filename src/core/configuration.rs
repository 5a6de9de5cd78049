// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::{ops::Deref, time::Duration};

use crate::core::log::LevelFilter;
use crate::core::sources::{CompositeConfigSourceResult, CompositeSource};

/// Default maximum number of ended spans buffered by the batch pipeline
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 2048;
/// Default number of buffered spans that triggers a flush
pub const DEFAULT_MAX_EXPORT_BATCH_SIZE: usize = 512;
/// Default interval after which buffered spans are flushed regardless of count
pub const DEFAULT_SCHEDULED_DELAY: Duration = Duration::from_secs(5);
/// Default bound on a single export call
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
#[non_exhaustive]
/// Configuration for the tracer and its export pipeline
///
/// # Usage
/// ```
/// use tracepipe::Config;
///
/// // This pulls configuration from the environment
/// let mut builder = Config::builder();
///
/// // Manual overrides
/// builder
///     .set_service("my-service".to_string())
///     .set_max_queue_size(4096);
///
/// // Finalize the configuration
/// let config = builder.build();
/// ```
pub struct Config {
    // # Service tagging
    service: String,

    /// Disables the library if this is false
    enabled: bool,
    /// The log level for the tracer
    log_level: LevelFilter,

    // # Batch pipeline tuning
    /// Maximum number of ended spans buffered before new spans are dropped
    max_queue_size: usize,
    /// Number of buffered spans that triggers an early flush
    max_export_batch_size: usize,
    /// Maximum time between two flushes
    scheduled_delay: Duration,
    /// Bound on a single exporter call
    export_timeout: Duration,
}

impl Config {
    fn from_sources(sources: &CompositeSource) -> Self {
        let default = Config::default();

        /// Helper function to convert a CompositeConfigSourceResult<T> into an
        /// Option<T>. This drops the origin associated with the configuration
        /// and the errors collected while parsing the value.
        fn to_val<T>(res: CompositeConfigSourceResult<T>) -> Option<T> {
            res.value.map(|c| c.value)
        }

        Self {
            service: to_val(sources.get("TRACEPIPE_SERVICE")).unwrap_or(default.service),
            enabled: to_val(sources.get_parse("TRACEPIPE_TRACE_ENABLED")).unwrap_or(default.enabled),
            log_level: to_val(sources.get_parse("TRACEPIPE_LOG_LEVEL")).unwrap_or(default.log_level),
            max_queue_size: to_val(sources.get_parse("TRACEPIPE_MAX_QUEUE_SIZE"))
                .unwrap_or(default.max_queue_size),
            max_export_batch_size: to_val(sources.get_parse("TRACEPIPE_MAX_EXPORT_BATCH_SIZE"))
                .unwrap_or(default.max_export_batch_size),
            scheduled_delay: to_val(sources.get_parse("TRACEPIPE_SCHEDULE_DELAY_MS"))
                .map(Duration::from_millis)
                .unwrap_or(default.scheduled_delay),
            export_timeout: to_val(sources.get_parse("TRACEPIPE_EXPORT_TIMEOUT_MS"))
                .map(Duration::from_millis)
                .unwrap_or(default.export_timeout),
        }
    }

    pub(crate) fn builder_with_sources(sources: &CompositeSource) -> ConfigBuilder {
        ConfigBuilder {
            config: Config::from_sources(sources),
        }
    }

    /// Creates a new builder to override detected configuration
    pub fn builder() -> ConfigBuilder {
        Self::builder_with_sources(&CompositeSource::default_sources())
    }

    pub fn service(&self) -> &str {
        self.service.deref()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    pub fn max_export_batch_size(&self) -> usize {
        self.max_export_batch_size
    }

    pub fn scheduled_delay(&self) -> Duration {
        self.scheduled_delay
    }

    pub fn export_timeout(&self) -> Duration {
        self.export_timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            service: "unnamed-rust-service".to_string(),
            enabled: true,
            log_level: LevelFilter::default(),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            max_export_batch_size: DEFAULT_MAX_EXPORT_BATCH_SIZE,
            scheduled_delay: DEFAULT_SCHEDULED_DELAY,
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
        }
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Finalizes the builder and returns the configuration
    ///
    /// The export batch size is clamped to the queue size, a batch can never
    /// be larger than the buffer it drains.
    pub fn build(self) -> Config {
        let mut config = self.config;
        config.max_export_batch_size = config.max_export_batch_size.min(config.max_queue_size);
        config
    }

    pub fn set_service(&mut self, service: String) -> &mut Self {
        self.config.service = service;
        self
    }

    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        self.config.enabled = enabled;
        self
    }

    pub fn set_log_level_filter(&mut self, log_level: LevelFilter) -> &mut Self {
        self.config.log_level = log_level;
        self
    }

    pub fn set_max_queue_size(&mut self, max_queue_size: usize) -> &mut Self {
        self.config.max_queue_size = max_queue_size;
        self
    }

    pub fn set_max_export_batch_size(&mut self, max_export_batch_size: usize) -> &mut Self {
        self.config.max_export_batch_size = max_export_batch_size;
        self
    }

    pub fn set_scheduled_delay(&mut self, scheduled_delay: Duration) -> &mut Self {
        self.config.scheduled_delay = scheduled_delay;
        self
    }

    pub fn set_export_timeout(&mut self, export_timeout: Duration) -> &mut Self {
        self.config.export_timeout = export_timeout;
        self
    }
}
