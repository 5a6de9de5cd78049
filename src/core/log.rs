// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Internal logger for the SDK.
//!
//! A tracing library cannot route its own diagnostics through the tracing
//! pipeline it implements, so logging is a self-contained macro layer with a
//! process-wide level filter.

use std::{
    fmt::{self, Display},
    mem,
    str::FromStr,
    sync::atomic::{AtomicUsize, Ordering},
};

static MAX_LOG_LEVEL: AtomicUsize = AtomicUsize::new(LevelFilter::Error as usize);

pub(crate) fn set_max_level(lvl: LevelFilter) {
    MAX_LOG_LEVEL.store(lvl as usize, Ordering::Relaxed)
}

pub fn max_level() -> LevelFilter {
    unsafe { mem::transmute(MAX_LOG_LEVEL.load(Ordering::Relaxed)) }
}

#[repr(usize)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd)]
#[non_exhaustive]
/// The level at which the library will log
pub enum LevelFilter {
    Off,
    #[default]
    Error,
    Warn,
    Info,
    Debug,
}

impl FromStr for LevelFilter {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("debug") {
            Ok(LevelFilter::Debug)
        } else if s.eq_ignore_ascii_case("info") {
            Ok(LevelFilter::Info)
        } else if s.eq_ignore_ascii_case("warn") {
            Ok(LevelFilter::Warn)
        } else if s.eq_ignore_ascii_case("error") {
            Ok(LevelFilter::Error)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(LevelFilter::Off)
        } else {
            Err("log level filter should be one of DEBUG, INFO, WARN, ERROR, OFF")
        }
    }
}

impl Display for LevelFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let filter = match self {
            LevelFilter::Debug => "DEBUG",
            LevelFilter::Info => "INFO",
            LevelFilter::Warn => "WARN",
            LevelFilter::Error => "ERROR",
            LevelFilter::Off => "OFF",
        };

        write!(f, "{filter}")
    }
}

#[repr(usize)]
#[derive(Clone, Copy, Debug, Hash, PartialEq)]
pub enum Level {
    Error = 1, // this value must match with LevelFilter::Error
    Warn,
    Info,
    Debug,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };

        write!(f, "{level}")
    }
}

impl PartialEq<LevelFilter> for Level {
    #[inline]
    fn eq(&self, other: &LevelFilter) -> bool {
        (*self as usize) == (*other as usize)
    }
}

impl PartialOrd<LevelFilter> for Level {
    #[inline]
    fn partial_cmp(&self, other: &LevelFilter) -> Option<std::cmp::Ordering> {
        Some((*self as usize).cmp(&(*other as usize)))
    }
}

pub fn print_log(lvl: Level, log: fmt::Arguments, file: &str, line: u32) {
    if lvl == LevelFilter::Error {
        eprintln!("\x1b[91m{lvl}\x1b[0m {file}:{line} - {log}");
    } else {
        println!("\x1b[93m{lvl}\x1b[0m {file}:{line} - {log}");
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod test_logger {
    //! Implements a thread local, overridable logger
    //!
    //! Tests can locally intercept logs by calling `activate_test_logger`
    //!
    //! ```no_run
    //! let _log_guard = tracepipe::core::log::test_logger::activate_test_logger();
    //! // whatever is logged by the tp_(level)! macros will be stored
    //! tracepipe::tp_debug!("my log");
    //! let logs = tracepipe::core::log::test_logger::take_test_logs().unwrap();
    //! // logs should contain (Debug, "my log")
    //! ```
    //!
    //! To see logs in threads spawned from the test, wrap the spawned function
    //! with `with_local_logger`.
    use std::{cell::RefCell, sync::Arc};

    #[derive(Default)]
    struct TestLogger(std::sync::Mutex<Vec<(crate::core::log::Level, String)>>);

    pub fn print_log(lvl: crate::core::log::Level, log: std::fmt::Arguments) {
        let _ = LOCAL_LOGGER.try_with(|l| {
            if let Some(l) = &*l.borrow() {
                l.0.lock().unwrap().push((lvl, log.to_string()))
            }
        });
    }

    thread_local! {
        static LOCAL_LOGGER: RefCell<Option<Arc<TestLogger>>> = const { RefCell::new(None) };
    }

    pub fn with_local_logger<F: FnOnce() -> R, R>(f: F) -> impl FnOnce() -> R {
        let logger = LOCAL_LOGGER.try_with(|l| l.borrow().clone()).ok().flatten();
        move || {
            let _guard = LoggerGuard {
                prev: LOCAL_LOGGER.replace(logger),
            };
            f()
        }
    }

    pub struct LoggerGuard {
        prev: Option<Arc<TestLogger>>,
    }

    impl Drop for LoggerGuard {
        fn drop(&mut self) {
            LOCAL_LOGGER.set(self.prev.take());
        }
    }

    pub fn activate_test_logger() -> LoggerGuard {
        let prev = LOCAL_LOGGER.replace(Some(Arc::new(TestLogger::default())));
        LoggerGuard { prev }
    }

    pub fn take_test_logs() -> Option<Vec<(crate::core::log::Level, String)>> {
        use std::ops::DerefMut;

        LOCAL_LOGGER
            .try_with(|l| {
                l.borrow()
                    .as_deref()
                    .map(|l| std::mem::take(l.0.lock().unwrap().deref_mut()))
            })
            .ok()
            .flatten()
    }
}

#[macro_export]
macro_rules! tp_debug {
    // tp_debug!("a {} event", "log")
    ($($arg:tt)+) => {
      $crate::tp_log!($crate::core::log::Level::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! tp_info {
  // tp_info!("a {} event", "log")
  ($($arg:tt)+) => {
    $crate::tp_log!($crate::core::log::Level::Info, $($arg)*)
  };
}

#[macro_export]
macro_rules! tp_warn {
  // tp_warn!("a {} event", "log")
  ($($arg:tt)+) => {
    $crate::tp_log!($crate::core::log::Level::Warn, $($arg)*)
  };
}

#[macro_export]
macro_rules! tp_error {
  // tp_error!("a {} event", "log")
  ($($arg:tt)+) => {
    $crate::tp_log!($crate::core::log::Level::Error, $($arg)*)
  };
}

#[macro_export]
macro_rules! tp_log {
    ($lvl:expr, $first:expr, $($rest:tt)*) => {{
      let lvl = $lvl;
      if lvl <= $crate::core::log::max_level() {
        let loc = std::panic::Location::caller();
        $crate::core::log::print_log(lvl, format_args!($first, $($rest)*), loc.file(), loc.line());
      }
      #[cfg(any(test, feature = "test-utils"))]
      {
        $crate::core::log::test_logger::print_log(lvl, format_args!($first, $($rest)*))
      }
    }};

    ($lvl:expr, $first:expr) => {
      $crate::tp_log!($lvl, $first,)
    };
}
