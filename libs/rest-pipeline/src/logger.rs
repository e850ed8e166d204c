//! Logging contract consulted by pipeline policies.
//!
//! Policies never log through a [`Logger`] directly; they go through
//! [`PolicyOptions::log`](crate::PolicyOptions::log), which applies the
//! level gate. Ambient diagnostics inside the crate use `tracing`.

use std::fmt;

/// Log severity, ordered `Off < Error < Warning < Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    #[default]
    Off,
    Error,
    Warning,
    Info,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Off => "OFF",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
        };
        f.write_str(name)
    }
}

/// Sink for pipeline log messages. Must tolerate concurrent calls.
pub trait Logger: Send + Sync {
    /// Most verbose level this logger wants to receive.
    fn minimum_log_level(&self) -> LogLevel;

    fn log(&self, level: LogLevel, message: &str);
}

/// Whether a message at `level` passes a logger whose threshold is `minimum`.
#[must_use]
pub fn should_log(level: LogLevel, minimum: LogLevel) -> bool {
    level != LogLevel::Off && level <= minimum
}

/// Logger that forwards to `tracing` events under the `rest_pipeline` target.
#[derive(Debug, Clone, Copy)]
pub struct TracingLogger {
    minimum: LogLevel,
}

impl TracingLogger {
    #[must_use]
    pub fn new(minimum: LogLevel) -> Self {
        Self { minimum }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl Logger for TracingLogger {
    fn minimum_log_level(&self) -> LogLevel {
        self.minimum
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Off => {}
            LogLevel::Error => tracing::error!(target: "rest_pipeline", "{message}"),
            LogLevel::Warning => tracing::warn!(target: "rest_pipeline", "{message}"),
            LogLevel::Info => tracing::info!(target: "rest_pipeline", "{message}"),
        }
    }
}
