//! Injectable logger used for lifecycle messages.
//!
//! The core reports contained failures (a provider that could not be
//! constructed, an `init()` that failed) through a [`Logger`] instead of
//! writing to a global sink, so tests can capture them. The default
//! [`TracingLogger`] forwards everything to `tracing`.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Severity of a captured log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Log,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Log => write!(f, "log"),
            Level::Warn => write!(f, "warn"),
            Level::Error => write!(f, "error"),
        }
    }
}

/// The log/warn/error contract the core writes lifecycle messages to.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing`, tagging every event with the core's name.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    core: String,
}

impl TracingLogger {
    pub fn new(core: impl Into<String>) -> Self {
        Self { core: core.into() }
    }
}

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::info!(core = %self.core, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(core = %self.core, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(core = %self.core, "{message}");
    }
}

/// Keeps every line in memory.
///
/// Clones share the same buffer, so one clone can be handed to the core
/// while the other is inspected.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured lines, oldest first.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().clone()
    }

    /// Captured messages of one severity.
    pub fn at(&self, level: Level) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

impl Logger for RecordingLogger {
    fn log(&self, message: &str) {
        self.push(Level::Log, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}
