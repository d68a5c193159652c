//! Line-oriented log sinks for tool output.
//!
//! The generator streams every line CMake prints through a [`BuildLogger`]
//! owned by the caller.

use std::sync::{Mutex, PoisonError};

/// Severity of a logged line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// Receives leveled lines of text.
pub trait BuildLogger: Send + Sync {
    fn info(&self, line: &str);
    fn error(&self, line: &str);
}

/// Forwards lines to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl BuildLogger for TracingLogger {
    fn info(&self, line: &str) {
        tracing::info!("{}", line);
    }

    fn error(&self, line: &str) {
        tracing::error!("{}", line);
    }
}

/// Keeps every line in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl CollectingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LogLevel, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, line.to_string()));
    }

    /// All lines logged so far.
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|(_, text)| text.contains(needle))
    }
}

impl BuildLogger for CollectingLogger {
    fn info(&self, line: &str) {
        self.push(LogLevel::Info, line);
    }

    fn error(&self, line: &str) {
        self.push(LogLevel::Error, line);
    }
}
