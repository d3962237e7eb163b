//! Logging for lookups.
//!
//! Components never reach for a global logger directly; they hold an
//! `Arc<dyn OutputLog>` handed to them at construction. Binaries wire in
//! [`TracingLog`] after calling [`init`]; tests use [`MemoryLog`] to assert on
//! what was reported.

use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// The output channel a lookup reports through.
pub trait OutputLog: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Forwards to `tracing` under the `hooknav` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl OutputLog for TracingLog {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "hooknav", "{}", message),
            Level::Info => tracing::info!(target: "hooknav", "{}", message),
            Level::Warn => tracing::warn!(target: "hooknav", "{}", message),
            Level::Error => tracing::error!(target: "hooknav", "{}", message),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl OutputLog for NullLog {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemoryLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }
}

impl OutputLog for MemoryLog {
    fn log(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

/// Install the global `tracing` subscriber. Output goes to stderr so stdout
/// stays clean for JSON-RPC replies and machine-readable results.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // A second init (e.g. from tests) is not an error worth surfacing.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_log_records_levels() {
        let log = MemoryLog::new();
        log.info("starting lookup");
        log.warn("could not read a.ts");
        assert!(log.contains(Level::Warn, "a.ts"));
        assert!(!log.contains(Level::Error, "a.ts"));
        assert_eq!(log.lines().len(), 2);
    }

    #[test]
    fn trait_object_dispatch() {
        let log: Arc<dyn OutputLog> = MemoryLog::new();
        log.debug("x");
        NullLog.error("dropped");
    }
}
