//! Explicit logging sink
//!
//! Programmers and the flash orchestrator do not write to a process-wide
//! logger implicitly. They receive a [`Logger`] at construction, which
//! carries the sink records go to, the target name stamped on every record
//! and the most verbose level that is forwarded.
//!
//! The default logger forwards to whatever the `log` facade has installed
//! (for the CLI that is `env_logger`) at `Info` level with target
//! `"flashkit"`.

use std::fmt;
use std::sync::{Arc, Mutex};

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Default target stamped on records
pub const DEFAULT_TARGET: &str = "flashkit";

#[derive(Clone)]
enum Sink {
    /// The logger installed in the `log` facade
    Global,
    /// A caller-supplied logger
    Custom(Arc<dyn Log>),
}

/// Logging configuration handed to programmers and the orchestrator
#[derive(Clone)]
pub struct Logger {
    sink: Sink,
    target: String,
    max_level: LevelFilter,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            sink: Sink::Global,
            target: DEFAULT_TARGET.to_string(),
            max_level: LevelFilter::Info,
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sink = match self.sink {
            Sink::Global => "global",
            Sink::Custom(_) => "custom",
        };
        f.debug_struct("Logger")
            .field("sink", &sink)
            .field("target", &self.target)
            .field("max_level", &self.max_level)
            .finish()
    }
}

impl Logger {
    /// Logger forwarding to a caller-supplied sink
    pub fn with_sink(sink: Arc<dyn Log>) -> Self {
        Self {
            sink: Sink::Custom(sink),
            ..Self::default()
        }
    }

    /// Set the most verbose level that is forwarded
    pub fn level(mut self, max_level: LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    /// Set the target stamped on records
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Most verbose level that is forwarded
    pub fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    /// Returns true if records at `level` are forwarded
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }

    /// Emit a record at the given level
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let record = Record::builder()
            .args(args)
            .level(level)
            .target(&self.target)
            .module_path_static(Some(module_path!()))
            .build();
        match &self.sink {
            Sink::Global => log::logger().log(&record),
            Sink::Custom(sink) => sink.log(&record),
        }
    }

    /// Emit an error record
    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args)
    }

    /// Emit a warning record
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args)
    }

    /// Emit an info record
    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args)
    }

    /// Emit a debug record
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args)
    }

    /// Emit a trace record
    pub fn trace(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Trace, args)
    }
}

/// A sink that keeps every record in memory
///
/// Useful in tests and for tools that want to show the log of a flashing
/// run after the fact.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured `(level, message)` pairs
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Returns true if any captured message at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }
}

impl Log for MemorySink {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}
