//! Run-scoped diagnostics.
//!
//! A [`Diagnostics`] handle is created once per command invocation and passed
//! to every component that reports progress. It fans each [`LogEntry`] out to
//! any number of sinks, each with its own minimum level, so a verbose console
//! and a warnings-only log file can be active at the same time.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Default log file, appended to by every run.
pub const DEFAULT_LOG_FILE: &str = "check.log";

/// Log level, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth for console output
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Destination for log entries.
pub trait LogSink: Send {
    fn write(&mut self, entry: &LogEntry);
}

/// Human-oriented output on stderr.
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write(&mut self, entry: &LogEntry) {
        let prefix = match entry.level {
            LogLevel::Debug => "  ·",
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(entry.indent as usize);
        eprintln!("{}{} {}", indent, prefix, entry.message);
    }
}

/// Timestamped lines appended to a file.
pub struct FileSink {
    file: File,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl LogSink for FileSink {
    fn write(&mut self, entry: &LogEntry) {
        let stamp = Local::now().format("%d-%b-%y %H:%M:%S");
        // A failing log file must not abort the run.
        let _ = writeln!(self.file, "{}:{}:{}", stamp, entry.level, entry.message);
    }
}

/// Keeps entries in memory; clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write(&mut self, entry: &LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
    }
}

struct Route {
    min_level: LogLevel,
    sink: Box<dyn LogSink>,
}

/// Fan-out logger handed to each component for the duration of a run.
pub struct Diagnostics {
    routes: Mutex<Vec<Route>>,
}

impl Diagnostics {
    /// A logger with no sinks; every entry is dropped.
    pub fn silent() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
        }
    }

    /// Verbose console plus a warnings-and-above log file.
    pub fn standard(log_file: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::silent()
            .with_sink(LogLevel::Debug, ConsoleSink)
            .with_sink(LogLevel::Warning, FileSink::open(log_file)?))
    }

    pub fn with_sink(self, min_level: LogLevel, sink: impl LogSink + 'static) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(Route {
                min_level,
                sink: Box::new(sink),
            });
        }
        self
    }

    pub fn log(&self, entry: LogEntry) {
        if let Ok(mut routes) = self.routes.lock() {
            for route in routes.iter_mut().filter(|r| entry.level >= r.min_level) {
                route.sink.write(&entry);
            }
        }
    }

    pub fn debug(&self, msg: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Debug, msg));
    }

    pub fn info(&self, msg: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, msg));
    }

    pub fn success(&self, msg: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Success, msg));
    }

    pub fn warning(&self, msg: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warning, msg));
    }

    pub fn error(&self, msg: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, msg));
    }

    pub fn info_indent(&self, msg: impl Into<String>, indent: u8) {
        self.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
    }

    pub fn error_indent(&self, msg: impl Into<String>, indent: u8) {
        self.log(LogEntry::new(LogLevel::Error, msg).with_indent(indent));
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::silent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sinks_filter_by_level() {
        let verbose = MemorySink::new();
        let warnings = MemorySink::new();
        let diag = Diagnostics::silent()
            .with_sink(LogLevel::Debug, verbose.clone())
            .with_sink(LogLevel::Warning, warnings.clone());

        diag.debug("row 1");
        diag.info("reading");
        diag.warning("odd");
        diag.error("broken");

        assert_eq!(verbose.entries().len(), 4);
        let levels: Vec<_> = warnings.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Warning, LogLevel::Error]);
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.log");

        let diag = Diagnostics::silent().with_sink(LogLevel::Info, FileSink::open(&path).unwrap());
        diag.error("Expected header 'address', found 'addr'");
        drop(diag);
        let diag = Diagnostics::silent().with_sink(LogLevel::Info, FileSink::open(&path).unwrap());
        diag.info("second run");
        drop(diag);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(":ERROR:Expected header 'address', found 'addr'"));
        assert!(lines[1].ends_with(":INFO:second run"));
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warning < LogLevel::Error);
    }
}
