//! # Kernel Log
//!
//! This crate implements the kernel log ring, the place `printk` output goes.
//!
//! ## Philosophy
//!
//! Logging is explicit and structured, not text-based or printf-style.
//! Entries carry a severity, an optional source module, a message and a list
//! of key/value fields. The ring is bounded: once full, the oldest entry is
//! dropped.
//!
//! Every recorded entry is also forwarded to the [`log`] facade under the
//! `klog` target, so a host process can route kernel messages through its
//! own logger.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Default number of entries kept by [`KernelLog::new`]
pub const DEFAULT_CAPACITY: usize = 1024;

/// Log level, ordered from least to most severe
///
/// These are the printk levels (`KERN_DEBUG` through `KERN_EMERG`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Err,
    Crit,
    Alert,
    Emerg,
}

impl LogLevel {
    /// The printk priority digit (`0` is `KERN_EMERG`, `7` is `KERN_DEBUG`)
    pub fn priority(&self) -> u8 {
        match self {
            LogLevel::Emerg => 0,
            LogLevel::Alert => 1,
            LogLevel::Crit => 2,
            LogLevel::Err => 3,
            LogLevel::Warning => 4,
            LogLevel::Notice => 5,
            LogLevel::Info => 6,
            LogLevel::Debug => 7,
        }
    }

    /// The closest `log` crate level
    pub fn as_log_level(&self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info | LogLevel::Notice => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Err | LogLevel::Crit | LogLevel::Alert | LogLevel::Emerg => {
                log::Level::Error
            }
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warning => "warn",
            LogLevel::Err => "err",
            LogLevel::Crit => "crit",
            LogLevel::Alert => "alert",
            LogLevel::Emerg => "emerg",
        };
        f.write_str(name)
    }
}

/// A structured log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Position in the ring's history, assigned when recorded
    pub sequence: u64,
    /// Source module (if known)
    pub source: Option<String>,
    /// Log message
    pub message: String,
    /// Structured fields
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Creates a new log entry
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            sequence: 0,
            source: None,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn alert(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Alert, message)
    }

    /// Sets the source module
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds a field to the log entry
    pub fn with_field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// Looks up a field by key
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>[{:>6}] ", self.level.priority(), self.sequence)?;
        if let Some(source) = &self.source {
            write!(f, "{}: ", source)?;
        }
        f.write_str(&self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Bounded ring of log entries
#[derive(Debug, Clone)]
pub struct KernelLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_sequence: u64,
    dropped: u64,
}

impl KernelLog {
    /// Creates a ring holding [`DEFAULT_CAPACITY`] entries
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a ring holding at most `capacity` entries (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
            dropped: 0,
        }
    }

    /// Records an entry, stamping its sequence number
    pub fn record(&mut self, mut entry: LogEntry) {
        entry.sequence = self.next_sequence;
        self.next_sequence += 1;

        log::log!(target: "klog", entry.level.as_log_level(), "{}", entry);

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(entry);
    }

    /// Returns all retained entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries pushed out of the ring since creation
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Returns the most recent entry
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Checks if an entry matching the predicate exists
    pub fn has_entry<F>(&self, predicate: F) -> bool
    where
        F: Fn(&LogEntry) -> bool,
    {
        self.entries.iter().any(predicate)
    }

    /// Checks if any entry's message contains `needle`
    pub fn contains_message(&self, needle: &str) -> bool {
        self.has_entry(|e| e.message.contains(needle))
    }

    /// Removes and returns all retained entries (`dmesg -c`)
    pub fn drain(&mut self) -> Vec<LogEntry> {
        self.entries.drain(..).collect()
    }
}

impl Default for KernelLog {
    fn default() -> Self {
        Self::new()
    }
}
