//! Structured logging for burrow.
//!
//! Diagnostics from the parser (oversized header lines, rejected request
//! lines, dispatched requests) are emitted as structured [`LogEntry`]
//! values and routed to a process-wide [`LogSink`].
//!
//! # Usage
//!
//! ```
//! use burrow_core::{log_info, logging::LogLevel};
//!
//! let entry = log_info!("dispatch", method => "GET", path => "/index");
//! assert_eq!(entry.level, LogLevel::Info);
//! entry.connection(7).emit();
//! ```
//!
//! # JSON Output Schema
//!
//! ```json
//! {
//!     "timestamp_ns": 1705487445123456789,
//!     "level": "warn",
//!     "message": "header line too long",
//!     "connection_id": 7,
//!     "target": "burrow_http::accumulator",
//!     "fields": { "limit": "1024" }
//! }
//! ```
//!
//! # Configuration
//!
//! ```
//! use burrow_core::logging::{self, LogConfig, LogLevel};
//!
//! logging::init(LogConfig::new().level(LogLevel::Debug).json_output(false));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};

/// Log levels, least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Most verbose, for detailed debugging.
    Trace = 0,
    /// Debug information, not shown in production.
    Debug = 1,
    /// General information about normal operation.
    Info = 2,
    /// Something unexpected but recoverable.
    Warn = 3,
    /// An error that affected request processing.
    Error = 4,
}

impl LogLevel {
    /// Returns the level as a lowercase string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Returns a single character representation.
    #[must_use]
    pub const fn as_char(&self) -> char {
        match self {
            Self::Trace => 'T',
            Self::Debug => 'D',
            Self::Info => 'I',
            Self::Warn => 'W',
            Self::Error => 'E',
        }
    }

    const fn from_usize(value: usize) -> Self {
        match value {
            0 => Self::Trace,
            1 => Self::Debug,
            2 => Self::Info,
            3 => Self::Warn,
            _ => Self::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maximum structured fields kept on one entry.
const MAX_FIELDS: usize = 16;

/// A structured log entry.
///
/// Entries are built by the `log_*!` macros and sent with [`emit`](Self::emit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// The log level.
    pub level: LogLevel,
    /// The log message.
    pub message: String,
    /// Connection the entry relates to, if any.
    pub connection_id: Option<u64>,
    /// Module/target path (optional).
    pub target: Option<String>,
    /// Structured key-value fields (max 16).
    pub fields: Vec<(String, String)>,
    /// Nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
}

impl LogEntry {
    /// Creates a new log entry stamped with the current time.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        let timestamp_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
        Self {
            level,
            message: message.into(),
            connection_id: None,
            target: None,
            fields: Vec::new(),
            timestamp_ns,
        }
    }

    /// Sets the connection id.
    #[must_use]
    pub fn connection(mut self, id: u64) -> Self {
        self.connection_id = Some(id);
        self
    }

    /// Sets the target module path.
    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Adds a structured field.
    ///
    /// Fields beyond the max (16) are silently dropped.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        if self.fields.len() < MAX_FIELDS {
            self.fields.push((key.into(), value.to_string()));
        }
        self
    }

    /// Returns the value of a field, if present.
    #[must_use]
    pub fn field_value(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Formats the log entry as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        let mut obj = Map::new();
        obj.insert("timestamp_ns".into(), Value::from(self.timestamp_ns));
        obj.insert("level".into(), Value::from(self.level.as_str()));
        obj.insert("message".into(), Value::from(self.message.as_str()));
        if let Some(id) = self.connection_id {
            obj.insert("connection_id".into(), Value::from(id));
        }
        if let Some(ref target) = self.target {
            obj.insert("target".into(), Value::from(target.as_str()));
        }
        if !self.fields.is_empty() {
            let fields: Map<String, Value> = self
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect();
            obj.insert("fields".into(), Value::Object(fields));
        }
        Value::Object(obj).to_string()
    }

    /// Formats the log entry in compact format.
    #[must_use]
    pub fn to_compact(&self) -> String {
        let mut output = match self.connection_id {
            Some(id) => format!("[{}] conn={} {}", self.level.as_char(), id, self.message),
            None => format!("[{}] {}", self.level.as_char(), self.message),
        };

        if !self.fields.is_empty() {
            output.push_str(" {");
            for (i, (k, v)) in self.fields.iter().enumerate() {
                if i > 0 {
                    output.push_str(", ");
                }
                output.push_str(k);
                output.push('=');
                output.push_str(v);
            }
            output.push('}');
        }

        output
    }

    /// Sends the entry to the installed sink if its level is enabled.
    pub fn emit(self) {
        if !level_enabled(self.level) {
            return;
        }
        let (config, sink) = {
            let guard = LOGGER.read();
            match guard.as_ref() {
                Some(logger) => (logger.config.clone(), Arc::clone(&logger.sink)),
                None => (LogConfig::default(), Arc::new(StderrSink) as Arc<dyn LogSink>),
            }
        };
        if self.level < config.min_level {
            return;
        }
        let mut entry = self;
        if !config.include_target {
            entry.target = None;
        }
        entry.fields.truncate(config.max_fields);
        let rendered = if config.json_output {
            entry.to_json()
        } else {
            entry.to_compact()
        };
        sink.write(&entry, &rendered);
    }
}

/// Destination for emitted log entries.
pub trait LogSink: Send + Sync {
    /// Writes one entry. `rendered` is the entry formatted per [`LogConfig`].
    fn write(&self, entry: &LogEntry, rendered: &str);
}

/// Writes rendered entries to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write(&self, _entry: &LogEntry, rendered: &str) {
        eprintln!("{rendered}");
    }
}

/// Keeps every entry in memory. Intended for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every entry written so far.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Returns entries whose message equals `message`.
    #[must_use]
    pub fn with_message(&self, message: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.message == message)
            .cloned()
            .collect()
    }

    /// Drops every stored entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn write(&self, entry: &LogEntry, _rendered: &str) {
        self.entries.lock().push(entry.clone());
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to emit.
    pub min_level: LogLevel,
    /// Whether to output JSON (true) or compact format (false).
    pub json_output: bool,
    /// Whether to include the target module path.
    pub include_target: bool,
    /// Maximum number of structured fields per log entry.
    pub max_fields: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            json_output: true,
            include_target: true,
            max_fields: MAX_FIELDS,
        }
    }
}

impl LogConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum log level.
    #[must_use]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Sets whether to output JSON format.
    #[must_use]
    pub fn json_output(mut self, json: bool) -> Self {
        self.json_output = json;
        self
    }

    /// Sets whether to include the target module path.
    #[must_use]
    pub fn include_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }

    /// Sets the maximum structured fields per log.
    #[must_use]
    pub fn max_fields(mut self, max: usize) -> Self {
        self.max_fields = max.min(MAX_FIELDS);
        self
    }

    /// Returns a development configuration (verbose, compact output).
    #[must_use]
    pub fn development() -> Self {
        Self {
            min_level: LogLevel::Debug,
            json_output: false,
            include_target: true,
            max_fields: MAX_FIELDS,
        }
    }

    /// Returns a production configuration (info+, JSON output).
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Returns a testing configuration (trace level, JSON output).
    #[must_use]
    pub fn testing() -> Self {
        Self {
            min_level: LogLevel::Trace,
            ..Self::default()
        }
    }
}

// ============================================================================
// Global logger
// ============================================================================

struct Logger {
    config: LogConfig,
    sink: Arc<dyn LogSink>,
}

static LOGGER: RwLock<Option<Logger>> = parking_lot::const_rwlock(None);

/// Global log level for fast level checks.
///
/// Lets callers skip building an entry when the level is filtered out.
static GLOBAL_LOG_LEVEL: AtomicUsize = AtomicUsize::new(LogLevel::Info as usize);

/// Installs a configuration, keeping the current sink (stderr by default).
pub fn init(config: LogConfig) {
    set_global_log_level(config.min_level);
    let mut guard = LOGGER.write();
    let sink = guard
        .as_ref()
        .map_or_else(|| Arc::new(StderrSink) as Arc<dyn LogSink>, |l| Arc::clone(&l.sink));
    *guard = Some(Logger { config, sink });
}

/// Replaces the sink, keeping the current configuration.
pub fn set_log_sink(sink: Arc<dyn LogSink>) {
    let mut guard = LOGGER.write();
    let config = guard
        .as_ref()
        .map_or_else(LogConfig::default, |l| l.config.clone());
    *guard = Some(Logger { config, sink });
}

/// Restores the default configuration and the stderr sink.
pub fn reset() {
    *LOGGER.write() = None;
    set_global_log_level(LogLevel::Info);
}

/// Returns the current global log level.
#[inline]
#[must_use]
pub fn global_log_level() -> LogLevel {
    LogLevel::from_usize(GLOBAL_LOG_LEVEL.load(Ordering::Relaxed))
}

/// Sets the global log level.
pub fn set_global_log_level(level: LogLevel) {
    GLOBAL_LOG_LEVEL.store(level as usize, Ordering::Relaxed);
}

/// Returns true if the given level is enabled.
#[inline]
#[must_use]
pub fn level_enabled(level: LogLevel) -> bool {
    level >= global_log_level()
}

// ============================================================================
// Logging Macros
// ============================================================================

/// Builds a DEBUG [`LogEntry`] tagged with the calling module.
///
/// # Example
///
/// ```ignore
/// log_debug!("Entering function").emit();
/// log_debug!("Processing item {}", item_id).emit();
/// log_debug!("With fields", key => value, another => thing).emit();
/// ```
#[macro_export]
macro_rules! log_debug {
    ($msg:expr) => {
        $crate::logging::LogEntry::new($crate::logging::LogLevel::Debug, $msg)
            .target(module_path!())
    };
    ($msg:expr, $($key:ident => $value:expr),+ $(,)?) => {
        $crate::logging::LogEntry::new($crate::logging::LogLevel::Debug, $msg)
            .target(module_path!())
            $(.field(stringify!($key), $value))+
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::logging::LogEntry::new($crate::logging::LogLevel::Debug, format!($fmt, $($arg)*))
            .target(module_path!())
    };
}

/// Builds an INFO [`LogEntry`] tagged with the calling module.
#[macro_export]
macro_rules! log_info {
    ($msg:expr) => {
        $crate::logging::LogEntry::new($crate::logging::LogLevel::Info, $msg)
            .target(module_path!())
    };
    ($msg:expr, $($key:ident => $value:expr),+ $(,)?) => {
        $crate::logging::LogEntry::new($crate::logging::LogLevel::Info, $msg)
            .target(module_path!())
            $(.field(stringify!($key), $value))+
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::logging::LogEntry::new($crate::logging::LogLevel::Info, format!($fmt, $($arg)*))
            .target(module_path!())
    };
}

/// Builds a WARN [`LogEntry`] tagged with the calling module.
#[macro_export]
macro_rules! log_warn {
    ($msg:expr) => {
        $crate::logging::LogEntry::new($crate::logging::LogLevel::Warn, $msg)
            .target(module_path!())
    };
    ($msg:expr, $($key:ident => $value:expr),+ $(,)?) => {
        $crate::logging::LogEntry::new($crate::logging::LogLevel::Warn, $msg)
            .target(module_path!())
            $(.field(stringify!($key), $value))+
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::logging::LogEntry::new($crate::logging::LogLevel::Warn, format!($fmt, $($arg)*))
            .target(module_path!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn log_level_display() {
        assert_eq!(LogLevel::Info.as_str(), "info");
        assert_eq!(LogLevel::Error.as_char(), 'E');
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn log_entry_json() {
        let entry = LogEntry::new(LogLevel::Info, "Test message")
            .connection(12345)
            .target("test::module")
            .field("path", "/a\"b")
            .field("method", "GET");

        let json: Value = serde_json::from_str(&entry.to_json()).unwrap();
        assert_eq!(json["level"], "info");
        assert_eq!(json["message"], "Test message");
        assert_eq!(json["connection_id"], 12345);
        assert_eq!(json["target"], "test::module");
        assert_eq!(json["fields"]["path"], "/a\"b");
        assert_eq!(json["fields"]["method"], "GET");
    }

    #[test]
    fn log_entry_json_omits_absent_parts() {
        let json: Value =
            serde_json::from_str(&LogEntry::new(LogLevel::Debug, "bare").to_json()).unwrap();
        assert!(json.get("connection_id").is_none());
        assert!(json.get("target").is_none());
        assert!(json.get("fields").is_none());
    }

    #[test]
    fn log_entry_compact() {
        let entry = LogEntry::new(LogLevel::Warn, "Something happened")
            .connection(3)
            .field("limit", 1024);

        let compact = entry.to_compact();
        assert!(compact.starts_with("[W] conn=3"));
        assert!(compact.contains("Something happened"));
        assert!(compact.contains("limit=1024"));
    }

    #[test]
    fn field_cap() {
        let mut entry = LogEntry::new(LogLevel::Info, "many");
        for i in 0..20 {
            entry = entry.field(format!("k{i}"), i);
        }
        assert_eq!(entry.fields.len(), 16);
        assert_eq!(entry.field_value("k0"), Some("0"));
        assert_eq!(entry.field_value("k19"), None);
    }

    #[test]
    fn log_config_presets() {
        let dev = LogConfig::development();
        assert_eq!(dev.min_level, LogLevel::Debug);
        assert!(!dev.json_output);

        let prod = LogConfig::production();
        assert_eq!(prod.min_level, LogLevel::Info);
        assert!(prod.json_output);

        let test = LogConfig::testing();
        assert_eq!(test.min_level, LogLevel::Trace);
    }

    #[test]
    fn log_macro_basic() {
        let entry = log_info!("Basic message");
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.message, "Basic message");
        assert_eq!(entry.target.as_deref(), Some(module_path!()));
    }

    #[test]
    fn log_macro_with_fields() {
        let entry = log_warn!("With fields", limit => 42, prefix => "abc");
        assert_eq!(entry.fields.len(), 2);
        assert_eq!(entry.fields[0], ("limit".to_string(), "42".to_string()));
        assert_eq!(entry.fields[1], ("prefix".to_string(), "abc".to_string()));
    }

    #[test]
    fn log_macro_format_string() {
        let item_id = 99;
        let entry = log_debug!("Processing item {}", item_id);
        assert_eq!(entry.level, LogLevel::Debug);
        assert_eq!(entry.message, "Processing item 99");
    }

    #[test]
    #[serial]
    fn emit_routes_to_sink() {
        let sink = Arc::new(MemorySink::new());
        init(LogConfig::testing());
        set_log_sink(sink.clone());

        log_warn!("boom").emit();
        LogEntry::new(LogLevel::Trace, "quiet").emit();

        assert_eq!(sink.with_message("boom").len(), 1);
        assert_eq!(sink.with_message("quiet").len(), 1);
        reset();
    }

    #[test]
    #[serial]
    fn emit_filters_below_level() {
        let sink = Arc::new(MemorySink::new());
        init(LogConfig::new().level(LogLevel::Warn));
        set_log_sink(sink.clone());

        log_info!("filtered").emit();
        log_warn!("kept").emit();

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "kept");
        reset();
    }

    #[test]
    #[serial]
    fn emit_strips_target_when_configured() {
        let sink = Arc::new(MemorySink::new());
        init(LogConfig::new().include_target(false));
        set_log_sink(sink.clone());

        log_info!("no target").emit();
        assert_eq!(sink.entries()[0].target, None);
        reset();
    }

    #[test]
    #[serial]
    fn global_level_roundtrip() {
        set_global_log_level(LogLevel::Error);
        assert_eq!(global_log_level(), LogLevel::Error);
        assert!(!level_enabled(LogLevel::Warn));
        assert!(level_enabled(LogLevel::Error));
        reset();
        assert_eq!(global_log_level(), LogLevel::Info);
    }
}
