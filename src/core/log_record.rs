//! Log record and the builder that assembles it
//!
//! A record merges four inputs: the level/message from the call site, the
//! ambient [`LogContext`], caller fields and an optional error payload.
//! Context, correlation id, duration and error live in dedicated slots; caller
//! fields never shadow them (see [`RESERVED_FIELDS`]).

use super::fields::{FieldValue, Fields};
use super::log_context::{ContextStore, LogContext};
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt::Write as _;
use std::sync::Arc;

/// Names sourced only from dedicated record slots.
///
/// A caller field with one of these names is dropped when the record is
/// built: the reserved slot always wins.
pub const RESERVED_FIELDS: &[&str] = &[
    "timestamp",
    "level",
    "logger",
    "message",
    "module",
    "function",
    "line",
    "context",
    "correlation_id",
    "duration",
    "duration_ms",
    "error",
];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// Best-effort origin of a log call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub module: Option<String>,
    pub function: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl SourceLocation {
    pub fn new(module: &str, function: &str, file: &str, line: u32) -> Self {
        Self {
            module: Some(module.to_string()),
            function: Some(function.to_string()),
            file: Some(file.to_string()),
            line: Some(line),
        }
    }

    /// File and line of the `#[track_caller]` chain's origin
    #[track_caller]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self {
            module: None,
            function: None,
            file: Some(location.file().to_string()),
            line: Some(location.line()),
        }
    }

    /// Module path when known, otherwise the source file
    pub fn module_name(&self) -> Option<&str> {
        self.module.as_deref().or(self.file.as_deref())
    }
}

/// Stable classification of an error payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// A `std::error::Error` value
    Error,
    /// An `std::io::Error`
    Io,
    /// A panic payload
    Panic,
    /// Free text supplied by the caller
    Message,
}

/// Error payload attached to a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type")]
    pub type_name: String,
    pub kind: ErrorKind,
    pub type_path: String,
    pub message: String,
    pub traceback: String,
}

impl ErrorInfo {
    /// Payload without a captured trace
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            type_path: type_name.clone(),
            type_name,
            kind: ErrorKind::Message,
            message: message.into(),
            traceback: String::new(),
        }
    }

    /// Capture type, message, cause chain and a backtrace of the logging site
    pub fn capture<E: StdError + 'static>(error: &E) -> Self {
        let type_path = std::any::type_name::<E>();
        let as_dyn: &(dyn StdError + 'static) = error;
        let kind = if as_dyn.is::<std::io::Error>() {
            ErrorKind::Io
        } else {
            ErrorKind::Error
        };

        Self {
            type_name: short_type_name(type_path),
            kind,
            type_path: type_path.to_string(),
            message: error.to_string(),
            traceback: traceback(as_dyn),
        }
    }

    /// Capture from a trait object, where the concrete type is unknown
    pub fn from_dyn(error: &(dyn StdError + 'static)) -> Self {
        let kind = if error.is::<std::io::Error>() {
            ErrorKind::Io
        } else {
            ErrorKind::Error
        };
        let type_name = match kind {
            ErrorKind::Io => "Error",
            _ => "dyn Error",
        };

        Self {
            type_name: type_name.to_string(),
            kind,
            type_path: match kind {
                ErrorKind::Io => "std::io::error::Error".to_string(),
                _ => "dyn core::error::Error".to_string(),
            },
            message: error.to_string(),
            traceback: traceback(error),
        }
    }

    /// Describe a panic payload caught with `catch_unwind`
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self {
            type_name: "Panic".to_string(),
            kind: ErrorKind::Panic,
            type_path: "core::panic".to_string(),
            message: panic_message(payload),
            traceback: Backtrace::force_capture().to_string(),
        }
    }
}

/// Text of a panic payload (`&str` or `String`)
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

fn traceback(error: &(dyn StdError + 'static)) -> String {
    let mut out = String::new();
    let mut source = error.source();
    if source.is_some() {
        out.push_str("Caused by:\n");
    }
    let mut depth = 0;
    while let Some(cause) = source {
        let _ = writeln!(out, "    {}: {}", depth, cause);
        depth += 1;
        source = cause.source();
    }
    let _ = write!(out, "Stack backtrace:\n{}", Backtrace::force_capture());
    out
}

/// One emission-ready log record
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger_name: String,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub context: Option<Arc<LogContext>>,
    pub correlation_id: Option<String>,
    pub fields: Fields,
    pub duration_ms: Option<f64>,
    pub error: Option<ErrorInfo>,
}

impl LogRecord {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// so a record always renders as one line.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn builder(level: LogLevel, message: impl Into<String>) -> RecordBuilder {
        RecordBuilder::new(level, message)
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

/// Assembles a [`LogRecord`]
///
/// # Example
///
/// ```
/// use rust_context_logger::core::{LogLevel, LogRecord};
///
/// let record = LogRecord::builder(LogLevel::Info, "Query executed")
///     .field("rows", 42)
///     .field("level", "ignored")
///     .build("db");
///
/// assert_eq!(record.fields.len(), 1);
/// assert_eq!(record.level, LogLevel::Info);
/// ```
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    level: LogLevel,
    message: String,
    timestamp: Option<DateTime<Utc>>,
    location: Option<SourceLocation>,
    context: Option<Arc<LogContext>>,
    fields: Fields,
    duration_ms: Option<f64>,
    error: Option<ErrorInfo>,
}

impl RecordBuilder {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: None,
            location: None,
            context: None,
            fields: Fields::new(),
            duration_ms: None,
            error: None,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    #[must_use]
    pub fn field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key, value);
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: Fields) -> Self {
        for (k, v) in fields.iter() {
            self.fields.insert(k, v.clone());
        }
        self
    }

    #[must_use]
    pub fn context(mut self, context: Option<Arc<LogContext>>) -> Self {
        self.context = context;
        self
    }

    /// Attach the calling thread's current context, if any
    #[must_use]
    pub fn ambient_context(self) -> Self {
        self.context(ContextStore::get())
    }

    #[must_use]
    pub fn duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Attach an error payload. Raises the level to at least ERROR.
    #[must_use]
    pub fn error(mut self, error: ErrorInfo) -> Self {
        self.level = self.level.max(LogLevel::Error);
        self.error = Some(error);
        self
    }

    #[must_use]
    pub fn location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub(crate) fn location_if_absent(mut self, location: SourceLocation) -> Self {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }

    pub(crate) fn has_context(&self) -> bool {
        self.context.is_some()
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self, logger_name: &str) -> LogRecord {
        self.build_with_dropped(logger_name).0
    }

    /// Build the record and report caller fields dropped for colliding with
    /// reserved names
    pub fn build_with_dropped(mut self, logger_name: &str) -> (LogRecord, Vec<String>) {
        let dropped = self.fields.drain_matching(is_reserved);
        let correlation_id = self.context.as_ref().map(|c| c.correlation_id.clone());

        let record = LogRecord {
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            level: self.level,
            logger_name: logger_name.to_string(),
            message: LogRecord::sanitize_message(&self.message),
            location: self.location,
            context: self.context,
            correlation_id,
            fields: self.fields,
            duration_ms: self.duration_ms,
            error: self.error,
        };
        (record, dropped)
    }
}
