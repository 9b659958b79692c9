//! # Rust Context Logger
//!
//! Structured logging with per-thread correlation context and size-rotated
//! log files.
//!
//! ## Features
//!
//! - **Correlation context**: scoped request/user/session ids attached to every record
//! - **Two formats**: single-line JSON for files, coloured text for terminals
//! - **Rotating files**: size-based rotation with bounded backups, plus an error-only file
//! - **Timing**: `timer` wraps an operation and logs its duration and failure
//!
//! ## Example
//!
//! ```no_run
//! use rust_context_logger::prelude::*;
//!
//! let logger = Logger::from_config(&LoggerConfig::new("api").with_level("DEBUG")).unwrap();
//!
//! logger.scoped(LogContext::builder().user_id("u-17"), |correlation_id| {
//!     logger.info_with("request accepted", fields! { "path" => "/orders" });
//!     println!("handling {}", correlation_id);
//! });
//! ```

pub mod core;
pub mod formatters;
pub mod macros;
pub mod sinks;

pub use crate::core::registry;

pub mod prelude {
    pub use crate::core::{
        ContextFutureExt, ContextStore, ErrorInfo, FieldValue, Fields, Formatter, LogContext,
        LogLevel, LogRecord, Logger, LoggerBuilder, LoggerConfig, LoggerError, RecordBuilder,
        Result, Sink, SinkBinding, TimestampFormat,
    };
    pub use crate::fields;
    pub use crate::formatters::{ColorMode, ConsoleFormatter, StructuredFormatter};
    pub use crate::sinks::{ConsoleSink, ErrorFileSink, RotatingFileSink, RotationPolicy};
}

pub use crate::core::{
    BoxError, ContextFutureExt, ContextGuard, ContextStore, ErrorInfo, ErrorKind, FieldValue, Fields,
    Formatter, LogContext, LogContextBuilder, LogLevel, LogRecord, Logger, LoggerBuilder,
    LoggerConfig, LoggerError, LoggerMetrics, RecordBuilder, Result, Sink, SinkBinding,
    SourceLocation, TimerGuard, TimestampFormat, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use formatters::{ColorMode, ConsoleFormatter, StructuredFormatter};
pub use sinks::{ConsoleSink, ConsoleTarget, ErrorFileSink, RotatingFileSink, RotationPolicy};
