//! Core logger types and traits

pub mod config;
pub mod error;
pub mod fields;
pub mod formatter;
pub mod log_context;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod registry;
pub mod sink;
pub mod timestamp;

pub use config::LoggerConfig;
pub use error::{LoggerError, Result};
pub use fields::{FieldValue, Fields};
pub use formatter::Formatter;
pub use log_context::{
    ContextFutureExt, ContextGuard, ContextStore, LogContext, LogContextBuilder, WithContext,
    DEFAULT_SERVICE_NAME, DEFAULT_VERSION,
};
pub use log_level::LogLevel;
pub use log_record::{
    is_reserved, ErrorInfo, ErrorKind, LogRecord, RecordBuilder, SourceLocation, RESERVED_FIELDS,
};
pub use logger::{BoxError, Logger, LoggerBuilder, TimerGuard, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::LoggerMetrics;
pub use sink::{Sink, SinkBinding};
pub use timestamp::TimestampFormat;
