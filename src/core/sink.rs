//! Sink trait for log output destinations

use super::{error::Result, formatter::Formatter, log_level::LogLevel};
use std::sync::Arc;

/// Destination for rendered lines
///
/// Implementations serialise their own writes, so a sink can be shared
/// between threads and loggers behind an `Arc`.
pub trait Sink: Send + Sync {
    /// Write one rendered line. The sink appends the line terminator.
    fn write(&self, line: &str) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn name(&self) -> &str;

    /// Lowest level this sink ever accepts, regardless of its binding
    fn level_floor(&self) -> LogLevel {
        LogLevel::Debug
    }
}

/// A sink paired with its formatter and minimum level
#[derive(Clone)]
pub struct SinkBinding {
    sink: Arc<dyn Sink>,
    formatter: Arc<dyn Formatter>,
    level: LogLevel,
}

impl SinkBinding {
    pub fn new(sink: Arc<dyn Sink>, formatter: Arc<dyn Formatter>, level: LogLevel) -> Self {
        Self {
            sink,
            formatter,
            level,
        }
    }

    /// Effective threshold: the binding level, raised to the sink's floor
    pub fn level(&self) -> LogLevel {
        self.level.max(self.sink.level_floor())
    }

    pub fn admits(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.formatter
    }
}

impl std::fmt::Debug for SinkBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkBinding")
            .field("sink", &self.sink.name())
            .field("formatter", &self.formatter.name())
            .field("level", &self.level())
            .finish()
    }
}
