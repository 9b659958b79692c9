//! Formatter trait for rendering records

use super::log_record::LogRecord;

/// Renders a record to one output line (no trailing newline)
pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> String;
    fn name(&self) -> &str;
}
