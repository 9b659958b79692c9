//! JSON-lines formatter for file sinks

use crate::core::{Formatter, LogRecord, TimestampFormat};
use serde_json::{Map, Value};

/// Renders each record as one JSON object per line
///
/// Key order is fixed: `timestamp`, `level`, `logger`, `message`, location
/// (`module`, `function`, `line`), `context`, `correlation_id`,
/// `duration_ms`, `error`, then caller fields in insertion order. Optional
/// keys are omitted when empty.
#[derive(Debug, Clone, Default)]
pub struct StructuredFormatter {
    timestamp_format: TimestampFormat,
}

impl StructuredFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Build the ordered JSON object for a record
    pub fn to_json_map(&self, record: &LogRecord) -> Map<String, Value> {
        let mut obj = Map::new();

        obj.insert(
            "timestamp".to_string(),
            self.timestamp_format.to_json_value(&record.timestamp),
        );
        obj.insert("level".to_string(), Value::from(record.level.to_str()));
        obj.insert("logger".to_string(), Value::from(record.logger_name.as_str()));
        obj.insert("message".to_string(), Value::from(record.message.as_str()));

        if let Some(ref location) = record.location {
            if let Some(module) = location.module_name() {
                obj.insert("module".to_string(), Value::from(module));
            }
            if let Some(ref function) = location.function {
                obj.insert("function".to_string(), Value::from(function.as_str()));
            }
            if let Some(line) = location.line {
                obj.insert("line".to_string(), Value::from(line));
            }
        }

        if let Some(ref context) = record.context {
            obj.insert(
                "context".to_string(),
                serde_json::to_value(context.as_ref()).unwrap_or_default(),
            );
        }
        if let Some(ref correlation_id) = record.correlation_id {
            obj.insert("correlation_id".to_string(), Value::from(correlation_id.as_str()));
        }
        if let Some(duration) = record.duration_ms {
            obj.insert(
                "duration_ms".to_string(),
                serde_json::Number::from_f64(duration)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(duration.to_string())),
            );
        }
        if let Some(ref error) = record.error {
            obj.insert(
                "error".to_string(),
                serde_json::to_value(error).unwrap_or_default(),
            );
        }

        for (key, value) in record.fields.iter() {
            // reserved keys are stripped by the builder; never clobber a slot
            obj.entry(key.to_string()).or_insert_with(|| value.to_json_value());
        }

        obj
    }
}

impl Formatter for StructuredFormatter {
    fn format(&self, record: &LogRecord) -> String {
        serde_json::to_string(&Value::Object(self.to_json_map(record))).unwrap_or_default()
    }

    fn name(&self) -> &str {
        "structured"
    }
}
