//! Human-readable formatter for terminals

use crate::core::{Formatter, LogRecord, LoggerError, TimestampFormat};
use crate::sinks::ConsoleTarget;
#[cfg(feature = "console")]
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::str::FromStr;

/// When to colour console output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Colour only when the target stream is an interactive terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Resolve against stdout
    pub fn should_color(&self) -> bool {
        self.should_color_for(ConsoleTarget::Stdout)
    }

    pub fn should_color_for(&self, target: ConsoleTarget) -> bool {
        match self {
            ColorMode::Auto => match target {
                ConsoleTarget::Stdout => std::io::stdout().is_terminal(),
                ConsoleTarget::Stderr => std::io::stderr().is_terminal(),
            },
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

impl FromStr for ColorMode {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            "never" => Ok(ColorMode::Never),
            _ => Err(LoggerError::config("color", format!("unknown color mode '{}'", s))),
        }
    }
}

/// `[timestamp] LEVEL    logger: message [ID: xxxxxxxx] [12.34ms]`
pub struct ConsoleFormatter {
    use_colors: bool,
    timestamp_format: TimestampFormat,
}

impl ConsoleFormatter {
    pub fn new() -> Self {
        Self::with_color_mode(ColorMode::Auto)
    }

    /// Resolves the mode once, at construction, against stdout
    pub fn with_color_mode(mode: ColorMode) -> Self {
        Self::for_target(mode, ConsoleTarget::Stdout)
    }

    /// Resolves the mode against the stream the paired sink writes to
    pub fn for_target(mode: ColorMode, target: ConsoleTarget) -> Self {
        Self {
            use_colors: mode.should_color_for(target),
            timestamp_format: TimestampFormat::console(),
        }
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn uses_colors(&self) -> bool {
        self.use_colors
    }

    fn paint(&self, record: &LogRecord, text: String) -> String {
        #[cfg(feature = "console")]
        {
            if self.use_colors {
                return text.color(record.level.color_code()).to_string();
            }
        }
        #[cfg(not(feature = "console"))]
        let _ = record;
        text
    }
}

impl Default for ConsoleFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for ConsoleFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let base = format!(
            "[{}] {:8} {}: {}",
            self.timestamp_format.format(&record.timestamp),
            record.level,
            record.logger_name,
            record.message
        );
        let mut output = self.paint(record, base);

        if let Some(ref correlation_id) = record.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [ID: {}]", short));
        }
        if let Some(duration) = record.duration_ms {
            output.push_str(&format!(" [{:.2}ms]", duration));
        }

        output
    }

    fn name(&self) -> &str {
        "console"
    }
}
