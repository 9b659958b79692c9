//! Logger configuration
//!
//! Deserializable settings for [`Logger::from_config`](crate::Logger::from_config).
//! Every field has a default, so a partial JSON document is enough.

use super::error::{LoggerError, Result};
use super::log_context::{DEFAULT_SERVICE_NAME, DEFAULT_VERSION};
use super::log_level::LogLevel;
use crate::formatters::ColorMode;
use crate::sinks::{RotationPolicy, DEFAULT_BACKUP_COUNT, DEFAULT_MAX_FILE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for the standard console + file + error-file logger
///
/// # Example
///
/// ```
/// use rust_context_logger::core::LoggerConfig;
///
/// let config = LoggerConfig::from_json_str(r#"{"name": "api", "level": "DEBUG"}"#).unwrap();
/// assert_eq!(config.name, "api");
/// assert_eq!(config.backup_count, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub name: String,
    /// Level name, case-insensitive (`DEBUG`, `INFO`, `WARNING`, `ERROR`, `CRITICAL`)
    pub level: String,
    pub log_dir: PathBuf,
    pub max_file_size: u64,
    pub backup_count: usize,
    pub console: bool,
    pub color: ColorMode,
    pub service_name: String,
    pub version: String,
    /// Queue size for background writing; `None` writes on the calling thread
    pub async_buffer: Option<usize>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            level: LogLevel::Info.to_str().to_string(),
            log_dir: PathBuf::from("logs"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            backup_count: DEFAULT_BACKUP_COUNT,
            console: true,
            color: ColorMode::Auto,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            version: DEFAULT_VERSION.to_string(),
            async_buffer: None,
        }
    }
}

impl LoggerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns error on malformed JSON or an invalid configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    #[must_use]
    pub fn with_backup_count(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }

    #[must_use]
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    #[must_use]
    pub fn with_color(mut self, mode: ColorMode) -> Self {
        self.color = mode;
        self
    }

    #[must_use]
    pub fn with_service(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.service_name = name.into();
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn with_async_buffer(mut self, size: usize) -> Self {
        self.async_buffer = Some(size);
        self
    }

    /// Parsed minimum level
    ///
    /// # Errors
    ///
    /// Returns `InvalidLevel` for an unknown level name
    pub fn min_level(&self) -> Result<LogLevel> {
        self.level.parse()
    }

    pub fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy::new()
            .with_max_size(self.max_file_size)
            .with_max_backups(self.backup_count)
    }

    /// # Errors
    ///
    /// Returns error for an unknown level, an empty name or a zero async buffer
    pub fn validate(&self) -> Result<()> {
        self.min_level()?;

        if self.name.trim().is_empty() {
            return Err(LoggerError::config("name", "logger name must not be empty"));
        }
        if self.name.contains(['/', '\\']) {
            return Err(LoggerError::config(
                "name",
                format!("'{}' cannot be used as a file name", self.name),
            ));
        }
        if self.async_buffer == Some(0) {
            return Err(LoggerError::config("async_buffer", "buffer size must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::default();
        assert_eq!(config.name, "app");
        assert_eq!(config.level, "INFO");
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.max_file_size, 10_485_760);
        assert_eq!(config.backup_count, 5);
        assert!(config.console);
        assert_eq!(config.color, ColorMode::Auto);
        assert!(config.async_buffer.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = LoggerConfig::from_json_str(
            r#"{"name": "api", "level": "warning", "color": "never", "backup_count": 2}"#,
        )
        .unwrap();

        assert_eq!(config.name, "api");
        assert_eq!(config.min_level().unwrap(), LogLevel::Warning);
        assert_eq!(config.color, ColorMode::Never);
        assert_eq!(config.backup_count, 2);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_invalid_level_rejected() {
        let err = LoggerConfig::new("x").with_level("VERBOSE").validate().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidLevel(_)));

        assert!(LoggerConfig::from_json_str(r#"{"level": "LOUD"}"#).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(LoggerConfig::new("").validate().is_err());
        assert!(LoggerConfig::new("a/b").validate().is_err());
        assert!(LoggerConfig::new("x").with_async_buffer(0).validate().is_err());
        assert!(LoggerConfig::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_rotation_policy() {
        let policy = LoggerConfig::new("x")
            .with_max_file_size(100)
            .with_backup_count(2)
            .rotation_policy();
        assert_eq!(policy.max_file_size, 100);
        assert_eq!(policy.backup_count, 2);
    }
}
