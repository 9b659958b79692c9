//! Error-only rotating file sink

use super::rotating_file::{RotatingFileSink, RotationPolicy};
use crate::core::error::Result;
use crate::core::log_level::LogLevel;
use crate::core::sink::Sink;
use std::path::Path;

/// Rotating file that only accepts ERROR and CRITICAL records
///
/// The floor applies however the sink is bound: a binding at DEBUG still
/// admits nothing below ERROR.
pub struct ErrorFileSink {
    inner: RotatingFileSink,
}

impl ErrorFileSink {
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created or opened
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created or opened
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        Ok(Self {
            inner: RotatingFileSink::with_policy(path, policy)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub fn rotation_count(&self) -> u64 {
        self.inner.rotation_count()
    }

    /// Rotations that failed and fell back to the current file
    pub fn rotation_failures(&self) -> u64 {
        self.inner.rotation_failures()
    }
}

impl Sink for ErrorFileSink {
    fn write(&self, line: &str) -> Result<()> {
        self.inner.write(line)
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    fn name(&self) -> &str {
        "error_file"
    }

    fn level_floor(&self) -> LogLevel {
        LogLevel::Error
    }
}
