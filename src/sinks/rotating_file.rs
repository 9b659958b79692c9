//! Size-based rotating file sink
//!
//! `app.log` is the live file; `app.log.1` is the newest backup and
//! `app.log.<backup_count>` the oldest. The size check, the rotation and the
//! write run under one lock, so a line never spans two files.

use crate::core::error::{LoggerError, Result};
use crate::core::sink::Sink;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// 10 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_BACKUP_COUNT: usize = 5;

/// Rotation thresholds
///
/// # Examples
///
/// ```
/// use rust_context_logger::sinks::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_size(50 * 1024 * 1024)
///     .with_max_backups(7);
/// assert_eq!(policy.backup_count, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate before a write that would push the file past this size.
    /// `0` disables rotation.
    pub max_file_size: u64,
    /// Number of numbered backups kept. `0` truncates instead of archiving.
    pub backup_count: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            backup_count: DEFAULT_BACKUP_COUNT,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }
}

struct FileState {
    writer: Option<BufWriter<File>>,
    current_size: u64,
    rotations: u64,
    rotation_failures: u64,
}

/// File sink with size-triggered rotation and bounded backups
///
/// # Examples
///
/// ```no_run
/// use rust_context_logger::sinks::{RotatingFileSink, RotationPolicy};
/// use rust_context_logger::Sink;
///
/// let sink = RotatingFileSink::with_policy(
///     "logs/app.log",
///     RotationPolicy::new().with_max_size(1024 * 1024).with_max_backups(3),
/// )
/// .unwrap();
/// sink.write(r#"{"message":"hello"}"#).unwrap();
/// ```
pub struct RotatingFileSink {
    base_path: PathBuf,
    policy: RotationPolicy,
    auto_flush: bool,
    state: Mutex<FileState>,
}

impl RotatingFileSink {
    /// Create a sink with the default policy (10 MiB, 5 backups)
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created or opened
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// Create a sink with a custom policy
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created or opened
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let (file, current_size) = Self::open_append(&base_path)?;

        Ok(Self {
            base_path,
            policy,
            auto_flush: true,
            state: Mutex::new(FileState {
                writer: Some(BufWriter::new(file)),
                current_size,
                rotations: 0,
                rotation_failures: 0,
            }),
        })
    }

    /// Flush after every line (default `true`). With `false`, lines stay in
    /// the buffer until `flush`, a rotation, or drop.
    #[must_use]
    pub fn with_auto_flush(mut self, enabled: bool) -> Self {
        self.auto_flush = enabled;
        self
    }

    fn open_append(path: &Path) -> Result<(File, u64)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
            })?;

        let size = file
            .metadata()
            .map_err(|e| {
                LoggerError::file_sink(
                    path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();
        Ok((file, size))
    }

    fn needs_rotation(&self, current_size: u64, pending: u64) -> bool {
        self.policy.max_file_size > 0
            && current_size > 0
            && current_size + pending > self.policy.max_file_size
    }

    /// Get backup file path for given index
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut path = self.base_path.clone();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log")
            .to_string();
        path.set_file_name(format!("{}.{}", filename, index));
        path
    }

    fn rotate(&self, state: &mut FileState) -> Result<()> {
        // Release the handle before renaming
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        if self.policy.backup_count == 0 {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.base_path)
                .map_err(|e| {
                    LoggerError::file_rotation(
                        self.base_path.display().to_string(),
                        format!("Failed to truncate log file: {}", e),
                    )
                })?;
            state.writer = Some(BufWriter::new(file));
            state.current_size = 0;
            state.rotations += 1;
            return Ok(());
        }

        let oldest = self.backup_path(self.policy.backup_count);
        if oldest.exists() {
            if let Err(e) = fs::remove_file(&oldest) {
                // rename below replaces it on most platforms anyway
                eprintln!("[WARN] Failed to remove oldest backup {}: {}", oldest.display(), e);
            }
        }

        for i in (1..self.policy.backup_count).rev() {
            let old_path = self.backup_path(i);
            if !old_path.exists() {
                continue;
            }
            let new_path = self.backup_path(i + 1);
            if fs::rename(&old_path, &new_path).is_err() {
                // Some platforms refuse to rename over an existing file
                if new_path.exists() {
                    let _ = fs::remove_file(&new_path);
                }
                fs::rename(&old_path, &new_path).map_err(|e| {
                    LoggerError::file_rotation(
                        old_path.display().to_string(),
                        format!("Failed to shift backup file: {}", e),
                    )
                })?;
            }
        }

        if self.base_path.exists() {
            fs::rename(&self.base_path, self.backup_path(1)).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to archive current log file: {}", e),
                )
            })?;
        }

        let (file, size) = Self::open_append(&self.base_path).map_err(|e| {
            LoggerError::file_rotation(
                self.base_path.display().to_string(),
                format!("Failed to create new log file: {}", e),
            )
        })?;

        state.writer = Some(BufWriter::new(file));
        state.current_size = size;
        state.rotations += 1;
        Ok(())
    }

    /// Recover after a failed rotation: keep writing to whatever file sits at
    /// the base path
    fn recover(&self, state: &mut FileState) -> Result<()> {
        if state.writer.is_none() {
            let (file, size) = Self::open_append(&self.base_path)?;
            state.writer = Some(BufWriter::new(file));
            state.current_size = size;
        }
        Ok(())
    }

    /// Current file size in bytes, including buffered lines
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_size
    }

    /// Completed rotations since construction
    #[must_use]
    pub fn rotation_count(&self) -> u64 {
        self.state.lock().rotations
    }

    /// Rotations that failed and fell back to the current file
    #[must_use]
    pub fn rotation_failures(&self) -> u64 {
        self.state.lock().rotation_failures
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }
}

impl Sink for RotatingFileSink {
    fn write(&self, line: &str) -> Result<()> {
        let mut state = self.state.lock();
        let pending = line.len() as u64 + 1;

        if self.needs_rotation(state.current_size, pending) {
            if let Err(e) = self.rotate(&mut state) {
                state.rotation_failures += 1;
                eprintln!("[WARN] Log rotation failed: {}. Continuing with current file.", e);
                self.recover(&mut state)?;
                // Let the file grow past the limit rather than retry on every line
                state.current_size = 0;
            }
        }

        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::file_sink(self.base_path.display().to_string(), "Writer not initialized"))?;

        let result = writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| if self.auto_flush { writer.flush() } else { Ok(()) });
        result.map_err(|e| {
            LoggerError::file_sink(
                self.base_path.display().to_string(),
                format!("Failed to write log line: {}", e),
            )
        })?;

        state.current_size += pending;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(ref mut writer) = state.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_sink(
                    self.base_path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "rotating_file"
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.state.get_mut().writer.take() {
            // Best effort flush - ignore errors during drop
            let _ = writer.flush();
        }
    }
}
