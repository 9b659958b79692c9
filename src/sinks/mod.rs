//! Sink implementations

pub mod console;
pub mod error_file;
pub mod rotating_file;

pub use console::{ConsoleSink, ConsoleTarget};
pub use error_file::ErrorFileSink;
pub use rotating_file::{RotatingFileSink, RotationPolicy, DEFAULT_BACKUP_COUNT, DEFAULT_MAX_FILE_SIZE};

pub use crate::core::Sink;
