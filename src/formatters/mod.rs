//! Formatter implementations

pub mod console;
pub mod structured;

pub use console::{ColorMode, ConsoleFormatter};
pub use structured::StructuredFormatter;

pub use crate::core::Formatter;
