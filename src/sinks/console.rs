//! Console sink

use crate::core::error::{LoggerError, Result};
use crate::core::sink::Sink;
use std::io::{self, Write};

/// Output stream for [`ConsoleSink`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

/// Writes formatted lines to standard output (or standard error)
///
/// Each line is written while holding the stream lock, so lines from
/// concurrent threads never interleave.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    target: ConsoleTarget,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stderr() -> Self {
        Self {
            target: ConsoleTarget::Stderr,
        }
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    fn write_to(out: &mut impl Write, line: &str) -> io::Result<()> {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")
    }
}

impl Sink for ConsoleSink {
    fn write(&self, line: &str) -> Result<()> {
        let result = match self.target {
            ConsoleTarget::Stdout => Self::write_to(&mut io::stdout().lock(), line),
            ConsoleTarget::Stderr => Self::write_to(&mut io::stderr().lock(), line),
        };
        result.map_err(|e| LoggerError::io_operation("console write", "Failed to write to console", e))
    }

    fn flush(&self) -> Result<()> {
        let result = match self.target {
            ConsoleTarget::Stdout => io::stdout().flush(),
            ConsoleTarget::Stderr => io::stderr().flush(),
        };
        result.map_err(|e| LoggerError::io_operation("console flush", "Failed to flush console", e))
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_appends_newline() {
        let mut buffer = Vec::new();
        ConsoleSink::write_to(&mut buffer, "hello").unwrap();
        assert_eq!(buffer, b"hello\n");
    }

    #[test]
    fn test_targets() {
        assert_eq!(ConsoleSink::new().target(), ConsoleTarget::Stdout);
        assert_eq!(ConsoleSink::stderr().target(), ConsoleTarget::Stderr);
        assert_eq!(ConsoleSink::new().name(), "console");
        assert!(ConsoleSink::new().flush().is_ok());
    }
}
