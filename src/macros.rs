//! Logging macros for ergonomic log message formatting.
//!
//! Like `println!`, plus structured fields after a `;`. The macros record the
//! calling module and function, which the plain methods cannot see.
//!
//! # Examples
//!
//! ```
//! use rust_context_logger::prelude::*;
//! use rust_context_logger::info;
//!
//! let logger = Logger::builder("server").build().unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // With fields
//! info!(logger, "User logged in"; user_id = 42, method = "password");
//! ```

/// Function name from the type name of an item declared inside it
#[doc(hidden)]
pub fn function_name(item_path: &'static str) -> &'static str {
    let mut path = item_path.strip_suffix("::__here").unwrap_or(item_path);
    while let Some(outer) = path.strip_suffix("::{{closure}}") {
        path = outer;
    }
    path.rsplit("::").next().unwrap_or(path)
}

#[doc(hidden)]
#[macro_export]
macro_rules! __source_location {
    () => {{
        fn __here() {}
        $crate::core::SourceLocation::new(
            module_path!(),
            $crate::macros::function_name(::std::any::type_name_of_val(&__here)),
            file!(),
            line!(),
        )
    }};
}

/// Build a [`Fields`](crate::core::Fields) map in insertion order.
///
/// # Examples
///
/// ```
/// use rust_context_logger::fields;
///
/// let fields = fields! { "user" => "alice", "attempt" => 3 };
/// assert_eq!(fields.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::core::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::core::Fields::new();
        $(fields.insert($key, $value);)+
        fields
    }};
}

/// Log a message with automatic formatting.
///
/// The message is only formatted when the logger admits `level`.
///
/// # Examples
///
/// ```
/// # use rust_context_logger::prelude::*;
/// # let logger = Logger::builder("doc").build().unwrap();
/// use rust_context_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(logger, LogLevel::Warning, "Slow query"; table = "orders", ms = 812);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $fmt:literal $(, $arg:expr)* ; $($key:ident = $value:expr),+ $(,)?) => {{
        let __logger = &$logger;
        let __level = $level;
        if __logger.is_enabled(__level) {
            __logger.emit(
                $crate::core::RecordBuilder::new(__level, format!($fmt $(, $arg)*))
                    .location($crate::__source_location!())
                    $(.field(stringify!($key), $value))+
            );
        } else {
            __logger.metrics().record_filtered();
        }
    }};
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let __logger = &$logger;
        let __level = $level;
        if __logger.is_enabled(__level) {
            __logger.emit(
                $crate::core::RecordBuilder::new(__level, format!($($arg)+))
                    .location($crate::__source_location!())
            );
        } else {
            __logger.metrics().record_filtered();
        }
    }};
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use rust_context_logger::prelude::*;
/// # let logger = Logger::builder("doc").min_level(LogLevel::Debug).build().unwrap();
/// use rust_context_logger::debug;
/// debug!(logger, "Debug information");
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_context_logger::prelude::*;
/// # let logger = Logger::builder("doc").build().unwrap();
/// use rust_context_logger::warning;
/// warning!(logger, "Disk usage at {}%", 91; mount = "/var");
/// ```
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}
