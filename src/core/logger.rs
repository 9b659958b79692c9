//! Logger facade
//!
//! Applies the logger threshold, builds a [`LogRecord`] with the calling
//! thread's context, and dispatches it to every sink binding that admits it.

use super::{
    config::LoggerConfig,
    error::{LoggerError, Result},
    fields::Fields,
    formatter::Formatter,
    log_context::{ContextStore, LogContext, LogContextBuilder, DEFAULT_SERVICE_NAME, DEFAULT_VERSION},
    log_level::LogLevel,
    log_record::{panic_message, ErrorInfo, ErrorKind, LogRecord, RecordBuilder, SourceLocation},
    metrics::LoggerMetrics,
    sink::{Sink, SinkBinding},
};
use crate::formatters::{ConsoleFormatter, StructuredFormatter};
use crate::sinks::{ConsoleSink, ErrorFileSink, RotatingFileSink};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::error::Error as StdError;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Boxed error accepted by [`Logger::timer_dyn`]
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Default shutdown timeout for logger cleanup (5 seconds)
///
/// Used when an async logger is dropped without explicit shutdown, and as the
/// upper bound `flush` waits for the worker.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

enum WorkerMessage {
    Record(LogRecord),
    Flush(Sender<()>),
}

pub struct Logger {
    name: String,
    min_level: RwLock<LogLevel>,
    bindings: Arc<RwLock<Vec<SinkBinding>>>,
    service_name: String,
    version: String,
    sender: Option<Sender<WorkerMessage>>,
    worker: Option<thread::JoinHandle<()>>,
    metrics: Arc<LoggerMetrics>,
}

impl Logger {
    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use rust_context_logger::prelude::*;
    ///
    /// let logger = Logger::builder("demo")
    ///     .min_level(LogLevel::Debug)
    ///     .sink(ConsoleSink::new(), ConsoleFormatter::new(), LogLevel::Debug)
    ///     .build()
    ///     .unwrap();
    /// logger.info("ready");
    /// ```
    #[must_use]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }

    /// Build the standard trio from configuration: console, `<name>.log`
    /// (all levels) and `<name>_errors.log` (ERROR and above)
    ///
    /// # Errors
    ///
    /// Returns error on an invalid level, an unwritable log directory, or a
    /// file that cannot be opened
    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        config.validate()?;
        let level = config.min_level()?;

        fs::create_dir_all(&config.log_dir).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", config.log_dir.display()),
                e,
            )
        })?;

        let policy = config.rotation_policy();
        let main_path = config.log_dir.join(format!("{}.log", config.name));
        let error_path = config.log_dir.join(format!("{}_errors.log", config.name));

        let mut builder = Logger::builder(config.name.clone())
            .min_level(level)
            .service_name(config.service_name.clone())
            .version(config.version.clone());

        if config.console {
            builder = builder.sink(
                ConsoleSink::new(),
                ConsoleFormatter::with_color_mode(config.color),
                level,
            );
        }

        builder = builder
            .sink(
                RotatingFileSink::with_policy(main_path, policy.clone())?,
                StructuredFormatter::new(),
                LogLevel::Debug,
            )
            .sink(
                ErrorFileSink::with_policy(error_path, policy)?,
                StructuredFormatter::new(),
                LogLevel::Error,
            );

        if let Some(size) = config.async_buffer {
            builder = builder.async_mode(size);
        }

        builder.build()
    }

    fn spawn_worker(
        name: &str,
        receiver: Receiver<WorkerMessage>,
        bindings: Arc<RwLock<Vec<SinkBinding>>>,
        metrics: Arc<LoggerMetrics>,
    ) -> Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("{}-log-worker", name))
            .spawn(move || {
                // Ends once every sender is gone and the queue is drained
                for message in receiver.iter() {
                    match message {
                        WorkerMessage::Record(record) => {
                            Self::dispatch(&bindings.read(), &record, &metrics);
                        }
                        WorkerMessage::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
                if let Err(e) = Self::flush_bindings(&bindings.read()) {
                    eprintln!("[LOGGER ERROR] Failed to flush on worker exit: {}", e);
                }
            })
            .map_err(|e| LoggerError::io_operation("spawn log worker", "Failed to start worker thread", e))
    }

    /// Render and write one record to every admitting binding
    ///
    /// Each binding is isolated with `catch_unwind`: a sink that errors or
    /// panics is reported and skipped, the others still receive the record.
    fn dispatch(bindings: &[SinkBinding], record: &LogRecord, metrics: &LoggerMetrics) {
        for binding in bindings.iter().filter(|b| b.admits(record.level)) {
            let sink_name = binding.sink().name();

            let line = match panic::catch_unwind(AssertUnwindSafe(|| binding.formatter().format(record))) {
                Ok(line) => line,
                Err(payload) => {
                    let fallback = format!("{} {}: {}", record.level, record.logger_name, record.message);
                    Self::report_failure(
                        sink_name,
                        &format!("formatter '{}' panicked: {}", binding.formatter().name(), panic_message(&*payload)),
                        &fallback,
                        metrics,
                    );
                    continue;
                }
            };

            match panic::catch_unwind(AssertUnwindSafe(|| binding.sink().write(&line))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => Self::report_failure(sink_name, &e.to_string(), &line, metrics),
                Err(payload) => Self::report_failure(
                    sink_name,
                    &format!("panicked: {}", panic_message(&*payload)),
                    &line,
                    metrics,
                ),
            }
        }
    }

    /// Best-effort fallback: the failure and the lost line go to stderr
    fn report_failure(sink: &str, reason: &str, line: &str, metrics: &LoggerMetrics) {
        metrics.record_sink_failure();
        eprintln!("[LOGGER ERROR] Sink '{}' failed: {}", sink, reason);
        eprintln!("{}", line);
    }

    fn flush_bindings(bindings: &[SinkBinding]) -> Result<()> {
        let mut first_error = None;
        for binding in bindings {
            let result = panic::catch_unwind(AssertUnwindSafe(|| binding.sink().flush()))
                .unwrap_or_else(|payload| {
                    Err(LoggerError::other(format!(
                        "sink '{}' panicked during flush: {}",
                        binding.sink().name(),
                        panic_message(&*payload)
                    )))
                });
            if let Err(e) = result {
                eprintln!("[LOGGER ERROR] Sink '{}' flush failed: {}", binding.sink().name(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn send_record(&self, record: LogRecord) {
        let Some(ref sender) = self.sender else {
            Self::dispatch(&self.bindings.read(), &record, &self.metrics);
            return;
        };

        if let Err(err) = sender.try_send(WorkerMessage::Record(record)) {
            // Queue full or worker gone: write inline, never drop
            if err.is_full() {
                self.metrics.record_queue_full();
            }
            if let WorkerMessage::Record(record) = err.into_inner() {
                Self::dispatch(&self.bindings.read(), &record, &self.metrics);
            }
        }
    }

    /// Emit a fully custom record
    ///
    /// Attaches the calling thread's context when the builder carries none,
    /// and the caller's file/line when it carries no location.
    #[track_caller]
    pub fn emit(&self, builder: RecordBuilder) {
        if builder.level() < self.min_level() {
            self.metrics.record_filtered();
            return;
        }

        let builder = builder.location_if_absent(SourceLocation::caller());
        let builder = if builder.has_context() {
            builder
        } else {
            builder.ambient_context()
        };

        let (record, dropped) = builder.build_with_dropped(&self.name);
        if !dropped.is_empty() {
            self.metrics.record_reserved_dropped(dropped.len() as u64);
        }
        self.metrics.record_emitted();
        self.send_record(record);
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(RecordBuilder::new(level, message));
    }

    #[track_caller]
    pub fn log_with(&self, level: LogLevel, message: impl Into<String>, fields: Fields) {
        self.emit(RecordBuilder::new(level, message).fields(fields));
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }

    #[track_caller]
    pub fn debug_with(&self, message: impl Into<String>, fields: Fields) {
        self.log_with(LogLevel::Debug, message, fields);
    }

    #[track_caller]
    pub fn info_with(&self, message: impl Into<String>, fields: Fields) {
        self.log_with(LogLevel::Info, message, fields);
    }

    #[track_caller]
    pub fn warning_with(&self, message: impl Into<String>, fields: Fields) {
        self.log_with(LogLevel::Warning, message, fields);
    }

    #[track_caller]
    pub fn error_with(&self, message: impl Into<String>, fields: Fields) {
        self.log_with(LogLevel::Error, message, fields);
    }

    #[track_caller]
    pub fn critical_with(&self, message: impl Into<String>, fields: Fields) {
        self.log_with(LogLevel::Critical, message, fields);
    }

    /// Log an error value with its type, message and traceback
    ///
    /// # Example
    /// ```
    /// use rust_context_logger::{fields, Logger};
    ///
    /// let logger = Logger::builder("svc").build().unwrap();
    /// if let Err(e) = "abc".parse::<u32>() {
    ///     logger.error_with_cause("bad input", &e, fields! { "input" => "abc" });
    /// }
    /// ```
    #[track_caller]
    pub fn error_with_cause<E>(&self, message: impl Into<String>, error: &E, fields: Fields)
    where
        E: StdError + 'static,
    {
        self.emit(
            RecordBuilder::new(LogLevel::Error, message)
                .fields(fields)
                .error(ErrorInfo::capture(error)),
        );
    }

    /// Run `body` in a new context scope built from `builder`
    ///
    /// Service name and version fall back to this logger's values. The body
    /// receives the scope's correlation id; the previous context is restored
    /// on every exit path.
    pub fn scoped<R>(&self, builder: LogContextBuilder, body: impl FnOnce(&str) -> R) -> R {
        let context = builder.build_with_defaults(&self.service_name, &self.version);
        ContextStore::scoped_context(Arc::new(context), body)
    }

    /// Install `context` for the calling thread (shared by every logger on it)
    pub fn set_context(&self, context: LogContext) {
        ContextStore::set(context);
    }

    pub fn get_context(&self) -> Option<Arc<LogContext>> {
        ContextStore::get()
    }

    pub fn clear_context(&self) {
        ContextStore::clear();
    }

    /// Time `body`, logging start, completion or failure
    ///
    /// An `Err` is logged at ERROR with its details and returned unchanged;
    /// a panic is logged and then resumed.
    ///
    /// # Example
    /// ```
    /// use rust_context_logger::Logger;
    ///
    /// let logger = Logger::builder("jobs").build().unwrap();
    /// let parsed = logger.timer("parse", || "42".parse::<u32>());
    /// assert_eq!(parsed, Ok(42));
    /// ```
    #[track_caller]
    pub fn timer<T, E, F>(&self, operation: &str, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: StdError + 'static,
    {
        self.timer_with(operation, body, ErrorInfo::capture::<E>)
    }

    /// [`timer`](Self::timer) for boxed trait-object errors
    ///
    /// Any `Error + Send + Sync` converts into the box with `?` or `.into()`.
    #[track_caller]
    pub fn timer_dyn<T, F>(&self, operation: &str, body: F) -> std::result::Result<T, BoxError>
    where
        F: FnOnce() -> std::result::Result<T, BoxError>,
    {
        self.timer_with(operation, body, |err: &BoxError| ErrorInfo::from_dyn(&**err))
    }

    /// [`timer`](Self::timer) for any failure type, described by `describe`
    #[track_caller]
    pub fn timer_with<T, E, F, D>(&self, operation: &str, body: F, describe: D) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        D: FnOnce(&E) -> ErrorInfo,
    {
        let location = SourceLocation::caller();
        self.emit(
            RecordBuilder::new(LogLevel::Info, format!("Starting {}", operation))
                .field("operation", operation)
                .location(location.clone()),
        );

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(body));
        let elapsed = elapsed_ms(start);

        match outcome {
            Ok(Ok(value)) => {
                self.emit(
                    RecordBuilder::new(LogLevel::Info, format!("Completed {}", operation))
                        .field("operation", operation)
                        .duration_ms(elapsed)
                        .location(location),
                );
                Ok(value)
            }
            Ok(Err(err)) => {
                self.emit(
                    RecordBuilder::new(LogLevel::Error, format!("Failed {}", operation))
                        .field("operation", operation)
                        .duration_ms(elapsed)
                        .error(describe(&err))
                        .location(location),
                );
                Err(err)
            }
            Err(payload) => {
                self.emit(
                    RecordBuilder::new(LogLevel::Error, format!("Failed {}", operation))
                        .field("operation", operation)
                        .duration_ms(elapsed)
                        .error(ErrorInfo::from_panic(&*payload))
                        .location(location),
                );
                panic::resume_unwind(payload)
            }
        }
    }

    /// Start a timer that logs when finished or dropped
    #[track_caller]
    pub fn timer_guard(&self, operation: impl Into<String>) -> TimerGuard<'_> {
        let operation = operation.into();
        let location = SourceLocation::caller();
        self.emit(
            RecordBuilder::new(LogLevel::Info, format!("Starting {}", operation))
                .field("operation", operation.as_str())
                .location(location.clone()),
        );
        TimerGuard {
            logger: self,
            operation,
            location,
            start: Instant::now(),
            finished: false,
        }
    }

    /// Attach another sink binding at runtime
    pub fn add_binding(&self, binding: SinkBinding) {
        self.bindings.write().push(binding);
    }

    pub fn set_min_level(&self, level: LogLevel) {
        *self.min_level.write() = level;
    }

    pub fn min_level(&self) -> LogLevel {
        *self.min_level.read()
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_async(&self) -> bool {
        self.sender.is_some()
    }

    /// Get the logger metrics
    ///
    /// # Example
    ///
    /// ```
    /// use rust_context_logger::Logger;
    ///
    /// let logger = Logger::builder("app").build().unwrap();
    /// logger.debug("below the default INFO threshold");
    /// assert_eq!(logger.metrics().filtered(), 1);
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Flush every sink, waiting for the async worker to drain first
    ///
    /// # Errors
    ///
    /// Returns the first sink flush error, or `WorkerStopped` if the worker
    /// did not answer within [`DEFAULT_SHUTDOWN_TIMEOUT`]
    pub fn flush(&self) -> Result<()> {
        if let Some(ref sender) = self.sender {
            let (ack_tx, ack_rx) = bounded(1);
            sender
                .send(WorkerMessage::Flush(ack_tx))
                .map_err(|_| LoggerError::WorkerStopped)?;
            ack_rx
                .recv_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
                .map_err(|_| LoggerError::WorkerStopped)?;
        }
        Self::flush_bindings(&self.bindings.read())
    }

    /// Drain the async queue and stop the worker
    ///
    /// Returns `true` if the worker finished within `timeout` and the final
    /// flush succeeded. Synchronous loggers only flush.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_context_logger::Logger;
    /// use std::time::Duration;
    ///
    /// let mut logger = Logger::builder("app").async_mode(1000).build().unwrap();
    /// logger.info("Important message");
    ///
    /// if !logger.shutdown(Duration::from_secs(10)) {
    ///     eprintln!("Warning: Logger shutdown timed out");
    /// }
    /// ```
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let joined = self.stop_worker(timeout);

        if let Err(e) = Self::flush_bindings(&self.bindings.read()) {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
            return false;
        }
        joined
    }

    fn stop_worker(&mut self, timeout: Duration) -> bool {
        // Closing the channel lets the worker drain and exit
        drop(self.sender.take());

        let Some(handle) = self.worker.take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!("[LOGGER ERROR] Async worker thread panicked during shutdown: {:?}", e);
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Async worker thread did not finish within {:?} timeout. \
                     Some logs may be lost.",
                    timeout
                );
                return false;
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.stop_worker(DEFAULT_SHUTDOWN_TIMEOUT);

        if let Err(e) = Self::flush_bindings(&self.bindings.read()) {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
        }

        let failures = self.metrics.sink_failures();
        if failures > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger '{}' shutting down after {} failed sink writes",
                self.name, failures
            );
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("min_level", &self.min_level())
            .field("bindings", &*self.bindings.read())
            .field("async", &self.is_async())
            .finish()
    }
}

/// RAII timer from [`Logger::timer_guard`]
///
/// `finish` logs completion. Dropping an unfinished guard logs completion,
/// or failure if the thread is unwinding.
pub struct TimerGuard<'a> {
    logger: &'a Logger,
    operation: String,
    location: SourceLocation,
    start: Instant,
    finished: bool,
}

impl TimerGuard<'_> {
    pub fn elapsed_ms(&self) -> f64 {
        elapsed_ms(self.start)
    }

    /// Log completion and return the elapsed milliseconds
    pub fn finish(mut self) -> f64 {
        self.finished = true;
        let elapsed = self.elapsed_ms();
        self.log_completed(elapsed);
        elapsed
    }

    fn log_completed(&self, elapsed: f64) {
        self.logger.emit(
            RecordBuilder::new(LogLevel::Info, format!("Completed {}", self.operation))
                .field("operation", self.operation.as_str())
                .duration_ms(elapsed)
                .location(self.location.clone()),
        );
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let elapsed = self.elapsed_ms();
        if thread::panicking() {
            let mut error = ErrorInfo::new("Panic", format!("{} panicked", self.operation));
            error.kind = ErrorKind::Panic;
            self.logger.emit(
                RecordBuilder::new(LogLevel::Error, format!("Failed {}", self.operation))
                    .field("operation", self.operation.as_str())
                    .duration_ms(elapsed)
                    .error(error)
                    .location(self.location.clone()),
            );
        } else {
            self.log_completed(elapsed);
        }
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_context_logger::prelude::*;
///
/// let logger = Logger::builder("worker")
///     .min_level(LogLevel::Debug)
///     .sink(ConsoleSink::new(), ConsoleFormatter::new(), LogLevel::Info)
///     .async_mode(1000)
///     .build()
///     .unwrap();
/// ```
pub struct LoggerBuilder {
    name: String,
    min_level: LogLevel,
    bindings: Vec<SinkBinding>,
    async_buffer: Option<usize>,
    service_name: String,
    version: String,
}

impl LoggerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_level: LogLevel::Info,
            bindings: Vec::new(),
            async_buffer: None,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Bind a sink with the formatter that renders for it
    #[must_use = "builder methods return a new value"]
    pub fn sink<S, F>(self, sink: S, formatter: F, level: LogLevel) -> Self
    where
        S: Sink + 'static,
        F: Formatter + 'static,
    {
        self.binding(SinkBinding::new(Arc::new(sink), Arc::new(formatter), level))
    }

    /// Bind a sink that is shared with other loggers
    #[must_use = "builder methods return a new value"]
    pub fn shared_sink(
        self,
        sink: Arc<dyn Sink>,
        formatter: Arc<dyn Formatter>,
        level: LogLevel,
    ) -> Self {
        self.binding(SinkBinding::new(sink, formatter, level))
    }

    #[must_use = "builder methods return a new value"]
    pub fn binding(mut self, binding: SinkBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Write on a background thread fed by a queue of `buffer_size` records
    ///
    /// If not called, the logger writes on the calling thread.
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, buffer_size: usize) -> Self {
        self.async_buffer = Some(buffer_size);
        self
    }

    /// Default service name for scoped contexts
    #[must_use = "builder methods return a new value"]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Default version for scoped contexts
    #[must_use = "builder methods return a new value"]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Build the Logger
    ///
    /// # Errors
    ///
    /// Returns error for an empty name, a zero async buffer, or if the
    /// worker thread cannot be started
    pub fn build(self) -> Result<Logger> {
        if self.name.trim().is_empty() {
            return Err(LoggerError::config("name", "logger name must not be empty"));
        }

        let bindings = Arc::new(RwLock::new(self.bindings));
        let metrics = Arc::new(LoggerMetrics::new());

        let (sender, worker) = match self.async_buffer {
            Some(0) => {
                return Err(LoggerError::config("async_buffer", "buffer size must be greater than 0"));
            }
            Some(size) => {
                let (sender, receiver) = bounded(size);
                let handle = Logger::spawn_worker(
                    &self.name,
                    receiver,
                    Arc::clone(&bindings),
                    Arc::clone(&metrics),
                )?;
                (Some(sender), Some(handle))
            }
            None => (None, None),
        };

        Ok(Logger {
            name: self.name,
            min_level: RwLock::new(self.min_level),
            bindings,
            service_name: self.service_name,
            version: self.version,
            sender,
            worker,
            metrics,
        })
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fields::FieldValue;
    use parking_lot::Mutex;

    /// Keeps the records it receives, rendered by a pass-through formatter
    #[derive(Default)]
    struct MemorySink {
        lines: Mutex<Vec<String>>,
    }

    impl MemorySink {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().clone()
        }
    }

    impl Sink for MemorySink {
        fn write(&self, line: &str) -> Result<()> {
            self.lines.lock().push(line.to_string());
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    struct PanickingSink;

    impl Sink for PanickingSink {
        fn write(&self, _line: &str) -> Result<()> {
            panic!("Intentional panic for testing");
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    struct FailingSink;

    impl Sink for FailingSink {
        fn write(&self, _line: &str) -> Result<()> {
            Err(LoggerError::file_sink("/dev/full", "No space left on device"))
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn memory_logger(level: LogLevel) -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let logger = Logger::builder("test")
            .min_level(level)
            .shared_sink(sink.clone(), Arc::new(StructuredFormatter::new()), LogLevel::Debug)
            .build()
            .unwrap();
        (logger, sink)
    }

    fn parse(line: &str) -> serde_json::Value {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn test_threshold_filters() {
        let (logger, sink) = memory_logger(LogLevel::Warning);

        logger.debug("no");
        logger.info("no");
        logger.warning("yes");
        logger.critical("yes");

        assert_eq!(sink.lines().len(), 2);
        assert_eq!(logger.metrics().filtered(), 2);
        assert_eq!(logger.metrics().emitted(), 2);
    }

    #[test]
    fn test_binding_threshold() {
        let all = Arc::new(MemorySink::default());
        let errors = Arc::new(MemorySink::default());
        let logger = Logger::builder("routing")
            .min_level(LogLevel::Debug)
            .shared_sink(all.clone(), Arc::new(StructuredFormatter::new()), LogLevel::Debug)
            .shared_sink(errors.clone(), Arc::new(StructuredFormatter::new()), LogLevel::Error)
            .build()
            .unwrap();

        logger.info("routine");
        logger.error("broken");

        assert_eq!(all.lines().len(), 2);
        assert_eq!(errors.lines().len(), 1);
        assert_eq!(parse(&errors.lines()[0])["message"], "broken");
    }

    #[test]
    fn test_caller_location_recorded() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        logger.info("here");

        let parsed = parse(&sink.lines()[0]);
        assert!(parsed["module"].as_str().unwrap().ends_with("logger.rs"));
        assert!(parsed["line"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_reserved_fields_counted() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        logger.info_with(
            "collide",
            Fields::new().with("level", "fake").with("message", "fake").with("user", "bob"),
        );

        let parsed = parse(&sink.lines()[0]);
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["message"], "collide");
        assert_eq!(parsed["user"], "bob");
        assert_eq!(logger.metrics().reserved_fields_dropped(), 2);
    }

    #[test]
    fn test_panicking_sink_isolated() {
        let good = Arc::new(MemorySink::default());
        let logger = Logger::builder("isolated")
            .sink(PanickingSink, StructuredFormatter::new(), LogLevel::Debug)
            .shared_sink(good.clone(), Arc::new(StructuredFormatter::new()), LogLevel::Debug)
            .build()
            .unwrap();

        logger.info("still delivered");

        assert_eq!(good.lines().len(), 1);
        assert_eq!(logger.metrics().sink_failures(), 1);
    }

    #[test]
    fn test_failing_sink_does_not_propagate() {
        let logger = Logger::builder("degraded")
            .sink(FailingSink, StructuredFormatter::new(), LogLevel::Debug)
            .build()
            .unwrap();

        logger.error("disk is full");
        logger.info("still fine");

        assert_eq!(logger.metrics().sink_failures(), 2);
    }

    #[test]
    fn test_error_with_cause() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        logger.error_with_cause("write failed", &err, Fields::new().with("path", "/etc/x"));

        let parsed = parse(&sink.lines()[0]);
        assert_eq!(parsed["level"], "ERROR");
        assert_eq!(parsed["error"]["type"], "Error");
        assert_eq!(parsed["error"]["kind"], "io");
        assert_eq!(parsed["error"]["message"], "denied");
        assert_eq!(parsed["path"], "/etc/x");
    }

    #[test]
    fn test_emit_raises_level_with_error() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        logger.emit(
            RecordBuilder::new(LogLevel::Info, "escalated").error(ErrorInfo::new("Custom", "bad")),
        );

        assert_eq!(parse(&sink.lines()[0])["level"], "ERROR");
    }

    #[test]
    fn test_scoped_uses_logger_defaults() {
        let sink = Arc::new(MemorySink::default());
        let logger = Logger::builder("svc")
            .service_name("billing")
            .version("2.1.0")
            .shared_sink(sink.clone(), Arc::new(StructuredFormatter::new()), LogLevel::Debug)
            .build()
            .unwrap();

        let id = logger.scoped(LogContext::builder().user_id("u1"), |id| {
            logger.info("inside");
            id.to_string()
        });
        logger.info("outside");

        let lines = sink.lines();
        let inside = parse(&lines[0]);
        assert_eq!(inside["context"]["service_name"], "billing");
        assert_eq!(inside["context"]["version"], "2.1.0");
        assert_eq!(inside["context"]["user_id"], "u1");
        assert_eq!(inside["correlation_id"], id.as_str());
        assert!(parse(&lines[1]).get("context").is_none());
    }

    #[test]
    fn test_set_and_clear_context() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        logger.set_context(LogContext::new("fixed-id"));
        assert_eq!(logger.get_context().unwrap().correlation_id, "fixed-id");
        logger.info("with");
        logger.clear_context();
        logger.clear_context();
        logger.info("without");

        let lines = sink.lines();
        assert_eq!(parse(&lines[0])["correlation_id"], "fixed-id");
        assert!(parse(&lines[1]).get("correlation_id").is_none());
    }

    #[test]
    fn test_timer_success() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        let value = logger.timer("sum", || Ok::<_, std::io::Error>(2 + 2)).unwrap();
        assert_eq!(value, 4);

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(parse(&lines[0])["message"], "Starting sum");
        assert_eq!(parse(&lines[0])["operation"], "sum");
        let done = parse(&lines[1]);
        assert_eq!(done["message"], "Completed sum");
        assert!(done["duration_ms"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn test_timer_failure_propagates() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        let result: std::result::Result<(), _> =
            logger.timer("connect", || Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out")));

        let err = result.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);

        let failed = parse(&sink.lines()[1]);
        assert_eq!(failed["level"], "ERROR");
        assert_eq!(failed["message"], "Failed connect");
        assert_eq!(failed["error"]["message"], "timed out");
    }

    #[test]
    fn test_timer_dyn_accepts_boxed_errors() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        let result = logger.timer_dyn("load", || {
            let port: u16 = "not-a-port".parse()?;
            Ok(port)
        });

        let err = result.unwrap_err();
        assert!(err.is::<std::num::ParseIntError>());
        let failed = parse(&sink.lines()[1]);
        assert_eq!(failed["message"], "Failed load");
        assert_eq!(failed["error"]["kind"], "error");
        assert_eq!(failed["error"]["message"], "invalid digit found in string");
        assert!(failed["duration_ms"].as_f64().is_some());
    }

    #[test]
    fn test_timer_with_custom_description() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        let result: std::result::Result<(), &str> =
            logger.timer_with("quota", || Err("over limit"), |e| ErrorInfo::new("QuotaExceeded", *e));

        assert_eq!(result, Err("over limit"));
        let failed = parse(&sink.lines()[1]);
        assert_eq!(failed["level"], "ERROR");
        assert_eq!(failed["error"]["type"], "QuotaExceeded");
        assert_eq!(failed["error"]["message"], "over limit");
    }

    #[test]
    fn test_timer_panic_resumes() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = logger.timer("explode", || -> std::result::Result<(), std::io::Error> {
                panic!("kaboom");
            });
        }));

        assert!(outcome.is_err());
        let failed = parse(&sink.lines()[1]);
        assert_eq!(failed["error"]["kind"], "panic");
        assert_eq!(failed["error"]["message"], "kaboom");
    }

    #[test]
    fn test_timer_guard() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        {
            let guard = logger.timer_guard("batch");
            assert!(guard.elapsed_ms() >= 0.0);
            guard.finish();
        }
        {
            let _guard = logger.timer_guard("implicit");
        }

        let messages: Vec<String> = sink
            .lines()
            .iter()
            .map(|l| parse(l)["message"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            messages,
            vec!["Starting batch", "Completed batch", "Starting implicit", "Completed implicit"]
        );
    }

    #[test]
    fn test_timer_guard_during_panic() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = logger.timer_guard("doomed");
            panic!("inside guard");
        }));

        let failed = parse(&sink.lines()[1]);
        assert_eq!(failed["level"], "ERROR");
        assert_eq!(failed["message"], "Failed doomed");
    }

    #[test]
    fn test_async_mode_delivers_in_order() {
        let sink = Arc::new(MemorySink::default());
        let mut logger = Logger::builder("async")
            .shared_sink(sink.clone(), Arc::new(StructuredFormatter::new()), LogLevel::Debug)
            .async_mode(1024)
            .build()
            .unwrap();
        assert!(logger.is_async());

        for i in 0..100 {
            logger.info_with("tick", Fields::new().with("i", i));
        }
        logger.flush().unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 100);
        assert_eq!(parse(&lines[99])["i"], 99);
        assert!(logger.shutdown(Duration::from_secs(1)));
    }

    #[test]
    fn test_async_context_captured_on_caller() {
        let sink = Arc::new(MemorySink::default());
        let logger = Logger::builder("async")
            .shared_sink(sink.clone(), Arc::new(StructuredFormatter::new()), LogLevel::Debug)
            .async_mode(16)
            .build()
            .unwrap();

        logger.scoped(LogContext::builder().correlation_id("caller-ctx"), |_| {
            logger.info("from caller");
        });
        logger.flush().unwrap();

        assert_eq!(parse(&sink.lines()[0])["correlation_id"], "caller-ctx");
    }

    #[test]
    fn test_async_full_queue_never_drops() {
        let sink = Arc::new(MemorySink::default());
        let logger = Logger::builder("tiny")
            .shared_sink(sink.clone(), Arc::new(StructuredFormatter::new()), LogLevel::Debug)
            .async_mode(1)
            .build()
            .unwrap();

        for _ in 0..500 {
            logger.info("burst");
        }
        logger.flush().unwrap();

        assert_eq!(sink.lines().len(), 500);
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        assert!(Logger::builder("").build().is_err());
        assert!(Logger::builder("x").async_mode(0).build().is_err());
    }

    #[test]
    fn test_set_min_level_at_runtime() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        logger.debug("hidden");
        logger.set_min_level(LogLevel::Debug);
        logger.debug("shown");

        assert_eq!(logger.min_level(), LogLevel::Debug);
        assert!(logger.is_enabled(LogLevel::Debug));
        assert_eq!(sink.lines().len(), 1);
    }

    #[test]
    fn test_add_binding_at_runtime() {
        let (logger, first) = memory_logger(LogLevel::Debug);
        let second = Arc::new(MemorySink::default());
        logger.add_binding(SinkBinding::new(
            second.clone(),
            Arc::new(ConsoleFormatter::with_color_mode(crate::formatters::ColorMode::Never)),
            LogLevel::Debug,
        ));

        logger.info_with("both", Fields::new().with("n", FieldValue::Int(1)));

        assert_eq!(first.lines().len(), 1);
        assert!(second.lines()[0].contains("INFO     test: both"));
    }
}
