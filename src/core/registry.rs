//! Process-wide logger registry
//!
//! Loggers are registered once by name at startup and looked up by handle
//! afterwards. A name is never silently re-created.

use super::error::{LoggerError, Result};
use super::logger::Logger;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

fn registry() -> &'static RwLock<HashMap<String, Arc<Logger>>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Arc<Logger>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register `logger` under its name
///
/// # Errors
///
/// Returns `AlreadyRegistered` if the name is taken
///
/// # Example
///
/// ```
/// use rust_context_logger::{registry, Logger};
///
/// let logger = Logger::builder("doc-registry").build().unwrap();
/// let handle = registry::register(logger).unwrap();
/// assert!(registry::get("doc-registry").is_some());
/// # let _ = handle;
/// # registry::unregister("doc-registry");
/// ```
pub fn register(logger: Logger) -> Result<Arc<Logger>> {
    let mut loggers = registry().write();
    if loggers.contains_key(logger.name()) {
        return Err(LoggerError::AlreadyRegistered(logger.name().to_string()));
    }
    let logger = Arc::new(logger);
    loggers.insert(logger.name().to_string(), Arc::clone(&logger));
    Ok(logger)
}

pub fn get(name: &str) -> Option<Arc<Logger>> {
    registry().read().get(name).cloned()
}

/// Return the logger registered as `name`, creating it with `init` if absent
///
/// # Errors
///
/// Returns whatever `init` returns, or `InvalidConfiguration` if `init`
/// produced a logger with a different name
///
/// `init` runs without the registry lock held and may itself call into the
/// registry. When two threads race, both initializers can run; the first to
/// register wins and the other logger is dropped.
pub fn get_or_init<F>(name: &str, init: F) -> Result<Arc<Logger>>
where
    F: FnOnce() -> Result<Logger>,
{
    if let Some(logger) = get(name) {
        return Ok(logger);
    }

    // init may use the registry itself, so it runs without the lock held
    let logger = init()?;
    if logger.name() != name {
        return Err(LoggerError::config(
            "registry",
            format!("initializer for '{}' built logger '{}'", name, logger.name()),
        ));
    }

    let mut loggers = registry().write();
    if let Some(existing) = loggers.get(name) {
        // Another thread registered first; its instance wins and ours is
        // dropped once the lock is released
        let existing = Arc::clone(existing);
        drop(loggers);
        drop(logger);
        return Ok(existing);
    }
    let logger = Arc::new(logger);
    loggers.insert(name.to_string(), Arc::clone(&logger));
    Ok(logger)
}

/// Remove a logger; outstanding handles keep it alive until dropped
pub fn unregister(name: &str) -> Option<Arc<Logger>> {
    registry().write().remove(name)
}

pub fn registered_names() -> Vec<String> {
    let mut names: Vec<String> = registry().read().keys().cloned().collect();
    names.sort();
    names
}
