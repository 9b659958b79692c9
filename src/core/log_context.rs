//! Ambient request/session context
//!
//! This module provides:
//! - `LogContext`: immutable correlation/user/session/request identifiers
//! - `ContextStore`: the per-thread slot holding the current context
//! - `ContextGuard`: RAII guard restoring the previous context on drop
//! - `WithContext`: future adapter giving a task its own context slot

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use uuid::Uuid;

pub const DEFAULT_SERVICE_NAME: &str = "logging-service";
pub const DEFAULT_VERSION: &str = "1.0.0";

thread_local! {
    static CURRENT: RefCell<Option<Arc<LogContext>>> = const { RefCell::new(None) };
}

/// Identifiers attached to every record emitted while the context is current
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

impl LogContext {
    /// Context with the given correlation id and default service/version
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self::builder().correlation_id(correlation_id).build()
    }

    pub fn builder() -> LogContextBuilder {
        LogContextBuilder::default()
    }

    /// Fresh random correlation id (UUID v4, hyphenated)
    pub fn generate_correlation_id() -> String {
        Uuid::new_v4().to_string()
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`LogContext`]
///
/// Unset service name and version fall back to the defaults of whoever builds
/// the context (the logger's configured values when built through
/// `Logger::scoped`).
#[derive(Debug, Clone, Default)]
pub struct LogContextBuilder {
    correlation_id: Option<String>,
    user_id: Option<String>,
    session_id: Option<String>,
    request_id: Option<String>,
    service_name: Option<String>,
    version: Option<String>,
}

impl LogContextBuilder {
    #[must_use]
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn build(self) -> LogContext {
        self.build_with_defaults(DEFAULT_SERVICE_NAME, DEFAULT_VERSION)
    }

    pub(crate) fn build_with_defaults(self, service_name: &str, version: &str) -> LogContext {
        LogContext {
            correlation_id: self
                .correlation_id
                .unwrap_or_else(LogContext::generate_correlation_id),
            user_id: self.user_id,
            session_id: self.session_id,
            request_id: self.request_id,
            service_name: self.service_name.unwrap_or_else(|| service_name.to_string()),
            version: self.version.unwrap_or_else(|| version.to_string()),
        }
    }
}

/// Per-thread storage for the ambient context
///
/// Every thread (or every future wrapped with [`ContextFutureExt`]) has its
/// own slot; nothing here is visible to other threads.
pub struct ContextStore;

impl ContextStore {
    /// Install `context` as current, discarding whatever was there
    pub fn set(context: impl Into<Arc<LogContext>>) {
        Self::replace(Some(context.into()));
    }

    /// Current context of the calling thread
    pub fn get() -> Option<Arc<LogContext>> {
        CURRENT.try_with(|slot| slot.borrow().clone()).ok().flatten()
    }

    /// Remove the current context. No-op when nothing is set.
    pub fn clear() {
        Self::replace(None);
    }

    /// Install `context` until the returned guard is dropped
    pub fn enter(context: impl Into<Arc<LogContext>>) -> ContextGuard {
        let previous = Self::replace(Some(context.into()));
        ContextGuard {
            previous,
            _not_send: PhantomData,
        }
    }

    /// Build a context, run `body` inside it and restore the previous one
    ///
    /// `body` receives the active correlation id. Restoration also happens
    /// when `body` panics.
    pub fn scoped<R>(builder: LogContextBuilder, body: impl FnOnce(&str) -> R) -> R {
        Self::scoped_context(Arc::new(builder.build()), body)
    }

    pub(crate) fn scoped_context<R>(context: Arc<LogContext>, body: impl FnOnce(&str) -> R) -> R {
        let _guard = Self::enter(Arc::clone(&context));
        body(&context.correlation_id)
    }

    fn replace(value: Option<Arc<LogContext>>) -> Option<Arc<LogContext>> {
        // try_with: the slot may already be destroyed during thread teardown
        CURRENT
            .try_with(|slot| std::mem::replace(&mut *slot.borrow_mut(), value))
            .ok()
            .flatten()
    }
}

/// RAII guard for a scoped context
///
/// Dropping the guard reinstates the context that was current when the guard
/// was created (or clears the slot if there was none). Guards are meant to be
/// dropped in reverse creation order; dropping them out of order leaves the
/// value saved by the last dropped guard in place.
#[must_use = "the context is restored as soon as the guard is dropped"]
pub struct ContextGuard {
    previous: Option<Arc<LogContext>>,
    // pins the guard to the thread whose slot it restores
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        ContextStore::replace(self.previous.take());
    }
}

/// Future that carries its own ambient context across polls
///
/// The task's context is installed before each poll and the executor
/// thread's own context is restored right after, so the value follows the
/// task across threads. `ContextStore::set` and `clear` inside the task
/// persist across `.await` points.
pub struct WithContext<F> {
    inner: Pin<Box<F>>,
    context: Option<Arc<LogContext>>,
}

impl<F: Future> Future for WithContext<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let previous = ContextStore::replace(this.context.take());
        let _guard = ContextGuard {
            previous,
            _not_send: PhantomData,
        };
        let poll = this.inner.as_mut().poll(cx);
        // keep whatever the task left current; the guard then restores the thread
        this.context = ContextStore::get();
        poll
    }
}

pub trait ContextFutureExt: Future + Sized {
    fn with_log_context(self, context: impl Into<Arc<LogContext>>) -> WithContext<Self> {
        WithContext {
            inner: Box::pin(self),
            context: Some(context.into()),
        }
    }
}

impl<F: Future> ContextFutureExt for F {}
