//! Shared ownership of native contexts.
//!
//! A [`Context`] is a cheap, clonable reference to one native engine context.
//! Every resource handle carries one, so the native context outlives every
//! resource allocated in it. Clones share state; the last one to be dropped
//! deregisters the context and frees it.
//!
//! # Example
//!
//! ```
//! use isle::{Context, ContextOptions, ErrorAction};
//!
//! let ctx = Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Continue));
//! assert_eq!(ctx.error_action(), ErrorAction::Continue);
//!
//! let clone = ctx.clone();
//! assert!(clone.ptr_eq(&ctx));
//! ```

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::engine::ctx::{
    ctx_get_on_error, ctx_last_error, ctx_live_objects, ctx_reset_error, ctx_set_on_error,
};
use crate::engine::{Bool, Ctx, OnError};
use crate::error::{Error, ErrorKind, Result};
use crate::registry::Registry;

/// What the engine does when a call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorAction {
    /// Return null (surfaced as an [`Error`](crate::Error)) silently.
    Continue,
    /// Log a warning, then behave like `Continue`.
    #[default]
    Warn,
    /// Print the diagnostic and abort the process.
    Abort,
}

impl From<ErrorAction> for OnError {
    fn from(action: ErrorAction) -> Self {
        match action {
            ErrorAction::Continue => OnError::Continue,
            ErrorAction::Warn => OnError::Warn,
            ErrorAction::Abort => OnError::Abort,
        }
    }
}

impl From<OnError> for ErrorAction {
    fn from(policy: OnError) -> Self {
        match policy {
            OnError::Continue => ErrorAction::Continue,
            OnError::Warn => ErrorAction::Warn,
            OnError::Abort => ErrorAction::Abort,
        }
    }
}

/// Settings applied to a freshly created context.
///
/// Options are pure data; nothing happens until [`Context::with_options`].
///
/// ```
/// use std::sync::Arc;
/// use isle::{ContextOptions, ErrorAction, Registry};
///
/// let registry = Arc::new(Registry::new());
/// let options = ContextOptions::new()
///     .with_error_action(ErrorAction::Continue)
///     .with_registry(Arc::clone(&registry));
/// assert_eq!(options.error_action(), Some(ErrorAction::Continue));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    error_action: Option<ErrorAction>,
    registry: Option<Arc<Registry>>,
}

impl ContextOptions {
    /// Engine defaults in the global registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Error action to install.
    pub fn with_error_action(mut self, action: ErrorAction) -> Self {
        self.error_action = Some(action);
        self
    }

    /// Register the context in `registry` instead of the global one.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Error action to install, if one was chosen.
    pub fn error_action(&self) -> Option<ErrorAction> {
        self.error_action
    }
}

/// Shared state behind every clone of one [`Context`].
pub(crate) struct ContextInner {
    ptr: NonNull<Ctx>,
    registry: Arc<Registry>,
    // Strong references leaked on behalf of objects handed out by `into_raw`.
    detached: AtomicUsize,
}

// SAFETY: the native context synchronizes its own state (atomics and a mutex);
// objects allocated in it are only reachable through `Handle`, which is not `Sync`.
unsafe impl Send for ContextInner {}
// SAFETY: as above.
unsafe impl Sync for ContextInner {}

impl ContextInner {
    pub(crate) fn new(ptr: NonNull<Ctx>, registry: Arc<Registry>) -> Self {
        ContextInner {
            ptr,
            registry,
            detached: AtomicUsize::new(0),
        }
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.registry.release(self.ptr.as_ptr());
    }
}

impl fmt::Debug for ContextInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextInner").field("ptr", &self.ptr).finish()
    }
}

/// Shared handle to one native context.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub(crate) fn from_inner(inner: Arc<ContextInner>) -> Self {
        Context { inner }
    }

    /// A brand-new native context, registered globally.
    pub fn new() -> Self {
        Registry::global().create_new()
    }

    /// A brand-new native context configured by `options`.
    pub fn with_options(options: ContextOptions) -> Self {
        let ctx = match &options.registry {
            Some(registry) => registry.create_new(),
            None => Registry::global().create_new(),
        };
        if let Some(action) = options.error_action {
            ctx.set_error_action(action);
        }
        ctx
    }

    /// The global registry's context for `ptr`; see [`Registry::acquire`].
    ///
    /// # Safety
    ///
    /// As for [`Registry::acquire`] on the global registry: `ptr` must be null,
    /// registered globally, or a live context that no other registry owns.
    pub unsafe fn from_raw(ptr: *mut Ctx) -> Option<Self> {
        // SAFETY: forwarded from the caller.
        unsafe { Registry::global().acquire(ptr) }
    }

    /// Raw native context pointer, still owned by `self`.
    pub fn as_ptr(&self) -> *mut Ctx {
        self.inner.ptr.as_ptr()
    }

    /// The registry this context is entered in.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    /// Whether both refer to the same native context.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of `Context` clones sharing this native context.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Install the engine's error action.
    pub fn set_error_action(&self, action: ErrorAction) {
        // SAFETY: the native context lives as long as `self`.
        unsafe { ctx_set_on_error(self.as_ptr(), action.into()) }
    }

    /// The engine's current error action.
    pub fn error_action(&self) -> ErrorAction {
        // SAFETY: the native context lives as long as `self`.
        unsafe { ctx_get_on_error(self.as_ptr()) }.into()
    }

    /// Most recent engine diagnostic, left in place.
    pub fn last_error(&self) -> Option<String> {
        // SAFETY: the native context lives as long as `self`.
        unsafe { ctx_last_error(self.as_ptr()) }
    }

    /// Most recent engine diagnostic, cleared afterwards.
    pub fn take_last_error(&self) -> Option<String> {
        let message = self.last_error();
        self.clear_last_error();
        message
    }

    pub(crate) fn clear_last_error(&self) {
        // SAFETY: the native context lives as long as `self`.
        unsafe { ctx_reset_error(self.as_ptr()) }
    }

    /// Engine objects currently allocated in this context.
    pub fn live_objects(&self) -> usize {
        // SAFETY: the native context lives as long as `self`.
        unsafe { ctx_live_objects(self.as_ptr()) }
    }

    /// Keep the native context alive for an object leaving through `into_raw`.
    pub(crate) fn detach(self) {
        self.inner.detached.fetch_add(1, Ordering::AcqRel);
        std::mem::forget(self);
    }

    /// Give back one reference leaked by [`Context::detach`], if any.
    pub(crate) fn reattach(&self) {
        let taken = self
            .inner
            .detached
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if taken {
            // SAFETY: `detach` leaked one strong count and `self` holds another,
            // so this never drops the last one.
            unsafe { Arc::decrement_strong_count(Arc::as_ptr(&self.inner)) };
        }
    }

    /// An error of `kind` carrying (and clearing) the engine's last diagnostic.
    pub(crate) fn failure(&self, kind: ErrorKind) -> Error {
        let err = Error::new(kind);
        match self.take_last_error() {
            Some(message) => err.with_message(message),
            None => err,
        }
    }

    /// Resolve an engine predicate.
    pub(crate) fn check(&self, answer: Bool) -> Result<bool> {
        match answer {
            Bool::True => Ok(true),
            Bool::False => Ok(false),
            Bool::Error => Err(self.failure(ErrorKind::ConstructionFailure)),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("ptr", &self.as_ptr())
            .field("error_action", &self.error_action())
            .field("live_objects", &self.live_objects())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::set::{set_free, set_read_from_str};

    fn isolated() -> (Arc<Registry>, Context) {
        let registry = Arc::new(Registry::new());
        let ctx = Context::with_options(ContextOptions::new().with_registry(Arc::clone(&registry)));
        (registry, ctx)
    }

    #[test]
    fn default_error_action_is_warn() {
        let (_, ctx) = isolated();
        assert_eq!(ctx.error_action(), ErrorAction::Warn);
    }

    #[test]
    fn error_action_is_forwarded() {
        let (_, ctx) = isolated();
        for action in [ErrorAction::Continue, ErrorAction::Abort, ErrorAction::Warn] {
            ctx.set_error_action(action);
            assert_eq!(ctx.error_action(), action);
            // SAFETY: the context is live.
            assert_eq!(unsafe { ctx_get_on_error(ctx.as_ptr()) }, OnError::from(action));
        }
    }

    #[test]
    fn options_apply_error_action() {
        let registry = Arc::new(Registry::new());
        let ctx = Context::with_options(
            ContextOptions::new()
                .with_error_action(ErrorAction::Continue)
                .with_registry(Arc::clone(&registry)),
        );
        assert_eq!(ctx.error_action(), ErrorAction::Continue);
        assert!(registry.contains(ctx.as_ptr()));
        assert!(Arc::ptr_eq(ctx.registry(), &registry));
    }

    #[test]
    fn take_last_error_clears() {
        let (_, ctx) = isolated();
        ctx.set_error_action(ErrorAction::Continue);
        // SAFETY: the context is live; the text fails to parse so nothing is allocated.
        let raw = unsafe { set_read_from_str(ctx.as_ptr(), "{ A[a] : ") };
        assert!(raw.is_null());
        assert!(ctx.last_error().is_some());
        assert!(ctx.take_last_error().unwrap().starts_with("parse error"));
        assert_eq!(ctx.last_error(), None);
    }

    #[test]
    fn live_objects_track_engine_allocations() {
        let (_, ctx) = isolated();
        assert_eq!(ctx.live_objects(), 0);
        // SAFETY: the context is live.
        unsafe {
            let raw = set_read_from_str(ctx.as_ptr(), "{ A[a] : 0 <= a <= 3 }");
            assert_eq!(ctx.live_objects(), 1);
            set_free(raw);
        }
        assert_eq!(ctx.live_objects(), 0);
    }

    #[test]
    fn failure_takes_the_diagnostic() {
        let (_, ctx) = isolated();
        ctx.set_error_action(ErrorAction::Continue);
        // SAFETY: the context is live; nothing is allocated.
        let raw = unsafe { set_read_from_str(ctx.as_ptr(), "{ A[a] : a + }") };
        assert!(raw.is_null());
        let err = ctx.failure(ErrorKind::ConstructionFailure);
        assert!(err.message().is_some_and(|m| m.starts_with("parse error")));
        assert_eq!(ctx.last_error(), None);
        assert_eq!(ctx.failure(ErrorKind::NoSolution).message(), None);
    }

    #[test]
    fn check_maps_engine_booleans() {
        let (_, ctx) = isolated();
        assert_eq!(ctx.check(Bool::True), Ok(true));
        assert_eq!(ctx.check(Bool::False), Ok(false));
        assert!(ctx.check(Bool::Error).unwrap_err().is_construction_failure());
    }

    #[test]
    fn clones_compare_equal() {
        let (_, a) = isolated();
        let (_, b) = isolated();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn context_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Context>();
    }
}
