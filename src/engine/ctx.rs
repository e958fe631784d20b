//! Native contexts: the arena every engine object is allocated in.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// What the engine does after detecting an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum OnError {
    /// Record the error and return null/error silently.
    Continue = 0,
    /// Record the error, emit a warning, and return null/error.
    #[default]
    Warn = 1,
    /// Print the error and abort the process.
    Abort = 2,
}

impl OnError {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => OnError::Continue,
            2 => OnError::Abort,
            _ => OnError::Warn,
        }
    }
}

/// A native context.
///
/// Identity is the pointer returned by [`ctx_alloc`]. The struct itself is
/// opaque to callers; only the functions in this module touch it.
#[derive(Debug)]
pub struct Ctx {
    on_error: AtomicU8,
    last_error: Mutex<Option<String>>,
    live: AtomicUsize,
}

impl Ctx {
    pub(crate) fn object_allocated(&self) {
        self.live.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn object_freed(&self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }

    /// Report an error according to the configured policy.
    pub(crate) fn report(&self, message: impl Into<String>) {
        let message = message.into();
        match OnError::from_u8(self.on_error.load(Ordering::Acquire)) {
            OnError::Continue => {}
            OnError::Warn => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %message, "engine error");
                #[cfg(not(feature = "tracing"))]
                eprintln!("engine error: {}", message);
            }
            OnError::Abort => {
                eprintln!("engine error (aborting): {}", message);
                std::process::abort();
            }
        }
        *self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(message);
    }
}

/// Allocate a fresh context with the default [`OnError::Warn`] policy.
///
/// Never returns null; allocation failure aborts like any Rust allocation.
pub fn ctx_alloc() -> *mut Ctx {
    Box::into_raw(Box::new(Ctx {
        on_error: AtomicU8::new(OnError::default() as u8),
        last_error: Mutex::new(None),
        live: AtomicUsize::new(0),
    }))
}

/// Free a context (take).
///
/// A context that still has live objects is reported and left allocated, since
/// those objects keep pointing into it. Returns whether the context was freed.
///
/// # Safety
///
/// `ctx` must be null or a pointer returned by [`ctx_alloc`] that was not freed.
pub unsafe fn ctx_free(ctx: *mut Ctx) -> bool {
    if ctx.is_null() {
        return false;
    }
    // SAFETY: caller guarantees `ctx` is a live context.
    let live = unsafe { (*ctx).live.load(Ordering::Acquire) };
    if live > 0 {
        // SAFETY: as above.
        unsafe { (*ctx).report(format!("context not freed: {} objects still reference it", live)) };
        return false;
    }
    // SAFETY: allocated by `ctx_alloc` via `Box::into_raw`, freed exactly once.
    drop(unsafe { Box::from_raw(ctx) });
    true
}

/// Set the error policy (keep).
///
/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn ctx_set_on_error(ctx: *const Ctx, policy: OnError) {
    // SAFETY: caller guarantees `ctx` is live.
    unsafe { (*ctx).on_error.store(policy as u8, Ordering::Release) };
}

/// Read the error policy (keep).
///
/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn ctx_get_on_error(ctx: *const Ctx) -> OnError {
    // SAFETY: caller guarantees `ctx` is live.
    OnError::from_u8(unsafe { (*ctx).on_error.load(Ordering::Acquire) })
}

/// The message of the most recent error reported to `ctx` (keep).
///
/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn ctx_last_error(ctx: *const Ctx) -> Option<String> {
    // SAFETY: caller guarantees `ctx` is live.
    unsafe { &*ctx }
        .last_error
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Forget the recorded error (keep).
///
/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn ctx_reset_error(ctx: *const Ctx) {
    // SAFETY: caller guarantees `ctx` is live.
    *unsafe { &*ctx }
        .last_error
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = None;
}

/// Number of engine objects currently allocated in `ctx` (keep).
///
/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn ctx_live_objects(ctx: *const Ctx) -> usize {
    // SAFETY: caller guarantees `ctx` is live.
    unsafe { (*ctx).live.load(Ordering::Acquire) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_warn() {
        let ctx = ctx_alloc();
        unsafe {
            assert_eq!(ctx_get_on_error(ctx), OnError::Warn);
            ctx_free(ctx);
        }
    }

    #[test]
    fn policy_round_trips() {
        let ctx = ctx_alloc();
        unsafe {
            for policy in [OnError::Continue, OnError::Abort, OnError::Warn] {
                ctx_set_on_error(ctx, policy);
                assert_eq!(ctx_get_on_error(ctx), policy);
            }
            ctx_free(ctx);
        }
    }

    #[test]
    fn free_refuses_while_objects_are_live() {
        let ctx = ctx_alloc();
        unsafe {
            ctx_set_on_error(ctx, OnError::Continue);
            (*ctx).object_allocated();
            assert!(!ctx_free(ctx));
            assert!(ctx_last_error(ctx).is_some_and(|m| m.contains("1 objects")));
            (*ctx).object_freed();
            assert!(ctx_free(ctx));
        }
    }

    #[test]
    fn report_records_last_error() {
        let ctx = ctx_alloc();
        unsafe {
            ctx_set_on_error(ctx, OnError::Continue);
            assert_eq!(ctx_last_error(ctx), None);
            (*ctx).report("first");
            (*ctx).report("second");
            assert_eq!(ctx_last_error(ctx).as_deref(), Some("second"));
            ctx_reset_error(ctx);
            assert_eq!(ctx_last_error(ctx), None);
            ctx_free(ctx);
        }
    }
}
