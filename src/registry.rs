//! Identity map from native context pointers to their shared [`Context`].
//!
//! Handles only ever see a raw resource pointer, and from it the native context
//! pointer that resource lives in. The registry turns that pointer back into the
//! one shared [`Context`] that owns it, so two handles recovered independently
//! share a lifecycle instead of racing to free the same native context.
//!
//! Entries are weak: the registry never keeps a context alive. When the last
//! [`Context`] clone is dropped, its shared state removes the entry and frees the
//! native context while holding the registry lock, so a concurrent
//! [`Registry::acquire`] either sees the live context or no entry at all. An entry
//! whose owner is mid-teardown is reported as absent and never revived.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use isle::Registry;
//!
//! let registry = Arc::new(Registry::new());
//! let ctx = registry.create_new();
//! let again = registry.lookup(ctx.as_ptr()).unwrap();
//! assert!(ctx.ptr_eq(&again));
//! assert_eq!(registry.len(), 1);
//!
//! drop(ctx);
//! drop(again);
//! assert!(registry.is_empty());
//! ```

use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};

use crate::context::{Context, ContextInner};
use crate::engine::ctx::{ctx_alloc, ctx_free};
use crate::engine::Ctx;

/// Process-wide (or embedder-owned) table of live contexts.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<HashMap<usize, Weak<ContextInner>>>,
}

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

impl Registry {
    /// An empty registry, isolated from the global one.
    pub fn new() -> Self {
        Registry::default()
    }

    /// The lazily constructed process-wide registry.
    ///
    /// It lives for the rest of the process; every context also holds a strong
    /// reference to its registry.
    pub fn global() -> &'static Arc<Registry> {
        GLOBAL.get_or_init(|| Arc::new(Registry::new()))
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<usize, Weak<ContextInner>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("context registry mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// The registered context for `ptr`, never adopting anything.
    ///
    /// Returns `None` for null, for pointers this registry does not know and for
    /// a context whose last owner is being dropped.
    pub fn lookup(&self, ptr: *const Ctx) -> Option<Context> {
        let entries = self.lock();
        let found = entries.get(&(ptr as usize))?.upgrade().map(Context::from_inner);
        #[cfg(feature = "tracing")]
        if found.is_none() {
            tracing::trace!(ctx = ?ptr, "context is being torn down");
        }
        found
    }

    /// The shared context owning `ptr`, adopting it when it is unknown.
    ///
    /// Returns `None` for a null pointer and for a context whose last owner is
    /// being dropped. An unknown pointer is adopted: the returned context owns it
    /// and frees it when the last clone goes away.
    ///
    /// # Safety
    ///
    /// `ptr` must be null, registered in this registry, or a live context from
    /// [`ctx_alloc`] that no other registry (and no other owner) will free.
    pub unsafe fn acquire(self: &Arc<Self>, ptr: *mut Ctx) -> Option<Context> {
        let ptr = NonNull::new(ptr)?;
        let mut entries = self.lock();
        if let Some(weak) = entries.get(&(ptr.as_ptr() as usize)) {
            let found = weak.upgrade().map(Context::from_inner);
            #[cfg(feature = "tracing")]
            if found.is_none() {
                tracing::trace!(ctx = ?ptr, "context is being torn down");
            }
            return found;
        }
        Some(self.register(&mut entries, ptr))
    }

    /// Allocate a new native context and register it.
    ///
    /// Allocation failure is fatal.
    pub fn create_new(self: &Arc<Self>) -> Context {
        let Some(ptr) = NonNull::new(ctx_alloc()) else {
            eprintln!("native context allocation failed");
            std::process::abort();
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(ctx = ?ptr, "allocated native context");
        let mut entries = self.lock();
        self.register(&mut entries, ptr)
    }

    fn register(
        self: &Arc<Self>,
        entries: &mut HashMap<usize, Weak<ContextInner>>,
        ptr: NonNull<Ctx>,
    ) -> Context {
        let inner = Arc::new(ContextInner::new(ptr, Arc::clone(self)));
        entries.insert(ptr.as_ptr() as usize, Arc::downgrade(&inner));
        #[cfg(feature = "tracing")]
        tracing::trace!(ctx = ?ptr, live = entries.len(), "registered context");
        Context::from_inner(inner)
    }

    /// Free the native context and remove its entry.
    ///
    /// Called from the shared state's destructor, after its strong count reached
    /// zero. When the engine refuses because objects still live in the context,
    /// the dead entry stays behind: those objects then resolve to a detached
    /// context instead of being adopted into a new owner.
    pub(crate) fn release(&self, ptr: *mut Ctx) {
        let mut entries = self.lock();
        // SAFETY: the last owner is gone and the lock keeps `acquire` from
        // handing the pointer out while it is freed.
        let freed = unsafe { ctx_free(ptr) };
        if !freed {
            #[cfg(feature = "tracing")]
            tracing::warn!(ctx = ?ptr, "native context still has live objects, leaving it detached");
            return;
        }
        if entries.get(&(ptr as usize)).is_some_and(|w| w.strong_count() == 0) {
            entries.remove(&(ptr as usize));
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(ctx = ?ptr, live = entries.len(), "freed native context");
    }

    /// Number of registered contexts, including ones mid-teardown.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no context is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `ptr` has an entry.
    pub fn contains(&self, ptr: *const Ctx) -> bool {
        self.lock().contains_key(&(ptr as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ctx::ctx_set_on_error;
    use crate::engine::OnError;
    use std::thread;

    #[test]
    fn acquire_null_is_absent() {
        let registry = Arc::new(Registry::new());
        // SAFETY: null is always accepted.
        assert!(unsafe { registry.acquire(std::ptr::null_mut()) }.is_none());
        assert!(registry.lookup(std::ptr::null()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn acquire_deduplicates_live_contexts() {
        let registry = Arc::new(Registry::new());
        let ctx = registry.create_new();
        // SAFETY: the pointer is registered here.
        let a = unsafe { registry.acquire(ctx.as_ptr()) }.unwrap();
        let b = registry.lookup(ctx.as_ptr()).unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(ctx.strong_count(), 3);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn last_drop_erases_entry() {
        let registry = Arc::new(Registry::new());
        let ctx = registry.create_new();
        let ptr = ctx.as_ptr();
        let clone = ctx.clone();
        drop(ctx);
        assert!(registry.contains(ptr));
        drop(clone);
        assert!(!registry.contains(ptr));
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_pointer_is_adopted() {
        let registry = Arc::new(Registry::new());
        let raw = ctx_alloc();
        // SAFETY: `raw` is fresh and owned by nobody else.
        let ctx = unsafe { registry.acquire(raw) }.unwrap();
        assert_eq!(ctx.as_ptr(), raw);
        assert!(registry.contains(raw));
        drop(ctx);
        assert!(!registry.contains(raw));
    }

    #[test]
    fn lookup_never_adopts() {
        let owner = Arc::new(Registry::new());
        let other = Arc::new(Registry::new());
        let ctx = owner.create_new();
        assert!(other.lookup(ctx.as_ptr()).is_none());
        assert!(other.is_empty());
        drop(ctx);
        assert!(owner.is_empty());
    }

    #[test]
    fn dead_entry_is_not_revived() {
        let registry = Arc::new(Registry::new());
        let raw = ctx_alloc();
        registry.lock().insert(raw as usize, Weak::new());
        // SAFETY: the pointer is registered here.
        assert!(unsafe { registry.acquire(raw) }.is_none());
        assert!(registry.lookup(raw).is_none());
        assert!(registry.contains(raw));
        registry.lock().clear();
        // SAFETY: `raw` was never handed to a context.
        unsafe { ctx_free(raw) };
    }

    #[test]
    fn context_with_live_objects_stays_detached() {
        let registry = Arc::new(Registry::new());
        let ctx = registry.create_new();
        let ptr = ctx.as_ptr();
        // SAFETY: the context is live; the count is restored below.
        unsafe {
            ctx_set_on_error(ptr, OnError::Continue);
            (*ptr).object_allocated();
        }
        drop(ctx);
        assert!(registry.contains(ptr));
        assert!(registry.lookup(ptr).is_none());
        // SAFETY: the engine refused to free the context, so it is still live.
        assert!(unsafe { registry.acquire(ptr) }.is_none());
        // SAFETY: still allocated; nothing else references it now.
        unsafe {
            (*ptr).object_freed();
            assert!(ctx_free(ptr));
        }
    }

    #[test]
    fn registries_are_isolated() {
        let a = Arc::new(Registry::new());
        let b = Arc::new(Registry::new());
        let ctx = a.create_new();
        assert!(a.contains(ctx.as_ptr()));
        assert!(!b.contains(ctx.as_ptr()));
    }

    #[test]
    fn concurrent_acquire_yields_one_context() {
        let registry = Arc::new(Registry::new());
        let ctx = registry.create_new();
        let addr = ctx.as_ptr() as usize;
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    // SAFETY: the pointer is registered here and kept alive by `ctx`.
                    let found = unsafe { registry.acquire(addr as *mut Ctx) }.unwrap();
                    found.as_ptr() as usize
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), addr);
        }
        assert_eq!(ctx.strong_count(), 1);
        assert_eq!(registry.len(), 1);
    }
}
