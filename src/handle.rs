//! The generic owning handle.
//!
//! [`Handle<K>`] owns exactly one engine reference to a resource of kind `K`
//! together with the [`Context`] the resource lives in. All lifetime behavior
//! (copy, assignment, release) is written once here in terms of the kind's
//! [`ResourceKind`] functions; the per-kind modules only add algebra.
//!
//! Engine calls follow one of two shapes:
//!
//! - *clone first*: the method borrows `&self` and hands the engine a fresh
//!   reference from [`Handle::copy_raw`], leaving `self` untouched;
//! - *destructive*: the method consumes `self`, hands over its own reference, and
//!   wraps whatever comes back.
//!
//! Every pointer coming back from the engine goes through [`Handle::adopt`], so a
//! handle never wraps null.
//!
//! # Example
//!
//! ```
//! use isle::{Context, Set};
//!
//! let ctx = Context::new();
//! let a = Set::parse(&ctx, "{ A[i] : 0 <= i <= 9 }")?;
//! let b = a.clone();
//! assert!(a.ptr_eq(&b));
//! assert_eq!(a.ref_count(), 2);
//! # Ok::<(), isle::Error>(())
//! ```

use std::fmt;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::context::Context;
use crate::engine::{ref_count, Obj};
use crate::error::{Error, ErrorKind, Result};
use crate::kind::ResourceKind;
use crate::registry::Registry;

/// One owned reference to an engine resource of kind `K`.
pub struct Handle<K: ResourceKind> {
    ctx: Context,
    ptr: NonNull<K::Raw>,
}

// SAFETY: a handle owns its reference exclusively and the engine's reference
// counts are atomic. Shared access from several threads is not allowed (no `Sync`).
unsafe impl<K: ResourceKind> Send for Handle<K> {}

impl<K: ResourceKind> Handle<K> {
    /// Adopt `ptr`, recovering its context through the global registry.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::ConstructionFailure`] for null and
    /// [`ErrorKind::DetachedContext`] when the owning context is being torn down
    /// (the reference is released in that case).
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live resource of kind `K` whose reference the
    /// caller owns. Its native context must be registered in the global registry,
    /// or in no registry and owned by nobody else (it is then adopted).
    pub unsafe fn from_raw(ptr: *mut K::Raw) -> Result<Self> {
        // SAFETY: forwarded from the caller.
        unsafe { Self::from_raw_with(Registry::global(), ptr) }
    }

    /// Like [`Handle::from_raw`], looking the context up in `registry`.
    ///
    /// # Safety
    ///
    /// As for [`Handle::from_raw`], with `registry` in place of the global one.
    pub unsafe fn from_raw_with(registry: &Arc<Registry>, ptr: *mut K::Raw) -> Result<Self> {
        let Some(ptr) = NonNull::new(ptr) else {
            return Err(Error::new(ErrorKind::ConstructionFailure)
                .context(format!("adopting a null {}", K::NAME)));
        };
        // SAFETY: caller guarantees `ptr` is live.
        let native = unsafe { K::context_of(ptr.as_ptr()) };
        // SAFETY: the caller vouches for the native context's ownership.
        match unsafe { registry.acquire(native) } {
            Some(ctx) => {
                ctx.reattach();
                Ok(Handle { ctx, ptr })
            }
            None => {
                // SAFETY: the reference is ours; the context stays allocated
                // while the object is live.
                unsafe { K::free(ptr.as_ptr()) };
                Err(Error::new(ErrorKind::DetachedContext)
                    .with_message(format!("{:p}", native))
                    .context(format!("adopting {}", K::NAME)))
            }
        }
    }

    /// Adopt `ptr`, which belongs to `ctx`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::ConstructionFailure`] carrying the engine's last diagnostic
    /// when `ptr` is null, or naming both contexts when `ptr` lives in another
    /// one (the reference is released in that case).
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live resource of kind `K` whose reference the
    /// caller owns.
    pub unsafe fn from_raw_in(ctx: &Context, ptr: *mut K::Raw) -> Result<Self> {
        if let Some(live) = NonNull::new(ptr) {
            // SAFETY: caller guarantees `ptr` is live.
            let native = unsafe { K::context_of(live.as_ptr()) };
            if native != ctx.as_ptr() {
                // SAFETY: the reference is ours and its own context is still
                // allocated while the object is live.
                unsafe { K::free(live.as_ptr()) };
                return Err(Error::new(ErrorKind::ConstructionFailure)
                    .with_message(format!("{} lives in context {:p}, not {:p}", K::NAME, native, ctx.as_ptr()))
                    .context(format!("adopting {}", K::NAME)));
            }
            ctx.reattach();
        }
        Self::adopt(ctx, ptr)
    }

    /// Wrap the result of an engine call made in `ctx`.
    pub(crate) fn adopt(ctx: &Context, ptr: *mut K::Raw) -> Result<Self> {
        match NonNull::new(ptr) {
            Some(ptr) => Ok(Handle {
                ctx: ctx.clone(),
                ptr,
            }),
            None => Err(ctx.failure(ErrorKind::ConstructionFailure)),
        }
    }

    /// Run an optimization or sampling query and wrap its result.
    ///
    /// The engine returns null without a diagnostic when there is no answer, so
    /// any diagnostic left over from earlier calls is cleared before `query` runs.
    pub(crate) fn adopt_solution(ctx: &Context, query: impl FnOnce() -> *mut K::Raw) -> Result<Self> {
        ctx.clear_last_error();
        match NonNull::new(query()) {
            Some(ptr) => Ok(Handle {
                ctx: ctx.clone(),
                ptr,
            }),
            None => match ctx.take_last_error() {
                Some(message) => Err(Error::new(ErrorKind::ConstructionFailure).with_message(message)),
                None => Err(Error::new(ErrorKind::NoSolution)),
            },
        }
    }

    /// Hand our reference to a consuming engine call and wrap its result.
    pub(crate) fn consume<R: ResourceKind>(self, call: impl FnOnce(*mut K::Raw) -> *mut R::Raw) -> Result<Handle<R>> {
        let ctx = self.ctx.clone();
        Handle::adopt(&ctx, call(self.into_raw()))
    }

    /// Apply a consuming engine call to a fresh reference and replace `self`
    /// with the result. On failure `self` is left as it was.
    pub(crate) fn update(&mut self, call: impl FnOnce(*mut K::Raw) -> *mut K::Raw) -> Result<()> {
        let updated = Self::adopt(&self.ctx, call(self.copy_raw()))?;
        *self = updated;
        Ok(())
    }

    /// The resource pointer, still owned by `self`.
    pub fn as_ptr(&self) -> *mut K::Raw {
        self.ptr.as_ptr()
    }

    /// A new owned reference for an engine call that consumes its argument.
    pub fn copy_raw(&self) -> *mut K::Raw {
        // SAFETY: `self.ptr` is live for as long as `self`.
        unsafe { K::copy(self.ptr.as_ptr()) }
    }

    /// Give up ownership without releasing the reference.
    ///
    /// The caller becomes responsible for the reference. The handle's
    /// [`Context`] reference is parked in the context, so the native context
    /// outlives the detached object; the next [`Handle::from_raw`] or
    /// [`Handle::from_raw_in`] for that context takes it back.
    pub fn into_raw(self) -> *mut K::Raw {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never used or dropped again, so the context is
        // moved out exactly once.
        let ctx = unsafe { std::ptr::read(&this.ctx) };
        ctx.detach();
        this.ptr.as_ptr()
    }

    /// The context the resource lives in.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Whether both handles reference the same engine object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }

    /// Point `self` at `other`'s resource.
    ///
    /// Equal pointers (including `other` being `self`) are a no-op; otherwise the
    /// current reference is released before `other`'s is copied.
    pub fn assign(&mut self, other: &Self) {
        self.clone_from(other);
    }
}

impl<K, T> Handle<K>
where
    K: ResourceKind<Raw = Obj<T>>,
{
    /// Engine-level reference count of the resource.
    pub fn ref_count(&self) -> usize {
        // SAFETY: `self.ptr` is live for as long as `self`.
        unsafe { ref_count(self.ptr.as_ptr()) }
    }
}

impl<K: ResourceKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        // SAFETY: `copy` on a live object returns a non-null owning pointer.
        let ptr = unsafe { NonNull::new_unchecked(self.copy_raw()) };
        Handle {
            ctx: self.ctx.clone(),
            ptr,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.ptr == source.ptr {
            return;
        }
        // SAFETY: we own one reference to `self.ptr`; it is replaced right after.
        unsafe { K::free(self.ptr.as_ptr()) };
        // SAFETY: as in `clone`.
        self.ptr = unsafe { NonNull::new_unchecked(source.copy_raw()) };
        self.ctx = source.ctx.clone();
    }
}

impl<K: ResourceKind> Drop for Handle<K> {
    fn drop(&mut self) {
        // SAFETY: we own one reference; the context field outlives this call.
        unsafe { K::free(self.ptr.as_ptr()) }
    }
}

impl<K: ResourceKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &K::NAME)
            .field("ptr", &self.ptr)
            .field("ctx", &self.ctx.as_ptr())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextOptions, ErrorAction};
    use crate::engine::set::{set_get_ctx, set_read_from_str, set_union};
    use crate::set::{Set, SetKind};

    fn setup() -> (Arc<Registry>, Context) {
        let registry = Arc::new(Registry::new());
        let ctx = Context::with_options(
            ContextOptions::new()
                .with_error_action(ErrorAction::Continue)
                .with_registry(Arc::clone(&registry)),
        );
        (registry, ctx)
    }

    fn raw_set(ctx: &Context, text: &str) -> *mut crate::engine::set::RawSet {
        // SAFETY: the context is live.
        unsafe { set_read_from_str(ctx.as_ptr(), text) }
    }

    #[test]
    fn clone_bumps_engine_refcount() {
        let (_, ctx) = setup();
        let a = Set::parse(&ctx, "{ A[i] : 0 <= i <= 3 }").unwrap();
        assert_eq!(a.ref_count(), 1);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.ref_count(), 2);
        drop(b);
        assert_eq!(a.ref_count(), 1);
    }

    #[test]
    fn self_assignment_is_a_no_op() {
        let (_, ctx) = setup();
        let mut a = Set::parse(&ctx, "{ A[i] : i >= 0 }").unwrap();
        let alias = a.clone();
        a.assign(&alias);
        assert_eq!(a.ref_count(), 2);
        drop(alias);
        assert_eq!(a.ref_count(), 1);
        assert_eq!(ctx.live_objects(), 1);
    }

    #[test]
    fn assignment_releases_old_resource_first() {
        let (_, ctx) = setup();
        let mut a = Set::parse(&ctx, "{ A[i] : i >= 0 }").unwrap();
        let b = Set::parse(&ctx, "{ B[j] : j <= 0 }").unwrap();
        assert_eq!(ctx.live_objects(), 2);
        a.clone_from(&b);
        assert!(a.ptr_eq(&b));
        assert_eq!(ctx.live_objects(), 1);
        assert_eq!(b.ref_count(), 2);
    }

    #[test]
    fn from_raw_recovers_the_registered_context() {
        let (registry, ctx) = setup();
        let raw = raw_set(&ctx, "{ A[i] : i = 1 }");
        // SAFETY: `raw` is a fresh set owned by us.
        let set = unsafe { Handle::<SetKind>::from_raw_with(&registry, raw) }.unwrap();
        assert!(set.context().ptr_eq(&ctx));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn from_raw_null_is_construction_failure() {
        let (registry, _) = setup();
        // SAFETY: null is always accepted.
        let err = unsafe { Handle::<SetKind>::from_raw_with(&registry, std::ptr::null_mut()) }.unwrap_err();
        assert!(err.is_construction_failure());
        assert_eq!(err.context_trail(), &["adopting a null Set"]);
    }

    #[test]
    fn adopt_null_carries_engine_message() {
        let (_, ctx) = setup();
        let raw = raw_set(&ctx, "{ A[i] : i + }");
        let err = Handle::<SetKind>::adopt(&ctx, raw).unwrap_err();
        assert!(err.is_construction_failure());
        assert!(err.message().is_some_and(|m| m.starts_with("parse error")));
    }

    #[test]
    fn adopt_solution_distinguishes_no_answer() {
        let (_, ctx) = setup();
        let err = Handle::<SetKind>::adopt_solution(&ctx, std::ptr::null_mut).unwrap_err();
        assert!(err.is_no_solution());
    }

    #[test]
    fn stale_diagnostic_does_not_turn_no_solution_into_failure() {
        let (registry, ctx) = setup();
        assert!(raw_set(&ctx, "{ A[i] : i + }").is_null());
        // SAFETY: null is always accepted.
        assert!(unsafe { Handle::<SetKind>::from_raw_with(&registry, std::ptr::null_mut()) }.is_err());
        assert!(ctx.last_error().is_some());

        let empty = Set::parse(&ctx, "{ A[i] : i >= 4 and i <= 3 }").unwrap();
        let ls = crate::space::LocalSpace::from_space(&empty.space().unwrap()).unwrap();
        let i = crate::expression::Expression::variable(&ls, crate::engine::DimType::Set, 0).unwrap();
        let err = empty.minimum(&i).unwrap_err();
        assert!(err.is_no_solution(), "{:?}", err);
        assert_eq!(err.message(), None);
    }

    #[test]
    fn into_raw_keeps_the_reference() {
        let (_, ctx) = setup();
        let set = Set::parse(&ctx, "{ A[i] : i = 2 }").unwrap();
        let raw = set.into_raw();
        assert_eq!(ctx.live_objects(), 1);
        // SAFETY: `raw` is the reference we just took back.
        let back = unsafe { Handle::<SetKind>::from_raw_in(&ctx, raw) }.unwrap();
        assert_eq!(back.ref_count(), 1);
        drop(back);
        assert_eq!(ctx.live_objects(), 0);
    }

    #[test]
    fn into_raw_keeps_the_context_alive_past_its_last_handle() {
        let (registry, ctx) = setup();
        let native = ctx.as_ptr();
        let set = Set::parse(&ctx, "{ A[i] : 0 <= i <= 4 }").unwrap();
        drop(ctx);
        let raw = set.into_raw();
        assert!(registry.lookup(native).is_some());

        // SAFETY: `raw` is the reference `into_raw` handed out.
        let back = unsafe { Handle::<SetKind>::from_raw_with(&registry, raw) }.unwrap();
        assert_eq!(back.context().as_ptr(), native);
        assert_eq!(back.context().strong_count(), 1);
        assert_eq!(back.to_string(), "{ A[i] : 0 <= i <= 4 }");
        drop(back);
        assert!(registry.is_empty());
    }

    #[test]
    fn from_raw_in_rejects_a_foreign_context() {
        let (_, home) = setup();
        let (_, other) = setup();
        let raw = raw_set(&home, "{ A[i] : i = 1 }");
        // SAFETY: `raw` is a fresh set owned by us.
        let err = unsafe { Handle::<SetKind>::from_raw_in(&other, raw) }.unwrap_err();
        assert!(err.is_construction_failure());
        assert!(err.message().is_some_and(|m| m.starts_with("Set lives in context")));
        assert_eq!(home.live_objects(), 0);
        assert_eq!(other.live_objects(), 0);
    }

    #[test]
    fn consume_hands_over_the_reference() {
        let (_, ctx) = setup();
        let a = Set::parse(&ctx, "{ A[i] : i = 2 }").unwrap();
        let b = Set::parse(&ctx, "{ A[i] : i = 3 }").unwrap();
        let u: Set = a.consume(|raw| unsafe { set_union(raw, b.copy_raw()) }).unwrap();
        drop(b);
        assert_eq!(ctx.live_objects(), 1);
        // SAFETY: `u` is live.
        assert_eq!(unsafe { set_get_ctx(u.as_ptr()) }, ctx.as_ptr());
    }

    #[test]
    fn handles_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Set>();
    }

    #[test]
    fn debug_names_the_kind() {
        let (_, ctx) = setup();
        let set = Set::parse(&ctx, "{ A[i] }").unwrap();
        assert!(format!("{:?}", set).contains("\"Set\""));
    }
}
