//! Reference-counted object header shared by every engine type.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::ctx::Ctx;

/// Heap cell behind every engine pointer.
///
/// The count lives in the cell, so copying a pointer is a counter bump and the
/// last `free` drops the value and tells the owning context.
#[derive(Debug)]
pub struct Obj<T> {
    refs: AtomicUsize,
    ctx: *mut Ctx,
    value: T,
}

impl<T> Obj<T> {
    /// Allocate a new object with a count of one.
    ///
    /// # Safety
    ///
    /// `ctx` must be a live context.
    pub(crate) unsafe fn alloc(ctx: *mut Ctx, value: T) -> *mut Self {
        // SAFETY: caller guarantees `ctx` is live.
        unsafe { (*ctx).object_allocated() };
        Box::into_raw(Box::new(Obj {
            refs: AtomicUsize::new(1),
            ctx,
            value,
        }))
    }

    /// Bump the count and hand back the same pointer. Null stays null.
    ///
    /// # Safety
    ///
    /// `p` must be null or a live object.
    pub(crate) unsafe fn copy(p: *mut Self) -> *mut Self {
        if !p.is_null() {
            // SAFETY: caller guarantees `p` is live.
            unsafe { (*p).refs.fetch_add(1, Ordering::Relaxed) };
        }
        p
    }

    /// Drop one reference; the last one frees the cell.
    ///
    /// # Safety
    ///
    /// `p` must be null or a live object whose reference the caller owns.
    pub(crate) unsafe fn free(p: *mut Self) {
        if p.is_null() {
            return;
        }
        // SAFETY: caller owns one reference to a live object.
        if unsafe { (*p).refs.fetch_sub(1, Ordering::AcqRel) } != 1 {
            return;
        }
        // SAFETY: the count reached zero, so this is the only pointer left.
        let cell = unsafe { Box::from_raw(p) };
        let ctx = cell.ctx;
        drop(cell);
        // SAFETY: a context outlives every object allocated in it.
        unsafe { (*ctx).object_freed() };
    }

    /// # Safety
    ///
    /// `p` must be a live object.
    pub(crate) unsafe fn ctx(p: *const Self) -> *mut Ctx {
        // SAFETY: caller guarantees `p` is live.
        unsafe { (*p).ctx }
    }

    /// Borrow the payload.
    ///
    /// # Safety
    ///
    /// `p` must be a live object that outlives `'a` and is not mutated meanwhile.
    pub(crate) unsafe fn get<'a>(p: *const Self) -> &'a T {
        // SAFETY: caller guarantees liveness for `'a`.
        unsafe { &(*p).value }
    }

    /// Report an error against the object's context.
    ///
    /// # Safety
    ///
    /// `p` must be a live object.
    pub(crate) unsafe fn report(p: *const Self, message: impl Into<String>) {
        // SAFETY: caller guarantees `p` is live; its context outlives it.
        unsafe { (*(*p).ctx).report(message) };
    }
}

impl<T: Clone> Obj<T> {
    /// Copy-on-write access to a taken pointer.
    ///
    /// Returns a pointer with a count of one: `p` itself when it was unique,
    /// otherwise a fresh duplicate (and `p`'s reference is released).
    ///
    /// # Safety
    ///
    /// `p` must be a live object whose reference the caller owns.
    pub(crate) unsafe fn make_unique(p: *mut Self) -> *mut Self {
        // SAFETY: caller owns a reference to a live object.
        if unsafe { (*p).refs.load(Ordering::Acquire) } == 1 {
            return p;
        }
        // SAFETY: as above; the duplicate is allocated in the same context.
        unsafe {
            let dup = Self::alloc((*p).ctx, (*p).value.clone());
            Self::free(p);
            dup
        }
    }

    /// Mutable access to a pointer returned by [`Obj::make_unique`].
    ///
    /// # Safety
    ///
    /// `p` must be a live object with a count of one.
    pub(crate) unsafe fn get_mut<'a>(p: *mut Self) -> &'a mut T {
        // SAFETY: caller guarantees uniqueness.
        unsafe { &mut (*p).value }
    }

    /// Consume a taken pointer and return its payload.
    ///
    /// # Safety
    ///
    /// `p` must be a live object whose reference the caller owns.
    pub(crate) unsafe fn take(p: *mut Self) -> T {
        // SAFETY: caller owns a reference; cloning before the release keeps the
        // payload valid even when this was the last reference.
        unsafe {
            let value = (*p).value.clone();
            Self::free(p);
            value
        }
    }
}

/// Build a new object from a borrowed one (keep). Failures are reported.
///
/// # Safety
///
/// `a` must be a live object.
pub(crate) unsafe fn derive<A, R>(a: *const Obj<A>, op: impl FnOnce(&A) -> Result<R, String>) -> *mut Obj<R> {
    // SAFETY: caller guarantees `a` is live.
    unsafe {
        let ctx = Obj::ctx(a);
        match op(Obj::get(a)) {
            Ok(value) => Obj::alloc(ctx, value),
            Err(message) => {
                (*ctx).report(message);
                std::ptr::null_mut()
            }
        }
    }
}

/// Consume `a` and build a new object from it (take).
///
/// # Safety
///
/// `a` must be null or a live object whose reference the caller owns.
pub(crate) unsafe fn unary<A, R>(a: *mut Obj<A>, op: impl FnOnce(&A) -> Result<R, String>) -> *mut Obj<R> {
    if a.is_null() {
        return std::ptr::null_mut();
    }
    // SAFETY: caller owns `a`; it is released after `op` is done with it.
    unsafe {
        let out = derive(a, op);
        Obj::free(a);
        out
    }
}

/// Consume `a` and `b` and build a new object in `a`'s context (take, take).
///
/// # Safety
///
/// Both pointers must be null or live objects whose references the caller owns.
pub(crate) unsafe fn binary<A, B, R>(
    a: *mut Obj<A>,
    b: *mut Obj<B>,
    op: impl FnOnce(&A, &B) -> Result<R, String>,
) -> *mut Obj<R> {
    if a.is_null() || b.is_null() {
        // SAFETY: both are null or owned by the caller.
        unsafe {
            Obj::free(a);
            Obj::free(b);
        }
        return std::ptr::null_mut();
    }
    // SAFETY: caller owns both; they are released after `op` is done with them.
    unsafe {
        let rhs = Obj::get(b);
        let out = derive(a, |lhs| op(lhs, rhs));
        Obj::free(a);
        Obj::free(b);
        out
    }
}

/// Evaluate a predicate on two borrowed objects (keep, keep).
///
/// # Safety
///
/// Both pointers must be live objects.
pub(crate) unsafe fn predicate<A, B>(
    a: *const Obj<A>,
    b: *const Obj<B>,
    op: impl FnOnce(&A, &B) -> Result<bool, String>,
) -> super::Bool {
    // SAFETY: caller guarantees liveness.
    unsafe {
        match op(Obj::get(a), Obj::get(b)) {
            Ok(v) => v.into(),
            Err(message) => {
                Obj::report(a, message);
                super::Bool::Error
            }
        }
    }
}

/// Engine-level reference count of `p` (keep).
///
/// # Safety
///
/// `p` must be a live object.
pub unsafe fn ref_count<T>(p: *const Obj<T>) -> usize {
    // SAFETY: caller guarantees `p` is live.
    unsafe { (*p).refs.load(Ordering::Acquire) }
}

/// Generate the `copy`/`free`/`get_ctx` triple for an engine type.
macro_rules! refcounted {
    ($(#[$meta:meta])* $raw:ident = $data:ty, $copy:ident, $free:ident, $get_ctx:ident) => {
        $(#[$meta])*
        pub type $raw = $crate::engine::Obj<$data>;

        /// Take another reference (keep). Null in, null out.
        ///
        /// # Safety
        ///
        /// `p` must be null or a live object.
        pub unsafe fn $copy(p: *mut $raw) -> *mut $raw {
            // SAFETY: forwarded from the caller.
            unsafe { $crate::engine::Obj::copy(p) }
        }

        /// Release a reference (take). Null is ignored.
        ///
        /// # Safety
        ///
        /// `p` must be null or a live object whose reference the caller owns.
        pub unsafe fn $free(p: *mut $raw) {
            // SAFETY: forwarded from the caller.
            unsafe { $crate::engine::Obj::free(p) }
        }

        /// The context `p` was allocated in (keep).
        ///
        /// # Safety
        ///
        /// `p` must be a live object.
        pub unsafe fn $get_ctx(p: *const $raw) -> *mut $crate::engine::Ctx {
            // SAFETY: forwarded from the caller.
            unsafe { $crate::engine::Obj::ctx(p) }
        }
    };
}

pub(crate) use refcounted;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ctx::{ctx_alloc, ctx_free, ctx_live_objects};

    #[test]
    fn copy_and_free_balance() {
        let ctx = ctx_alloc();
        unsafe {
            let p = Obj::alloc(ctx, 7_i64);
            assert_eq!(ctx_live_objects(ctx), 1);
            let q = Obj::copy(p);
            assert_eq!(p, q);
            assert_eq!(ref_count(p), 2);
            Obj::free(q);
            assert_eq!(ref_count(p), 1);
            Obj::free(p);
            assert_eq!(ctx_live_objects(ctx), 0);
            ctx_free(ctx);
        }
    }

    #[test]
    fn make_unique_duplicates_shared_objects() {
        let ctx = ctx_alloc();
        unsafe {
            let p = Obj::alloc(ctx, vec![1, 2, 3]);
            let shared = Obj::copy(p);
            let unique = Obj::make_unique(shared);
            assert_ne!(unique, p);
            Obj::get_mut(unique).push(4);
            assert_eq!(Obj::get(p), &vec![1, 2, 3]);
            assert_eq!(Obj::get(unique), &vec![1, 2, 3, 4]);
            assert_eq!(ref_count(p), 1);
            Obj::free(unique);
            Obj::free(p);
            assert_eq!(ctx_live_objects(ctx), 0);
            ctx_free(ctx);
        }
    }

    #[test]
    fn make_unique_reuses_unique_objects() {
        let ctx = ctx_alloc();
        unsafe {
            let p = Obj::alloc(ctx, 1_u8);
            assert_eq!(Obj::make_unique(p), p);
            Obj::free(p);
            ctx_free(ctx);
        }
    }
}
