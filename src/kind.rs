//! Resource kinds: the per-type behavior table behind [`Handle`](crate::Handle).
//!
//! A kind is a zero-sized marker type that names one family of engine objects and
//! supplies the three functions the generic handle needs: take another reference,
//! drop a reference, and find the owning native context. Nothing else about the
//! kind is visible to the handle or the printer, so adding a kind is a matter of
//! implementing this trait (usually through [`resource_kind!`](crate::resource_kind)).
//!
//! # Example
//!
//! ```rust,ignore
//! pub struct SetKind;
//!
//! isle::resource_kind! {
//!     /// Sets.
//!     SetKind => engine::set::RawSet,
//!     name: "Set",
//!     copy: engine::set::set_copy,
//!     free: engine::set::set_free,
//!     context: engine::set::set_get_ctx,
//! }
//! ```

use crate::engine::Ctx;

/// Behavior table for one family of engine objects.
///
/// # Safety
///
/// Implementors promise that, for every non-null live pointer `p` of type
/// `*mut Self::Raw`:
///
/// - `copy(p)` returns a pointer that owns one new reference to the same object,
/// - `free(p)` releases exactly one reference,
/// - `context_of(p)` returns the live native context `p` was allocated in.
pub unsafe trait ResourceKind: Send + Sync + 'static {
    /// Native object type the pointers point to.
    type Raw;

    /// Human-readable name for error messages and debugging.
    const NAME: &'static str;

    /// Take another reference.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live object of this kind.
    unsafe fn copy(ptr: *mut Self::Raw) -> *mut Self::Raw;

    /// Release one reference.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live object of this kind whose reference the caller owns.
    unsafe fn free(ptr: *mut Self::Raw);

    /// Native context the object was allocated in.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live object of this kind.
    unsafe fn context_of(ptr: *const Self::Raw) -> *mut Ctx;
}

/// Implement [`ResourceKind`] for a marker type from three engine functions.
///
/// The marker type itself is declared by the macro.
#[macro_export]
macro_rules! resource_kind {
    (
        $(#[$meta:meta])*
        $kind:ident => $raw:ty,
        name: $name:literal,
        copy: $copy:path,
        free: $free:path,
        context: $ctx:path $(,)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $kind;

        // SAFETY: the engine functions follow the reference-counting contract.
        unsafe impl $crate::ResourceKind for $kind {
            type Raw = $raw;
            const NAME: &'static str = $name;

            unsafe fn copy(ptr: *mut $raw) -> *mut $raw {
                // SAFETY: forwarded from the caller.
                unsafe { $copy(ptr) }
            }

            unsafe fn free(ptr: *mut $raw) {
                // SAFETY: forwarded from the caller.
                unsafe { $free(ptr) }
            }

            unsafe fn context_of(ptr: *const $raw) -> *mut $crate::engine::Ctx {
                // SAFETY: forwarded from the caller.
                unsafe { $ctx(ptr) }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MapKind, UnionMapKind};
    use crate::set::{BasicSetKind, SetKind, UnionSetKind};
    use crate::value::ValueKind;

    #[test]
    fn resource_kind_names() {
        assert_eq!(SetKind::NAME, "Set");
        assert_eq!(BasicSetKind::NAME, "BasicSet");
        assert_eq!(UnionSetKind::NAME, "UnionSet");
        assert_eq!(MapKind::NAME, "Map");
        assert_eq!(UnionMapKind::NAME, "UnionMap");
        assert_eq!(ValueKind::NAME, "Value");
    }

    #[test]
    fn resource_markers_are_zero_sized() {
        assert_eq!(std::mem::size_of::<SetKind>(), 0);
        assert_eq!(std::mem::size_of::<MapKind>(), 0);
        assert_eq!(std::mem::size_of::<ValueKind>(), 0);
    }

    #[test]
    fn custom_kind_from_engine_functions() {
        crate::resource_kind! {
            /// Raw matrices, declared locally.
            LocalMatrix => crate::engine::mat::RawMat,
            name: "LocalMatrix",
            copy: crate::engine::mat::mat_copy,
            free: crate::engine::mat::mat_free,
            context: crate::engine::mat::mat_get_ctx,
        }
        assert_eq!(LocalMatrix::NAME, "LocalMatrix");
        let _ = format!("{:?}", LocalMatrix);
    }
}
