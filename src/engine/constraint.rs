//! Single affine constraints.

use super::aff::{AffData, RawAff};
use super::boxes::{restriction, Restriction};
use super::object::{refcounted, Obj};
use super::Bool;

/// Payload of a constraint: `aff == 0` or `aff >= 0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintData {
    pub(crate) aff: AffData,
    pub(crate) equality: bool,
}

impl ConstraintData {
    /// How the constraint cuts a box; fails when it couples dimensions.
    pub(crate) fn restriction(&self) -> Result<Restriction, String> {
        restriction(&self.aff.coeffs, self.aff.constant, self.equality)
    }
}

refcounted!(
    /// Engine constraint object.
    RawConstraint = ConstraintData,
    constraint_copy,
    constraint_free,
    constraint_get_ctx
);

unsafe fn from_aff(aff: *mut RawAff, equality: bool) -> *mut RawConstraint {
    if aff.is_null() {
        return std::ptr::null_mut();
    }
    // SAFETY: caller owns `aff`.
    unsafe {
        let ctx = Obj::ctx(aff);
        let aff = Obj::take(aff);
        Obj::alloc(ctx, ConstraintData { aff, equality })
    }
}

/// `aff == 0` (take).
///
/// # Safety
///
/// `aff` must be null or a live expression owned by the caller.
pub unsafe fn equality_from_aff(aff: *mut RawAff) -> *mut RawConstraint {
    // SAFETY: forwarded from the caller.
    unsafe { from_aff(aff, true) }
}

/// `aff >= 0` (take).
///
/// # Safety
///
/// `aff` must be null or a live expression owned by the caller.
pub unsafe fn inequality_from_aff(aff: *mut RawAff) -> *mut RawConstraint {
    // SAFETY: forwarded from the caller.
    unsafe { from_aff(aff, false) }
}

/// # Safety
///
/// `c` must be a live constraint (keep).
pub unsafe fn constraint_is_equality(c: *const RawConstraint) -> Bool {
    // SAFETY: caller guarantees liveness.
    unsafe { Obj::get(c) }.equality.into()
}

/// The constrained expression (keep).
///
/// # Safety
///
/// `c` must be a live constraint.
pub unsafe fn constraint_get_aff(c: *const RawConstraint) -> *mut RawAff {
    // SAFETY: caller guarantees liveness.
    unsafe { Obj::alloc(Obj::ctx(c), Obj::get(c).aff.clone()) }
}
