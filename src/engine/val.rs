//! Rational values.

use super::ctx::Ctx;
use super::object::{refcounted, Obj};
use super::Bool;

/// Payload of a value object: a normalized fraction with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValData {
    pub(crate) num: i64,
    pub(crate) den: i64,
}

pub(crate) fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl ValData {
    pub(crate) fn int(v: i64) -> Self {
        ValData { num: v, den: 1 }
    }

    /// Normalize `num / den`; `None` on a zero denominator or overflow.
    pub(crate) fn ratio(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let g = gcd(num, den).max(1);
        let sign = if den < 0 { -1 } else { 1 };
        Some(ValData {
            num: i64::try_from(sign * num / g).ok()?,
            den: i64::try_from(sign * den / g).ok()?,
        })
    }

    pub(crate) fn add(self, o: Self) -> Option<Self> {
        let (a, b, c, d) = (self.num as i128, self.den as i128, o.num as i128, o.den as i128);
        Self::ratio(a * d + c * b, b * d)
    }

    pub(crate) fn mul(self, o: Self) -> Option<Self> {
        Self::ratio(self.num as i128 * o.num as i128, self.den as i128 * o.den as i128)
    }

    pub(crate) fn neg(self) -> Option<Self> {
        Self::ratio(-(self.num as i128), self.den as i128)
    }

    pub(crate) fn is_int(self) -> bool {
        self.den == 1
    }
}

refcounted!(
    /// Engine value object.
    RawVal = ValData,
    val_copy,
    val_free,
    val_get_ctx
);

/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn val_int_from_si(ctx: *mut Ctx, v: i64) -> *mut RawVal {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::alloc(ctx, ValData::int(v)) }
}

/// Allocate `num / den`; null when `den` is zero.
///
/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn val_rat(ctx: *mut Ctx, num: i64, den: i64) -> *mut RawVal {
    match ValData::ratio(num as i128, den as i128) {
        // SAFETY: forwarded from the caller.
        Some(v) => unsafe { Obj::alloc(ctx, v) },
        None => {
            // SAFETY: forwarded from the caller.
            unsafe { (*ctx).report("division by zero in rational value") };
            std::ptr::null_mut()
        }
    }
}

/// # Safety
///
/// `v` must be a live value (keep).
pub unsafe fn val_get_num_si(v: *const RawVal) -> i64 {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(v) }.num
}

/// # Safety
///
/// `v` must be a live value (keep).
pub unsafe fn val_get_den_si(v: *const RawVal) -> i64 {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(v) }.den
}

/// # Safety
///
/// `v` must be a live value (keep).
pub unsafe fn val_get_d(v: *const RawVal) -> f64 {
    // SAFETY: forwarded from the caller.
    let v = unsafe { Obj::get(v) };
    v.num as f64 / v.den as f64
}

/// # Safety
///
/// `v` must be a live value (keep).
pub unsafe fn val_is_int(v: *const RawVal) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(v) }.is_int().into()
}

/// # Safety
///
/// Both pointers must be live values (keep, keep).
pub unsafe fn val_eq(a: *const RawVal, b: *const RawVal) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(a) == Obj::get(b) }.into()
}

unsafe fn binary(
    a: *mut RawVal,
    b: *mut RawVal,
    op: fn(ValData, ValData) -> Option<ValData>,
) -> *mut RawVal {
    if a.is_null() || b.is_null() {
        // SAFETY: both are null or owned by the caller.
        unsafe {
            val_free(a);
            val_free(b);
        }
        return std::ptr::null_mut();
    }
    // SAFETY: both are live and owned by the caller.
    unsafe {
        let rhs = Obj::take(b);
        let a = Obj::make_unique(a);
        match op(*Obj::get(a), rhs) {
            Some(v) => {
                *Obj::get_mut(a) = v;
                a
            }
            None => {
                Obj::report(a, "integer overflow in value arithmetic");
                val_free(a);
                std::ptr::null_mut()
            }
        }
    }
}

/// `a + b` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live values owned by the caller.
pub unsafe fn val_add(a: *mut RawVal, b: *mut RawVal) -> *mut RawVal {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, ValData::add) }
}

/// `a - b` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live values owned by the caller.
pub unsafe fn val_sub(a: *mut RawVal, b: *mut RawVal) -> *mut RawVal {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, |x, y| x.add(y.neg()?)) }
}

/// `a * b` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live values owned by the caller.
pub unsafe fn val_mul(a: *mut RawVal, b: *mut RawVal) -> *mut RawVal {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, ValData::mul) }
}

/// `-v` (take).
///
/// # Safety
///
/// `v` must be null or a live value owned by the caller.
pub unsafe fn val_neg(v: *mut RawVal) -> *mut RawVal {
    if v.is_null() {
        return v;
    }
    // SAFETY: caller owns `v`.
    unsafe {
        let v = Obj::make_unique(v);
        match Obj::get(v).neg() {
            Some(n) => {
                *Obj::get_mut(v) = n;
                v
            }
            None => {
                Obj::report(v, "integer overflow in value negation");
                val_free(v);
                std::ptr::null_mut()
            }
        }
    }
}
