//! Local spaces and quasi-affine expressions.

use super::ctx::Ctx;
use super::object::{refcounted, Obj};
use super::space::{RawSpace, SpaceData};
use super::val::{gcd, RawVal, ValData};
use super::DimType;

/// Payload of a local space: a space that expressions are defined on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalSpaceData(pub(crate) SpaceData);

refcounted!(
    /// Engine local space object.
    RawLocalSpace = LocalSpaceData,
    local_space_copy,
    local_space_free,
    local_space_get_ctx
);

/// Payload of an affine expression: `(coeffs . x + constant) / denom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AffData {
    pub(crate) space: SpaceData,
    pub(crate) coeffs: Vec<i64>,
    pub(crate) constant: i64,
    pub(crate) denom: i64,
}

impl AffData {
    fn zero(space: SpaceData) -> Self {
        let total = space.total();
        AffData {
            space,
            coeffs: vec![0; total],
            constant: 0,
            denom: 1,
        }
    }

    /// Build from wide parts, dividing out common factors.
    fn normalized(space: SpaceData, coeffs: Vec<i128>, constant: i128, denom: i128) -> Option<Self> {
        if denom == 0 {
            return None;
        }
        let g = coeffs.iter().fold(gcd(constant, denom), |g, &c| gcd(g, c)).max(1);
        let sign = if denom < 0 { -1 } else { 1 };
        let narrow = |v: i128| i64::try_from(sign * v / g).ok();
        Some(AffData {
            space,
            coeffs: coeffs.into_iter().map(narrow).collect::<Option<Vec<_>>>()?,
            constant: narrow(constant)?,
            denom: narrow(denom)?,
        })
    }

    fn wide(&self) -> (Vec<i128>, i128, i128) {
        (
            self.coeffs.iter().map(|&c| c as i128).collect(),
            self.constant as i128,
            self.denom as i128,
        )
    }

    fn combine(&self, other: &AffData, negate_other: bool) -> Option<AffData> {
        let (ac, ak, ad) = self.wide();
        let (bc, bk, bd) = other.wide();
        let sign = if negate_other { -1 } else { 1 };
        let coeffs = ac.iter().zip(&bc).map(|(a, b)| a * bd + sign * b * ad).collect();
        Self::normalized(self.space.clone(), coeffs, ak * bd + sign * bk * ad, ad * bd)
    }

    fn scale(&self, v: ValData) -> Option<AffData> {
        let (c, k, d) = self.wide();
        let (n, m) = (v.num as i128, v.den as i128);
        Self::normalized(self.space.clone(), c.iter().map(|x| x * n).collect(), k * n, d * m)
    }

    fn add_constant(&self, v: ValData) -> Option<AffData> {
        let (c, k, d) = self.wide();
        let (n, m) = (v.num as i128, v.den as i128);
        Self::normalized(self.space.clone(), c.iter().map(|x| x * m).collect(), k * m + n * d, d * m)
    }
}

refcounted!(
    /// Engine affine expression object.
    RawAff = AffData,
    aff_copy,
    aff_free,
    aff_get_ctx
);

/// Wrap a space as a local space (take).
///
/// # Safety
///
/// `space` must be null or a live space owned by the caller.
pub unsafe fn local_space_from_space(space: *mut RawSpace) -> *mut RawLocalSpace {
    if space.is_null() {
        return std::ptr::null_mut();
    }
    // SAFETY: caller owns `space`.
    unsafe {
        let ctx = Obj::ctx(space);
        let data = Obj::take(space);
        Obj::alloc(ctx, LocalSpaceData(data))
    }
}

/// The space of a local space (keep).
///
/// # Safety
///
/// `ls` must be a live local space.
pub unsafe fn local_space_get_space(ls: *const RawLocalSpace) -> *mut RawSpace {
    // SAFETY: caller guarantees liveness.
    unsafe { Obj::alloc(Obj::ctx(ls), Obj::get(ls).0.clone()) }
}

/// The zero expression on `ls` (take).
///
/// # Safety
///
/// `ls` must be null or a live local space owned by the caller.
pub unsafe fn aff_zero_on_domain(ls: *mut RawLocalSpace) -> *mut RawAff {
    if ls.is_null() {
        return std::ptr::null_mut();
    }
    // SAFETY: caller owns `ls`.
    unsafe {
        let ctx = Obj::ctx(ls);
        let LocalSpaceData(space) = Obj::take(ls);
        Obj::alloc(ctx, AffData::zero(space))
    }
}

/// The expression equal to dimension `pos` of class `ty` (take `ls`).
///
/// # Safety
///
/// `ls` must be null or a live local space owned by the caller.
pub unsafe fn aff_var_on_domain(ls: *mut RawLocalSpace, ty: DimType, pos: usize) -> *mut RawAff {
    if ls.is_null() {
        return std::ptr::null_mut();
    }
    // SAFETY: caller owns `ls`.
    unsafe {
        let ctx = Obj::ctx(ls);
        let Some(col) = Obj::get(ls).0.column(ty, pos) else {
            Obj::report(ls, format!("position {} out of bounds for {:?}", pos, ty));
            local_space_free(ls);
            return std::ptr::null_mut();
        };
        let LocalSpaceData(space) = Obj::take(ls);
        let mut aff = AffData::zero(space);
        aff.coeffs[col] = 1;
        Obj::alloc(ctx, aff)
    }
}

/// The constant expression `v` on `ls` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live objects owned by the caller.
pub unsafe fn aff_val_on_domain(ls: *mut RawLocalSpace, v: *mut RawVal) -> *mut RawAff {
    if ls.is_null() || v.is_null() {
        // SAFETY: both are null or owned by the caller.
        unsafe {
            local_space_free(ls);
            Obj::free(v);
        }
        return std::ptr::null_mut();
    }
    // SAFETY: caller owns both.
    unsafe {
        let ctx = Obj::ctx(ls);
        let LocalSpaceData(space) = Obj::take(ls);
        let v = Obj::take(v);
        let mut aff = AffData::zero(space);
        aff.constant = v.num;
        aff.denom = v.den;
        Obj::alloc(ctx, aff)
    }
}

unsafe fn update(aff: *mut RawAff, op: impl FnOnce(&AffData) -> Result<AffData, String>) -> *mut RawAff {
    // SAFETY: caller owns a live `aff`.
    unsafe {
        match op(Obj::get(aff)) {
            Ok(next) => {
                let aff = Obj::make_unique(aff);
                *Obj::get_mut(aff) = next;
                aff
            }
            Err(message) => {
                Obj::report(aff, message);
                aff_free(aff);
                std::ptr::null_mut()
            }
        }
    }
}

unsafe fn binary(a: *mut RawAff, b: *mut RawAff, negate: bool) -> *mut RawAff {
    if a.is_null() || b.is_null() {
        // SAFETY: both are null or owned by the caller.
        unsafe {
            aff_free(a);
            aff_free(b);
        }
        return std::ptr::null_mut();
    }
    // SAFETY: caller owns both.
    unsafe {
        let rhs = Obj::take(b);
        update(a, |lhs| {
            if !lhs.space.matches(&rhs.space) {
                return Err("affine expressions live in different spaces".to_string());
            }
            lhs.combine(&rhs, negate)
                .ok_or_else(|| "integer overflow in affine arithmetic".to_string())
        })
    }
}

/// `a + b` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live expressions owned by the caller.
pub unsafe fn aff_add(a: *mut RawAff, b: *mut RawAff) -> *mut RawAff {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, false) }
}

/// `a - b` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live expressions owned by the caller.
pub unsafe fn aff_sub(a: *mut RawAff, b: *mut RawAff) -> *mut RawAff {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, true) }
}

/// `-a` (take).
///
/// # Safety
///
/// `a` must be null or a live expression owned by the caller.
pub unsafe fn aff_neg(a: *mut RawAff) -> *mut RawAff {
    if a.is_null() {
        return a;
    }
    // SAFETY: caller owns `a`.
    unsafe {
        update(a, |x| {
            x.scale(ValData::int(-1))
                .ok_or_else(|| "integer overflow in affine negation".to_string())
        })
    }
}

unsafe fn with_val(
    a: *mut RawAff,
    v: *mut RawVal,
    op: fn(&AffData, ValData) -> Option<AffData>,
) -> *mut RawAff {
    if a.is_null() || v.is_null() {
        // SAFETY: both are null or owned by the caller.
        unsafe {
            aff_free(a);
            Obj::free(v);
        }
        return std::ptr::null_mut();
    }
    // SAFETY: caller owns both.
    unsafe {
        let v = Obj::take(v);
        update(a, |x| op(x, v).ok_or_else(|| "integer overflow in affine arithmetic".to_string()))
    }
}

/// `a * v` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live objects owned by the caller.
pub unsafe fn aff_scale_val(a: *mut RawAff, v: *mut RawVal) -> *mut RawAff {
    // SAFETY: forwarded from the caller.
    unsafe { with_val(a, v, AffData::scale) }
}

/// `a + v` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live objects owned by the caller.
pub unsafe fn aff_add_constant_val(a: *mut RawAff, v: *mut RawVal) -> *mut RawAff {
    // SAFETY: forwarded from the caller.
    unsafe { with_val(a, v, AffData::add_constant) }
}

/// Constant term (keep).
///
/// # Safety
///
/// `a` must be a live expression.
pub unsafe fn aff_get_constant_val(a: *const RawAff) -> *mut RawVal {
    // SAFETY: caller guarantees liveness.
    unsafe {
        let data = Obj::get(a);
        match ValData::ratio(data.constant as i128, data.denom as i128) {
            Some(v) => Obj::alloc(Obj::ctx(a), v),
            None => {
                Obj::report(a, "invalid expression denominator");
                std::ptr::null_mut()
            }
        }
    }
}

/// Coefficient of dimension `pos` of class `ty` (keep).
///
/// # Safety
///
/// `a` must be a live expression.
pub unsafe fn aff_get_coefficient_val(a: *const RawAff, ty: DimType, pos: usize) -> *mut RawVal {
    // SAFETY: caller guarantees liveness.
    unsafe {
        let data = Obj::get(a);
        let Some(col) = data.space.column(ty, pos) else {
            Obj::report(a, format!("position {} out of bounds for {:?}", pos, ty));
            return std::ptr::null_mut();
        };
        match ValData::ratio(data.coeffs[col] as i128, data.denom as i128) {
            Some(v) => Obj::alloc(Obj::ctx(a), v),
            None => {
                Obj::report(a, "invalid expression denominator");
                std::ptr::null_mut()
            }
        }
    }
}

/// The space the expression is defined on (keep).
///
/// # Safety
///
/// `a` must be a live expression.
pub unsafe fn aff_get_domain_space(a: *const RawAff) -> *mut RawSpace {
    // SAFETY: caller guarantees liveness.
    unsafe { Obj::alloc(Obj::ctx(a), Obj::get(a).space.clone()) }
}
