//! Basic sets, sets and union sets.

use super::aff::{AffData, RawAff};
use super::boxes::{Optimum, Poly, UnionPoly};
use super::constraint::{ConstraintData, RawConstraint};
use super::ctx::Ctx;
use super::map::{MapData, RawMap};
use super::object::{binary, derive, predicate, refcounted, unary, Obj};
use super::parse::{parse, parse_single};
use super::point::{PointData, RawPoint};
use super::space::{RawSpace, SpaceData};
use super::val::{RawVal, ValData};
use super::Bool;

/// Payload of a basic set: at most one box.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicSetData(pub(crate) Poly);

/// Payload of a set.
#[derive(Debug, Clone, PartialEq)]
pub struct SetData(pub(crate) Poly);

/// Payload of a union set: one set per space.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionSetData(pub(crate) UnionPoly);

refcounted!(
    /// Engine basic set object.
    RawBasicSet = BasicSetData,
    basic_set_copy,
    basic_set_free,
    basic_set_get_ctx
);

refcounted!(
    /// Engine set object.
    RawSet = SetData,
    set_copy,
    set_free,
    set_get_ctx
);

refcounted!(
    /// Engine union set object.
    RawUnionSet = UnionSetData,
    union_set_copy,
    union_set_free,
    union_set_get_ctx
);

unsafe fn read<T>(ctx: *mut Ctx, text: &str, build: impl FnOnce(&str) -> Result<T, String>) -> *mut Obj<T> {
    match build(text) {
        // SAFETY: forwarded from the caller.
        Ok(value) => unsafe { Obj::alloc(ctx, value) },
        Err(message) => {
            // SAFETY: forwarded from the caller.
            unsafe { (*ctx).report(format!("parse error: {}", message)) };
            std::ptr::null_mut()
        }
    }
}

pub(crate) fn require_set(space: &SpaceData) -> Result<(), String> {
    if space.is_set() {
        Ok(())
    } else {
        Err("expected a set space".to_string())
    }
}

/// Cut `poly` by a constraint living in the same space.
pub(crate) fn constrain(poly: &Poly, c: &ConstraintData) -> Result<Poly, String> {
    if !poly.space.matches(&c.aff.space) {
        return Err("constraint lives in a different space".to_string());
    }
    let mut out = poly.clone();
    out.restrict(c.restriction()?);
    Ok(out)
}

/// Optimum of an affine expression; `Ok(None)` when there is none.
fn optimize(poly: &Poly, aff: &AffData, max: bool) -> Result<Option<ValData>, String> {
    if !poly.space.matches(&aff.space) {
        return Err("expression lives in a different space".to_string());
    }
    match poly.affine_opt(&aff.coeffs, aff.constant, aff.denom, max) {
        Optimum::Found((num, den)) => ValData::ratio(num, den as i128)
            .map(Some)
            .ok_or_else(|| "optimum out of range".to_string()),
        Optimum::Empty | Optimum::Unbounded => Ok(None),
    }
}

/// Shared body of the `*_min_val`/`*_max_val` entry points.
///
/// An empty or unbounded query yields null *without* reporting an error.
unsafe fn optimum<T>(
    set: *const Obj<T>,
    aff: *const RawAff,
    poly: impl FnOnce(&T) -> &Poly,
    max: bool,
) -> *mut RawVal {
    // SAFETY: forwarded from the caller.
    unsafe {
        match optimize(poly(Obj::get(set)), Obj::get(aff), max) {
            Ok(Some(v)) => Obj::alloc(Obj::ctx(set), v),
            Ok(None) => std::ptr::null_mut(),
            Err(message) => {
                Obj::report(set, message);
                std::ptr::null_mut()
            }
        }
    }
}

fn lexopt_set(poly: &Poly, max: bool) -> Result<Poly, String> {
    match poly.lexopt(max) {
        Optimum::Empty => Ok(Poly::empty(poly.space.clone())),
        Optimum::Unbounded => Err("lexicographic optimum is unbounded".to_string()),
        Optimum::Found(point) => Ok(Poly {
            space: poly.space.clone(),
            cells: vec![point.into_iter().map(super::boxes::Interval::point).collect()],
        }),
    }
}

// Basic sets.

/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn basic_set_read_from_str(ctx: *mut Ctx, text: &str) -> *mut RawBasicSet {
    // SAFETY: forwarded from the caller.
    unsafe {
        read(ctx, text, |t| {
            let poly = parse_single(t, false)?;
            if poly.cells.len() > 1 {
                return Err("description is not a basic set".to_string());
            }
            Ok(BasicSetData(poly))
        })
    }
}

/// # Safety
///
/// `space` must be null or a live space owned by the caller.
pub unsafe fn basic_set_universe(space: *mut RawSpace) -> *mut RawBasicSet {
    // SAFETY: forwarded from the caller.
    unsafe {
        unary(space, |s| {
            require_set(s)?;
            Ok(BasicSetData(Poly::universe(s.clone())))
        })
    }
}

/// # Safety
///
/// Both pointers must be null or live basic sets owned by the caller.
pub unsafe fn basic_set_intersect(a: *mut RawBasicSet, b: *mut RawBasicSet) -> *mut RawBasicSet {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, |a: &BasicSetData, b: &BasicSetData| Ok(BasicSetData(a.0.intersect(&b.0)?))) }
}

/// # Safety
///
/// Both pointers must be null or live basic sets owned by the caller.
pub unsafe fn basic_set_union(a: *mut RawBasicSet, b: *mut RawBasicSet) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, |a: &BasicSetData, b: &BasicSetData| Ok(SetData(a.0.union(&b.0)?))) }
}

/// # Safety
///
/// Both pointers must be null or live objects owned by the caller.
pub unsafe fn basic_set_add_constraint(bset: *mut RawBasicSet, c: *mut RawConstraint) -> *mut RawBasicSet {
    // SAFETY: forwarded from the caller.
    unsafe { binary(bset, c, |b: &BasicSetData, c| Ok(BasicSetData(constrain(&b.0, c)?))) }
}

/// Maximum of `aff` over `bset` (keep, keep); null without error when there is none.
///
/// # Safety
///
/// Both pointers must be live objects.
pub unsafe fn basic_set_max_val(bset: *const RawBasicSet, aff: *const RawAff) -> *mut RawVal {
    // SAFETY: forwarded from the caller.
    unsafe { optimum(bset, aff, |b: &BasicSetData| &b.0, true) }
}

/// Minimum of `aff` over `bset` (keep, keep); null without error when there is none.
///
/// # Safety
///
/// Both pointers must be live objects.
pub unsafe fn basic_set_min_val(bset: *const RawBasicSet, aff: *const RawAff) -> *mut RawVal {
    // SAFETY: forwarded from the caller.
    unsafe { optimum(bset, aff, |b: &BasicSetData| &b.0, false) }
}

/// # Safety
///
/// `bset` must be a live basic set (keep).
pub unsafe fn basic_set_get_space(bset: *const RawBasicSet) -> *mut RawSpace {
    // SAFETY: forwarded from the caller.
    unsafe { derive(bset, |b| Ok(b.0.space.clone())) }
}

/// # Safety
///
/// Both pointers must be live basic sets (keep, keep).
pub unsafe fn basic_set_is_equal(a: *const RawBasicSet, b: *const RawBasicSet) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { predicate(a, b, |a: &BasicSetData, b: &BasicSetData| a.0.is_equal(&b.0)) }
}

// Sets.

/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn set_read_from_str(ctx: *mut Ctx, text: &str) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { read(ctx, text, |t| Ok(SetData(parse_single(t, false)?))) }
}

/// # Safety
///
/// `space` must be null or a live space owned by the caller.
pub unsafe fn set_universe(space: *mut RawSpace) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe {
        unary(space, |s| {
            require_set(s)?;
            Ok(SetData(Poly::universe(s.clone())))
        })
    }
}

/// # Safety
///
/// `space` must be null or a live space owned by the caller.
pub unsafe fn set_empty(space: *mut RawSpace) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe {
        unary(space, |s| {
            require_set(s)?;
            Ok(SetData(Poly::empty(s.clone())))
        })
    }
}

/// # Safety
///
/// `bset` must be null or a live basic set owned by the caller.
pub unsafe fn set_from_basic_set(bset: *mut RawBasicSet) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { unary(bset, |b| Ok(SetData(b.0.clone()))) }
}

/// # Safety
///
/// `set` must be a live set (keep).
pub unsafe fn set_get_space(set: *const RawSet) -> *mut RawSpace {
    // SAFETY: forwarded from the caller.
    unsafe { derive(set, |s| Ok(s.0.space.clone())) }
}

/// # Safety
///
/// Both pointers must be null or live sets owned by the caller.
pub unsafe fn set_intersect(a: *mut RawSet, b: *mut RawSet) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, |a: &SetData, b: &SetData| Ok(SetData(a.0.intersect(&b.0)?))) }
}

/// # Safety
///
/// Both pointers must be null or live sets owned by the caller.
pub unsafe fn set_union(a: *mut RawSet, b: *mut RawSet) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, |a: &SetData, b: &SetData| Ok(SetData(a.0.union(&b.0)?))) }
}

/// # Safety
///
/// Both pointers must be null or live sets owned by the caller.
pub unsafe fn set_subtract(a: *mut RawSet, b: *mut RawSet) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, |a: &SetData, b: &SetData| Ok(SetData(a.0.subtract(&b.0)?))) }
}

/// # Safety
///
/// Both pointers must be null or live objects owned by the caller.
pub unsafe fn set_add_constraint(set: *mut RawSet, c: *mut RawConstraint) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { binary(set, c, |s: &SetData, c| Ok(SetData(constrain(&s.0, c)?))) }
}

/// # Safety
///
/// `set` must be null or a live set owned by the caller.
pub unsafe fn set_coalesce(set: *mut RawSet) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { unary(set, |s: &SetData| Ok(SetData(s.0.clone().coalesced()))) }
}

/// Lexicographic minimum as a singleton (or empty) set (take).
///
/// # Safety
///
/// `set` must be null or a live set owned by the caller.
pub unsafe fn set_lexmin(set: *mut RawSet) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { unary(set, |s: &SetData| Ok(SetData(lexopt_set(&s.0, false)?))) }
}

/// Lexicographic maximum as a singleton (or empty) set (take).
///
/// # Safety
///
/// `set` must be null or a live set owned by the caller.
pub unsafe fn set_lexmax(set: *mut RawSet) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { unary(set, |s: &SetData| Ok(SetData(lexopt_set(&s.0, true)?))) }
}

/// Minimum of `aff` over `set` (keep, keep); null without error when there is none.
///
/// # Safety
///
/// Both pointers must be live objects.
pub unsafe fn set_min_val(set: *const RawSet, aff: *const RawAff) -> *mut RawVal {
    // SAFETY: forwarded from the caller.
    unsafe { optimum(set, aff, |s: &SetData| &s.0, false) }
}

/// Maximum of `aff` over `set` (keep, keep); null without error when there is none.
///
/// # Safety
///
/// Both pointers must be live objects.
pub unsafe fn set_max_val(set: *const RawSet, aff: *const RawAff) -> *mut RawVal {
    // SAFETY: forwarded from the caller.
    unsafe { optimum(set, aff, |s: &SetData| &s.0, true) }
}

/// Some point of `set` (take); null without error when the set is empty.
///
/// # Safety
///
/// `set` must be null or a live set owned by the caller.
pub unsafe fn set_sample_point(set: *mut RawSet) -> *mut RawPoint {
    if set.is_null() {
        return std::ptr::null_mut();
    }
    // SAFETY: caller owns `set`.
    unsafe {
        let data = Obj::get(set);
        let out = match data.0.sample() {
            Some(coords) => Obj::alloc(
                Obj::ctx(set),
                PointData {
                    space: data.0.space.clone(),
                    coords,
                },
            ),
            None => std::ptr::null_mut(),
        };
        set_free(set);
        out
    }
}

/// # Safety
///
/// `set` must be a live set (keep).
pub unsafe fn set_is_empty(set: *const RawSet) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(set) }.0.is_empty().into()
}

/// # Safety
///
/// Both pointers must be live sets (keep, keep).
pub unsafe fn set_is_equal(a: *const RawSet, b: *const RawSet) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { predicate(a, b, |a: &SetData, b: &SetData| a.0.is_equal(&b.0)) }
}

/// Whether `a` is a subset of `b` (keep, keep).
///
/// # Safety
///
/// Both pointers must be live sets.
pub unsafe fn set_is_subset(a: *const RawSet, b: *const RawSet) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { predicate(a, b, |a: &SetData, b: &SetData| a.0.is_subset(&b.0)) }
}

/// Image of `set` under `map` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live objects owned by the caller.
pub unsafe fn set_apply(set: *mut RawSet, map: *mut RawMap) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { binary(set, map, |s: &SetData, m: &MapData| Ok(SetData(s.0.apply(&m.0)?))) }
}

// Union sets.

/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn union_set_read_from_str(ctx: *mut Ctx, text: &str) -> *mut RawUnionSet {
    // SAFETY: forwarded from the caller.
    unsafe {
        read(ctx, text, |t| {
            let (params, pieces) = parse(t)?;
            let mut union = UnionPoly::new(params.len());
            for piece in pieces {
                if piece.poly.space.is_map() {
                    return Err("expected sets, found a map".to_string());
                }
                union.add(piece.poly)?;
            }
            Ok(UnionSetData(union))
        })
    }
}

/// Empty union set over the parameters of `space` (take).
///
/// # Safety
///
/// `space` must be null or a live space owned by the caller.
pub unsafe fn union_set_empty(space: *mut RawSpace) -> *mut RawUnionSet {
    // SAFETY: forwarded from the caller.
    unsafe { unary(space, |s: &SpaceData| Ok(UnionSetData(UnionPoly::new(s.n_param())))) }
}

/// # Safety
///
/// `set` must be null or a live set owned by the caller.
pub unsafe fn union_set_from_set(set: *mut RawSet) -> *mut RawUnionSet {
    // SAFETY: forwarded from the caller.
    unsafe {
        unary(set, |s: &SetData| {
            let mut union = UnionPoly::new(s.0.space.n_param());
            union.add(s.0.clone())?;
            Ok(UnionSetData(union))
        })
    }
}

/// # Safety
///
/// Both pointers must be null or live union sets owned by the caller.
pub unsafe fn union_set_union(a: *mut RawUnionSet, b: *mut RawUnionSet) -> *mut RawUnionSet {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, |a: &UnionSetData, b: &UnionSetData| Ok(UnionSetData(a.0.union(&b.0)?))) }
}

/// The part of `uset` living in `space` (keep, take).
///
/// # Safety
///
/// `uset` must be live; `space` must be null or a live space owned by the caller.
pub unsafe fn union_set_extract_set(uset: *const RawUnionSet, space: *mut RawSpace) -> *mut RawSet {
    // SAFETY: forwarded from the caller; `uset` only gains a temporary reference.
    unsafe {
        let uset = union_set_copy(uset.cast_mut());
        binary(uset, space, |u: &UnionSetData, s: &SpaceData| {
            require_set(s)?;
            Ok(SetData(u.0.extract(s)))
        })
    }
}

/// Number of spaces with a non-empty part (keep).
///
/// # Safety
///
/// `uset` must be a live union set.
pub unsafe fn union_set_n_set(uset: *const RawUnionSet) -> usize {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(uset) }.0.parts.iter().filter(|p| !p.is_empty()).count()
}

/// # Safety
///
/// `uset` must be a live union set (keep).
pub unsafe fn union_set_is_empty(uset: *const RawUnionSet) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(uset) }.0.is_empty().into()
}

/// # Safety
///
/// Both pointers must be live union sets (keep, keep).
pub unsafe fn union_set_is_equal(a: *const RawUnionSet, b: *const RawUnionSet) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { predicate(a, b, |a: &UnionSetData, b: &UnionSetData| a.0.is_equal(&b.0)) }
}
