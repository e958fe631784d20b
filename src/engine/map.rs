//! Basic maps, maps and union maps.

use super::boxes::{Poly, UnionPoly};
use super::ctx::Ctx;
use super::object::{binary, derive, predicate, refcounted, unary, Obj};
use super::parse::{parse, parse_single};
use super::set::{RawSet, SetData};
use super::space::{RawSpace, SpaceData};
use super::Bool;

/// Payload of a basic map: at most one box.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicMapData(pub(crate) Poly);

/// Payload of a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapData(pub(crate) Poly);

/// Payload of a union map: one map per space.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionMapData(pub(crate) UnionPoly);

refcounted!(
    /// Engine basic map object.
    RawBasicMap = BasicMapData,
    basic_map_copy,
    basic_map_free,
    basic_map_get_ctx
);

refcounted!(
    /// Engine map object.
    RawMap = MapData,
    map_copy,
    map_free,
    map_get_ctx
);

refcounted!(
    /// Engine union map object.
    RawUnionMap = UnionMapData,
    union_map_copy,
    union_map_free,
    union_map_get_ctx
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

fn require_map(space: &SpaceData) -> Result<(), String> {
    if space.is_map() {
        Ok(())
    } else {
        Err("expected a map space".to_string())
    }
}

// Basic maps.

/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn basic_map_read_from_str(ctx: *mut Ctx, text: &str) -> *mut RawBasicMap {
    // SAFETY: forwarded from the caller.
    unsafe {
        read(ctx, text, |t| {
            let poly = parse_single(t, true)?;
            if poly.cells.len() > 1 {
                return Err("description is not a basic map".to_string());
            }
            Ok(BasicMapData(poly))
        })
    }
}

/// # Safety
///
/// `bmap` must be a live basic map (keep).
pub unsafe fn basic_map_get_space(bmap: *const RawBasicMap) -> *mut RawSpace {
    // SAFETY: forwarded from the caller.
    unsafe { derive(bmap, |b| Ok(b.0.space.clone())) }
}

/// # Safety
///
/// `bmap` must be null or a live basic map owned by the caller.
pub unsafe fn basic_map_reverse(bmap: *mut RawBasicMap) -> *mut RawBasicMap {
    // SAFETY: forwarded from the caller.
    unsafe { unary(bmap, |b: &BasicMapData| Ok(BasicMapData(b.0.reverse()))) }
}

/// # Safety
///
/// Both pointers must be live basic maps (keep, keep).
pub unsafe fn basic_map_is_equal(a: *const RawBasicMap, b: *const RawBasicMap) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { predicate(a, b, |a: &BasicMapData, b: &BasicMapData| a.0.is_equal(&b.0)) }
}

// Maps.

/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn map_read_from_str(ctx: *mut Ctx, text: &str) -> *mut RawMap {
    // SAFETY: forwarded from the caller.
    unsafe { read(ctx, text, |t| Ok(MapData(parse_single(t, true)?))) }
}

/// # Safety
///
/// `space` must be null or a live space owned by the caller.
pub unsafe fn map_universe(space: *mut RawSpace) -> *mut RawMap {
    // SAFETY: forwarded from the caller.
    unsafe {
        unary(space, |s| {
            require_map(s)?;
            Ok(MapData(Poly::universe(s.clone())))
        })
    }
}

/// # Safety
///
/// `space` must be null or a live space owned by the caller.
pub unsafe fn map_empty(space: *mut RawSpace) -> *mut RawMap {
    // SAFETY: forwarded from the caller.
    unsafe {
        unary(space, |s| {
            require_map(s)?;
            Ok(MapData(Poly::empty(s.clone())))
        })
    }
}

/// # Safety
///
/// `bmap` must be null or a live basic map owned by the caller.
pub unsafe fn map_from_basic_map(bmap: *mut RawBasicMap) -> *mut RawMap {
    // SAFETY: forwarded from the caller.
    unsafe { unary(bmap, |b: &BasicMapData| Ok(MapData(b.0.clone()))) }
}

/// # Safety
///
/// `map` must be a live map (keep).
pub unsafe fn map_get_space(map: *const RawMap) -> *mut RawSpace {
    // SAFETY: forwarded from the caller.
    unsafe { derive(map, |m| Ok(m.0.space.clone())) }
}

/// # Safety
///
/// `map` must be null or a live map owned by the caller.
pub unsafe fn map_reverse(map: *mut RawMap) -> *mut RawMap {
    // SAFETY: forwarded from the caller.
    unsafe { unary(map, |m: &MapData| Ok(MapData(m.0.reverse()))) }
}

/// # Safety
///
/// `map` must be null or a live map owned by the caller.
pub unsafe fn map_domain(map: *mut RawMap) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { unary(map, |m: &MapData| Ok(SetData(m.0.domain()))) }
}

/// # Safety
///
/// `map` must be null or a live map owned by the caller.
pub unsafe fn map_range(map: *mut RawMap) -> *mut RawSet {
    // SAFETY: forwarded from the caller.
    unsafe { unary(map, |m: &MapData| Ok(SetData(m.0.range()))) }
}

/// # Safety
///
/// Both pointers must be null or live maps owned by the caller.
pub unsafe fn map_intersect(a: *mut RawMap, b: *mut RawMap) -> *mut RawMap {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, |a: &MapData, b: &MapData| Ok(MapData(a.0.intersect(&b.0)?))) }
}

/// # Safety
///
/// Both pointers must be null or live maps owned by the caller.
pub unsafe fn map_union(a: *mut RawMap, b: *mut RawMap) -> *mut RawMap {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, |a: &MapData, b: &MapData| Ok(MapData(a.0.union(&b.0)?))) }
}

/// Composition: `a` followed by `b` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live maps owned by the caller.
pub unsafe fn map_apply_range(a: *mut RawMap, b: *mut RawMap) -> *mut RawMap {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, |a: &MapData, b: &MapData| Ok(MapData(a.0.apply_range(&b.0)?))) }
}

/// # Safety
///
/// `map` must be a live map (keep).
pub unsafe fn map_is_single_valued(map: *const RawMap) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(map) }.0.is_single_valued().into()
}

/// # Safety
///
/// `map` must be a live map (keep).
pub unsafe fn map_is_empty(map: *const RawMap) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(map) }.0.is_empty().into()
}

/// # Safety
///
/// Both pointers must be live maps (keep, keep).
pub unsafe fn map_is_equal(a: *const RawMap, b: *const RawMap) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { predicate(a, b, |a: &MapData, b: &MapData| a.0.is_equal(&b.0)) }
}

/// Per domain point, the lexicographically smallest image (take).
///
/// # Safety
///
/// `map` must be null or a live map owned by the caller.
pub unsafe fn map_lexmin(map: *mut RawMap) -> *mut RawMap {
    // SAFETY: forwarded from the caller.
    unsafe { unary(map, |m: &MapData| Ok(MapData(m.0.lexopt_map(false)?))) }
}

/// Per domain point, the lexicographically largest image (take).
///
/// # Safety
///
/// `map` must be null or a live map owned by the caller.
pub unsafe fn map_lexmax(map: *mut RawMap) -> *mut RawMap {
    // SAFETY: forwarded from the caller.
    unsafe { unary(map, |m: &MapData| Ok(MapData(m.0.lexopt_map(true)?))) }
}

/// # Safety
///
/// `map` must be null or a live map owned by the caller.
pub unsafe fn map_coalesce(map: *mut RawMap) -> *mut RawMap {
    // SAFETY: forwarded from the caller.
    unsafe { unary(map, |m: &MapData| Ok(MapData(m.0.clone().coalesced()))) }
}

// Union maps.

/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn union_map_read_from_str(ctx: *mut Ctx, text: &str) -> *mut RawUnionMap {
    // SAFETY: forwarded from the caller.
    unsafe {
        read(ctx, text, |t| {
            let (params, pieces) = parse(t)?;
            let mut union = UnionPoly::new(params.len());
            for piece in pieces {
                require_map(&piece.poly.space).map_err(|_| "expected maps, found a set".to_string())?;
                union.add(piece.poly)?;
            }
            Ok(UnionMapData(union))
        })
    }
}

/// Empty union map over the parameters of `space` (take).
///
/// # Safety
///
/// `space` must be null or a live space owned by the caller.
pub unsafe fn union_map_empty(space: *mut RawSpace) -> *mut RawUnionMap {
    // SAFETY: forwarded from the caller.
    unsafe { unary(space, |s: &SpaceData| Ok(UnionMapData(UnionPoly::new(s.n_param())))) }
}

/// # Safety
///
/// `map` must be null or a live map owned by the caller.
pub unsafe fn union_map_from_map(map: *mut RawMap) -> *mut RawUnionMap {
    // SAFETY: forwarded from the caller.
    unsafe {
        unary(map, |m: &MapData| {
            let mut union = UnionPoly::new(m.0.space.n_param());
            union.add(m.0.clone())?;
            Ok(UnionMapData(union))
        })
    }
}

/// # Safety
///
/// Both pointers must be null or live union maps owned by the caller.
pub unsafe fn union_map_union(a: *mut RawUnionMap, b: *mut RawUnionMap) -> *mut RawUnionMap {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, |a: &UnionMapData, b: &UnionMapData| Ok(UnionMapData(a.0.union(&b.0)?))) }
}

/// # Safety
///
/// `umap` must be null or a live union map owned by the caller.
pub unsafe fn union_map_reverse(umap: *mut RawUnionMap) -> *mut RawUnionMap {
    // SAFETY: forwarded from the caller.
    unsafe { unary(umap, |u: &UnionMapData| Ok(UnionMapData(u.0.map_parts(Poly::reverse)))) }
}

/// The part of `umap` living in `space` (keep, take).
///
/// # Safety
///
/// `umap` must be live; `space` must be null or a live space owned by the caller.
pub unsafe fn union_map_extract_map(umap: *const RawUnionMap, space: *mut RawSpace) -> *mut RawMap {
    // SAFETY: forwarded from the caller; `umap` only gains a temporary reference.
    unsafe {
        let umap = union_map_copy(umap.cast_mut());
        binary(umap, space, |u: &UnionMapData, s: &SpaceData| {
            require_map(s)?;
            Ok(MapData(u.0.extract(s)))
        })
    }
}

/// # Safety
///
/// `umap` must be a live union map (keep).
pub unsafe fn union_map_is_empty(umap: *const RawUnionMap) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(umap) }.0.is_empty().into()
}

/// # Safety
///
/// Both pointers must be live union maps (keep, keep).
pub unsafe fn union_map_is_equal(a: *const RawUnionMap, b: *const RawUnionMap) -> Bool {
    // SAFETY: forwarded from the caller.
    unsafe { predicate(a, b, |a: &UnionMapData, b: &UnionMapData| a.0.is_equal(&b.0)) }
}
