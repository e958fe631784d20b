//! Basic maps, maps and union maps.

use crate::context::Context;
use crate::engine::map::{
    basic_map_copy, basic_map_free, basic_map_get_ctx, basic_map_get_space, basic_map_is_equal,
    basic_map_read_from_str, basic_map_reverse, map_apply_range, map_coalesce, map_copy, map_domain, map_empty,
    map_free, map_from_basic_map, map_get_ctx, map_get_space, map_intersect, map_is_empty, map_is_equal,
    map_is_single_valued, map_lexmax, map_lexmin, map_range, map_read_from_str, map_reverse, map_union,
    map_universe, union_map_copy, union_map_empty, union_map_extract_map, union_map_free, union_map_from_map,
    union_map_get_ctx, union_map_is_empty, union_map_is_equal, union_map_read_from_str, union_map_reverse,
    union_map_union, RawBasicMap, RawMap, RawUnionMap,
};
use crate::engine::printer::{printer_print_basic_map, printer_print_map, printer_print_union_map};
use crate::engine::space::space_params_alloc;
use crate::error::Result;
use crate::handle::Handle;
use crate::printer::printable;
use crate::resource_kind;
use crate::set::Set;
use crate::space::Space;

resource_kind! {
    /// Basic maps: a single box relation.
    BasicMapKind => RawBasicMap,
    name: "BasicMap",
    copy: basic_map_copy,
    free: basic_map_free,
    context: basic_map_get_ctx,
}

resource_kind! {
    /// Maps.
    MapKind => RawMap,
    name: "Map",
    copy: map_copy,
    free: map_free,
    context: map_get_ctx,
}

resource_kind! {
    /// Union maps: maps over several spaces.
    UnionMapKind => RawUnionMap,
    name: "UnionMap",
    copy: union_map_copy,
    free: union_map_free,
    context: union_map_get_ctx,
}

/// A basic map handle.
pub type BasicMap = Handle<BasicMapKind>;

/// A map handle.
///
/// ```
/// use isle::{Context, Map, Set};
///
/// let ctx = Context::new();
/// let shift = Map::parse(&ctx, "{ A[a] -> B[b] : 0 <= a <= 3 and 10 <= b <= 11 }")?;
/// let domain = shift.domain()?;
/// assert!(domain.is_equal(&Set::parse(&ctx, "{ A[a] : 0 <= a <= 3 }")?)?);
/// assert!(!shift.is_single_valued()?);
/// # Ok::<(), isle::Error>(())
/// ```
pub type Map = Handle<MapKind>;

/// A union map handle.
pub type UnionMap = Handle<UnionMapKind>;

impl BasicMap {
    /// Parse a single-disjunct map description.
    pub fn parse(ctx: &Context, text: &str) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { basic_map_read_from_str(ctx.as_ptr(), text) })
            .map_err(|e| e.context("parsing BasicMap"))
    }

    /// The space of the map.
    pub fn space(&self) -> Result<Space> {
        // SAFETY: the map is live.
        Space::adopt(self.context(), unsafe { basic_map_get_space(self.as_ptr()) })
    }

    /// Swap domain and range.
    pub fn reverse(&self) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(self.context(), unsafe { basic_map_reverse(self.copy_raw()) })
    }

    /// Engine equality.
    pub fn is_equal(&self, other: &BasicMap) -> Result<bool> {
        // SAFETY: both maps are live.
        self.context().check(unsafe { basic_map_is_equal(self.as_ptr(), other.as_ptr()) })
    }
}

impl Map {
    /// Parse a map description.
    pub fn parse(ctx: &Context, text: &str) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { map_read_from_str(ctx.as_ptr(), text) }).map_err(|e| e.context("parsing Map"))
    }

    /// Every pair of `space`.
    pub fn universe(space: &Space) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(space.context(), unsafe { map_universe(space.copy_raw()) })
    }

    /// No pair of `space`.
    pub fn empty(space: &Space) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(space.context(), unsafe { map_empty(space.copy_raw()) })
    }

    /// The map with the same pairs as `bmap`.
    pub fn from_basic_map(bmap: &BasicMap) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(bmap.context(), unsafe { map_from_basic_map(bmap.copy_raw()) })
    }

    /// The space of the map.
    pub fn space(&self) -> Result<Space> {
        // SAFETY: the map is live.
        Space::adopt(self.context(), unsafe { map_get_space(self.as_ptr()) })
    }

    /// Swap domain and range.
    pub fn reverse(&self) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(self.context(), unsafe { map_reverse(self.copy_raw()) })
    }

    /// Points with at least one image.
    pub fn domain(&self) -> Result<Set> {
        // SAFETY: the engine takes the fresh reference.
        Set::adopt(self.context(), unsafe { map_domain(self.copy_raw()) })
    }

    /// Points that are the image of something.
    pub fn range(&self) -> Result<Set> {
        // SAFETY: the engine takes the fresh reference.
        Set::adopt(self.context(), unsafe { map_range(self.copy_raw()) })
    }

    /// `self ∩ other`.
    pub fn intersect(&self, other: &Map) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { map_intersect(self.copy_raw(), other.copy_raw()) })
    }

    /// `self ∪ other`.
    pub fn union(&self, other: &Map) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { map_union(self.copy_raw(), other.copy_raw()) })
    }

    /// Composition: `self` followed by `next`.
    pub fn apply_range(&self, next: &Map) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { map_apply_range(self.copy_raw(), next.copy_raw()) })
    }

    /// Image of `set` under the map; same as [`Set::apply`].
    pub fn apply_to(&self, set: &Set) -> Result<Set> {
        set.apply(self)
    }

    /// Whether every domain point has exactly one image.
    pub fn is_single_valued(&self) -> Result<bool> {
        // SAFETY: the map is live.
        self.context().check(unsafe { map_is_single_valued(self.as_ptr()) })
    }

    /// Whether the map has no pairs.
    pub fn is_empty(&self) -> Result<bool> {
        // SAFETY: the map is live.
        self.context().check(unsafe { map_is_empty(self.as_ptr()) })
    }

    /// Engine equality.
    pub fn is_equal(&self, other: &Map) -> Result<bool> {
        // SAFETY: both maps are live.
        self.context().check(unsafe { map_is_equal(self.as_ptr(), other.as_ptr()) })
    }

    /// For every domain point, its lexicographically smallest image.
    pub fn lex_minimum(&self) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(self.context(), unsafe { map_lexmin(self.copy_raw()) })
    }

    /// For every domain point, its lexicographically largest image.
    pub fn lex_maximum(&self) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(self.context(), unsafe { map_lexmax(self.copy_raw()) })
    }

    /// Merge boxes that together form a single box.
    pub fn coalesce(self) -> Result<Self> {
        // SAFETY: the engine takes our reference.
        self.consume(|raw| unsafe { map_coalesce(raw) })
    }
}

impl UnionMap {
    /// Parse a `;`-separated list of maps.
    pub fn parse(ctx: &Context, text: &str) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { union_map_read_from_str(ctx.as_ptr(), text) })
            .map_err(|e| e.context("parsing UnionMap"))
    }

    /// The empty union map without parameters.
    pub fn empty(ctx: &Context) -> Result<Self> {
        // SAFETY: the context is live; the engine takes the fresh space.
        Self::adopt(ctx, unsafe { union_map_empty(space_params_alloc(ctx.as_ptr(), 0)) })
    }

    /// Union map with `map` as its only part.
    pub fn from_map(map: &Map) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(map.context(), unsafe { union_map_from_map(map.copy_raw()) })
    }

    /// `self ∪ other`.
    pub fn union(&self, other: &UnionMap) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { union_map_union(self.copy_raw(), other.copy_raw()) })
    }

    /// Swap domain and range of every part.
    pub fn reverse(&self) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(self.context(), unsafe { union_map_reverse(self.copy_raw()) })
    }

    /// The part living in `space` (possibly empty).
    pub fn extract(&self, space: &Space) -> Result<Map> {
        // SAFETY: `self` is kept; the engine takes the fresh space.
        Map::adopt(self.context(), unsafe { union_map_extract_map(self.as_ptr(), space.copy_raw()) })
    }

    /// Whether no part has a pair.
    pub fn is_empty(&self) -> Result<bool> {
        // SAFETY: the union map is live.
        self.context().check(unsafe { union_map_is_empty(self.as_ptr()) })
    }

    /// Engine equality.
    pub fn is_equal(&self, other: &UnionMap) -> Result<bool> {
        // SAFETY: both union maps are live.
        self.context().check(unsafe { union_map_is_equal(self.as_ptr(), other.as_ptr()) })
    }
}

printable!(BasicMap, printer_print_basic_map);
printable!(Map, printer_print_map);
printable!(UnionMap, printer_print_union_map);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextOptions, ErrorAction};
    use crate::space::Tuple;

    fn quiet() -> Context {
        Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Continue))
    }

    #[test]
    fn domain_and_range() {
        let ctx = quiet();
        let m = Map::parse(&ctx, "{ A[a] -> B[b] : 0 <= a <= 3 and b = 7 }").unwrap();
        assert_eq!(m.domain().unwrap().to_string(), "{ A[a] : 0 <= a <= 3 }");
        assert_eq!(m.range().unwrap().to_string(), "{ B[b] : b = 7 }");
        assert!(m.is_single_valued().unwrap());
        assert_eq!(m.ref_count(), 1);
    }

    #[test]
    fn composition_and_image() {
        let ctx = quiet();
        let f = Map::parse(&ctx, "{ A[a] -> B[b] : 0 <= a <= 3 and 5 <= b <= 6 }").unwrap();
        let g = Map::parse(&ctx, "{ B[b] -> C[c] : b = 6 and c = 1 }").unwrap();
        let fg = f.apply_range(&g).unwrap();
        let expected = Map::parse(&ctx, "{ A[a] -> C[c] : 0 <= a <= 3 and c = 1 }").unwrap();
        assert!(fg.is_equal(&expected).unwrap());

        let s = Set::parse(&ctx, "{ A[a] : a = 2 }").unwrap();
        let image = f.apply_to(&s).unwrap();
        assert!(image.is_equal(&Set::parse(&ctx, "{ B[b] : 5 <= b <= 6 }").unwrap()).unwrap());
        assert!(g.apply_range(&f).is_err());
    }

    #[test]
    fn reverse_round_trips() {
        let ctx = quiet();
        let m = Map::parse(&ctx, "{ A[a] -> B[b, c] : a = 2 and c >= 0 }").unwrap();
        let r = m.reverse().unwrap();
        assert_eq!(r.to_string(), "{ B[b, c] -> A[a] : c >= 0 and a = 2 }");
        assert!(r.reverse().unwrap().is_equal(&m).unwrap());
    }

    #[test]
    fn lexicographic_optima_per_domain_point() {
        let ctx = quiet();
        let m = Map::parse(&ctx, "{ A[a] -> B[b] : 0 <= a <= 4 and 0 <= b <= 9 }").unwrap();
        let low = m.lex_minimum().unwrap();
        assert!(low.is_single_valued().unwrap());
        assert!(low.is_equal(&Map::parse(&ctx, "{ A[a] -> B[b] : 0 <= a <= 4 and b = 0 }").unwrap()).unwrap());
        let high = crate::utility::lex_maximum(&m).unwrap();
        assert!(high.is_equal(&Map::parse(&ctx, "{ A[a] -> B[b] : 0 <= a <= 4 and b = 9 }").unwrap()).unwrap());
    }

    #[test]
    fn universe_and_empty() {
        let ctx = quiet();
        let space = Space::map(&ctx, &[], &Tuple::new("A", &["a"]), &Tuple::new("B", &["b"])).unwrap();
        let all = Map::universe(&space).unwrap();
        let none = Map::empty(&space).unwrap();
        assert!(none.is_empty().unwrap());
        assert!(all.intersect(&none).unwrap().is_empty().unwrap());
        assert!(all.union(&none).unwrap().is_equal(&all).unwrap());
        let set_space = Space::for_set(&ctx, 0, 1).unwrap();
        assert!(Map::universe(&set_space).unwrap_err().is_construction_failure());
    }

    #[test]
    fn basic_maps() {
        let ctx = quiet();
        let b = BasicMap::parse(&ctx, "{ A[a] -> B[b] : a = 1 and b >= 3 }").unwrap();
        let m = Map::from_basic_map(&b).unwrap();
        assert!(m.reverse().unwrap().is_equal(&Map::from_basic_map(&b.reverse().unwrap()).unwrap()).unwrap());
        assert!(b.is_equal(&b.reverse().unwrap().reverse().unwrap()).unwrap());
        assert!(BasicMap::parse(&ctx, "{ A[a] -> B[b] : a = 1 or a = 3 }").is_err());
    }

    #[test]
    fn union_maps() {
        let ctx = quiet();
        let u = UnionMap::parse(&ctx, "{ S[i] -> T[j] : i = 0 and j = 1; U[k] -> V[l] : k = l }");
        assert!(u.unwrap_err().is_construction_failure());

        let u = UnionMap::parse(&ctx, "{ S[i] -> T[j] : i = 0 and j = 1; U[k] -> V[l] : k = 2 }").unwrap();
        let space = Space::map(&ctx, &[], &Tuple::new("T", &["j"]), &Tuple::new("S", &["i"])).unwrap();
        let back = u.reverse().unwrap().extract(&space).unwrap();
        assert_eq!(back.to_string(), "{ T[j] -> S[i] : j = 1 and i = 0 }");
        let rebuilt = UnionMap::from_map(&u.extract(&back.reverse().unwrap().space().unwrap()).unwrap())
            .unwrap()
            .union(&UnionMap::parse(&ctx, "{ U[k] -> V[l] : k = 2 }").unwrap())
            .unwrap();
        assert!(rebuilt.is_equal(&u).unwrap());
        assert!(UnionMap::empty(&ctx).unwrap().is_empty().unwrap());
    }
}
