//! Basic sets, sets and union sets.
//!
//! Algebra borrows its operands and hands the engine fresh references, so the
//! inputs stay usable. Methods taking `self` by value (`coalesce`,
//! `with_constraint`) reuse the handle's own reference instead; the engine
//! mutates in place when nobody else shares it.
//!
//! # Example
//!
//! ```
//! use isle::{Context, Set};
//!
//! let ctx = Context::new();
//! let a = Set::parse(&ctx, "{ A[i] : 0 <= i <= 9 }")?;
//! let b = Set::parse(&ctx, "{ A[i] : 5 <= i <= 20 }")?;
//!
//! let both = a.intersect(&b)?;
//! assert_eq!(both.to_string(), "{ A[i] : 5 <= i <= 9 }");
//! assert!(both.is_subset(&a)?);
//! # Ok::<(), isle::Error>(())
//! ```

use crate::constraint::Constraint;
use crate::context::Context;
use crate::engine::printer::{printer_print_basic_set, printer_print_set, printer_print_union_set};
use crate::engine::set::{
    basic_set_add_constraint, basic_set_copy, basic_set_free, basic_set_get_ctx, basic_set_get_space,
    basic_set_intersect, basic_set_is_equal, basic_set_max_val, basic_set_min_val, basic_set_read_from_str,
    basic_set_union, basic_set_universe, set_add_constraint, set_apply, set_coalesce, set_copy, set_empty,
    set_free, set_from_basic_set, set_get_ctx, set_get_space, set_intersect, set_is_empty, set_is_equal,
    set_is_subset, set_lexmax, set_lexmin, set_max_val, set_min_val, set_read_from_str, set_sample_point,
    set_subtract, set_union, set_universe, union_set_copy, union_set_empty, union_set_extract_set,
    union_set_free, union_set_from_set, union_set_get_ctx, union_set_is_empty, union_set_is_equal,
    union_set_n_set, union_set_read_from_str, union_set_union, RawBasicSet, RawSet, RawUnionSet,
};
use crate::engine::space::space_params_alloc;
use crate::error::{Error, ErrorKind, Result};
use crate::expression::Expression;
use crate::handle::Handle;
use crate::map::Map;
use crate::point::Point;
use crate::printer::printable;
use crate::resource_kind;
use crate::space::Space;
use crate::value::Value;

resource_kind! {
    /// Basic sets: a single box.
    BasicSetKind => RawBasicSet,
    name: "BasicSet",
    copy: basic_set_copy,
    free: basic_set_free,
    context: basic_set_get_ctx,
}

resource_kind! {
    /// Sets.
    SetKind => RawSet,
    name: "Set",
    copy: set_copy,
    free: set_free,
    context: set_get_ctx,
}

resource_kind! {
    /// Union sets: sets over several spaces.
    UnionSetKind => RawUnionSet,
    name: "UnionSet",
    copy: union_set_copy,
    free: union_set_free,
    context: union_set_get_ctx,
}

/// A basic set handle.
pub type BasicSet = Handle<BasicSetKind>;

/// A set handle.
pub type Set = Handle<SetKind>;

/// A union set handle.
pub type UnionSet = Handle<UnionSetKind>;

impl BasicSet {
    /// Parse a single-disjunct set description.
    pub fn parse(ctx: &Context, text: &str) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { basic_set_read_from_str(ctx.as_ptr(), text) })
            .map_err(|e| e.context("parsing BasicSet"))
    }

    /// Every point of `space`.
    pub fn universe(space: &Space) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(space.context(), unsafe { basic_set_universe(space.copy_raw()) })
    }

    /// `self ∩ other`.
    pub fn intersect(&self, other: &BasicSet) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { basic_set_intersect(self.copy_raw(), other.copy_raw()) })
    }

    /// `self ∪ other`, which in general needs a [`Set`].
    pub fn union(&self, other: &BasicSet) -> Result<Set> {
        // SAFETY: the engine takes both fresh references.
        Set::adopt(self.context(), unsafe { basic_set_union(self.copy_raw(), other.copy_raw()) })
    }

    /// Intersect with `constraint`.
    pub fn add_constraint(&self, constraint: &Constraint) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { basic_set_add_constraint(self.copy_raw(), constraint.copy_raw()) })
    }

    /// Maximum of `expr`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NoSolution`] when the set is empty or `expr` is unbounded.
    pub fn maximum(&self, expr: &Expression) -> Result<Value> {
        // SAFETY: both objects are live.
        Value::adopt_solution(self.context(), || unsafe { basic_set_max_val(self.as_ptr(), expr.as_ptr()) })
    }

    /// Minimum of `expr`; see [`BasicSet::maximum`].
    pub fn minimum(&self, expr: &Expression) -> Result<Value> {
        // SAFETY: both objects are live.
        Value::adopt_solution(self.context(), || unsafe { basic_set_min_val(self.as_ptr(), expr.as_ptr()) })
    }

    /// The space of the set.
    pub fn space(&self) -> Result<Space> {
        // SAFETY: the set is live.
        Space::adopt(self.context(), unsafe { basic_set_get_space(self.as_ptr()) })
    }

    /// Engine equality.
    pub fn is_equal(&self, other: &BasicSet) -> Result<bool> {
        // SAFETY: both sets are live.
        self.context().check(unsafe { basic_set_is_equal(self.as_ptr(), other.as_ptr()) })
    }
}

impl Set {
    /// Parse a set description.
    pub fn parse(ctx: &Context, text: &str) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { set_read_from_str(ctx.as_ptr(), text) }).map_err(|e| e.context("parsing Set"))
    }

    /// Every point of `space`.
    pub fn universe(space: &Space) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(space.context(), unsafe { set_universe(space.copy_raw()) })
    }

    /// No point of `space`.
    pub fn empty(space: &Space) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(space.context(), unsafe { set_empty(space.copy_raw()) })
    }

    /// The set with the same points as `bset`.
    pub fn from_basic_set(bset: &BasicSet) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(bset.context(), unsafe { set_from_basic_set(bset.copy_raw()) })
    }

    /// The space of the set.
    pub fn space(&self) -> Result<Space> {
        // SAFETY: the set is live.
        Space::adopt(self.context(), unsafe { set_get_space(self.as_ptr()) })
    }

    /// `self ∩ other`.
    pub fn intersect(&self, other: &Set) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { set_intersect(self.copy_raw(), other.copy_raw()) })
    }

    /// `self ∪ other`.
    pub fn union(&self, other: &Set) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { set_union(self.copy_raw(), other.copy_raw()) })
    }

    /// `self \ other`.
    pub fn subtract(&self, other: &Set) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { set_subtract(self.copy_raw(), other.copy_raw()) })
    }

    /// Intersect `self` with `constraint` in place.
    ///
    /// Other handles to the same set are unaffected. On failure `self` keeps
    /// its old value.
    pub fn add_constraint(&mut self, constraint: &Constraint) -> Result<()> {
        // SAFETY: the engine takes both fresh references.
        self.update(|raw| unsafe { set_add_constraint(raw, constraint.copy_raw()) })
    }

    /// Consuming form of [`Set::add_constraint`].
    pub fn with_constraint(self, constraint: &Constraint) -> Result<Self> {
        // SAFETY: the engine takes our reference and a fresh one.
        self.consume(|raw| unsafe { set_add_constraint(raw, constraint.copy_raw()) })
    }

    /// Merge boxes that together form a single box.
    pub fn coalesce(self) -> Result<Self> {
        // SAFETY: the engine takes our reference.
        self.consume(|raw| unsafe { set_coalesce(raw) })
    }

    fn lex_optimum(&self, raw: *mut RawSet) -> Result<Self> {
        let optimum = Self::adopt(self.context(), raw)?;
        if optimum.is_empty()? {
            return Err(Error::new(ErrorKind::NoSolution).context("lexicographic optimum of an empty set"));
        }
        Ok(optimum)
    }

    /// The lexicographically smallest point, as a singleton set.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NoSolution`] for the empty set; an unbounded set is an
    /// engine error.
    pub fn lex_minimum(&self) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        self.lex_optimum(unsafe { set_lexmin(self.copy_raw()) })
    }

    /// The lexicographically largest point; see [`Set::lex_minimum`].
    pub fn lex_maximum(&self) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        self.lex_optimum(unsafe { set_lexmax(self.copy_raw()) })
    }

    /// Minimum of `expr` over the set.
    ///
    /// ```
    /// use isle::{Context, DimType, Expression, LocalSpace, Set};
    ///
    /// let ctx = Context::new();
    /// let set = Set::parse(&ctx, "{ A[i] : 3 <= i <= 8 }")?;
    /// let ls = LocalSpace::from_space(&set.space()?)?;
    /// let i = Expression::variable(&ls, DimType::Set, 0)?;
    /// assert_eq!(set.minimum(&i)?.numerator(), 3);
    ///
    /// let empty = Set::parse(&ctx, "{ A[i] : i > 3 and i < 2 }")?;
    /// assert!(empty.minimum(&i).unwrap_err().is_no_solution());
    /// # Ok::<(), isle::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NoSolution`] when the set is empty or `expr` is unbounded
    /// below.
    pub fn minimum(&self, expr: &Expression) -> Result<Value> {
        // SAFETY: both objects are live.
        Value::adopt_solution(self.context(), || unsafe { set_min_val(self.as_ptr(), expr.as_ptr()) })
    }

    /// Maximum of `expr` over the set; see [`Set::minimum`].
    pub fn maximum(&self, expr: &Expression) -> Result<Value> {
        // SAFETY: both objects are live.
        Value::adopt_solution(self.context(), || unsafe { set_max_val(self.as_ptr(), expr.as_ptr()) })
    }

    /// Some point of the set.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NoSolution`] for the empty set.
    pub fn sample_point(&self) -> Result<Point> {
        // SAFETY: the engine takes the fresh reference.
        Point::adopt_solution(self.context(), || unsafe { set_sample_point(self.copy_raw()) })
    }

    /// Whether the set has no points.
    pub fn is_empty(&self) -> Result<bool> {
        // SAFETY: the set is live.
        self.context().check(unsafe { set_is_empty(self.as_ptr()) })
    }

    /// Engine equality: same space, same points.
    pub fn is_equal(&self, other: &Set) -> Result<bool> {
        // SAFETY: both sets are live.
        self.context().check(unsafe { set_is_equal(self.as_ptr(), other.as_ptr()) })
    }

    /// Whether every point of `self` is in `other`.
    pub fn is_subset(&self, other: &Set) -> Result<bool> {
        // SAFETY: both sets are live.
        self.context().check(unsafe { set_is_subset(self.as_ptr(), other.as_ptr()) })
    }

    /// Image of the set under `map`.
    pub fn apply(&self, map: &Map) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { set_apply(self.copy_raw(), map.copy_raw()) })
    }
}

impl UnionSet {
    /// Parse a `;`-separated list of sets.
    pub fn parse(ctx: &Context, text: &str) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { union_set_read_from_str(ctx.as_ptr(), text) })
            .map_err(|e| e.context("parsing UnionSet"))
    }

    /// The empty union set without parameters.
    pub fn empty(ctx: &Context) -> Result<Self> {
        // SAFETY: the context is live; the engine takes the fresh space.
        Self::adopt(ctx, unsafe { union_set_empty(space_params_alloc(ctx.as_ptr(), 0)) })
    }

    /// Union set with `set` as its only part.
    pub fn from_set(set: &Set) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(set.context(), unsafe { union_set_from_set(set.copy_raw()) })
    }

    /// `self ∪ other`.
    pub fn union(&self, other: &UnionSet) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { union_set_union(self.copy_raw(), other.copy_raw()) })
    }

    /// The part living in `space` (possibly empty).
    pub fn extract(&self, space: &Space) -> Result<Set> {
        // SAFETY: `self` is kept; the engine takes the fresh space.
        Set::adopt(self.context(), unsafe { union_set_extract_set(self.as_ptr(), space.copy_raw()) })
    }

    /// Number of non-empty parts.
    pub fn set_count(&self) -> usize {
        // SAFETY: the union set is live.
        unsafe { union_set_n_set(self.as_ptr()) }
    }

    /// Whether no part has a point.
    pub fn is_empty(&self) -> Result<bool> {
        // SAFETY: the union set is live.
        self.context().check(unsafe { union_set_is_empty(self.as_ptr()) })
    }

    /// Engine equality.
    pub fn is_equal(&self, other: &UnionSet) -> Result<bool> {
        // SAFETY: both union sets are live.
        self.context().check(unsafe { union_set_is_equal(self.as_ptr(), other.as_ptr()) })
    }
}

printable!(BasicSet, printer_print_basic_set);
printable!(Set, printer_print_set);
printable!(UnionSet, printer_print_union_set);
