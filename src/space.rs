//! Spaces: the shape (parameters, tuples, dimension names) of sets and maps.

use crate::context::Context;
use crate::engine::aff::{local_space_copy, local_space_free, local_space_from_space, local_space_get_ctx, local_space_get_space, RawLocalSpace};
use crate::engine::printer::printer_print_space;
use crate::engine::space::{
    space_alloc, space_copy, space_dim, space_free, space_get_ctx, space_get_dim_name, space_get_tuple_name,
    space_is_equal, space_params_alloc, space_set_alloc, space_set_dim_name, space_set_tuple_name, RawSpace,
};
use crate::engine::DimType;
use crate::error::Result;
use crate::handle::Handle;
use crate::printer::printable;
use crate::resource_kind;

resource_kind! {
    /// Spaces.
    SpaceKind => RawSpace,
    name: "Space",
    copy: space_copy,
    free: space_free,
    context: space_get_ctx,
}

resource_kind! {
    /// Local spaces, the domains of affine expressions.
    LocalSpaceKind => RawLocalSpace,
    name: "LocalSpace",
    copy: local_space_copy,
    free: local_space_free,
    context: local_space_get_ctx,
}

/// A space handle.
pub type Space = Handle<SpaceKind>;

/// A local space handle.
pub type LocalSpace = Handle<LocalSpaceKind>;

/// A named tuple of named dimensions, used to build spaces.
///
/// ```
/// use isle::Tuple;
///
/// let t = Tuple::new("A", &["i", "j"]);
/// assert_eq!(t.name(), Some("A"));
/// assert_eq!(t.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tuple {
    name: Option<String>,
    dims: Vec<String>,
}

impl Tuple {
    /// Tuple `name[dims...]`.
    pub fn new(name: &str, dims: &[&str]) -> Self {
        Tuple {
            name: Some(name.to_string()),
            dims: dims.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Unnamed tuple `[dims...]`.
    pub fn anonymous(dims: &[&str]) -> Self {
        Tuple {
            name: None,
            dims: dims.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Tuple name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.dims.len()
    }

    /// Whether the tuple has no dimensions.
    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }
}

/// Apply parameter names and tuples to a freshly allocated space (take).
unsafe fn name_dims(mut raw: *mut RawSpace, params: &[&str], tuples: &[(DimType, &Tuple)]) -> *mut RawSpace {
    // SAFETY: each call takes the previous result and returns the next one;
    // null is passed through.
    unsafe {
        for (pos, name) in params.iter().enumerate() {
            raw = space_set_dim_name(raw, DimType::Param, pos, name);
        }
        for (ty, tuple) in tuples {
            if let Some(name) = tuple.name() {
                raw = space_set_tuple_name(raw, *ty, name);
            }
            for (pos, name) in tuple.dims.iter().enumerate() {
                raw = space_set_dim_name(raw, *ty, pos, name);
            }
        }
    }
    raw
}

impl Space {
    /// Parameter-only space with unnamed parameters.
    pub fn for_parameters(ctx: &Context, nparam: usize) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { space_params_alloc(ctx.as_ptr(), nparam) })
    }

    /// Set space with unnamed dimensions.
    pub fn for_set(ctx: &Context, nparam: usize, dim: usize) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { space_set_alloc(ctx.as_ptr(), nparam, dim) })
    }

    /// Map space with unnamed dimensions.
    pub fn for_map(ctx: &Context, nparam: usize, n_in: usize, n_out: usize) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { space_alloc(ctx.as_ptr(), nparam, n_in, n_out) })
    }

    /// Parameter-only space `[params] -> { : }`.
    pub fn params(ctx: &Context, params: &[&str]) -> Result<Self> {
        // SAFETY: the context is live; the allocation is handed to `name_dims`.
        let raw = unsafe { name_dims(space_params_alloc(ctx.as_ptr(), params.len()), params, &[]) };
        Self::adopt(ctx, raw)
    }

    /// Set space `[params] -> { vars }`.
    ///
    /// ```
    /// use isle::{Context, DimType, Space, Tuple};
    ///
    /// let ctx = Context::new();
    /// let space = Space::set(&ctx, &["N"], &Tuple::new("A", &["i", "j"]))?;
    /// assert_eq!(space.dim(DimType::Set), Some(2));
    /// assert_eq!(space.to_string(), "[N] -> { A[i, j] }");
    /// # Ok::<(), isle::Error>(())
    /// ```
    pub fn set(ctx: &Context, params: &[&str], vars: &Tuple) -> Result<Self> {
        // SAFETY: the context is live; the allocation is handed to `name_dims`.
        let raw = unsafe {
            name_dims(
                space_set_alloc(ctx.as_ptr(), params.len(), vars.len()),
                params,
                &[(DimType::Set, vars)],
            )
        };
        Self::adopt(ctx, raw)
    }

    /// Map space `[params] -> { input -> output }`.
    pub fn map(ctx: &Context, params: &[&str], input: &Tuple, output: &Tuple) -> Result<Self> {
        // SAFETY: the context is live; the allocation is handed to `name_dims`.
        let raw = unsafe {
            name_dims(
                space_alloc(ctx.as_ptr(), params.len(), input.len(), output.len()),
                params,
                &[(DimType::In, input), (DimType::Out, output)],
            )
        };
        Self::adopt(ctx, raw)
    }

    /// Rename the tuple of class `ty`.
    pub fn with_tuple_name(self, ty: DimType, name: &str) -> Result<Self> {
        // SAFETY: our reference is handed over.
        self.consume(|raw| unsafe { space_set_tuple_name(raw, ty, name) })
    }

    /// Rename dimension `pos` of class `ty`.
    pub fn with_dim_name(self, ty: DimType, pos: usize, name: &str) -> Result<Self> {
        // SAFETY: our reference is handed over.
        self.consume(|raw| unsafe { space_set_dim_name(raw, ty, pos, name) })
    }

    /// Number of dimensions of class `ty`; `None` when the space has no such class.
    pub fn dim(&self, ty: DimType) -> Option<usize> {
        // SAFETY: the space is live.
        usize::try_from(unsafe { space_dim(self.as_ptr(), ty) }).ok()
    }

    /// Name of dimension `pos` of class `ty`.
    pub fn dim_name(&self, ty: DimType, pos: usize) -> Option<String> {
        // SAFETY: the space is live.
        unsafe { space_get_dim_name(self.as_ptr(), ty, pos) }
    }

    /// Name of the tuple of class `ty`.
    pub fn tuple_name(&self, ty: DimType) -> Option<String> {
        // SAFETY: the space is live.
        unsafe { space_get_tuple_name(self.as_ptr(), ty) }
    }

    /// Engine equality: same shape and tuple names.
    pub fn is_equal(&self, other: &Space) -> Result<bool> {
        // SAFETY: both spaces are live.
        self.context().check(unsafe { space_is_equal(self.as_ptr(), other.as_ptr()) })
    }
}

impl LocalSpace {
    /// Local space over `space`.
    pub fn from_space(space: &Space) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(space.context(), unsafe { local_space_from_space(space.copy_raw()) })
    }

    /// The underlying space.
    pub fn space(&self) -> Result<Space> {
        // SAFETY: the local space is live.
        Space::adopt(self.context(), unsafe { local_space_get_space(self.as_ptr()) })
    }
}

printable!(Space, printer_print_space);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextOptions, ErrorAction};

    fn quiet() -> Context {
        Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Continue))
    }

    #[test]
    fn anonymous_set_space() {
        let ctx = quiet();
        let space = Space::for_set(&ctx, 1, 3).unwrap();
        assert_eq!(space.dim(DimType::Param), Some(1));
        assert_eq!(space.dim(DimType::Set), Some(3));
        assert_eq!(space.dim(DimType::In), None);
        assert_eq!(space.dim_name(DimType::Set, 0), None);
    }

    #[test]
    fn named_map_space() {
        let ctx = quiet();
        let space = Space::map(&ctx, &["N"], &Tuple::new("S", &["i"]), &Tuple::anonymous(&["t0", "t1"])).unwrap();
        assert_eq!(space.dim(DimType::In), Some(1));
        assert_eq!(space.dim(DimType::Out), Some(2));
        assert_eq!(space.tuple_name(DimType::In).as_deref(), Some("S"));
        assert_eq!(space.tuple_name(DimType::Out), None);
        assert_eq!(space.dim_name(DimType::Param, 0).as_deref(), Some("N"));
        assert_eq!(space.dim_name(DimType::Out, 1).as_deref(), Some("t1"));
    }

    #[test]
    fn params_only_space() {
        let ctx = quiet();
        let space = Space::params(&ctx, &["N", "M"]).unwrap();
        assert_eq!(space.dim(DimType::Param), Some(2));
        assert_eq!(space.to_string(), "[N, M] -> { : }");
    }

    #[test]
    fn renaming_is_copy_on_write() {
        let ctx = quiet();
        let a = Space::set(&ctx, &[], &Tuple::new("A", &["i"])).unwrap();
        let b = a.clone().with_tuple_name(DimType::Set, "B").unwrap();
        assert_eq!(a.tuple_name(DimType::Set).as_deref(), Some("A"));
        assert_eq!(b.tuple_name(DimType::Set).as_deref(), Some("B"));
        assert!(!a.is_equal(&b).unwrap());
    }

    #[test]
    fn out_of_range_dim_name_fails() {
        let ctx = quiet();
        let space = Space::for_set(&ctx, 0, 1).unwrap();
        let err = space.with_dim_name(DimType::Set, 4, "z").unwrap_err();
        assert!(err.is_construction_failure());
        assert!(err.message().is_some_and(|m| m.contains("out of bounds")));
        assert_eq!(ctx.live_objects(), 0);
    }

    #[test]
    fn local_space_round_trip() {
        let ctx = quiet();
        let space = Space::set(&ctx, &[], &Tuple::new("A", &["a", "b"])).unwrap();
        let ls = LocalSpace::from_space(&space).unwrap();
        assert!(ls.space().unwrap().is_equal(&space).unwrap());
        assert_eq!(space.ref_count(), 1);
    }
}
