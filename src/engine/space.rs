//! Spaces: parameter names plus the named tuples of a set or map.

use super::ctx::Ctx;
use super::object::{refcounted, Obj};
use super::{Bool, DimType};

/// A named tuple of dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Tuple {
    pub(crate) name: Option<String>,
    pub(crate) dims: Vec<Option<String>>,
}

impl Tuple {
    pub(crate) fn anonymous(len: usize) -> Self {
        Tuple {
            name: None,
            dims: vec![None; len],
        }
    }

    /// Tuples match when their names and lengths agree; dimension names are labels.
    pub(crate) fn matches(&self, other: &Tuple) -> bool {
        self.name == other.name && self.dims.len() == other.dims.len()
    }
}

/// Payload of a space object.
///
/// A parameter space has neither tuple, a set space only `output`, a map space
/// both. Dimensions are laid out as `params ++ input ++ output`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpaceData {
    pub(crate) params: Vec<Option<String>>,
    pub(crate) input: Option<Tuple>,
    pub(crate) output: Option<Tuple>,
}

impl SpaceData {
    pub(crate) fn params_only(nparam: usize) -> Self {
        SpaceData {
            params: vec![None; nparam],
            input: None,
            output: None,
        }
    }

    pub(crate) fn set(nparam: usize, dim: usize) -> Self {
        SpaceData {
            params: vec![None; nparam],
            input: None,
            output: Some(Tuple::anonymous(dim)),
        }
    }

    pub(crate) fn map(nparam: usize, n_in: usize, n_out: usize) -> Self {
        SpaceData {
            params: vec![None; nparam],
            input: Some(Tuple::anonymous(n_in)),
            output: Some(Tuple::anonymous(n_out)),
        }
    }

    pub(crate) fn is_map(&self) -> bool {
        self.input.is_some()
    }

    pub(crate) fn is_set(&self) -> bool {
        self.input.is_none() && self.output.is_some()
    }

    pub(crate) fn n_param(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn n_in(&self) -> usize {
        self.input.as_ref().map_or(0, |t| t.dims.len())
    }

    pub(crate) fn n_out(&self) -> usize {
        self.output.as_ref().map_or(0, |t| t.dims.len())
    }

    pub(crate) fn total(&self) -> usize {
        self.n_param() + self.n_in() + self.n_out()
    }

    /// Number of dimensions of a class, or `None` when the class does not exist here.
    pub(crate) fn dim(&self, ty: DimType) -> Option<usize> {
        match ty {
            DimType::Param => Some(self.n_param()),
            DimType::In if self.is_map() => Some(self.n_in()),
            DimType::Out if self.is_map() => Some(self.n_out()),
            DimType::Set if self.is_set() => Some(self.n_out()),
            DimType::Div => Some(0),
            _ => None,
        }
    }

    /// Column of dimension `pos` of class `ty` in the flat layout.
    pub(crate) fn column(&self, ty: DimType, pos: usize) -> Option<usize> {
        let len = self.dim(ty)?;
        if pos >= len || ty == DimType::Div {
            return None;
        }
        Some(match ty {
            DimType::Param => pos,
            DimType::In => self.n_param() + pos,
            _ => self.n_param() + self.n_in() + pos,
        })
    }

    fn tuple_mut(&mut self, ty: DimType) -> Option<&mut Tuple> {
        match ty {
            DimType::In if self.input.is_some() => self.input.as_mut(),
            DimType::Out if self.input.is_some() => self.output.as_mut(),
            DimType::Set if self.input.is_none() => self.output.as_mut(),
            _ => None,
        }
    }

    pub(crate) fn tuple(&self, ty: DimType) -> Option<&Tuple> {
        match ty {
            DimType::In => self.input.as_ref(),
            DimType::Out if self.input.is_some() => self.output.as_ref(),
            DimType::Set if self.input.is_none() => self.output.as_ref(),
            _ => None,
        }
    }

    /// Spaces are compatible for set algebra when parameter counts and tuples match.
    pub(crate) fn matches(&self, other: &SpaceData) -> bool {
        fn same(a: &Option<Tuple>, b: &Option<Tuple>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => a.matches(b),
                _ => false,
            }
        }
        self.params.len() == other.params.len()
            && same(&self.input, &other.input)
            && same(&self.output, &other.output)
    }

    /// Name used when printing column `col`; unnamed dimensions get positional names.
    pub(crate) fn column_name(&self, col: usize) -> String {
        let np = self.n_param();
        let ni = self.n_in();
        if col < np {
            return self.params[col].clone().unwrap_or_else(|| format!("p{}", col));
        }
        if col < np + ni {
            let pos = col - np;
            return self.input.as_ref().and_then(|t| t.dims[pos].clone()).unwrap_or_else(|| format!("i{}", pos));
        }
        let pos = col - np - ni;
        let generated = if self.is_map() {
            format!("o{}", pos)
        } else {
            format!("i{}", pos)
        };
        self.output
            .as_ref()
            .and_then(|t| t.dims[pos].clone())
            .unwrap_or(generated)
    }

    /// Set space of the input tuple of a map space.
    pub(crate) fn domain(&self) -> SpaceData {
        SpaceData {
            params: self.params.clone(),
            input: None,
            output: self.input.clone(),
        }
    }

    /// Set space of the output tuple of a map space.
    pub(crate) fn range(&self) -> SpaceData {
        SpaceData {
            params: self.params.clone(),
            input: None,
            output: self.output.clone(),
        }
    }

    pub(crate) fn reverse(&self) -> SpaceData {
        SpaceData {
            params: self.params.clone(),
            input: self.output.clone(),
            output: self.input.clone(),
        }
    }

    /// Map space from `domain`'s tuple to `range`'s tuple.
    pub(crate) fn join(domain: &SpaceData, range: &SpaceData) -> SpaceData {
        SpaceData {
            params: domain.params.clone(),
            input: domain.output.clone(),
            output: range.output.clone(),
        }
    }
}

refcounted!(
    /// Engine space object.
    RawSpace = SpaceData,
    space_copy,
    space_free,
    space_get_ctx
);

/// Allocate a parameter-only space with `nparam` unnamed parameters.
///
/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn space_params_alloc(ctx: *mut Ctx, nparam: usize) -> *mut RawSpace {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::alloc(ctx, SpaceData::params_only(nparam)) }
}

/// Allocate an unnamed set space.
///
/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn space_set_alloc(ctx: *mut Ctx, nparam: usize, dim: usize) -> *mut RawSpace {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::alloc(ctx, SpaceData::set(nparam, dim)) }
}

/// Allocate an unnamed map space.
///
/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn space_alloc(ctx: *mut Ctx, nparam: usize, n_in: usize, n_out: usize) -> *mut RawSpace {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::alloc(ctx, SpaceData::map(nparam, n_in, n_out)) }
}

/// Name the tuple of class `ty` (take `space`).
///
/// # Safety
///
/// `space` must be null or a live space owned by the caller.
pub unsafe fn space_set_tuple_name(space: *mut RawSpace, ty: DimType, name: &str) -> *mut RawSpace {
    if space.is_null() {
        return space;
    }
    // SAFETY: caller owns `space`.
    unsafe {
        let space = Obj::make_unique(space);
        match Obj::get_mut(space).tuple_mut(ty) {
            Some(tuple) => {
                tuple.name = Some(name.to_string());
                space
            }
            None => {
                Obj::report(space, format!("space has no {:?} tuple", ty));
                Obj::free(space);
                std::ptr::null_mut()
            }
        }
    }
}

/// Name dimension `pos` of class `ty` (take `space`).
///
/// # Safety
///
/// `space` must be null or a live space owned by the caller.
pub unsafe fn space_set_dim_name(
    space: *mut RawSpace,
    ty: DimType,
    pos: usize,
    name: &str,
) -> *mut RawSpace {
    if space.is_null() {
        return space;
    }
    // SAFETY: caller owns `space`.
    unsafe {
        let space = Obj::make_unique(space);
        let data = Obj::get_mut(space);
        let slot = if ty == DimType::Param {
            data.params.get_mut(pos)
        } else {
            data.tuple_mut(ty).and_then(|t| t.dims.get_mut(pos))
        };
        match slot {
            Some(slot) => {
                *slot = Some(name.to_string());
                space
            }
            None => {
                Obj::report(space, format!("position {} out of bounds for {:?}", pos, ty));
                Obj::free(space);
                std::ptr::null_mut()
            }
        }
    }
}

/// Number of dimensions of class `ty`, or -1 if the class does not exist (keep).
///
/// # Safety
///
/// `space` must be a live space.
pub unsafe fn space_dim(space: *const RawSpace, ty: DimType) -> isize {
    // SAFETY: caller guarantees liveness.
    match unsafe { Obj::get(space) }.dim(ty) {
        Some(n) => n as isize,
        None => -1,
    }
}

/// Name of dimension `pos` of class `ty`, if any (keep).
///
/// # Safety
///
/// `space` must be a live space.
pub unsafe fn space_get_dim_name(space: *const RawSpace, ty: DimType, pos: usize) -> Option<String> {
    // SAFETY: caller guarantees liveness.
    let data = unsafe { Obj::get(space) };
    if ty == DimType::Param {
        return data.params.get(pos).cloned().flatten();
    }
    data.tuple(ty)?.dims.get(pos).cloned().flatten()
}

/// Name of the tuple of class `ty`, if any (keep).
///
/// # Safety
///
/// `space` must be a live space.
pub unsafe fn space_get_tuple_name(space: *const RawSpace, ty: DimType) -> Option<String> {
    // SAFETY: caller guarantees liveness.
    unsafe { Obj::get(space) }.tuple(ty)?.name.clone()
}

/// Whether two spaces are compatible (keep, keep).
///
/// # Safety
///
/// Both pointers must be live spaces.
pub unsafe fn space_is_equal(a: *const RawSpace, b: *const RawSpace) -> Bool {
    // SAFETY: caller guarantees liveness.
    unsafe { Obj::get(a).matches(Obj::get(b)) }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ctx::{ctx_alloc, ctx_free, ctx_live_objects};

    #[test]
    fn layout_columns() {
        let space = SpaceData::map(1, 2, 3);
        assert_eq!(space.total(), 6);
        assert_eq!(space.column(DimType::Param, 0), Some(0));
        assert_eq!(space.column(DimType::In, 1), Some(2));
        assert_eq!(space.column(DimType::Out, 2), Some(5));
        assert_eq!(space.column(DimType::Set, 0), None);
        assert_eq!(space.column(DimType::Out, 3), None);
    }

    #[test]
    fn naming_is_copy_on_write() {
        let ctx = ctx_alloc();
        unsafe {
            let a = space_set_alloc(ctx, 0, 2);
            let b = space_set_tuple_name(space_copy(a), DimType::Set, "A");
            assert_ne!(a, b);
            assert_eq!(space_get_tuple_name(a, DimType::Set), None);
            assert_eq!(space_get_tuple_name(b, DimType::Set).as_deref(), Some("A"));
            space_free(a);
            space_free(b);
            assert_eq!(ctx_live_objects(ctx), 0);
            ctx_free(ctx);
        }
    }

    #[test]
    fn naming_missing_tuple_fails() {
        let ctx = ctx_alloc();
        unsafe {
            crate::engine::ctx::ctx_set_on_error(ctx, crate::engine::OnError::Continue);
            let p = space_params_alloc(ctx, 1);
            let p = space_set_tuple_name(p, DimType::Set, "A");
            assert!(p.is_null());
            assert_eq!(ctx_live_objects(ctx), 0);
            ctx_free(ctx);
        }
    }

    #[test]
    fn generated_column_names() {
        let space = SpaceData::map(1, 1, 1);
        assert_eq!(space.column_name(0), "p0");
        assert_eq!(space.column_name(1), "i0");
        assert_eq!(space.column_name(2), "o0");
    }
}
