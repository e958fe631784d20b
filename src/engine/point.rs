//! Integer points.

use super::object::refcounted;
use super::space::{RawSpace, SpaceData};
use super::val::{RawVal, ValData};
use super::DimType;

/// Payload of a point: one coordinate per column of `space`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointData {
    pub(crate) space: SpaceData,
    pub(crate) coords: Vec<i64>,
}

refcounted!(
    /// Engine point object.
    RawPoint = PointData,
    point_copy,
    point_free,
    point_get_ctx
);

/// Coordinate of dimension `pos` of class `ty` (keep).
///
/// # Safety
///
/// `p` must be a live point.
pub unsafe fn point_get_coordinate_val(p: *const RawPoint, ty: DimType, pos: usize) -> *mut RawVal {
    // SAFETY: forwarded from the caller.
    unsafe {
        super::object::derive(p, |data| {
            let col = data
                .space
                .column(ty, pos)
                .ok_or_else(|| format!("position {} out of bounds for {:?}", pos, ty))?;
            Ok(ValData::int(data.coords[col]))
        })
    }
}

/// Space of the point (keep).
///
/// # Safety
///
/// `p` must be a live point.
pub unsafe fn point_get_space(p: *const RawPoint) -> *mut RawSpace {
    // SAFETY: forwarded from the caller.
    unsafe { super::object::derive(p, |data| Ok(data.space.clone())) }
}
