//! Integer points, as produced by [`Set::sample_point`](crate::Set::sample_point).

use crate::engine::point::{point_copy, point_free, point_get_coordinate_val, point_get_ctx, point_get_space, RawPoint};
use crate::engine::printer::printer_print_point;
use crate::engine::DimType;
use crate::error::Result;
use crate::handle::Handle;
use crate::printer::printable;
use crate::resource_kind;
use crate::space::Space;
use crate::value::Value;

resource_kind! {
    /// Points.
    PointKind => RawPoint,
    name: "Point",
    copy: point_copy,
    free: point_free,
    context: point_get_ctx,
}

/// A point handle.
pub type Point = Handle<PointKind>;

impl Point {
    /// Coordinate of dimension `pos` of class `ty`.
    pub fn coordinate(&self, ty: DimType, pos: usize) -> Result<Value> {
        // SAFETY: the point is live.
        Value::adopt(self.context(), unsafe { point_get_coordinate_val(self.as_ptr(), ty, pos) })
    }

    /// The space the point lives in.
    pub fn space(&self) -> Result<Space> {
        // SAFETY: the point is live.
        Space::adopt(self.context(), unsafe { point_get_space(self.as_ptr()) })
    }
}

printable!(Point, printer_print_point);
