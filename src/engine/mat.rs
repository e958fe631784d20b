//! Dense integer matrices.

use super::ctx::Ctx;
use super::object::{derive, refcounted, Obj};
use super::val::{RawVal, ValData};

/// Payload of a matrix, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatData {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) data: Vec<i64>,
}

impl MatData {
    pub(crate) fn row(&self, r: usize) -> &[i64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    fn index(&self, r: usize, c: usize) -> Result<usize, String> {
        if r < self.rows && c < self.cols {
            Ok(r * self.cols + c)
        } else {
            Err(format!(
                "element ({}, {}) out of bounds for a {}x{} matrix",
                r, c, self.rows, self.cols
            ))
        }
    }
}

refcounted!(
    /// Engine matrix object.
    RawMat = MatData,
    mat_copy,
    mat_free,
    mat_get_ctx
);

/// Allocate a zero-filled `rows x cols` matrix.
///
/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn mat_alloc(ctx: *mut Ctx, rows: usize, cols: usize) -> *mut RawMat {
    let Some(len) = rows.checked_mul(cols) else {
        // SAFETY: forwarded from the caller.
        unsafe { (*ctx).report("matrix dimensions overflow") };
        return std::ptr::null_mut();
    };
    // SAFETY: forwarded from the caller.
    unsafe {
        Obj::alloc(
            ctx,
            MatData {
                rows,
                cols,
                data: vec![0; len],
            },
        )
    }
}

/// # Safety
///
/// `m` must be a live matrix (keep).
pub unsafe fn mat_rows(m: *const RawMat) -> usize {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(m) }.rows
}

/// # Safety
///
/// `m` must be a live matrix (keep).
pub unsafe fn mat_cols(m: *const RawMat) -> usize {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(m) }.cols
}

/// Element `(r, c)` as a value (keep).
///
/// # Safety
///
/// `m` must be a live matrix.
pub unsafe fn mat_get_element_val(m: *const RawMat, r: usize, c: usize) -> *mut RawVal {
    // SAFETY: forwarded from the caller.
    unsafe { derive(m, |data| Ok(ValData::int(data.data[data.index(r, c)?]))) }
}

/// Set element `(r, c)` to an integer value (take, take).
///
/// # Safety
///
/// Both pointers must be null or live objects owned by the caller.
pub unsafe fn mat_set_element_val(m: *mut RawMat, r: usize, c: usize, v: *mut RawVal) -> *mut RawMat {
    if m.is_null() || v.is_null() {
        // SAFETY: both are null or owned by the caller.
        unsafe {
            mat_free(m);
            Obj::free(v);
        }
        return std::ptr::null_mut();
    }
    // SAFETY: caller owns both.
    unsafe {
        let v = Obj::take(v);
        let checked = Obj::get(m).index(r, c).and_then(|i| {
            if v.is_int() {
                Ok(i)
            } else {
                Err("matrix elements must be integers".to_string())
            }
        });
        match checked {
            Ok(i) => {
                let m = Obj::make_unique(m);
                Obj::get_mut(m).data[i] = v.num;
                m
            }
            Err(message) => {
                Obj::report(m, message);
                mat_free(m);
                std::ptr::null_mut()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ctx::{ctx_alloc, ctx_free, ctx_live_objects, ctx_set_on_error};
    use crate::engine::val::{val_get_num_si, val_int_from_si, val_rat};
    use crate::engine::OnError;

    #[test]
    fn set_then_get() {
        let ctx = ctx_alloc();
        unsafe {
            let m = mat_alloc(ctx, 2, 3);
            let m = mat_set_element_val(m, 1, 2, val_int_from_si(ctx, 7));
            let v = mat_get_element_val(m, 1, 2);
            assert_eq!(val_get_num_si(v), 7);
            assert_eq!(Obj::get(m).row(0), &[0, 0, 0]);
            Obj::free(v);
            mat_free(m);
            assert_eq!(ctx_live_objects(ctx), 0);
            ctx_free(ctx);
        }
    }

    #[test]
    fn rejects_fractions_and_out_of_range() {
        let ctx = ctx_alloc();
        unsafe {
            ctx_set_on_error(ctx, OnError::Continue);
            let m = mat_alloc(ctx, 1, 1);
            assert!(mat_set_element_val(mat_copy(m), 0, 0, val_rat(ctx, 1, 2)).is_null());
            assert!(mat_set_element_val(mat_copy(m), 3, 0, val_int_from_si(ctx, 1)).is_null());
            assert!(mat_get_element_val(m, 0, 4).is_null());
            mat_free(m);
            assert_eq!(ctx_live_objects(ctx), 0);
            ctx_free(ctx);
        }
    }
}
