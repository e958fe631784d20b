//! Dense integer matrices.

use std::fmt::Write as _;

use crate::context::Context;
use crate::engine::mat::{
    mat_alloc, mat_cols, mat_copy, mat_free, mat_get_ctx, mat_get_element_val, mat_rows, mat_set_element_val, RawMat,
};
use crate::engine::printer::printer_print_mat;
use crate::error::Result;
use crate::handle::Handle;
use crate::printer::printable;
use crate::resource_kind;
use crate::value::Value;

resource_kind! {
    /// Matrices.
    MatrixKind => RawMat,
    name: "Matrix",
    copy: mat_copy,
    free: mat_free,
    context: mat_get_ctx,
}

/// A matrix handle.
///
/// ```
/// use isle::{Context, Matrix, Value};
///
/// let ctx = Context::new();
/// let mut m = Matrix::new(&ctx, 2, 2)?;
/// m.set(0, 1, &Value::from_i64(&ctx, 12)?)?;
/// m.set(1, 0, &Value::from_i64(&ctx, -123456)?)?;
/// assert_eq!(m.to_table(4)?, "   0   12\n....    0\n");
/// # Ok::<(), isle::Error>(())
/// ```
pub type Matrix = Handle<MatrixKind>;

impl Matrix {
    /// A zero-filled `rows x columns` matrix.
    pub fn new(ctx: &Context, rows: usize, columns: usize) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { mat_alloc(ctx.as_ptr(), rows, columns) })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        // SAFETY: the matrix is live.
        unsafe { mat_rows(self.as_ptr()) }
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        // SAFETY: the matrix is live.
        unsafe { mat_cols(self.as_ptr()) }
    }

    /// Element `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> Result<Value> {
        // SAFETY: the matrix is live.
        Value::adopt(self.context(), unsafe { mat_get_element_val(self.as_ptr(), row, column) })
    }

    /// Overwrite element `(row, column)` with an integer value.
    ///
    /// Other handles sharing this matrix keep the old contents.
    pub fn set(&mut self, row: usize, column: usize, value: &Value) -> Result<()> {
        let value = value.copy_raw();
        // SAFETY: the engine takes both references.
        self.update(|raw| unsafe { mat_set_element_val(raw, row, column, value) })
    }

    /// Render as text: one line per row, cells right-aligned to `field_width`
    /// and separated by a space. Cells that do not fit are shown as dots.
    pub fn to_table(&self, field_width: usize) -> Result<String> {
        let mut out = String::new();
        for r in 0..self.rows() {
            for c in 0..self.columns() {
                if c > 0 {
                    out.push(' ');
                }
                let v = self.get(r, c)?;
                let text = if v.denominator() == 1 {
                    v.numerator().to_string()
                } else {
                    format!("{}/{}", v.numerator(), v.denominator())
                };
                if text.len() <= field_width {
                    let _ = write!(out, "{:>width$}", text, width = field_width);
                } else {
                    out.push_str(&".".repeat(field_width));
                }
            }
            out.push('\n');
        }
        Ok(out)
    }
}

printable!(Matrix, printer_print_mat);
