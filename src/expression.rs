//! Affine expressions and the comparison builders that turn them into constraints.
//!
//! Comparisons are expressed through differences:
//!
//! | builder      | constraint               |
//! |--------------|--------------------------|
//! | `a.ge(&b)`   | `a - b >= 0`             |
//! | `a.le(&b)`   | `b - a >= 0`             |
//! | `a.eq_to(&b)`| `a - b = 0`              |
//! | `a.gt(&b)`   | `a - b - 1 >= 0`         |
//! | `a.lt(&b)`   | `b - a - 1 >= 0`         |
//!
//! # Example
//!
//! ```
//! use isle::{Context, DimType, Expression, LocalSpace, Space, Tuple, Value};
//!
//! let ctx = Context::new();
//! let space = Space::set(&ctx, &[], &Tuple::new("A", &["a", "b"]))?;
//! let ls = LocalSpace::from_space(&space)?;
//!
//! let a = Expression::variable(&ls, DimType::Set, 0)?;
//! let b = Expression::variable(&ls, DimType::Set, 1)?;
//! let e = a.sub(&b.scale(&Value::from_i64(&ctx, 2)?)?)?
//!     .add_constant(&Value::from_i64(&ctx, 3)?)?;
//! assert_eq!(e.to_string(), "{ A[a, b] -> [(a - 2b + 3)] }");
//! # Ok::<(), isle::Error>(())
//! ```

use crate::constraint::Constraint;
use crate::engine::aff::{
    aff_add, aff_add_constant_val, aff_copy, aff_free, aff_get_coefficient_val, aff_get_constant_val, aff_get_ctx,
    aff_get_domain_space, aff_neg, aff_scale_val, aff_sub, aff_val_on_domain, aff_var_on_domain,
    aff_zero_on_domain, RawAff,
};
use crate::engine::printer::printer_print_aff;
use crate::engine::DimType;
use crate::error::Result;
use crate::handle::Handle;
use crate::printer::printable;
use crate::resource_kind;
use crate::space::{LocalSpace, Space};
use crate::value::Value;

resource_kind! {
    /// Affine expressions.
    ExpressionKind => RawAff,
    name: "Expression",
    copy: aff_copy,
    free: aff_free,
    context: aff_get_ctx,
}

/// An affine expression handle.
pub type Expression = Handle<ExpressionKind>;

impl Expression {
    /// The constant zero on `ls`.
    pub fn zero(ls: &LocalSpace) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(ls.context(), unsafe { aff_zero_on_domain(ls.copy_raw()) })
    }

    /// Dimension `pos` of class `ty` as an expression.
    pub fn variable(ls: &LocalSpace, ty: DimType, pos: usize) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(ls.context(), unsafe { aff_var_on_domain(ls.copy_raw(), ty, pos) })
    }

    /// The constant `value` on `ls`.
    pub fn value(ls: &LocalSpace, value: &Value) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(ls.context(), unsafe { aff_val_on_domain(ls.copy_raw(), value.copy_raw()) })
    }

    /// `self + other`.
    pub fn add(&self, other: &Expression) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { aff_add(self.copy_raw(), other.copy_raw()) })
    }

    /// `self - other`.
    pub fn sub(&self, other: &Expression) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { aff_sub(self.copy_raw(), other.copy_raw()) })
    }

    /// `self * factor`.
    pub fn scale(&self, factor: &Value) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { aff_scale_val(self.copy_raw(), factor.copy_raw()) })
    }

    /// `-self`.
    pub fn neg(&self) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(self.context(), unsafe { aff_neg(self.copy_raw()) })
    }

    /// `self + value`.
    pub fn add_constant(&self, value: &Value) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { aff_add_constant_val(self.copy_raw(), value.copy_raw()) })
    }

    /// The constant term.
    pub fn constant(&self) -> Result<Value> {
        // SAFETY: the expression is live.
        Value::adopt(self.context(), unsafe { aff_get_constant_val(self.as_ptr()) })
    }

    /// Coefficient of dimension `pos` of class `ty`.
    pub fn coefficient(&self, ty: DimType, pos: usize) -> Result<Value> {
        // SAFETY: the expression is live.
        Value::adopt(self.context(), unsafe { aff_get_coefficient_val(self.as_ptr(), ty, pos) })
    }

    /// The space the expression is defined on.
    pub fn domain_space(&self) -> Result<Space> {
        // SAFETY: the expression is live.
        Space::adopt(self.context(), unsafe { aff_get_domain_space(self.as_ptr()) })
    }

    fn minus_one(&self) -> Result<Value> {
        Value::from_i64(self.context(), -1)
    }

    /// `self = other`.
    pub fn eq_to(&self, other: &Expression) -> Result<Constraint> {
        Constraint::equality(&self.sub(other)?)
    }

    /// `self >= other`.
    pub fn ge(&self, other: &Expression) -> Result<Constraint> {
        Constraint::inequality(&self.sub(other)?)
    }

    /// `self <= other`.
    pub fn le(&self, other: &Expression) -> Result<Constraint> {
        Constraint::inequality(&other.sub(self)?)
    }

    /// `self > other`.
    pub fn gt(&self, other: &Expression) -> Result<Constraint> {
        Constraint::inequality(&self.sub(other)?.add_constant(&self.minus_one()?)?)
    }

    /// `self < other`.
    pub fn lt(&self, other: &Expression) -> Result<Constraint> {
        Constraint::inequality(&other.sub(self)?.add_constant(&self.minus_one()?)?)
    }
}

printable!(Expression, printer_print_aff);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextOptions, ErrorAction};
    use crate::printer::{OutputFormat, Printer};
    use crate::space::Tuple;

    fn setup() -> (Context, LocalSpace) {
        let ctx = Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Continue));
        let space = Space::set(&ctx, &["N"], &Tuple::new("A", &["a", "b"])).unwrap();
        let ls = LocalSpace::from_space(&space).unwrap();
        (ctx, ls)
    }

    fn int(ctx: &Context, v: i64) -> Value {
        Value::from_i64(ctx, v).unwrap()
    }

    #[test]
    fn coefficients_and_constant() {
        let (ctx, ls) = setup();
        let a = Expression::variable(&ls, DimType::Set, 0).unwrap();
        let n = Expression::variable(&ls, DimType::Param, 0).unwrap();
        let e = a.scale(&int(&ctx, 3)).unwrap().sub(&n).unwrap().add_constant(&int(&ctx, 5)).unwrap();
        assert_eq!(e.coefficient(DimType::Set, 0).unwrap().numerator(), 3);
        assert_eq!(e.coefficient(DimType::Set, 1).unwrap().numerator(), 0);
        assert_eq!(e.coefficient(DimType::Param, 0).unwrap().numerator(), -1);
        assert_eq!(e.constant().unwrap().numerator(), 5);
    }

    #[test]
    fn operands_are_not_consumed() {
        let (ctx, ls) = setup();
        let a = Expression::variable(&ls, DimType::Set, 0).unwrap();
        let b = Expression::variable(&ls, DimType::Set, 1).unwrap();
        let _sum = a.add(&b).unwrap();
        let _neg = a.neg().unwrap();
        assert_eq!(a.ref_count(), 1);
        assert_eq!(b.ref_count(), 1);
        assert_eq!(ls.ref_count(), 1);
        drop((a, b, _sum, _neg, ls));
        assert_eq!(ctx.live_objects(), 0);
    }

    #[test]
    fn out_of_range_variable_fails() {
        let (_, ls) = setup();
        let err = Expression::variable(&ls, DimType::Set, 2).unwrap_err();
        assert!(err.is_construction_failure());
    }

    #[test]
    fn value_expression_is_constant() {
        let (ctx, ls) = setup();
        let half = Value::rational(&ctx, 1, 2).unwrap();
        let e = Expression::value(&ls, &half).unwrap();
        assert!(e.constant().unwrap().is_equal(&half).unwrap());
        let zero = Expression::zero(&ls).unwrap();
        assert_eq!(zero.constant().unwrap().numerator(), 0);
    }

    #[test]
    fn comparison_builders_follow_difference_identities() {
        let (ctx, ls) = setup();
        let a = Expression::variable(&ls, DimType::Set, 0).unwrap();
        let seven = Expression::value(&ls, &int(&ctx, 7)).unwrap();

        let ge = a.ge(&seven).unwrap();
        assert!(!ge.is_equality().unwrap());
        assert_eq!(ge.expression().unwrap().constant().unwrap().numerator(), -7);

        let le = a.le(&seven).unwrap();
        let le_expr = le.expression().unwrap();
        assert_eq!(le_expr.coefficient(DimType::Set, 0).unwrap().numerator(), -1);
        assert_eq!(le_expr.constant().unwrap().numerator(), 7);

        assert!(a.eq_to(&seven).unwrap().is_equality().unwrap());
        assert_eq!(a.gt(&seven).unwrap().expression().unwrap().constant().unwrap().numerator(), -8);
        assert_eq!(a.lt(&seven).unwrap().expression().unwrap().constant().unwrap().numerator(), 6);
    }

    #[test]
    fn c_format() {
        let (ctx, ls) = setup();
        let a = Expression::variable(&ls, DimType::Set, 0).unwrap();
        let b = Expression::variable(&ls, DimType::Set, 1).unwrap();
        let e = b.scale(&int(&ctx, 2)).unwrap().sub(&a).unwrap();
        let mut printer = Printer::to_buffer(&ctx).unwrap();
        printer.set_format(OutputFormat::C).print(&e).unwrap();
        assert_eq!(printer.contents().as_deref(), Some("-a + 2 * b"));
    }
}
