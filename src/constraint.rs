//! Single affine constraints: `e = 0` or `e >= 0`.

use crate::engine::constraint::{
    constraint_copy, constraint_free, constraint_get_aff, constraint_get_ctx, constraint_is_equality,
    equality_from_aff, inequality_from_aff, RawConstraint,
};
use crate::engine::printer::printer_print_constraint;
use crate::error::Result;
use crate::expression::Expression;
use crate::handle::Handle;
use crate::printer::printable;
use crate::resource_kind;

resource_kind! {
    /// Constraints.
    ConstraintKind => RawConstraint,
    name: "Constraint",
    copy: constraint_copy,
    free: constraint_free,
    context: constraint_get_ctx,
}

/// A constraint handle.
pub type Constraint = Handle<ConstraintKind>;

impl Constraint {
    /// `expr = 0`.
    pub fn equality(expr: &Expression) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(expr.context(), unsafe { equality_from_aff(expr.copy_raw()) })
    }

    /// `expr >= 0`.
    pub fn inequality(expr: &Expression) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(expr.context(), unsafe { inequality_from_aff(expr.copy_raw()) })
    }

    /// Whether this is an equality.
    pub fn is_equality(&self) -> Result<bool> {
        // SAFETY: the constraint is live.
        self.context().check(unsafe { constraint_is_equality(self.as_ptr()) })
    }

    /// The constrained expression.
    pub fn expression(&self) -> Result<Expression> {
        // SAFETY: the constraint is live.
        Expression::adopt(self.context(), unsafe { constraint_get_aff(self.as_ptr()) })
    }
}

printable!(Constraint, printer_print_constraint);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::engine::DimType;
    use crate::space::{LocalSpace, Space, Tuple};
    use crate::value::Value;

    #[test]
    fn prints_in_native_format() {
        let ctx = Context::new();
        let space = Space::set(&ctx, &[], &Tuple::new("A", &["a"])).unwrap();
        let ls = LocalSpace::from_space(&space).unwrap();
        let a = Expression::variable(&ls, DimType::Set, 0).unwrap();
        let e = a.add_constant(&Value::from_i64(&ctx, -4).unwrap()).unwrap();
        assert_eq!(Constraint::inequality(&e).unwrap().to_string(), "{ A[a] : a - 4 >= 0 }");
        assert_eq!(Constraint::equality(&e).unwrap().to_string(), "{ A[a] : a - 4 = 0 }");
    }

    #[test]
    fn building_keeps_the_expression() {
        let ctx = Context::new();
        let space = Space::for_set(&ctx, 0, 1).unwrap();
        let ls = LocalSpace::from_space(&space).unwrap();
        let e = Expression::zero(&ls).unwrap();
        let c = Constraint::equality(&e).unwrap();
        assert_eq!(e.ref_count(), 1);
        assert!(c.is_equality().unwrap());
    }
}
