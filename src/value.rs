//! Exact rational values.

use crate::context::Context;
use crate::engine::printer::printer_print_val;
use crate::engine::val::{
    val_add, val_copy, val_eq, val_free, val_get_ctx, val_get_d, val_get_den_si, val_get_num_si, val_int_from_si,
    val_is_int, val_mul, val_neg, val_rat, val_sub, RawVal,
};
use crate::error::Result;
use crate::handle::Handle;
use crate::printer::printable;
use crate::resource_kind;

resource_kind! {
    /// Values.
    ValueKind => RawVal,
    name: "Value",
    copy: val_copy,
    free: val_free,
    context: val_get_ctx,
}

/// A value handle.
///
/// ```
/// use isle::{Context, Value};
///
/// let ctx = Context::new();
/// let half = Value::rational(&ctx, 2, 4)?;
/// let sum = half.add(&Value::from_i64(&ctx, 1)?)?;
/// assert_eq!((sum.numerator(), sum.denominator()), (3, 2));
/// # Ok::<(), isle::Error>(())
/// ```
pub type Value = Handle<ValueKind>;

impl Value {
    /// Integer value.
    pub fn from_i64(ctx: &Context, v: i64) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { val_int_from_si(ctx.as_ptr(), v) })
    }

    /// `num / den` in lowest terms. A zero denominator fails.
    pub fn rational(ctx: &Context, num: i64, den: i64) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { val_rat(ctx.as_ptr(), num, den) })
    }

    /// Numerator in lowest terms (sign included).
    pub fn numerator(&self) -> i64 {
        // SAFETY: the value is live.
        unsafe { val_get_num_si(self.as_ptr()) }
    }

    /// Denominator in lowest terms, always positive.
    pub fn denominator(&self) -> i64 {
        // SAFETY: the value is live.
        unsafe { val_get_den_si(self.as_ptr()) }
    }

    /// Nearest `f64`.
    pub fn to_f64(&self) -> f64 {
        // SAFETY: the value is live.
        unsafe { val_get_d(self.as_ptr()) }
    }

    /// Whether the denominator is one.
    pub fn is_integer(&self) -> Result<bool> {
        // SAFETY: the value is live.
        self.context().check(unsafe { val_is_int(self.as_ptr()) })
    }

    /// `self + other`.
    pub fn add(&self, other: &Value) -> Result<Value> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { val_add(self.copy_raw(), other.copy_raw()) })
    }

    /// `self - other`.
    pub fn sub(&self, other: &Value) -> Result<Value> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { val_sub(self.copy_raw(), other.copy_raw()) })
    }

    /// `self * other`.
    pub fn mul(&self, other: &Value) -> Result<Value> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(self.context(), unsafe { val_mul(self.copy_raw(), other.copy_raw()) })
    }

    /// `-self`.
    pub fn neg(&self) -> Result<Value> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(self.context(), unsafe { val_neg(self.copy_raw()) })
    }

    /// Engine equality.
    pub fn is_equal(&self, other: &Value) -> Result<bool> {
        // SAFETY: both values are live.
        self.context().check(unsafe { val_eq(self.as_ptr(), other.as_ptr()) })
    }
}

printable!(Value, printer_print_val);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextOptions, ErrorAction};

    fn quiet() -> Context {
        Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Continue))
    }

    #[test]
    fn rationals_are_normalized() {
        let ctx = quiet();
        let v = Value::rational(&ctx, 6, -4).unwrap();
        assert_eq!(v.numerator(), -3);
        assert_eq!(v.denominator(), 2);
        assert_eq!(v.to_f64(), -1.5);
        assert!(!v.is_integer().unwrap());
    }

    #[test]
    fn zero_denominator_fails() {
        let ctx = quiet();
        let err = Value::rational(&ctx, 1, 0).unwrap_err();
        assert!(err.is_construction_failure());
        assert!(err.message().is_some());
    }

    #[test]
    fn arithmetic_leaves_operands_alone() {
        let ctx = quiet();
        let a = Value::rational(&ctx, 1, 3).unwrap();
        let b = Value::rational(&ctx, 1, 6).unwrap();
        let sum = a.add(&b).unwrap();
        assert!(sum.is_equal(&Value::rational(&ctx, 1, 2).unwrap()).unwrap());
        let diff = a.sub(&b).unwrap();
        assert!(diff.is_equal(&b).unwrap());
        let product = a.mul(&b).unwrap();
        assert_eq!((product.numerator(), product.denominator()), (1, 18));
        assert_eq!(a.neg().unwrap().numerator(), -1);
        assert_eq!(a.ref_count(), 1);
        assert_eq!(b.ref_count(), 1);
    }

    #[test]
    fn integers_print_without_denominator() {
        let ctx = quiet();
        assert_eq!(Value::from_i64(&ctx, -7).unwrap().to_string(), "-7");
        assert!(Value::from_i64(&ctx, 4).unwrap().is_integer().unwrap());
    }
}
