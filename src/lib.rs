//! # Isle
//!
//! > *Integer sets, safely held*
//!
//! Owning handles over a reference-counted integer-set engine.
//!
//! ## Philosophy
//!
//! The engine speaks raw pointers: every object carries its own reference
//! count and remembers the native context it was allocated in. **Isle** wraps
//! that surface once, generically:
//! - **[`Handle<K>`]** owns one engine reference and releases it on drop
//! - **[`Context`]** keeps the native context alive while any handle needs it
//! - **[`Registry`]** maps native context pointers back to their one shared [`Context`]
//!
//! Each resource family ([`Set`], [`Map`], [`Expression`], ...) is a marker
//! type implementing [`ResourceKind`], with its algebra added as inherent
//! methods on the matching handle alias.
//!
//! ## Quick Example
//!
//! ```rust
//! use isle::{Context, DimType, Expression, LocalSpace, Set, Value};
//!
//! let ctx = Context::new();
//! let domain = Set::parse(&ctx, "[N] -> { S[i, j] : N = 8 and 0 <= i <= 7 and 2 <= j <= 5 }")?;
//!
//! let ls = LocalSpace::from_space(&domain.space()?)?;
//! let i = Expression::variable(&ls, DimType::Set, 0)?;
//! let j = Expression::variable(&ls, DimType::Set, 1)?;
//! let three = Expression::value(&ls, &Value::from_i64(&ctx, 3)?)?;
//!
//! // Clones are cheap; mutating one leaves the other alone.
//! let mut tight = domain.clone();
//! tight.add_constraint(&i.ge(&three)?)?;
//! assert_eq!(tight.minimum(&i)?.numerator(), 3);
//! assert_eq!(tight.maximum(&i.sub(&j)?)?.numerator(), 5);
//! assert_eq!(domain.minimum(&i)?.numerator(), 0);
//! # Ok::<(), isle::Error>(())
//! ```
//!
//! Failures come back as [`Error`]s carrying the engine's diagnostic; whether
//! the engine also logs or aborts is the context's [`ErrorAction`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod engine;

pub mod constraint;
pub mod context;
pub mod error;
pub mod expression;
pub mod handle;
pub mod kind;
pub mod map;
pub mod matrix;
pub mod point;
pub mod printer;
pub mod registry;
pub mod schedule;
pub mod set;
pub mod space;
pub mod testing;
pub mod utility;
pub mod value;

#[cfg(feature = "serde")]
mod serde_impl;

// Re-exports
pub use constraint::{Constraint, ConstraintKind};
pub use context::{Context, ContextOptions, ErrorAction};
pub use engine::DimType;
pub use error::{Error, ErrorKind, Result};
pub use expression::{Expression, ExpressionKind};
pub use handle::Handle;
pub use kind::ResourceKind;
pub use map::{BasicMap, BasicMapKind, Map, MapKind, UnionMap, UnionMapKind};
pub use matrix::{Matrix, MatrixKind};
pub use point::{Point, PointKind};
pub use printer::{OutputFormat, Print, Printer, PrinterOptions};
pub use registry::Registry;
pub use schedule::{Schedule, ScheduleKind};
pub use set::{BasicSet, BasicSetKind, Set, SetKind, UnionSet, UnionSetKind};
pub use space::{LocalSpace, LocalSpaceKind, Space, SpaceKind, Tuple};
pub use value::{Value, ValueKind};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::constraint::Constraint;
    pub use crate::context::{Context, ContextOptions, ErrorAction};
    pub use crate::engine::DimType;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::expression::Expression;
    pub use crate::handle::Handle;
    pub use crate::map::{BasicMap, Map, UnionMap};
    pub use crate::matrix::Matrix;
    pub use crate::point::Point;
    pub use crate::printer::{OutputFormat, Print, Printer};
    pub use crate::schedule::Schedule;
    pub use crate::set::{BasicSet, Set, UnionSet};
    pub use crate::space::{LocalSpace, Space, Tuple};
    pub use crate::value::Value;
}
