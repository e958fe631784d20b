//! Bundled integer-set engine.
//!
//! This module plays the role of the native library that the rest of the crate
//! adapts. It deliberately exposes a C-shaped surface: every object lives behind a
//! raw pointer, is reference counted by the engine itself, and remembers the
//! native context ([`Ctx`]) it was allocated in.
//!
//! # Calling conventions
//!
//! Every entry point documents each pointer argument as either
//!
//! - **take**: ownership is transferred to the engine, which frees (or reuses) it
//!   even when the call fails, or
//! - **keep**: the pointer is only borrowed for the duration of the call.
//!
//! Functions returning a pointer return a new *owned* pointer, or null on failure.
//! Failures are reported to the owning context, which applies its [`OnError`]
//! policy and records the message (see [`ctx::ctx_last_error`]).
//!
//! Taken pointers with a reference count above one are duplicated before they are
//! modified (copy-on-write), so a `*_copy` is always O(1).
//!
//! # Domain
//!
//! Sets are finite unions of integer boxes: each disjunct bounds every dimension by
//! a closed, possibly unbounded interval. Maps are boxes over
//! `params ++ in ++ out`. Constraints relating two or more dimensions are rejected
//! as unsupported.

pub mod aff;
mod boxes;
pub mod constraint;
pub mod ctx;
mod format;
pub mod map;
pub mod mat;
mod object;
mod parse;
pub mod point;
pub mod printer;
pub mod schedule;
pub mod set;
pub mod space;
pub mod val;

pub use ctx::{Ctx, OnError};
pub use object::{ref_count, Obj};

/// Status returned by engine calls that do not produce an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    /// The call succeeded.
    Ok,
    /// The call failed; the reason was reported to the context.
    Error,
}

/// Three-valued result of engine predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bool {
    /// The predicate does not hold.
    False,
    /// The predicate holds.
    True,
    /// The predicate could not be evaluated.
    Error,
}

impl From<bool> for Bool {
    fn from(value: bool) -> Self {
        if value {
            Bool::True
        } else {
            Bool::False
        }
    }
}

/// Dimension classes of a space.
///
/// `Set` and `Out` address the same dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimType {
    /// Symbolic parameters shared by all tuples.
    Param,
    /// Input dimensions of a map.
    In,
    /// Output dimensions of a map.
    Out,
    /// Dimensions of a set.
    Set,
    /// Existentially quantified dimensions; the box domain never has any.
    Div,
}

/// Output grammars understood by the engine printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// The engine's own notation, accepted back by its parsers.
    #[default]
    Isl,
    /// C boolean/arithmetic expressions.
    C,
    /// Omega calculator notation.
    Omega,
    /// PolyLib constraint matrices.
    PolyLib,
    /// PolyLib matrices with dimension headers.
    ExtPolyLib,
    /// LaTeX math.
    Latex,
}
