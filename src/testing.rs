//! Testing utilities for code built on isle.
//!
//! # Examples
//!
//! ## Assertion macros
//!
//! ```rust
//! use isle::{assert_construction_failure, assert_no_solution};
//! use isle::{Context, ContextOptions, DimType, ErrorAction, Expression, LocalSpace, Set};
//!
//! let ctx = Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Continue));
//! let empty = Set::parse(&ctx, "{ A[a] : false }").unwrap();
//! let ls = LocalSpace::from_space(&empty.space().unwrap()).unwrap();
//! let a = Expression::variable(&ls, DimType::Set, 0).unwrap();
//!
//! assert_no_solution!(empty.minimum(&a));
//! assert_construction_failure!(Set::parse(&ctx, "{ A[a] : a + }"));
//! ```
//!
//! ## Leak probe
//!
//! ```rust
//! use isle::testing::LiveObjects;
//! use isle::{Context, Set};
//!
//! let ctx = Context::new();
//! let probe = LiveObjects::new(&ctx);
//! {
//!     let s = Set::parse(&ctx, "{ A[a] : a >= 0 }").unwrap();
//!     let _t = s.clone();
//!     assert_eq!(probe.delta(), 1);
//! }
//! probe.assert_balanced();
//! ```

use crate::context::Context;

/// Records a context's live-object count so a test can check that everything
/// it created was released again.
#[derive(Debug, Clone)]
pub struct LiveObjects {
    ctx: Context,
    baseline: usize,
}

impl LiveObjects {
    /// Start counting from the current number of live objects in `ctx`.
    pub fn new(ctx: &Context) -> Self {
        LiveObjects {
            ctx: ctx.clone(),
            baseline: ctx.live_objects(),
        }
    }

    /// Objects allocated since the probe was created and not yet freed.
    pub fn delta(&self) -> isize {
        self.ctx.live_objects() as isize - self.baseline as isize
    }

    /// Panic unless the live-object count is back at the baseline.
    #[track_caller]
    pub fn assert_balanced(&self) {
        let delta = self.delta();
        if delta != 0 {
            panic!("Expected no leaked objects, found a delta of {}", delta);
        }
    }
}

/// Assert that a query reported [`ErrorKind::NoSolution`](crate::ErrorKind::NoSolution).
///
/// # Example
///
/// ```rust
/// use isle::{assert_no_solution, Error, ErrorKind};
///
/// let res: Result<(), Error> = Err(Error::new(ErrorKind::NoSolution));
/// assert_no_solution!(res);
/// ```
#[macro_export]
macro_rules! assert_no_solution {
    ($result:expr) => {
        match $result {
            Err(e) if e.is_no_solution() => {}
            Err(e) => panic!("Expected NoSolution, got error: {}", e),
            Ok(v) => panic!("Expected NoSolution, got Ok: {:?}", v),
        }
    };
}

/// Assert that an engine call failed with
/// [`ErrorKind::ConstructionFailure`](crate::ErrorKind::ConstructionFailure).
///
/// The optional second argument must be a substring of the engine diagnostic.
///
/// # Example
///
/// ```rust
/// use isle::{assert_construction_failure, Error, ErrorKind};
///
/// let res: Result<(), Error> =
///     Err(Error::new(ErrorKind::ConstructionFailure).with_message("parse error: unexpected '+'"));
/// assert_construction_failure!(res, "parse error");
/// ```
#[macro_export]
macro_rules! assert_construction_failure {
    ($result:expr) => {
        match $result {
            Err(e) if e.is_construction_failure() => {}
            Err(e) => panic!("Expected ConstructionFailure, got error: {}", e),
            Ok(v) => panic!("Expected ConstructionFailure, got Ok: {:?}", v),
        }
    };
    ($result:expr, $needle:expr) => {
        match $result {
            Err(e) if e.is_construction_failure() => {
                let message = e.message().unwrap_or_default();
                assert!(
                    message.contains($needle),
                    "Expected diagnostic containing {:?}, got {:?}",
                    $needle,
                    message
                );
            }
            Err(e) => panic!("Expected ConstructionFailure, got error: {}", e),
            Ok(v) => panic!("Expected ConstructionFailure, got Ok: {:?}", v),
        }
    };
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

/// Text of a two-dimensional box set `{ A[a, b] : ... }` with finite bounds.
#[cfg(feature = "proptest")]
pub fn box_set_text() -> impl Strategy<Value = String> {
    let bounds = (-50i64..50, 0i64..20).prop_map(|(lo, len)| (lo, lo + len));
    (bounds.clone(), bounds).prop_map(|((a_lo, a_hi), (b_lo, b_hi))| {
        format!(
            "{{ A[a, b] : {} <= a <= {} and {} <= b <= {} }}",
            a_lo, a_hi, b_lo, b_hi
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextOptions, ErrorAction};
    use crate::error::{Error, ErrorKind};
    use crate::set::Set;

    fn quiet() -> Context {
        Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Continue))
    }

    #[test]
    fn live_objects_track_handles() {
        let ctx = quiet();
        let probe = LiveObjects::new(&ctx);
        let s = Set::parse(&ctx, "{ A[a] : 0 <= a <= 3 }").unwrap();
        let u = s.union(&s).unwrap();
        assert_eq!(probe.delta(), 2);
        drop((s, u));
        probe.assert_balanced();
    }

    #[test]
    #[should_panic(expected = "Expected no leaked objects")]
    fn assert_balanced_panics_on_leak() {
        let ctx = quiet();
        let probe = LiveObjects::new(&ctx);
        let _kept = Set::parse(&ctx, "{ A[a] }").unwrap();
        probe.assert_balanced();
    }

    #[test]
    fn construction_failure_macro_checks_message() {
        let ctx = quiet();
        assert_construction_failure!(Set::parse(&ctx, "{ A[a] : a + }"), "parse error");
    }

    #[test]
    #[should_panic(expected = "Expected NoSolution, got error")]
    fn no_solution_macro_rejects_other_kinds() {
        let res: Result<(), Error> = Err(Error::new(ErrorKind::ConstructionFailure));
        assert_no_solution!(res);
    }

    #[test]
    #[should_panic(expected = "Expected ConstructionFailure, got Ok")]
    fn construction_failure_macro_rejects_success() {
        let res: Result<i32, Error> = Ok(3);
        assert_construction_failure!(res);
    }

    #[cfg(feature = "proptest")]
    mod proptest_tests {
        use super::*;

        proptest! {
            #[test]
            fn generated_text_parses(text in box_set_text()) {
                let ctx = quiet();
                let set = Set::parse(&ctx, &text).unwrap();
                prop_assert!(!set.is_empty().unwrap());
            }
        }
    }
}
