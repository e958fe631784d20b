//! Property-based tests for handle ownership and value semantics

use isle::prelude::*;
use isle::testing::LiveObjects;
use proptest::prelude::*;

fn quiet() -> Context {
    Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Continue))
}

fn box_text(a: (i64, i64), b: (i64, i64)) -> String {
    format!("{{ A[a, b] : {} <= a <= {} and {} <= b <= {} }}", a.0, a.1, b.0, b.1)
}

fn interval() -> impl Strategy<Value = (i64, i64)> {
    (-40i64..40, 0i64..15).prop_map(|(lo, len)| (lo, lo + len))
}

proptest! {
    #[test]
    fn prop_native_text_round_trips(a in interval(), b in interval()) {
        let ctx = quiet();
        let set = Set::parse(&ctx, &box_text(a, b)).unwrap();
        let again = Set::parse(&ctx, &set.to_string()).unwrap();
        prop_assert!(set.is_equal(&again).unwrap());
    }

    #[test]
    fn prop_mutating_a_clone_leaves_the_original(a in interval(), b in interval(), cut in -40i64..55) {
        let ctx = quiet();
        let original = Set::parse(&ctx, &box_text(a, b)).unwrap();
        let snapshot = Set::parse(&ctx, &box_text(a, b)).unwrap();

        let mut copy = original.clone();
        let ls = LocalSpace::from_space(&copy.space().unwrap()).unwrap();
        let x = Expression::variable(&ls, DimType::Set, 0).unwrap();
        let bound = Expression::value(&ls, &Value::from_i64(&ctx, cut).unwrap()).unwrap();
        copy.add_constraint(&x.le(&bound).unwrap()).unwrap();

        prop_assert!(original.is_equal(&snapshot).unwrap());
        prop_assert!(copy.is_subset(&original).unwrap());
        prop_assert_eq!(original.ref_count(), 1);
    }

    #[test]
    fn prop_clones_balance_reference_counts(n in 1usize..32) {
        let ctx = quiet();
        let probe = LiveObjects::new(&ctx);
        let set = Set::parse(&ctx, "{ A[a] : 0 <= a <= 9 }").unwrap();
        let clones: Vec<Set> = (0..n).map(|_| set.clone()).collect();
        prop_assert_eq!(set.ref_count(), n + 1);
        prop_assert_eq!(probe.delta(), 1);
        drop(clones);
        prop_assert_eq!(set.ref_count(), 1);
        drop(set);
        probe.assert_balanced();
    }

    #[test]
    fn prop_lex_minimum_is_the_lower_corner(a in interval(), b in interval()) {
        let ctx = quiet();
        let set = Set::parse(&ctx, &box_text(a, b)).unwrap();
        let corner = Set::parse(&ctx, &format!("{{ A[a, b] : a = {} and b = {} }}", a.0, b.0)).unwrap();
        prop_assert!(set.lex_minimum().unwrap().is_equal(&corner).unwrap());
        let point = set.sample_point().unwrap();
        prop_assert_eq!(point.coordinate(DimType::Set, 0).unwrap().numerator(), a.0);
    }
}

#[test]
fn assignment_between_handles() {
    let ctx = quiet();
    let probe = LiveObjects::new(&ctx);
    let a = Set::parse(&ctx, "{ A[a] : a = 1 }").unwrap();
    let mut b = Set::parse(&ctx, "{ A[a] : a = 2 }").unwrap();

    b.assign(&a);
    assert!(b.ptr_eq(&a));
    assert_eq!(a.ref_count(), 2);
    assert_eq!(probe.delta(), 1);

    // Equal pointers: nothing is released or copied.
    b.clone_from(&a);
    assert_eq!(a.ref_count(), 2);

    let c = b.clone();
    b.assign(&c);
    assert_eq!(a.ref_count(), 3);

    drop((a, b, c));
    probe.assert_balanced();
}

#[test]
fn handles_move_between_threads() {
    let ctx = quiet();
    let set = Set::parse(&ctx, "{ A[a] : 0 <= a <= 9 }").unwrap();
    let moved = set.clone();
    let printed = std::thread::spawn(move || moved.to_string()).join().unwrap();
    assert_eq!(printed, set.to_string());
    assert_eq!(set.ref_count(), 1);
}

#[test]
fn minimizing_over_the_empty_set_has_no_solution() {
    let ctx = quiet();
    let empty = Set::parse(&ctx, "{ A[a] : a >= 4 and a <= 3 }").unwrap();
    let ls = LocalSpace::from_space(&empty.space().unwrap()).unwrap();
    let a = Expression::variable(&ls, DimType::Set, 0).unwrap();
    isle::assert_no_solution!(empty.minimum(&a));
    isle::assert_no_solution!(empty.maximum(&a));
    isle::assert_no_solution!(empty.sample_point());
    isle::assert_no_solution!(empty.lex_minimum());
}
