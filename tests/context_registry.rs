//! Integration tests for context sharing through the registry

use std::sync::{Arc, Barrier};
use std::thread;

use isle::engine::ctx::{ctx_alloc, ctx_free, ctx_live_objects};
use isle::engine::set::set_read_from_str;
use isle::prelude::*;
use isle::Registry;

fn isolated() -> (Arc<Registry>, Context) {
    let registry = Arc::new(Registry::new());
    let ctx = Context::with_options(
        ContextOptions::new()
            .with_error_action(ErrorAction::Continue)
            .with_registry(Arc::clone(&registry)),
    );
    (registry, ctx)
}

#[test]
fn handles_recovered_from_raw_share_one_context() {
    let (registry, ctx) = isolated();
    // SAFETY: the context is live and the text is valid.
    let a = unsafe { set_read_from_str(ctx.as_ptr(), "{ A[a] : a >= 0 }") };
    let b = unsafe { set_read_from_str(ctx.as_ptr(), "{ A[a] : a <= 0 }") };

    // SAFETY: both pointers are fresh, owned references.
    let a = unsafe { Set::from_raw_with(&registry, a) }.unwrap();
    let b = unsafe { Set::from_raw_with(&registry, b) }.unwrap();

    assert!(a.context().ptr_eq(b.context()));
    assert!(a.context().ptr_eq(&ctx));
    assert_eq!(registry.len(), 1);
    assert_eq!(ctx.strong_count(), 3);

    let both = a.intersect(&b).unwrap();
    assert_eq!(both.to_string(), "{ A[a] : a = 0 }");
}

#[test]
fn registry_forgets_a_context_after_its_last_owner() {
    let (registry, ctx) = isolated();
    let ptr = ctx.as_ptr();
    let set = Set::parse(&ctx, "{ A[a] }").unwrap();
    drop(ctx);
    assert!(registry.contains(ptr));
    assert_eq!(set.context().strong_count(), 1);
    drop(set);
    assert!(!registry.contains(ptr));
    assert!(registry.is_empty());
}

#[test]
fn foreign_contexts_are_adopted() {
    let registry = Arc::new(Registry::new());
    let raw = ctx_alloc();
    // SAFETY: `raw` is fresh and owned by nobody else.
    let ctx = unsafe { registry.acquire(raw) }.unwrap();
    assert_eq!(ctx.error_action(), ErrorAction::Warn);
    let again = registry.lookup(raw).unwrap();
    assert!(again.ptr_eq(&ctx));
    assert_eq!(registry.len(), 1);
    drop((ctx, again));
    assert!(registry.is_empty());
}

#[test]
fn null_pointers_are_rejected() {
    let registry = Arc::new(Registry::new());
    // SAFETY: null is always allowed.
    let err = unsafe { Set::from_raw_with(&registry, std::ptr::null_mut()) }.unwrap_err();
    assert!(err.is_construction_failure());
    assert!(err.context_trail().iter().any(|c| c.contains("Set")));
    // SAFETY: null is always allowed.
    assert!(unsafe { Context::from_raw(std::ptr::null_mut()) }.is_none());
}

#[test]
fn lookups_stay_within_their_registry() {
    let (registry, ctx) = isolated();
    assert!(Registry::global().lookup(ctx.as_ptr()).is_none());
    assert!(!Registry::global().contains(ctx.as_ptr()));
    let set = Set::parse(&ctx, "{ A[a] : a = 5 }").unwrap();
    drop(ctx);
    assert_eq!(set.to_string(), "{ A[a] : a = 5 }");
    drop(set);
    assert!(registry.is_empty());
}

#[test]
fn a_reused_address_is_a_fresh_registration() {
    let registry = Arc::new(Registry::new());
    let old = Context::with_options(
        ContextOptions::new()
            .with_error_action(ErrorAction::Continue)
            .with_registry(Arc::clone(&registry)),
    );
    let addr = old.as_ptr();
    drop(old);
    assert!(!registry.contains(addr));

    let mut spare = Vec::new();
    let mut reused = None;
    for _ in 0..64 {
        let raw = ctx_alloc();
        if raw == addr {
            reused = Some(raw);
            break;
        }
        spare.push(raw);
    }
    for raw in spare {
        // SAFETY: never registered anywhere.
        unsafe { ctx_free(raw) };
    }

    if let Some(raw) = reused {
        // SAFETY: `raw` is fresh and owned by nobody else.
        let fresh = unsafe { registry.acquire(raw) }.unwrap();
        assert_eq!(fresh.as_ptr(), addr);
        assert_eq!(fresh.strong_count(), 1);
        assert_eq!(fresh.error_action(), ErrorAction::Warn);
        assert_eq!(fresh.live_objects(), 0);
        assert_eq!(registry.len(), 1);
        drop(fresh);
    }
    assert!(registry.is_empty());
}

#[test]
fn concurrent_acquire_converges_on_one_context() {
    let (registry, ctx) = isolated();
    let raw = ctx.as_ptr() as usize;
    let barrier = Arc::new(Barrier::new(8));
    let workers: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                // SAFETY: the context is registered here and kept alive by `ctx`.
                let ctx = unsafe { registry.acquire(raw as *mut isle::engine::Ctx) }.unwrap();
                ctx.as_ptr() as usize
            })
        })
        .collect();
    for worker in workers {
        assert_eq!(worker.join().unwrap(), raw);
    }
    assert_eq!(registry.len(), 1);
    assert_eq!(ctx.strong_count(), 1);
}

#[test]
fn contexts_on_separate_threads_do_not_interfere() {
    let registry = Arc::new(Registry::new());
    let workers: Vec<_> = (0..4)
        .map(|n| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let ctx = Context::with_options(ContextOptions::new().with_registry(registry));
                let text = format!("{{ A[a] : 0 <= a <= {} }}", n);
                let set = Set::parse(&ctx, &text).unwrap();
                let ls = LocalSpace::from_space(&set.space().unwrap()).unwrap();
                let a = Expression::variable(&ls, DimType::Set, 0).unwrap();
                let max = set.maximum(&a).unwrap().numerator();
                drop((a, ls, set));
                // SAFETY: the context is live.
                (max, unsafe { ctx_live_objects(ctx.as_ptr()) })
            })
        })
        .collect();
    for (n, worker) in workers.into_iter().enumerate() {
        assert_eq!(worker.join().unwrap(), (n as i64, 0));
    }
    assert!(registry.is_empty());
}

#[test]
fn live_objects_return_to_baseline() {
    let (_, ctx) = isolated();
    {
        let space = Space::set(&ctx, &["N"], &Tuple::new("A", &["a"])).unwrap();
        let ls = LocalSpace::from_space(&space).unwrap();
        let a = Expression::variable(&ls, DimType::Set, 0).unwrap();
        let n = Expression::variable(&ls, DimType::Param, 0).unwrap();
        let _c = a.lt(&n).unwrap();
        let _m = Map::parse(&ctx, "{ A[a] -> B[b] : a = b }");
        assert!(ctx.live_objects() > 0);
    }
    assert_eq!(ctx.live_objects(), 0);
}
