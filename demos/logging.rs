//! Shows engine diagnostics flowing through `tracing` under the Warn policy.
//!
//! Run with: cargo run --example logging --features tracing

use isle::{Context, ContextOptions, ErrorAction, Set};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let ctx = Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Warn));
    tracing::info!(live = ctx.live_objects(), "context ready");

    match Set::parse(&ctx, "{ A[a, b] : a + b >= 0 }") {
        Ok(set) => tracing::info!(%set, "parsed"),
        Err(e) => tracing::error!("{}", e),
    }

    ctx.set_error_action(ErrorAction::Continue);
    let silent = Set::parse(&ctx, "{ A[a] : a > }");
    tracing::info!(failed = silent.is_err(), "parsed quietly");
}
