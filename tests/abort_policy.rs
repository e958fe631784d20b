//! The Abort policy terminates the process, so it is checked by re-running this
//! test binary as a child with an environment switch.

use std::env;
use std::process::Command;

use isle::prelude::*;

const CHILD_SWITCH: &str = "ISLE_ABORT_CHILD";
const DETACH_SWITCH: &str = "ISLE_DETACH_CHILD";

/// Runs only inside the child: fails a parse under the Abort policy.
#[test]
fn abort_child() {
    if env::var_os(CHILD_SWITCH).is_none() {
        return;
    }
    let ctx = Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Abort));
    let _ = Set::parse(&ctx, "{ A[a] : a + }");
    println!("survived the abort policy");
}

#[test]
fn abort_policy_terminates_the_process() {
    let exe = env::current_exe().unwrap();
    let output = Command::new(exe)
        .args(["--exact", "abort_child", "--nocapture", "--test-threads=1"])
        .env(CHILD_SWITCH, "1")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("engine error (aborting)"), "stderr: {}", stderr);
    assert!(stderr.contains("parse error"), "stderr: {}", stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("survived the abort policy"));
}

/// Runs only inside the child: detaches an object from its last context handle.
#[test]
fn detach_child() {
    if env::var_os(DETACH_SWITCH).is_none() {
        return;
    }
    let ctx = Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Abort));
    let set = Set::parse(&ctx, "{ A[a] : 0 <= a <= 3 }").unwrap();
    drop(ctx);
    let raw = set.into_raw();
    // SAFETY: `raw` is the reference `into_raw` handed out.
    let back = unsafe { Set::from_raw(raw) }.unwrap();
    println!("detached {}", back);
}

#[test]
fn into_raw_never_tears_down_the_context_under_abort() {
    let exe = env::current_exe().unwrap();
    let output = Command::new(exe)
        .args(["--exact", "detach_child", "--nocapture", "--test-threads=1"])
        .env(DETACH_SWITCH, "1")
        .output()
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {}", stderr);
    assert!(!stderr.contains("engine error (aborting)"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("detached { A[a] : 0 <= a <= 3 }"), "stdout: {}", stdout);
}

#[test]
fn continue_policy_returns_an_error_instead() {
    let ctx = Context::with_options(ContextOptions::new().with_error_action(ErrorAction::Continue));
    let err = Set::parse(&ctx, "{ A[a] : a + }").unwrap_err();
    assert!(err.is_construction_failure());
    assert_eq!(err.context_trail(), ["parsing Set".to_string()]);
}
