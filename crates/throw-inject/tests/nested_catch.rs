//! S2: a forced call caught by a `try`/`catch_unwind` higher up the stack
//! lets execution continue normally past it (spec.md §8 property 5).

#[path = "support/mod.rs"]
mod support;

use std::panic::AssertUnwindSafe;
use support::throw_if_nonzero;
use throw_inject::Forcer;

fn conditional_throw_and_catch() {
    let _ = std::panic::catch_unwind(AssertUnwindSafe(|| throw_if_nonzero(0)));
}

#[test]
fn forced_call_inside_a_catch_does_not_propagate() {
    assert!(std::panic::catch_unwind(AssertUnwindSafe(|| throw_if_nonzero(1))).is_err());

    let mut forcer = Forcer::new().expect("forcer construction");
    let addr = support::find_site_in_fn(&forcer, "throw_if_nonzero");
    forcer.force(addr).expect("force a constexpr site");

    assert!(
        std::panic::catch_unwind(AssertUnwindSafe(conditional_throw_and_catch)).is_ok(),
        "a catch_unwind wrapping the forced call must swallow the panic"
    );

    forcer.unforce(addr);
}
