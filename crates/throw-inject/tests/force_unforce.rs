//! S1: force inverts control flow, unforce restores it exactly
//! (spec.md §8 properties 1-3).

#[path = "support/mod.rs"]
mod support;

use std::panic::AssertUnwindSafe;
use support::throw_if_nonzero;
use throw_inject::Forcer;

#[test]
fn force_then_unforce_round_trips() {
    // Warms up the site's captured `throw_addr` and demonstrates
    // transparency: an unforced call behaves exactly like an unannotated
    // raise (property 1).
    assert!(std::panic::catch_unwind(AssertUnwindSafe(|| throw_if_nonzero(1))).is_err());

    let mut forcer = Forcer::new().expect("forcer construction");
    let addr = support::find_site_in_fn(&forcer, "throw_if_nonzero");

    assert!(std::panic::catch_unwind(AssertUnwindSafe(|| throw_if_nonzero(0))).is_ok());

    forcer.force(addr).expect("force a constexpr site");
    assert!(
        std::panic::catch_unwind(AssertUnwindSafe(|| throw_if_nonzero(0))).is_err(),
        "forced call must raise regardless of the function's own control flow"
    );

    forcer.unforce(addr);
    assert!(
        std::panic::catch_unwind(AssertUnwindSafe(|| throw_if_nonzero(0))).is_ok(),
        "unforce must restore the original bytes exactly (property 3)"
    );
}

#[test]
fn dropping_the_forcer_rolls_back_every_patch() {
    assert!(std::panic::catch_unwind(AssertUnwindSafe(|| throw_if_nonzero(1))).is_err());

    let mut forcer = Forcer::new().expect("forcer construction");
    let addr = support::find_site_in_fn(&forcer, "throw_if_nonzero");
    forcer.force(addr).expect("force a constexpr site");
    drop(forcer);

    assert!(
        std::panic::catch_unwind(AssertUnwindSafe(|| throw_if_nonzero(0))).is_ok(),
        "Forcer::drop must leave the program's text bit-identical to its original state"
    );
}
