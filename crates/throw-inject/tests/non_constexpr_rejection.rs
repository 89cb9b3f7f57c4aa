//! S3 / S3': a site with a non-literal constructor argument has no
//! reconstructor, so `force(addr)` fails and leaves the text untouched
//! (spec.md §8 property 7); `force_with(addr, error)` still works.

#[path = "support/mod.rs"]
mod support;

use std::panic::AssertUnwindSafe;
use support::{throw_with_non_constexpr_input, DynamicError};
use throw_inject::{Forcer, ForceError};

#[test]
fn force_without_a_reconstructor_fails_and_leaves_text_untouched() {
    assert!(
        std::panic::catch_unwind(AssertUnwindSafe(|| throw_with_non_constexpr_input(1))).is_err()
    );

    let mut forcer = Forcer::new().expect("forcer construction");
    let addr = support::find_site_in_fn(&forcer, "throw_with_non_constexpr_input");

    let err = forcer.force(addr).unwrap_err();
    assert!(matches!(err, ForceError::NoReconstructor(a) if a == addr));

    assert!(
        std::panic::catch_unwind(AssertUnwindSafe(|| throw_with_non_constexpr_input(0))).is_ok(),
        "a failed force must never leave a partial patch behind"
    );
}

#[test]
fn force_with_caller_supplied_error_succeeds() {
    assert!(
        std::panic::catch_unwind(AssertUnwindSafe(|| throw_with_non_constexpr_input(1))).is_err()
    );

    let mut forcer = Forcer::new().expect("forcer construction");
    let addr = support::find_site_in_fn(&forcer, "throw_with_non_constexpr_input");

    forcer
        .force_with(addr, Box::new(DynamicError("Test".to_string())))
        .expect("force_with a caller-supplied error");

    let result =
        std::panic::catch_unwind(AssertUnwindSafe(|| throw_with_non_constexpr_input(0)));
    assert!(result.is_err());

    forcer.unforce(addr);
}
