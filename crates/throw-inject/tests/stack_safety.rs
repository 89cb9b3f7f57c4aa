//! S4: forcing a function whose ABI passes its argument on the stack must
//! not corrupt the caller's copy of that argument (spec.md §8 property 4).

#[path = "support/mod.rs"]
mod support;

use std::panic::AssertUnwindSafe;
use support::{throw_if_zero_stack_param, BigStruct};
use throw_inject::Forcer;

#[test]
fn forcing_a_stack_parameter_function_does_not_corrupt_the_caller() {
    let s = BigStruct {
        arr: [0xdeadbeefu32 as i32; 100],
    };

    // Warm up the site with a copy, since the raise consumes its argument.
    assert!(std::panic::catch_unwind(AssertUnwindSafe(|| throw_if_zero_stack_param(s.clone())))
        .is_err());

    let mut forcer = Forcer::new().expect("forcer construction");
    let addr = support::find_site_in_fn(&forcer, "throw_if_zero_stack_param");
    forcer.force(addr).expect("force a constexpr site");

    assert!(
        std::panic::catch_unwind(AssertUnwindSafe(|| throw_if_zero_stack_param(s.clone()))).is_err()
    );

    for &elem in &s.arr {
        assert_eq!(elem, 0xdeadbeefu32 as i32, "caller's copy must survive untouched");
    }

    forcer.unforce(addr);
}
