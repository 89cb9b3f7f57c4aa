//! Fixture functions shared across the integration suite, mirroring
//! `original_source/test/ExceptionForcerTest.cpp`'s helper functions. Each
//! `tests/*.rs` binary gets its own copy of these (integration test files
//! are separate crates), so each binary's `Forcer` only ever sees its own
//! registrations.

use throw_inject::register_and_raise;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct RuntimeError(pub &'static str);

#[derive(Debug, Clone, thiserror::Error)]
#[error("zero stack field")]
pub struct ZeroStackError();

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct DynamicError(pub String);

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct MyException(pub &'static str);

/// Constexpr site: the constructor argument is a literal, so `reconstruct`
/// is present and `Forcer::force` needs no caller-supplied error.
#[inline(never)]
pub fn throw_if_nonzero(x: i32) {
    if x != 0 {
        register_and_raise!(RuntimeError(""));
    }
}

/// Same site family, but the struct argument is large enough that the
/// platform ABI passes it on the stack rather than in registers (spec.md
/// §8 property 4 / scenario S4).
#[derive(Clone)]
pub struct BigStruct {
    pub arr: [i32; 100],
}

#[inline(never)]
pub fn throw_if_zero_stack_param(s: BigStruct) {
    if s.arr[99] == 0 {
        register_and_raise!(ZeroStackError());
    }
}

/// Non-constexpr site: the constructor argument is a runtime-computed
/// `String`, so no reconstructor is emitted (scenario S3 / S3').
#[inline(never)]
pub fn throw_with_non_constexpr_input(x: i32) {
    if x != 0 {
        let msg = format!("runtime value {x}");
        register_and_raise!(DynamicError(msg));
    }
}

/// Constexpr site raising a user-defined error type (scenario S5).
#[inline(never)]
pub fn throw_my_exception_if_nonzero(x: i32) {
    if x != 0 {
        register_and_raise!(MyException("My exception"));
    }
}

/// Finds the throw-site whose enclosing function's demangled name contains
/// `needle`, analogous to `ExceptionForcerTest.cpp`'s
/// `GetExceptionInfoByFnName`.
pub fn find_site_in_fn(forcer: &throw_inject::Forcer, needle: &str) -> usize {
    forcer
        .list_sites()
        .into_iter()
        .find(|site| {
            site.function
                .as_ref()
                .is_some_and(|f| f.name.contains(needle))
        })
        .unwrap_or_else(|| panic!("no throw-site found in a function matching {needle:?}"))
        .throw_addr
}
