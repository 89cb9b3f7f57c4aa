//! The raise trampoline and the error storage it reads from (spec §4.F).
//!
//! A patched function's prologue is overwritten to load the address of an
//! [`ErrorSlot`] and tail-jump here. This is the only place a stored error
//! actually gets raised, so it is the one function every generated stub
//! ultimately calls into regardless of architecture.

use std::panic::AssertUnwindSafe;

use crate::error::ClonableError;

/// Heap-pinned storage for the error a forced site raises. Cloned out of on
/// every call so the same [`crate::Forcer::force`] installation can be
/// triggered repeatedly.
pub struct ErrorSlot {
    error: Box<dyn ClonableError>,
}

impl ErrorSlot {
    pub fn new(error: Box<dyn ClonableError>) -> Box<Self> {
        Box::new(Self { error })
    }

    /// Runtime address of this slot, to be embedded directly into a
    /// generated stub by [`crate::codegen::CodeGenerator::generate`].
    pub fn address(&self) -> usize {
        self as *const Self as usize
    }
}

/// Called by every generated stub in place of the function it replaced.
/// Clones the stored error and panics with it, mapping the original
/// design's C++ `throw` onto Rust's unwinding mechanism.
///
/// `extern "C-unwind"` is required: this function is reached via a
/// hand-written jump rather than a normal Rust call, so the panic must be
/// allowed to unwind across that edge per the ABI the stub was generated
/// against.
///
/// # Safety
///
/// `slot` must point to a live [`ErrorSlot`] for the duration of this call;
/// every generated stub satisfies this by construction, since the slot is
/// owned by the [`crate::forcer::PatchedSite`] that installed the stub and
/// outlives it until `unforce`/`Drop` rolls the patch back.
pub unsafe extern "C-unwind" fn raise_trampoline(slot: *const ErrorSlot) -> ! {
    // SAFETY: see function-level contract.
    let error = unsafe { &*slot }.error.clone();
    std::panic::panic_any(AssertUnwindSafe(error));
}
