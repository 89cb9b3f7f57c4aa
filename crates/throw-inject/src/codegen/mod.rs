//! Per-architecture stub code generation (spec §4.E).
//!
//! Each backend emits a short, self-contained instruction sequence that
//! loads the address of a heap-pinned [`crate::trampoline::ErrorSlot`] into
//! the platform's first integer argument register and tail-jumps into
//! [`crate::trampoline::raise_trampoline`]. Dispatch mirrors the
//! `cfg_if!`-over-`target_arch` pattern used for per-ISA code in
//! `reference/isa/x86_registers.rs` and its `arm64`/`arm32` siblings.
//!
//! Each backend module other than the fallback only builds for its own
//! `target_arch`, unless the `all-arch` feature is enabled, in which case
//! all three compile (and are unit-testable) regardless of host
//! architecture. `for_target` still only ever selects the host's own
//! backend; `all-arch` only widens what's compiled, not what's dispatched.

#[cfg(any(target_arch = "aarch64", feature = "all-arch"))]
mod aarch64;
#[cfg(any(
    all(target_arch = "arm", target_feature = "thumb-mode"),
    feature = "all-arch"
))]
mod thumb2;
mod unsupported;
#[cfg(any(target_arch = "x86_64", feature = "all-arch"))]
mod x86_64;

use crate::error::ForceError;

/// Produces the byte sequence that replaces a function's prologue.
pub trait CodeGenerator {
    /// Architecture name, used only for diagnostics.
    fn arch_name(&self) -> &'static str;

    /// The exact number of bytes [`Self::generate`] writes; callers must
    /// verify the enclosing function is at least this large before
    /// patching it.
    fn stub_len(&self) -> usize;

    /// Builds the stub to be written at `fn_start`. `trampoline` and
    /// `error_slot` are runtime addresses (not file offsets).
    fn generate(
        &self,
        fn_start: usize,
        trampoline: usize,
        error_slot: usize,
    ) -> Result<Vec<u8>, ForceError>;
}

/// Returns the code generator for the architecture this crate was built
/// for, or [`unsupported::Unsupported`] if spec.md's three target ISAs
/// (x86-64, AArch64, ARM Thumb-2) don't include it.
pub fn for_target() -> Box<dyn CodeGenerator> {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "x86_64")] {
            Box::new(x86_64::X86_64)
        } else if #[cfg(target_arch = "aarch64")] {
            Box::new(aarch64::Aarch64)
        } else if #[cfg(all(target_arch = "arm", target_feature = "thumb-mode"))] {
            Box::new(thumb2::Thumb2)
        } else {
            Box::new(unsupported::Unsupported)
        }
    }
}
