//! Compile-time throw-site registry (spec §4.A / §6).
//!
//! Every use of [`crate::register_and_raise`] contributes one
//! [`ThrowSite`] to [`THROW_LOCATIONS`], a `linkme::distributed_slice`
//! (the Rust-native equivalent of the `__start_throw_locations` /
//! `__stop_throw_locations` boundary-symbol section spec.md §6 describes).
//! `linkme` emits exactly that section/boundary-symbol pair under the hood;
//! an empty program has an empty (but valid) slice.
//!
//! One deliberate departure from the original design (recorded in
//! DESIGN.md): the original captures a throw site's address as a
//! `&&label`-style compile-time constant baked into a `static constexpr`
//! descriptor. Rust has no equivalent: taking the address of a point
//! inside the enclosing function requires executing an instruction there
//! (see [`crate::register_and_raise`]'s inline asm), so `throw_addr` starts
//! at the null address and is filled in the first time that code path
//! actually runs. A site is force-able once its enclosing function has
//! executed at least once.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ClonableError;

/// A nullary, stateless reconstructor: produces the same error a site would
/// have raised. Only present when every constructor argument is a Rust
/// `literal` token (see SPEC_FULL.md §1); it must capture no runtime
/// state, since `force` may run in an arbitrary later dynamic context.
pub type ReconstructFn = fn() -> Box<dyn ClonableError>;

/// Static, read-only descriptor for one throw-site (save for `throw_addr`,
/// filled in on first execution, see module docs). One is emitted per use
/// of [`crate::register_and_raise`]; its lifetime is the whole program.
#[derive(Debug)]
pub struct ThrowSite {
    /// Address of (or immediately adjacent to) the raise instruction. `0`
    /// until the enclosing function has executed at least once. Serves as
    /// the site's identity for `force`/`unforce`.
    pub throw_addr: AtomicUsize,
    /// Source file the site was registered from.
    pub file: &'static str,
    /// Source line the site was registered from.
    pub line: u32,
    /// Textual rendering of the error-constructor expression, for display.
    pub expr: &'static str,
    /// Present only when every argument was a compile-time literal.
    pub reconstruct: Option<ReconstructFn>,
}

impl ThrowSite {
    /// Called from [`crate::register_and_raise`] on every execution; the
    /// captured address never changes run over run, so a relaxed store is
    /// sufficient.
    pub fn record_throw_addr(&self, addr: usize) {
        self.throw_addr.store(addr, Ordering::Relaxed);
    }

    pub fn throw_addr(&self) -> usize {
        self.throw_addr.load(Ordering::Relaxed)
    }
}

/// The link-section-backed table of every registered throw-site in the
/// program. Iteration order is unspecified but stable within one run
/// (spec.md §3).
#[linkme::distributed_slice]
pub static THROW_LOCATIONS: [&'static ThrowSite] = [..];

/// Finds the descriptor whose resolved `throw_addr` equals `addr`, if any.
/// `addr` is never `0` for a real query, so unwarmed sites (whose stored
/// address is still `0`) are never matched.
pub(crate) fn find(addr: usize) -> Option<&'static ThrowSite> {
    THROW_LOCATIONS
        .iter()
        .copied()
        .find(|site| site.throw_addr() == addr)
}

/// Every registered descriptor, in the slice's unspecified-but-stable
/// iteration order.
pub(crate) fn all_sites() -> impl Iterator<Item = &'static ThrowSite> {
    THROW_LOCATIONS.iter().copied()
}
