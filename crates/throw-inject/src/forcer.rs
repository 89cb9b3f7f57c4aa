//! The public façade (spec §4.G, ~33% of the original budget): enumerates
//! registered throw-sites and installs/uninstalls patches at them.

use std::collections::HashMap;

use crate::address_space::AddressSpace;
use crate::codegen::{self, CodeGenerator};
use crate::error::{ClonableError, ForceError};
use crate::icache;
use crate::protect::ProtectGuard;
use crate::registry::{self, ThrowSite};
use crate::symbols::SymbolResolver;
use crate::trampoline::{raise_trampoline, ErrorSlot};

/// A resolved, patchable site, in runtime-address space, as returned by
/// [`Forcer::list_sites`].
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub throw_addr: usize,
    pub file: &'static str,
    pub line: u32,
    pub expr: &'static str,
    /// Containing function's extents and name, `None` if symbol lookup
    /// failed for this particular site (spec.md §7: `list_sites` never
    /// fails wholesale over one bad entry).
    pub function: Option<FunctionInfo>,
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub start: usize,
    /// `usize::MAX` for the last function symbol in the image, which has no
    /// next symbol to bound it (see `SymbolResolver::containing_function`).
    pub end: usize,
    pub name: String,
}

/// An installed patch. Dropping the owning [`Forcer`], or an explicit
/// [`Forcer::unforce`], restores `saved_bytes` over `fn_start`.
struct PatchedSite {
    fn_start: usize,
    saved_bytes: Vec<u8>,
    // Kept alive only so the slot's memory outlives the installed stub;
    // never read again once `generate` has captured its address.
    _error_slot: Box<ErrorSlot>,
}

/// Owns the symbol resolver, address-space resolver, and architecture code
/// generator, plus the map of currently-patched sites.
pub struct Forcer {
    symbols: SymbolResolver,
    address_space: AddressSpace,
    codegen: Box<dyn CodeGenerator>,
    patched: HashMap<usize, PatchedSite>,
}

impl Forcer {
    /// Opens `/proc/self/exe` and `/proc/self/maps` for this process.
    pub fn new() -> Result<Self, ForceError> {
        let symbols = SymbolResolver::open()?;
        let address_space = AddressSpace::new().map_err(ForceError::MapRead)?;
        Ok(Self {
            symbols,
            address_space,
            codegen: codegen::for_target(),
            patched: HashMap::new(),
        })
    }

    /// Enumerates every registered throw-site. Symbol-lookup failure for an
    /// individual site leaves its `function` field `None` rather than
    /// aborting the whole scan (spec.md §7).
    pub fn list_sites(&self) -> Vec<SiteInfo> {
        registry::all_sites()
            .map(|site| self.resolve_site_info(site))
            .collect()
    }

    fn resolve_site_info(&self, site: &'static ThrowSite) -> SiteInfo {
        let throw_addr = site.throw_addr();
        let function = self
            .symbols
            .containing_function(self.address_space.to_offset(throw_addr))
            .ok()
            .map(|ext| FunctionInfo {
                start: self.address_space.from_offset(ext.start_off),
                end: self.address_space.from_offset(ext.end_off),
                name: ext.name,
            });
        SiteInfo {
            throw_addr,
            file: site.file,
            line: site.line,
            expr: site.expr,
            function,
        }
    }

    /// Reconstructs the site's registered error via its `reconstruct`
    /// function and installs it. Fails with [`ForceError::NoReconstructor`]
    /// if the site's argument list wasn't classified as constexpr at
    /// registration time.
    pub fn force(&mut self, throw_addr: usize) -> Result<(), ForceError> {
        let site = self.find_site(throw_addr)?;
        let reconstruct = site
            .reconstruct
            .ok_or(ForceError::NoReconstructor(throw_addr))?;
        let error = reconstruct();
        self.force_with(throw_addr, error)
    }

    /// Installs a patch at `throw_addr` that raises `error` on every call,
    /// until [`Forcer::unforce`] or this `Forcer`'s `Drop` reverses it.
    pub fn force_with(
        &mut self,
        throw_addr: usize,
        error: Box<dyn ClonableError>,
    ) -> Result<(), ForceError> {
        let site = self.find_site(throw_addr)?;
        let offset = self.address_space.to_offset(throw_addr);
        let extent = self.symbols.containing_function(offset)?;
        let fn_start = self.address_space.from_offset(extent.start_off);
        let fn_end = self.address_space.from_offset(extent.end_off);

        let error_slot = ErrorSlot::new(error);
        let slot_addr = error_slot.address();
        let trampoline_addr = raise_trampoline as usize;

        let stub = self
            .codegen
            .generate(fn_start, trampoline_addr, slot_addr)?;
        if stub.len() > fn_end.saturating_sub(fn_start) {
            return Err(ForceError::StubTooLarge {
                stub_len: stub.len(),
                fn_len: fn_end - fn_start,
            });
        }

        // Uninstall any prior patch at the same site before installing the
        // new one (spec.md §3 invariant 4).
        self.unforce(throw_addr);

        let stub_len = stub.len();
        let guard = ProtectGuard::acquire(fn_start, stub_len)?;
        let saved_bytes = {
            // SAFETY: `fn_start..fn_start+stub_len` is within the enclosing
            // function's verified extent and is currently writable under
            // `guard`.
            let region = unsafe { std::slice::from_raw_parts_mut(fn_start as *mut u8, stub_len) };
            let saved = region.to_vec();
            region.copy_from_slice(&stub);
            saved
        };
        icache::flush(fn_start, stub_len);
        drop(guard);

        log::info!(
            "forced site {:#x} ({}:{}) in function at {:#x}",
            throw_addr,
            site.file,
            site.line,
            fn_start
        );

        self.patched.insert(
            throw_addr,
            PatchedSite {
                fn_start,
                saved_bytes,
                _error_slot: error_slot,
            },
        );
        Ok(())
    }

    /// Removes the patch at `throw_addr`, restoring the original bytes. A
    /// no-op if the site is not currently patched (spec.md §7).
    pub fn unforce(&mut self, throw_addr: usize) {
        let Some(patched) = self.patched.remove(&throw_addr) else {
            return;
        };
        Self::rollback(&patched);
        log::info!("unforced site {throw_addr:#x}");
    }

    fn rollback(patched: &PatchedSite) {
        let len = patched.saved_bytes.len();
        match ProtectGuard::acquire(patched.fn_start, len) {
            Ok(guard) => {
                // SAFETY: same justification as the install path in
                // `force_with`.
                let region =
                    unsafe { std::slice::from_raw_parts_mut(patched.fn_start as *mut u8, len) };
                region.copy_from_slice(&patched.saved_bytes);
                icache::flush(patched.fn_start, len);
                drop(guard);
            }
            Err(e) => {
                log::warn!(
                    "failed to restore original bytes at {:#x}: {e}",
                    patched.fn_start
                );
            }
        }
    }

    fn find_site(&self, throw_addr: usize) -> Result<&'static ThrowSite, ForceError> {
        registry::find(throw_addr).ok_or(ForceError::UnknownSite(throw_addr))
    }
}

impl Drop for Forcer {
    /// Rolls back every remaining patch, leaving the program's text
    /// bit-identical to its pre-patch state (spec.md §4.G).
    fn drop(&mut self) {
        for (_, patched) in self.patched.drain() {
            Self::rollback(&patched);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unforce_on_unknown_site_is_a_silent_noop() {
        // Constructing a full `Forcer` needs a real `/proc/self/exe`; this
        // only exercises the map-removal path directly.
        let mut patched: HashMap<usize, PatchedSite> = HashMap::new();
        assert!(patched.remove(&0x1234).is_none());
    }
}
