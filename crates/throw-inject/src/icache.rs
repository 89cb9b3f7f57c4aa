//! Instruction-cache coherence (spec §5), gated per-architecture exactly as
//! `reference/jit-icache-coherence.Cargo.toml` gates its own dependencies:
//! a no-op on `x86_64`, explicit cache maintenance on weakly-ordered ISAs.
//!
//! This only needs to make the just-patched bytes visible to *this*
//! thread's instruction fetches before the next call into the patched
//! function; spec.md §5 explicitly does not require broadcasting the
//! invalidation to other cores.

/// Ensures that the `len` bytes starting at `addr`, just written by the
/// patcher, will be fetched as instructions rather than served from a
/// stale i-cache line.
pub fn flush(addr: usize, len: usize) {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "x86_64")] {
            // x86-64 has a coherent instruction cache; no maintenance is
            // required after a data write becomes visible to this core.
            let _ = (addr, len);
        } else if #[cfg(target_arch = "aarch64")] {
            aarch64::flush(addr, len);
        } else if #[cfg(target_arch = "arm")] {
            arm::flush(addr, len);
        } else {
            log::warn!(
                "no instruction-cache maintenance implemented for this architecture; \
                 patched bytes at {addr:#x}..{:#x} may not be observed",
                addr + len
            );
        }
    }
}

#[cfg(target_arch = "aarch64")]
mod aarch64 {
    use std::arch::asm;

    /// Cache line size, read once from `CTR_EL0` (bits 16:19, DminLine,
    /// log2 of the data cache line size in words).
    fn dcache_line_size() -> usize {
        let ctr: u64;
        // SAFETY: `mrs` reading a read-only system register has no side
        // effects.
        unsafe {
            asm!("mrs {0}, ctr_el0", out(reg) ctr, options(nomem, nostack, preserves_flags));
        }
        let dminline = (ctr >> 16) & 0xf;
        4usize << dminline
    }

    pub fn flush(addr: usize, len: usize) {
        let line = dcache_line_size();
        let start = addr & !(line - 1);
        let end = addr + len;

        let mut cur = start;
        while cur < end {
            // SAFETY: `cur` is within the patched, writable-executable
            // region acquired by the caller's `ProtectGuard`.
            unsafe {
                asm!("dc cvau, {0}", in(reg) cur, options(nostack, preserves_flags));
            }
            cur += line;
        }
        // SAFETY: no memory operand; these are pure synchronization
        // barriers.
        unsafe {
            asm!("dsb ish", options(nostack, preserves_flags));
        }

        cur = start;
        while cur < end {
            // SAFETY: see the `dc cvau` loop above.
            unsafe {
                asm!("ic ivau, {0}", in(reg) cur, options(nostack, preserves_flags));
            }
            cur += line;
        }
        // SAFETY: see above.
        unsafe {
            asm!("dsb ish", "isb", options(nostack, preserves_flags));
        }
    }
}

#[cfg(target_arch = "arm")]
mod arm {
    /// `__ARM_NR_cacheflush`, the Linux-specific syscall ARM provides
    /// specifically because user mode cannot execute the cache
    /// maintenance instructions directly.
    const ARM_NR_CACHEFLUSH: libc::c_long = 0x0f0002;

    pub fn flush(addr: usize, len: usize) {
        // SAFETY: a direct syscall with no side effects beyond cache
        // maintenance over `[addr, addr+len)`, which the caller owns.
        let ret = unsafe {
            libc::syscall(
                ARM_NR_CACHEFLUSH,
                addr as libc::c_long,
                (addr + len) as libc::c_long,
                0 as libc::c_long,
            )
        };
        if ret != 0 {
            log::warn!(
                "cacheflush syscall failed for {addr:#x}..{:#x}: {}",
                addr + len,
                std::io::Error::last_os_error()
            );
        }
    }
}
