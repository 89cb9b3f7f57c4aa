//! Text-region protection guard (spec §4.D).
//!
//! A scoped resource: on acquisition, the covered range is marked
//! read+write+execute; on release, restored to read+execute. Grounded
//! directly on `reference/tests_all/custom_code_memory.rs`'s
//! `CustomCodeMemory` implementation, which calls exactly
//! `rustix::mm::{mprotect, MprotectFlags}` to toggle a JIT code region
//! between writable and executable.

use crate::error::ForceError;

#[cfg(unix)]
mod imp {
    use super::ForceError;
    use rustix::io::Errno;
    use rustix::mm::{mprotect, MprotectFlags};
    use std::io;

    fn to_io_error(errno: Errno) -> io::Error {
        io::Error::from_raw_os_error(errno.raw_os_error())
    }

    pub fn make_writable_executable(addr: usize, len: usize) -> Result<(), ForceError> {
        // SAFETY: `addr..addr+len` is the caller-verified text extent of
        // the enclosing function; mprotect only changes permission bits,
        // never the mapping's location or size.
        unsafe {
            mprotect(
                addr as *mut _,
                len,
                MprotectFlags::READ | MprotectFlags::WRITE | MprotectFlags::EXEC,
            )
        }
        .map_err(|e| ForceError::ProtectFailed(to_io_error(e)))
    }

    pub fn restore_read_execute(addr: usize, len: usize) -> Result<(), ForceError> {
        // SAFETY: see above.
        unsafe { mprotect(addr as *mut _, len, MprotectFlags::READ | MprotectFlags::EXEC) }
            .map_err(|e| ForceError::ProtectFailed(to_io_error(e)))
    }
}

#[cfg(windows)]
mod imp {
    use super::ForceError;
    use std::io;
    use windows_sys::Win32::System::Memory::{
        VirtualProtect, PAGE_EXECUTE_READ, PAGE_EXECUTE_READWRITE,
    };

    pub fn make_writable_executable(addr: usize, len: usize) -> Result<(), ForceError> {
        let mut old = 0u32;
        // SAFETY: `addr..addr+len` is caller-verified to be a mapped,
        // executable region belonging to this process.
        let ok = unsafe {
            VirtualProtect(addr as *mut _, len, PAGE_EXECUTE_READWRITE, &mut old)
        };
        if ok == 0 {
            return Err(ForceError::ProtectFailed(io::Error::last_os_error()));
        }
        Ok(())
    }

    pub fn restore_read_execute(addr: usize, len: usize) -> Result<(), ForceError> {
        let mut old = 0u32;
        // SAFETY: see above.
        let ok = unsafe { VirtualProtect(addr as *mut _, len, PAGE_EXECUTE_READ, &mut old) };
        if ok == 0 {
            return Err(ForceError::ProtectFailed(io::Error::last_os_error()));
        }
        Ok(())
    }
}

/// Scoped RWX switch over `[addr, addr+len)`. Acquisition failure is fatal
/// to the surrounding operation; release failures are logged and swallowed
/// (the guarded operation has already succeeded or failed on its own
/// terms, per spec.md §4.D).
pub struct ProtectGuard {
    addr: usize,
    len: usize,
}

impl ProtectGuard {
    pub fn acquire(addr: usize, len: usize) -> Result<Self, ForceError> {
        imp::make_writable_executable(addr, len)?;
        Ok(Self { addr, len })
    }
}

impl Drop for ProtectGuard {
    fn drop(&mut self) {
        if let Err(e) = imp::restore_read_execute(self.addr, self.len) {
            log::warn!(
                "failed to restore read+execute protection on {:#x}..{:#x}: {e}",
                self.addr,
                self.addr + self.len
            );
        }
    }
}
