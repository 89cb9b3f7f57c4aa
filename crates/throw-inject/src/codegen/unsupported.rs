//! Fallback generator for architectures outside spec.md's supported set.
//! Every method fails cleanly rather than the crate refusing to build.

use super::CodeGenerator;
use crate::error::ForceError;

pub struct Unsupported;

impl CodeGenerator for Unsupported {
    fn arch_name(&self) -> &'static str {
        std::env::consts::ARCH
    }

    fn stub_len(&self) -> usize {
        0
    }

    fn generate(&self, _fn_start: usize, _trampoline: usize, _error_slot: usize) -> Result<Vec<u8>, ForceError> {
        Err(ForceError::UnsupportedArch(self.arch_name()))
    }
}
