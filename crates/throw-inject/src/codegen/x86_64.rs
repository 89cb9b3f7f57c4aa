//! x86-64 stub: `movabs rdi, imm64` followed by `jmp rel32`.
//!
//! `rdi` is the first integer argument register in the System V AMD64
//! calling convention, matching `raise_trampoline`'s single `*const
//! ErrorSlot` parameter.

use super::CodeGenerator;
use crate::error::ForceError;

pub struct X86_64;

/// `48 BF` (REX.W + B8+rdi) + 8-byte little-endian immediate.
const MOVABS_RDI_LEN: usize = 10;
/// `E9` + 4-byte little-endian rel32.
const JMP_REL32_LEN: usize = 5;

impl CodeGenerator for X86_64 {
    fn arch_name(&self) -> &'static str {
        "x86_64"
    }

    fn stub_len(&self) -> usize {
        MOVABS_RDI_LEN + JMP_REL32_LEN
    }

    fn generate(
        &self,
        fn_start: usize,
        trampoline: usize,
        error_slot: usize,
    ) -> Result<Vec<u8>, ForceError> {
        let mut buf = Vec::with_capacity(self.stub_len());

        // movabs rdi, error_slot
        buf.push(0x48);
        buf.push(0xBF);
        buf.extend_from_slice(&(error_slot as u64).to_le_bytes());

        // jmp rel32, relative to the address immediately after this
        // instruction (fn_start + stub_len()).
        let next_ip = fn_start as i64 + self.stub_len() as i64;
        let rel = trampoline as i64 - next_ip;
        let rel32 = i32::try_from(rel).map_err(|_| ForceError::OffsetOutOfRange {
            arch: self.arch_name(),
            offset: rel,
        })?;
        buf.push(0xE9);
        buf.extend_from_slice(&rel32.to_le_bytes());

        debug_assert_eq!(buf.len(), self.stub_len());
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_len_is_fifteen_bytes() {
        assert_eq!(X86_64.stub_len(), 15);
    }

    #[test]
    fn generates_expected_bytes() {
        let fn_start = 0x1000usize;
        let trampoline = 0x2000usize;
        let error_slot = 0xDEAD_BEEF_0000_1234u64 as usize;

        let stub = X86_64.generate(fn_start, trampoline, error_slot).unwrap();
        assert_eq!(stub.len(), 15);
        assert_eq!(&stub[0..2], &[0x48, 0xBF]);
        assert_eq!(&stub[2..10], &(error_slot as u64).to_le_bytes());
        assert_eq!(stub[10], 0xE9);

        let rel32 = i32::from_le_bytes(stub[11..15].try_into().unwrap());
        let next_ip = fn_start as i64 + 15;
        assert_eq!(next_ip + rel32 as i64, trampoline as i64);
    }

    #[test]
    fn rejects_offsets_outside_i32_range() {
        let err = X86_64
            .generate(0x1000, 0x1_0000_0000_0000, 0x5000)
            .unwrap_err();
        assert!(matches!(err, ForceError::OffsetOutOfRange { .. }));
    }
}
