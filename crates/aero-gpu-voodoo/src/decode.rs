//! Memory-space classification for the 16 MiB device aperture.
//!
//! Offsets here are dword offsets (`byte_address >> 2`) within the aperture:
//! - `0x000000..0x400000` bytes: registers (chip select in bits 8..12 of the dword offset)
//! - `0x400000..0x800000` bytes: linear frame buffer
//! - `0x800000..0x1000000` bytes: texture memory (TMU select in bits 19..21)

/// Size of the memory-mapped aperture in bytes.
pub const MMIO_SIZE: u32 = 16 * 1024 * 1024;
/// Mask applied to dword offsets before classification.
pub const MMIO_DWORD_MASK: u32 = MMIO_SIZE / 4 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySpace {
    Register,
    Lfb,
    Texture { tmu: u32 },
}

pub fn classify(offset: u32) -> MemorySpace {
    if offset & (0xc0_0000 / 4) == 0 {
        MemorySpace::Register
    } else if offset & (0x80_0000 / 4) == 0 {
        MemorySpace::Lfb
    } else {
        MemorySpace::Texture {
            tmu: (offset >> 19) & 3,
        }
    }
}

/// Chip-select bits of a register write. Zero addresses every chip.
pub fn chip_select(offset: u32) -> u32 {
    match (offset >> 8) & 0xf {
        0 => 0xf,
        chips => chips,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_each_region() {
        assert_eq!(classify(0), MemorySpace::Register);
        assert_eq!(classify(0x3f_fffc / 4), MemorySpace::Register);
        assert_eq!(classify(0x40_0000 / 4), MemorySpace::Lfb);
        assert_eq!(classify(0x7f_fffc / 4), MemorySpace::Lfb);
        assert_eq!(classify(0x80_0000 / 4), MemorySpace::Texture { tmu: 0 });
        assert_eq!(classify(0xa0_0000 / 4), MemorySpace::Texture { tmu: 1 });
    }

    #[test]
    fn chip_select_zero_means_broadcast() {
        assert_eq!(chip_select(0x041), 0xf);
        assert_eq!(chip_select(0x241), 0x2);
        assert_eq!(chip_select(0x641), 0x6);
    }
}
