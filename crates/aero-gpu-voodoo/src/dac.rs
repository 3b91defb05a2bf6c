//! Minimal RAMDAC model: eight byte registers behind `dacData`, with the PLL identification
//! readback that board init code probes for.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dac {
    pub regs: [u8; 8],
    /// Result of the last read request, returned through `fbiInit2` when init is remapped to the
    /// DAC.
    pub read_result: u8,
}

impl Dac {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn write(&mut self, reg: u8, data: u8) {
        self.regs[(reg & 7) as usize] = data;
    }

    /// Latch the value of `reg` into [`Dac::read_result`].
    pub fn read(&mut self, reg: u8) {
        let reg = (reg & 7) as usize;
        self.read_result = match reg {
            5 => match self.regs[7] {
                0x01 => 0x55,
                0x07 => 0x71,
                0x0b => 0x79,
                _ => 0xff,
            },
            _ => self.regs[reg],
        };
    }

    /// Handle a `dacData` register write: bit 11 selects read vs write, bits 8..10 the register.
    pub fn data_write(&mut self, data: u32) {
        let reg = ((data >> 8) & 7) as u8;
        if data & (1 << 11) == 0 {
            self.write(reg, data as u8);
        } else {
            self.read(reg);
        }
    }
}
