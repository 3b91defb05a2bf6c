//! Board configuration: chip generation and memory sizes.

use crate::error::{Result, VoodooError};

/// Chip generation (and TMU population) being modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoodooModel {
    /// Voodoo Graphics (SST-1) with a single TMU.
    Voodoo1,
    /// Voodoo Graphics with a second TMU fitted.
    Voodoo1DualTmu,
    /// Voodoo2 (always two TMUs).
    Voodoo2,
}

impl VoodooModel {
    pub const fn is_voodoo2(self) -> bool {
        matches!(self, Self::Voodoo2)
    }

    pub const fn tmu_count(self) -> usize {
        match self {
            Self::Voodoo1 => 1,
            Self::Voodoo1DualTmu | Self::Voodoo2 => 2,
        }
    }

    pub(crate) const fn to_u8(self) -> u8 {
        match self {
            Self::Voodoo1 => 1,
            Self::Voodoo1DualTmu => 2,
            Self::Voodoo2 => 3,
        }
    }

    pub(crate) const fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Voodoo1),
            2 => Some(Self::Voodoo1DualTmu),
            3 => Some(Self::Voodoo2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoodooConfig {
    pub model: VoodooModel,
    /// Frame buffer memory in MiB.
    pub fb_mem_mb: u32,
    /// Texture memory per TMU in MiB.
    pub tmu_mem_mb: u32,
}

impl Default for VoodooConfig {
    fn default() -> Self {
        Self::for_model(VoodooModel::Voodoo1)
    }
}

impl VoodooConfig {
    pub const MIN_MEM_MB: u32 = 2;
    pub const MAX_MEM_MB: u32 = 16;

    pub fn for_model(model: VoodooModel) -> Self {
        match model {
            VoodooModel::Voodoo1 => Self {
                model,
                fb_mem_mb: 2,
                tmu_mem_mb: 2,
            },
            VoodooModel::Voodoo1DualTmu | VoodooModel::Voodoo2 => Self {
                model,
                fb_mem_mb: 4,
                tmu_mem_mb: 4,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_size("frame buffer", self.fb_mem_mb)?;
        check_size("texture", self.tmu_mem_mb)
    }

    pub(crate) fn fb_mem_bytes(&self) -> usize {
        self.fb_mem_mb as usize * 1024 * 1024
    }

    pub(crate) fn tmu_mem_bytes(&self) -> usize {
        self.tmu_mem_mb as usize * 1024 * 1024
    }
}

fn check_size(what: &'static str, mb: u32) -> Result<()> {
    if !(VoodooConfig::MIN_MEM_MB..=VoodooConfig::MAX_MEM_MB).contains(&mb) || !mb.is_power_of_two()
    {
        return Err(VoodooError::InvalidMemorySize { what, mb });
    }
    Ok(())
}
