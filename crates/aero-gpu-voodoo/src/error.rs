use std::io;

use thiserror::Error;

use crate::config::VoodooModel;

#[derive(Debug, Error)]
pub enum VoodooError {
    #[error("invalid {what} memory size: {mb} MiB (expected a power of two between 2 and 16)")]
    InvalidMemorySize { what: &'static str, mb: u32 },

    #[error("rasterizer table full ({0} entries)")]
    RasterizerTableFull(usize),

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(&'static str),

    #[error("unsupported snapshot version {0}")]
    UnsupportedSnapshotVersion(u16),

    #[error("snapshot was taken from a {found:?}, device is a {expected:?}")]
    ModelMismatch {
        expected: VoodooModel,
        found: VoodooModel,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, VoodooError>;
