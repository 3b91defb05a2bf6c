//! 3dfx Voodoo Graphics (SST-1) / Voodoo2 3D accelerator model.
//!
//! The device is driven entirely through its 16 MiB memory-mapped aperture
//! ([`VoodooDevice::mmio_read`] / [`VoodooDevice::mmio_write`]):
//! - Register space: the FBI and TMU register banks, triangle/fastfill/swap commands and the
//!   Voodoo2 triangle setup unit.
//! - Linear frame buffer: direct or pixel-pipelined pixel access in the 16/32-bit LFB formats.
//! - Texture space: texture downloads into each TMU's memory.
//!
//! Triangles are scan-converted synchronously on the calling thread. Each distinct render state
//! gets an entry in a small rasterizer cache ([`raster::RasterCache`]) so per-primitive mode
//! decoding happens once per state rather than once per pixel.
//!
//! Video output is delegated: timing registers are forwarded to a [`DisplayTiming`], and
//! [`VoodooDevice::retrace`] copies the front buffer (BGR565) into a [`DisplaySink`].
//! [`HeadlessDisplay`] implements both for tests and display-less hosts.

mod config;
mod dac;
pub mod decode;
mod device;
mod display;
mod error;
mod fbi;
mod lfb;
pub mod math;
pub mod pipeline;
pub mod raster;
pub mod regs;
mod setup;
mod snapshot;
mod stats;
mod tables;
mod tmu;
mod triangle;

pub use config::{VoodooConfig, VoodooModel};
pub use dac::Dac;
pub use decode::{MemorySpace, MMIO_SIZE};
pub use device::VoodooDevice;
pub use display::{DisplaySink, DisplayTiming, HeadlessDisplay, PixelFormat};
pub use error::{Result, VoodooError};
pub use fbi::Fbi;
pub use regs::InitEnable;
pub use setup::{PlaneSetup, SetupVertex};
pub use snapshot::{TmuSnapshotV1, VoodooSnapshotV1};
pub use stats::PixelStats;
pub use tmu::{NccTable, TexelLookup, Tmu};
pub use triangle::{render_triangle, round_coordinate, TexIterators, TriangleWorkItem};

/// PCI vendor ID of 3dfx Interactive.
pub const VOODOO_PCI_VENDOR_ID: u16 = 0x121a;
/// PCI device ID of Voodoo Graphics boards.
pub const VOODOO1_PCI_DEVICE_ID: u16 = 0x0001;
/// PCI device ID of Voodoo2 boards.
pub const VOODOO2_PCI_DEVICE_ID: u16 = 0x0002;
/// PCI class code: multimedia device (the Voodoo is not VGA-compatible).
pub const VOODOO_PCI_CLASS_CODE: u8 = 0x04;

impl VoodooModel {
    pub const fn pci_device_id(self) -> u16 {
        match self {
            Self::Voodoo1 | Self::Voodoo1DualTmu => VOODOO1_PCI_DEVICE_ID,
            Self::Voodoo2 => VOODOO2_PCI_DEVICE_ID,
        }
    }
}
