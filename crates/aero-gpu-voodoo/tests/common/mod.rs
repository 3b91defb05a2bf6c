//! Shared helpers for `aero-gpu-voodoo` integration tests.
//!
//! Devices come out of [`new_test_device`] with a 640-pixel stride and three 640x480 surfaces
//! (front, back, aux), so frame-buffer coordinates map directly to screen coordinates.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use aero_gpu_voodoo::regs;
use aero_gpu_voodoo::{HeadlessDisplay, InitEnable, VoodooConfig, VoodooDevice, VoodooModel};

/// First dword of the linear frame buffer aperture.
pub const LFB_BASE: u32 = 0x40_0000 / 4;
/// First dword of the texture aperture (TMU0).
pub const TEXTURE_BASE: u32 = 0x80_0000 / 4;

/// `fbzMode` RGB and aux write enables.
pub const FBZ_RGB_MASK: u32 = 1 << 9;
pub const FBZ_AUX_MASK: u32 = 1 << 10;

pub fn new_test_device(model: VoodooModel) -> (VoodooDevice, HeadlessDisplay) {
    let display = HeadlessDisplay::new();
    let mut device = VoodooDevice::new(
        VoodooConfig::for_model(model),
        Box::new(display.clone()),
        Box::new(display.clone()),
    )
    .expect("default configuration is valid");

    device.set_init_enable(InitEnable::ENABLE_INIT_WRITES);
    // Ten 64-pixel tiles (twenty 32-pixel tiles on Voodoo2) and 150 pages per buffer.
    write_reg(&mut device, regs::FBI_INIT1, 10 << 4);
    write_reg(&mut device, regs::FBI_INIT2, 150 << 11);
    assert_eq!(device.fbi().rowpixels(), 640);
    (device, display)
}

/// Register write broadcast to every chip.
pub fn write_reg(device: &mut VoodooDevice, reg: usize, data: u32) {
    device.mmio_write(reg as u32, data, !0);
}

/// Register write with an explicit chip select (bit 0 FBI, bits 1..3 TMUs).
pub fn write_reg_chips(device: &mut VoodooDevice, reg: usize, chips: u32, data: u32) {
    device.mmio_write((chips << 8) | reg as u32, data, !0);
}

pub fn write_float(device: &mut VoodooDevice, reg: usize, value: f32) {
    write_reg(device, reg, value.to_bits());
}

pub fn read_reg(device: &mut VoodooDevice, reg: usize) -> u32 {
    device.mmio_read(reg as u32)
}

/// Issue `triangleCMD` for the given vertices (in pixels, converted to 12.4).
pub fn draw_triangle(device: &mut VoodooDevice, verts: [(f32, f32); 3]) {
    let fixed = |v: f32| (v * 16.0) as i32 as u32;
    let [(ax, ay), (bx, by), (cx, cy)] = verts;
    write_reg(device, regs::VERTEX_AX, fixed(ax));
    write_reg(device, regs::VERTEX_AY, fixed(ay));
    write_reg(device, regs::VERTEX_BX, fixed(bx));
    write_reg(device, regs::VERTEX_BY, fixed(by));
    write_reg(device, regs::VERTEX_CX, fixed(cx));
    write_reg(device, regs::VERTEX_CY, fixed(cy));
    write_reg(device, regs::TRIANGLE_CMD, 0);
}

/// Load one setup vertex through the Voodoo2 `sV*` registers.
pub fn setup_vertex(device: &mut VoodooDevice, x: f32, y: f32, argb: u32) {
    write_float(device, regs::S_VX, x);
    write_float(device, regs::S_VY, y);
    write_reg(device, regs::S_ARGB, argb);
}

/// `clipLeftRight` / `clipLowYHighY` packing: start in the high half, end (exclusive) in the low.
pub fn clip_span(start: u32, end: u32) -> u32 {
    (start << 16) | end
}

/// Dword offset of 16-bit pixel `(x, y)` in the LFB aperture; `x` is rounded down to even.
pub fn lfb16_offset(x: u32, y: u32) -> u32 {
    LFB_BASE + y * 512 + x / 2
}

/// Dword offset of 32-bit pixel `(x, y)` in the LFB aperture.
pub fn lfb32_offset(x: u32, y: u32) -> u32 {
    LFB_BASE + (y << 10) + x
}

/// Number of non-zero pixels in the `w`x`h` top-left corner of physical buffer `buffer`.
pub fn lit_pixels(device: &VoodooDevice, buffer: usize, w: u32, h: u32) -> usize {
    (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .filter(|&(x, y)| device.fbi().pixel(buffer, x, y).is_some_and(|p| p != 0))
        .count()
}

/// In-memory `tracing` sink for asserting on log output.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Run `f` with a subscriber that writes every event at `TRACE` and above into this buffer.
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
        let logs = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || logs.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
