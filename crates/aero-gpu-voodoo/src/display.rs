//! Display-side collaborators.
//!
//! The accelerator does not own a CRTC or a presentation surface. Video timing registers are
//! forwarded to a [`DisplayTiming`] implementation and scanout goes to a [`DisplaySink`].
//! [`HeadlessDisplay`] implements both for hosts without a real display (and for tests).

use std::cell::RefCell;
use std::rc::Rc;

/// Pixel layout handed to a [`DisplaySink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 16-bit little-endian `RRRRRGGGGGGBBBBB`.
    #[default]
    Bgr565,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgr565 => 2,
        }
    }
}

/// Video timing generator driven by the `hSync`/`vSync`/`backPorch`/`videoDimensions` registers.
pub trait DisplayTiming {
    fn set_pixel_clock(&mut self, hz: f64);
    fn set_horizontal_range(&mut self, visible: u32, blank_start: u32, blank_end: u32, total: u32);
    fn set_vertical_range(&mut self, visible: u32, blank_start: u32, blank_end: u32, total: u32);
    /// Whether the programmed ranges describe a usable mode.
    fn is_valid(&self) -> bool;
    fn vertical_frequency(&self) -> f64;
    fn current_line(&self) -> u32;
    fn current_pixel(&self) -> u32;
    fn in_vertical_blank(&self) -> bool;
    fn set_clock_enable(&mut self, enable: bool);
    /// Restart the frame at line 0.
    fn reset_clock(&mut self);
    /// Frequency at which the host should call `VoodooDevice::retrace`.
    fn set_retrace_frequency(&mut self, hz: f64);
    fn set_retrace_active(&mut self, active: bool);
}

/// Presentation surface receiving completed frames.
pub trait DisplaySink {
    fn set_enable(&mut self, enable: bool);
    fn resize(&mut self, width: u32, height: u32);
    fn set_format(&mut self, format: PixelFormat);
    /// Run `f` with the sink's pixel storage and its row stride in bytes.
    fn with_framebuffer(&mut self, f: &mut dyn FnMut(&mut [u8], usize));
    /// Publish the framebuffer contents as a new frame.
    fn present(&mut self);
    /// Blank the output.
    fn clear(&mut self);
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Range {
    visible: u32,
    blank_start: u32,
    blank_end: u32,
    total: u32,
}

#[derive(Debug, Default)]
struct HeadlessState {
    pixel_clock: f64,
    horizontal: Range,
    vertical: Range,
    horizontal_frequency: f64,
    vertical_frequency: f64,
    pixel_duration_ns: u64,
    line_duration_ns: u64,
    frame_duration_ns: u64,
    clock_enabled: bool,
    clock_start_ns: u64,
    now_ns: u64,
    retrace_frequency: f64,
    retrace_active: bool,

    enabled: bool,
    format: PixelFormat,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    frames_presented: u64,
}

impl HeadlessState {
    fn update_frequencies(&mut self) {
        let h = self.horizontal;
        if self.pixel_clock == 0.0
            || h.visible == 0
            || h.total == 0
            || h.blank_start == 0
            || h.blank_end == 0
            || h.visible > h.total
        {
            self.horizontal_frequency = 0.0;
            self.pixel_duration_ns = 0;
            self.line_duration_ns = 0;
        } else {
            let pixel_period = 1.0 / self.pixel_clock;
            self.horizontal_frequency = self.pixel_clock / h.total as f64;
            self.pixel_duration_ns = (1e9 * pixel_period) as u64;
            self.line_duration_ns = (1e9 * pixel_period * h.total as f64) as u64;
        }

        let v = self.vertical;
        if self.line_duration_ns == 0
            || v.visible == 0
            || v.blank_start == 0
            || v.blank_end == 0
            || v.visible > v.total
        {
            self.vertical_frequency = 0.0;
            self.frame_duration_ns = 0;
        } else {
            self.vertical_frequency = self.horizontal_frequency / v.total as f64;
            self.frame_duration_ns = self.line_duration_ns * v.total as u64;
        }
    }

    fn valid(&self) -> bool {
        self.line_duration_ns > 0 && self.frame_duration_ns > 0
    }

    /// `(line, pixel)` at the current time, or `None` when the timing is stopped or invalid.
    fn position(&self) -> Option<(u32, u32)> {
        if !self.clock_enabled || !self.valid() || self.pixel_duration_ns == 0 {
            return None;
        }
        let in_frame = self.now_ns.wrapping_sub(self.clock_start_ns) % self.frame_duration_ns;
        let line = in_frame / self.line_duration_ns;
        let pixel = (in_frame % self.line_duration_ns) / self.pixel_duration_ns;
        Some((line as u32, pixel as u32))
    }
}

/// In-memory display: a software timing model plus a framebuffer copy of the last presented
/// frame. Clones share state, so a host can keep one handle for inspection while the device owns
/// the others.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDisplay {
    inner: Rc<RefCell<HeadlessState>>,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the timing model forward by `ns` nanoseconds.
    pub fn advance(&self, ns: u64) {
        let mut s = self.inner.borrow_mut();
        s.now_ns = s.now_ns.wrapping_add(ns);
    }

    pub fn frames_presented(&self) -> u64 {
        self.inner.borrow().frames_presented
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.borrow().enabled
    }

    pub fn size(&self) -> (u32, u32) {
        let s = self.inner.borrow();
        (s.width, s.height)
    }

    pub fn retrace_active(&self) -> bool {
        self.inner.borrow().retrace_active
    }

    pub fn retrace_frequency(&self) -> f64 {
        self.inner.borrow().retrace_frequency
    }

    pub fn pixel_clock(&self) -> f64 {
        self.inner.borrow().pixel_clock
    }

    /// Pixel at `(x, y)` of the current framebuffer, as a raw 565 value.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u16> {
        let s = self.inner.borrow();
        if x >= s.width || y >= s.height {
            return None;
        }
        let bpp = s.format.bytes_per_pixel();
        let off = (y * s.width + x) as usize * bpp;
        let bytes = s.pixels.get(off..off + 2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }
}

impl DisplayTiming for HeadlessDisplay {
    fn set_pixel_clock(&mut self, hz: f64) {
        let mut s = self.inner.borrow_mut();
        s.pixel_clock = hz;
        s.update_frequencies();
    }

    fn set_horizontal_range(&mut self, visible: u32, blank_start: u32, blank_end: u32, total: u32) {
        let mut s = self.inner.borrow_mut();
        s.horizontal = Range {
            visible,
            blank_start,
            blank_end,
            total,
        };
        s.update_frequencies();
    }

    fn set_vertical_range(&mut self, visible: u32, blank_start: u32, blank_end: u32, total: u32) {
        let mut s = self.inner.borrow_mut();
        s.vertical = Range {
            visible,
            blank_start,
            blank_end,
            total,
        };
        s.update_frequencies();
    }

    fn is_valid(&self) -> bool {
        self.inner.borrow().valid()
    }

    fn vertical_frequency(&self) -> f64 {
        self.inner.borrow().vertical_frequency
    }

    fn current_line(&self) -> u32 {
        self.inner.borrow().position().map_or(0, |(line, _)| line)
    }

    fn current_pixel(&self) -> u32 {
        self.inner.borrow().position().map_or(0, |(_, pixel)| pixel)
    }

    fn in_vertical_blank(&self) -> bool {
        let s = self.inner.borrow();
        s.position()
            .is_some_and(|(line, _)| line >= s.vertical.visible)
    }

    fn set_clock_enable(&mut self, enable: bool) {
        self.inner.borrow_mut().clock_enabled = enable;
    }

    fn reset_clock(&mut self) {
        let mut s = self.inner.borrow_mut();
        s.clock_start_ns = s.now_ns;
    }

    fn set_retrace_frequency(&mut self, hz: f64) {
        self.inner.borrow_mut().retrace_frequency = hz;
    }

    fn set_retrace_active(&mut self, active: bool) {
        self.inner.borrow_mut().retrace_active = active;
    }
}

impl DisplaySink for HeadlessDisplay {
    fn set_enable(&mut self, enable: bool) {
        self.inner.borrow_mut().enabled = enable;
    }

    fn resize(&mut self, width: u32, height: u32) {
        let mut s = self.inner.borrow_mut();
        if s.width == width && s.height == height && !s.pixels.is_empty() {
            return;
        }
        s.width = width;
        s.height = height;
        let len = width as usize * height as usize * s.format.bytes_per_pixel();
        s.pixels = vec![0; len];
    }

    fn set_format(&mut self, format: PixelFormat) {
        self.inner.borrow_mut().format = format;
    }

    fn with_framebuffer(&mut self, f: &mut dyn FnMut(&mut [u8], usize)) {
        let mut s = self.inner.borrow_mut();
        let stride = s.width as usize * s.format.bytes_per_pixel();
        f(&mut s.pixels, stride);
    }

    fn present(&mut self) {
        self.inner.borrow_mut().frames_presented += 1;
    }

    fn clear(&mut self) {
        self.inner.borrow_mut().pixels.fill(0);
    }
}
