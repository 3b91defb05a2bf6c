//! Pixel pipeline statistics.

/// Counters accumulated by one rasterization pass (or by LFB pipeline writes).
///
/// They are folded into the register-visible `fbiPixelsIn`.. counters when one of those
/// registers is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelStats {
    pub pixels_in: i32,
    pub pixels_out: i32,
    pub chroma_fail: i32,
    pub zfunc_fail: i32,
    pub afunc_fail: i32,
    pub clip_fail: i32,
    pub stipple_count: i32,
}

impl PixelStats {
    /// Return the current counts and zero them.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// Single-slot worker array; rasterization runs on the calling thread.
pub const WORKER_COUNT: usize = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_resets() {
        let mut s = PixelStats {
            pixels_in: 3,
            pixels_out: 2,
            ..Default::default()
        };
        let taken = s.take();
        assert_eq!(taken.pixels_in, 3);
        assert_eq!(taken.pixels_out, 2);
        assert_eq!(s, PixelStats::default());
    }
}
