//! Frame buffer interface: frame-buffer RAM, surface layout, triangle parameter registers,
//! buffer swaps and fast fill.

use crate::math::Gradient;
use crate::pipeline::{FogTable, PixelRegs, RowTarget};
use crate::regs::{self, FbiInit1, FbiInit2, FbiInit5, FbiInit6};
use crate::setup::SetupVertex;
use crate::stats::PixelStats;
use crate::tables::{dither_to_565, DitherRow};

/// Frame buffer interface state.
pub struct Fbi {
    pub(crate) ram: Vec<u8>,
    mask: u32,

    /// Byte offsets of the color surfaces; the third exists only with triple buffering.
    pub(crate) rgb_offsets: [Option<u32>; 3],
    pub(crate) aux_offset: Option<u32>,
    pub(crate) front_buffer: usize,
    pub(crate) back_buffer: usize,
    pub(crate) rowpixels: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) yorigin: u32,
    pub(crate) vblank_dont_swap: bool,

    pub(crate) fog: FogTable,

    pub ax: i16,
    pub ay: i16,
    pub bx: i16,
    pub by: i16,
    pub cx: i16,
    pub cy: i16,
    pub r: Gradient<i32>,
    pub g: Gradient<i32>,
    pub b: Gradient<i32>,
    pub a: Gradient<i32>,
    pub z: Gradient<i32>,
    pub w: Gradient<i64>,

    pub(crate) svert: [SetupVertex; 3],
    pub(crate) sverts: u32,

    /// Statistics of LFB writes that went through the pixel pipeline.
    pub(crate) lfb_stats: PixelStats,
}

impl Fbi {
    /// `mem_bytes` must be a power of two.
    pub fn new(voodoo2: bool, mem_bytes: usize) -> Self {
        Self {
            ram: vec![0; mem_bytes],
            mask: (mem_bytes as u32).wrapping_sub(1),
            rgb_offsets: [Some(0), None, None],
            aux_offset: None,
            front_buffer: 0,
            back_buffer: 1,
            rowpixels: 0,
            width: 640,
            height: 480,
            yorigin: 0,
            vblank_dont_swap: false,
            fog: FogTable::new(voodoo2),
            ax: 0,
            ay: 0,
            bx: 0,
            by: 0,
            cx: 0,
            cy: 0,
            r: Gradient::default(),
            g: Gradient::default(),
            b: Gradient::default(),
            a: Gradient::default(),
            z: Gradient::default(),
            w: Gradient::default(),
            svert: [SetupVertex::default(); 3],
            sverts: 0,
            lfb_stats: PixelStats::default(),
        }
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Pixels per frame-buffer row.
    pub fn rowpixels(&self) -> u32 {
        self.rowpixels
    }

    pub fn front_buffer(&self) -> usize {
        self.front_buffer
    }

    pub fn back_buffer(&self) -> usize {
        self.back_buffer
    }

    pub fn rgb_offset(&self, buffer: usize) -> Option<u32> {
        self.rgb_offsets.get(buffer).copied().flatten()
    }

    pub fn aux_offset(&self) -> Option<u32> {
        self.aux_offset
    }

    /// Visible size programmed through `videoDimensions`.
    pub fn video_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Color surface targeted by a 2-bit draw/write buffer select: 0 front, 1 back.
    pub fn buffer_offset(&self, select: u32) -> Option<u32> {
        match select {
            0 => self.rgb_offset(self.front_buffer),
            1 => self.rgb_offset(self.back_buffer),
            _ => None,
        }
    }

    /// Row in memory of screen row `y`, flipped about `yorigin` when `flip` is set.
    #[inline]
    pub fn screen_row(&self, y: i32, flip: bool) -> i32 {
        if flip {
            (self.yorigin as i32 - y) & 0x3ff
        } else {
            y
        }
    }

    /// Byte offset of the first pixel of memory row `scry` on the surface at `base`.
    #[inline]
    pub fn row_offset(&self, base: u32, scry: i32) -> u32 {
        base.wrapping_add((scry as u32).wrapping_mul(self.rowpixels).wrapping_mul(2))
    }

    /// Row accessor over the given color/aux surfaces, both offset to memory row `scry`.
    pub fn row_target(&mut self, color: Option<u32>, scry: i32, with_aux: bool) -> RowTarget<'_> {
        let color = color.map(|base| self.row_offset(base, scry));
        let aux = self
            .aux_offset
            .filter(|_| with_aux)
            .map(|base| self.row_offset(base, scry));
        RowTarget::new(&mut self.ram, color, aux)
    }

    /// Recompute the surface layout from `fbiInit1/2/5/6` in the FBI register bank.
    pub fn recompute_video_memory(&mut self, bank: &[u32], voodoo2: bool) {
        let init1 = FbiInit1(bank[regs::FBI_INIT1]);
        let init2 = FbiInit2(bank[regs::FBI_INIT2]);
        let buffer_pages = init2.video_buffer_offset();

        let mut memory_config = u32::from(init2.enable_triple_buf());
        if voodoo2 && memory_config == 0 {
            memory_config = FbiInit5(bank[regs::FBI_INIT5]).buffer_allocation();
        }

        let mut x_tiles = init1.x_video_tiles();
        let tile_width = if voodoo2 {
            x_tiles = (x_tiles << 1)
                | (u32::from(init1.x_video_tiles_bit5()) << 5)
                | u32::from(FbiInit6(bank[regs::FBI_INIT6]).x_video_tiles_bit0());
            32
        } else {
            64
        };
        self.rowpixels = tile_width * x_tiles;

        let page = buffer_pages * 0x1000;
        self.rgb_offsets[0] = Some(0);
        self.rgb_offsets[1] = Some(page);
        (self.rgb_offsets[2], self.aux_offset) = match memory_config {
            1 => (Some(2 * page), None),
            2 => (Some(2 * page), Some(3 * page)),
            // Configuration 3 is reserved; it lays out like double buffering.
            _ => (None, Some(2 * page)),
        };

        let mask = self.mask;
        for offset in self.rgb_offsets.iter_mut().flatten() {
            *offset = (*offset).min(mask);
        }
        if let Some(aux) = self.aux_offset.as_mut() {
            *aux = (*aux).min(mask);
        }

        if self.rgb_offsets[2].is_none() {
            if self.front_buffer == 2 {
                self.front_buffer = 0;
            }
            if self.back_buffer == 2 {
                self.back_buffer = 0;
            }
        }

        tracing::debug!(
            rowpixels = self.rowpixels,
            buffer_pages,
            memory_config,
            aux = ?self.aux_offset,
            "voodoo: video memory layout recomputed"
        );
    }

    /// `swapbufferCMD`: rotate front/back among two or three surfaces.
    pub fn swap_buffers(&mut self, data: u32, voodoo2: bool) {
        self.vblank_dont_swap = data & (1 << 9) != 0;
        if voodoo2 && self.vblank_dont_swap {
            return;
        }
        if self.rgb_offsets[2].is_none() {
            self.front_buffer = 1 - self.front_buffer;
            self.back_buffer = 1 - self.front_buffer;
        } else {
            self.front_buffer = (self.front_buffer + 1) % 3;
            self.back_buffer = (self.front_buffer + 1) % 3;
        }
    }

    /// `fastfillCMD`: fill the clip rectangle with `color1` (dithered) and/or the `zaColor` depth.
    pub fn fastfill(
        &mut self,
        regs: &PixelRegs,
        clip_left_right: u32,
        clip_low_y_high_y: u32,
        stats: &mut PixelStats,
    ) {
        let mode = regs.fbz_mode;
        if !mode.rgb_buffer_mask() && !mode.aux_buffer_mask() {
            return;
        }

        let sx = ((clip_left_right >> 16) & 0x3ff) as i32;
        let ex = (clip_left_right & 0x3ff) as i32;
        let sy = ((clip_low_y_high_y >> 16) & 0x3ff) as i32;
        let ey = (clip_low_y_high_y & 0x3ff) as i32;

        let mut pattern = [0u16; 16];
        let color = regs.color1;
        let (r, g, b) = (i32::from(color.r()), i32::from(color.g()), i32::from(color.b()));
        for y in 0..4 {
            let dither = DitherRow::new(mode.enable_dithering(), mode.dither_type(), y);
            for x in 0..4 {
                pattern[(y * 4 + x) as usize] = dither_to_565(dither.as_ref(), x, r, g, b);
            }
        }

        let color_base = if mode.rgb_buffer_mask() {
            self.buffer_offset(mode.draw_buffer())
        } else {
            None
        };
        let depth = (regs.za_color & 0xffff) as u16;

        for y in sy..ey {
            let scry = self.screen_row(y, mode.y_origin());

            if mode.rgb_buffer_mask() {
                if let Some(base) = color_base {
                    let row = &pattern[((y & 3) * 4) as usize..][..4];
                    let mut target = self.row_target(Some(base), scry, false);
                    for x in sx..ex {
                        target.set_color(x, row[(x & 3) as usize]);
                    }
                }
                stats.pixels_out += (ex - sx).max(0);
            }

            if mode.aux_buffer_mask() {
                if let Some(aux) = self.aux_offset {
                    let row_start = i64::from(scry) * i64::from(self.rowpixels);
                    let mut stop = i64::from(ex);
                    if i64::from(aux) + 2 * (row_start + stop) >= i64::from(self.mask) {
                        stop = (i64::from(self.mask) - i64::from(aux)) / 2 - row_start;
                        if stop < 0 || stop < i64::from(sx) {
                            continue;
                        }
                    }
                    let mut target = RowTarget::new(
                        &mut self.ram,
                        None,
                        Some(aux.wrapping_add((row_start as u32).wrapping_mul(2))),
                    );
                    for x in sx..stop as i32 {
                        target.set_aux(x, depth);
                    }
                }
            }
        }

        tracing::trace!(sx, ex, sy, ey, "voodoo: fastfill");
    }

    /// Raw 565 pixel at `(x, memory row)` of surface `buffer`, for inspection.
    pub fn pixel(&self, buffer: usize, x: u32, row: u32) -> Option<u16> {
        let base = self.rgb_offset(buffer)?;
        let off = (self.row_offset(base, row as i32).wrapping_add(x * 2) & self.mask & !1) as usize;
        Some(u16::from_le_bytes([self.ram[off], self.ram[off + 1]]))
    }

    /// Raw aux value at `(x, memory row)`, for inspection.
    pub fn aux_value(&self, x: u32, row: u32) -> Option<u16> {
        let base = self.aux_offset?;
        let off = (self.row_offset(base, row as i32).wrapping_add(x * 2) & self.mask & !1) as usize;
        Some(u16::from_le_bytes([self.ram[off], self.ram[off + 1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Argb;
    use crate::regs::{FbzMode, REG_BANK_LEN};
    use pretty_assertions::assert_eq;

    fn bank_with_layout(pages: u32, triple: bool, x_tiles: u32) -> Vec<u32> {
        let mut bank = vec![0; REG_BANK_LEN];
        bank[regs::FBI_INIT1] = x_tiles << 4;
        bank[regs::FBI_INIT2] = (pages << 11) | (u32::from(triple) << 4);
        bank
    }

    #[test]
    fn double_buffered_layout() {
        let mut fbi = Fbi::new(false, 2 << 20);
        fbi.recompute_video_memory(&bank_with_layout(0x96, false, 10), false);
        assert_eq!(fbi.rowpixels(), 640);
        assert_eq!(fbi.rgb_offsets, [Some(0), Some(0x96000), None]);
        assert_eq!(fbi.aux_offset(), Some(0x12c000));
    }

    #[test]
    fn triple_buffering_drops_aux_on_voodoo1() {
        let mut fbi = Fbi::new(false, 4 << 20);
        fbi.recompute_video_memory(&bank_with_layout(0x96, true, 10), false);
        assert_eq!(fbi.rgb_offset(2), Some(0x12c000));
        assert_eq!(fbi.aux_offset(), None);
    }

    #[test]
    fn voodoo2_buffer_allocation_and_tiles() {
        let mut fbi = Fbi::new(true, 4 << 20);
        let mut bank = bank_with_layout(0x96, false, 10);
        bank[regs::FBI_INIT5] = 2 << 9;
        bank[regs::FBI_INIT6] = 1 << 30;
        fbi.recompute_video_memory(&bank, true);
        // 32-pixel tiles: (10 << 1) | 1 = 21 tiles.
        assert_eq!(fbi.rowpixels(), 21 * 32);
        assert_eq!(fbi.rgb_offset(2), Some(0x12c000));
        assert_eq!(fbi.aux_offset(), Some(0x1c2000));
    }

    #[test]
    fn offsets_are_clamped_to_memory() {
        let mut fbi = Fbi::new(false, 2 << 20);
        fbi.recompute_video_memory(&bank_with_layout(0x1ff, false, 10), false);
        assert_eq!(fbi.rgb_offset(1), Some(0x1ff000));
        assert_eq!(fbi.aux_offset(), Some(fbi.mask()));
    }

    #[test]
    fn swap_rotates_two_and_three_buffers() {
        let mut fbi = Fbi::new(false, 4 << 20);
        fbi.recompute_video_memory(&bank_with_layout(0x96, false, 10), false);
        fbi.swap_buffers(0, false);
        assert_eq!((fbi.front_buffer(), fbi.back_buffer()), (1, 0));
        fbi.swap_buffers(0, false);
        assert_eq!((fbi.front_buffer(), fbi.back_buffer()), (0, 1));

        fbi.recompute_video_memory(&bank_with_layout(0x96, true, 10), false);
        let mut seen = Vec::new();
        for _ in 0..3 {
            fbi.swap_buffers(0, false);
            seen.push((fbi.front_buffer(), fbi.back_buffer()));
        }
        assert_eq!(seen, vec![(1, 2), (2, 0), (0, 1)]);

        // Losing the third surface pulls indices back into range.
        fbi.swap_buffers(0, false);
        fbi.recompute_video_memory(&bank_with_layout(0x96, false, 10), false);
        assert_eq!((fbi.front_buffer(), fbi.back_buffer()), (1, 0));
    }

    #[test]
    fn voodoo2_honors_dont_swap() {
        let mut fbi = Fbi::new(true, 4 << 20);
        fbi.recompute_video_memory(&bank_with_layout(0x96, false, 10), true);
        fbi.swap_buffers(1 << 9, true);
        assert_eq!(fbi.front_buffer(), 0);
        assert!(fbi.vblank_dont_swap);

        let mut v1 = Fbi::new(false, 4 << 20);
        v1.recompute_video_memory(&bank_with_layout(0x96, false, 10), false);
        v1.swap_buffers(1 << 9, false);
        assert_eq!(v1.front_buffer(), 1);
    }

    #[test]
    fn fastfill_writes_color_and_depth() {
        let mut fbi = Fbi::new(false, 2 << 20);
        fbi.recompute_video_memory(&bank_with_layout(0x96, false, 10), false);
        let regs = PixelRegs {
            // RGB + aux masks, draw to back buffer.
            fbz_mode: FbzMode((1 << 9) | (1 << 10) | (1 << 14)),
            color1: Argb(0x00ff_0000),
            za_color: 0x1234,
            ..Default::default()
        };
        let mut stats = PixelStats::default();
        fbi.fastfill(&regs, (2 << 16) | 6, (1 << 16) | 4, &mut stats);

        assert_eq!(stats.pixels_out, 4 * 3);
        assert_eq!(fbi.pixel(1, 2, 1), Some(0xf800));
        assert_eq!(fbi.pixel(1, 5, 3), Some(0xf800));
        assert_eq!(fbi.pixel(1, 6, 3), Some(0));
        assert_eq!(fbi.pixel(1, 2, 4), Some(0));
        assert_eq!(fbi.pixel(0, 2, 1), Some(0));
        assert_eq!(fbi.aux_value(3, 2), Some(0x1234));
        assert_eq!(fbi.aux_value(1, 2), Some(0));
    }

    #[test]
    fn fastfill_without_masks_is_a_no_op() {
        let mut fbi = Fbi::new(false, 2 << 20);
        fbi.recompute_video_memory(&bank_with_layout(0x96, false, 10), false);
        let regs = PixelRegs {
            color1: Argb(0x00ff_ffff),
            ..Default::default()
        };
        let mut stats = PixelStats::default();
        fbi.fastfill(&regs, 640, 480, &mut stats);
        assert_eq!(stats, PixelStats::default());
        assert!(fbi.ram().iter().all(|&b| b == 0));
    }

    #[test]
    fn y_origin_flips_rows() {
        let mut fbi = Fbi::new(false, 2 << 20);
        fbi.yorigin = 479;
        assert_eq!(fbi.screen_row(0, true), 479);
        assert_eq!(fbi.screen_row(479, true), 0);
        assert_eq!(fbi.screen_row(7, false), 7);
    }
}
