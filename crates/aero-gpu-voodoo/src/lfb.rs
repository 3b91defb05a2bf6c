//! Linear frame buffer access: host writes in any of the `lfbMode` pixel formats, either stored
//! directly or pushed through the pixel pipeline, and 32-bit reads of pixel pairs.

use crate::device::VoodooDevice;
use crate::fbi::Fbi;
use crate::math::{
    clamped_w, clamped_z, extract_1555, extract_555x, extract_5551, extract_565, extract_8888,
    extract_888x, extract_x555, extract_x888, Argb,
};
use crate::pipeline::{
    alpha_mask_test, alpha_test, chroma_key_test, depth_test, output_pixel, stipple_test,
    CombineOp, DepthValues, PixelColor, PixelRegs, RowTarget,
};
use crate::regs::{self, FbzMode, LfbMode, REG_BANK_LEN};
use crate::tables::{dither_to_565, DitherRow};

/// Per-pixel presence bits, one nibble per pixel of the write.
const LFB_RGB_PRESENT: u32 = 1;
const LFB_ALPHA_PRESENT: u32 = 2;
const LFB_DEPTH_PRESENT: u32 = 4;
/// Depth carried in the upper half of a 32-bit depth+color write. Lives in pixel 0's nibble.
const LFB_DEPTH_PRESENT_MSW: u32 = 8;

/// Up to two pixels decoded from one LFB write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LfbPixels {
    r: [i32; 2],
    g: [i32; 2],
    b: [i32; 2],
    a: [i32; 2],
    depth: [i32; 2],
    mask: u32,
    /// 16-bit formats carry two pixels per dword, so the address counts pixels at twice the rate.
    pair: bool,
}

/// Decode one 16-bit color of write format 0, 1 or 2.
fn color16(format: u32, lanes: u32, v: u32) -> (i32, i32, i32, Option<i32>) {
    let leading_alpha = lanes & 2 == 0;
    let (c0, g, c2, a) = match format {
        0 => {
            let (r, g, b) = extract_565(v);
            (r, g, b, None)
        }
        1 => {
            let (r, g, b) = if leading_alpha {
                extract_x555(v)
            } else {
                extract_555x(v)
            };
            (r, g, b, None)
        }
        _ => {
            if leading_alpha {
                let (a, r, g, b) = extract_1555(v);
                (r, g, b, Some(a))
            } else {
                let (r, g, b, a) = extract_5551(v);
                (r, g, b, Some(a))
            }
        }
    };
    if lanes & 1 != 0 {
        (c2, g, c0, a)
    } else {
        (c0, g, c2, a)
    }
}

impl LfbPixels {
    /// `None` for the reserved formats.
    fn decode(mode: LfbMode, data: u32, za_color: u32) -> Option<Self> {
        let lanes = mode.rgba_lanes();
        let default_depth = (za_color & 0xffff) as i32;
        let default_alpha = (za_color >> 24) as i32;
        let mut px = Self {
            r: [0; 2],
            g: [0; 2],
            b: [0; 2],
            a: [default_alpha; 2],
            depth: [default_depth; 2],
            mask: 0,
            pair: false,
        };

        let set = |px: &mut Self, pix: usize, (r, g, b, a): (i32, i32, i32, Option<i32>)| {
            px.r[pix] = r;
            px.g[pix] = g;
            px.b[pix] = b;
            let mut present = LFB_RGB_PRESENT;
            if let Some(a) = a {
                px.a[pix] = a;
                present |= LFB_ALPHA_PRESENT;
            }
            px.mask |= present << (4 * pix);
        };

        match mode.write_format() {
            format @ 0..=2 => {
                set(&mut px, 0, color16(format, lanes, data & 0xffff));
                set(&mut px, 1, color16(format, lanes, data >> 16));
                px.pair = true;
            }
            4 => {
                let (c0, g, c2) = if lanes & 2 == 0 {
                    extract_x888(data)
                } else {
                    extract_888x(data)
                };
                let (r, b) = if lanes & 1 != 0 { (c2, c0) } else { (c0, c2) };
                set(&mut px, 0, (r, g, b, None));
            }
            5 => {
                let (x0, x1, x2, x3) = extract_8888(data);
                let (a, c0, g, c2) = if lanes & 2 == 0 {
                    (x0, x1, x2, x3)
                } else {
                    (x3, x0, x1, x2)
                };
                let (r, b) = if lanes & 1 != 0 { (c2, c0) } else { (c0, c2) };
                set(&mut px, 0, (r, g, b, Some(a)));
            }
            format @ 12..=14 => {
                px.depth[0] = (data >> 16) as i32;
                set(&mut px, 0, color16(format - 12, lanes, data & 0xffff));
                px.mask |= LFB_DEPTH_PRESENT_MSW;
            }
            15 => {
                px.depth = [(data & 0xffff) as i32, (data >> 16) as i32];
                px.mask = LFB_DEPTH_PRESENT | (LFB_DEPTH_PRESENT << 4);
                px.pair = true;
            }
            _ => return None,
        }
        Some(px)
    }
}

impl VoodooDevice {
    /// Write one dword to the linear frame buffer. `offset` is the dword offset within the
    /// aperture; `mem_mask` selects the bytes actually written.
    pub(crate) fn lfb_write(&mut self, offset: u32, data: u32, mem_mask: u32) {
        let mode = LfbMode(self.regs[regs::LFB_MODE]);
        let (mut data, mut mem_mask) = (data, mem_mask);
        if mode.byte_swizzle_writes() {
            data = data.swap_bytes();
            mem_mask = mem_mask.swap_bytes();
        }
        if mode.word_swap_writes() {
            data = data.rotate_left(16);
            mem_mask = mem_mask.rotate_left(16);
        }

        let Some(px) = LfbPixels::decode(mode, data, self.regs[regs::ZA_COLOR]) else {
            tracing::trace!(
                format = mode.write_format(),
                "voodoo: LFB write in reserved format ignored"
            );
            return;
        };

        let offset = if px.pair { offset << 1 } else { offset };
        let x = (offset & 0x3ff) as i32;
        let y = ((offset >> 10) & 0x3ff) as i32;

        let mut mask = px.mask;
        if mem_mask & 0xffff == 0 {
            mask &= !(0x0f - LFB_DEPTH_PRESENT_MSW);
        }
        if mem_mask & 0xffff_0000 == 0 {
            mask &= !(0xf0 + LFB_DEPTH_PRESENT_MSW);
        }

        let Some(dest) = self.fbi.buffer_offset(mode.write_buffer_select()) else {
            tracing::warn!(
                buffer = mode.write_buffer_select(),
                "voodoo: LFB write to reserved buffer dropped"
            );
            return;
        };

        if mode.enable_pixel_pipeline() {
            self.lfb_write_pipelined(&px, mask, dest, x, y);
        } else {
            self.lfb_write_raw(&px, mask, dest, x, y);
        }
    }

    fn lfb_write_raw(&mut self, px: &LfbPixels, mut mask: u32, dest: u32, x: i32, y: i32) {
        let mode = LfbMode(self.regs[regs::LFB_MODE]);
        let fbz = FbzMode(self.regs[regs::FBZ_MODE]);
        let fbi = &mut self.fbi;

        let scry = fbi.screen_row(y, mode.y_origin());
        let mut bufoffs = (scry as u32)
            .wrapping_mul(fbi.rowpixels)
            .wrapping_add(x as u32);
        let limit = fbi.mask().wrapping_add(1);
        let destmax = limit.wrapping_sub(dest) / 2;
        let depthmax = fbi.aux_offset.map(|aux| limit.wrapping_sub(aux) / 2);

        let dither = DitherRow::new(fbz.enable_dithering(), fbz.dither_type(), y);
        let mut target = RowTarget::new(&mut fbi.ram, Some(dest), fbi.aux_offset);
        let mut x = x;

        for pix in 0..2 {
            if mask == 0 {
                break;
            }
            if mask & 0x0f != 0 {
                let has_rgb = mask & LFB_RGB_PRESENT != 0;
                let has_alpha = mask & LFB_ALPHA_PRESENT != 0 && fbz.enable_alpha_planes();
                let has_depth = mask & (LFB_DEPTH_PRESENT | LFB_DEPTH_PRESENT_MSW) != 0
                    && !fbz.enable_alpha_planes();

                if has_rgb && bufoffs < destmax {
                    let pixel = dither_to_565(dither.as_ref(), x, px.r[pix], px.g[pix], px.b[pix]);
                    target.set_color(bufoffs as i32, pixel);
                }
                if depthmax.is_some_and(|max| bufoffs < max) {
                    if has_alpha {
                        target.set_aux(bufoffs as i32, px.a[pix] as u16);
                    }
                    if has_depth {
                        target.set_aux(bufoffs as i32, px.depth[pix] as u16);
                    }
                }

                self.regs[regs::FBI_PIXELS_OUT] = self.regs[regs::FBI_PIXELS_OUT].wrapping_add(1);
            }

            bufoffs = bufoffs.wrapping_add(1);
            x += 1;
            mask >>= 4;
        }
    }

    fn lfb_write_pipelined(&mut self, px: &LfbPixels, mut mask: u32, dest: u32, x: i32, y: i32) {
        let mode = LfbMode(self.regs[regs::LFB_MODE]);
        let regs = PixelRegs::latch(&self.regs[..REG_BANK_LEN]);
        let fbz = regs.fbz_mode;
        let cp = regs.fbz_color_path;
        let clamp = regs.clamp_iterators();
        let clip_left_right = self.regs[regs::CLIP_LEFT_RIGHT];
        let clip_low_y_high_y = self.regs[regs::CLIP_LOWY_HIGHY];
        let za_color = self.regs[regs::ZA_COLOR];
        let mut stipple = self.regs[regs::STIPPLE];

        let scry = self.fbi.screen_row(y, fbz.y_origin());
        let color_row = self.fbi.row_offset(dest, scry);
        let aux_row = self.fbi.aux_offset.map(|aux| self.fbi.row_offset(aux, scry));
        let dither = DitherRow::new(fbz.enable_dithering(), fbz.dither_type(), y);

        let Fbi {
            ram,
            fog,
            lfb_stats: stats,
            ..
        } = &mut self.fbi;
        let mut target = RowTarget::new(ram, Some(color_row), aux_row);
        let mut x = x;

        for pix in 0..2 {
            if mask == 0 {
                break;
            }
            if mask & 0x0f != 0 {
                let (sr, sg, sb, sa, sw) = (px.r[pix], px.g[pix], px.b[pix], px.a[pix], px.depth[pix]);
                let iterw = if mode.write_w_select() {
                    i64::from(za_color << 16)
                } else {
                    i64::from((sw as u32) << 16)
                };
                let iterz = sw << 12;

                'pixel: {
                    if fbz.enable_clipping() {
                        let left = ((clip_left_right >> 16) & 0x3ff) as i32;
                        let right = (clip_left_right & 0x3ff) as i32;
                        let low = ((clip_low_y_high_y >> 16) & 0x3ff) as i32;
                        let high = (clip_low_y_high_y & 0x3ff) as i32;
                        if x < left || x >= right || scry < low || scry >= high {
                            stats.pixels_in += 1;
                            stats.clip_fail += 1;
                            break 'pixel;
                        }
                    }

                    stats.pixels_in += 1;
                    if !stipple_test(&mut stipple, fbz, x, y, stats) {
                        break 'pixel;
                    }

                    let depth = DepthValues::unbiased(sw);
                    if !depth_test(stats, &regs, &depth, target.aux(x)) {
                        break 'pixel;
                    }

                    let source = Argb::new(sa as u8, sr as u8, sg as u8, sb as u8);
                    if !chroma_key_test(stats, &regs, source) {
                        break 'pixel;
                    }
                    if !alpha_mask_test(stats, &regs, sa) || !alpha_test(stats, &regs, sa) {
                        break 'pixel;
                    }

                    // There is no texel to drive the local-select override; keep the written color.
                    let local = if !cp.cc_localselect_override() && cp.cc_localselect() {
                        let c = regs.color0;
                        [c.r(), c.g(), c.b()].map(i32::from)
                    } else {
                        [sr, sg, sb]
                    };
                    let a_local = match cp.cca_localselect() {
                        1 => i32::from(regs.color0.a()),
                        2 => i32::from(clamped_z(iterz, clamp) as u8),
                        3 => i32::from(clamped_w(iterw, clamp) as u8),
                        _ => sa,
                    };

                    let source_rgb = [sr, sg, sb];
                    let op = CombineOp::color_rgb(cp);
                    let mut rgb = [0i32; 3];
                    for (i, out) in rgb.iter_mut().enumerate() {
                        let factor = match cp.cc_mselect() {
                            1 => local[i],
                            3 => a_local,
                            _ => 0,
                        };
                        let add = match cp.cc_add_aclocal() {
                            1 => local[i],
                            2 => a_local,
                            _ => 0,
                        };
                        *out = op.apply(source_rgb[i], local[i], factor, add);
                    }

                    let factor = match cp.cca_mselect() {
                        1 | 3 => a_local,
                        _ => 0,
                    };
                    let add = if cp.cca_add_aclocal() != 0 { a_local } else { 0 };
                    let a = CombineOp::color_alpha(cp).apply(sa, a_local, factor, add);

                    let color = PixelColor {
                        r: rgb[0],
                        g: rgb[1],
                        b: rgb[2],
                        a,
                    };
                    output_pixel(
                        &mut target,
                        fog,
                        &regs,
                        dither.as_ref(),
                        x,
                        color,
                        &depth,
                        iterz,
                        iterw,
                        0,
                        stats,
                    );
                }
            }

            x += 1;
            mask >>= 4;
        }

        self.regs[regs::STIPPLE] = stipple;
    }

    /// Read two 16-bit pixels from the linear frame buffer.
    pub(crate) fn lfb_read(&self, offset: u32) -> u32 {
        let mode = LfbMode(self.regs[regs::LFB_MODE]);
        let x = (offset << 1) & 0x3fe;
        let y = ((offset >> 9) & 0x3ff) as i32;

        let fbi = &self.fbi;
        let base = match mode.read_buffer_select() {
            0 | 1 => fbi.buffer_offset(mode.read_buffer_select()),
            2 => fbi.aux_offset,
            _ => None,
        };
        let Some(base) = base else {
            return 0xffff_ffff;
        };

        let scry = fbi.screen_row(y, mode.y_origin());
        let bufmax = fbi.mask().wrapping_add(1).wrapping_sub(base) / 2;
        let bufoffs = (scry as u32).wrapping_mul(fbi.rowpixels).wrapping_add(x);
        if bufoffs >= bufmax {
            tracing::warn!(x, y, offset, bufoffs, "voodoo: LFB read out of bounds");
            return 0xffff_ffff;
        }

        let pixel = |index: u32| -> u32 {
            let off = (base.wrapping_add(index.wrapping_mul(2)) & fbi.mask() & !1) as usize;
            u32::from(u16::from_le_bytes([fbi.ram[off], fbi.ram[off + 1]]))
        };
        let mut data = pixel(bufoffs) | (pixel(bufoffs.wrapping_add(1)) << 16);

        if mode.word_swap_reads() {
            data = data.rotate_left(16);
        }
        if mode.byte_swizzle_reads() {
            data = data.swap_bytes();
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mode(format: u32, lanes: u32) -> LfbMode {
        LfbMode(format | (lanes << 9))
    }

    #[test]
    fn sixteen_bit_formats_carry_two_pixels() {
        let px = LfbPixels::decode(mode(0, 0), 0x001f_f800, 0).expect("format 0");
        assert!(px.pair);
        assert_eq!((px.r[0], px.g[0], px.b[0]), (0xff, 0, 0));
        assert_eq!((px.r[1], px.g[1], px.b[1]), (0, 0, 0xff));
        assert_eq!(px.mask, LFB_RGB_PRESENT | (LFB_RGB_PRESENT << 4));

        // BGR lane order swaps red and blue.
        let px = LfbPixels::decode(mode(0, 1), 0x0000_f800, 0).expect("format 0");
        assert_eq!((px.r[0], px.b[0]), (0, 0xff));
    }

    #[test]
    fn alpha_formats_mark_alpha_present() {
        let px = LfbPixels::decode(mode(2, 0), 0x0000_8000, 0).expect("format 2");
        assert_eq!(px.a[0], 0xff);
        assert_eq!(px.a[1], 0);
        assert_eq!(px.mask & 0xff, 0x33);

        let px = LfbPixels::decode(mode(5, 2), 0x1122_3344, 0).expect("format 5");
        assert_eq!((px.r[0], px.g[0], px.b[0], px.a[0]), (0x11, 0x22, 0x33, 0x44));
        let px = LfbPixels::decode(mode(5, 0), 0x1122_3344, 0).expect("format 5");
        assert_eq!((px.a[0], px.r[0], px.g[0], px.b[0]), (0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn depth_formats() {
        let px = LfbPixels::decode(mode(12, 0), 0xabcd_ffff, 0).expect("format 12");
        assert!(!px.pair);
        assert_eq!(px.depth[0], 0xabcd);
        assert_eq!(px.mask, LFB_RGB_PRESENT | LFB_DEPTH_PRESENT_MSW);

        let px = LfbPixels::decode(mode(15, 0), 0x2222_1111, 0).expect("format 15");
        assert_eq!(px.depth, [0x1111, 0x2222]);
        assert!(px.pair);
    }

    #[test]
    fn defaults_come_from_za_color() {
        let px = LfbPixels::decode(mode(4, 0), 0x0010_2030, 0x7f00_1234).expect("format 4");
        assert_eq!(px.a[0], 0x7f);
        assert_eq!(px.depth[0], 0x1234);
        assert_eq!((px.r[0], px.g[0], px.b[0]), (0x10, 0x20, 0x30));
    }

    #[test]
    fn reserved_formats_decode_to_nothing() {
        for format in [3, 6, 7, 8, 9, 10, 11] {
            assert_eq!(LfbPixels::decode(mode(format, 0), 0, 0), None);
        }
    }
}
