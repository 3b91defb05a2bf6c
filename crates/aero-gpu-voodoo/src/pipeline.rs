//! Per-pixel stages shared by the triangle scanline routine and pipelined LFB writes.
//!
//! Each test stage returns `true` when the pixel survives and bumps exactly one statistic when it
//! does not. The caller owns the stage order:
//!
//! 1. clip (per span, done by the caller)
//! 2. [`stipple_test`]
//! 3. [`depth_test`]
//! 4. [`chroma_key_test`]
//! 5. [`alpha_mask_test`] / [`alpha_test`]
//! 6. color and alpha combine ([`CombineOp`])
//! 7. [`output_pixel`]: fog, alpha blend, dither and write-back

use crate::math::{clamp_u8, clamped_w, clamped_z, extract_565, float_w, float_z, Argb};
use crate::regs::{
    self, AlphaMode, ChromaRange, FbzColorPath, FbzMode, FogMode, TextureMode,
};
use crate::stats::PixelStats;
use crate::tables::{dither_to_565, DitherRow};

/// Register inputs of the pixel stages, latched when a primitive is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRegs {
    pub fbz_color_path: FbzColorPath,
    pub fbz_mode: FbzMode,
    pub alpha_mode: AlphaMode,
    pub fog_mode: FogMode,
    pub za_color: u32,
    pub chroma_key: Argb,
    pub chroma_range: ChromaRange,
    pub fog_color: Argb,
    pub color0: Argb,
    pub color1: Argb,
}

impl PixelRegs {
    /// Latch the pixel-stage registers from the FBI bank.
    pub fn latch(fbi_bank: &[u32]) -> Self {
        Self {
            fbz_color_path: FbzColorPath(fbi_bank[regs::FBZ_COLOR_PATH]),
            fbz_mode: FbzMode(fbi_bank[regs::FBZ_MODE]),
            alpha_mode: AlphaMode(fbi_bank[regs::ALPHA_MODE]),
            fog_mode: FogMode(fbi_bank[regs::FOG_MODE]),
            za_color: fbi_bank[regs::ZA_COLOR],
            chroma_key: Argb(fbi_bank[regs::CHROMA_KEY]),
            chroma_range: ChromaRange(fbi_bank[regs::CHROMA_RANGE]),
            fog_color: Argb(fbi_bank[regs::FOG_COLOR]),
            color0: Argb(fbi_bank[regs::COLOR0]),
            color1: Argb(fbi_bank[regs::COLOR1]),
        }
    }

    #[inline]
    fn depth_bias(&self) -> i32 {
        self.za_color as u16 as i16 as i32
    }

    /// Whether the iterator clamp mode (rather than the wrapping quirk) is selected.
    #[inline]
    pub fn clamp_iterators(&self) -> bool {
        self.fbz_color_path.rgbzw_clamp()
    }
}

/// Working color of a pixel as it moves through the stages. Channels are kept wide so the
/// intermediate sums can over- and underflow before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelColor {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub a: i32,
}

pub const FOG_ENTRIES: usize = 64;

/// The 64-entry fog table, expanded from the 32 `fogTable` registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FogTable {
    pub blend: [u8; FOG_ENTRIES],
    pub delta: [u8; FOG_ENTRIES],
    delta_mask: u8,
}

impl FogTable {
    pub fn new(voodoo2: bool) -> Self {
        Self {
            blend: [0; FOG_ENTRIES],
            delta: [0; FOG_ENTRIES],
            delta_mask: if voodoo2 { 0xfc } else { 0xff },
        }
    }

    /// Store `fogTable[index]`, which packs two delta/blend pairs.
    pub fn write(&mut self, index: usize, data: u32) {
        let base = 2 * index;
        self.delta[base] = data as u8;
        self.blend[base] = (data >> 8) as u8;
        self.delta[base + 1] = (data >> 16) as u8;
        self.blend[base + 1] = (data >> 24) as u8;
    }

    /// Re-pack entry pair `index` in register layout.
    pub fn read(&self, index: usize) -> u32 {
        let base = 2 * index;
        u32::from(self.delta[base])
            | u32::from(self.blend[base]) << 8
            | u32::from(self.delta[base + 1]) << 16
            | u32::from(self.blend[base + 1]) << 24
    }
}

/// One row of the color and aux surfaces, addressed in pixels.
///
/// Every access is masked to the frame-buffer size, so a row that hangs off the end of memory
/// wraps instead of faulting.
pub struct RowTarget<'a> {
    ram: &'a mut [u8],
    mask: u32,
    color: Option<u32>,
    aux: Option<u32>,
}

impl<'a> RowTarget<'a> {
    /// `color` and `aux` are byte offsets of pixel 0 of the row, `None` when the surface is absent.
    pub fn new(ram: &'a mut [u8], color: Option<u32>, aux: Option<u32>) -> Self {
        let mask = (ram.len() as u32).wrapping_sub(1);
        Self {
            ram,
            mask,
            color,
            aux,
        }
    }

    #[inline]
    fn offset(&self, base: u32, x: i32) -> usize {
        (base.wrapping_add((x as u32).wrapping_mul(2)) & self.mask & !1) as usize
    }

    #[inline]
    fn load(&self, base: u32, x: i32) -> u16 {
        let off = self.offset(base, x);
        u16::from_le_bytes([self.ram[off], self.ram[off + 1]])
    }

    #[inline]
    fn store(&mut self, base: u32, x: i32, value: u16) {
        let off = self.offset(base, x);
        self.ram[off..off + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn has_color(&self) -> bool {
        self.color.is_some()
    }

    pub fn has_aux(&self) -> bool {
        self.aux.is_some()
    }

    pub fn color(&self, x: i32) -> u16 {
        self.color.map_or(0, |base| self.load(base, x))
    }

    pub fn set_color(&mut self, x: i32, value: u16) {
        if let Some(base) = self.color {
            self.store(base, x, value);
        }
    }

    pub fn aux(&self, x: i32) -> Option<u16> {
        self.aux.map(|base| self.load(base, x))
    }

    pub fn set_aux(&mut self, x: i32, value: u16) {
        if let Some(base) = self.aux {
            self.store(base, x, value);
        }
    }
}

/// Stipple stage. Rotate mode advances the live `stipple` register once per tested pixel.
pub fn stipple_test(stipple: &mut u32, mode: FbzMode, x: i32, y: i32, stats: &mut PixelStats) -> bool {
    if !mode.enable_stipple() {
        return true;
    }
    let pass = if !mode.stipple_pattern() {
        *stipple = stipple.rotate_left(1);
        *stipple & 0x8000_0000 != 0
    } else {
        let index = ((y & 3) << 3) | (!x & 7);
        (*stipple >> index) & 1 != 0
    };
    if !pass {
        stats.stipple_count += 1;
    }
    pass
}

/// Depth values derived once per pixel from the iterated Z/W.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthValues {
    /// Table-fog index source, biased when depth bias is enabled.
    pub fogdepth: i32,
    /// Depth compared against and written to the aux buffer.
    pub biasdepth: i32,
}

impl DepthValues {
    pub fn compute(regs: &PixelRegs, iterz: i32, iterw: i64) -> Self {
        let mode = regs.fbz_mode;
        let wfloat = float_w(iterw);

        let depthval = if !mode.wbuffer_select() {
            clamped_z(iterz, regs.clamp_iterators())
        } else if !mode.depth_float_select() {
            wfloat
        } else {
            float_z(iterz)
        };

        let (mut fogdepth, mut biasdepth) = (wfloat, depthval);
        if mode.enable_depth_bias() {
            fogdepth = (fogdepth + regs.depth_bias()).clamp(0, 0xffff);
            biasdepth = (biasdepth + regs.depth_bias()).clamp(0, 0xffff);
        }
        Self { fogdepth, biasdepth }
    }

    /// LFB pipeline writes use the supplied depth directly, unbiased.
    pub fn unbiased(depth: i32) -> Self {
        Self {
            fogdepth: depth,
            biasdepth: depth,
        }
    }
}

/// Depth stage. A pixel with no aux buffer to compare against passes.
pub fn depth_test(
    stats: &mut PixelStats,
    regs: &PixelRegs,
    depth: &DepthValues,
    dest_depth: Option<u16>,
) -> bool {
    let mode = regs.fbz_mode;
    if !mode.enable_depthbuf() {
        return true;
    }
    let Some(dest) = dest_depth else {
        return true;
    };

    let source = if mode.depth_source_compare() {
        regs.za_color as u16 as i32
    } else {
        depth.biasdepth
    };
    let pass = compare(mode.depth_function(), source, i32::from(dest));
    if !pass {
        stats.zfunc_fail += 1;
    }
    pass
}

/// The eight comparison operators shared by the depth and alpha tests.
#[inline]
fn compare(function: u32, lhs: i32, rhs: i32) -> bool {
    match function {
        0 => false,
        1 => lhs < rhs,
        2 => lhs == rhs,
        3 => lhs <= rhs,
        4 => lhs > rhs,
        5 => lhs != rhs,
        6 => lhs >= rhs,
        _ => true,
    }
}

/// Chroma-key stage, exact match or per-channel range.
pub fn chroma_key_test(stats: &mut PixelStats, regs: &PixelRegs, color: Argb) -> bool {
    if !regs.fbz_mode.enable_chromakey() {
        return true;
    }

    let range = regs.chroma_range;
    let key = regs.chroma_key;
    let rejected = if !range.enable() {
        (color.0 ^ key.0) & 0x00ff_ffff == 0
    } else {
        let high = Argb(range.0);
        let within = |test: u8, low: u8, high: u8, exclusive: bool| {
            ((low..=high).contains(&test)) ^ exclusive
        };
        let results = (u8::from(within(color.b(), key.b(), high.b(), range.blue_exclusive())) << 2)
            | (u8::from(within(color.g(), key.g(), high.g(), range.green_exclusive())) << 1)
            | u8::from(within(color.r(), key.r(), high.r(), range.red_exclusive()));
        if range.union_mode() {
            results != 0
        } else {
            results == 7
        }
    };

    if rejected {
        stats.chroma_fail += 1;
    }
    !rejected
}

/// Alpha-mask stage: alpha bit 0 must be set.
pub fn alpha_mask_test(stats: &mut PixelStats, regs: &PixelRegs, alpha: i32) -> bool {
    if regs.fbz_mode.enable_alpha_mask() && alpha & 1 == 0 {
        stats.afunc_fail += 1;
        return false;
    }
    true
}

/// Alpha test against the reference in `alphaMode[31:24]`.
pub fn alpha_test(stats: &mut PixelStats, regs: &PixelRegs, alpha: i32) -> bool {
    let mode = regs.alpha_mode;
    if !mode.alpha_test() {
        return true;
    }
    let pass = compare(mode.alpha_function(), alpha, mode.alpha_ref() as i32);
    if !pass {
        stats.afunc_fail += 1;
    }
    pass
}

/// Flags of one combine unit: `(zero_other ? 0 : other) - (sub_clocal ? local : 0)`, scaled by
/// the (optionally reversed) factor, plus an add term, clamped and optionally inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombineOp {
    pub zero_other: bool,
    pub sub_clocal: bool,
    pub reverse_blend: bool,
    pub invert_output: bool,
}

impl CombineOp {
    pub fn color_rgb(cp: FbzColorPath) -> Self {
        Self {
            zero_other: cp.cc_zero_other(),
            sub_clocal: cp.cc_sub_clocal(),
            reverse_blend: cp.cc_reverse_blend(),
            invert_output: cp.cc_invert_output(),
        }
    }

    pub fn color_alpha(cp: FbzColorPath) -> Self {
        Self {
            zero_other: cp.cca_zero_other(),
            sub_clocal: cp.cca_sub_clocal(),
            reverse_blend: cp.cca_reverse_blend(),
            invert_output: cp.cca_invert_output(),
        }
    }

    pub fn texture_rgb(tm: TextureMode) -> Self {
        Self {
            zero_other: tm.tc_zero_other(),
            sub_clocal: tm.tc_sub_clocal(),
            reverse_blend: tm.tc_reverse_blend(),
            invert_output: tm.tc_invert_output(),
        }
    }

    pub fn texture_alpha(tm: TextureMode) -> Self {
        Self {
            zero_other: tm.tca_zero_other(),
            sub_clocal: tm.tca_sub_clocal(),
            reverse_blend: tm.tca_reverse_blend(),
            invert_output: tm.tca_invert_output(),
        }
    }

    /// Combine one channel. `factor` is the multiply-menu selection before reversal.
    #[inline]
    pub fn apply(self, other: i32, local: i32, factor: i32, add: i32) -> i32 {
        let mut v = if self.zero_other { 0 } else { other };
        if self.sub_clocal {
            v -= local;
        }
        let factor = if self.reverse_blend { factor } else { factor ^ 0xff };
        v = (v * (factor + 1)) >> 8;
        v = clamp_u8(v + add);
        if self.invert_output {
            v ^= 0xff;
        }
        v
    }
}

/// Fog, alpha blend, dither and write-back for a pixel that passed every test.
///
/// `iter_alpha` is the iterated alpha used by the iterated-alpha fog source.
#[allow(clippy::too_many_arguments)]
pub fn output_pixel(
    target: &mut RowTarget<'_>,
    fog: &FogTable,
    regs: &PixelRegs,
    dither: Option<&DitherRow>,
    x: i32,
    mut color: PixelColor,
    depth: &DepthValues,
    iterz: i32,
    iterw: i64,
    iter_alpha: i32,
    stats: &mut PixelStats,
) {
    let prefog = [color.r, color.g, color.b];
    apply_fog(fog, regs, dither, x, &mut color, depth, iterz, iterw, iter_alpha);
    alpha_blend(target, regs, dither, x, &mut color, prefog);

    let mode = regs.fbz_mode;
    if mode.rgb_buffer_mask() {
        let pixel = dither_to_565(dither, x, color.r, color.g, color.b);
        target.set_color(x, pixel);
    }
    if target.has_aux() && mode.aux_buffer_mask() {
        let value = if mode.enable_alpha_planes() {
            color.a
        } else {
            depth.biasdepth
        };
        target.set_aux(x, value as u16);
    }

    stats.pixels_out += 1;
}

#[allow(clippy::too_many_arguments)]
fn apply_fog(
    fog: &FogTable,
    regs: &PixelRegs,
    dither: Option<&DitherRow>,
    x: i32,
    color: &mut PixelColor,
    depth: &DepthValues,
    iterz: i32,
    iterw: i64,
    iter_alpha: i32,
) {
    let mode = regs.fog_mode;
    if !mode.enable_fog() {
        return;
    }

    let fog_color = regs.fog_color;
    let (mut fr, mut fg, mut fb);
    if mode.fog_constant() {
        fr = i32::from(fog_color.r());
        fg = i32::from(fog_color.g());
        fb = i32::from(fog_color.b());
    } else {
        if !mode.fog_add() {
            fr = i32::from(fog_color.r());
            fg = i32::from(fog_color.g());
            fb = i32::from(fog_color.b());
        } else {
            (fr, fg, fb) = (0, 0, 0);
        }

        if !mode.fog_mult() {
            fr -= color.r;
            fg -= color.g;
            fb -= color.b;
        }

        let blend = match mode.fog_zalpha() {
            0 => {
                // 4.12 W of exactly 1.0 encodes as 0x10000, one past the last table entry.
                let index = ((depth.fogdepth >> 10) as usize).min(FOG_ENTRIES - 1);
                let delta = i32::from(fog.delta[index]);
                let mut deltaval = (delta & i32::from(fog.delta_mask)) * ((depth.fogdepth >> 2) & 0xff);
                if mode.fog_zones() && delta & 2 != 0 {
                    deltaval = -deltaval;
                }
                deltaval >>= 6;
                if mode.fog_dither() {
                    if let Some(d) = dither {
                        deltaval += i32::from(d.matrix4[(x & 3) as usize]);
                    }
                }
                deltaval >>= 4;
                i32::from(fog.blend[index]) + deltaval
            }
            1 => iter_alpha,
            2 => clamped_z(iterz, regs.clamp_iterators()) >> 8,
            _ => clamped_w(iterw, regs.clamp_iterators()),
        } + 1;

        fr = (fr * blend) >> 8;
        fg = (fg * blend) >> 8;
        fb = (fb * blend) >> 8;
    }

    if !mode.fog_mult() {
        color.r += fr;
        color.g += fg;
        color.b += fb;
    } else {
        color.r = fr;
        color.g = fg;
        color.b = fb;
    }
    color.r = clamp_u8(color.r);
    color.g = clamp_u8(color.g);
    color.b = clamp_u8(color.b);
}

fn alpha_blend(
    target: &RowTarget<'_>,
    regs: &PixelRegs,
    dither: Option<&DitherRow>,
    x: i32,
    color: &mut PixelColor,
    prefog: [i32; 3],
) {
    let mode = regs.alpha_mode;
    if !mode.alpha_blend() {
        return;
    }
    let fbz = regs.fbz_mode;

    let (mut dr, mut dg, mut db) = extract_565(u32::from(target.color(x)));
    let da = match target.aux(x) {
        Some(aux) if fbz.enable_alpha_planes() => i32::from(aux),
        _ => 0xff,
    };
    let (sr, sg, sb, sa) = (color.r, color.g, color.b, color.a);

    if fbz.alpha_dither_subtract() {
        if let Some(d) = dither {
            let dith = i32::from(d.matrix[(x & 3) as usize]);
            dr = ((dr << 1) + 15 - dith) >> 1;
            dg = ((dg << 2) + 15 - dith) >> 2;
            db = ((db << 1) + 15 - dith) >> 1;
        }
    }

    let scale = |v: i32, f: i32| (v * f) >> 8;
    let src = [sr, sg, sb];
    let dst = [dr, dg, db];
    let mut out = [0i32; 3];

    for i in 0..3 {
        out[i] = match mode.src_rgb_blend() {
            1 => scale(src[i], sa + 1),
            2 => scale(src[i], dst[i] + 1),
            3 => scale(src[i], da + 1),
            4 => src[i],
            5 => scale(src[i], 0x100 - sa),
            6 => scale(src[i], 0x100 - dst[i]),
            7 => scale(src[i], 0x100 - da),
            15 => scale(src[i], sa.min(0x100 - da) + 1),
            _ => 0,
        };
        out[i] += match mode.dst_rgb_blend() {
            1 => scale(dst[i], sa + 1),
            2 => scale(dst[i], src[i] + 1),
            3 => scale(dst[i], da + 1),
            4 => dst[i],
            5 => scale(dst[i], 0x100 - sa),
            6 => scale(dst[i], 0x100 - src[i]),
            7 => scale(dst[i], 0x100 - da),
            15 => scale(dst[i], prefog[i] + 1),
            _ => 0,
        };
    }

    let mut a = 0;
    if mode.src_alpha_blend() == 4 {
        a = sa;
    }
    if mode.dst_alpha_blend() == 4 {
        a += da;
    }

    color.r = clamp_u8(out[0]);
    color.g = clamp_u8(out[1]);
    color.b = clamp_u8(out[2]);
    color.a = clamp_u8(a);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regs_with_fbz(fbz: u32) -> PixelRegs {
        PixelRegs {
            fbz_mode: FbzMode(fbz),
            ..PixelRegs::default()
        }
    }

    #[test]
    fn depth_functions_cover_all_operators() {
        let mut stats = PixelStats::default();
        let depth = DepthValues::unbiased(0x100);
        for (function, expected) in [
            (0, false),
            (1, false),
            (2, false),
            (3, false),
            (4, true),
            (5, true),
            (6, true),
            (7, true),
        ] {
            let regs = regs_with_fbz((1 << 4) | (function << 5));
            assert_eq!(depth_test(&mut stats, &regs, &depth, Some(0x80)), expected, "function {function}");
        }
        assert_eq!(stats.zfunc_fail, 4);
    }

    #[test]
    fn depth_test_without_aux_passes() {
        let mut stats = PixelStats::default();
        let regs = regs_with_fbz(1 << 4);
        assert!(depth_test(&mut stats, &regs, &DepthValues::unbiased(0), None));
        assert_eq!(stats.zfunc_fail, 0);
    }

    #[test]
    fn constant_depth_source_uses_za_color() {
        let mut stats = PixelStats::default();
        let mut regs = regs_with_fbz((1 << 4) | (2 << 5) | (1 << 20));
        regs.za_color = 0xff00_1234;
        assert!(depth_test(&mut stats, &regs, &DepthValues::unbiased(0), Some(0x1234)));
    }

    #[test]
    fn depth_bias_clamps() {
        let mut regs = regs_with_fbz(1 << 16);
        regs.za_color = 0xffff; // -1
        regs.fbz_color_path = FbzColorPath(1 << 28);
        let d = DepthValues::compute(&regs, 0, 0);
        assert_eq!(d.biasdepth, 0);
    }

    #[test]
    fn stipple_rotate_mutates_register() {
        let mut stats = PixelStats::default();
        let mode = FbzMode(1 << 2);
        let mut stipple = 0x4000_0000;
        assert!(stipple_test(&mut stipple, mode, 0, 0, &mut stats));
        assert_eq!(stipple, 0x8000_0000);
        assert!(!stipple_test(&mut stipple, mode, 1, 0, &mut stats));
        assert_eq!(stipple, 0x0000_0001);
        assert_eq!(stats.stipple_count, 1);
    }

    #[test]
    fn stipple_pattern_indexes_by_position() {
        let mut stats = PixelStats::default();
        let mode = FbzMode((1 << 2) | (1 << 12));
        // Row 1, column 0 selects bit (1 << 3) | 7 = 15.
        let mut stipple = 1 << 15;
        assert!(stipple_test(&mut stipple, mode, 0, 1, &mut stats));
        assert!(!stipple_test(&mut stipple, mode, 1, 1, &mut stats));
        assert_eq!(stipple, 1 << 15);
    }

    #[test]
    fn chroma_key_exact_and_range() {
        let mut stats = PixelStats::default();
        let mut regs = regs_with_fbz(1 << 1);
        regs.chroma_key = Argb(0x00ff_00ff);
        assert!(!chroma_key_test(&mut stats, &regs, Argb(0x12ff_00ff)));
        assert!(chroma_key_test(&mut stats, &regs, Argb(0x00ff_00fe)));

        // Range mode, intersection: every channel inside its range rejects.
        regs.chroma_key = Argb(0x0010_1010);
        regs.chroma_range = ChromaRange((1 << 28) | 0x0020_2020);
        assert!(!chroma_key_test(&mut stats, &regs, Argb(0x0018_1818)));
        assert!(chroma_key_test(&mut stats, &regs, Argb(0x0018_1830)));

        // Union mode: any channel inside rejects.
        regs.chroma_range = ChromaRange((1 << 28) | (1 << 27) | 0x0020_2020);
        assert!(!chroma_key_test(&mut stats, &regs, Argb(0x0018_3030)));
        assert_eq!(stats.chroma_fail, 3);
    }

    #[test]
    fn alpha_test_uses_reference_byte() {
        let mut stats = PixelStats::default();
        let regs = PixelRegs {
            alpha_mode: AlphaMode(1 | (4 << 1) | (0x80 << 24)),
            ..PixelRegs::default()
        };
        assert!(alpha_test(&mut stats, &regs, 0x81));
        assert!(!alpha_test(&mut stats, &regs, 0x80));
        assert_eq!(stats.afunc_fail, 1);
    }

    #[test]
    fn combine_passes_other_through_by_default() {
        // zero_other clear, no subtract, factor 0 reversed to 0xff: v * 256 >> 8 == v.
        let op = CombineOp {
            zero_other: false,
            sub_clocal: false,
            reverse_blend: false,
            invert_output: false,
        };
        assert_eq!(op.apply(0x7f, 0x10, 0, 0), 0x7f);
        let invert = CombineOp {
            invert_output: true,
            ..op
        };
        assert_eq!(invert.apply(0x7f, 0x10, 0, 0), 0x80);
        let sub = CombineOp { sub_clocal: true, ..op };
        assert_eq!(sub.apply(0x10, 0x20, 0, 0), 0);
        assert_eq!(sub.apply(0x10, 0x20, 0, 0x300), 0xff);
    }

    #[test]
    fn fog_table_packs_pairs() {
        let mut fog = FogTable::new(false);
        fog.write(3, 0x4433_2211);
        assert_eq!((fog.delta[6], fog.blend[6], fog.delta[7], fog.blend[7]), (0x11, 0x22, 0x33, 0x44));
        assert_eq!(fog.read(3), 0x4433_2211);
    }

    #[test]
    fn constant_fog_replaces_color_when_multiplied() {
        let mut ram = vec![0u8; 64];
        let mut target = RowTarget::new(&mut ram, Some(0), None);
        let regs = PixelRegs {
            fbz_mode: FbzMode(1 << 9),
            fog_mode: FogMode(1 | (1 << 2) | (1 << 5)),
            fog_color: Argb(0x00f8_0000),
            ..PixelRegs::default()
        };
        let mut stats = PixelStats::default();
        output_pixel(
            &mut target,
            &FogTable::new(false),
            &regs,
            None,
            2,
            PixelColor { r: 0, g: 0xff, b: 0, a: 0 },
            &DepthValues::unbiased(0),
            0,
            0,
            0,
            &mut stats,
        );
        assert_eq!(target.color(2), 0xf800);
        assert_eq!(stats.pixels_out, 1);
    }

    #[test]
    fn additive_blend_saturates() {
        let mut ram = vec![0u8; 64];
        let mut target = RowTarget::new(&mut ram, Some(0), None);
        target.set_color(0, 0x8000);
        let regs = PixelRegs {
            fbz_mode: FbzMode(1 << 9),
            // src ONE, dst ONE.
            alpha_mode: AlphaMode((1 << 4) | (4 << 8) | (4 << 12)),
            ..PixelRegs::default()
        };
        let mut stats = PixelStats::default();
        output_pixel(
            &mut target,
            &FogTable::new(false),
            &regs,
            None,
            0,
            PixelColor { r: 0xc0, g: 0, b: 0, a: 0xff },
            &DepthValues::unbiased(0),
            0,
            0,
            0,
            &mut stats,
        );
        assert_eq!(target.color(0) >> 11, 0x1f);
    }

    #[test]
    fn aux_write_selects_alpha_or_depth() {
        let mut ram = vec![0u8; 64];
        let mut target = RowTarget::new(&mut ram, Some(0), Some(32));
        let mut regs = PixelRegs {
            fbz_mode: FbzMode(1 << 10),
            ..PixelRegs::default()
        };
        let mut stats = PixelStats::default();
        let color = PixelColor { r: 0, g: 0, b: 0, a: 0x42 };
        let depth = DepthValues::unbiased(0x1234);
        output_pixel(&mut target, &FogTable::new(false), &regs, None, 1, color, &depth, 0, 0, 0, &mut stats);
        assert_eq!(target.aux(1), Some(0x1234));

        regs.fbz_mode = FbzMode((1 << 10) | (1 << 18));
        output_pixel(&mut target, &FogTable::new(false), &regs, None, 1, color, &depth, 0, 0, 0, &mut stats);
        assert_eq!(target.aux(1), Some(0x42));
    }
}
