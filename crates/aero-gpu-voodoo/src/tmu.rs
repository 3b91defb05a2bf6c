//! Texture mapping unit: texture RAM, NCC/palette tables, LOD setup and per-pixel sampling.

use crate::math::{fast_reciplog, rgba_bilinear_filter, Argb, Gradient};
use crate::pipeline::CombineOp;
use crate::regs::{self, TexDetail, TexLod, TextureMode, REG_BANK_LEN};
use crate::tables::tables;

/// One of the two YIQ decompression tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NccTable {
    regs: [u32; 12],
    y: [i32; 16],
    ir: [i32; 4],
    ig: [i32; 4],
    ib: [i32; 4],
    qr: [i32; 4],
    qg: [i32; 4],
    qb: [i32; 4],
    texel: [u32; 256],
    dirty: bool,
}

impl Default for NccTable {
    fn default() -> Self {
        Self {
            regs: [0; 12],
            y: [0; 16],
            ir: [0; 4],
            ig: [0; 4],
            ib: [0; 4],
            qr: [0; 4],
            qg: [0; 4],
            qb: [0; 4],
            texel: [0; 256],
            dirty: true,
        }
    }
}

/// Sign-extended 9-bit R, G and B components of an I or Q entry.
#[inline]
fn iq_components(data: u32) -> (i32, i32, i32) {
    (
        ((data << 5) as i32) >> 23,
        ((data << 14) as i32) >> 23,
        ((data << 23) as i32) >> 23,
    )
}

impl NccTable {
    /// Source registers, as last written through the coefficient path.
    pub fn regs(&self) -> &[u32; 12] {
        &self.regs
    }

    /// Store coefficient register `regnum` (0..12). Unchanged values leave the table clean.
    fn write(&mut self, regnum: usize, data: u32) {
        if self.regs[regnum] == data {
            return;
        }
        self.regs[regnum] = data;
        self.decode(regnum);
        self.dirty = true;
    }

    fn decode(&mut self, regnum: usize) {
        let data = self.regs[regnum];
        match regnum {
            0..=3 => {
                let base = regnum * 4;
                for (i, y) in self.y[base..base + 4].iter_mut().enumerate() {
                    *y = ((data >> (8 * i)) & 0xff) as i32;
                }
            }
            4..=7 => {
                let i = regnum & 3;
                (self.ir[i], self.ig[i], self.ib[i]) = iq_components(data);
            }
            _ => {
                let i = regnum & 3;
                (self.qr[i], self.qg[i], self.qb[i]) = iq_components(data);
            }
        }
    }

    /// Reload every source register, e.g. after restoring a snapshot.
    pub(crate) fn load(&mut self, regs: &[u32; 12]) {
        self.regs = *regs;
        for regnum in 0..12 {
            self.decode(regnum);
        }
        self.dirty = true;
    }

    /// Regenerate the 256-entry lookup from the current coefficients.
    fn update(&mut self) {
        for (i, texel) in self.texel.iter_mut().enumerate() {
            let vi = (i >> 2) & 3;
            let vq = i & 3;
            let y = self.y[(i >> 4) & 0xf];
            let r = (y + self.ir[vi] + self.qr[vq]).clamp(0, 0xff);
            let g = (y + self.ig[vi] + self.qg[vq]).clamp(0, 0xff);
            let b = (y + self.ib[vi] + self.qb[vq]).clamp(0, 0xff);
            *texel = Argb::new(0xff, r as u8, g as u8, b as u8).0;
        }
        self.dirty = false;
    }
}

/// Which 256/65536-entry table decodes texels of the current format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexelLookup {
    Rgb332,
    Ncc(usize),
    Alpha8,
    Int8,
    Ai44,
    Palette,
    PaletteAlpha,
    Rgb565,
    Argb1555,
    Argb4444,
    Empty,
}

impl TexelLookup {
    /// Formats 8..16 are 16-bit; except 10..=12 they decode the low byte like their 8-bit
    /// counterpart and take alpha from the high byte.
    pub fn for_format(format: u32, ncc_select: usize, voodoo2: bool) -> Self {
        match format {
            0 | 8 => Self::Rgb332,
            1 | 9 => Self::Ncc(ncc_select),
            2 => Self::Alpha8,
            3 | 13 => Self::Int8,
            4 => Self::Ai44,
            5 | 14 => Self::Palette,
            6 if voodoo2 => Self::PaletteAlpha,
            10 => Self::Rgb565,
            11 => Self::Argb1555,
            12 => Self::Argb4444,
            _ => Self::Empty,
        }
    }
}

/// Interpolated S, T and W of one pixel, 64-bit fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TexCoord {
    pub s: i64,
    pub t: i64,
    pub w: i64,
}

/// Texture unit state.
pub struct Tmu {
    index: usize,
    voodoo2: bool,
    pub(crate) ram: Vec<u8>,
    mask: u32,
    pub(crate) reg_dirty: bool,

    pub s: Gradient<i64>,
    pub t: Gradient<i64>,
    pub w: Gradient<i64>,

    lodmin: i32,
    lodmax: i32,
    lodbias: i32,
    lodmask: u32,
    lodoffset: [u32; 9],
    wmask: u32,
    hmask: u32,
    detailmax: i32,
    detailbias: i32,
    detailscale: u32,
    bilinear_mask: i32,

    pub(crate) ncc: [NccTable; 2],
    pub(crate) palette: Box<[u32; 256]>,
    pub(crate) palette_alpha: Option<Box<[u32; 256]>>,
    lookup: TexelLookup,
    separate_filter_warned: bool,
}

impl Tmu {
    /// TMU `index` (0 or 1) with `mem_bytes` of texture RAM; the size must be a power of two.
    pub fn new(index: usize, voodoo2: bool, mem_bytes: usize) -> Self {
        Self {
            index,
            voodoo2,
            ram: vec![0; mem_bytes],
            mask: (mem_bytes as u32).wrapping_sub(1),
            reg_dirty: true,
            s: Gradient::default(),
            t: Gradient::default(),
            w: Gradient::default(),
            lodmin: 0,
            lodmax: 0,
            lodbias: 0,
            lodmask: 0x1ff,
            lodoffset: [0; 9],
            wmask: 0xff,
            hmask: 0xff,
            detailmax: 0,
            detailbias: 0,
            detailscale: 0,
            bilinear_mask: if voodoo2 { 0xff } else { 0xf0 },
            ncc: [NccTable::default(), NccTable::default()],
            palette: Box::new([0; 256]),
            palette_alpha: voodoo2.then(|| Box::new([0; 256])),
            lookup: TexelLookup::Rgb332,
            separate_filter_warned: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// First register-file index of this unit's bank.
    pub fn bank_base(&self) -> usize {
        REG_BANK_LEN * (self.index + 1)
    }

    /// This unit's register bank within the full register file.
    pub fn bank<'r>(&self, regs: &'r [u32]) -> &'r [u32] {
        &regs[self.bank_base()..self.bank_base() + REG_BANK_LEN]
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// A unit whose minimum LOD is 8 is treated as disabled by the scanline routine.
    pub fn is_disabled(&self) -> bool {
        self.lodmin >= 8 << 8
    }

    pub fn lookup(&self) -> TexelLookup {
        self.lookup
    }

    /// Recompute the derived LOD, size, offset and detail fields from the texture registers.
    pub fn recompute_params(&mut self, bank: &[u32]) {
        let tlod = TexLod(bank[regs::T_LOD]);
        let mode = TextureMode(bank[regs::TEXTURE_MODE]);
        let detail = TexDetail(bank[regs::T_DETAIL]);

        self.lodmin = (tlod.lodmin() as i32) << 6;
        self.lodmax = (tlod.lodmax() as i32) << 6;
        self.lodbias = ((((tlod.lodbias() << 2) as u8) as i8) as i32) << 4;

        self.lodmask = match (tlod.lod_tsplit(), tlod.lod_odd()) {
            (false, _) => 0x1ff,
            (true, false) => 0x155,
            (true, true) => 0x0aa,
        };

        self.wmask = 0xff;
        self.hmask = 0xff;
        if tlod.lod_s_is_wider() {
            self.hmask >>= tlod.lod_aspect();
        } else {
            self.wmask >>= tlod.lod_aspect();
        }

        // Multi-base addressing is left off: software routinely leaves the bit set in tLOD
        // without programming the extra base registers, so every level is laid out
        // sequentially from texBaseAddr.
        let bppscale = mode.format() >> 3;
        let mut base = (bank[regs::TEX_BASE_ADDR] & 0x0f_ffff) << 3;
        self.lodoffset[0] = base & self.mask;
        for lod in 1..=8u32 {
            if self.lodmask & (1 << (lod - 1)) != 0 {
                let mut size = ((self.wmask >> (lod - 1)) + 1) * ((self.hmask >> (lod - 1)) + 1);
                if lod >= 4 {
                    size = size.max(4);
                }
                base = base.wrapping_add(size << bppscale);
            }
            self.lodoffset[lod as usize] = base & self.mask;
        }

        self.lookup = TexelLookup::for_format(
            mode.format(),
            mode.ncc_table_select() as usize,
            self.voodoo2,
        );

        self.detailmax = detail.detail_max() as i32;
        self.detailbias = ((((detail.detail_bias() << 2) as u8) as i8) as i32) << 6;
        self.detailscale = detail.detail_scale();

        self.reg_dirty = false;

        if detail.separate_rgba_filter() && !self.separate_filter_warned {
            self.separate_filter_warned = true;
            tracing::warn!(tmu = self.index, "separate RGBA detail filters are not supported");
        }
    }

    /// Per-triangle preparation: refresh derived state and compute the base LOD from the
    /// larger of the X and Y texel footprints.
    pub fn prepare(&mut self, bank: &[u32]) -> i32 {
        if self.reg_dirty {
            self.recompute_params(bank);
        }

        let mode = TextureMode(bank[regs::TEXTURE_MODE]);
        if mode.format() & 7 == 1 {
            let table = &mut self.ncc[mode.ncc_table_select() as usize];
            if table.dirty {
                table.update();
            }
        }

        let footprint = |ds: i64, dt: i64| {
            let (ds, dt) = (ds >> 14, dt >> 14);
            ds.wrapping_mul(ds).wrapping_add(dt.wrapping_mul(dt))
        };
        let texdx = footprint(self.s.dx, self.t.dx);
        let texdy = footprint(self.s.dy, self.t.dy);
        let texd = texdx.max(texdy) >> 16;

        let (_, log) = fast_reciplog(texd);
        (-log + (12 << 8)) / 2
    }

    /// The decode table currently selected by `textureMode`.
    pub fn lookup_table(&self) -> &[u32] {
        let t = tables();
        match self.lookup {
            TexelLookup::Rgb332 => &t.rgb332[..],
            TexelLookup::Ncc(i) => &self.ncc[i].texel[..],
            TexelLookup::Alpha8 => &t.alpha8[..],
            TexelLookup::Int8 => &t.int8[..],
            TexelLookup::Ai44 => &t.ai44[..],
            TexelLookup::Palette => &self.palette[..],
            TexelLookup::PaletteAlpha => match &self.palette_alpha {
                Some(p) => &p[..],
                None => &t.empty[..],
            },
            TexelLookup::Rgb565 => &t.rgb565[..],
            TexelLookup::Argb1555 => &t.argb1555[..],
            TexelLookup::Argb4444 => &t.argb4444[..],
            TexelLookup::Empty => &t.empty[..],
        }
    }

    #[inline]
    fn texel8(&self, addr: u32) -> u32 {
        u32::from(self.ram[(addr & self.mask) as usize])
    }

    #[inline]
    fn texel16(&self, addr: u32) -> u32 {
        let lo = self.ram[(addr & self.mask) as usize];
        let hi = self.ram[(addr.wrapping_add(1) & self.mask) as usize];
        u32::from(u16::from_le_bytes([lo, hi]))
    }

    /// Fetch and decode the texel at integer coordinates `(s, t_row)` where `t_row` is
    /// already multiplied by the row width.
    #[inline]
    fn fetch(&self, format: u32, lookup: &[u32], texbase: u32, s: i32, t_row: i32) -> u32 {
        let index = (t_row as u32).wrapping_add(s as u32);
        if format < 8 {
            lookup[self.texel8(texbase.wrapping_add(index)) as usize]
        } else {
            let texel = self.texel16(texbase.wrapping_add(index.wrapping_mul(2)));
            if (10..=12).contains(&format) {
                lookup[texel as usize]
            } else {
                (lookup[(texel & 0xff) as usize] & 0x00ff_ffff) | ((texel & 0xff00) << 16)
            }
        }
    }

    /// Sample the texture at `coord` and run the texture combine against `c_other` (the
    /// upstream unit's output, or zero for the last unit in the chain).
    #[allow(clippy::too_many_arguments)]
    pub fn sample(
        &self,
        mode: TextureMode,
        lookup: &[u32],
        dither4: Option<&[u8]>,
        x: i32,
        c_other: Argb,
        lodbase: i32,
        coord: TexCoord,
    ) -> Argb {
        let (mut s, mut t) = if mode.enable_perspective() {
            let (oow, _) = fast_reciplog(coord.w);
            (
                (oow.wrapping_mul(coord.s) >> 29) as i32,
                (oow.wrapping_mul(coord.t) >> 29) as i32,
            )
        } else {
            ((coord.s >> 14) as i32, (coord.t >> 14) as i32)
        };

        if mode.clamp_neg_w() && coord.w < 0 {
            s = 0;
            t = 0;
        }

        let mut lod = lodbase + self.lodbias;
        if mode.enable_lod_dither() {
            if let Some(d) = dither4 {
                lod += i32::from(d[(x & 3) as usize]) << 4;
            }
        }
        if lod < self.lodmin {
            lod = self.lodmin;
        }
        if lod > self.lodmax {
            lod = self.lodmax;
        }

        let mut ilod = (lod >> 8) as u32;
        if (self.lodmask >> ilod) & 1 == 0 {
            ilod += 1;
        }
        let ilod = ilod.min(8);

        let texbase = self.lodoffset[ilod as usize];
        let smax = (self.wmask >> ilod) as i32;
        let tmax = (self.hmask >> ilod) as i32;
        let format = mode.format();

        let point_sampled = if lod == self.lodmin {
            !mode.magnification_filter()
        } else {
            !mode.minification_filter()
        };

        let c_local = if point_sampled {
            s >>= ilod + 18;
            t >>= ilod + 18;
            if mode.clamp_s() {
                s = s.clamp(0, smax);
            }
            if mode.clamp_t() {
                t = t.clamp(0, tmax);
            }
            s &= smax;
            t &= tmax;
            Argb(self.fetch(format, lookup, texbase, s, t * (smax + 1)))
        } else {
            s = (s >> (ilod + 10)) - 0x80;
            t = (t >> (ilod + 10)) - 0x80;
            let sfrac = (s & self.bilinear_mask) as u8;
            let tfrac = (t & self.bilinear_mask) as u8;
            s >>= 8;
            t >>= 8;
            let (mut s1, mut t1) = (s + 1, t + 1);
            if mode.clamp_s() {
                s = s.clamp(0, smax);
                s1 = s1.clamp(0, smax);
            }
            if mode.clamp_t() {
                t = t.clamp(0, tmax);
                t1 = t1.clamp(0, tmax);
            }
            s &= smax;
            s1 &= smax;
            let t = (t & tmax) * (smax + 1);
            let t1 = (t1 & tmax) * (smax + 1);

            let c00 = self.fetch(format, lookup, texbase, s, t);
            let c01 = self.fetch(format, lookup, texbase, s1, t);
            let c10 = self.fetch(format, lookup, texbase, s, t1);
            let c11 = self.fetch(format, lookup, texbase, s1, t1);
            Argb(rgba_bilinear_filter(c00, c01, c10, c11, sfrac, tfrac))
        };

        self.combine(mode, c_local, c_other, lod)
    }

    fn detail_factor(&self, lod: i32) -> i32 {
        if self.detailbias <= lod {
            0
        } else {
            (((self.detailbias - lod) << self.detailscale) >> 8).min(self.detailmax)
        }
    }

    fn combine(&self, mode: TextureMode, c_local: Argb, c_other: Argb, lod: i32) -> Argb {
        let local = [c_local.r(), c_local.g(), c_local.b()].map(i32::from);
        let other = [c_other.r(), c_other.g(), c_other.b()].map(i32::from);
        let local_a = i32::from(c_local.a());
        let other_a = i32::from(c_other.a());

        let rgb_op = CombineOp::texture_rgb(mode);
        let mut rgb = [0i32; 3];
        for (i, out) in rgb.iter_mut().enumerate() {
            let factor = match mode.tc_mselect() {
                1 => local[i],
                2 => other_a,
                3 => local_a,
                4 => self.detail_factor(lod),
                5 => lod & 0xff,
                _ => 0,
            };
            let add = match mode.tc_add_aclocal() {
                1 => local[i],
                2 => local_a,
                _ => 0,
            };
            *out = rgb_op.apply(other[i], local[i], factor, add);
        }

        let factor = match mode.tca_mselect() {
            1 | 3 => local_a,
            2 => other_a,
            4 => self.detail_factor(lod),
            5 => lod & 0xff,
            _ => 0,
        };
        let add = if mode.tca_add_aclocal() != 0 { local_a } else { 0 };
        let a = CombineOp::texture_alpha(mode).apply(other_a, local_a, factor, add);

        Argb::new(a as u8, rgb[0] as u8, rgb[1] as u8, rgb[2] as u8)
    }

    /// Write NCC table `table` register `regnum` (0..12).
    ///
    /// I/Q writes with bit 31 set load a palette entry instead; only table 0 carries the
    /// palette, and a palette load neither dirties the table nor reaches its registers.
    pub fn write_ncc(&mut self, table: usize, regnum: usize, data: u32) {
        if regnum >= 4 && data & 0x8000_0000 != 0 && table == 0 {
            let index = (((data >> 23) & 0xfe) | (regnum as u32 & 1)) as usize;
            self.palette[index] = 0xff00_0000 | data;
            if let Some(palette_alpha) = self.palette_alpha.as_deref_mut() {
                let a = ((data >> 16) & 0xfc) | ((data >> 22) & 3);
                let r = ((data >> 10) & 0xfc) | ((data >> 16) & 3);
                let g = ((data >> 4) & 0xfc) | ((data >> 10) & 3);
                let b = ((data << 2) & 0xfc) | ((data >> 4) & 3);
                palette_alpha[index] = Argb::new(a as u8, r as u8, g as u8, b as u8).0;
            }
            return;
        }
        self.ncc[table].write(regnum, data);
    }

    /// Store one 32-bit word of texture data. `offset` is the word offset within the texture
    /// aperture; `seq_8_download` comes from TMU0's `textureMode` regardless of the target unit.
    pub fn write_texture(&mut self, bank: &[u32], offset: u32, data: u32, seq_8_download: bool) {
        let tlod = TexLod(bank[regs::T_LOD]);
        if tlod.tdirect_write() {
            tracing::warn!(tmu = self.index, offset, "texture direct write is not supported");
            return;
        }

        if self.reg_dirty {
            self.recompute_params(bank);
        }

        let mut data = data;
        if tlod.tdata_swizzle() {
            data = data.swap_bytes();
        }
        if tlod.tdata_swap() {
            data = data.rotate_left(16);
        }

        let lod = (offset >> 15) & 0xf;
        if lod > 8 {
            return;
        }
        let tt = (offset >> 7) & 0xff;
        let row = tt.wrapping_mul((self.wmask >> lod) + 1);
        let base = self.lodoffset[lod as usize];

        if TextureMode(bank[regs::TEXTURE_MODE]).format() < 8 {
            let ts = if seq_8_download {
                (offset << 2) & 0xfc
            } else {
                (offset << 1) & 0xfc
            };
            let addr = base.wrapping_add(row).wrapping_add(ts);
            for (i, byte) in data.to_le_bytes().into_iter().enumerate() {
                self.ram[(addr.wrapping_add(i as u32) & self.mask) as usize] = byte;
            }
        } else {
            let ts = (offset << 1) & 0xfe;
            let addr = base.wrapping_add(row.wrapping_add(ts).wrapping_mul(2)) & self.mask & !1;
            for (i, byte) in data.to_le_bytes().into_iter().enumerate() {
                self.ram[(addr.wrapping_add(i as u32) & self.mask) as usize] = byte;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bank() -> Vec<u32> {
        vec![0; REG_BANK_LEN]
    }

    #[test]
    fn lod_offsets_follow_level_sizes() {
        let mut tmu = Tmu::new(0, false, 2 << 20);
        let mut bank = bank();
        // 16-bit RGB565, LODs 0..8, base at 0x1000 bytes.
        bank[regs::TEXTURE_MODE] = 10 << 8;
        bank[regs::T_LOD] = 8 << 8; // lodmax = 8.0
        bank[regs::TEX_BASE_ADDR] = 0x1000 >> 3;
        tmu.recompute_params(&bank);

        assert_eq!(tmu.lodoffset[0], 0x1000);
        assert_eq!(tmu.lodoffset[1], 0x1000 + 256 * 256 * 2);
        assert_eq!(tmu.lodoffset[2], tmu.lodoffset[1] + 128 * 128 * 2);
        // Level 7 is 2x2 texels but still occupies the 4-texel minimum.
        assert_eq!(tmu.lodoffset[8], tmu.lodoffset[7] + 4 * 2);
        assert_eq!(tmu.lookup(), TexelLookup::Rgb565);
        assert!(!tmu.reg_dirty);
    }

    #[test]
    fn aspect_ratio_narrows_one_axis() {
        let mut tmu = Tmu::new(0, false, 2 << 20);
        let mut bank = bank();
        bank[regs::T_LOD] = (1 << 20) | (2 << 21);
        tmu.recompute_params(&bank);
        assert_eq!((tmu.wmask, tmu.hmask), (0xff, 0x3f));
    }

    #[test]
    fn ncc_palette_load_bypasses_coefficients() {
        let mut tmu = Tmu::new(0, true, 2 << 20);
        tmu.write_ncc(0, 5, 0x8300_00ff);
        assert_eq!(tmu.palette[7], 0xff00_00ff);
        assert_eq!(tmu.palette_alpha.as_ref().map(|p| p[7]), Some(Argb::new(0, 0, 0x0c, 0xff).0));
        assert_eq!(tmu.ncc[0].regs()[5], 0);

        // Table 1 has no palette: the same write changes its coefficients.
        tmu.write_ncc(1, 5, 0x8300_00ff);
        assert_eq!(tmu.ncc[1].regs()[5], 0x8300_00ff);
    }

    #[test]
    fn ncc_lookup_regenerates_lazily() {
        let mut tmu = Tmu::new(0, false, 2 << 20);
        let mut bank = bank();
        bank[regs::TEXTURE_MODE] = 1 << 8;
        tmu.write_ncc(0, 0, 0x4030_2010);
        // I0 = (+1, -1, 0) in the 9-bit packed layout.
        tmu.write_ncc(0, 4, (1 << 18) | (0x1ff << 9));
        tmu.prepare(&bank);

        let table = tmu.lookup_table();
        assert_eq!(table[0x10], Argb::new(0xff, 0x21, 0x1f, 0x20).0);
        assert_eq!(table[0x30], Argb::new(0xff, 0x41, 0x3f, 0x40).0);
        assert!(!tmu.ncc[0].dirty);
    }

    #[test]
    fn point_sample_reads_written_texel() {
        let mut tmu = Tmu::new(0, false, 2 << 20);
        let mut bank = bank();
        // RGB332, point sampled; the combine passes c_local through via add_aclocal.
        bank[regs::TEXTURE_MODE] = (1 << 18) | (1 << 27);
        tmu.recompute_params(&bank);

        // Row 2, texels 0..4 of LOD 0; texel 3 is pure red.
        tmu.write_texture(&bank, 2 << 7, 0xe000_0000, false);
        let lookup = tmu.lookup_table().to_vec();
        let mode = TextureMode(bank[regs::TEXTURE_MODE]);
        let coord = TexCoord {
            s: 3 << 32,
            t: 2 << 32,
            w: 0,
        };
        let texel = tmu.sample(mode, &lookup, None, 0, Argb(0), 0, coord);
        assert_eq!(texel, Argb(0xffff_0000));

        let black = TexCoord { s: 2 << 32, ..coord };
        assert_eq!(tmu.sample(mode, &lookup, None, 0, Argb(0), 0, black), Argb(0xff00_0000));
    }

    #[test]
    fn sixteen_bit_writes_store_two_texels() {
        let mut tmu = Tmu::new(1, true, 2 << 20);
        let mut bank = bank();
        bank[regs::TEXTURE_MODE] = 10 << 8;
        tmu.write_texture(&bank, (1 << 7) | 2, 0xbbbb_aaaa, false);
        // Row 1 is 256 texels wide; ts = 4.
        let addr = (256 + 4) * 2;
        assert_eq!(&tmu.ram()[addr..addr + 4], &[0xaa, 0xaa, 0xbb, 0xbb]);
        assert_eq!(tmu.bank_base(), 0x200);
    }

    #[test]
    fn lod_beyond_last_level_is_clamped() {
        let mut tmu = Tmu::new(0, false, 2 << 20);
        let mut bank = bank();
        // lodmin = lodmax = 8.0 with odd levels only: the next level would be 9.
        bank[regs::T_LOD] = 32 | (32 << 6) | (1 << 19) | (1 << 18);
        tmu.recompute_params(&bank);
        assert!(tmu.is_disabled());
        let mode = TextureMode(0);
        let lookup = tmu.lookup_table().to_vec();
        let _ = tmu.sample(mode, &lookup, None, 0, Argb(0), 0, TexCoord::default());
    }
}
