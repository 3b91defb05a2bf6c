//! Rasterizer specialization cache and the generic scanline routine.
//!
//! Render state is normalized (bits that cannot change the per-pixel work are cleared) and used
//! as the key of a small chained hash table. Every entry currently points at the generic routine
//! for its texture count; the entry carries the routine so specialized variants can be plugged in
//! without changing the lookup.

use crate::error::{Result, VoodooError};
use crate::math::{clamped_argb, clamped_w, clamped_z, Argb};
use crate::pipeline::{
    alpha_mask_test, alpha_test, chroma_key_test, depth_test, output_pixel, stipple_test,
    CombineOp, DepthValues, FogTable, PixelColor, RowTarget,
};
use crate::regs::{AlphaMode, FbzColorPath, FbzMode, FogMode, TextureMode};
use crate::stats::PixelStats;
use crate::tables::DitherRow;
use crate::tmu::{TexCoord, Tmu};
use crate::triangle::TriangleWorkItem;

pub const RASTER_HASH_SIZE: usize = 97;
pub const MAX_RASTERIZERS: usize = 1024;

/// Render state with the don't-care bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterParams {
    pub color_path: u32,
    pub alpha_mode: u32,
    pub fog_mode: u32,
    pub fbz_mode: u32,
    pub tex_mode0: u32,
    pub tex_mode1: u32,
}

fn normalize_tex_mode(mode: u32) -> u32 {
    let mode = mode & !((1 << 5) | (1 << 31));
    let class = match TextureMode(mode).format() {
        0..=7 => 0,
        10..=12 => 10,
        _ => 8,
    };
    (mode & !(0xf << 8)) | (class << 8)
}

impl RasterParams {
    /// Normalize the raw registers. `tex_modes[i]` is `None` for a TMU the primitive does not use.
    pub fn normalize(
        color_path: FbzColorPath,
        alpha_mode: AlphaMode,
        fog_mode: FogMode,
        fbz_mode: FbzMode,
        tex_modes: [Option<TextureMode>; 2],
    ) -> Self {
        let color_path = color_path.0 & !((1 << 26) | (1 << 27));

        let mut alpha = alpha_mode.0 & !(0xff << 24);
        if !alpha_mode.alpha_test() {
            alpha &= !(7 << 1);
        }
        if !alpha_mode.alpha_blend() {
            alpha &= !((15 << 8) | (15 << 12) | (15 << 16) | (15 << 20));
        }

        let fog = if fog_mode.enable_fog() { fog_mode.0 } else { 0 };
        let fbz = fbz_mode.0 & !(3 << 14);

        let tex = |m: Option<TextureMode>| m.map_or(0xffff_ffff, |m| normalize_tex_mode(m.0));

        Self {
            color_path,
            alpha_mode: alpha,
            fog_mode: fog,
            fbz_mode: fbz,
            tex_mode0: tex(tex_modes[0]),
            tex_mode1: tex(tex_modes[1]),
        }
    }

    /// Bucket index: rotate-xor over the six words.
    pub fn hash(&self) -> usize {
        let mut hash = self.color_path;
        for word in [
            self.fbz_mode,
            self.alpha_mode,
            self.fog_mode,
            self.tex_mode0,
            self.tex_mode1,
        ] {
            hash = hash.rotate_left(1) ^ word;
        }
        hash as usize % RASTER_HASH_SIZE
    }
}

/// Per-scanline rasterization routine: `(context, y, startx, stopx)`.
pub type ScanlineFn = fn(&mut ScanlineContext<'_>, i32, i32, i32);

/// Generic routine for a texture count.
pub fn generic_routine(texcount: usize) -> ScanlineFn {
    match texcount {
        0 => raster_generic::<0>,
        1 => raster_generic::<1>,
        _ => raster_generic::<2>,
    }
}

#[derive(Debug, Clone)]
pub struct RasterEntry {
    pub params: RasterParams,
    pub routine: ScanlineFn,
    pub texcount: usize,
    pub is_generic: bool,
    pub hits: u32,
    pub polys: u32,
    next: Option<usize>,
}

/// Chained hash table of [`RasterEntry`]s.
#[derive(Debug, Clone)]
pub struct RasterCache {
    entries: Vec<RasterEntry>,
    buckets: [Option<usize>; RASTER_HASH_SIZE],
}

impl Default for RasterCache {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            buckets: [None; RASTER_HASH_SIZE],
        }
    }
}

impl RasterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RasterEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> &RasterEntry {
        &self.entries[index]
    }

    pub fn entry_mut(&mut self, index: usize) -> &mut RasterEntry {
        &mut self.entries[index]
    }

    /// Entry indices of bucket `hash`, most recently used first.
    pub fn chain(&self, hash: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = self.buckets[hash];
        while let Some(i) = cur {
            out.push(i);
            cur = self.entries[i].next;
        }
        out
    }

    /// Find the entry for `params`, creating a generic one on a miss.
    pub fn find(&mut self, params: RasterParams, texcount: usize) -> Result<usize> {
        let hash = params.hash();

        let mut prev: Option<usize> = None;
        let mut cur = self.buckets[hash];
        while let Some(i) = cur {
            if self.entries[i].params == params {
                if let Some(p) = prev {
                    self.entries[p].next = self.entries[i].next;
                    self.entries[i].next = self.buckets[hash];
                    self.buckets[hash] = Some(i);
                }
                self.entries[i].hits += 1;
                return Ok(i);
            }
            prev = cur;
            cur = self.entries[i].next;
        }

        if self.entries.len() >= MAX_RASTERIZERS {
            return Err(VoodooError::RasterizerTableFull(MAX_RASTERIZERS));
        }

        let index = self.entries.len();
        self.entries.push(RasterEntry {
            params,
            routine: generic_routine(texcount),
            texcount,
            is_generic: true,
            hits: 0,
            polys: 0,
            next: self.buckets[hash],
        });
        self.buckets[hash] = Some(index);
        tracing::trace!(
            index,
            hash,
            color_path = params.color_path,
            fbz_mode = params.fbz_mode,
            "voodoo: new rasterizer"
        );
        Ok(index)
    }
}

/// Everything a scanline routine touches while drawing one triangle.
pub struct ScanlineContext<'a> {
    pub ram: &'a mut [u8],
    pub fog: &'a FogTable,
    pub tmus: &'a [Tmu],
    pub item: &'a TriangleWorkItem,
    /// Live `stipple` register; rotate mode advances it.
    pub stipple: &'a mut u32,
    pub stats: &'a mut PixelStats,
    /// Byte offset of the draw buffer.
    pub color_base: u32,
    pub aux_base: Option<u32>,
    pub rowpixels: u32,
    pub yorigin: u32,
    pub send_config: bool,
    pub tmu_config: u32,
}

/// The authoritative per-scanline implementation, monomorphized per texture count.
pub fn raster_generic<const TMUS: usize>(
    ctx: &mut ScanlineContext<'_>,
    y: i32,
    startx: i32,
    stopx: i32,
) {
    let item = ctx.item;
    let regs = &item.regs;
    let mode = regs.fbz_mode;
    let cp = regs.fbz_color_path;
    let clamp = regs.clamp_iterators();
    let (mut startx, mut stopx) = (startx, stopx);

    let scry = if mode.y_origin() {
        (ctx.yorigin as i32 - y) & 0x3ff
    } else {
        y
    };

    let dither = DitherRow::new(mode.enable_dithering(), mode.dither_type(), y);
    let dither4 = dither.as_ref().map(|d| d.matrix4);

    if mode.enable_clipping() {
        let clip_y = item.clip_low_y_high_y;
        if scry < ((clip_y >> 16) & 0x3ff) as i32 || scry >= (clip_y & 0x3ff) as i32 {
            ctx.stats.pixels_in += stopx - startx;
            ctx.stats.clip_fail += stopx - startx;
            return;
        }

        let left = ((item.clip_left_right >> 16) & 0x3ff) as i32;
        if startx < left {
            ctx.stats.pixels_in += left - startx;
            startx = left;
        }
        let right = (item.clip_left_right & 0x3ff) as i32;
        if stopx >= right {
            ctx.stats.pixels_in += stopx - right;
            stopx = right - 1;
        }
    }

    let row = (scry as u32).wrapping_mul(ctx.rowpixels).wrapping_mul(2);
    let mut target = RowTarget::new(
        &mut *ctx.ram,
        Some(ctx.color_base.wrapping_add(row)),
        ctx.aux_base.map(|aux| aux.wrapping_add(row)),
    );

    let lookups: [&[u32]; 2] = [
        ctx.tmus.first().map_or(&[][..], |t| t.lookup_table()),
        ctx.tmus.get(1).map_or(&[][..], |t| t.lookup_table()),
    ];

    let dy = y - (i32::from(item.ay) >> 4);

    for x in startx..stopx {
        let dx = x - (i32::from(item.ax) >> 4);
        let iterz = item.z.at(dx, dy);
        let iterw = item.w.at(dx, dy);

        ctx.stats.pixels_in += 1;

        if !stipple_test(ctx.stipple, mode, x, y, ctx.stats) {
            continue;
        }

        let depth = DepthValues::compute(regs, iterz, iterw);
        if !depth_test(ctx.stats, regs, &depth, target.aux(x)) {
            continue;
        }

        let mut texel = Argb(0);
        if TMUS >= 2 && !ctx.tmus[1].is_disabled() {
            let it = &item.tex[1];
            let coord = TexCoord {
                s: it.s.at(dx, dy),
                t: it.t.at(dx, dy),
                w: it.w.at(dx, dy),
            };
            texel = ctx.tmus[1].sample(
                item.texture_mode[1],
                lookups[1],
                dither4,
                x,
                texel,
                it.lodbase,
                coord,
            );
        }
        if TMUS >= 1 && !ctx.tmus[0].is_disabled() {
            if ctx.send_config {
                texel = Argb(ctx.tmu_config);
            } else {
                let it = &item.tex[0];
                let coord = TexCoord {
                    s: it.s.at(dx, dy),
                    t: it.t.at(dx, dy),
                    w: it.w.at(dx, dy),
                };
                texel = ctx.tmus[0].sample(
                    item.texture_mode[0],
                    lookups[0],
                    dither4,
                    x,
                    texel,
                    it.lodbase,
                    coord,
                );
            }
        }

        let iterargb = clamped_argb(
            item.r.at(dx, dy),
            item.g.at(dx, dy),
            item.b.at(dx, dy),
            item.a.at(dx, dy),
            clamp,
        );

        let other_rgb = match cp.cc_rgbselect() {
            0 => iterargb,
            1 => texel,
            2 => regs.color1,
            _ => Argb(0),
        };
        if !chroma_key_test(ctx.stats, regs, other_rgb) {
            continue;
        }

        let other_a = match cp.cc_aselect() {
            0 => iterargb.a(),
            1 => texel.a(),
            2 => regs.color1.a(),
            _ => 0,
        };
        let c_other = other_rgb.with_a(other_a);
        if !alpha_mask_test(ctx.stats, regs, i32::from(other_a)) {
            continue;
        }

        let a_local = match cp.cca_localselect() {
            1 => regs.color0.a(),
            2 => clamped_z(iterz, clamp) as u8,
            3 => clamped_w(iterw, clamp) as u8,
            _ => iterargb.a(),
        };
        let a_local = i32::from(a_local);
        let factor = match cp.cca_mselect() {
            1 | 3 => a_local,
            2 => i32::from(c_other.a()),
            4 => i32::from(texel.a()),
            _ => 0,
        };
        let add = if cp.cca_add_aclocal() != 0 { a_local } else { 0 };
        let a = CombineOp::color_alpha(cp).apply(i32::from(c_other.a()), a_local, factor, add);

        if !alpha_test(ctx.stats, regs, a) {
            continue;
        }

        let use_color0 = if cp.cc_localselect_override() {
            texel.a() & 0x80 != 0
        } else {
            cp.cc_localselect()
        };
        let c_local = if use_color0 { regs.color0 } else { iterargb };

        let local = [c_local.r(), c_local.g(), c_local.b()].map(i32::from);
        let other = [c_other.r(), c_other.g(), c_other.b()].map(i32::from);
        let tex = [texel.r(), texel.g(), texel.b()].map(i32::from);
        let local_a = i32::from(c_local.a());
        let op = CombineOp::color_rgb(cp);
        let mut rgb = [0i32; 3];
        for (i, out) in rgb.iter_mut().enumerate() {
            let factor = match cp.cc_mselect() {
                1 => local[i],
                2 => i32::from(c_other.a()),
                3 => local_a,
                4 => i32::from(texel.a()),
                5 => tex[i],
                _ => 0,
            };
            let add = match cp.cc_add_aclocal() {
                1 => local[i],
                2 => local_a,
                _ => 0,
            };
            *out = op.apply(other[i], local[i], factor, add);
        }

        let color = PixelColor {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a,
        };
        output_pixel(
            &mut target,
            ctx.fog,
            regs,
            dither.as_ref(),
            x,
            color,
            &depth,
            iterz,
            iterw,
            i32::from(iterargb.a()),
            ctx.stats,
        );
    }
}
