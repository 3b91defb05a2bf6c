//! Direct triangle issue (`triangleCMD`) and scan conversion.

use crate::device::VoodooDevice;
use crate::error::Result;
use crate::fbi::Fbi;
use crate::math::Gradient;
use crate::pipeline::PixelRegs;
use crate::raster::{RasterParams, ScanlineContext};
use crate::regs::{
    self, AlphaMode, FbiInit3, FbzColorPath, FbzMode, FogMode, TextureMode, REG_BANK_LEN,
};

/// Per-TMU iterators of a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TexIterators {
    pub s: Gradient<i64>,
    pub t: Gradient<i64>,
    pub w: Gradient<i64>,
    pub lodbase: i32,
}

/// Parameters of one triangle, captured when the command is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangleWorkItem {
    /// Reference vertex (12.4); iterator starts are relative to it.
    pub ax: i16,
    pub ay: i16,
    pub r: Gradient<i32>,
    pub g: Gradient<i32>,
    pub b: Gradient<i32>,
    pub a: Gradient<i32>,
    pub z: Gradient<i32>,
    pub w: Gradient<i64>,
    pub tex: [TexIterators; 2],
    pub regs: PixelRegs,
    pub texture_mode: [TextureMode; 2],
    pub clip_left_right: u32,
    pub clip_low_y_high_y: u32,
    pub texcount: usize,
}

/// Round to the nearest integer; exact halves round down.
#[inline]
pub fn round_coordinate(value: f32) -> i32 {
    let result = value.floor() as i32;
    result + i32::from(value - result as f32 > 0.5)
}

/// Walk the rows covered by the triangle, calling `scanline(y, startx, stopx)` for each.
///
/// Vertices are `(x, y)` in pixels. Rows run from `round(min y)` up to (not including)
/// `round(max y)`; spans are sampled at row centers.
pub fn render_triangle(verts: [(f32, f32); 3], mut scanline: impl FnMut(i32, i32, i32)) {
    let mut v = verts;
    v.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    let [(v1x, v1y), (v2x, v2y), (v3x, v3y)] = v;

    let first = round_coordinate(v1y);
    let last = round_coordinate(v3y);
    if last - first <= 0 {
        return;
    }

    let slope = |ax: f32, ay: f32, bx: f32, by: f32| {
        if by == ay {
            0.0
        } else {
            (bx - ax) / (by - ay)
        }
    };
    let dxdy_v1v2 = slope(v1x, v1y, v2x, v2y);
    let dxdy_v1v3 = slope(v1x, v1y, v3x, v3y);
    let dxdy_v2v3 = slope(v2x, v2y, v3x, v3y);

    for y in first..last {
        let fully = y as f32 + 0.5;
        let startx = v1x + (fully - v1y) * dxdy_v1v3;
        let stopx = if fully < v2y {
            v1x + (fully - v1y) * dxdy_v1v2
        } else {
            v2x + (fully - v2y) * dxdy_v2v3
        };

        let mut istart = round_coordinate(startx);
        let mut istop = round_coordinate(stopx);
        if istart > istop {
            std::mem::swap(&mut istart, &mut istop);
        }
        if istart >= istop {
            istart = 0;
            istop = 0;
        }
        scanline(y, istart, istop);
    }
}

impl VoodooDevice {
    /// Number of TMUs a triangle issued now would use.
    pub(crate) fn active_texcount(&self) -> usize {
        let cp = FbzColorPath(self.regs[regs::FBZ_COLOR_PATH]);
        if FbiInit3(self.regs[regs::FBI_INIT3]).disable_tmus() || !cp.texture_enable() {
            0
        } else if self.chip_mask & 4 != 0 {
            2
        } else {
            1
        }
    }

    /// Move every start value from the 12.4 vertex position to the pixel center.
    fn subpixel_adjust(&mut self, texcount: usize) {
        let dx = 8 - (i32::from(self.fbi.ax) & 15);
        let dy = 8 - (i32::from(self.fbi.ay) & 15);

        let fbi = &mut self.fbi;
        for g in [&mut fbi.r, &mut fbi.g, &mut fbi.b, &mut fbi.a] {
            g.nudge(dx, dy);
        }
        fbi.w.nudge(dx, dy);
        let z = &mut fbi.z;
        let by_y = ((i64::from(dy) * i64::from(z.dy)) >> 4) as i32;
        let by_x = ((i64::from(dx) * i64::from(z.dx)) >> 4) as i32;
        z.start = z.start.wrapping_add(by_y).wrapping_add(by_x);

        for tmu in self.tmus.iter_mut().take(texcount) {
            tmu.w.nudge(dx, dy);
            tmu.s.nudge(dx, dy);
            tmu.t.nudge(dx, dy);
        }
    }

    /// `triangleCMD` / `ftriangleCMD`, and the last step of the setup protocol.
    pub(crate) fn triangle(&mut self) -> Result<()> {
        let texcount = self.active_texcount();
        let cp = FbzColorPath(self.regs[regs::FBZ_COLOR_PATH]);
        if cp.subpixel_adjust() {
            self.subpixel_adjust(texcount);
        }

        let fbz_mode = FbzMode(self.regs[regs::FBZ_MODE]);
        let Some(color_base) = self.fbi.buffer_offset(fbz_mode.draw_buffer()) else {
            tracing::trace!(
                draw_buffer = fbz_mode.draw_buffer(),
                "voodoo: triangle to reserved draw buffer dropped"
            );
            return Ok(());
        };

        let mut texture_mode = [TextureMode(0); 2];
        for tmu in &self.tmus {
            texture_mode[tmu.index()] = TextureMode(self.regs[tmu.bank_base() + regs::TEXTURE_MODE]);
        }
        let params = RasterParams::normalize(
            cp,
            AlphaMode(self.regs[regs::ALPHA_MODE]),
            FogMode(self.regs[regs::FOG_MODE]),
            fbz_mode,
            [
                (texcount >= 1).then_some(texture_mode[0]),
                (texcount >= 2).then_some(texture_mode[1]),
            ],
        );
        let index = self.raster.find(params, texcount)?;

        let mut tex = [TexIterators::default(); 2];
        for (i, it) in tex.iter_mut().enumerate().take(texcount) {
            let tmu = &mut self.tmus[i];
            let bank = tmu.bank(&self.regs);
            *it = TexIterators {
                s: tmu.s,
                t: tmu.t,
                w: tmu.w,
                lodbase: tmu.prepare(bank),
            };
        }

        let fbi = &self.fbi;
        let item = TriangleWorkItem {
            ax: fbi.ax,
            ay: fbi.ay,
            r: fbi.r,
            g: fbi.g,
            b: fbi.b,
            a: fbi.a,
            z: fbi.z,
            w: fbi.w,
            tex,
            regs: PixelRegs::latch(&self.regs[..REG_BANK_LEN]),
            texture_mode,
            clip_left_right: self.regs[regs::CLIP_LEFT_RIGHT],
            clip_low_y_high_y: self.regs[regs::CLIP_LOWY_HIGHY],
            texcount,
        };
        let verts = [
            (f32::from(fbi.ax) / 16.0, f32::from(fbi.ay) / 16.0),
            (f32::from(fbi.bx) / 16.0, f32::from(fbi.by) / 16.0),
            (f32::from(fbi.cx) / 16.0, f32::from(fbi.cy) / 16.0),
        ];

        let entry = self.raster.entry_mut(index);
        entry.polys += 1;
        let routine = entry.routine;

        let mut stipple = self.regs[regs::STIPPLE];
        let Fbi {
            ram,
            fog,
            aux_offset,
            rowpixels,
            yorigin,
            ..
        } = &mut self.fbi;
        let mut ctx = ScanlineContext {
            ram,
            fog,
            tmus: &self.tmus,
            item: &item,
            stipple: &mut stipple,
            stats: &mut self.stats[0],
            color_base,
            aux_base: *aux_offset,
            rowpixels: *rowpixels,
            yorigin: *yorigin,
            send_config: self.send_config,
            tmu_config: self.tmu_config,
        };
        render_triangle(verts, |y, startx, stopx| routine(&mut ctx, y, startx, stopx));

        self.regs[regs::STIPPLE] = stipple;
        self.regs[regs::FBI_TRIANGLES_OUT] = self.regs[regs::FBI_TRIANGLES_OUT].wrapping_add(1);
        Ok(())
    }
}
