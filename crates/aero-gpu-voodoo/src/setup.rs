//! Voodoo2 triangle setup: vertices are streamed through the `sVx`.. registers and the chip
//! derives the start/gradient registers itself.

use crate::device::VoodooDevice;
use crate::error::Result;
use crate::math::Gradient;
use crate::regs::{self, SetupMode};

/// One vertex as captured from the setup registers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SetupVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub wb: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
    pub w0: f32,
    pub s0: f32,
    pub t0: f32,
    pub w1: f32,
    pub s1: f32,
    pub t1: f32,
}

impl SetupVertex {
    /// Read the vertex registers of the FBI bank.
    pub fn capture(bank: &[u32]) -> Self {
        let f = |reg: usize| f32::from_bits(bank[reg]);
        Self {
            x: f(regs::S_VX),
            y: f(regs::S_VY),
            z: f(regs::S_VZ),
            wb: f(regs::S_WB),
            r: f(regs::S_RED),
            g: f(regs::S_GREEN),
            b: f(regs::S_BLUE),
            a: f(regs::S_ALPHA),
            w0: f(regs::S_WTMU0),
            s0: f(regs::S_S_W0),
            t0: f(regs::S_T_W0),
            w1: f(regs::S_WTMU1),
            s1: f(regs::S_S_WTMU1),
            t1: f(regs::S_T_WTMU1),
        }
    }
}

/// Edge deltas and reciprocal area shared by every plane equation of a triangle.
#[derive(Debug, Clone, Copy)]
pub struct PlaneSetup {
    dx1: f32,
    dx2: f32,
    dy1: f32,
    dy2: f32,
    divisor: f32,
}

impl PlaneSetup {
    pub fn new(v: &[SetupVertex; 3]) -> Self {
        let divisor =
            1.0 / ((v[0].x - v[1].x) * (v[0].y - v[2].y) - (v[0].x - v[2].x) * (v[0].y - v[1].y));
        Self {
            dx1: v[0].y - v[2].y,
            dx2: v[0].y - v[1].y,
            dy1: v[0].x - v[1].x,
            dy2: v[0].x - v[2].x,
            divisor,
        }
    }

    /// Negative for one winding, positive for the other.
    pub fn divisor(&self) -> f32 {
        self.divisor
    }

    /// `(start, d/dX, d/dY)` of the attribute with per-vertex values `p`, scaled by `scale`.
    pub fn plane(&self, p: [f32; 3], scale: f32) -> (f32, f32, f32) {
        let tdiv = self.divisor * scale;
        (
            p[0] * scale,
            ((p[0] - p[1]) * self.dx1 - (p[0] - p[2]) * self.dx2) * tdiv,
            ((p[0] - p[2]) * self.dy1 - (p[0] - p[1]) * self.dy2) * tdiv,
        )
    }

    fn gradient_i32(&self, v: &[SetupVertex; 3], attr: fn(&SetupVertex) -> f32) -> Gradient<i32> {
        let (start, dx, dy) = self.plane([attr(&v[0]), attr(&v[1]), attr(&v[2])], 4096.0);
        Gradient {
            start: start as i32,
            dx: dx as i32,
            dy: dy as i32,
        }
    }

    fn gradient_i64(&self, v: &[SetupVertex; 3], attr: fn(&SetupVertex) -> f32) -> Gradient<i64> {
        let (start, dx, dy) = self.plane([attr(&v[0]), attr(&v[1]), attr(&v[2])], 65536.0 * 65536.0);
        Gradient {
            start: start as i64,
            dx: dx as i64,
            dy: dy as i64,
        }
    }
}

impl VoodooDevice {
    /// `sBeginTriCMD`: start a new strip or fan.
    pub(crate) fn begin_triangle(&mut self) {
        let vertex = SetupVertex::capture(&self.regs);
        self.fbi.svert = [vertex; 3];
        self.fbi.sverts = 1;
    }

    /// `sDrawTriCMD`: add a vertex and draw once three are available.
    pub(crate) fn draw_triangle(&mut self) -> Result<()> {
        let mode = SetupMode(self.regs[regs::S_SETUP_MODE]);
        if !mode.fan() {
            self.fbi.svert[0] = self.fbi.svert[1];
        }
        self.fbi.svert[1] = self.fbi.svert[2];
        self.fbi.svert[2] = SetupVertex::capture(&self.regs);

        self.fbi.sverts += 1;
        if self.fbi.sverts >= 3 {
            self.setup_and_draw()
        } else {
            Ok(())
        }
    }

    fn setup_and_draw(&mut self) -> Result<()> {
        let mode = SetupMode(self.regs[regs::S_SETUP_MODE]);
        let v = self.fbi.svert;

        let fbi = &mut self.fbi;
        fbi.ax = (v[0].x * 16.0) as i16;
        fbi.ay = (v[0].y * 16.0) as i16;
        fbi.bx = (v[1].x * 16.0) as i16;
        fbi.by = (v[1].y * 16.0) as i16;
        fbi.cx = (v[2].x * 16.0) as i16;
        fbi.cy = (v[2].y * 16.0) as i16;

        let setup = PlaneSetup::new(&v);

        if mode.enable_culling() {
            let mut cull_sign = mode.culling_sign();
            // Strips alternate winding unless ping-pong is disabled.
            if !mode.fan() && !mode.disable_ping_pong() {
                cull_sign ^= (fbi.sverts - 3) & 1 != 0;
            }
            if (setup.divisor() < 0.0) == cull_sign {
                tracing::trace!(sverts = fbi.sverts, "voodoo: setup triangle culled");
                return Ok(());
            }
        }

        if mode.setup_rgb() {
            fbi.r = setup.gradient_i32(&v, |v| v.r);
            fbi.g = setup.gradient_i32(&v, |v| v.g);
            fbi.b = setup.gradient_i32(&v, |v| v.b);
        }
        if mode.setup_alpha() {
            fbi.a = setup.gradient_i32(&v, |v| v.a);
        }
        if mode.setup_z() {
            fbi.z = setup.gradient_i32(&v, |v| v.z);
        }

        if mode.setup_wb() {
            let w = setup.gradient_i64(&v, |v| v.wb);
            fbi.w = w;
            for tmu in &mut self.tmus {
                tmu.w = w;
            }
        }
        // W0/S0/T0 feed both TMUs so a single-pass program also drives TMU1.
        if mode.setup_w0() {
            let w = setup.gradient_i64(&v, |v| v.w0);
            for tmu in &mut self.tmus {
                tmu.w = w;
            }
        }
        if mode.setup_st0() {
            let s = setup.gradient_i64(&v, |v| v.s0);
            let t = setup.gradient_i64(&v, |v| v.t0);
            for tmu in &mut self.tmus {
                tmu.s = s;
                tmu.t = t;
            }
        }
        if let Some(tmu1) = self.tmus.get_mut(1) {
            if mode.setup_w1() {
                tmu1.w = setup.gradient_i64(&v, |v| v.w1);
            }
            if mode.setup_st1() {
                tmu1.s = setup.gradient_i64(&v, |v| v.s1);
                tmu1.t = setup.gradient_i64(&v, |v| v.t1);
            }
        }

        self.triangle()
    }
}
