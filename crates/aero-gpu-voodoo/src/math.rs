//! Fixed-point helpers shared by the setup, texture and pixel stages.

use crate::tables::tables;

/// Packed `0xAARRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Argb(pub u32);

impl Argb {
    #[inline]
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    #[inline]
    pub const fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub const fn with_a(self, a: u8) -> Self {
        Self((self.0 & 0x00ff_ffff) | ((a as u32) << 24))
    }
}

/// An iterated parameter: value at the triangle's reference point plus per-pixel X/Y steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gradient<T> {
    pub start: T,
    pub dx: T,
    pub dy: T,
}

macro_rules! gradient_ops {
    ($t:ty) => {
        impl Gradient<$t> {
            /// Value `dx` pixels right and `dy` rows down from the reference point.
            #[inline]
            pub fn at(&self, dx: i32, dy: i32) -> $t {
                self.start
                    .wrapping_add((dy as $t).wrapping_mul(self.dy))
                    .wrapping_add((dx as $t).wrapping_mul(self.dx))
            }

            /// Move the reference point by a subpixel offset in 1/16 pixel units.
            #[inline]
            pub fn nudge(&mut self, dx: i32, dy: i32) {
                self.start = self.start.wrapping_add(
                    (dy as $t)
                        .wrapping_mul(self.dy)
                        .wrapping_add((dx as $t).wrapping_mul(self.dx))
                        >> 4,
                );
            }
        }
    };
}

gradient_ops!(i32);
gradient_ops!(i64);

/// Expand a 565 pixel into 8-bit channels, replicating the high bits.
#[inline]
pub fn extract_565(v: u32) -> (i32, i32, i32) {
    (
        (((v >> 8) & 0xf8) | ((v >> 13) & 7)) as i32,
        (((v >> 3) & 0xfc) | ((v >> 9) & 3)) as i32,
        (((v << 3) & 0xf8) | ((v >> 2) & 7)) as i32,
    )
}

#[inline]
pub fn extract_x555(v: u32) -> (i32, i32, i32) {
    (
        (((v >> 7) & 0xf8) | ((v >> 12) & 7)) as i32,
        (((v >> 2) & 0xf8) | ((v >> 7) & 7)) as i32,
        (((v << 3) & 0xf8) | ((v >> 2) & 7)) as i32,
    )
}

#[inline]
pub fn extract_555x(v: u32) -> (i32, i32, i32) {
    (
        (((v >> 8) & 0xf8) | ((v >> 13) & 7)) as i32,
        (((v >> 3) & 0xf8) | ((v >> 8) & 7)) as i32,
        (((v << 2) & 0xf8) | ((v >> 3) & 7)) as i32,
    )
}

#[inline]
pub fn extract_1555(v: u32) -> (i32, i32, i32, i32) {
    let a = (((v as u16 as i16) >> 15) as i32) & 0xff;
    let (r, g, b) = extract_x555(v);
    (a, r, g, b)
}

#[inline]
pub fn extract_5551(v: u32) -> (i32, i32, i32, i32) {
    let (r, g, b) = extract_555x(v);
    let a = if v & 1 != 0 { 0xff } else { 0 };
    (r, g, b, a)
}

#[inline]
pub fn extract_x888(v: u32) -> (i32, i32, i32) {
    (((v >> 16) & 0xff) as i32, ((v >> 8) & 0xff) as i32, (v & 0xff) as i32)
}

#[inline]
pub fn extract_888x(v: u32) -> (i32, i32, i32) {
    (((v >> 24) & 0xff) as i32, ((v >> 16) & 0xff) as i32, ((v >> 8) & 0xff) as i32)
}

#[inline]
pub fn extract_8888(v: u32) -> (i32, i32, i32, i32) {
    (
        ((v >> 24) & 0xff) as i32,
        ((v >> 16) & 0xff) as i32,
        ((v >> 8) & 0xff) as i32,
        (v & 0xff) as i32,
    )
}

#[inline]
pub fn extract_4444(v: u32) -> (i32, i32, i32, i32) {
    (
        (((v >> 8) & 0xf0) | ((v >> 12) & 0xf)) as i32,
        (((v >> 4) & 0xf0) | ((v >> 8) & 0xf)) as i32,
        ((v & 0xf0) | ((v >> 4) & 0xf)) as i32,
        (((v << 4) & 0xf0) | (v & 0xf)) as i32,
    )
}

#[inline]
pub fn extract_332(v: u32) -> (i32, i32, i32) {
    (
        ((v & 0xe0) | ((v >> 3) & 0x1c) | ((v >> 6) & 3)) as i32,
        (((v << 3) & 0xe0) | (v & 0x1c) | ((v >> 3) & 3)) as i32,
        (((v << 6) & 0xc0) | ((v << 4) & 0x30) | ((v << 2) & 0xc) | (v & 3)) as i32,
    )
}

#[inline]
pub fn clamp_u8(v: i32) -> i32 {
    v.clamp(0, 0xff)
}

/// Convert an IEEE single to signed fixed point with `fixedbits` fractional bits.
pub fn float_to_int32(data: u32, fixedbits: i32) -> i32 {
    let exponent = ((data >> 23) & 0xff) as i32 - 127 - 23 + fixedbits;
    let mut result = ((data & 0x7f_ffff) | 0x80_0000) as i32;
    if exponent < 0 {
        result = if exponent > -32 { result >> -exponent } else { 0 };
    } else {
        result = if exponent < 32 {
            result.wrapping_shl(exponent as u32)
        } else {
            0x7fff_ffff
        };
    }
    if data & 0x8000_0000 != 0 {
        result = result.wrapping_neg();
    }
    result
}

pub fn float_to_int64(data: u32, fixedbits: i32) -> i64 {
    let exponent = ((data >> 23) & 0xff) as i32 - 127 - 23 + fixedbits;
    let mut result = ((data & 0x7f_ffff) | 0x80_0000) as i64;
    if exponent < 0 {
        result = if exponent > -64 { result >> -exponent } else { 0 };
    } else {
        result = if exponent < 64 {
            result.wrapping_shl(exponent as u32)
        } else {
            i64::MAX
        };
    }
    if data & 0x8000_0000 != 0 {
        result = result.wrapping_neg();
    }
    result
}

pub(crate) const RECIPLOG_LOOKUP_BITS: u32 = 9;
const RECIPLOG_INPUT_PREC: i32 = 32;
pub(crate) const RECIPLOG_LOOKUP_PREC: u32 = 22;
const RECIP_OUTPUT_PREC: i32 = 15;
const LOG_OUTPUT_PREC: i32 = 8;

/// Table-driven reciprocal of a 16.32 value.
///
/// Returns the reciprocal (15 fractional bits after the 32-bit input scale) and `log2(1/value)`
/// in 24.8.
pub fn fast_reciplog(value: i64) -> (i64, i32) {
    let neg = value < 0;
    let value = value.unsigned_abs();
    let mut exp: i32 = 0;

    let mut temp = if value & 0xffff_0000_0000 != 0 {
        exp -= 16;
        (value >> 16) as u32
    } else {
        value as u32
    };

    if temp == 0 {
        let recip = if neg { 0x8000_0000 } else { 0x7fff_ffff };
        return (recip, 1000 << LOG_OUTPUT_PREC);
    }

    let lz = temp.leading_zeros();
    temp <<= lz;
    exp += lz as i32;

    let table = &tables().reciplog;
    let idx = ((temp >> (31 - RECIPLOG_LOOKUP_BITS - 1)) & ((2 << RECIPLOG_LOOKUP_BITS) - 2)) as usize;
    let interp = (temp >> (31 - RECIPLOG_LOOKUP_BITS - 8)) & 0xff;

    let mut rlog = table[idx + 1]
        .wrapping_mul(0x100 - interp)
        .wrapping_add(table[idx + 3].wrapping_mul(interp))
        >> 8;
    let mut recip = (table[idx]
        .wrapping_mul(0x100 - interp)
        .wrapping_add(table[idx + 2].wrapping_mul(interp))
        >> 8) as u64;

    rlog = (rlog + (1 << (RECIPLOG_LOOKUP_PREC as i32 - LOG_OUTPUT_PREC - 1)))
        >> (RECIPLOG_LOOKUP_PREC as i32 - LOG_OUTPUT_PREC);

    let log2 = ((exp - (31 - RECIPLOG_INPUT_PREC)) << LOG_OUTPUT_PREC) - rlog as i32;

    exp += (RECIP_OUTPUT_PREC - RECIPLOG_LOOKUP_PREC as i32) - (31 - RECIPLOG_INPUT_PREC);
    if exp < 0 {
        recip >>= -exp;
    } else {
        recip <<= exp;
    }

    let recip = recip as i64;
    (if neg { -recip } else { recip }, log2)
}

/// Bilinear blend of four packed ARGB texels with 8-bit fractions.
pub fn rgba_bilinear_filter(c00: u32, c01: u32, c10: u32, c11: u32, u: u8, v: u8) -> u32 {
    let (u, v) = (u as u32, v as u32);
    let lerp = |a: u32, b: u32, f: u32| {
        (a & 0x00ff_00ff).wrapping_add(
            (b & 0x00ff_00ff)
                .wrapping_sub(a & 0x00ff_00ff)
                .wrapping_mul(f)
                >> 8,
        )
    };

    let rb0 = lerp(c00, c01, u);
    let rb1 = lerp(c10, c11, u);
    let ag0 = lerp(c00 >> 8, c01 >> 8, u);
    let ag1 = lerp(c10 >> 8, c11 >> 8, u);

    let rb = lerp(rb0, rb1, v);
    let ag = lerp(ag0, ag1, v);

    ((ag << 8) & 0xff00_ff00) | (rb & 0x00ff_00ff)
}

/// Iterated ARGB (12.12 per channel) to 8-bit channels.
///
/// Without `clamp` the hardware wraps: the integer part is taken modulo 4096, `0xfff` reads as 0
/// and `0x100` as 255; anything else keeps its low byte.
pub fn clamped_argb(r: i32, g: i32, b: i32, a: i32, clamp: bool) -> Argb {
    let channel = |v: i32| -> u8 {
        let v = v >> 12;
        if clamp {
            v.clamp(0, 0xff) as u8
        } else {
            match v & 0xfff {
                0xfff => 0,
                0x100 => 0xff,
                v => v as u8,
            }
        }
    };
    Argb::new(channel(a), channel(r), channel(g), channel(b))
}

/// Iterated Z (20.12) to a 16-bit depth.
pub fn clamped_z(iterz: i32, clamp: bool) -> i32 {
    let v = iterz >> 12;
    if clamp {
        return v.clamp(0, 0xffff);
    }
    match v & 0xf_ffff {
        0xf_ffff => 0,
        0x1_0000 => 0xffff,
        v => v & 0xffff,
    }
}

/// Iterated W (16.32) integer part to 8 bits.
pub fn clamped_w(iterw: i64, clamp: bool) -> i32 {
    let v = (iterw >> 32) as i16 as i32;
    if clamp {
        return v.clamp(0, 0xff);
    }
    match v & 0xffff {
        0xffff => 0,
        0x100 => 0xff,
        v => v & 0xff,
    }
}

/// 4.12 "floating point" encoding of the reciprocal of `iterw`, used for W-buffering and fog.
pub fn float_w(iterw: i64) -> i32 {
    if iterw & 0xffff_0000_0000 != 0 {
        return 0;
    }
    float_depth(iterw as u32)
}

/// Floating-point Z (Voodoo2 depth-float select).
pub fn float_z(iterz: i32) -> i32 {
    if iterz as u32 & 0xf000_0000 != 0 {
        return 0;
    }
    float_depth((iterz as u32) << 4)
}

fn float_depth(temp: u32) -> i32 {
    if temp & 0xffff_0000 == 0 {
        return 0xffff;
    }
    let exp = temp.leading_zeros();
    (((exp << 12) | ((!temp >> (19 - exp)) & 0xfff)) + 1) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_steps_and_nudges() {
        let mut g = Gradient::<i32> { start: 100, dx: 16, dy: -32 };
        assert_eq!(g.at(2, 1), 100 + 32 - 32);
        g.nudge(8, 8);
        assert_eq!(g.start, 100 + ((8 * 16 + 8 * -32) >> 4));

        let w = Gradient::<i64> { start: 1 << 32, dx: 1 << 20, dy: 0 };
        assert_eq!(w.at(4, 100), (1 << 32) + (4 << 20));
    }

    #[test]
    fn argb_accessors() {
        let c = Argb::new(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c.0, 0x1234_5678);
        assert_eq!((c.a(), c.r(), c.g(), c.b()), (0x12, 0x34, 0x56, 0x78));
        assert_eq!(c.with_a(0xff).0, 0xff34_5678);
    }

    #[test]
    fn float_conversion_matches_fixed_point() {
        assert_eq!(float_to_int32(1.0f32.to_bits(), 4), 16);
        assert_eq!(float_to_int32((-2.5f32).to_bits(), 12), -(5 << 11));
        assert_eq!(float_to_int32(0.5f32.to_bits(), 0), 0);
        assert_eq!(float_to_int64(1.0f32.to_bits(), 32), 1 << 32);
        assert_eq!(float_to_int64(0.25f32.to_bits(), 32), 1 << 30);
    }

    #[test]
    fn reciprocal_of_one_and_two() {
        // 1.0 in 16.32 yields 1.0 with 30 fractional bits on the way into `>> 29` texture math.
        let (recip, log) = fast_reciplog(1 << 32);
        assert_eq!(log, 0);
        assert!((recip - (1 << 15)).abs() <= 1, "recip = {recip:#x}");

        let (recip, log) = fast_reciplog(2 << 32);
        assert_eq!(log, -256);
        assert!((recip - (1 << 14)).abs() <= 1, "recip = {recip:#x}");

        let (recip, _) = fast_reciplog(-(2 << 32));
        assert!((recip + (1 << 14)).abs() <= 1);
    }

    #[test]
    fn reciprocal_of_zero_saturates() {
        assert_eq!(fast_reciplog(0), (0x7fff_ffff, 1000 << 8));
    }

    #[test]
    fn bilinear_corners_and_midpoint() {
        let (a, b) = (0xff00_00ff, 0x00ff_0000);
        assert_eq!(rgba_bilinear_filter(a, b, a, b, 0, 0), a);
        let mid = rgba_bilinear_filter(0x0000_0000, 0x8080_8080, 0x0000_0000, 0x8080_8080, 0x80, 0);
        assert_eq!(mid, 0x4040_4040);
    }

    #[test]
    fn unclamped_iterators_wrap() {
        assert_eq!(clamped_argb(0xfff << 12, 0x100 << 12, 0x42 << 12, 0, false).0, 0x0000_ff42);
        assert_eq!(clamped_argb(-(1 << 12), 0x100 << 12, 0x42 << 12, 0, true).0, 0x0000_ff42);

        assert_eq!(clamped_z(0x1_0000 << 12, false), 0xffff);
        assert_eq!(clamped_z(-(1 << 12), false), 0);
        assert_eq!(clamped_z(0x2_1234 << 12, false), 0x1234);
        assert_eq!(clamped_z(0x2_1234 << 12, true), 0xffff);

        assert_eq!(clamped_w(0x100 << 32, false), 0xff);
        assert_eq!(clamped_w(-(1 << 32), false), 0);
        assert_eq!(clamped_w(-(1 << 32), true), 0);
    }

    #[test]
    fn floating_w_encoding() {
        assert_eq!(float_w(1 << 32), 0);
        assert_eq!(float_w(0x0000_ffff), 0xffff);
        // Highest bit set: exponent 0, mantissa taken from the inverted value.
        assert_eq!(float_w(0x8000_0000), 0x1000);
        assert_eq!(float_w(0x0001_0000), (15 << 12) + 0xfff + 1);
        assert_eq!(float_z(0x1000_0000), 0);
    }

    #[test]
    fn pixel_format_extraction() {
        assert_eq!(extract_565(0xffff), (0xff, 0xff, 0xff));
        assert_eq!(extract_565(0xf800), (0xff, 0, 0));
        assert_eq!(extract_x555(0x7c00), (0xff, 0, 0));
        assert_eq!(extract_1555(0x8000), (0xff, 0, 0, 0));
        assert_eq!(extract_5551(0x0001), (0, 0, 0, 0xff));
        assert_eq!(extract_4444(0xf0a5), (0xff, 0x00, 0xaa, 0x55));
        assert_eq!(extract_332(0xe0), (0xff, 0, 0));
        assert_eq!(extract_332(0x03), (0, 0, 0xff));
    }
}
