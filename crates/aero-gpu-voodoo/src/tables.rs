//! Process-wide lookup tables, built once on first use and shared read-only.

use std::sync::OnceLock;

use crate::math::{
    extract_1555, extract_332, extract_4444, extract_565, Argb, RECIPLOG_LOOKUP_BITS,
    RECIPLOG_LOOKUP_PREC,
};

pub static DITHER_MATRIX_4X4: [u8; 16] = [0, 8, 2, 10, 12, 4, 14, 6, 3, 11, 1, 9, 15, 7, 13, 5];
pub static DITHER_MATRIX_2X2: [u8; 16] = [2, 10, 2, 10, 14, 6, 14, 6, 2, 10, 2, 10, 14, 6, 14, 6];

/// Entries per dither lookup: `[y:2][color:8][x:2][g:1]`.
pub const DITHER_LOOKUP_LEN: usize = 256 * 16 * 2;
/// Stride of one dither row in the lookup tables.
pub const DITHER_ROW_LEN: usize = 1 << 11;

pub struct Tables {
    pub reciplog: [u32; (2 << RECIPLOG_LOOKUP_BITS) + 2],
    pub dither4_lookup: Box<[u8]>,
    pub dither2_lookup: Box<[u8]>,
    pub rgb332: [u32; 256],
    pub alpha8: [u32; 256],
    pub int8: [u32; 256],
    pub ai44: [u32; 256],
    pub rgb565: Box<[u32]>,
    pub argb1555: Box<[u32]>,
    pub argb4444: Box<[u32]>,
    /// Lookup for formats without a decoder; every texel reads as transparent black.
    pub empty: [u32; 256],
}

static TABLES: OnceLock<Tables> = OnceLock::new();

pub fn tables() -> &'static Tables {
    TABLES.get_or_init(Tables::build)
}

#[inline]
fn dither_rb(v: i32, dith: i32) -> i32 {
    ((v << 1) - (v >> 4) + (v >> 7) + dith) >> 1
}

#[inline]
fn dither_g(v: i32, dith: i32) -> i32 {
    ((v << 2) - (v >> 4) + (v >> 6) + dith) >> 2
}

fn argb(a: i32, r: i32, g: i32, b: i32) -> u32 {
    Argb::new(a as u8, r as u8, g as u8, b as u8).0
}

impl Tables {
    fn build() -> Self {
        let mut reciplog = [0u32; (2 << RECIPLOG_LOOKUP_BITS) + 2];
        for val in 0..=(1u32 << RECIPLOG_LOOKUP_BITS) {
            let value = (1u32 << RECIPLOG_LOOKUP_BITS) + val;
            reciplog[val as usize * 2] = (1u32 << (RECIPLOG_LOOKUP_PREC + RECIPLOG_LOOKUP_BITS)) / value;
            reciplog[val as usize * 2 + 1] = ((value as f64 / (1u32 << RECIPLOG_LOOKUP_BITS) as f64)
                .log2()
                * (1u32 << RECIPLOG_LOOKUP_PREC) as f64) as u32;
        }

        let mut dither4_lookup = vec![0u8; DITHER_LOOKUP_LEN].into_boxed_slice();
        let mut dither2_lookup = vec![0u8; DITHER_LOOKUP_LEN].into_boxed_slice();
        for val in 0..DITHER_LOOKUP_LEN {
            let g = val & 1;
            let x = (val >> 1) & 3;
            let color = ((val >> 3) & 0xff) as i32;
            let y = (val >> 11) & 3;
            let d4 = DITHER_MATRIX_4X4[y * 4 + x] as i32;
            let d2 = DITHER_MATRIX_2X2[y * 4 + x] as i32;
            if g == 0 {
                dither4_lookup[val] = (dither_rb(color, d4) >> 3) as u8;
                dither2_lookup[val] = (dither_rb(color, d2) >> 3) as u8;
            } else {
                dither4_lookup[val] = (dither_g(color, d4) >> 2) as u8;
                dither2_lookup[val] = (dither_g(color, d2) >> 2) as u8;
            }
        }

        let mut rgb332 = [0u32; 256];
        let mut alpha8 = [0u32; 256];
        let mut int8 = [0u32; 256];
        let mut ai44 = [0u32; 256];
        for v in 0..256u32 {
            let (r, g, b) = extract_332(v);
            rgb332[v as usize] = argb(0xff, r, g, b);
            let i = v as i32;
            alpha8[v as usize] = argb(i, i, i, i);
            int8[v as usize] = argb(0xff, i, i, i);
            let a = ((v & 0xf0) | ((v >> 4) & 0xf)) as i32;
            let l = (((v << 4) & 0xf0) | (v & 0xf)) as i32;
            ai44[v as usize] = argb(a, l, l, l);
        }

        let mut rgb565 = vec![0u32; 65536].into_boxed_slice();
        let mut argb1555 = vec![0u32; 65536].into_boxed_slice();
        let mut argb4444 = vec![0u32; 65536].into_boxed_slice();
        for v in 0..65536u32 {
            let (r, g, b) = extract_565(v);
            rgb565[v as usize] = argb(0xff, r, g, b);
            let (a, r, g, b) = extract_1555(v);
            argb1555[v as usize] = argb(a, r, g, b);
            let (a, r, g, b) = extract_4444(v);
            argb4444[v as usize] = argb(a, r, g, b);
        }

        Self {
            reciplog,
            dither4_lookup,
            dither2_lookup,
            rgb332,
            alpha8,
            int8,
            ai44,
            rgb565,
            argb1555,
            argb4444,
            empty: [0; 256],
        }
    }
}

/// Ordered-dither state for one scanline, present only when dithering is enabled.
#[derive(Clone, Copy)]
pub struct DitherRow {
    /// Row of the 4x4 matrix; used for LOD and fog dithering regardless of dither type.
    pub matrix4: &'static [u8],
    /// Row of the selected matrix, used for alpha-blend dither subtraction.
    pub matrix: &'static [u8],
    lookup: &'static [u8],
}

impl DitherRow {
    /// Dither row for screen row `y`, or `None` when dithering is disabled.
    pub fn new(enabled: bool, two_by_two: bool, y: i32) -> Option<Self> {
        if !enabled {
            return None;
        }
        let t = tables();
        let row = (y & 3) as usize;
        let matrix4 = &DITHER_MATRIX_4X4[row * 4..row * 4 + 4];
        let (matrix, lookup) = if two_by_two {
            (&DITHER_MATRIX_2X2[row * 4..row * 4 + 4], &t.dither2_lookup[..])
        } else {
            (matrix4, &t.dither4_lookup[..])
        };
        Some(Self {
            matrix4,
            matrix,
            lookup: &lookup[row * DITHER_ROW_LEN..(row + 1) * DITHER_ROW_LEN],
        })
    }

    /// Reduce 8-bit channels to 5:6:5 with the ordered dither for column `x`.
    #[inline]
    pub fn apply(&self, x: i32, r: i32, g: i32, b: i32) -> (i32, i32, i32) {
        let dith = &self.lookup[((x & 3) as usize) << 1..];
        (
            dith[(r as usize) << 3] as i32,
            dith[((g as usize) << 3) + 1] as i32,
            dith[(b as usize) << 3] as i32,
        )
    }
}

/// Convert 8-bit channels to a 565 pixel, dithering when `dither` is present.
#[inline]
pub fn dither_to_565(dither: Option<&DitherRow>, x: i32, r: i32, g: i32, b: i32) -> u16 {
    let (r, g, b) = match dither {
        Some(d) => d.apply(x, r, g, b),
        None => (r >> 3, g >> 2, b >> 3),
    };
    ((r << 11) | (g << 5) | b) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reciplog_endpoints() {
        let t = tables();
        assert_eq!(t.reciplog[0], 1 << 22);
        assert_eq!(t.reciplog[1], 0);
        assert_eq!(t.reciplog[1024], 1 << 21);
        assert_eq!(t.reciplog[1025], 1 << 22);
    }

    #[test]
    fn color_tables_expand_to_full_range() {
        let t = tables();
        assert_eq!(t.rgb565[0xffff], 0xffff_ffff);
        assert_eq!(t.rgb565[0], 0xff00_0000);
        assert_eq!(t.argb1555[0x7fff], 0x00ff_ffff);
        assert_eq!(t.argb4444[0xf000], 0xff00_0000);
        assert_eq!(t.rgb332[0xff], 0xffff_ffff);
        assert_eq!(t.alpha8[0x40], 0x4040_4040);
        assert_eq!(t.int8[0x40], 0xff40_4040);
        assert_eq!(t.ai44[0xf0], 0xff00_0000);
    }

    #[test]
    fn undithered_conversion_truncates() {
        assert_eq!(dither_to_565(None, 0, 0xff, 0xff, 0xff), 0xffff);
        assert_eq!(dither_to_565(None, 0, 0xff, 0, 0), 0xf800);
        assert_eq!(dither_to_565(None, 0, 0x07, 0x03, 0x07), 0);
    }

    #[test]
    fn dithering_preserves_extremes() {
        for y in 0..4 {
            let row = DitherRow::new(true, false, y).unwrap();
            for x in 0..4 {
                assert_eq!(dither_to_565(Some(&row), x, 0, 0, 0), 0);
                assert_eq!(dither_to_565(Some(&row), x, 0xff, 0xff, 0xff), 0xffff);
            }
        }
        assert!(DitherRow::new(false, false, 0).is_none());
    }
}
