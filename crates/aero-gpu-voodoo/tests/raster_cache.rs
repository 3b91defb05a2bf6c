mod common;

use aero_gpu_voodoo::raster::{RasterCache, RasterParams, RASTER_HASH_SIZE};
use aero_gpu_voodoo::regs::{self, AlphaMode, FbzColorPath, FbzMode, FogMode, TextureMode};
use aero_gpu_voodoo::{VoodooDevice, VoodooModel};
use common::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct RawState {
    color_path: u32,
    alpha_mode: u32,
    fog_mode: u32,
    fbz_mode: u32,
    tex_modes: [Option<u32>; 2],
}

impl RawState {
    fn normalize(&self) -> RasterParams {
        RasterParams::normalize(
            FbzColorPath(self.color_path),
            AlphaMode(self.alpha_mode),
            FogMode(self.fog_mode),
            FbzMode(self.fbz_mode),
            self.tex_modes.map(|m| m.map(TextureMode)),
        )
    }

    fn texcount(&self) -> usize {
        self.tex_modes.iter().flatten().count()
    }
}

fn raw_state() -> impl Strategy<Value = RawState> {
    (
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
        any::<Option<u32>>(),
        any::<Option<u32>>(),
    )
        .prop_map(|(color_path, alpha_mode, fog_mode, fbz_mode, t0, t1)| RawState {
            color_path,
            alpha_mode,
            fog_mode,
            fbz_mode,
            // A second TMU only participates alongside the first.
            tex_modes: [t0, t0.and(t1)],
        })
}

proptest! {
    #[test]
    fn repeated_lookups_return_the_same_entry(states in proptest::collection::vec(raw_state(), 1..40)) {
        let mut cache = RasterCache::new();
        let first: Vec<usize> = states
            .iter()
            .map(|s| cache.find(s.normalize(), s.texcount()).unwrap())
            .collect();
        let len = cache.len();

        // Look everything up again in reverse order; nothing new is created.
        for (s, &index) in states.iter().zip(&first).rev() {
            let again = cache.find(s.normalize(), s.texcount()).unwrap();
            prop_assert_eq!(again, index);
            prop_assert_eq!(cache.entry(index).params, s.normalize());
        }
        prop_assert_eq!(cache.len(), len);

        let lookups: u32 = cache.entries().iter().map(|e| e.hits + 1).sum();
        prop_assert_eq!(lookups as usize, 2 * states.len());
    }

    #[test]
    fn dont_care_bits_share_an_entry(state in raw_state(), noise in any::<u32>()) {
        let params = state.normalize();
        prop_assert!(params.hash() < RASTER_HASH_SIZE);

        // Subpixel adjust, texture enable, draw buffer and the alpha reference never change
        // the per-pixel work.
        let noisy = RawState {
            color_path: state.color_path ^ (noise & (3 << 26)),
            fbz_mode: state.fbz_mode ^ (noise & (3 << 14)),
            alpha_mode: state.alpha_mode ^ (noise & (0xff << 24)),
            ..state.clone()
        };
        prop_assert_eq!(noisy.normalize(), params);

        let mut cache = RasterCache::new();
        let a = cache.find(params, state.texcount()).unwrap();
        let b = cache.find(noisy.normalize(), state.texcount()).unwrap();
        prop_assert_eq!(a, b);
    }
}

/// Pipeline state small enough to render quickly but covering the combine, dither and depth
/// stages.
#[derive(Debug, Clone)]
struct DrawState {
    color_path: u32,
    fbz_mode: u32,
    color0: u32,
    color1: u32,
    za_color: u32,
    start: [u32; 4],
    gradient: i32,
}

fn draw_state() -> impl Strategy<Value = DrawState> {
    (
        (0u32..3, 0u32..3, any::<bool>(), 0u32..6, 0u32..3, any::<u8>()),
        (any::<bool>(), any::<bool>(), 0u32..8, any::<bool>()),
        (any::<u32>(), any::<u32>(), any::<u16>()),
        (prop::array::uniform4(0u32..=0xff), -0x800i32..0x800),
    )
        .prop_map(
            |(
                (rgbselect, aselect, localselect, mselect, add, flags),
                (dither, depth, depth_function, aux_write),
                (color0, color1, za),
                (start, gradient),
            )| {
                let color_path = rgbselect
                    | (aselect << 2)
                    | (u32::from(localselect) << 4)
                    | (u32::from(flags & 1) << 8)
                    | (u32::from((flags >> 1) & 1) << 9)
                    | (mselect << 10)
                    | (u32::from((flags >> 2) & 1) << 13)
                    | (add << 14)
                    | (u32::from((flags >> 3) & 1) << 16);
                let fbz_mode = FBZ_RGB_MASK
                    | (u32::from(dither) << 8)
                    | (u32::from((flags >> 4) & 1) << 11)
                    | (u32::from(depth) << 4)
                    | (depth_function << 5)
                    | if aux_write { FBZ_AUX_MASK } else { 0 };
                DrawState {
                    color_path,
                    fbz_mode,
                    color0,
                    color1,
                    za_color: u32::from(za),
                    start: start.map(|c| c << 12),
                    gradient,
                }
            },
        )
}

const TRIANGLE: [(f32, f32); 3] = [(1.0, 1.0), (11.0, 2.0), (3.0, 10.0)];

fn apply(dev: &mut VoodooDevice, state: &DrawState) {
    write_reg(dev, regs::FBZ_COLOR_PATH, state.color_path);
    write_reg(dev, regs::FBZ_MODE, state.fbz_mode);
    write_reg(dev, regs::COLOR0, state.color0);
    write_reg(dev, regs::COLOR1, state.color1);
    write_reg(dev, regs::ZA_COLOR, state.za_color);
    for (reg, start) in [regs::START_R, regs::START_G, regs::START_B, regs::START_A]
        .into_iter()
        .zip(state.start)
    {
        write_reg(dev, reg, start);
    }
    write_reg(dev, regs::D_R_DX, state.gradient as u32);
    write_reg(dev, regs::D_G_DY, state.gradient.wrapping_neg() as u32);
    write_reg(dev, regs::START_Z, 0x4000 << 12);
    write_reg(dev, regs::D_Z_DX, (state.gradient << 8) as u32);
}

#[derive(Debug, PartialEq, Eq)]
struct Frame {
    color: Vec<u16>,
    aux: Vec<u16>,
    counters: [u32; 5],
}

fn capture(dev: &mut VoodooDevice) -> Frame {
    let coords: Vec<(u32, u32)> = (0..16).flat_map(|y| (0..16).map(move |x| (x, y))).collect();
    let fbi = dev.fbi();
    let color = coords.iter().filter_map(|&(x, y)| fbi.pixel(0, x, y)).collect();
    let aux = coords.iter().filter_map(|&(x, y)| fbi.aux_value(x, y)).collect();
    let counters = [
        regs::FBI_PIXELS_IN,
        regs::FBI_CHROMA_FAIL,
        regs::FBI_ZFUNC_FAIL,
        regs::FBI_AFUNC_FAIL,
        regs::FBI_PIXELS_OUT,
    ]
    .map(|reg| read_reg(dev, reg));
    Frame {
        color,
        aux,
        counters,
    }
}

/// Clear color and aux in the test region and zero the counters.
fn clear(dev: &mut VoodooDevice) {
    write_reg(dev, regs::FBZ_MODE, FBZ_RGB_MASK | FBZ_AUX_MASK);
    write_reg(dev, regs::COLOR1, 0);
    write_reg(dev, regs::ZA_COLOR, 0);
    write_reg(dev, regs::CLIP_LEFT_RIGHT, clip_span(0, 16));
    write_reg(dev, regs::CLIP_LOWY_HIGHY, clip_span(0, 16));
    write_reg(dev, regs::FASTFILL_CMD, 0);
    write_reg(dev, regs::NOP_CMD, 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cached_rasterizer_matches_first_draw(state in draw_state()) {
        let (mut dev, _) = new_test_device(VoodooModel::Voodoo1);
        apply(&mut dev, &state);
        draw_triangle(&mut dev, TRIANGLE);
        let first = capture(&mut dev);

        clear(&mut dev);
        apply(&mut dev, &state);
        draw_triangle(&mut dev, TRIANGLE);
        let second = capture(&mut dev);

        prop_assert_eq!(first, second);
        prop_assert_eq!(dev.raster_cache().len(), 1);
        let entry = &dev.raster_cache().entries()[0];
        prop_assert_eq!(entry.hits, 1);
        prop_assert_eq!(entry.polys, 2);
        prop_assert!(entry.is_generic);
    }
}
