//! The accelerator as seen from the bus: memory-mapped register, LFB and texture accesses,
//! PCI-side controls and the retrace hook.

use crate::config::{VoodooConfig, VoodooModel};
use crate::dac::Dac;
use crate::decode::{self, MemorySpace, MMIO_DWORD_MASK};
use crate::display::{DisplaySink, DisplayTiming, PixelFormat};
use crate::error::{Result, VoodooError};
use crate::fbi::Fbi;
use crate::math::{float_to_int32, float_to_int64, Gradient};
use crate::pipeline::PixelRegs;
use crate::raster::RasterCache;
use crate::regs::{
    self, FbiInit0, FbiInit3, InitEnable, RegAccess, RegName, TextureMode, TrexInit1,
    REG_BANK_LEN, REG_FILE_LEN,
};
use crate::stats::{PixelStats, WORKER_COUNT};
use crate::tmu::Tmu;

/// Value returned for reads the hardware does not decode.
const OPEN_BUS: u32 = 0xffff_ffff;

fn set_component<T>(gradient: &mut Gradient<T>, component: usize, value: T) {
    match component {
        0 => gradient.start = value,
        1 => gradient.dx = value,
        _ => gradient.dy = value,
    }
}

/// One Voodoo Graphics / Voodoo2 board.
pub struct VoodooDevice {
    config: VoodooConfig,
    model: VoodooModel,

    /// Four 256-entry banks: FBI, TMU0, TMU1 and an unused fourth chip select.
    pub(crate) regs: Vec<u32>,
    pub(crate) chip_mask: u32,
    pub(crate) alt_regmap: bool,
    pub(crate) init_enable: InitEnable,

    pub(crate) fbi: Fbi,
    pub(crate) tmus: Vec<Tmu>,
    /// Value the TMUs drive onto the color bus while `send_config` is set.
    pub(crate) tmu_config: u32,
    pub(crate) send_config: bool,
    pub(crate) dac: Dac,

    pub(crate) stats: [PixelStats; WORKER_COUNT],
    pub(crate) raster: RasterCache,
    /// Set by the first failed command. Later commands are dropped until a snapshot restore.
    pub(crate) fatal: Option<VoodooError>,

    pub(crate) output_on: bool,
    pub(crate) clock_enabled: bool,
    pub(crate) timing: Box<dyn DisplayTiming>,
    pub(crate) sink: Box<dyn DisplaySink>,
}

impl std::fmt::Debug for VoodooDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoodooDevice")
            .field("model", &self.model)
            .field("chip_mask", &self.chip_mask)
            .field("init_enable", &self.init_enable)
            .field("output_on", &self.output_on)
            .field("clock_enabled", &self.clock_enabled)
            .field("video_size", &self.fbi.video_size())
            .finish_non_exhaustive()
    }
}

impl VoodooDevice {
    pub fn new(
        config: VoodooConfig,
        timing: Box<dyn DisplayTiming>,
        sink: Box<dyn DisplaySink>,
    ) -> Result<Self> {
        config.validate()?;
        let model = config.model;
        let voodoo2 = model.is_voodoo2();

        let tmus: Vec<Tmu> = (0..model.tmu_count())
            .map(|i| Tmu::new(i, voodoo2, config.tmu_mem_bytes()))
            .collect();

        let mut tmu_config = 0x11;
        if voodoo2 {
            tmu_config |= 0x800;
        }
        let mut chip_mask = 0x01 | 0x02;
        if tmus.len() > 1 {
            chip_mask |= 0x04;
            tmu_config |= 0xc0;
        }

        let mut regs = vec![0u32; REG_FILE_LEN];
        regs[regs::FBI_INIT0] = (1 << 4) | (0x10 << 6);
        regs[regs::FBI_INIT1] = (1 << 1) | (1 << 8) | (1 << 12) | (2 << 20);
        regs[regs::FBI_INIT2] = (1 << 6) | (0x100 << 23);
        regs[regs::FBI_INIT3] = (2 << 13) | (0xf << 17);
        regs[regs::FBI_INIT4] = 1;

        let mut device = Self {
            config,
            model,
            regs,
            chip_mask,
            alt_regmap: false,
            init_enable: InitEnable::empty(),
            fbi: Fbi::new(voodoo2, config.fb_mem_bytes()),
            tmus,
            tmu_config,
            send_config: false,
            dac: Dac::default(),
            stats: [PixelStats::default(); WORKER_COUNT],
            raster: RasterCache::new(),
            fatal: None,
            output_on: false,
            clock_enabled: false,
            timing,
            sink,
        };
        device.soft_reset();
        device.recompute_video_memory();

        tracing::debug!(
            ?model,
            fb_mem_mb = config.fb_mem_mb,
            tmu_mem_mb = config.tmu_mem_mb,
            "voodoo: device created"
        );
        Ok(device)
    }

    pub fn config(&self) -> &VoodooConfig {
        &self.config
    }

    pub fn model(&self) -> VoodooModel {
        self.model
    }

    pub fn fbi(&self) -> &Fbi {
        &self.fbi
    }

    pub fn tmus(&self) -> &[Tmu] {
        &self.tmus
    }

    pub fn dac(&self) -> &Dac {
        &self.dac
    }

    pub fn raster_cache(&self) -> &RasterCache {
        &self.raster
    }

    /// The error that stopped the command engine, if any.
    pub fn fatal_error(&self) -> Option<&VoodooError> {
        self.fatal.as_ref()
    }

    /// Raw register file entry (`bank * 0x100 + index`), without read side effects.
    pub fn reg(&self, index: usize) -> u32 {
        self.regs.get(index).copied().unwrap_or(0)
    }

    pub fn init_enable(&self) -> InitEnable {
        self.init_enable
    }

    /// Whether the board currently drives the monitor (`fbiInit0` VGA pass-through bit).
    pub fn output_on(&self) -> bool {
        self.output_on
    }

    /// PCI configuration write to `initEnable`.
    pub fn set_init_enable(&mut self, value: InitEnable) {
        tracing::debug!(?value, "voodoo: initEnable");
        self.init_enable = value;
    }

    /// Start or stop the video clock.
    pub fn set_clock_enable(&mut self, enable: bool) {
        if self.clock_enabled == enable {
            return;
        }
        self.clock_enabled = enable;
        self.timing.set_clock_enable(enable);
        if enable {
            self.timing.reset_clock();
            if self.timing.is_valid() {
                self.timing.set_retrace_active(true);
            }
        }
    }

    /// Dword read at `offset` within the aperture.
    pub fn mmio_read(&mut self, offset: u32) -> u32 {
        let offset = offset & MMIO_DWORD_MASK;
        match decode::classify(offset) {
            MemorySpace::Register => self.register_read(offset),
            MemorySpace::Lfb => self.lfb_read(offset),
            MemorySpace::Texture { tmu } => {
                tracing::warn!(tmu, offset, "voodoo: texture memory read");
                OPEN_BUS
            }
        }
    }

    /// Dword write at `offset` within the aperture. `mem_mask` selects the byte lanes for LFB
    /// writes; register and texture writes always store the full dword.
    pub fn mmio_write(&mut self, offset: u32, data: u32, mem_mask: u32) {
        let offset = offset & MMIO_DWORD_MASK;
        match decode::classify(offset) {
            MemorySpace::Register => self.register_write(offset, data),
            MemorySpace::Lfb => self.lfb_write(offset, data, mem_mask),
            MemorySpace::Texture { tmu } => self.texture_write(tmu as usize, offset, data),
        }
    }

    /// Scan out the front buffer. The host calls this at the retrace frequency programmed into
    /// the [`DisplayTiming`].
    pub fn retrace(&mut self) {
        if !self.output_on {
            return;
        }
        if !self.clock_enabled {
            self.sink.clear();
            return;
        }

        let (width, height) = self.fbi.video_size();
        self.sink.resize(width, height);
        self.sink.set_format(PixelFormat::Bgr565);

        let fbi = &self.fbi;
        if let Some(base) = fbi.rgb_offsets[fbi.front_buffer] {
            let ram = fbi.ram();
            let stride_in = fbi.rowpixels as usize * 2;
            self.sink.with_framebuffer(&mut |out, stride_out| {
                let len = stride_in.min(stride_out);
                for y in 0..height as usize {
                    let src = base as usize + y * stride_in;
                    let dst = y * stride_out;
                    let Some(out_row) = out.get_mut(dst..dst + len) else {
                        break;
                    };
                    let Some(in_row) = ram.get(src..).map(|r| &r[..len.min(r.len())]) else {
                        break;
                    };
                    out_row[..in_row.len()].copy_from_slice(in_row);
                }
            });
        }
        self.sink.present();
    }

    pub(crate) fn recompute_video_memory(&mut self) {
        self.fbi
            .recompute_video_memory(&self.regs[..REG_BANK_LEN], self.model.is_voodoo2());
    }

    fn reset_counters(&mut self) {
        self.update_statistics(false);
        for reg in regs::FBI_PIXELS_IN..=regs::FBI_PIXELS_OUT {
            self.regs[reg] = 0;
        }
    }

    pub(crate) fn soft_reset(&mut self) {
        self.reset_counters();
        self.regs[regs::FBI_TRIANGLES_OUT] = 0;
    }

    /// Drain the pixel counters of the rasterizer and the LFB pipeline, folding them into the
    /// statistics registers when `accumulate` is set.
    fn update_statistics(&mut self, accumulate: bool) {
        let mut drained: Vec<PixelStats> = self.stats.iter_mut().map(PixelStats::take).collect();
        drained.push(self.fbi.lfb_stats.take());
        if !accumulate {
            return;
        }
        for s in drained {
            for (reg, count) in [
                (regs::FBI_PIXELS_IN, s.pixels_in),
                (regs::FBI_CHROMA_FAIL, s.chroma_fail),
                (regs::FBI_ZFUNC_FAIL, s.zfunc_fail),
                (regs::FBI_AFUNC_FAIL, s.afunc_fail),
                (regs::FBI_PIXELS_OUT, s.pixels_out),
            ] {
                self.regs[reg] = self.regs[reg].wrapping_add(count as u32);
            }
        }
    }

    fn register_read(&mut self, offset: u32) -> u32 {
        let regnum = (offset & 0xff) as usize;
        if !regs::access(self.model, regnum).contains(RegAccess::READ) {
            tracing::warn!(reg = %RegName(regnum), "voodoo: read of write-only register");
            return OPEN_BUS;
        }

        match regnum {
            regs::STATUS => {
                let mut result = 0x3f;
                if self.timing.in_vertical_blank() {
                    result |= 1 << 6;
                }
                result |= (self.fbi.front_buffer as u32 & 3) << 10;
                result | (0xffff << 12)
            }
            regs::HV_RETRACE if self.model.is_voodoo2() => {
                (self.timing.current_line() & 0x1fff)
                    | ((self.timing.current_pixel() & 0x7ff) << 16)
            }
            regs::FBI_INIT2 if self.init_enable.contains(InitEnable::REMAP_INIT_TO_DAC) => {
                u32::from(self.dac.read_result)
            }
            regs::FBI_PIXELS_IN..=regs::FBI_PIXELS_OUT => {
                self.update_statistics(true);
                self.regs[regnum] & 0x00ff_ffff
            }
            regs::FBI_TRIANGLES_OUT => self.regs[regnum] & 0x00ff_ffff,
            _ => self.regs[regnum],
        }
    }

    fn register_write(&mut self, offset: u32, data: u32) {
        let chips = decode::chip_select(offset) & self.chip_mask;
        let regnum = regs::write_target(offset, self.alt_regmap);
        if !regs::access(self.model, regnum).contains(RegAccess::WRITE) {
            tracing::warn!(reg = %RegName(regnum), data, "voodoo: write to read-only register dropped");
            return;
        }
        if self.fatal.is_some() && regs::is_command(regnum) {
            tracing::warn!(reg = %RegName(regnum), "voodoo: command dropped after fatal error");
            return;
        }
        tracing::trace!(reg = %RegName(regnum), chips, data, "voodoo: register write");

        if let Err(err) = self.dispatch_write(regnum, chips, data) {
            tracing::error!(reg = %RegName(regnum), %err, "voodoo: command failed");
            self.fatal = Some(err);
        }
    }

    fn dispatch_write(&mut self, regnum: usize, chips: u32, data: u32) -> Result<()> {
        let voodoo2 = self.model.is_voodoo2();
        let init_writes = self.init_enable.contains(InitEnable::ENABLE_INIT_WRITES);

        match regnum {
            regs::VERTEX_AX..=regs::VERTEX_CY | regs::F_VERTEX_AX..=regs::F_VERTEX_CY => {
                if chips & 1 != 0 {
                    let value = if regnum >= regs::F_VERTEX_AX {
                        float_to_int32(data, 4) as u32
                    } else {
                        data
                    };
                    let value = value as u16 as i16;
                    let fbi = &mut self.fbi;
                    match regnum & 0x1f {
                        regs::VERTEX_AX => fbi.ax = value,
                        regs::VERTEX_AY => fbi.ay = value,
                        regs::VERTEX_BX => fbi.bx = value,
                        regs::VERTEX_BY => fbi.by = value,
                        regs::VERTEX_CX => fbi.cx = value,
                        _ => fbi.cy = value,
                    }
                }
            }
            regs::START_R..=regs::D_W_DY | regs::F_START_R..=regs::F_D_W_DY => {
                self.write_iterator(regnum, chips, data);
            }

            regs::S_ARGB => {
                if chips & 1 != 0 {
                    let channel = |shift: u32| f32::from((data >> shift) as u8).to_bits();
                    self.regs[regs::S_ALPHA] = channel(24);
                    self.regs[regs::S_RED] = channel(16);
                    self.regs[regs::S_GREEN] = channel(8);
                    self.regs[regs::S_BLUE] = channel(0);
                }
            }

            regs::FBZ_COLOR_PATH | regs::FBZ_MODE | regs::FOG_MODE if !voodoo2 => {
                if chips & 1 != 0 {
                    let mask = match regnum {
                        regs::FBZ_COLOR_PATH => regs::V1_FBZ_COLOR_PATH_MASK,
                        regs::FBZ_MODE => regs::V1_FBZ_MODE_MASK,
                        _ => regs::V1_FOG_MODE_MASK,
                    };
                    self.regs[regnum] = data & mask;
                }
            }

            regs::TRIANGLE_CMD | regs::F_TRIANGLE_CMD => self.triangle()?,
            regs::S_BEGIN_TRI_CMD => self.begin_triangle(),
            regs::S_DRAW_TRI_CMD => self.draw_triangle()?,

            regs::NOP_CMD => {
                if data & 1 != 0 {
                    self.reset_counters();
                }
                if data & 2 != 0 {
                    self.regs[regs::FBI_TRIANGLES_OUT] = 0;
                }
            }
            regs::FASTFILL_CMD => {
                let pixel_regs = PixelRegs::latch(&self.regs[..REG_BANK_LEN]);
                let clip_left_right = self.regs[regs::CLIP_LEFT_RIGHT];
                let clip_low_y_high_y = self.regs[regs::CLIP_LOWY_HIGHY];
                self.fbi.fastfill(
                    &pixel_regs,
                    clip_left_right,
                    clip_low_y_high_y,
                    &mut self.stats[0],
                );
            }
            regs::SWAPBUFFER_CMD => {
                self.regs[regs::FBI_SWAP_HISTORY] <<= 4;
                self.fbi.swap_buffers(data, voodoo2);
                tracing::trace!(
                    front = self.fbi.front_buffer,
                    back = self.fbi.back_buffer,
                    "voodoo: swap"
                );
            }

            // Gamma correction is not modelled.
            regs::CLUT_DATA => {}
            regs::DAC_DATA => {
                if chips & 1 != 0 {
                    self.dac.data_write(data);
                }
            }

            regs::H_SYNC | regs::V_SYNC | regs::BACK_PORCH | regs::VIDEO_DIMENSIONS => {
                if chips & 1 != 0 {
                    self.regs[regnum] = data;
                    self.update_video_timing(regnum);
                }
            }

            regs::FBI_INIT0 => {
                if chips & 1 != 0 && init_writes {
                    self.regs[regnum] = data;
                    let init0 = FbiInit0(data);
                    self.output_on = init0.vga_passthru();
                    self.sink.set_enable(self.output_on);
                    if init0.graphics_reset() {
                        self.soft_reset();
                    }
                    self.recompute_video_memory();
                    tracing::debug!(output_on = self.output_on, "voodoo: fbiInit0");
                }
            }
            regs::FBI_INIT5 | regs::FBI_INIT6 if !voodoo2 => {}
            regs::FBI_INIT1 | regs::FBI_INIT2 | regs::FBI_INIT4 | regs::FBI_INIT5
            | regs::FBI_INIT6 => {
                if chips & 1 != 0 && init_writes {
                    self.regs[regnum] = data;
                    self.recompute_video_memory();
                }
            }
            regs::FBI_INIT3 => {
                if chips & 1 != 0 && init_writes {
                    self.regs[regnum] = data;
                    let init3 = FbiInit3(data);
                    self.alt_regmap = init3.tri_register_remap();
                    self.fbi.yorigin = init3.yorigin_subtract();
                    self.recompute_video_memory();
                }
            }

            _ if (regs::NCC_TABLE..regs::NCC_TABLE + regs::NCC_TABLE_LEN).contains(&regnum) => {
                let index = regnum - regs::NCC_TABLE;
                for tmu in &mut self.tmus {
                    if chips & (2 << tmu.index()) != 0 {
                        tmu.write_ncc(index / 12, index % 12, data);
                    }
                }
            }
            _ if (regs::FOG_TABLE..regs::FOG_TABLE + regs::FOG_TABLE_LEN).contains(&regnum) => {
                if chips & 1 != 0 {
                    self.fbi.fog.write(regnum - regs::FOG_TABLE, data);
                }
            }

            regs::TEXTURE_MODE..=regs::TEX_BASE_ADDR_3_8 => {
                for tmu in &mut self.tmus {
                    if chips & (2 << tmu.index()) != 0 {
                        self.regs[tmu.bank_base() + regnum] = data;
                        tmu.reg_dirty = true;
                    }
                }
            }

            regs::CLIP_LEFT_RIGHT | regs::CLIP_LOWY_HIGHY => {
                if chips & 1 != 0 {
                    self.regs[regnum] = data;
                }
            }

            regs::TREX_INIT1 => {
                self.send_config = TrexInit1(data).send_tmu_config();
                self.store_banks(regnum, chips, data);
            }
            _ => self.store_banks(regnum, chips, data),
        }
        Ok(())
    }

    /// Plain store into every addressed bank.
    fn store_banks(&mut self, regnum: usize, chips: u32, data: u32) {
        for bank in 0..4 {
            if chips & (1 << bank) != 0 {
                self.regs[bank * REG_BANK_LEN + regnum] = data;
            }
        }
    }

    /// Start/dX/dY of the R, G, B, Z, A, S, T and W iterators, integer or float form.
    fn write_iterator(&mut self, regnum: usize, chips: u32, data: u32) {
        let float = regnum >= regs::F_START_R;
        let index = (regnum & 0x1f) - regs::START_R;
        let (param, component) = (index % 8, index / 8);

        match param {
            // R, G, B, Z, A
            0..=4 => {
                if chips & 1 == 0 {
                    return;
                }
                let value = if float {
                    float_to_int32(data, 12)
                } else {
                    data as i32
                };
                let fbi = &mut self.fbi;
                match param {
                    3 => set_component(&mut fbi.z, component, value),
                    _ => {
                        let gradient = match param {
                            0 => &mut fbi.r,
                            1 => &mut fbi.g,
                            2 => &mut fbi.b,
                            _ => &mut fbi.a,
                        };
                        // Colors are 12.12 and sign-extended from 24 bits.
                        set_component(gradient, component, (value << 8) >> 8);
                    }
                }
            }
            // S, T
            5 | 6 => {
                let value = if float {
                    float_to_int64(data, 32)
                } else {
                    i64::from(data as i32) << 14
                };
                for tmu in &mut self.tmus {
                    if chips & (2 << tmu.index()) != 0 {
                        let gradient = if param == 5 { &mut tmu.s } else { &mut tmu.t };
                        set_component(gradient, component, value);
                    }
                }
            }
            // W
            _ => {
                let value = if float {
                    float_to_int64(data, 32)
                } else {
                    i64::from(data as i32) << 2
                };
                if chips & 1 != 0 {
                    set_component(&mut self.fbi.w, component, value);
                }
                for tmu in &mut self.tmus {
                    if chips & (2 << tmu.index()) != 0 {
                        set_component(&mut tmu.w, component, value);
                    }
                }
            }
        }
    }

    pub(crate) fn update_video_timing(&mut self, regnum: usize) {
        let hsync = self.regs[regs::H_SYNC];
        let vsync = self.regs[regs::V_SYNC];
        let back_porch = self.regs[regs::BACK_PORCH];
        let dims = self.regs[regs::VIDEO_DIMENSIONS];
        if hsync == 0 || vsync == 0 || dims == 0 {
            return;
        }

        let htotal = ((hsync >> 16) & 0x3ff) + 1 + (hsync & 0xff) + 1;
        let vtotal = ((vsync >> 16) & 0xfff) + (vsync & 0xfff);
        let hvis = dims & 0x3ff;
        let vvis = (dims >> 16) & 0x3ff;
        let hbp = (back_porch & 0xff) + 2;
        let vbp = (back_porch >> 16) & 0xff;

        let width = (hvis + 1) & !1;
        let height = (vvis + 1) & !1;
        if self.fbi.video_size() != (width, height) {
            self.fbi.width = width;
            self.fbi.height = height;
            self.sink.resize(width, height);
        }

        let pixel_clock = if height <= 480 {
            25_175_000.0
        } else if height <= 600 {
            40_000_000.0
        } else {
            65_000_000.0
        };
        self.timing.set_pixel_clock(pixel_clock);
        self.timing
            .set_horizontal_range(hvis + 1, hvis + 1, htotal.saturating_sub(hbp), htotal);
        self.timing
            .set_vertical_range(vvis + 1, vvis + 1, vtotal.saturating_sub(vbp), vtotal);

        if self.timing.is_valid() {
            let hz = self.timing.vertical_frequency();
            self.timing.set_retrace_frequency(hz);
            self.timing.set_retrace_active(self.clock_enabled);
            if self.clock_enabled {
                self.timing.reset_clock();
            }
        } else {
            self.timing.set_retrace_active(false);
        }

        tracing::debug!(
            width,
            height,
            htotal,
            vtotal,
            hz = self.timing.vertical_frequency(),
            "voodoo: video timing"
        );

        if regnum == regs::VIDEO_DIMENSIONS {
            self.recompute_video_memory();
        }
    }

    fn texture_write(&mut self, tmu: usize, offset: u32, data: u32) {
        if self.chip_mask & (2 << tmu) == 0 {
            tracing::trace!(tmu, offset, "voodoo: write to absent TMU dropped");
            return;
        }
        let seq_8_download =
            TextureMode(self.regs[REG_BANK_LEN + regs::TEXTURE_MODE]).seq_8_downld();
        let Self { regs, tmus, .. } = self;
        let unit = &mut tmus[tmu];
        let bank = unit.bank(regs);
        unit.write_texture(bank, offset, data, seq_8_download);
    }
}
