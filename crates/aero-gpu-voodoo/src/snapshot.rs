use std::io::{Cursor, Read};

use crate::config::VoodooModel;
use crate::device::VoodooDevice;
use crate::error::{Result, VoodooError};
use crate::regs::{self, InitEnable, REG_FILE_LEN};
use crate::setup::SetupVertex;

const VOODOO_SNAPSHOT_V1_MAX_RAM_LEN: u32 = 16 * 1024 * 1024;

fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_bool<R: Read>(r: &mut R) -> Result<bool> {
    match read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(VoodooError::CorruptSnapshot("invalid bool")),
    }
}

fn read_u16_le<R: Read>(r: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32_le<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_array<const N: usize, R: Read>(r: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_words<const N: usize, R: Read>(r: &mut R) -> Result<[u32; N]> {
    let mut words = [0u32; N];
    for word in &mut words {
        *word = read_u32_le(r)?;
    }
    Ok(words)
}

fn read_ram<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = read_u32_le(r)?;
    if len > VOODOO_SNAPSHOT_V1_MAX_RAM_LEN {
        return Err(VoodooError::CorruptSnapshot("memory image too large"));
    }
    let mut ram = vec![0u8; len as usize];
    r.read_exact(&mut ram)?;
    Ok(ram)
}

fn write_words(out: &mut Vec<u8>, words: &[u32]) {
    for word in words {
        out.extend_from_slice(&word.to_le_bytes());
    }
}

fn write_ram(out: &mut Vec<u8>, ram: &[u8]) {
    let len: u32 = ram
        .len()
        .try_into()
        .unwrap_or(VOODOO_SNAPSHOT_V1_MAX_RAM_LEN);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(ram);
}

fn vertex_words(v: &SetupVertex) -> [u32; 14] {
    [
        v.x, v.y, v.z, v.wb, v.r, v.g, v.b, v.a, v.w0, v.s0, v.t0, v.w1, v.s1, v.t1,
    ]
    .map(f32::to_bits)
}

fn vertex_from_words(w: &[u32; 14]) -> SetupVertex {
    let f = |i: usize| f32::from_bits(w[i]);
    SetupVertex {
        x: f(0),
        y: f(1),
        z: f(2),
        wb: f(3),
        r: f(4),
        g: f(5),
        b: f(6),
        a: f(7),
        w0: f(8),
        s0: f(9),
        t0: f(10),
        w1: f(11),
        s1: f(12),
        t1: f(13),
    }
}

/// Per-TMU part of [`VoodooSnapshotV1`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuSnapshotV1 {
    pub palette: Vec<u32>,
    /// Voodoo2 only.
    pub palette_alpha: Option<Vec<u32>>,
    /// Source registers of both NCC tables.
    pub ncc: [[u32; 12]; 2],
    pub ram: Vec<u8>,
}

/// Save-state payload for [`VoodooDevice`] (version 1).
///
/// Derived state (surface layout, LOD parameters, NCC lookups and the rasterizer cache) is not
/// stored; it is rebuilt on restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoodooSnapshotV1 {
    pub model: VoodooModel,
    pub regs: Vec<u32>,

    pub chip_mask: u8,
    pub alt_regmap: bool,
    pub yorigin: u32,
    pub init_enable: u32,
    pub output_on: bool,
    pub clock_enabled: bool,

    pub dac_regs: [u8; 8],
    pub dac_read_result: u8,

    pub front_buffer: u8,
    pub back_buffer: u8,
    pub fog_blend: [u8; 64],
    pub fog_delta: [u8; 64],

    /// Triangle setup vertices as raw `f32` bits.
    pub setup_vertices: [[u32; 14]; 3],
    pub setup_vertex_count: u32,

    pub tmus: Vec<TmuSnapshotV1>,
    pub fb_ram: Vec<u8>,
}

impl VoodooSnapshotV1 {
    pub const VERSION: u16 = 1;

    /// Decode a payload produced by [`VoodooSnapshotV1::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(bytes);

        let version = read_u16_le(&mut r)?;
        if version != Self::VERSION {
            return Err(VoodooError::UnsupportedSnapshotVersion(version));
        }
        let model = VoodooModel::from_u8(read_u8(&mut r)?)
            .ok_or(VoodooError::CorruptSnapshot("unknown model"))?;

        let reg_count = read_u32_le(&mut r)?;
        if reg_count as usize != REG_FILE_LEN {
            return Err(VoodooError::CorruptSnapshot("register file length"));
        }
        let mut regs = vec![0u32; REG_FILE_LEN];
        for reg in &mut regs {
            *reg = read_u32_le(&mut r)?;
        }

        let chip_mask = read_u8(&mut r)?;
        let alt_regmap = read_bool(&mut r)?;
        let yorigin = read_u32_le(&mut r)?;
        let init_enable = read_u32_le(&mut r)?;
        let output_on = read_bool(&mut r)?;
        let clock_enabled = read_bool(&mut r)?;

        let dac_regs = read_array::<8, _>(&mut r)?;
        let dac_read_result = read_u8(&mut r)?;

        let front_buffer = read_u8(&mut r)?;
        let back_buffer = read_u8(&mut r)?;
        if front_buffer > 2 || back_buffer > 2 {
            return Err(VoodooError::CorruptSnapshot("buffer index out of range"));
        }
        let fog_blend = read_array::<64, _>(&mut r)?;
        let fog_delta = read_array::<64, _>(&mut r)?;

        let mut setup_vertices = [[0u32; 14]; 3];
        for vertex in &mut setup_vertices {
            *vertex = read_words::<14, _>(&mut r)?;
        }
        let setup_vertex_count = read_u32_le(&mut r)?;

        let tmu_count = read_u8(&mut r)?;
        if usize::from(tmu_count) != model.tmu_count() {
            return Err(VoodooError::CorruptSnapshot("TMU count does not match model"));
        }
        let mut tmus = Vec::with_capacity(tmu_count.into());
        for _ in 0..tmu_count {
            let palette = read_words::<256, _>(&mut r)?.to_vec();
            let palette_alpha = if read_bool(&mut r)? {
                Some(read_words::<256, _>(&mut r)?.to_vec())
            } else {
                None
            };
            let ncc = [read_words::<12, _>(&mut r)?, read_words::<12, _>(&mut r)?];
            let ram = read_ram(&mut r)?;
            tmus.push(TmuSnapshotV1 {
                palette,
                palette_alpha,
                ncc,
                ram,
            });
        }

        let fb_ram = read_ram(&mut r)?;

        Ok(Self {
            model,
            regs,
            chip_mask,
            alt_regmap,
            yorigin,
            init_enable,
            output_on,
            clock_enabled,
            dac_regs,
            dac_read_result,
            front_buffer,
            back_buffer,
            fog_blend,
            fog_delta,
            setup_vertices,
            setup_vertex_count,
            tmus,
            fb_ram,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let ram_len: usize = self.fb_ram.len() + self.tmus.iter().map(|t| t.ram.len()).sum::<usize>();
        let mut out = Vec::with_capacity(ram_len + 8 * 1024);

        out.extend_from_slice(&Self::VERSION.to_le_bytes());
        out.push(self.model.to_u8());
        out.extend_from_slice(&(self.regs.len() as u32).to_le_bytes());
        write_words(&mut out, &self.regs);

        out.push(self.chip_mask);
        out.push(self.alt_regmap as u8);
        out.extend_from_slice(&self.yorigin.to_le_bytes());
        out.extend_from_slice(&self.init_enable.to_le_bytes());
        out.push(self.output_on as u8);
        out.push(self.clock_enabled as u8);

        out.extend_from_slice(&self.dac_regs);
        out.push(self.dac_read_result);

        out.push(self.front_buffer);
        out.push(self.back_buffer);
        out.extend_from_slice(&self.fog_blend);
        out.extend_from_slice(&self.fog_delta);

        for vertex in &self.setup_vertices {
            write_words(&mut out, vertex);
        }
        out.extend_from_slice(&self.setup_vertex_count.to_le_bytes());

        out.push(self.tmus.len() as u8);
        for tmu in &self.tmus {
            write_words(&mut out, &tmu.palette);
            match &tmu.palette_alpha {
                Some(palette_alpha) => {
                    out.push(1);
                    write_words(&mut out, palette_alpha);
                }
                None => out.push(0),
            }
            write_words(&mut out, &tmu.ncc[0]);
            write_words(&mut out, &tmu.ncc[1]);
            write_ram(&mut out, &tmu.ram);
        }

        write_ram(&mut out, &self.fb_ram);
        out
    }
}

impl VoodooDevice {
    /// Capture the full device state (v1), including frame buffer and texture memory.
    pub fn snapshot_v1(&self) -> VoodooSnapshotV1 {
        let fbi = &self.fbi;
        VoodooSnapshotV1 {
            model: self.model(),
            regs: self.regs.clone(),
            chip_mask: self.chip_mask as u8,
            alt_regmap: self.alt_regmap,
            yorigin: fbi.yorigin,
            init_enable: self.init_enable.bits(),
            output_on: self.output_on,
            clock_enabled: self.clock_enabled,
            dac_regs: self.dac.regs,
            dac_read_result: self.dac.read_result,
            front_buffer: fbi.front_buffer as u8,
            back_buffer: fbi.back_buffer as u8,
            fog_blend: fbi.fog.blend,
            fog_delta: fbi.fog.delta,
            setup_vertices: std::array::from_fn(|i| vertex_words(&fbi.svert[i])),
            setup_vertex_count: fbi.sverts,
            tmus: self
                .tmus
                .iter()
                .map(|tmu| TmuSnapshotV1 {
                    palette: tmu.palette.to_vec(),
                    palette_alpha: tmu.palette_alpha.as_deref().map(|p| p.to_vec()),
                    ncc: [*tmu.ncc[0].regs(), *tmu.ncc[1].regs()],
                    ram: tmu.ram.clone(),
                })
                .collect(),
            fb_ram: fbi.ram.clone(),
        }
    }

    /// Restore a snapshot taken from a device with the same model and memory sizes.
    pub fn restore_snapshot_v1(&mut self, snap: &VoodooSnapshotV1) -> Result<()> {
        if snap.model != self.model() {
            return Err(VoodooError::ModelMismatch {
                expected: self.model(),
                found: snap.model,
            });
        }
        if snap.regs.len() != REG_FILE_LEN {
            return Err(VoodooError::CorruptSnapshot("register file length"));
        }
        if snap.fb_ram.len() != self.fbi.ram.len() {
            return Err(VoodooError::CorruptSnapshot("frame buffer size mismatch"));
        }
        if snap.tmus.len() != self.tmus.len() {
            return Err(VoodooError::CorruptSnapshot("TMU count mismatch"));
        }
        for (tmu, saved) in self.tmus.iter().zip(&snap.tmus) {
            if saved.ram.len() != tmu.ram.len() || saved.palette.len() != 256 {
                return Err(VoodooError::CorruptSnapshot("texture memory size mismatch"));
            }
            if saved.palette_alpha.as_ref().is_some_and(|p| p.len() != 256) {
                return Err(VoodooError::CorruptSnapshot("alpha palette length"));
            }
        }
        if snap.front_buffer > 2 || snap.back_buffer > 2 {
            return Err(VoodooError::CorruptSnapshot("buffer index out of range"));
        }

        self.regs.copy_from_slice(&snap.regs);
        self.chip_mask = u32::from(snap.chip_mask);
        self.alt_regmap = snap.alt_regmap;
        self.init_enable = InitEnable::from_bits_retain(snap.init_enable);
        self.send_config = regs::TrexInit1(self.regs[regs::REG_BANK_LEN + regs::TREX_INIT1])
            .send_tmu_config();
        self.dac.regs = snap.dac_regs;
        self.dac.read_result = snap.dac_read_result;

        let fbi = &mut self.fbi;
        fbi.ram.copy_from_slice(&snap.fb_ram);
        fbi.yorigin = snap.yorigin;
        fbi.front_buffer = usize::from(snap.front_buffer);
        fbi.back_buffer = usize::from(snap.back_buffer);
        fbi.fog.blend = snap.fog_blend;
        fbi.fog.delta = snap.fog_delta;
        fbi.svert = std::array::from_fn(|i| vertex_from_words(&snap.setup_vertices[i]));
        fbi.sverts = snap.setup_vertex_count;
        fbi.lfb_stats.take();

        for (tmu, saved) in self.tmus.iter_mut().zip(&snap.tmus) {
            tmu.ram.copy_from_slice(&saved.ram);
            tmu.palette.copy_from_slice(&saved.palette);
            if let (Some(dst), Some(src)) = (tmu.palette_alpha.as_deref_mut(), &saved.palette_alpha)
            {
                dst.copy_from_slice(src);
            }
            tmu.ncc[0].load(&saved.ncc[0]);
            tmu.ncc[1].load(&saved.ncc[1]);
            tmu.reg_dirty = true;
        }

        for stats in &mut self.stats {
            stats.take();
        }
        self.raster.clear();
        self.fatal = None;

        self.output_on = snap.output_on;
        self.sink.set_enable(self.output_on);
        self.clock_enabled = snap.clock_enabled;
        self.timing.set_clock_enable(self.clock_enabled);
        self.update_video_timing(regs::VIDEO_DIMENSIONS);
        self.recompute_video_memory();

        tracing::debug!(model = ?self.model(), "voodoo: snapshot restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoodooConfig;
    use crate::display::HeadlessDisplay;
    use pretty_assertions::assert_eq;

    fn device(model: VoodooModel) -> VoodooDevice {
        let display = HeadlessDisplay::new();
        VoodooDevice::new(
            VoodooConfig::for_model(model),
            Box::new(display.clone()),
            Box::new(display),
        )
        .unwrap()
    }

    #[test]
    fn encode_decode_preserves_state() {
        let mut dev = device(VoodooModel::Voodoo2);
        dev.set_init_enable(InitEnable::ENABLE_INIT_WRITES);
        dev.mmio_write(regs::COLOR1 as u32, 0x00ff_8000, !0);
        dev.mmio_write(regs::FOG_TABLE as u32 + 3, 0x0403_0201, !0);
        dev.mmio_write((0x4 << 8) | (regs::NCC_TABLE as u32 + 2), 0x1234_5678, !0);
        dev.fbi.ram[100] = 0xab;
        dev.tmus[1].ram[7] = 0xcd;

        let snap = dev.snapshot_v1();
        let bytes = snap.encode();
        let decoded = VoodooSnapshotV1::decode(&bytes).unwrap();
        assert_eq!(decoded, snap);
        assert_eq!(decoded.tmus[1].ncc[0][2], 0x1234_5678);
        assert!(decoded.tmus[0].palette_alpha.is_some());

        let mut restored = device(VoodooModel::Voodoo2);
        restored.restore_snapshot_v1(&decoded).unwrap();
        assert_eq!(restored.reg(regs::COLOR1), 0x00ff_8000);
        assert_eq!(restored.fbi().fog.read(3), 0x0403_0201);
        assert_eq!(restored.fbi().ram()[100], 0xab);
        assert_eq!(restored.tmus()[1].ram()[7], 0xcd);
        assert_eq!(restored.init_enable(), InitEnable::ENABLE_INIT_WRITES);
        assert_eq!(restored.snapshot_v1(), snap);
    }

    #[test]
    fn model_mismatch_is_rejected() {
        let snap = device(VoodooModel::Voodoo1).snapshot_v1();
        let err = device(VoodooModel::Voodoo2)
            .restore_snapshot_v1(&snap)
            .unwrap_err();
        assert!(matches!(
            err,
            VoodooError::ModelMismatch {
                expected: VoodooModel::Voodoo2,
                found: VoodooModel::Voodoo1
            }
        ));
    }

    #[test]
    fn decode_rejects_bad_payloads() {
        let bytes = device(VoodooModel::Voodoo1).snapshot_v1().encode();

        let mut bad_version = bytes.clone();
        bad_version[0] = 9;
        assert!(matches!(
            VoodooSnapshotV1::decode(&bad_version),
            Err(VoodooError::UnsupportedSnapshotVersion(9))
        ));

        let mut bad_model = bytes.clone();
        bad_model[2] = 0;
        assert!(matches!(
            VoodooSnapshotV1::decode(&bad_model),
            Err(VoodooError::CorruptSnapshot(_))
        ));

        assert!(matches!(
            VoodooSnapshotV1::decode(&bytes[..bytes.len() - 1]),
            Err(VoodooError::Io(_))
        ));
    }
}
