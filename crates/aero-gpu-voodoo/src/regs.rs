//! Register file layout: indices, access rights, the alternate triangle register map, debug names
//! and typed views over the mode registers.
//!
//! Register indices are dword indices within a 0x100-entry bank. Bank 0 is the FBI, banks 1 and 2
//! are TMU0/TMU1; the chip-select nibble of a write address picks which banks receive it.

use bitflags::bitflags;

use crate::config::VoodooModel;

pub const REG_BANK_LEN: usize = 0x100;
pub const REG_FILE_LEN: usize = 4 * REG_BANK_LEN;

pub const STATUS: usize = 0x00;
pub const INTR_CTRL: usize = 0x01;
pub const VERTEX_AX: usize = 0x02;
pub const VERTEX_AY: usize = 0x03;
pub const VERTEX_BX: usize = 0x04;
pub const VERTEX_BY: usize = 0x05;
pub const VERTEX_CX: usize = 0x06;
pub const VERTEX_CY: usize = 0x07;
pub const START_R: usize = 0x08;
pub const START_G: usize = 0x09;
pub const START_B: usize = 0x0a;
pub const START_Z: usize = 0x0b;
pub const START_A: usize = 0x0c;
pub const START_S: usize = 0x0d;
pub const START_T: usize = 0x0e;
pub const START_W: usize = 0x0f;
pub const D_R_DX: usize = 0x10;
pub const D_G_DX: usize = 0x11;
pub const D_B_DX: usize = 0x12;
pub const D_Z_DX: usize = 0x13;
pub const D_A_DX: usize = 0x14;
pub const D_S_DX: usize = 0x15;
pub const D_T_DX: usize = 0x16;
pub const D_W_DX: usize = 0x17;
pub const D_R_DY: usize = 0x18;
pub const D_G_DY: usize = 0x19;
pub const D_B_DY: usize = 0x1a;
pub const D_Z_DY: usize = 0x1b;
pub const D_A_DY: usize = 0x1c;
pub const D_S_DY: usize = 0x1d;
pub const D_T_DY: usize = 0x1e;
pub const D_W_DY: usize = 0x1f;
pub const TRIANGLE_CMD: usize = 0x20;
pub const F_VERTEX_AX: usize = 0x22;
pub const F_VERTEX_AY: usize = 0x23;
pub const F_VERTEX_BX: usize = 0x24;
pub const F_VERTEX_BY: usize = 0x25;
pub const F_VERTEX_CX: usize = 0x26;
pub const F_VERTEX_CY: usize = 0x27;
pub const F_START_R: usize = 0x28;
pub const F_START_G: usize = 0x29;
pub const F_START_B: usize = 0x2a;
pub const F_START_Z: usize = 0x2b;
pub const F_START_A: usize = 0x2c;
pub const F_START_S: usize = 0x2d;
pub const F_START_T: usize = 0x2e;
pub const F_START_W: usize = 0x2f;
pub const F_D_R_DX: usize = 0x30;
pub const F_D_G_DX: usize = 0x31;
pub const F_D_B_DX: usize = 0x32;
pub const F_D_Z_DX: usize = 0x33;
pub const F_D_A_DX: usize = 0x34;
pub const F_D_S_DX: usize = 0x35;
pub const F_D_T_DX: usize = 0x36;
pub const F_D_W_DX: usize = 0x37;
pub const F_D_R_DY: usize = 0x38;
pub const F_D_G_DY: usize = 0x39;
pub const F_D_B_DY: usize = 0x3a;
pub const F_D_Z_DY: usize = 0x3b;
pub const F_D_A_DY: usize = 0x3c;
pub const F_D_S_DY: usize = 0x3d;
pub const F_D_T_DY: usize = 0x3e;
pub const F_D_W_DY: usize = 0x3f;
pub const F_TRIANGLE_CMD: usize = 0x40;
pub const FBZ_COLOR_PATH: usize = 0x41;
pub const FOG_MODE: usize = 0x42;
pub const ALPHA_MODE: usize = 0x43;
pub const FBZ_MODE: usize = 0x44;
pub const LFB_MODE: usize = 0x45;
pub const CLIP_LEFT_RIGHT: usize = 0x46;
pub const CLIP_LOWY_HIGHY: usize = 0x47;
pub const NOP_CMD: usize = 0x48;
pub const FASTFILL_CMD: usize = 0x49;
pub const SWAPBUFFER_CMD: usize = 0x4a;
pub const FOG_COLOR: usize = 0x4b;
pub const ZA_COLOR: usize = 0x4c;
pub const CHROMA_KEY: usize = 0x4d;
pub const CHROMA_RANGE: usize = 0x4e;
pub const USER_INTR_CMD: usize = 0x4f;
pub const STIPPLE: usize = 0x50;
pub const COLOR0: usize = 0x51;
pub const COLOR1: usize = 0x52;
pub const FBI_PIXELS_IN: usize = 0x53;
pub const FBI_CHROMA_FAIL: usize = 0x54;
pub const FBI_ZFUNC_FAIL: usize = 0x55;
pub const FBI_AFUNC_FAIL: usize = 0x56;
pub const FBI_PIXELS_OUT: usize = 0x57;
/// First of 32 fog table registers, each packing two blend/delta pairs.
pub const FOG_TABLE: usize = 0x58;
pub const FOG_TABLE_LEN: usize = 32;
pub const CMD_FIFO_BASE_ADDR: usize = 0x78;
pub const CMD_FIFO_HOLES: usize = 0x7e;
pub const FBI_INIT4: usize = 0x80;
pub const V_RETRACE: usize = 0x81;
pub const BACK_PORCH: usize = 0x82;
pub const VIDEO_DIMENSIONS: usize = 0x83;
pub const FBI_INIT0: usize = 0x84;
pub const FBI_INIT1: usize = 0x85;
pub const FBI_INIT2: usize = 0x86;
pub const FBI_INIT3: usize = 0x87;
pub const H_SYNC: usize = 0x88;
pub const V_SYNC: usize = 0x89;
pub const CLUT_DATA: usize = 0x8a;
pub const DAC_DATA: usize = 0x8b;
pub const MAX_RGB_DELTA: usize = 0x8c;
pub const H_BORDER: usize = 0x8d;
pub const V_BORDER: usize = 0x8e;
pub const BORDER_COLOR: usize = 0x8f;
pub const HV_RETRACE: usize = 0x90;
pub const FBI_INIT5: usize = 0x91;
pub const FBI_INIT6: usize = 0x92;
pub const FBI_INIT7: usize = 0x93;
pub const FBI_SWAP_HISTORY: usize = 0x96;
pub const FBI_TRIANGLES_OUT: usize = 0x97;
pub const S_SETUP_MODE: usize = 0x98;
pub const S_VX: usize = 0x99;
pub const S_VY: usize = 0x9a;
pub const S_ARGB: usize = 0x9b;
pub const S_RED: usize = 0x9c;
pub const S_GREEN: usize = 0x9d;
pub const S_BLUE: usize = 0x9e;
pub const S_ALPHA: usize = 0x9f;
pub const S_VZ: usize = 0xa0;
pub const S_WB: usize = 0xa1;
pub const S_WTMU0: usize = 0xa2;
pub const S_S_W0: usize = 0xa3;
pub const S_T_W0: usize = 0xa4;
pub const S_WTMU1: usize = 0xa5;
pub const S_S_WTMU1: usize = 0xa6;
pub const S_T_WTMU1: usize = 0xa7;
pub const S_DRAW_TRI_CMD: usize = 0xa8;
pub const S_BEGIN_TRI_CMD: usize = 0xa9;
pub const BLT_SRC_BASE_ADDR: usize = 0xb0;
pub const BLT_DATA: usize = 0xbf;
pub const TEXTURE_MODE: usize = 0xc0;
pub const T_LOD: usize = 0xc1;
pub const T_DETAIL: usize = 0xc2;
pub const TEX_BASE_ADDR: usize = 0xc3;
pub const TEX_BASE_ADDR_1: usize = 0xc4;
pub const TEX_BASE_ADDR_2: usize = 0xc5;
pub const TEX_BASE_ADDR_3_8: usize = 0xc6;
pub const TREX_INIT0: usize = 0xc7;
pub const TREX_INIT1: usize = 0xc8;
/// First of 24 NCC registers: table 0 occupies `+0..12`, table 1 `+12..24`.
pub const NCC_TABLE: usize = 0xc9;
pub const NCC_TABLE_LEN: usize = 24;

/// Voodoo1 register widths for mode registers that grew on Voodoo2.
pub const V1_FBZ_COLOR_PATH_MASK: u32 = 0x0fff_ffff;
pub const V1_FOG_MODE_MASK: u32 = 0x0000_003f;
pub const V1_FBZ_MODE_MASK: u32 = 0x001f_ffff;

bitflags! {
    /// Per-register access rights.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct RegAccess: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const PIPELINED = 1 << 2;
        const FIFO = 1 << 3;
        const WRITE_THRU = 1 << 4;
    }
}

bitflags! {
    /// PCI configuration `initEnable` register (config offset 0x40).
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct InitEnable: u32 {
        const ENABLE_INIT_WRITES = 1 << 0;
        const ENABLE_FIFO_WRITES = 1 << 1;
        const REMAP_INIT_TO_DAC = 1 << 2;
        const _ = !0;
    }
}

const R: u8 = RegAccess::READ.bits();
const W: u8 = RegAccess::WRITE.bits();
const P: u8 = RegAccess::PIPELINED.bits();
const F: u8 = RegAccess::FIFO.bits();
const T: u8 = RegAccess::WRITE_THRU.bits();

const fn fill(mut table: [u8; REG_BANK_LEN], lo: usize, hi: usize, v: u8) -> [u8; REG_BANK_LEN] {
    let mut i = lo;
    while i <= hi {
        table[i] = v;
        i += 1;
    }
    table
}

const fn common_access() -> [u8; REG_BANK_LEN] {
    let t = [0u8; REG_BANK_LEN];
    let t = fill(t, STATUS, STATUS, R | P);
    let t = fill(t, VERTEX_AX, D_W_DY, W | P | F);
    let t = fill(t, TRIANGLE_CMD, TRIANGLE_CMD, W | P | F);
    let t = fill(t, F_VERTEX_AX, F_TRIANGLE_CMD, W | P | F);
    let t = fill(t, FBZ_COLOR_PATH, ALPHA_MODE, R | W | P | F);
    let t = fill(t, FBZ_MODE, CLIP_LOWY_HIGHY, R | W | F);
    let t = fill(t, NOP_CMD, CHROMA_KEY, W | F);
    let t = fill(t, STIPPLE, COLOR1, R | W | F);
    let t = fill(t, FBI_PIXELS_IN, FBI_PIXELS_OUT, R);
    let t = fill(t, FOG_TABLE, FOG_TABLE + FOG_TABLE_LEN - 1, W | F);
    let t = fill(t, TEXTURE_MODE, TEX_BASE_ADDR_3_8, W | P | F);
    fill(t, TREX_INIT0, NCC_TABLE + NCC_TABLE_LEN - 1, W | F)
}

const fn voodoo1_access() -> [u8; REG_BANK_LEN] {
    let t = common_access();
    let t = fill(t, FBI_INIT4, FBI_INIT4, R | W);
    let t = fill(t, V_RETRACE, V_RETRACE, R);
    let t = fill(t, BACK_PORCH, FBI_INIT3, R | W);
    fill(t, H_SYNC, MAX_RGB_DELTA, W)
}

const fn voodoo2_access() -> [u8; REG_BANK_LEN] {
    let t = common_access();
    let t = fill(t, INTR_CTRL, INTR_CTRL, R | W | P | T);
    let t = fill(t, CHROMA_RANGE, USER_INTR_CMD, W | F);
    let t = fill(t, CMD_FIFO_BASE_ADDR, CMD_FIFO_HOLES, R | W | T);
    let t = fill(t, CMD_FIFO_HOLES + 1, CMD_FIFO_HOLES + 1, R | W);
    let t = fill(t, FBI_INIT4, FBI_INIT4, R | W | T);
    let t = fill(t, V_RETRACE, V_RETRACE, R);
    let t = fill(t, BACK_PORCH, FBI_INIT3, R | W | T);
    let t = fill(t, H_SYNC, BORDER_COLOR, W | T);
    let t = fill(t, CLUT_DATA, CLUT_DATA, W | F);
    let t = fill(t, HV_RETRACE, HV_RETRACE, R);
    let t = fill(t, FBI_INIT5, FBI_INIT7, R | W | T);
    let t = fill(t, FBI_SWAP_HISTORY, FBI_TRIANGLES_OUT, R);
    let t = fill(t, S_SETUP_MODE, S_BEGIN_TRI_CMD, W | P | F);
    let t = fill(t, BLT_SRC_BASE_ADDR, BLT_DATA - 1, R | W | P | F);
    fill(t, BLT_DATA, BLT_DATA, W | P | F)
}

static VOODOO1_ACCESS: [u8; REG_BANK_LEN] = voodoo1_access();
static VOODOO2_ACCESS: [u8; REG_BANK_LEN] = voodoo2_access();

/// Access rights of `reg` (index within a bank) for the given chip generation.
pub fn access(model: VoodooModel, reg: usize) -> RegAccess {
    let table = if model.is_voodoo2() {
        &VOODOO2_ACCESS
    } else {
        &VOODOO1_ACCESS
    };
    RegAccess::from_bits_truncate(table[reg & (REG_BANK_LEN - 1)])
}

/// Alternate ordering of the first 64 registers, enabled by `fbiInit3` bit 0. Each parameter's
/// start, dX and dY become adjacent.
static ALIAS_MAP: [u8; 0x40] = [
    STATUS as u8, INTR_CTRL as u8, VERTEX_AX as u8, VERTEX_AY as u8, VERTEX_BX as u8,
    VERTEX_BY as u8, VERTEX_CX as u8, VERTEX_CY as u8, START_R as u8, D_R_DX as u8,
    D_R_DY as u8, START_G as u8, D_G_DX as u8, D_G_DY as u8, START_B as u8, D_B_DX as u8,
    D_B_DY as u8, START_Z as u8, D_Z_DX as u8, D_Z_DY as u8, START_A as u8, D_A_DX as u8,
    D_A_DY as u8, START_S as u8, D_S_DX as u8, D_S_DY as u8, START_T as u8, D_T_DX as u8,
    D_T_DY as u8, START_W as u8, D_W_DX as u8, D_W_DY as u8,
    TRIANGLE_CMD as u8, 0x21, F_VERTEX_AX as u8, F_VERTEX_AY as u8, F_VERTEX_BX as u8,
    F_VERTEX_BY as u8, F_VERTEX_CX as u8, F_VERTEX_CY as u8, F_START_R as u8, F_D_R_DX as u8,
    F_D_R_DY as u8, F_START_G as u8, F_D_G_DX as u8, F_D_G_DY as u8, F_START_B as u8,
    F_D_B_DX as u8, F_D_B_DY as u8, F_START_Z as u8, F_D_Z_DX as u8, F_D_Z_DY as u8,
    F_START_A as u8, F_D_A_DX as u8, F_D_A_DY as u8, F_START_S as u8, F_D_S_DX as u8,
    F_D_S_DY as u8, F_START_T as u8, F_D_T_DX as u8, F_D_T_DY as u8, F_START_W as u8,
    F_D_W_DX as u8, F_D_W_DY as u8,
];

/// Register index addressed by a write to dword `offset` in register space.
pub fn write_target(offset: u32, alt_regmap: bool) -> usize {
    if alt_regmap && offset & 0x800c0 == 0x80000 {
        ALIAS_MAP[(offset & 0x3f) as usize] as usize
    } else {
        (offset & 0xff) as usize
    }
}

/// Registers whose write starts work in the command engine rather than storing state.
pub fn is_command(reg: usize) -> bool {
    matches!(
        reg,
        TRIANGLE_CMD
            | F_TRIANGLE_CMD
            | NOP_CMD
            | FASTFILL_CMD
            | SWAPBUFFER_CMD
            | S_DRAW_TRI_CMD
            | S_BEGIN_TRI_CMD
    )
}

static REG_NAMES: [&str; NCC_TABLE + NCC_TABLE_LEN] = [
    "status", "{intrCtrl}", "vertexAx", "vertexAy", "vertexBx", "vertexBy", "vertexCx",
    "vertexCy", "startR", "startG", "startB", "startZ", "startA", "startS", "startT", "startW",
    "dRdX", "dGdX", "dBdX", "dZdX", "dAdX", "dSdX", "dTdX", "dWdX", "dRdY", "dGdY", "dBdY",
    "dZdY", "dAdY", "dSdY", "dTdY", "dWdY",
    "triangleCMD", "reserved084", "fvertexAx", "fvertexAy", "fvertexBx", "fvertexBy",
    "fvertexCx", "fvertexCy", "fstartR", "fstartG", "fstartB", "fstartZ", "fstartA", "fstartS",
    "fstartT", "fstartW",
    "fdRdX", "fdGdX", "fdBdX", "fdZdX", "fdAdX", "fdSdX", "fdTdX", "fdWdX", "fdRdY", "fdGdY",
    "fdBdY", "fdZdY", "fdAdY", "fdSdY", "fdTdY", "fdWdY",
    "ftriangleCMD", "fbzColorPath", "fogMode", "alphaMode", "fbzMode", "lfbMode",
    "clipLeftRight", "clipLowYHighY", "nopCMD", "fastfillCMD", "swapbufferCMD", "fogColor",
    "zaColor", "chromaKey", "{chromaRange}", "{userIntrCMD}",
    "stipple", "color0", "color1", "fbiPixelsIn", "fbiChromaFail", "fbiZfuncFail",
    "fbiAfuncFail", "fbiPixelsOut", "fogTable160", "fogTable164", "fogTable168", "fogTable16c",
    "fogTable170", "fogTable174", "fogTable178", "fogTable17c",
    "fogTable180", "fogTable184", "fogTable188", "fogTable18c", "fogTable190", "fogTable194",
    "fogTable198", "fogTable19c", "fogTable1a0", "fogTable1a4", "fogTable1a8", "fogTable1ac",
    "fogTable1b0", "fogTable1b4", "fogTable1b8", "fogTable1bc",
    "fogTable1c0", "fogTable1c4", "fogTable1c8", "fogTable1cc", "fogTable1d0", "fogTable1d4",
    "fogTable1d8", "fogTable1dc", "{cmdFifoBaseAddr}", "{cmdFifoBump}", "{cmdFifoRdPtr}",
    "{cmdFifoAMin}", "{cmdFifoAMax}", "{cmdFifoDepth}", "{cmdFifoHoles}", "reserved1fc",
    "fbiInit4", "vRetrace", "backPorch", "videoDimensions", "fbiInit0", "fbiInit1", "fbiInit2",
    "fbiInit3", "hSync", "vSync", "clutData", "dacData", "maxRgbDelta", "{hBorder}",
    "{vBorder}", "{borderColor}",
    "{hvRetrace}", "{fbiInit5}", "{fbiInit6}", "{fbiInit7}", "reserved250", "reserved254",
    "{fbiSwapHistory}", "{fbiTrianglesOut}", "{sSetupMode}", "{sVx}", "{sVy}", "{sARGB}",
    "{sRed}", "{sGreen}", "{sBlue}", "{sAlpha}",
    "{sVz}", "{sWb}", "{sWtmu0}", "{sS/Wtmu0}", "{sT/Wtmu0}", "{sWtmu1}", "{sS/Wtmu1}",
    "{sT/Wtmu1}", "{sDrawTriCMD}", "{sBeginTriCMD}", "reserved2a8", "reserved2ac",
    "reserved2b0", "reserved2b4", "reserved2b8", "reserved2bc",
    "{bltSrcBaseAddr}", "{bltDstBaseAddr}", "{bltXYStrides}", "{bltSrcChromaRange}",
    "{bltDstChromaRange}", "{bltClipX}", "{bltClipY}", "reserved2dc", "{bltSrcXY}",
    "{bltDstXY}", "{bltSize}", "{bltRop}", "{bltColor}", "reserved2f4", "{bltCommand}",
    "{bltData}",
    "textureMode", "tLOD", "tDetail", "texBaseAddr", "texBaseAddr_1", "texBaseAddr_2",
    "texBaseAddr_3_8", "trexInit0", "trexInit1", "nccTable0.0", "nccTable0.1", "nccTable0.2",
    "nccTable0.3", "nccTable0.4", "nccTable0.5", "nccTable0.6",
    "nccTable0.7", "nccTable0.8", "nccTable0.9", "nccTable0.A", "nccTable0.B", "nccTable1.0",
    "nccTable1.1", "nccTable1.2", "nccTable1.3", "nccTable1.4", "nccTable1.5", "nccTable1.6",
    "nccTable1.7", "nccTable1.8", "nccTable1.9", "nccTable1.A",
    "nccTable1.B",
];

/// Debug name of a register index, if it has one.
pub fn register_name(reg: usize) -> Option<&'static str> {
    REG_NAMES.get(reg).copied()
}

/// Display adapter for log messages: the register name, or `#<byte offset>` when unnamed.
#[derive(Debug, Clone, Copy)]
pub struct RegName(pub usize);

impl std::fmt::Display for RegName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match register_name(self.0) {
            Some(name) => f.write_str(name),
            None => write!(f, "#{:x}", self.0 << 2),
        }
    }
}

macro_rules! register_bits {
    (@bit [$(#[$fm:meta])*] $field:ident $shift:literal) => {
        $(#[$fm])*
        #[inline]
        pub const fn $field(self) -> bool {
            (self.0 >> $shift) & 1 != 0
        }
    };
    (@bits [$(#[$fm:meta])*] $field:ident $shift:literal, $mask:literal) => {
        $(#[$fm])*
        #[inline]
        pub const fn $field(self) -> u32 {
            (self.0 >> $shift) & $mask
        }
    };
    (
        $(#[$m:meta])*
        pub struct $name:ident {
            $( $(#[$fm:meta])* $field:ident: $kind:ident($($arg:literal),+) ),* $(,)?
        }
    ) => {
        $(#[$m])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub u32);

        impl $name {
            $( register_bits!(@$kind [$(#[$fm])*] $field $($arg),+); )*
        }
    };
}

register_bits! {
    /// `fbzColorPath`: color/alpha combine unit configuration.
    pub struct FbzColorPath {
        cc_rgbselect: bits(0, 3),
        cc_aselect: bits(2, 3),
        cc_localselect: bit(4),
        cca_localselect: bits(5, 3),
        cc_localselect_override: bit(7),
        cc_zero_other: bit(8),
        cc_sub_clocal: bit(9),
        cc_mselect: bits(10, 7),
        cc_reverse_blend: bit(13),
        cc_add_aclocal: bits(14, 3),
        cc_invert_output: bit(16),
        cca_zero_other: bit(17),
        cca_sub_clocal: bit(18),
        cca_mselect: bits(19, 7),
        cca_reverse_blend: bit(22),
        cca_add_aclocal: bits(23, 3),
        cca_invert_output: bit(25),
        subpixel_adjust: bit(26),
        texture_enable: bit(27),
        /// Voodoo2 only.
        rgbzw_clamp: bit(28),
        /// Voodoo2 only.
        anti_alias: bit(29),
    }
}

register_bits! {
    pub struct AlphaMode {
        alpha_test: bit(0),
        alpha_function: bits(1, 7),
        alpha_blend: bit(4),
        anti_alias: bit(5),
        src_rgb_blend: bits(8, 15),
        dst_rgb_blend: bits(12, 15),
        src_alpha_blend: bits(16, 15),
        dst_alpha_blend: bits(20, 15),
        alpha_ref: bits(24, 0xff),
    }
}

register_bits! {
    pub struct FogMode {
        enable_fog: bit(0),
        fog_add: bit(1),
        fog_mult: bit(2),
        fog_zalpha: bits(3, 3),
        fog_constant: bit(5),
        /// Voodoo2 only.
        fog_dither: bit(6),
        /// Voodoo2 only.
        fog_zones: bit(7),
    }
}

register_bits! {
    pub struct FbzMode {
        enable_clipping: bit(0),
        enable_chromakey: bit(1),
        enable_stipple: bit(2),
        wbuffer_select: bit(3),
        enable_depthbuf: bit(4),
        depth_function: bits(5, 7),
        enable_dithering: bit(8),
        rgb_buffer_mask: bit(9),
        aux_buffer_mask: bit(10),
        dither_type: bit(11),
        stipple_pattern: bit(12),
        enable_alpha_mask: bit(13),
        draw_buffer: bits(14, 3),
        enable_depth_bias: bit(16),
        y_origin: bit(17),
        enable_alpha_planes: bit(18),
        alpha_dither_subtract: bit(19),
        depth_source_compare: bit(20),
        /// Voodoo2 only.
        depth_float_select: bit(21),
    }
}

register_bits! {
    pub struct LfbMode {
        write_format: bits(0, 0xf),
        write_buffer_select: bits(4, 3),
        read_buffer_select: bits(6, 3),
        enable_pixel_pipeline: bit(8),
        rgba_lanes: bits(9, 3),
        word_swap_writes: bit(11),
        byte_swizzle_writes: bit(12),
        y_origin: bit(13),
        write_w_select: bit(14),
        word_swap_reads: bit(15),
        byte_swizzle_reads: bit(16),
    }
}

register_bits! {
    pub struct ChromaRange {
        blue_exclusive: bit(24),
        green_exclusive: bit(25),
        red_exclusive: bit(26),
        union_mode: bit(27),
        enable: bit(28),
    }
}

register_bits! {
    pub struct FbiInit0 {
        vga_passthru: bit(0),
        graphics_reset: bit(1),
        fifo_reset: bit(2),
    }
}

register_bits! {
    pub struct FbiInit1 {
        x_video_tiles: bits(4, 0xf),
        /// Voodoo2 only.
        x_video_tiles_bit5: bit(24),
    }
}

register_bits! {
    pub struct FbiInit2 {
        disable_dither_sub: bit(0),
        enable_triple_buf: bit(4),
        video_buffer_offset: bits(11, 0x1ff),
    }
}

register_bits! {
    pub struct FbiInit3 {
        tri_register_remap: bit(0),
        disable_tmus: bit(6),
        yorigin_subtract: bits(22, 0x3ff),
    }
}

register_bits! {
    /// Voodoo2 only.
    pub struct FbiInit5 {
        buffer_allocation: bits(9, 3),
    }
}

register_bits! {
    /// Voodoo2 only.
    pub struct FbiInit6 {
        x_video_tiles_bit0: bit(30),
    }
}

register_bits! {
    pub struct TextureMode {
        enable_perspective: bit(0),
        minification_filter: bit(1),
        magnification_filter: bit(2),
        clamp_neg_w: bit(3),
        enable_lod_dither: bit(4),
        ncc_table_select: bits(5, 1),
        clamp_s: bit(6),
        clamp_t: bit(7),
        format: bits(8, 0xf),
        tc_zero_other: bit(12),
        tc_sub_clocal: bit(13),
        tc_mselect: bits(14, 7),
        tc_reverse_blend: bit(17),
        tc_add_aclocal: bits(18, 3),
        tc_invert_output: bit(20),
        tca_zero_other: bit(21),
        tca_sub_clocal: bit(22),
        tca_mselect: bits(23, 7),
        tca_reverse_blend: bit(26),
        tca_add_aclocal: bits(27, 3),
        tca_invert_output: bit(29),
        trilinear: bit(30),
        seq_8_downld: bit(31),
    }
}

register_bits! {
    pub struct TexLod {
        lodmin: bits(0, 0x3f),
        lodmax: bits(6, 0x3f),
        lodbias: bits(12, 0x3f),
        lod_odd: bit(18),
        lod_tsplit: bit(19),
        lod_s_is_wider: bit(20),
        lod_aspect: bits(21, 3),
        lod_zerofrac: bit(23),
        tmultibaseaddr: bit(24),
        tdata_swizzle: bit(25),
        tdata_swap: bit(26),
        /// Voodoo2 only.
        tdirect_write: bit(27),
    }
}

register_bits! {
    pub struct TexDetail {
        detail_max: bits(0, 0xff),
        detail_bias: bits(8, 0x3f),
        detail_scale: bits(14, 7),
        /// Voodoo2 only.
        separate_rgba_filter: bit(21),
    }
}

register_bits! {
    pub struct SetupMode {
        setup_rgb: bit(0),
        setup_alpha: bit(1),
        setup_z: bit(2),
        setup_wb: bit(3),
        setup_w0: bit(4),
        setup_st0: bit(5),
        setup_w1: bit(6),
        setup_st1: bit(7),
        fan: bit(16),
        enable_culling: bit(17),
        culling_sign: bit(18),
        disable_ping_pong: bit(19),
    }
}

register_bits! {
    pub struct TrexInit1 {
        send_tmu_config: bit(18),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_names_line_up_with_indices() {
        assert_eq!(register_name(STATUS), Some("status"));
        assert_eq!(register_name(TRIANGLE_CMD), Some("triangleCMD"));
        assert_eq!(register_name(F_TRIANGLE_CMD), Some("ftriangleCMD"));
        assert_eq!(register_name(FBI_PIXELS_OUT), Some("fbiPixelsOut"));
        assert_eq!(register_name(FOG_TABLE), Some("fogTable160"));
        assert_eq!(register_name(FBI_INIT4), Some("fbiInit4"));
        assert_eq!(register_name(S_BEGIN_TRI_CMD), Some("{sBeginTriCMD}"));
        assert_eq!(register_name(TEXTURE_MODE), Some("textureMode"));
        assert_eq!(register_name(NCC_TABLE), Some("nccTable0.0"));
        assert_eq!(register_name(NCC_TABLE + 23), Some("nccTable1.B"));
        assert_eq!(register_name(0xe1), None);
        assert_eq!(RegName(0xf0).to_string(), "#3c0");
    }

    #[test]
    fn access_tables_differ_by_generation() {
        let v1 = VoodooModel::Voodoo1;
        let v2 = VoodooModel::Voodoo2;

        assert_eq!(access(v1, STATUS), RegAccess::READ | RegAccess::PIPELINED);
        assert!(access(v1, INTR_CTRL).is_empty());
        assert!(access(v2, INTR_CTRL).contains(RegAccess::WRITE));

        assert!(!access(v1, FBI_PIXELS_IN).contains(RegAccess::WRITE));
        assert!(access(v1, FBI_PIXELS_IN).contains(RegAccess::READ));

        assert!(access(v1, S_SETUP_MODE).is_empty());
        assert!(access(v2, S_BEGIN_TRI_CMD).contains(RegAccess::WRITE));

        assert!(access(v1, H_SYNC).contains(RegAccess::WRITE));
        assert!(!access(v1, H_SYNC).contains(RegAccess::READ));
        assert!(access(v1, CHROMA_RANGE).is_empty());
        assert!(access(v2, CHROMA_RANGE).contains(RegAccess::WRITE));

        assert!(access(v1, NCC_TABLE + 23).contains(RegAccess::WRITE));
        assert!(access(v1, NCC_TABLE + 24).is_empty());
        assert!(access(v2, BLT_DATA).contains(RegAccess::WRITE));
        assert!(!access(v2, BLT_DATA).contains(RegAccess::READ));

        assert!(is_command(F_TRIANGLE_CMD) && is_command(S_BEGIN_TRI_CMD));
        assert!(!is_command(FBZ_MODE) && !is_command(FBI_PIXELS_IN));
    }

    #[test]
    fn alias_map_groups_parameters() {
        // Offset bit 19 selects the remapped view of the first 64 registers.
        assert_eq!(write_target(0x80000 | 0x09, true), D_R_DX);
        assert_eq!(write_target(0x80000 | 0x0b, true), START_G);
        assert_eq!(write_target(0x80000 | 0x09, false), START_G);
        assert_eq!(write_target(0x09, true), START_G);
        assert_eq!(write_target(0x80000 | 0x41, true), FBZ_COLOR_PATH);
    }

    #[test]
    fn bitfield_accessors() {
        let fbz = FbzMode((1 << 4) | (3 << 5) | (1 << 9) | (2 << 14) | (1 << 17));
        assert!(fbz.enable_depthbuf());
        assert_eq!(fbz.depth_function(), 3);
        assert!(fbz.rgb_buffer_mask());
        assert!(!fbz.aux_buffer_mask());
        assert_eq!(fbz.draw_buffer(), 2);
        assert!(fbz.y_origin());

        let tex = TextureMode(0x0000_0a20);
        assert_eq!(tex.format(), 10);
        assert_eq!(tex.ncc_table_select(), 1);
    }
}
