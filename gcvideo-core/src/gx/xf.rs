// XF (Transform unit) memory.
//
// XF memory holds the matrix banks, the hardware light table and the
// transform/lighting control registers:
//
//   0x0000-0x00FF  position / texture matrices (3x4 or 2x4, row major)
//   0x0400-0x045F  normal matrices (3x3)
//   0x0500-0x05FF  post-transform (dual texture) matrices
//   0x0600-0x067F  lights, 16 words each
//   0x1000-0x1057  control registers
//
// Everything is stored as raw 32-bit words; floats are reinterpreted on read.

use super::bitfield::BitField;

pub const XF_MEMORY_SIZE: usize = 0x1058;

pub const POS_MATRICES: usize = 0x000;
pub const POS_MATRICES_END: usize = 0x100;
pub const NORMAL_MATRICES: usize = 0x400;
pub const NORMAL_MATRICES_END: usize = 0x460;
pub const POST_MATRICES: usize = 0x500;
pub const POST_MATRICES_END: usize = 0x600;
pub const LIGHTS: usize = 0x600;
pub const LIGHTS_END: usize = 0x680;
pub const LIGHT_STRIDE: usize = 0x10;
pub const NUM_LIGHTS: usize = 8;

/// XF control register addresses.
pub mod reg {
    pub const INVTXSPEC: usize = 0x1008;
    pub const NUM_COLOR_CHANS: usize = 0x1009;
    pub const AMBIENT0: usize = 0x100A;
    pub const AMBIENT1: usize = 0x100B;
    pub const MATERIAL0: usize = 0x100C;
    pub const MATERIAL1: usize = 0x100D;
    pub const COLOR0_CHAN: usize = 0x100E;
    pub const COLOR1_CHAN: usize = 0x100F;
    pub const ALPHA0_CHAN: usize = 0x1010;
    pub const ALPHA1_CHAN: usize = 0x1011;
    pub const DUAL_TEX: usize = 0x1012;
    pub const MATRIX_INDEX_A: usize = 0x1018;
    pub const MATRIX_INDEX_B: usize = 0x1019;
    pub const VIEWPORT: usize = 0x101A;
    pub const VIEWPORT_END: usize = 0x1020;
    pub const PROJECTION: usize = 0x1020;
    pub const PROJECTION_TYPE: usize = 0x1026;
    pub const NUM_TEXGEN: usize = 0x103F;
    pub const TEX_MTX_INFO: usize = 0x1040;
    pub const TEX_MTX_INFO_END: usize = 0x1048;
    pub const POST_MTX_INFO: usize = 0x1050;
    pub const POST_MTX_INFO_END: usize = 0x1058;
}

/// Colour / alpha channel control (`LitChannel`).
pub mod lit_channel {
    use super::BitField;
    pub const MAT_SOURCE: BitField = BitField::new(0, 1);
    pub const ENABLE_LIGHTING: BitField = BitField::new(1, 1);
    pub const LIGHT_MASK_0_3: BitField = BitField::new(2, 4);
    pub const AMB_SOURCE: BitField = BitField::new(6, 1);
    pub const DIFFUSE_FUNC: BitField = BitField::new(7, 2);
    pub const ATTN_FUNC: BitField = BitField::new(9, 2);
    pub const LIGHT_MASK_4_7: BitField = BitField::new(11, 4);
}

pub mod tex_mtx_info {
    use super::BitField;
    pub const PROJECTION: BitField = BitField::new(1, 1);
    pub const INPUT_FORM: BitField = BitField::new(2, 1);
    pub const TEXGEN_TYPE: BitField = BitField::new(4, 3);
    pub const SOURCE_ROW: BitField = BitField::new(7, 5);
    pub const EMBOSS_SOURCE_SHIFT: BitField = BitField::new(12, 3);
    pub const EMBOSS_LIGHT_SHIFT: BitField = BitField::new(15, 3);
}

pub mod post_mtx_info {
    use super::BitField;
    pub const INDEX: BitField = BitField::new(0, 6);
    pub const NORMALIZE: BitField = BitField::new(8, 1);
}

pub mod matrix_index {
    use super::BitField;
    pub const POS_NORMAL: BitField = BitField::new(0, 6);

    /// Texture matrix index of texgen `texgen` and the register holding it
    /// (0 = `MATRIX_INDEX_A`, 1 = `MATRIX_INDEX_B`).
    pub const fn tex(texgen: usize) -> (usize, BitField) {
        if texgen < 4 {
            (0, BitField::new(6 * (texgen as u8 + 1), 6))
        } else {
            (1, BitField::new(6 * (texgen as u8 - 4), 6))
        }
    }
}

pub const NUM_TEXGENS_FIELD: BitField = BitField::new(0, 4);
pub const NUM_COLOR_CHANS_FIELD: BitField = BitField::new(0, 2);

/// Texture coordinate projection (`TexMtxInfo.projection`).
pub const TEXPROJ_ST: u32 = 0;
pub const TEXPROJ_STQ: u32 = 1;

/// Texture coordinate input form (`TexMtxInfo.inputform`).
pub const TEXINPUT_AB11: u32 = 0;
pub const TEXINPUT_ABC1: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TexGenType {
    Regular = 0,
    EmbossMap = 1,
    ColorStrgbc0 = 2,
    ColorStrgbc1 = 3,
}

impl TexGenType {
    /// Codes 4-7 are undefined and behave like a regular texgen.
    pub fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Self::EmbossMap,
            2 => Self::ColorStrgbc0,
            3 => Self::ColorStrgbc1,
            _ => Self::Regular,
        }
    }
}

/// Source row of a texgen (`TexMtxInfo.sourcerow`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexGenSource {
    Geometry,
    Normal,
    Colors,
    BinormalT,
    BinormalB,
    Tex(u8),
    /// Codes 13-31 select nothing; the coordinate keeps its default.
    Invalid,
}

impl TexGenSource {
    pub const GEOM_ROW: u32 = 0;
    pub const NORMAL_ROW: u32 = 1;
    pub const COLORS_ROW: u32 = 2;
    pub const BINORMAL_T_ROW: u32 = 3;
    pub const BINORMAL_B_ROW: u32 = 4;
    pub const TEX0_ROW: u32 = 5;

    pub fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::Geometry,
            1 => Self::Normal,
            2 => Self::Colors,
            3 => Self::BinormalT,
            4 => Self::BinormalB,
            5..=12 => Self::Tex((bits - Self::TEX0_ROW) as u8),
            _ => Self::Invalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    Perspective,
    Orthographic,
}

/// Decoded viewport registers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub wd: f32,
    pub ht: f32,
    pub z_range: f32,
    pub x_orig: f32,
    pub y_orig: f32,
    pub far_z: f32,
}

/// One entry of the hardware light table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Light {
    /// RGBA, red in the most significant byte.
    pub color: u32,
    pub cosatt: [f32; 3],
    pub distatt: [f32; 3],
    pub pos: [f32; 3],
    pub dir: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XfMemory {
    words: Vec<u32>,
}

impl XfMemory {
    pub fn new() -> Self {
        Self {
            words: vec![0; XF_MEMORY_SIZE],
        }
    }

    #[inline]
    pub fn get(&self, address: usize) -> u32 {
        self.words.get(address).copied().unwrap_or(0)
    }

    #[inline]
    pub fn get_f32(&self, address: usize) -> f32 {
        f32::from_bits(self.get(address))
    }

    /// Store one word. Returns `false` for addresses outside XF memory.
    pub fn set(&mut self, address: usize, value: u32) -> bool {
        match self.words.get_mut(address) {
            Some(word) => {
                *word = value;
                true
            }
            None => false,
        }
    }

    pub fn set_f32(&mut self, address: usize, value: f32) -> bool {
        self.set(address, value.to_bits())
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.words
    }

    pub fn restore(&mut self, words: &[u32]) -> bool {
        if words.len() != XF_MEMORY_SIZE {
            return false;
        }
        self.words.copy_from_slice(words);
        true
    }

    // -- Decoded views ---------------------------------------------------

    pub fn num_texgens(&self) -> u32 {
        NUM_TEXGENS_FIELD.extract(self.get(reg::NUM_TEXGEN)).min(8)
    }

    pub fn num_color_chans(&self) -> u32 {
        NUM_COLOR_CHANS_FIELD.extract(self.get(reg::NUM_COLOR_CHANS))
    }

    pub fn dual_tex_enabled(&self) -> bool {
        self.get(reg::DUAL_TEX) & 1 != 0
    }

    pub fn color_chan(&self, chan: usize) -> u32 {
        self.get(reg::COLOR0_CHAN + chan)
    }

    pub fn alpha_chan(&self, chan: usize) -> u32 {
        self.get(reg::ALPHA0_CHAN + chan)
    }

    pub fn tex_mtx_info(&self, texgen: usize) -> u32 {
        self.get(reg::TEX_MTX_INFO + texgen)
    }

    pub fn post_mtx_info(&self, texgen: usize) -> u32 {
        self.get(reg::POST_MTX_INFO + texgen)
    }

    pub fn pos_normal_matrix_index(&self) -> u32 {
        matrix_index::POS_NORMAL.extract(self.get(reg::MATRIX_INDEX_A))
    }

    pub fn tex_matrix_index(&self, texgen: usize) -> u32 {
        let (register, field) = matrix_index::tex(texgen);
        field.extract(self.get(reg::MATRIX_INDEX_A + register))
    }

    pub fn viewport(&self) -> Viewport {
        let f = |i: usize| self.get_f32(reg::VIEWPORT + i);
        Viewport {
            wd: f(0),
            ht: f(1),
            z_range: f(2),
            x_orig: f(3),
            y_orig: f(4),
            far_z: f(5),
        }
    }

    pub fn projection_type(&self) -> ProjectionType {
        if self.get(reg::PROJECTION_TYPE) == 0 {
            ProjectionType::Perspective
        } else {
            ProjectionType::Orthographic
        }
    }

    /// Expand the six raw projection parameters into four matrix rows.
    pub fn projection_rows(&self) -> [[f32; 4]; 4] {
        let p: [f32; 6] = std::array::from_fn(|i| self.get_f32(reg::PROJECTION + i));
        match self.projection_type() {
            ProjectionType::Perspective => [
                [p[0], 0.0, p[1], 0.0],
                [0.0, p[2], p[3], 0.0],
                [0.0, 0.0, p[4], p[5]],
                [0.0, 0.0, -1.0, 0.0],
            ],
            ProjectionType::Orthographic => [
                [p[0], 0.0, 0.0, p[1]],
                [0.0, p[2], 0.0, p[3]],
                [0.0, 0.0, p[4], p[5]],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Row `row` (4 floats) of the position/texture matrix bank.
    pub fn pos_matrix_row(&self, row: usize) -> [f32; 4] {
        let base = POS_MATRICES + (row * 4) % (POS_MATRICES_END - POS_MATRICES);
        std::array::from_fn(|i| self.get_f32(base + i))
    }

    /// Row `row` (3 floats) of the normal matrix bank.
    pub fn normal_matrix_row(&self, row: usize) -> [f32; 3] {
        let base = NORMAL_MATRICES + (row * 3) % (NORMAL_MATRICES_END - NORMAL_MATRICES);
        std::array::from_fn(|i| self.get_f32(base + i))
    }

    pub fn post_matrix_row(&self, row: usize) -> [f32; 4] {
        let base = POST_MATRICES + (row * 4) % (POST_MATRICES_END - POST_MATRICES);
        std::array::from_fn(|i| self.get_f32(base + i))
    }

    pub fn light(&self, index: usize) -> Light {
        let base = LIGHTS + index * LIGHT_STRIDE;
        let vec3 = |offset: usize| -> [f32; 3] {
            std::array::from_fn(|i| self.get_f32(base + offset + i))
        };
        Light {
            color: self.get(base + 3),
            cosatt: vec3(4),
            distatt: vec3(7),
            pos: vec3(10),
            dir: vec3(13),
        }
    }
}

impl Default for XfMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a packed RGBA8 register (red in the top byte) into components.
pub fn unpack_rgba8(color: u32) -> [i32; 4] {
    [
        (color >> 24 & 0xFF) as i32,
        (color >> 16 & 0xFF) as i32,
        (color >> 8 & 0xFF) as i32,
        (color & 0xFF) as i32,
    ]
}
