// GX lighting / color channel configuration.
//
// The vertex uber-shader reads channel control words straight out of the
// uniform block; this module decodes the same words on the CPU for logging,
// tests and the CLI dump.

use super::xf::lit_channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSrc {
    Register = 0,
    Vertex = 1,
}

impl ColorSrc {
    pub fn from_bits(bits: u32) -> Self {
        if bits & 1 == 0 {
            ColorSrc::Register
        } else {
            ColorSrc::Vertex
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffuseFunction {
    None = 0,
    Sign = 1,
    Clamp = 2,
}

impl DiffuseFunction {
    /// Code 3 is undefined; the generated code contributes nothing for it.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits & 3 {
            0 => Some(DiffuseFunction::None),
            1 => Some(DiffuseFunction::Sign),
            2 => Some(DiffuseFunction::Clamp),
            _ => None,
        }
    }

    /// Scalar the light colour is multiplied by, given `attn`, the light
    /// direction `ldir` and the first normal `_norm0`.
    pub fn shader_factor(self) -> &'static str {
        match self {
            DiffuseFunction::None => "attn",
            DiffuseFunction::Sign => "attn * dot(ldir, _norm0)",
            DiffuseFunction::Clamp => "attn * max(0.0, dot(ldir, _norm0))",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttenuationFunction {
    None = 0,
    Spec = 1,
    Dir = 2,
    Spot = 3,
}

impl AttenuationFunction {
    pub const ALL: [AttenuationFunction; 4] = [
        AttenuationFunction::None,
        AttenuationFunction::Spec,
        AttenuationFunction::Dir,
        AttenuationFunction::Spot,
    ];

    pub fn from_bits(bits: u32) -> Self {
        Self::ALL[(bits & 3) as usize]
    }
}

/// A single color or alpha channel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChannel {
    pub mat_src: ColorSrc,
    pub amb_src: ColorSrc,
    /// Bit `n` enables light `n`.
    pub light_mask: u8,
    pub diff_fn: Option<DiffuseFunction>,
    pub attn_fn: AttenuationFunction,
    pub enabled: bool,
}

impl ColorChannel {
    pub fn decode(word: u32) -> Self {
        let light_mask = lit_channel::LIGHT_MASK_0_3.extract(word)
            | (lit_channel::LIGHT_MASK_4_7.extract(word) << 4);
        Self {
            mat_src: ColorSrc::from_bits(lit_channel::MAT_SOURCE.extract(word)),
            amb_src: ColorSrc::from_bits(lit_channel::AMB_SOURCE.extract(word)),
            light_mask: light_mask as u8,
            diff_fn: DiffuseFunction::from_bits(lit_channel::DIFFUSE_FUNC.extract(word)),
            attn_fn: AttenuationFunction::from_bits(lit_channel::ATTN_FUNC.extract(word)),
            enabled: lit_channel::ENABLE_LIGHTING.is_set(word),
        }
    }

    pub fn encode(&self) -> u32 {
        let mut word = 0;
        word = lit_channel::MAT_SOURCE.insert(word, self.mat_src as u32);
        word = lit_channel::ENABLE_LIGHTING.insert(word, self.enabled as u32);
        word = lit_channel::LIGHT_MASK_0_3.insert(word, self.light_mask as u32 & 0xF);
        word = lit_channel::AMB_SOURCE.insert(word, self.amb_src as u32);
        word = lit_channel::DIFFUSE_FUNC.insert(word, self.diff_fn.map_or(3, |d| d as u32));
        word = lit_channel::ATTN_FUNC.insert(word, self.attn_fn as u32);
        lit_channel::LIGHT_MASK_4_7.insert(word, self.light_mask as u32 >> 4)
    }

    /// Lights contributing to this channel, in index order.
    pub fn lights(&self) -> impl Iterator<Item = usize> + '_ {
        (0..8usize).filter(move |&i| self.light_mask & (1u8 << i) != 0)
    }
}

impl Default for ColorChannel {
    fn default() -> Self {
        Self {
            mat_src: ColorSrc::Register,
            amb_src: ColorSrc::Register,
            light_mask: 0,
            diff_fn: Some(DiffuseFunction::None),
            attn_fn: AttenuationFunction::None,
            enabled: false,
        }
    }
}
