// Shader variant key.
//
// The only register state that changes the *text* of an uber-shader. Equal
// keys always produce identical source, so an external program cache can
// use the key directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::VideoConfig;
use crate::gx::bp::{addr, zcontrol, ztex, BpMemory};
use crate::gx::xf::XfMemory;

/// Highest texgen count a key can carry.
pub const MAX_TEXGENS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ShaderVariantKey {
    /// Active texture coordinate generators (0..=8).
    pub num_texgens: u8,
    /// Depth is modified per pixel by depth texturing. Z-freeze has no
    /// generated path and does not set it.
    pub per_pixel_depth: bool,
    pub msaa: bool,
    pub ssaa: bool,
    pub early_depth: bool,
}

impl ShaderVariantKey {
    /// Snapshot the key from the current register state.
    pub fn derive(bp: &BpMemory, xf: &XfMemory, config: &VideoConfig) -> Self {
        let ztex_op = ztex::OP.extract(bp.get(addr::ZTEX2));
        Self {
            num_texgens: xf.num_texgens() as u8,
            per_pixel_depth: ztex_op != 0,
            msaa: config.msaa(),
            ssaa: config.ssaa(),
            early_depth: zcontrol::EARLY_ZTEST.is_set(bp.get(addr::ZCOMPARE)),
        }
    }

    /// The key with the pixel-only flags cleared. Vertex programs only
    /// depend on the texgen count and the interpolation mode.
    pub fn vertex_variant(&self) -> Self {
        Self {
            per_pixel_depth: false,
            early_depth: false,
            ..*self
        }
    }

    /// Every key reachable under `config`, in a stable order.
    pub fn enumerate(config: &VideoConfig) -> Vec<Self> {
        let mut keys = Vec::with_capacity((MAX_TEXGENS as usize + 1) * 4);
        for num_texgens in 0..=MAX_TEXGENS {
            for per_pixel_depth in [false, true] {
                for early_depth in [false, true] {
                    keys.push(Self {
                        num_texgens,
                        per_pixel_depth,
                        msaa: config.msaa(),
                        ssaa: config.ssaa(),
                        early_depth,
                    });
                }
            }
        }
        keys
    }

    /// Every distinct vertex key reachable under `config`.
    pub fn enumerate_vertex(config: &VideoConfig) -> Vec<Self> {
        let mut keys: Vec<Self> = Self::enumerate(config)
            .iter()
            .map(Self::vertex_variant)
            .collect();
        keys.dedup();
        keys
    }

    /// Short, file-name friendly identifier.
    pub fn tag(&self) -> String {
        let mut tag = format!("t{}", self.num_texgens);
        if self.per_pixel_depth {
            tag.push_str("_ppd");
        }
        if self.early_depth {
            tag.push_str("_ez");
        }
        if self.ssaa {
            tag.push_str("_ssaa");
        } else if self.msaa {
            tag.push_str("_msaa");
        }
        tag
    }
}

impl fmt::Display for ShaderVariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}
