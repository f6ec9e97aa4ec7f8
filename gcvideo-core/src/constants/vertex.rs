// Vertex stage constant block (`VSBlock`).

use bytemuck::{Pod, Zeroable};

use super::{UniformBlock, UniformField, UniformType};

pub const I_POSNORMALMATRIX: &str = "cpnmtx";
pub const I_PROJECTION: &str = "cproj";
pub const I_MATERIALS: &str = "cmtrl";
pub const I_LIGHTS: &str = "clights";
pub const I_TEXMATRICES: &str = "ctexmtx";
pub const I_TRANSFORMMATRICES: &str = "ctrmtx";
pub const I_NORMALMATRICES: &str = "cnmtx";
pub const I_POSTTRANSFORMMATRICES: &str = "cpostmtx";
pub const I_PIXELCENTERCORRECTION: &str = "cpixelcenter";
pub const I_VIEWPORT_SIZE: &str = "cviewport";

/// Vertex component flags (`components`), supplied by the vertex loader.
pub mod components {
    pub const POSMTXIDX: u32 = 1 << 1;
    pub const TEXMTXIDX0: u32 = 1 << 2;
    pub const NRM0: u32 = 1 << 10;
    pub const NRM1: u32 = 1 << 11;
    pub const NRM2: u32 = 1 << 12;
    pub const COL0: u32 = 1 << 13;
    pub const COL1: u32 = 1 << 14;
    pub const UV0: u32 = 1 << 15;

    pub const fn texmtxidx(texgen: u32) -> u32 {
        TEXMTXIDX0 << texgen
    }

    pub const fn uv(texgen: u32) -> u32 {
        UV0 << texgen
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightConstants {
    /// RGBA 0-255.
    pub color: [i32; 4],
    pub cosatt: [f32; 4],
    pub distatt: [f32; 4],
    pub pos: [f32; 4],
    /// Normalized light direction.
    pub dir: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexConstants {
    pub components: u32,
    pub dual_tex_info: u32,
    pub num_color_chans: u32,
    pub pad0: u32,
    /// Rows 0-2: position matrix, rows 3-5: normal matrix (xyz).
    pub posnormal_matrix: [[f32; 4]; 6],
    pub projection: [[f32; 4]; 4],
    /// Ambient 0, ambient 1, material 0, material 1.
    pub materials: [[i32; 4]; 4],
    pub lights: [LightConstants; 8],
    /// Three rows per texgen.
    pub tex_matrices: [[f32; 4]; 24],
    pub transform_matrices: [[f32; 4]; 64],
    pub normal_matrices: [[f32; 4]; 32],
    pub post_transform_matrices: [[f32; 4]; 64],
    pub pixel_center_correction: [f32; 4],
    /// xy: viewport extent.
    pub viewport_size: [f32; 4],
    /// Per texgen / channel: texMtxInfo, postMtxInfo, colour chan, alpha chan.
    pub xfmem_pack1: [[u32; 4]; 8],
}

impl VertexConstants {
    pub const LAYOUT: UniformBlock = UniformBlock {
        name: "VSBlock",
        binding: 2,
        register: 0,
        fields: &[
            UniformField::scalar("components", UniformType::Uint),
            UniformField::scalar("xfmem_dualTexInfo", UniformType::Uint),
            UniformField::scalar("xfmem_numColorChans", UniformType::Uint),
            UniformField::scalar("pad0", UniformType::Uint),
            UniformField::array(I_POSNORMALMATRIX, UniformType::Float4, 6),
            UniformField::array(I_PROJECTION, UniformType::Float4, 4),
            UniformField::array(I_MATERIALS, UniformType::Int4, 4),
            UniformField::array(I_LIGHTS, UniformType::Light, 8),
            UniformField::array(I_TEXMATRICES, UniformType::Float4, 24),
            UniformField::array(I_TRANSFORMMATRICES, UniformType::Float4, 64),
            UniformField::array(I_NORMALMATRICES, UniformType::Float4, 32),
            UniformField::array(I_POSTTRANSFORMMATRICES, UniformType::Float4, 64),
            UniformField::scalar(I_PIXELCENTERCORRECTION, UniformType::Float4),
            UniformField::scalar(I_VIEWPORT_SIZE, UniformType::Float4),
            UniformField::array("xfmem_pack1", UniformType::Uint4, 8),
        ],
    };

    /// Struct declaration the `Light` member type refers to.
    pub const LIGHT_STRUCT: &'static str = "struct Light {\n\
        \tint4 color;\n\
        \tfloat4 cosatt;\n\
        \tfloat4 distatt;\n\
        \tfloat4 pos;\n\
        \tfloat4 dir;\n\
        };\n";

    /// Accessors over `xfmem_pack1` used by the vertex uber-shader.
    pub const PACK_ACCESSORS: &'static str = "#define xfmem_texMtxInfo(i) (xfmem_pack1[(i)].x)\n\
        #define xfmem_postMtxInfo(i) (xfmem_pack1[(i)].y)\n\
        #define xfmem_color(i) (xfmem_pack1[(i)].z)\n\
        #define xfmem_alpha(i) (xfmem_pack1[(i)].w)\n";

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for VertexConstants {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_struct_size() {
        assert_eq!(
            VertexConstants::LAYOUT.std140_size(),
            std::mem::size_of::<VertexConstants>()
        );
        assert_eq!(std::mem::size_of::<LightConstants>(), 80);
    }

    #[test]
    fn layout_offsets_match_struct_fields() {
        let offsets = VertexConstants::LAYOUT.std140_offsets();
        let lookup = |name: &str| offsets.iter().find(|(n, _)| *n == name).map(|(_, o)| *o);
        assert_eq!(lookup(I_LIGHTS), Some(std::mem::offset_of!(VertexConstants, lights)));
        assert_eq!(
            lookup(I_PIXELCENTERCORRECTION),
            Some(std::mem::offset_of!(VertexConstants, pixel_center_correction))
        );
        assert_eq!(
            lookup("xfmem_pack1"),
            Some(std::mem::offset_of!(VertexConstants, xfmem_pack1))
        );
    }

    #[test]
    fn component_flags() {
        assert_eq!(components::texmtxidx(7), 1 << 9);
        assert_eq!(components::uv(7), 1 << 22);
        assert_eq!(components::NRM1 | components::NRM2, 0x1800);
    }
}
