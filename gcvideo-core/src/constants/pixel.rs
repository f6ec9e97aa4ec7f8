// Pixel stage constant blocks.
//
// `PixelConstants` (`PSBlock`) is the compact layout: TEV register values,
// fog, depth-texture and indirect-texture parameters already converted into
// the form the shader consumes. `UberConstants` (`UBERBlock`) carries the raw
// BP words the uber-shader decodes at run time, plus the konst lookup table.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::{UniformBlock, UniformField, UniformType};

pub const I_COLORS: &str = "color";
pub const I_KCOLORS: &str = "k";
pub const I_ALPHA: &str = "alphaRef";
pub const I_TEXDIMS: &str = "texdim";
pub const I_ZBIAS: &str = "czbias";
pub const I_INDTEXSCALE: &str = "cindscale";
pub const I_INDTEXMTX: &str = "cindmtx";
pub const I_FOGCOLOR: &str = "cfogcolor";
pub const I_FOGI: &str = "cfogi";
pub const I_FOGF: &str = "cfogf";
pub const I_ZSLOPE: &str = "czslope";
pub const I_EFBSCALE: &str = "cefbscale";

/// Number of entries in the konst colour lookup table.
pub const KONST_LOOKUP_SIZE: usize = 32;

/// Fixed konst values for selector codes 0-7 (1, 7/8, 3/4 ... 1/8).
pub const KONST_FRACTIONS: [i32; 8] = [255, 223, 191, 159, 128, 96, 64, 32];

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PixelConstants {
    /// TEV colour registers (prev, c0, c1, c2), signed 11-bit.
    pub colors: [[i32; 4]; 4],
    /// TEV konst colour registers.
    pub kcolors: [[i32; 4]; 4],
    /// Alpha test refs in x/y, destination alpha in w.
    pub alpha: [i32; 4],
    /// Per texture map: 1/(w*128), 1/(h*128); per texcoord: s/t scale * 128.
    pub texdims: [[f32; 4]; 8],
    /// [0]: z-texture weights, [1]: far z, z range, unused, z-texture bias.
    pub zbias: [[i32; 4]; 2],
    pub indtexscale: [[i32; 4]; 2],
    /// Two rows per indirect matrix; w holds `17 - scale exponent`.
    pub indtexmtx: [[i32; 4]; 6],
    pub fogcolor: [i32; 4],
    /// y: B magnitude, w: B shift.
    pub fogi: [i32; 4],
    /// [0]: range centre, scaled viewport width, range coefficient.
    /// [1]: x = A, z = C.
    pub fogf: [[f32; 4]; 2],
    pub zslope: [f32; 4],
    pub efbscale: [f32; 4],
}

impl PixelConstants {
    pub const LAYOUT: UniformBlock = UniformBlock {
        name: "PSBlock",
        binding: 1,
        register: 0,
        fields: &[
            UniformField::array(I_COLORS, UniformType::Int4, 4),
            UniformField::array(I_KCOLORS, UniformType::Int4, 4),
            UniformField::scalar(I_ALPHA, UniformType::Int4),
            UniformField::array(I_TEXDIMS, UniformType::Float4, 8),
            UniformField::array(I_ZBIAS, UniformType::Int4, 2),
            UniformField::array(I_INDTEXSCALE, UniformType::Int4, 2),
            UniformField::array(I_INDTEXMTX, UniformType::Int4, 6),
            UniformField::scalar(I_FOGCOLOR, UniformType::Int4),
            UniformField::scalar(I_FOGI, UniformType::Int4),
            UniformField::array(I_FOGF, UniformType::Float4, 2),
            UniformField::scalar(I_ZSLOPE, UniformType::Float4),
            UniformField::scalar(I_EFBSCALE, UniformType::Float4),
        ],
    };

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for PixelConstants {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct UberConstants {
    pub genmode: u32,
    pub alpha_test: u32,
    pub fog_param3: u32,
    pub fog_range_base: u32,
    pub dstalpha: u32,
    pub ztex2: u32,
    pub zcontrol: u32,
    /// Bit `n` set when texgen `n` uses STQ projection.
    pub projection: u32,
    /// Raw `TREF` words in x.
    pub tevorder: [[u32; 4]; 8],
    /// Colour combiner word in x, alpha combiner word in y.
    pub combiners: [[u32; 4]; 16],
    /// Raw `KSEL` words in x.
    pub tevksel: [[u32; 4]; 8],
    pub konst: [[i32; 4]; KONST_LOOKUP_SIZE],
    /// Per indirect stage: texcoord | texmap << 8 | active << 16.
    pub iref: [u32; 4],
    /// Per TEV stage: raw `IND_CMD` word with bit 31 set when its indirect
    /// stage is in range, else zero. In x.
    pub tevind: [[u32; 4]; 16],
}

impl UberConstants {
    pub const LAYOUT: UniformBlock = UniformBlock {
        name: "UBERBlock",
        binding: 4,
        register: 1,
        fields: &[
            UniformField::scalar("bpmem_genmode", UniformType::Uint),
            UniformField::scalar("bpmem_alphaTest", UniformType::Uint),
            UniformField::scalar("bpmem_fogParam3", UniformType::Uint),
            UniformField::scalar("bpmem_fogRangeBase", UniformType::Uint),
            UniformField::scalar("bpmem_dstalpha", UniformType::Uint),
            UniformField::scalar("bpmem_ztex2", UniformType::Uint),
            UniformField::scalar("bpmem_zcontrol", UniformType::Uint),
            UniformField::scalar("bpmem_projection", UniformType::Uint),
            UniformField::array("bpmem_tevorder", UniformType::Uint4, 8),
            UniformField::array("bpmem_combiners", UniformType::Uint4, 16),
            UniformField::array("bpmem_tevksel", UniformType::Uint4, 8),
            UniformField::array("konstLookup", UniformType::Int4, KONST_LOOKUP_SIZE),
            UniformField::scalar("bpmem_iref", UniformType::Uint4),
            UniformField::array("bpmem_tevind", UniformType::Uint4, 16),
        ],
    };

    /// Power-on state: every BP mirror zero, fixed konst entries filled in.
    pub fn power_on() -> Self {
        let mut block: Self = Zeroable::zeroed();
        for (entry, &value) in block.konst.iter_mut().zip(KONST_FRACTIONS.iter()) {
            *entry = [value; 4];
        }
        block
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for UberConstants {
    fn default() -> Self {
        Self::power_on()
    }
}
