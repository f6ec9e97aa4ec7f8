// Uber-shader source generation
//
// The generators here are pure functions of
// `(ShaderTarget, ShaderCapabilities, ShaderVariantKey)`. Register *values*
// never reach the generated text; they flow through the uniform blocks the
// register tracker maintains, so one program per key covers every TEV,
// lighting and texgen configuration.

pub mod key;
pub mod pixel;
pub mod target;
pub mod vertex;

use std::fmt;

use crate::config::VideoConfig;
use crate::constants::UniformBlock;

pub use key::ShaderVariantKey;
pub use pixel::generate_pixel_shader;
pub use vertex::generate_vertex_shader;

/// Append-only builder for generated shader source.
///
/// Has an inherent `write_fmt`, so `write!`/`writeln!` work on it directly
/// and cannot fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderCode {
    buffer: String,
}

impl ShaderCode {
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(16 * 1024),
        }
    }

    pub fn write(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) {
        // Writing into a String only fails if a Display impl reports an error.
        let _ = fmt::Write::write_fmt(&mut self.buffer, args);
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl fmt::Display for ShaderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buffer)
    }
}

/// Shading language / API the source is emitted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShaderTarget {
    OpenGl,
    Vulkan,
    D3d,
}

impl ShaderTarget {
    pub const ALL: [ShaderTarget; 3] = [ShaderTarget::OpenGl, ShaderTarget::Vulkan, ShaderTarget::D3d];

    /// OpenGL and Vulkan both consume GLSL.
    pub fn is_glsl(self) -> bool {
        matches!(self, ShaderTarget::OpenGl | ShaderTarget::Vulkan)
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderTarget::OpenGl => "opengl",
            ShaderTarget::Vulkan => "vulkan",
            ShaderTarget::D3d => "d3d",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ShaderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Backend feature flags the generators specialize on. Anything missing is
/// replaced by a slower but equivalent construct, never by an error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
pub struct ShaderCapabilities {
    pub dual_source_blend: bool,
    pub bitfield_extract: bool,
    pub dynamic_sampler_indexing: bool,
    pub geometry_shaders: bool,
    pub depth_clamp: bool,
    pub clip_control: bool,
    pub early_z: bool,
    pub per_pixel_lighting: bool,
}

impl ShaderCapabilities {
    pub fn from_config(config: &VideoConfig) -> Self {
        let backend = &config.backend;
        Self {
            dual_source_blend: backend.dual_source_blend,
            bitfield_extract: backend.bitfield_extract,
            dynamic_sampler_indexing: backend.dynamic_sampler_indexing,
            geometry_shaders: backend.geometry_shaders,
            depth_clamp: backend.depth_clamp,
            clip_control: backend.clip_control,
            early_z: backend.early_z,
            per_pixel_lighting: config.per_pixel_lighting,
        }
    }

    /// Every feature available.
    pub fn all() -> Self {
        Self {
            dual_source_blend: true,
            bitfield_extract: true,
            dynamic_sampler_indexing: true,
            geometry_shaders: true,
            depth_clamp: true,
            clip_control: true,
            early_z: true,
            per_pixel_lighting: true,
        }
    }

    /// Whether generated code can call a native `bitfieldExtract`.
    pub fn native_bitfield_extract(&self, target: ShaderTarget) -> bool {
        self.bitfield_extract && target.is_glsl()
    }
}

/// Generated program plus the layouts of the uniform blocks it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedShader {
    pub code: String,
    pub blocks: Vec<UniformBlock>,
}

/// Type aliases, binding macros and the integer rounding helpers both
/// generators rely on.
pub fn write_common_header(out: &mut ShaderCode, target: ShaderTarget) {
    match target {
        ShaderTarget::OpenGl => out.write(
            "#define UBO_BINDING(packing, x) layout(packing, binding = x)\n\
             #define SAMPLER_BINDING(x) layout(binding = x)\n\
             #define ATTRIBUTE_LOCATION(x) layout(location = x)\n\
             #define FRAGMENT_OUTPUT_LOCATION(x) layout(location = x)\n\
             #define FRAGMENT_OUTPUT_LOCATION_INDEXED(x, y) layout(location = x, index = y)\n\
             #define VARYING_LOCATION(x)\n\
             #define FORCE_EARLY_Z layout(early_fragment_tests) in\n",
        ),
        ShaderTarget::Vulkan => out.write(
            "#define UBO_BINDING(packing, x) layout(packing, set = 0, binding = (x - 1))\n\
             #define SAMPLER_BINDING(x) layout(set = 1, binding = x)\n\
             #define ATTRIBUTE_LOCATION(x) layout(location = x)\n\
             #define FRAGMENT_OUTPUT_LOCATION(x) layout(location = x)\n\
             #define FRAGMENT_OUTPUT_LOCATION_INDEXED(x, y) layout(location = x, index = y)\n\
             #define VARYING_LOCATION(x) layout(location = x)\n\
             #define FORCE_EARLY_Z layout(early_fragment_tests) in\n",
        ),
        ShaderTarget::D3d => {}
    }

    if target.is_glsl() {
        out.write(
            "#define float2 vec2\n\
             #define float3 vec3\n\
             #define float4 vec4\n\
             #define uint2 uvec2\n\
             #define uint3 uvec3\n\
             #define uint4 uvec4\n\
             #define int2 ivec2\n\
             #define int3 ivec3\n\
             #define int4 ivec4\n\
             #define frac fract\n\
             #define lerp mix\n\n",
        );
    }

    out.write(
        "int idot(int3 x, int3 y)\n\
         {\n\
         \tint3 tmp = x * y;\n\
         \treturn tmp.x + tmp.y + tmp.z;\n\
         }\n\
         int idot(int4 x, int4 y)\n\
         {\n\
         \tint4 tmp = x * y;\n\
         \treturn tmp.x + tmp.y + tmp.z + tmp.w;\n\
         }\n\n\
         int  iround(float  x) { return int (round(x)); }\n\
         int2 iround(float2 x) { return int2(round(x)); }\n\
         int3 iround(float3 x) { return int3(round(x)); }\n\
         int4 iround(float4 x) { return int4(round(x)); }\n\n\
         int  itrunc(float  x) { return int (x); }\n\
         int2 itrunc(float2 x) { return int2(x); }\n\
         int3 itrunc(float3 x) { return int3(x); }\n\
         int4 itrunc(float4 x) { return int4(x); }\n\n",
    );
}

/// Interpolation qualifier for vertex outputs / pixel inputs.
pub fn interpolation_qualifier(key: &ShaderVariantKey) -> &'static str {
    if !key.msaa {
        ""
    } else if key.ssaa {
        "sample "
    } else {
        "centroid "
    }
}

/// Members shared by the vertex output and the pixel input. D3D gets
/// semantics, GLSL gets the interpolation qualifier only.
pub fn write_vs_output_members(
    out: &mut ShaderCode,
    target: ShaderTarget,
    caps: &ShaderCapabilities,
    num_texgens: u32,
    qualifier: &str,
) {
    let semantic = |name: &str| {
        if target.is_glsl() {
            String::new()
        } else {
            format!(" : {name}")
        }
    };

    writeln!(out, "\t{qualifier}float4 pos{};", semantic("SV_Position"));
    writeln!(out, "\t{qualifier}float4 colors_0{};", semantic("COLOR0"));
    writeln!(out, "\t{qualifier}float4 colors_1{};", semantic("COLOR1"));
    if num_texgens > 0 {
        writeln!(
            out,
            "\t{qualifier}float3 tex[{num_texgens}]{};",
            semantic("TEXCOORD0")
        );
    }
    writeln!(
        out,
        "\t{qualifier}float4 clipPos{};",
        semantic(&format!("TEXCOORD{num_texgens}"))
    );
    if caps.per_pixel_lighting {
        writeln!(
            out,
            "\t{qualifier}float3 Normal{};",
            semantic(&format!("TEXCOORD{}", num_texgens + 1))
        );
        writeln!(
            out,
            "\t{qualifier}float3 WorldPos{};",
            semantic(&format!("TEXCOORD{}", num_texgens + 2))
        );
    }
    if caps.depth_clamp {
        writeln!(out, "\t{qualifier}float clipDist0{};", semantic("SV_ClipDistance0"));
        writeln!(out, "\t{qualifier}float clipDist1{};", semantic("SV_ClipDistance1"));
    }
}

/// GLSL stage interface without an interface block (no geometry stage on
/// OpenGL). `storage` is `"in"` or `"out"`.
pub fn write_loose_varyings(
    out: &mut ShaderCode,
    storage: &str,
    caps: &ShaderCapabilities,
    num_texgens: u32,
    qualifier: &str,
) {
    writeln!(out, "{qualifier}{storage} float4 colors_0;");
    writeln!(out, "{qualifier}{storage} float4 colors_1;");
    if num_texgens > 0 {
        writeln!(out, "{qualifier}{storage} float3 tex[{num_texgens}];");
    }
    writeln!(out, "{qualifier}{storage} float4 clipPos;");
    if caps.per_pixel_lighting {
        writeln!(out, "{qualifier}{storage} float3 Normal;");
        writeln!(out, "{qualifier}{storage} float3 WorldPos;");
    }
}

/// Whether the GLSL stages talk through a `VertexData` interface block.
pub fn uses_interface_block(target: ShaderTarget, caps: &ShaderCapabilities) -> bool {
    target == ShaderTarget::Vulkan || (target.is_glsl() && caps.geometry_shaders)
}

/// Software `bitfieldExtract` for targets without the builtin.
pub fn write_bitfield_extract_fallback(out: &mut ShaderCode) {
    out.write(
        "uint bitfieldExtract(uint val, int off, int size)\n\
         {\n\
         \tuint mask = uint((1 << size) - 1);\n\
         \treturn uint(val >> off) & mask;\n\
         }\n\n",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_code_formats_inline() {
        let mut out = ShaderCode::new();
        out.write("a");
        write!(out, "{}-{}", 1, 2u32);
        writeln!(out, ";");
        assert_eq!(out.as_str(), "a1-2;\n");
        assert_eq!(out.len(), 6);
        assert_eq!(out.to_string(), "a1-2;\n");
    }

    #[test]
    fn target_names_round_trip() {
        for target in ShaderTarget::ALL {
            assert_eq!(ShaderTarget::from_name(target.name()), Some(target));
        }
        assert_eq!(ShaderTarget::from_name("D3D"), Some(ShaderTarget::D3d));
        assert_eq!(ShaderTarget::from_name("metal"), None);
        assert!(ShaderTarget::Vulkan.is_glsl());
        assert!(!ShaderTarget::D3d.is_glsl());
    }

    #[test]
    fn bitfield_extract_is_native_only_on_glsl() {
        let caps = ShaderCapabilities::all();
        assert!(caps.native_bitfield_extract(ShaderTarget::OpenGl));
        assert!(!caps.native_bitfield_extract(ShaderTarget::D3d));
        assert!(!ShaderCapabilities::default().native_bitfield_extract(ShaderTarget::OpenGl));
    }

    #[test]
    fn glsl_header_maps_hlsl_type_names() {
        let mut out = ShaderCode::new();
        write_common_header(&mut out, ShaderTarget::Vulkan);
        assert!(out.as_str().contains("#define int4 ivec4\n"));
        assert!(out.as_str().contains("set = 0, binding = (x - 1)"));
        assert!(out.as_str().contains("int4 iround(float4 x)"));

        let mut out = ShaderCode::new();
        write_common_header(&mut out, ShaderTarget::D3d);
        assert!(!out.as_str().contains("#define"));
        assert!(out.as_str().contains("int idot(int4 x, int4 y)"));
    }

    #[test]
    fn output_members_follow_texgens_and_caps() {
        let mut out = ShaderCode::new();
        write_vs_output_members(&mut out, ShaderTarget::D3d, &ShaderCapabilities::all(), 3, "");
        let text = out.as_str();
        assert!(text.contains("\tfloat3 tex[3] : TEXCOORD0;\n"));
        assert!(text.contains("\tfloat4 clipPos : TEXCOORD3;\n"));
        assert!(text.contains("\tfloat3 WorldPos : TEXCOORD5;\n"));
        assert!(text.contains("clipDist1 : SV_ClipDistance1;"));

        let mut out = ShaderCode::new();
        write_vs_output_members(
            &mut out,
            ShaderTarget::OpenGl,
            &ShaderCapabilities::default(),
            0,
            "centroid ",
        );
        assert!(!out.as_str().contains("tex["));
        assert!(out.as_str().contains("\tcentroid float4 clipPos;\n"));
        assert!(!out.as_str().contains(" : "));
    }
}
