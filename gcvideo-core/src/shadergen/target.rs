// Per-target emission helpers.
//
// Everything that differs between GLSL and HLSL at the statement level lives
// here, so the generators keep one copy of every TEV / lighting branch.

use super::{ShaderCode, ShaderTarget};

impl ShaderTarget {
    /// Window-space depth is flipped (reversed depth range) on these APIs.
    pub fn inverted_depth(self) -> bool {
        matches!(self, ShaderTarget::D3d | ShaderTarget::Vulkan)
    }

    /// Attribute that keeps the compiler from unrolling a runtime loop.
    pub fn loop_attribute(self) -> &'static str {
        match self {
            ShaderTarget::D3d => "[loop] ",
            ShaderTarget::OpenGl | ShaderTarget::Vulkan => "",
        }
    }

    /// Sample of layer 0 of texture `sampler` at `uv`, as a float4.
    pub fn sample_texture(self, sampler: &str, uv: &str) -> String {
        if self.is_glsl() {
            format!("texture(samp[{sampler}], float3({uv}, 0.0))")
        } else {
            format!("Tex[{sampler}].Sample(samp[{sampler}], float3({uv}, 0.0))")
        }
    }

    pub fn write_sampler_declarations(self, out: &mut ShaderCode) {
        if self.is_glsl() {
            out.write("SAMPLER_BINDING(0) uniform sampler2DArray samp[8];\n\n");
        } else {
            out.write(
                "SamplerState samp[8] : register(s0);\n\
                 Texture2DArray Tex[8] : register(t0);\n\n",
            );
        }
    }

    pub fn write_early_depth(self, out: &mut ShaderCode) {
        if self.is_glsl() {
            out.write("FORCE_EARLY_Z;\n");
        } else {
            out.write("[earlydepthstencil]\n");
        }
    }

    /// 24-bit window depth from the fragment position.
    pub fn window_depth(self) -> &'static str {
        if self.inverted_depth() {
            "uint((1.0 - rawpos.z) * 16777216.0)"
        } else {
            "uint(rawpos.z * 16777216.0)"
        }
    }

    /// Depth output written back from the 24-bit `zCoord`.
    pub fn depth_output(self) -> &'static str {
        if self.inverted_depth() {
            "depth = 1.0 - float(zCoord) / 16777216.0;\n"
        } else {
            "depth = float(zCoord) / 16777216.0;\n"
        }
    }

    /// Final clip-space position store of a vertex program.
    pub fn write_position_output(self, out: &mut ShaderCode) {
        match self {
            // Vulkan NDC has Y pointing down.
            ShaderTarget::Vulkan => {
                out.write("gl_Position = float4(o.pos.x, -o.pos.y, o.pos.z, o.pos.w);\n")
            }
            ShaderTarget::OpenGl => out.write("gl_Position = o.pos;\n"),
            ShaderTarget::D3d => out.write("return o;\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_syntax_per_target() {
        assert_eq!(
            ShaderTarget::OpenGl.sample_texture("3", "uv"),
            "texture(samp[3], float3(uv, 0.0))"
        );
        assert_eq!(
            ShaderTarget::D3d.sample_texture("sampler_num", "uv"),
            "Tex[sampler_num].Sample(samp[sampler_num], float3(uv, 0.0))"
        );
    }

    #[test]
    fn depth_direction_per_target() {
        assert!(!ShaderTarget::OpenGl.inverted_depth());
        assert!(ShaderTarget::Vulkan.inverted_depth());
        assert!(ShaderTarget::D3d.window_depth().contains("1.0 - rawpos.z"));
        assert_eq!(ShaderTarget::OpenGl.depth_output(), "depth = float(zCoord) / 16777216.0;\n");
    }

    #[test]
    fn position_output_per_target() {
        let mut out = ShaderCode::new();
        ShaderTarget::Vulkan.write_position_output(&mut out);
        assert!(out.as_str().contains("-o.pos.y"));

        let mut out = ShaderCode::new();
        ShaderTarget::D3d.write_position_output(&mut out);
        assert_eq!(out.as_str(), "return o;\n");
        assert_eq!(ShaderTarget::D3d.loop_attribute(), "[loop] ");
    }
}
