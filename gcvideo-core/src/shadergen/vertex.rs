// Vertex uber-shader generator.
//
// Position/normal transform, both colour channels with all eight lights and
// every texgen are driven from `VSBlock` at run time. Only the texgen count
// (and with it the size of the output interface) is baked into the text.

use log::debug;

use super::{
    interpolation_qualifier, uses_interface_block, write_bitfield_extract_fallback,
    write_common_header, write_loose_varyings, write_vs_output_members, GeneratedShader,
    ShaderCapabilities, ShaderCode, ShaderTarget, ShaderVariantKey,
};
use crate::constants::vertex::{
    components, I_LIGHTS, I_MATERIALS, I_NORMALMATRICES, I_PIXELCENTERCORRECTION,
    I_POSNORMALMATRIX, I_POSTTRANSFORMMATRICES, I_PROJECTION, I_TEXMATRICES,
    I_TRANSFORMMATRICES,
};
use crate::constants::{UniformBlock, VertexConstants};
use crate::gx::lighting::{AttenuationFunction, DiffuseFunction};
use crate::gx::xf::{
    lit_channel, post_mtx_info, tex_mtx_info, TexGenSource, TexGenType, TEXINPUT_AB11,
    TEXPROJ_STQ,
};

/// Vertex attribute locations on GLSL targets.
pub mod attrib {
    pub const POSITION: u32 = 0;
    pub const POSMTX: u32 = 1;
    pub const NORM0: u32 = 2;
    pub const NORM1: u32 = 3;
    pub const NORM2: u32 = 4;
    pub const COLOR0: u32 = 5;
    pub const COLOR1: u32 = 6;
    pub const TEXTURE0: u32 = 8;
}

/// Texture coordinate inputs; every vertex format can supply all eight.
const NUM_TEXCOORD_INPUTS: u32 = 8;

pub fn vertex_shader_blocks() -> Vec<UniformBlock> {
    vec![VertexConstants::LAYOUT]
}

/// Generate the vertex uber-shader for `key`. Pixel-only key flags are
/// ignored.
pub fn generate_vertex_shader(
    target: ShaderTarget,
    caps: &ShaderCapabilities,
    key: &ShaderVariantKey,
) -> GeneratedShader {
    let num_texgens = key.num_texgens as u32;
    let mut out = ShaderCode::new();

    out.write("// Vertex UberShader\n\n");
    write_common_header(&mut out, target);
    if !caps.native_bitfield_extract(target) {
        write_bitfield_extract_fallback(&mut out);
    }

    out.write(VertexConstants::LIGHT_STRUCT);
    out.write("\n");
    for block in vertex_shader_blocks() {
        block.write_declaration(&mut out, target);
    }
    out.write(VertexConstants::PACK_ACCESSORS);
    out.write("\n");

    write_calculate_lighting(&mut out);

    out.write("struct VS_OUTPUT {\n");
    write_vs_output_members(&mut out, target, caps, num_texgens, "");
    out.write("};\n\n");

    write_entry_point(&mut out, target, caps, key);
    write_transform(&mut out);
    write_lighting(&mut out, target);
    if num_texgens > 0 {
        write_texgens(&mut out, target, num_texgens);
    }
    write_depth_and_pixel_center(&mut out, caps);
    if caps.per_pixel_lighting {
        out.write("\to.Normal = _norm0;\n\to.WorldPos = pos.xyz;\n\n");
    }
    write_outputs(&mut out, target, caps, num_texgens);
    out.write("}\n");

    debug!(
        "Generated {} vertex uber-shader for {} ({} bytes)",
        target,
        key,
        out.len()
    );

    GeneratedShader {
        code: out.into_string(),
        blocks: vertex_shader_blocks(),
    }
}

fn write_calculate_lighting(out: &mut ShaderCode) {
    out.write(
        "int4 CalculateLighting(uint index, uint attnfunc, uint diffusefunc, float4 pos, float3 _norm0)\n\
         {\n\
         \tfloat3 ldir, cosAttn, distAttn;\n\
         \tfloat dist, dist2, attn;\n\n\
         \tswitch (attnfunc) {\n",
    );
    writeln!(
        out,
        "\tcase {}u: // {:?}\n\tcase {}u: // {:?}",
        AttenuationFunction::None as u32,
        AttenuationFunction::None,
        AttenuationFunction::Dir as u32,
        AttenuationFunction::Dir
    );
    writeln!(
        out,
        "\t\tldir = normalize({I_LIGHTS}[index].pos.xyz - pos.xyz);\n\
         \t\tattn = 1.0;\n\
         \t\tif (length(ldir) == 0.0)\n\
         \t\t\tldir = _norm0;\n\
         \t\tbreak;\n"
    );
    writeln!(
        out,
        "\tcase {}u: // {:?}",
        AttenuationFunction::Spec as u32,
        AttenuationFunction::Spec
    );
    writeln!(
        out,
        "\t\tldir = normalize({I_LIGHTS}[index].pos.xyz - pos.xyz);\n\
         \t\tattn = (dot(_norm0, ldir) >= 0.0) ? max(0.0, dot(_norm0, {I_LIGHTS}[index].dir.xyz)) : 0.0;\n\
         \t\tcosAttn = {I_LIGHTS}[index].cosatt.xyz;"
    );
    writeln!(
        out,
        "\t\tif (diffusefunc == {}u)",
        DiffuseFunction::None as u32
    );
    writeln!(
        out,
        "\t\t\tdistAttn = {I_LIGHTS}[index].distatt.xyz;\n\
         \t\telse\n\
         \t\t\tdistAttn = normalize({I_LIGHTS}[index].distatt.xyz);\n\
         \t\tattn = max(0.0, dot(cosAttn, float3(1.0, attn, attn * attn))) / dot(distAttn, float3(1.0, attn, attn * attn));\n\
         \t\tbreak;\n"
    );
    writeln!(
        out,
        "\tcase {}u: // {:?}",
        AttenuationFunction::Spot as u32,
        AttenuationFunction::Spot
    );
    writeln!(
        out,
        "\t\tldir = {I_LIGHTS}[index].pos.xyz - pos.xyz;\n\
         \t\tdist2 = dot(ldir, ldir);\n\
         \t\tdist = sqrt(dist2);\n\
         \t\tldir = ldir / dist;\n\
         \t\tattn = max(0.0, dot(ldir, {I_LIGHTS}[index].dir.xyz));\n\
         \t\tattn = max(0.0, {I_LIGHTS}[index].cosatt.x + {I_LIGHTS}[index].cosatt.y * attn + \
         {I_LIGHTS}[index].cosatt.z * attn * attn) / dot({I_LIGHTS}[index].distatt.xyz, float3(1.0, dist, dist2));\n\
         \t\tbreak;\n"
    );
    out.write(
        "\tdefault:\n\
         \t\tattn = 1.0;\n\
         \t\tldir = _norm0;\n\
         \t\tbreak;\n\
         \t}\n\n\
         \tswitch (diffusefunc) {\n",
    );
    for diffuse in [
        DiffuseFunction::None,
        DiffuseFunction::Sign,
        DiffuseFunction::Clamp,
    ] {
        writeln!(
            out,
            "\tcase {}u: // {:?}\n\t\treturn iround({} * float4({I_LIGHTS}[index].color));",
            diffuse as u32,
            diffuse,
            diffuse.shader_factor()
        );
    }
    out.write("\t}\n\treturn int4(0, 0, 0, 0);\n}\n\n");
}

fn write_entry_point(
    out: &mut ShaderCode,
    target: ShaderTarget,
    caps: &ShaderCapabilities,
    key: &ShaderVariantKey,
) {
    let num_texgens = key.num_texgens as u32;
    if target.is_glsl() {
        writeln!(out, "ATTRIBUTE_LOCATION({}) in float4 rawpos;", attrib::POSITION);
        writeln!(out, "ATTRIBUTE_LOCATION({}) in uint4 posmtx;", attrib::POSMTX);
        writeln!(out, "ATTRIBUTE_LOCATION({}) in float3 rawnorm0;", attrib::NORM0);
        writeln!(out, "ATTRIBUTE_LOCATION({}) in float3 rawnorm1;", attrib::NORM1);
        writeln!(out, "ATTRIBUTE_LOCATION({}) in float3 rawnorm2;", attrib::NORM2);
        writeln!(out, "ATTRIBUTE_LOCATION({}) in float4 color0;", attrib::COLOR0);
        writeln!(out, "ATTRIBUTE_LOCATION({}) in float4 color1;", attrib::COLOR1);
        for i in 0..NUM_TEXCOORD_INPUTS {
            writeln!(
                out,
                "ATTRIBUTE_LOCATION({}) in float3 tex{i};",
                attrib::TEXTURE0 + i
            );
        }
        out.write("\n");

        let qualifier = interpolation_qualifier(key);
        if uses_interface_block(target, caps) {
            out.write("VARYING_LOCATION(0) out VertexData {\n");
            write_vs_output_members(out, target, caps, num_texgens, qualifier);
            out.write("} vs;\n\n");
        } else {
            write_loose_varyings(out, "out", caps, num_texgens, qualifier);
            out.write("\n");
        }

        out.write("void main()\n{\n");
    } else {
        let mut params = vec![
            "float3 rawnorm0 : NORMAL0".to_string(),
            "float3 rawnorm1 : NORMAL1".to_string(),
            "float3 rawnorm2 : NORMAL2".to_string(),
            "float4 color0 : COLOR0".to_string(),
            "float4 color1 : COLOR1".to_string(),
        ];
        for i in 0..NUM_TEXCOORD_INPUTS {
            params.push(format!("float3 tex{i} : TEXCOORD{i}"));
        }
        params.push("uint posmtx : BLENDINDICES".to_string());
        params.push("float4 rawpos : POSITION".to_string());
        writeln!(out, "VS_OUTPUT main(\n\t{})\n{{", params.join(",\n\t"));
    }
    out.write("\tVS_OUTPUT o;\n\n");
}

fn write_transform(out: &mut ShaderCode) {
    out.write(
        "\t// Position matrix\n\
         \tfloat4 P0;\n\
         \tfloat4 P1;\n\
         \tfloat4 P2;\n\n\
         \t// Normal matrix\n\
         \tfloat3 N0;\n\
         \tfloat3 N1;\n\
         \tfloat3 N2;\n\n",
    );
    writeln!(
        out,
        "\tif ((components & {}u) != 0u) {{ // per-vertex matrix index",
        components::POSMTXIDX
    );
    writeln!(
        out,
        "\t\tint posidx = int(posmtx.r);\n\
         \t\tP0 = {I_TRANSFORMMATRICES}[posidx];\n\
         \t\tP1 = {I_TRANSFORMMATRICES}[posidx + 1];\n\
         \t\tP2 = {I_TRANSFORMMATRICES}[posidx + 2];\n\n\
         \t\tint normidx = posidx >= 32 ? (posidx - 32) : posidx;\n\
         \t\tN0 = {I_NORMALMATRICES}[normidx].xyz;\n\
         \t\tN1 = {I_NORMALMATRICES}[normidx + 1].xyz;\n\
         \t\tN2 = {I_NORMALMATRICES}[normidx + 2].xyz;\n\
         \t}} else {{\n\
         \t\tP0 = {I_POSNORMALMATRIX}[0];\n\
         \t\tP1 = {I_POSNORMALMATRIX}[1];\n\
         \t\tP2 = {I_POSNORMALMATRIX}[2];\n\
         \t\tN0 = {I_POSNORMALMATRIX}[3].xyz;\n\
         \t\tN1 = {I_POSNORMALMATRIX}[4].xyz;\n\
         \t\tN2 = {I_POSNORMALMATRIX}[5].xyz;\n\
         \t}}\n"
    );
    writeln!(
        out,
        "\tfloat4 pos = float4(dot(P0, rawpos), dot(P1, rawpos), dot(P2, rawpos), 1.0);\n\
         \to.pos = float4(dot({I_PROJECTION}[0], pos), dot({I_PROJECTION}[1], pos), \
         dot({I_PROJECTION}[2], pos), dot({I_PROJECTION}[3], pos));\n"
    );

    // Only the first normal is normalized.
    out.write("\tfloat3 _norm0 = float3(0.0, 0.0, 0.0);\n");
    writeln!(out, "\tif ((components & {}u) != 0u)", components::NRM0);
    out.write(
        "\t\t_norm0 = normalize(float3(dot(N0, rawnorm0), dot(N1, rawnorm0), dot(N2, rawnorm0)));\n\n\
         \tfloat3 _norm1 = float3(0.0, 0.0, 0.0);\n",
    );
    writeln!(out, "\tif ((components & {}u) != 0u)", components::NRM1);
    out.write(
        "\t\t_norm1 = float3(dot(N0, rawnorm1), dot(N1, rawnorm1), dot(N2, rawnorm1));\n\n\
         \tfloat3 _norm2 = float3(0.0, 0.0, 0.0);\n",
    );
    writeln!(out, "\tif ((components & {}u) != 0u)", components::NRM2);
    out.write("\t\t_norm2 = float3(dot(N0, rawnorm2), dot(N1, rawnorm2), dot(N2, rawnorm2));\n\n");
}

/// Vertex colour source for channel `chan`, falling back to colour 0 and
/// then to white. `swizzle` picks the components.
fn write_vertex_color_select(out: &mut ShaderCode, indent: &str, lhs: &str, swizzle: &str) {
    let (convert, white) = if swizzle == "w" {
        ("int", "255")
    } else {
        ("int3", "int3(255, 255, 255)")
    };
    writeln!(
        out,
        "{indent}if ((components & ({}u << chan)) != 0u)",
        components::COL0
    );
    writeln!(
        out,
        "{indent}\t{lhs} = {convert}(round(((chan == 0u) ? color0.{swizzle} : color1.{swizzle}) * 255.0));"
    );
    writeln!(out, "{indent}else if ((components & {}u) != 0u)", components::COL0);
    writeln!(
        out,
        "{indent}\t{lhs} = {convert}(round(color0.{swizzle} * 255.0));\n\
         {indent}else\n\
         {indent}\t{lhs} = {white};"
    );
}

/// Light accumulation for the colour (`xyz`) or alpha (`w`) half of a channel.
fn write_light_accumulation(out: &mut ShaderCode, reg: &str, swizzle: &str) {
    writeln!(
        out,
        "\t\tif ({} != 0u) {{",
        lit_channel::ENABLE_LIGHTING.shader_extract(reg)
    );
    writeln!(
        out,
        "\t\t\tif ({} != 0u) {{",
        lit_channel::AMB_SOURCE.shader_extract(reg)
    );
    write_vertex_color_select(out, "\t\t\t\t", &format!("lacc.{swizzle}"), swizzle);
    writeln!(
        out,
        "\t\t\t}} else {{\n\
         \t\t\t\tlacc.{swizzle} = {I_MATERIALS}[chan].{swizzle};\n\
         \t\t\t}}\n"
    );
    writeln!(
        out,
        "\t\t\tuint light_mask = {} | ({} << 4u);",
        lit_channel::LIGHT_MASK_0_3.shader_extract(reg),
        lit_channel::LIGHT_MASK_4_7.shader_extract(reg)
    );
    writeln!(
        out,
        "\t\t\tuint attnfunc = {};",
        lit_channel::ATTN_FUNC.shader_extract(reg)
    );
    writeln!(
        out,
        "\t\t\tuint diffusefunc = {};",
        lit_channel::DIFFUSE_FUNC.shader_extract(reg)
    );
    writeln!(
        out,
        "\t\t\tfor (uint light_index = 0u; light_index < 8u; light_index++) {{\n\
         \t\t\t\tif ((light_mask & (1u << light_index)) != 0u)\n\
         \t\t\t\t\tlacc.{swizzle} += CalculateLighting(light_index, attnfunc, diffusefunc, pos, _norm0).{swizzle};\n\
         \t\t\t}}\n\
         \t\t}}\n"
    );
}

fn write_lighting(out: &mut ShaderCode, target: ShaderTarget) {
    for (i, flag) in [components::COL0, components::COL1].into_iter().enumerate() {
        writeln!(
            out,
            "\tif ((components & {flag}u) != 0u)\n\
             \t\to.colors_{i} = color{i};\n\
             \telse\n\
             \t\to.colors_{i} = float4(1.0, 1.0, 1.0, 1.0);\n"
        );
    }

    out.write("\t// Lighting\n");
    writeln!(
        out,
        "\t{}for (uint chan = 0u; chan < xfmem_numColorChans; chan++) {{",
        target.loop_attribute()
    );
    writeln!(
        out,
        "\t\tuint colorreg = xfmem_color(chan);\n\
         \t\tuint alphareg = xfmem_alpha(chan);\n\
         \t\tint4 mat = {I_MATERIALS}[chan + 2u];\n\
         \t\tint4 lacc = int4(255, 255, 255, 255);\n"
    );

    writeln!(
        out,
        "\t\tif ({} != 0u) {{",
        lit_channel::MAT_SOURCE.shader_extract("colorreg")
    );
    write_vertex_color_select(out, "\t\t\t", "mat.xyz", "xyz");
    out.write("\t\t}\n\n");

    writeln!(
        out,
        "\t\tif ({} != 0u) {{",
        lit_channel::MAT_SOURCE.shader_extract("alphareg")
    );
    write_vertex_color_select(out, "\t\t\t", "mat.w", "w");
    writeln!(
        out,
        "\t\t}} else {{\n\
         \t\t\tmat.w = {I_MATERIALS}[chan + 2u].w;\n\
         \t\t}}\n"
    );

    write_light_accumulation(out, "colorreg", "xyz");
    write_light_accumulation(out, "alphareg", "w");

    out.write(
        "\t\tlacc = clamp(lacc, 0, 255);\n\n\
         \t\tfloat4 lit_color = float4((mat * (lacc + (lacc >> 7))) >> 8) / 255.0;\n\
         \t\tswitch (chan) {\n\
         \t\tcase 0u: o.colors_0 = lit_color; break;\n\
         \t\tcase 1u: o.colors_1 = lit_color; break;\n\
         \t\t}\n\
         \t}\n\n",
    );

    writeln!(
        out,
        "\tif (xfmem_numColorChans < 2u && (components & {}u) == 0u)\n\
         \t\to.colors_1 = o.colors_0;\n",
        components::COL1
    );
}

fn write_texgens(out: &mut ShaderCode, target: ShaderTarget, num_texgens: u32) {
    // Every element is written before any dynamic index reads one.
    for i in 0..num_texgens {
        writeln!(out, "\to.tex[{i}] = float3(0.0, 0.0, 0.0);");
    }
    out.write("\n\t// Texture coordinate generation\n");
    if num_texgens == 1 {
        out.write("\t{ const uint texgen = 0u;\n");
    } else {
        writeln!(
            out,
            "\t{}for (uint texgen = 0u; texgen < {num_texgens}u; texgen++) {{",
            target.loop_attribute()
        );
    }

    out.write(
        "\t\tfloat4 coord = float4(0.0, 0.0, 1.0, 1.0);\n\
         \t\tuint texMtxInfo = xfmem_texMtxInfo(texgen);\n",
    );
    writeln!(
        out,
        "\t\tswitch ({}) {{",
        tex_mtx_info::SOURCE_ROW.shader_extract("texMtxInfo")
    );
    writeln!(
        out,
        "\t\tcase {}u: // geometry\n\t\t\tcoord.xyz = rawpos.xyz;\n\t\t\tbreak;",
        TexGenSource::GEOM_ROW
    );
    for (row, flag, input) in [
        (TexGenSource::NORMAL_ROW, components::NRM0, "rawnorm0"),
        (TexGenSource::BINORMAL_T_ROW, components::NRM1, "rawnorm1"),
        (TexGenSource::BINORMAL_B_ROW, components::NRM2, "rawnorm2"),
    ] {
        writeln!(
            out,
            "\t\tcase {row}u:\n\
             \t\t\tcoord.xyz = ((components & {flag}u) != 0u) ? {input}.xyz : coord.xyz;\n\
             \t\t\tbreak;"
        );
    }
    for i in 0..NUM_TEXCOORD_INPUTS {
        writeln!(
            out,
            "\t\tcase {}u: // tex{i}\n\
             \t\t\tcoord = ((components & {}u) != 0u) ? float4(tex{i}.x, tex{i}.y, 1.0, 1.0) : coord;\n\
             \t\t\tbreak;",
            TexGenSource::TEX0_ROW + i,
            components::uv(i)
        );
    }
    out.write("\t\t}\n\n");

    writeln!(
        out,
        "\t\tif ({} == {TEXINPUT_AB11}u)\n\t\t\tcoord.z = 1.0;\n",
        tex_mtx_info::INPUT_FORM.shader_extract("texMtxInfo")
    );

    writeln!(
        out,
        "\t\tuint texgentype = {};",
        tex_mtx_info::TEXGEN_TYPE.shader_extract("texMtxInfo")
    );
    out.write("\t\tfloat3 output_tex = float3(0.0, 0.0, 0.0);\n\t\tswitch (texgentype) {\n");

    writeln!(out, "\t\tcase {}u: {{ // emboss", TexGenType::EmbossMap as u32);
    writeln!(
        out,
        "\t\t\tuint light = {};",
        tex_mtx_info::EMBOSS_LIGHT_SHIFT.shader_extract("texMtxInfo")
    );
    writeln!(
        out,
        "\t\t\tuint source = {};",
        tex_mtx_info::EMBOSS_SOURCE_SHIFT.shader_extract("texMtxInfo")
    );
    out.write("\t\t\tswitch (source) {\n");
    for i in 0..num_texgens {
        writeln!(out, "\t\t\tcase {i}u: output_tex = o.tex[{i}]; break;");
    }
    out.write("\t\t\tdefault: output_tex = float3(0.0, 0.0, 0.0); break;\n\t\t\t}\n");
    writeln!(
        out,
        "\t\t\tif ((components & {}u) != 0u) {{\n\
         \t\t\t\tfloat3 ldir = normalize({I_LIGHTS}[light].pos.xyz - pos.xyz);\n\
         \t\t\t\toutput_tex += float3(dot(ldir, _norm1), dot(ldir, _norm2), 0.0);\n\
         \t\t\t}}\n\
         \t\t\tbreak;\n\
         \t\t}}",
        components::NRM1 | components::NRM2
    );

    for (ty, color) in [
        (TexGenType::ColorStrgbc0, "o.colors_0"),
        (TexGenType::ColorStrgbc1, "o.colors_1"),
    ] {
        writeln!(
            out,
            "\t\tcase {}u:\n\
             \t\t\toutput_tex = float3({color}.x, {color}.y, 1.0);\n\
             \t\t\tbreak;",
            ty as u32
        );
    }

    let projection = tex_mtx_info::PROJECTION.shader_extract("texMtxInfo");
    out.write("\t\tdefault: { // regular\n");
    writeln!(
        out,
        "\t\t\tif ((components & ({}u << texgen)) != 0u) {{",
        components::TEXMTXIDX0
    );
    out.write("\t\t\t\tint tmp = 0;\n\t\t\t\tswitch (texgen) {\n");
    for i in 0..num_texgens {
        writeln!(out, "\t\t\t\tcase {i}u: tmp = int(tex{i}.z); break;");
    }
    out.write("\t\t\t\t}\n");
    write_texgen_matrix(out, &projection, &format!("{I_TRANSFORMMATRICES}[tmp]"), &[
        format!("{I_TRANSFORMMATRICES}[tmp + 1]"),
        format!("{I_TRANSFORMMATRICES}[tmp + 2]"),
    ]);
    out.write("\t\t\t} else {\n");
    write_texgen_matrix(out, &projection, &format!("{I_TEXMATRICES}[3u * texgen]"), &[
        format!("{I_TEXMATRICES}[3u * texgen + 1u]"),
        format!("{I_TEXMATRICES}[3u * texgen + 2u]"),
    ]);
    out.write("\t\t\t}\n\t\t\tbreak;\n\t\t}\n\t\t}\n\n");

    out.write(
        "\t\tif (xfmem_dualTexInfo != 0u) {\n\
         \t\t\tuint postMtxInfo = xfmem_postMtxInfo(texgen);\n",
    );
    writeln!(
        out,
        "\t\t\tuint base_index = {};",
        post_mtx_info::INDEX.shader_extract("postMtxInfo")
    );
    writeln!(
        out,
        "\t\t\tfloat4 P0 = {I_POSTTRANSFORMMATRICES}[base_index & 0x3fu];\n\
         \t\t\tfloat4 P1 = {I_POSTTRANSFORMMATRICES}[(base_index + 1u) & 0x3fu];\n\
         \t\t\tfloat4 P2 = {I_POSTTRANSFORMMATRICES}[(base_index + 2u) & 0x3fu];\n"
    );
    writeln!(
        out,
        "\t\t\tif ({} != 0u)\n\t\t\t\toutput_tex = normalize(output_tex);\n",
        post_mtx_info::NORMALIZE.shader_extract("postMtxInfo")
    );
    out.write(
        "\t\t\toutput_tex = float3(dot(P0.xyz, output_tex) + P0.w,\n\
         \t\t\t                    dot(P1.xyz, output_tex) + P1.w,\n\
         \t\t\t                    dot(P2.xyz, output_tex) + P2.w);\n\
         \t\t}\n\n",
    );

    // A regular texgen with q == 0 halves and clamps s/t.
    writeln!(
        out,
        "\t\tif (texgentype == {}u && output_tex.z == 0.0)\n\
         \t\t\toutput_tex.xy = clamp(output_tex.xy / 2.0, float2(-1.0, -1.0), float2(1.0, 1.0));\n",
        TexGenType::Regular as u32
    );

    out.write("\t\tswitch (texgen) {\n");
    for i in 0..num_texgens {
        writeln!(out, "\t\tcase {i}u: o.tex[{i}] = output_tex; break;");
    }
    out.write("\t\t}\n\t}\n\n");
}

fn write_texgen_matrix(out: &mut ShaderCode, projection: &str, row0: &str, rows: &[String; 2]) {
    writeln!(out, "\t\t\t\tif ({projection} == {TEXPROJ_STQ}u)");
    writeln!(
        out,
        "\t\t\t\t\toutput_tex = float3(dot(coord, {row0}), dot(coord, {}), dot(coord, {}));",
        rows[0], rows[1]
    );
    writeln!(out, "\t\t\t\telse");
    writeln!(
        out,
        "\t\t\t\t\toutput_tex = float3(dot(coord, {row0}), dot(coord, {}), 1.0);",
        rows[0]
    );
}

fn write_depth_and_pixel_center(out: &mut ShaderCode, caps: &ShaderCapabilities) {
    // Perspective divide of clipPos happens per pixel.
    out.write("\to.clipPos = o.pos;\n");

    if caps.depth_clamp {
        // Clip to -w <= z <= 0 ourselves; the host clip planes are disabled.
        out.write(
            "\tfloat clipDepth = o.pos.z * (1.0 - 1e-7);\n\
             \to.clipDist0 = clipDepth + o.pos.w;\n\
             \to.clipDist1 = -clipDepth;\n",
        );
    }

    // Map the -1..0 console range onto 0..1 with the depth range applied
    // before the divide.
    writeln!(
        out,
        "\to.pos.z = o.pos.w * {I_PIXELCENTERCORRECTION}.w - o.pos.z * {I_PIXELCENTERCORRECTION}.z;"
    );
    if !caps.clip_control {
        out.write("\to.pos.z = o.pos.z * 2.0 - o.pos.w;\n");
    }

    // Mirror for negative viewports, then shift to the 7/12 pixel centre.
    writeln!(
        out,
        "\to.pos.xy *= sign({I_PIXELCENTERCORRECTION}.xy * float2(1.0, -1.0));\n\
         \to.pos.xy = o.pos.xy - o.pos.w * {I_PIXELCENTERCORRECTION}.xy;\n"
    );
}

fn write_outputs(
    out: &mut ShaderCode,
    target: ShaderTarget,
    caps: &ShaderCapabilities,
    num_texgens: u32,
) {
    if target.is_glsl() {
        if uses_interface_block(target, caps) {
            let mut members = vec!["pos", "colors_0", "colors_1", "clipPos"];
            if caps.per_pixel_lighting {
                members.extend(["Normal", "WorldPos"]);
            }
            if caps.depth_clamp {
                members.extend(["clipDist0", "clipDist1"]);
            }
            for member in members {
                writeln!(out, "\tvs.{member} = o.{member};");
            }
            for i in 0..num_texgens {
                writeln!(out, "\tvs.tex[{i}] = o.tex[{i}];");
            }
        } else {
            let mut members = vec!["colors_0", "colors_1", "clipPos"];
            if caps.per_pixel_lighting {
                members.extend(["Normal", "WorldPos"]);
            }
            for member in members {
                writeln!(out, "\t{member} = o.{member};");
            }
            for i in 0..num_texgens {
                writeln!(out, "\ttex[{i}] = o.tex[{i}];");
            }
        }

        if caps.depth_clamp {
            out.write(
                "\tgl_ClipDistance[0] = o.clipDist0;\n\
                 \tgl_ClipDistance[1] = o.clipDist1;\n",
            );
        }
    }
    out.write("\t");
    target.write_position_output(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(num_texgens: u8) -> ShaderVariantKey {
        ShaderVariantKey {
            num_texgens,
            ..Default::default()
        }
    }

    fn braces_balanced(code: &str) -> bool {
        let mut depth = 0i32;
        for c in code.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return false;
            }
        }
        depth == 0
    }

    #[test]
    fn generation_is_deterministic() {
        let caps = ShaderCapabilities::all();
        for target in ShaderTarget::ALL {
            assert_eq!(
                generate_vertex_shader(target, &caps, &key(4)),
                generate_vertex_shader(target, &caps, &key(4))
            );
        }
    }

    #[test]
    fn every_variant_is_structurally_complete() {
        for target in ShaderTarget::ALL {
            for caps in [ShaderCapabilities::all(), ShaderCapabilities::default()] {
                for n in 0..=8u8 {
                    let shader = generate_vertex_shader(target, &caps, &key(n));
                    assert!(braces_balanced(&shader.code), "{target} t{n}");
                    assert!(shader.code.starts_with("// Vertex UberShader\n"));
                    assert!(shader.code.ends_with("}\n"));
                    assert_eq!(shader.blocks, vec![VertexConstants::LAYOUT]);
                }
            }
        }
    }

    #[test]
    fn texgen_count_sizes_the_outputs() {
        let caps = ShaderCapabilities::all();
        let none = generate_vertex_shader(ShaderTarget::OpenGl, &caps, &key(0));
        assert!(!none.code.contains("o.tex["));
        assert!(!none.code.contains("Texture coordinate generation"));

        let one = generate_vertex_shader(ShaderTarget::OpenGl, &caps, &key(1));
        assert!(one.code.contains("{ const uint texgen = 0u;"));
        assert!(one.code.contains("case 0u: o.tex[0] = output_tex; break;"));

        let eight = generate_vertex_shader(ShaderTarget::D3d, &caps, &key(8));
        assert!(eight.code.contains("[loop] for (uint texgen = 0u; texgen < 8u; texgen++) {"));
        assert!(eight.code.contains("case 7u: o.tex[7] = output_tex; break;"));
        assert!(eight.code.contains("case 7u: tmp = int(tex7.z); break;"));
        assert!(eight.code.contains("\tfloat3 tex[8] : TEXCOORD0;\n"));
        assert!(!eight.code.contains("o.tex[8]"));
    }

    #[test]
    fn every_texgen_source_row_is_dispatched() {
        let shader =
            generate_vertex_shader(ShaderTarget::OpenGl, &ShaderCapabilities::all(), &key(3));
        let code = &shader.code;
        assert!(code.contains(&format!(
            "\t\tcase {}u: // geometry\n\t\t\tcoord.xyz = rawpos.xyz;\n",
            TexGenSource::GEOM_ROW
        )));
        for (row, flag, input) in [
            (TexGenSource::NORMAL_ROW, components::NRM0, "rawnorm0"),
            (TexGenSource::BINORMAL_T_ROW, components::NRM1, "rawnorm1"),
            (TexGenSource::BINORMAL_B_ROW, components::NRM2, "rawnorm2"),
        ] {
            assert!(code.contains(&format!(
                "\t\tcase {row}u:\n\t\t\tcoord.xyz = ((components & {flag}u) != 0u) ? {input}.xyz : coord.xyz;\n"
            )));
        }
        for i in 0..8u32 {
            assert!(code.contains(&format!(
                "\t\tcase {}u: // tex{i}\n\t\t\tcoord = ((components & {}u) != 0u) ? float4(tex{i}.x, tex{i}.y, 1.0, 1.0) : coord;\n",
                TexGenSource::TEX0_ROW + i,
                components::uv(i)
            )));
        }
    }

    #[test]
    fn every_texgen_type_is_dispatched() {
        let shader =
            generate_vertex_shader(ShaderTarget::OpenGl, &ShaderCapabilities::all(), &key(3));
        let code = &shader.code;

        // Emboss offsets an earlier texgen along the light direction.
        assert!(code.contains(&format!("\t\tcase {}u: {{ // emboss\n", TexGenType::EmbossMap as u32)));
        assert!(code.contains("\t\t\tcase 2u: output_tex = o.tex[2]; break;\n"));
        assert!(!code.contains("\t\t\tcase 3u: output_tex = o.tex[3]; break;\n"));
        assert!(code.contains(&format!(
            "\t\t\t\tfloat3 ldir = normalize({I_LIGHTS}[light].pos.xyz - pos.xyz);\n\
             \t\t\t\toutput_tex += float3(dot(ldir, _norm1), dot(ldir, _norm2), 0.0);\n"
        )));

        for (ty, color) in [
            (TexGenType::ColorStrgbc0, "o.colors_0"),
            (TexGenType::ColorStrgbc1, "o.colors_1"),
        ] {
            assert!(code.contains(&format!(
                "\t\tcase {}u:\n\t\t\toutput_tex = float3({color}.x, {color}.y, 1.0);\n",
                ty as u32
            )));
        }
        assert!(code.contains("\t\tdefault: { // regular\n"));

        // q == 0 on a regular texgen halves and clamps s/t.
        assert!(code.contains(&format!(
            "\t\tif (texgentype == {}u && output_tex.z == 0.0)\n\
             \t\t\toutput_tex.xy = clamp(output_tex.xy / 2.0, float2(-1.0, -1.0), float2(1.0, 1.0));\n",
            TexGenType::Regular as u32
        )));
    }

    #[test]
    fn all_texcoord_inputs_are_declared() {
        let gl = generate_vertex_shader(ShaderTarget::OpenGl, &ShaderCapabilities::all(), &key(2));
        assert!(gl.code.contains("ATTRIBUTE_LOCATION(8) in float3 tex0;"));
        assert!(gl.code.contains("ATTRIBUTE_LOCATION(15) in float3 tex7;"));
        let d3d = generate_vertex_shader(ShaderTarget::D3d, &ShaderCapabilities::all(), &key(2));
        assert!(d3d.code.contains("float3 tex7 : TEXCOORD7"));
        assert!(d3d.code.contains("uint posmtx : BLENDINDICES"));
    }

    #[test]
    fn every_lighting_function_is_dispatched() {
        let shader =
            generate_vertex_shader(ShaderTarget::Vulkan, &ShaderCapabilities::all(), &key(0));
        for attn in AttenuationFunction::ALL {
            assert!(shader.code.contains(&format!("\tcase {}u: // {:?}\n", attn as u32, attn)));
        }
        for diffuse in [DiffuseFunction::None, DiffuseFunction::Sign, DiffuseFunction::Clamp] {
            assert!(shader.code.contains(&format!(
                "return iround({} * float4(clights[index].color));",
                diffuse.shader_factor()
            )));
        }
        assert!(shader.code.contains("for (uint chan = 0u; chan < xfmem_numColorChans; chan++) {"));
        assert!(shader.code.contains("uint light_mask = bitfieldExtract(colorreg, 2, 4) | (bitfieldExtract(colorreg, 11, 4) << 4u);"));
    }

    #[test]
    fn clip_distances_follow_depth_clamp() {
        let with = generate_vertex_shader(ShaderTarget::OpenGl, &ShaderCapabilities::all(), &key(0));
        assert!(with.code.contains("gl_ClipDistance[0] = o.clipDist0;"));
        assert!(with.code.contains("vs.clipDist1 = o.clipDist1;"));
        assert!(!with.code.contains("o.pos.z = o.pos.z * 2.0 - o.pos.w;"));

        let without =
            generate_vertex_shader(ShaderTarget::OpenGl, &ShaderCapabilities::default(), &key(0));
        assert!(!without.code.contains("gl_ClipDistance"));
        assert!(without.code.contains("o.pos.z = o.pos.z * 2.0 - o.pos.w;"));
    }

    #[test]
    fn position_output_per_target() {
        let caps = ShaderCapabilities::all();
        let vk = generate_vertex_shader(ShaderTarget::Vulkan, &caps, &key(0));
        assert!(vk.code.contains("\tgl_Position = float4(o.pos.x, -o.pos.y, o.pos.z, o.pos.w);\n"));

        let gl = generate_vertex_shader(ShaderTarget::OpenGl, &caps, &key(0));
        assert!(gl.code.contains("\tgl_Position = o.pos;\n"));

        let d3d = generate_vertex_shader(ShaderTarget::D3d, &caps, &key(0));
        assert!(d3d.code.ends_with("\treturn o;\n}\n"));
        assert!(d3d.code.contains("cbuffer VSBlock : register(b0) {"));
    }

    #[test]
    fn varyings_without_geometry_shaders() {
        let caps = ShaderCapabilities {
            per_pixel_lighting: true,
            ..Default::default()
        };
        let shader = generate_vertex_shader(ShaderTarget::OpenGl, &caps, &key(2));
        assert!(!shader.code.contains("out VertexData"));
        assert!(shader.code.contains("out float3 tex[2];"));
        assert!(shader.code.contains("\ttex[1] = o.tex[1];\n"));
        assert!(shader.code.contains("\tWorldPos = o.WorldPos;\n"));
        assert!(shader.code.contains("\to.Normal = _norm0;\n"));

        // Vulkan always links through the interface block.
        let vk = generate_vertex_shader(ShaderTarget::Vulkan, &caps, &key(2));
        assert!(vk.code.contains("VARYING_LOCATION(0) out VertexData {"));
        assert!(vk.code.contains("\tvs.tex[1] = o.tex[1];\n"));
    }

    #[test]
    fn interpolation_qualifier_on_outputs() {
        let shader = generate_vertex_shader(
            ShaderTarget::Vulkan,
            &ShaderCapabilities::all(),
            &ShaderVariantKey {
                num_texgens: 1,
                msaa: true,
                ..Default::default()
            },
        );
        assert!(shader.code.contains("\tcentroid float3 tex[1];\n"));
        // The local output struct never carries qualifiers.
        assert!(shader.code.contains("struct VS_OUTPUT {\n\tfloat4 pos;\n"));
    }
}
