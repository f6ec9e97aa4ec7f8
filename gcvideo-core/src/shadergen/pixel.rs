// Pixel uber-shader generator.
//
// Emits one fragment program that walks all active TEV stages at run time.
// Stage count, combiner words, orders, konst selects, alpha test, fog and
// depth texturing are all read from `UBERBlock` / `PSBlock`, so the text
// only depends on the target, the backend capabilities and the variant key.

use log::debug;

use super::{
    interpolation_qualifier, uses_interface_block, write_bitfield_extract_fallback,
    write_common_header, write_loose_varyings, write_vs_output_members, GeneratedShader,
    ShaderCapabilities, ShaderCode, ShaderTarget, ShaderVariantKey,
};
use crate::constants::pixel::{I_ALPHA, I_COLORS, I_FOGCOLOR, I_FOGF, I_FOGI, I_TEXDIMS, I_ZBIAS};
use crate::constants::{PixelConstants, UberConstants, UniformBlock};
use crate::gx::bitfield::BitField;
use crate::gx::bp::{
    alpha_env, alpha_test, color_env, constant_alpha, fog, genmode, ksel, tev_order, ztex,
};
use crate::gx::tev::{
    AlphaCompare, AlphaTestLogic, FogFunction, TevAlphaArg, TevBias, TevColorArg, TevCompareOp,
    TevRegId, TevScale,
};

/// Uniform blocks a pixel uber-shader declares, in declaration order.
pub fn pixel_shader_blocks() -> Vec<UniformBlock> {
    vec![PixelConstants::LAYOUT, UberConstants::LAYOUT]
}

/// Generate the pixel uber-shader for `key`.
pub fn generate_pixel_shader(
    target: ShaderTarget,
    caps: &ShaderCapabilities,
    key: &ShaderVariantKey,
) -> GeneratedShader {
    let mut out = ShaderCode::new();

    out.write("// Pixel UberShader\n\n");
    write_common_header(&mut out, target);
    for block in pixel_shader_blocks() {
        block.write_declaration(&mut out, target);
    }
    out.write("\n");

    if !caps.native_bitfield_extract(target) {
        write_bitfield_extract_fallback(&mut out);
    }

    target.write_sampler_declarations(&mut out);
    write_sample_texture(&mut out, target, caps);
    write_swizzle(&mut out);
    write_tev_lerp(&mut out);
    write_tev_compare(&mut out);
    write_alpha_compare(&mut out);
    write_state(&mut out);

    write_entry_point(&mut out, target, caps, key);
    write_tev_loop(&mut out, target, key);
    write_alpha_test(&mut out);
    write_depth(&mut out, target, key);
    write_fog(&mut out);
    write_outputs(&mut out, caps);
    out.write("}\n");

    debug!(
        "Generated {} pixel uber-shader for {} ({} bytes)",
        target,
        key,
        out.len()
    );

    GeneratedShader {
        code: out.into_string(),
        blocks: pixel_shader_blocks(),
    }
}

fn write_sample_texture(out: &mut ShaderCode, target: ShaderTarget, caps: &ShaderCapabilities) {
    out.write("int4 sampleTexture(uint sampler_num, float2 uv)\n{\n");
    if caps.dynamic_sampler_indexing {
        writeln!(
            out,
            "\treturn iround({} * 255.0);",
            target.sample_texture("sampler_num", "uv")
        );
    } else {
        // No dynamic indexing of the sampler array: select with a switch.
        out.write("\tswitch (sampler_num) {\n");
        for i in 0..8 {
            writeln!(
                out,
                "\tcase {i}u: return iround({} * 255.0);",
                target.sample_texture(&i.to_string(), "uv")
            );
        }
        out.write("\t}\n\treturn int4(0, 0, 0, 0);\n");
    }
    out.write("}\n\n");
}

/// Colour channel swapping through the swap tables held in the KSEL pairs.
fn write_swizzle(out: &mut ShaderCode) {
    out.write("int4 Swizzle(uint s, int4 color)\n{\n\tint4 ret;\n");
    writeln!(out, "\tret.r = color[{}];", ksel::SWAP1.shader_extract("bpmem_tevksel[s * 2u].x"));
    writeln!(out, "\tret.g = color[{}];", ksel::SWAP2.shader_extract("bpmem_tevksel[s * 2u].x"));
    writeln!(
        out,
        "\tret.b = color[{}];",
        ksel::SWAP1.shader_extract("bpmem_tevksel[s * 2u + 1u].x")
    );
    writeln!(
        out,
        "\tret.a = color[{}];",
        ksel::SWAP2.shader_extract("bpmem_tevksel[s * 2u + 1u].x")
    );
    out.write("\treturn ret;\n}\n\n");
}

fn write_tev_lerp(out: &mut ShaderCode) {
    let divide_by_2 = TevScale::DivideBy2 as u32;
    out.write(
        "// One channel of the TEV lerp, plus bias, add/subtract and scale\n\
         int tevLerp(int A, int B, int C, int D, uint bias, bool op, uint shift)\n\
         {\n\
         \tC += C >> 7; // 0..255 -> 0..256\n\
         \tint lerp = (A << 8) + (B - A) * C;\n",
    );
    writeln!(out, "\tif (shift != {divide_by_2}u) {{");
    out.write(
        "\t\tlerp = lerp << shift;\n\
         \t\tlerp = lerp + (op ? 127 : 128);\n\
         \t\tD = D << shift;\n\
         \t}\n\
         \tint result = lerp >> 8;\n\n",
    );
    writeln!(out, "\tif (bias == {}u) result += 128;", TevBias::AddHalf as u32);
    writeln!(out, "\telse if (bias == {}u) result -= 128;", TevBias::SubHalf as u32);
    out.write(
        "\tif (op)\n\
         \t\tresult = D - result;\n\
         \telse\n\
         \t\tresult = D + result;\n\n",
    );
    writeln!(out, "\tif (shift == {divide_by_2}u)");
    out.write("\t\tresult = result >> 1;\n\treturn result;\n}\n\n");
}

/// Compare operations 0-5, shared by the colour and alpha combiners.
fn write_tev_compare(out: &mut ShaderCode) {
    out.write("bool tevCompare(uint op, int3 color_A, int3 color_B)\n{\n\tswitch (op) {\n");
    for op in TevCompareOp::ALL {
        if let Some(condition) = op.shader_condition() {
            writeln!(out, "\tcase {}u: // {:?}\n\t\treturn {};", op as u32, op, condition);
        }
    }
    out.write("\tdefault:\n\t\treturn false;\n\t}\n}\n\n");
}

fn write_alpha_compare(out: &mut ShaderCode) {
    out.write("bool alphaCompare(int a, int b, uint compare)\n{\n\tswitch (compare) {\n");
    for cmp in AlphaCompare::ALL {
        writeln!(
            out,
            "\tcase {}u: // {:?}\n\t\treturn {};",
            cmp as u32,
            cmp,
            cmp.shader_condition()
        );
    }
    out.write("\t}\n\treturn false;\n}\n\n");
}

fn write_state(out: &mut ShaderCode) {
    out.write(
        "struct State {\n\
         \tint4 Reg[4];\n\
         \tint4 RasColor;\n\
         \tint4 TexColor;\n\
         \tint4 KonstColor;\n\
         };\n\n",
    );

    out.write("int3 selectColorInput(State s, uint index)\n{\n\tswitch (index) {\n");
    for arg in TevColorArg::ALL {
        writeln!(
            out,
            "\tcase {}u: // {:?}\n\t\treturn {};",
            arg as u32,
            arg,
            arg.shader_source()
        );
    }
    out.write("\t}\n\treturn int3(0, 0, 0);\n}\n\n");

    out.write("int selectAlphaInput(State s, uint index)\n{\n\tswitch (index) {\n");
    for arg in TevAlphaArg::ALL {
        writeln!(
            out,
            "\tcase {}u: // {:?}\n\t\treturn {};",
            arg as u32,
            arg,
            arg.shader_source()
        );
    }
    out.write("\t}\n\treturn 0;\n}\n\n");

    out.write("void setRegColor(inout State s, uint index, int3 color)\n{\n\tswitch (index) {\n");
    for reg in TevRegId::ALL {
        writeln!(
            out,
            "\tcase {}u: // {:?}\n\t\ts.Reg[{}].rgb = color;\n\t\tbreak;",
            reg as u32,
            reg,
            reg.register_index()
        );
    }
    out.write("\t}\n}\n\n");

    out.write("void setRegAlpha(inout State s, uint index, int alpha)\n{\n\tswitch (index) {\n");
    for reg in TevRegId::ALL {
        writeln!(
            out,
            "\tcase {}u: // {:?}\n\t\ts.Reg[{}].a = alpha;\n\t\tbreak;",
            reg as u32,
            reg,
            reg.register_index()
        );
    }
    out.write("\t}\n}\n\n");
}

fn write_entry_point(
    out: &mut ShaderCode,
    target: ShaderTarget,
    caps: &ShaderCapabilities,
    key: &ShaderVariantKey,
) {
    let num_texgens = key.num_texgens as u32;
    let qualifier = interpolation_qualifier(key);

    if key.early_depth && caps.early_z {
        target.write_early_depth(out);
    }

    if target.is_glsl() {
        if caps.dual_source_blend {
            out.write(
                "FRAGMENT_OUTPUT_LOCATION_INDEXED(0, 0) out float4 ocol0;\n\
                 FRAGMENT_OUTPUT_LOCATION_INDEXED(0, 1) out float4 ocol1;\n",
            );
        } else {
            out.write("FRAGMENT_OUTPUT_LOCATION(0) out float4 ocol0;\n");
        }
        if !key.early_depth {
            out.write("#define depth gl_FragDepth\n");
        }

        if uses_interface_block(target, caps) {
            out.write("VARYING_LOCATION(0) in VertexData {\n");
            write_vs_output_members(out, target, caps, num_texgens, qualifier);
            out.write("};\n");
        } else {
            write_loose_varyings(out, "in", caps, num_texgens, qualifier);
        }

        out.write("\nvoid main()\n{\n\tfloat4 rawpos = gl_FragCoord;\n");
    } else {
        let mut params = vec!["out float4 ocol0 : SV_Target0".to_string()];
        if caps.dual_source_blend {
            params.push("out float4 ocol1 : SV_Target1".to_string());
        }
        if !key.early_depth {
            params.push("out float depth : SV_Depth".to_string());
        }
        params.push("in float4 rawpos : SV_Position".to_string());
        params.push(format!("in {qualifier}float4 colors_0 : COLOR0"));
        params.push(format!("in {qualifier}float4 colors_1 : COLOR1"));
        if num_texgens > 0 {
            params.push(format!("in {qualifier}float3 tex[{num_texgens}] : TEXCOORD0"));
        }
        params.push(format!("in {qualifier}float4 clipPos : TEXCOORD{num_texgens}"));
        if caps.per_pixel_lighting {
            params.push(format!(
                "in {qualifier}float3 Normal : TEXCOORD{}",
                num_texgens + 1
            ));
            params.push(format!(
                "in {qualifier}float3 WorldPos : TEXCOORD{}",
                num_texgens + 2
            ));
        }
        writeln!(out, "void main(\n\t{})\n{{", params.join(",\n\t"));
    }

    out.write(
        "\tint AlphaBump = 0;\n\
         \tint4 icolors_0 = iround(colors_0 * 255.0);\n\
         \tint4 icolors_1 = iround(colors_1 * 255.0);\n\
         \tint4 TevResult = int4(0, 0, 0, 0);\n\
         \tState s;\n\
         \ts.TexColor = int4(0, 0, 0, 0);\n\
         \ts.RasColor = int4(0, 0, 0, 0);\n\
         \ts.KonstColor = int4(0, 0, 0, 0);\n",
    );
    for i in 0..4 {
        writeln!(out, "\ts.Reg[{i}] = {I_COLORS}[{i}];");
    }
    out.write("\n");
}

fn write_tev_loop(out: &mut ShaderCode, target: ShaderTarget, key: &ShaderVariantKey) {
    writeln!(
        out,
        "\tuint num_stages = {};\n",
        genmode::NUM_TEV_STAGES.shader_extract("bpmem_genmode")
    );
    writeln!(
        out,
        "\t{}for (uint stage = 0u; stage <= num_stages; stage++)\n\t{{",
        target.loop_attribute()
    );
    out.write(
        "\t\tuint cc = bpmem_combiners[stage].x;\n\
         \t\tuint ac = bpmem_combiners[stage].y;\n\
         \t\tuint order = bpmem_tevorder[stage >> 1].x;\n\
         \t\tif ((stage & 1u) == 1u)\n",
    );
    writeln!(out, "\t\t\torder = order >> {}u;\n", tev_order::ODD_STAGE_SHIFT);

    if key.num_texgens != 0 {
        write_stage_texture(out, key.num_texgens as u32);
    }
    write_stage_konst(out);
    write_stage_ras(out);
    write_color_combiner(out);
    write_alpha_combiner(out);

    out.write("\t} // tev loop\n\n");
}

fn write_stage_texture(out: &mut ShaderCode, num_texgens: u32) {
    writeln!(
        out,
        "\t\tif ((order & {}u) != 0u) {{",
        tev_order::ENABLE0.shifted_mask()
    );
    writeln!(
        out,
        "\t\t\tuint sampler_num = {};",
        tev_order::TEXMAP0.shader_extract("order")
    );
    writeln!(
        out,
        "\t\t\tuint tex_coord = min({}, {}u);",
        tev_order::TEXCOORD0.shader_extract("order"),
        num_texgens - 1
    );
    writeln!(out, "\t\t\tfloat2 coord = tex[tex_coord].xy;");
    out.write(
        "\t\t\tif ((bpmem_projection & (1u << tex_coord)) != 0u)\n\
         \t\t\t\tcoord = coord / tex[tex_coord].z;\n",
    );
    writeln!(
        out,
        "\t\t\tint2 fixedPoint_uv = itrunc(coord * {I_TEXDIMS}[tex_coord].zw * 128.0);"
    );
    writeln!(
        out,
        "\t\t\tfloat2 uv = (float2(fixedPoint_uv) / 128.0) * {I_TEXDIMS}[sampler_num].xy;\n"
    );
    out.write("\t\t\tint4 texel = sampleTexture(sampler_num, uv);\n");
    writeln!(out, "\t\t\tuint swap = {};", alpha_env::TSWAP.shader_extract("ac"));
    out.write(
        "\t\t\ts.TexColor = Swizzle(swap, texel);\n\
         \t\t} else {\n\
         \t\t\ts.TexColor = int4(255, 255, 255, 255);\n\
         \t\t}\n\n",
    );
}

fn write_stage_konst(out: &mut ShaderCode) {
    out.write(
        "\t\tuint tevksel = bpmem_tevksel[stage >> 1].x;\n\
         \t\tif ((stage & 1u) == 0u)\n",
    );
    writeln!(
        out,
        "\t\t\ts.KonstColor = int4(konstLookup[{}].rgb, konstLookup[{}].a);",
        ksel::KCSEL0.shader_extract("tevksel"),
        ksel::KASEL0.shader_extract("tevksel")
    );
    out.write("\t\telse\n");
    writeln!(
        out,
        "\t\t\ts.KonstColor = int4(konstLookup[{}].rgb, konstLookup[{}].a);\n",
        ksel::KCSEL1.shader_extract("tevksel"),
        ksel::KASEL1.shader_extract("tevksel")
    );
}

fn write_stage_ras(out: &mut ShaderCode) {
    writeln!(
        out,
        "\t\tuint ras = {};",
        tev_order::COLORCHAN0.shader_extract("order")
    );
    out.write(
        "\t\tif (ras < 2u) {\n\
         \t\t\tint4 ras_color = (ras == 0u) ? icolors_0 : icolors_1;\n",
    );
    writeln!(out, "\t\t\tuint swap = {};", alpha_env::RSWAP.shader_extract("ac"));
    out.write(
        "\t\t\ts.RasColor = Swizzle(swap, ras_color);\n\
         \t\t} else if (ras == 5u) { // alpha bump\n\
         \t\t\ts.RasColor = int4(AlphaBump, AlphaBump, AlphaBump, AlphaBump);\n\
         \t\t} else if (ras == 6u) { // normalized alpha bump\n\
         \t\t\tint normalized = AlphaBump | AlphaBump >> 5;\n\
         \t\t\ts.RasColor = int4(normalized, normalized, normalized, normalized);\n\
         \t\t} else {\n\
         \t\t\ts.RasColor = int4(0, 0, 0, 0);\n\
         \t\t}\n\n",
    );
}

fn write_color_combiner(out: &mut ShaderCode) {
    let fields = [
        ("uint", "color_a", color_env::A),
        ("uint", "color_b", color_env::B),
        ("uint", "color_c", color_env::C),
        ("uint", "color_d", color_env::D),
        ("uint", "color_bias", color_env::BIAS),
        ("bool", "color_op", color_env::OP),
        ("bool", "color_clamp", color_env::CLAMP),
        ("uint", "color_shift", color_env::SHIFT),
        ("uint", "color_dest", color_env::DEST),
    ];
    out.write("\t\t// Color combiner\n\t\t{\n");
    write_combiner_fields(out, "cc", &fields);

    out.write(
        "\t\t\tuint color_compare_op = color_shift << 1 | uint(color_op);\n\n\
         \t\t\tint3 color_A = selectColorInput(s, color_a) & int3(255, 255, 255);\n\
         \t\t\tint3 color_B = selectColorInput(s, color_b) & int3(255, 255, 255);\n\
         \t\t\tint3 color_C = selectColorInput(s, color_c) & int3(255, 255, 255);\n\
         \t\t\tint3 color_D = selectColorInput(s, color_d); // 10 bits + sign\n\n\
         \t\t\tint3 color_result;\n",
    );
    writeln!(out, "\t\t\tif (color_bias != {}u) {{", TevBias::Compare as u32);
    for ch in ["r", "g", "b"] {
        writeln!(
            out,
            "\t\t\t\tcolor_result.{ch} = tevLerp(color_A.{ch}, color_B.{ch}, color_C.{ch}, \
             color_D.{ch}, color_bias, color_op, color_shift);"
        );
    }
    out.write("\t\t\t} else {\n");
    for (keyword, op, cmp) in [
        ("if", TevCompareOp::Channel8Gt, ">"),
        ("} else if", TevCompareOp::Channel8Eq, "=="),
    ] {
        writeln!(out, "\t\t\t\t{keyword} (color_compare_op == {}u) {{", op as u32);
        for ch in ["r", "g", "b"] {
            writeln!(
                out,
                "\t\t\t\t\tcolor_result.{ch} = (color_A.{ch} {cmp} color_B.{ch}) ? color_C.{ch} : 0;"
            );
        }
    }
    out.write(
        "\t\t\t\t} else {\n\
         \t\t\t\t\tcolor_result = tevCompare(color_compare_op, color_A, color_B) ? color_C : int3(0, 0, 0);\n\
         \t\t\t\t}\n\
         \t\t\t\tcolor_result = color_D + color_result;\n\
         \t\t\t}\n\n\
         \t\t\tif (color_clamp)\n\
         \t\t\t\tcolor_result = clamp(color_result, 0, 255);\n\
         \t\t\telse\n\
         \t\t\t\tcolor_result = clamp(color_result, -1024, 1023);\n\n\
         \t\t\tif (stage == num_stages)\n\
         \t\t\t\tTevResult.rgb = color_result;\n\
         \t\t\telse\n\
         \t\t\t\tsetRegColor(s, color_dest, color_result);\n\n",
    );
}

fn write_alpha_combiner(out: &mut ShaderCode) {
    let fields = [
        ("uint", "alpha_a", alpha_env::A),
        ("uint", "alpha_b", alpha_env::B),
        ("uint", "alpha_c", alpha_env::C),
        ("uint", "alpha_d", alpha_env::D),
        ("uint", "alpha_bias", alpha_env::BIAS),
        ("bool", "alpha_op", alpha_env::OP),
        ("bool", "alpha_clamp", alpha_env::CLAMP),
        ("uint", "alpha_shift", alpha_env::SHIFT),
        ("uint", "alpha_dest", alpha_env::DEST),
    ];
    out.write("\t\t\t// Alpha combiner\n");
    write_combiner_fields(out, "ac", &fields);

    let compare = TevBias::Compare as u32;
    out.write(
        "\t\t\tuint alpha_compare_op = alpha_shift << 1 | uint(alpha_op);\n\n\
         \t\t\tint alpha_A = 0;\n\
         \t\t\tint alpha_B = 0;\n",
    );
    // Packed compares (0-5) read the colour inputs, so A/B are only needed
    // for the lerp and the per-channel compares.
    writeln!(
        out,
        "\t\t\tif (alpha_bias != {compare}u || alpha_compare_op > {}u) {{",
        TevCompareOp::Bgr24Eq as u32
    );
    out.write(
        "\t\t\t\talpha_A = selectAlphaInput(s, alpha_a) & 255;\n\
         \t\t\t\talpha_B = selectAlphaInput(s, alpha_b) & 255;\n\
         \t\t\t}\n\
         \t\t\tint alpha_C = selectAlphaInput(s, alpha_c) & 255;\n\
         \t\t\tint alpha_D = selectAlphaInput(s, alpha_d); // 10 bits + sign\n\n\
         \t\t\tint alpha_result;\n",
    );
    writeln!(out, "\t\t\tif (alpha_bias != {compare}u) {{");
    out.write(
        "\t\t\t\talpha_result = tevLerp(alpha_A, alpha_B, alpha_C, alpha_D, alpha_bias, alpha_op, alpha_shift);\n\
         \t\t\t} else {\n",
    );
    writeln!(
        out,
        "\t\t\t\tif (alpha_compare_op == {}u) {{",
        TevCompareOp::Channel8Gt as u32
    );
    out.write("\t\t\t\t\talpha_result = (alpha_A > alpha_B) ? alpha_C : 0;\n");
    writeln!(
        out,
        "\t\t\t\t}} else if (alpha_compare_op == {}u) {{",
        TevCompareOp::Channel8Eq as u32
    );
    out.write(
        "\t\t\t\t\talpha_result = (alpha_A == alpha_B) ? alpha_C : 0;\n\
         \t\t\t\t} else {\n\
         \t\t\t\t\talpha_result = tevCompare(alpha_compare_op, color_A, color_B) ? alpha_C : 0;\n\
         \t\t\t\t}\n\
         \t\t\t\talpha_result = alpha_D + alpha_result;\n\
         \t\t\t}\n\n\
         \t\t\tif (alpha_clamp)\n\
         \t\t\t\talpha_result = clamp(alpha_result, 0, 255);\n\
         \t\t\telse\n\
         \t\t\t\talpha_result = clamp(alpha_result, -1024, 1023);\n\n\
         \t\t\tif (stage == num_stages) {\n\
         \t\t\t\tTevResult.a = alpha_result;\n\
         \t\t\t\tbreak;\n\
         \t\t\t} else {\n\
         \t\t\t\tsetRegAlpha(s, alpha_dest, alpha_result);\n\
         \t\t\t}\n\
         \t\t}\n",
    );
}

fn write_combiner_fields(
    out: &mut ShaderCode,
    word: &str,
    fields: &[(&str, &str, BitField)],
) {
    for (ty, name, field) in fields {
        if *ty == "bool" {
            writeln!(out, "\t\t\tbool {name} = bool({});", field.shader_extract(word));
        } else {
            writeln!(out, "\t\t\t{ty} {name} = {};", field.shader_extract(word));
        }
    }
}

fn write_alpha_test(out: &mut ShaderCode) {
    writeln!(
        out,
        "\tbool comp0 = alphaCompare(TevResult.a, {I_ALPHA}.r, {});",
        alpha_test::COMP0.shader_extract("bpmem_alphaTest")
    );
    writeln!(
        out,
        "\tbool comp1 = alphaCompare(TevResult.a, {I_ALPHA}.g, {});\n",
        alpha_test::COMP1.shader_extract("bpmem_alphaTest")
    );
    writeln!(
        out,
        "\tswitch ({}) {{",
        alpha_test::LOGIC.shader_extract("bpmem_alphaTest")
    );
    for logic in AlphaTestLogic::ALL {
        writeln!(
            out,
            "\tcase {}u: // {:?}\n\t\tif ({}) break; else discard; break;",
            logic as u32,
            logic,
            logic.shader_condition()
        );
    }
    out.write("\t}\n\n");
}

fn write_depth(out: &mut ShaderCode, target: ShaderTarget, key: &ShaderVariantKey) {
    writeln!(out, "\tuint zCoord = {};", target.window_depth());
    out.write("\tzCoord = clamp(zCoord, 0u, 0xFFFFFFu);\n\n");

    if key.per_pixel_depth {
        writeln!(out, "\tuint ztex_op = {};", ztex::OP.shader_extract("bpmem_ztex2"));
        out.write("\tif (ztex_op != 0u) {\n");
        writeln!(out, "\t\tuint ztex = uint({I_ZBIAS}[1].w);");
        // The last stage's texture is the depth texture.
        writeln!(out, "\t\tztex += uint(idot(s.TexColor, {I_ZBIAS}[0]));");
        out.write(
            "\t\tif (ztex_op == 1u)\n\
             \t\t\tztex += zCoord;\n\
             \t\tzCoord = clamp(ztex, 0u, 0xFFFFFFu);\n\
             \t}\n\n",
        );
    }

    if !key.early_depth {
        writeln!(out, "\t{}", target.depth_output().trim_end());
    }
    out.write("\n");
}

fn write_fog(out: &mut ShaderCode) {
    writeln!(
        out,
        "\tuint fog_function = {};",
        fog::FSEL.shader_extract("bpmem_fogParam3")
    );
    out.write("\tif (fog_function != 0u) {\n\t\tfloat ze;\n");
    writeln!(
        out,
        "\t\tif ({} == 0u) {{",
        fog::PROJ.shader_extract("bpmem_fogParam3")
    );
    writeln!(
        out,
        "\t\t\t// perspective: ze = A / (B - (Zs >> B_SHF))\n\
         \t\t\tze = ({I_FOGF}[1].x * 16777216.0) / float({I_FOGI}.y - (int(zCoord) >> {I_FOGI}.w));"
    );
    writeln!(
        out,
        "\t\t}} else {{\n\
         \t\t\t// orthographic: ze = A * Zs\n\
         \t\t\tze = {I_FOGF}[1].x * float(zCoord) / 16777216.0;\n\
         \t\t}}\n"
    );
    writeln!(
        out,
        "\t\tif (bool({})) {{",
        fog::RANGE_ENABLED.shader_extract("bpmem_fogRangeBase")
    );
    writeln!(
        out,
        "\t\t\t// x_adjust = sqrt((x - center)^2 + k^2) / k\n\
         \t\t\tfloat x_adjust = (2.0 * (rawpos.x / {I_FOGF}[0].y)) - 1.0 - {I_FOGF}[0].x;\n\
         \t\t\tx_adjust = sqrt(x_adjust * x_adjust + {I_FOGF}[0].z * {I_FOGF}[0].z) / {I_FOGF}[0].z;\n\
         \t\t\tze *= x_adjust;\n\
         \t\t}}\n"
    );
    writeln!(
        out,
        "\t\tfloat fog = clamp(ze - {I_FOGF}[1].z, 0.0, 1.0);\n"
    );

    out.write("\t\tswitch (fog_function) {\n");
    for code in 4..8u32 {
        if let Some(remap) = FogFunction::from_bits(code).shader_remap() {
            writeln!(out, "\t\tcase {code}u:\n\t\t\t{remap}\n\t\t\tbreak;");
        }
    }
    out.write("\t\t}\n\n");

    writeln!(
        out,
        "\t\tint ifog = iround(fog * 256.0);\n\
         \t\tTevResult.rgb = (TevResult.rgb * (256 - ifog) + {I_FOGCOLOR}.rgb * ifog) >> 8;\n\
         \t}}\n"
    );
}

fn write_outputs(out: &mut ShaderCode, caps: &ShaderCapabilities) {
    out.write("\tocol0 = float4(TevResult) / 255.0;\n");
    if caps.dual_source_blend {
        // Blending reads the combiner alpha from ocol1; ocol0 carries the
        // destination alpha override.
        out.write("\tocol1 = float4(TevResult) / 255.0;\n");
        writeln!(
            out,
            "\tif ((bpmem_dstalpha & {}u) != 0u)",
            constant_alpha::ENABLE.shifted_mask()
        );
        writeln!(
            out,
            "\t\tocol0.a = float({}) / 255.0;",
            constant_alpha::ALPHA.shader_extract("bpmem_dstalpha")
        );
    }
}
