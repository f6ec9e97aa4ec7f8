// CLI command handlers
use anyhow::{Context, Result};
use gcvideo_core::shadergen::pixel::pixel_shader_blocks;
use gcvideo_core::shadergen::vertex::vertex_shader_blocks;
use gcvideo_core::{
    generate_pixel_shader, generate_vertex_shader, GeneratedShader, ShaderCapabilities,
    ShaderTarget, ShaderVariantKey, VideoConfig,
};
use indicatif::ProgressBar;
use std::fs;
use std::path::Path;

type Generator = fn(ShaderTarget, &ShaderCapabilities, &ShaderVariantKey) -> GeneratedShader;

fn write_output(shader: &GeneratedShader, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, &shader.code)
            .with_context(|| format!("Failed to write shader to {}", path.display())),
        None => {
            print!("{}", shader.code);
            Ok(())
        }
    }
}

pub fn dump_pixel(
    config: &VideoConfig,
    target: ShaderTarget,
    key: &ShaderVariantKey,
    output: Option<&Path>,
) -> Result<()> {
    let caps = ShaderCapabilities::from_config(config);
    let shader = generate_pixel_shader(target, &caps, key);
    log::info!("Pixel shader {} for {}: {} bytes", key, target, shader.code.len());
    write_output(&shader, output)
}

pub fn dump_vertex(
    config: &VideoConfig,
    target: ShaderTarget,
    key: &ShaderVariantKey,
    output: Option<&Path>,
) -> Result<()> {
    let caps = ShaderCapabilities::from_config(config);
    let shader = generate_vertex_shader(target, &caps, &key.vertex_variant());
    log::info!("Vertex shader {} for {}: {} bytes", key, target, shader.code.len());
    write_output(&shader, output)
}

pub fn dump_layouts(target: ShaderTarget) {
    let mut blocks = pixel_shader_blocks();
    blocks.extend(vertex_shader_blocks());
    for block in &blocks {
        println!("// {}: {} bytes (std140)", block.name, block.std140_size());
        for (name, offset) in block.std140_offsets() {
            println!("//   {:>5}  {}", offset, name);
        }
        println!("{}", block.declaration(target));
    }
}

/// Pixel plus vertex programs per target.
pub fn variant_count(config: &VideoConfig) -> u64 {
    (ShaderVariantKey::enumerate(config).len() + ShaderVariantKey::enumerate_vertex(config).len())
        as u64
}

/// Write every reachable pixel and vertex variant for `targets` into
/// `output_dir`, plus a `manifest.json` listing them. Returns the number of
/// shader files written.
pub fn precompile(
    config: &VideoConfig,
    targets: &[ShaderTarget],
    output_dir: &Path,
    pb: &ProgressBar,
) -> Result<usize> {
    fs::create_dir_all(output_dir).context("Failed to create output directory")?;
    let caps = ShaderCapabilities::from_config(config);
    let mut entries = Vec::new();

    for &target in targets {
        let extension = if target.is_glsl() { "glsl" } else { "hlsl" };
        let pixel_keys = ShaderVariantKey::enumerate(config);
        let vertex_keys = ShaderVariantKey::enumerate_vertex(config);
        let jobs = pixel_keys
            .iter()
            .map(|key| ("ps", *key, generate_pixel_shader as Generator))
            .chain(
                vertex_keys
                    .iter()
                    .map(|key| ("vs", *key, generate_vertex_shader as Generator)),
            );

        for (stage, key, generate) in jobs {
            pb.set_message(format!("{} {} {}", target, stage, key));
            let shader = generate(target, &caps, &key);
            let file_name = format!("{}_{}_{}.{}", target, stage, key.tag(), extension);
            fs::write(output_dir.join(&file_name), &shader.code)
                .with_context(|| format!("Failed to write {}", file_name))?;
            entries.push(serde_json::json!({
                "file": file_name,
                "target": target,
                "stage": stage,
                "key": key,
                "bytes": shader.code.len(),
            }));
            pb.inc(1);
        }
    }

    let manifest = serde_json::json!({
        "capabilities": caps,
        "shaders": entries,
    });
    let manifest_text =
        serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
    fs::write(output_dir.join("manifest.json"), manifest_text)
        .context("Failed to write manifest")?;

    Ok(entries.len())
}
