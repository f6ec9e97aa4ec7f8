// CLI application
use clap::Parser;
use gcvideo_core::{ShaderTarget, ShaderVariantKey, VideoConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

mod commands;

use commands::{dump_layouts, dump_pixel, dump_vertex, precompile};

#[derive(Parser)]
#[command(name = "gcvideo")]
#[command(about = "GameCube GX uber-shader generator")]
#[command(version)]
struct Cli {
    /// Video configuration file (JSON). Defaults are used if it does not exist.
    #[arg(short, long, global = true, default_value = "gcvideo.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct KeyArgs {
    /// Shading target: opengl, vulkan or d3d
    #[arg(short, long, value_parser = parse_target, default_value = "opengl")]
    target: ShaderTarget,

    /// Active texture coordinate generators (0-8)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=8))]
    texgens: u8,

    /// Depth is written per pixel (depth texturing)
    #[arg(long)]
    per_pixel_depth: bool,

    /// Early depth test
    #[arg(long)]
    early_depth: bool,

    /// Write the source here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl KeyArgs {
    fn key(&self, config: &VideoConfig) -> ShaderVariantKey {
        ShaderVariantKey {
            num_texgens: self.texgens,
            per_pixel_depth: self.per_pixel_depth,
            msaa: config.msaa(),
            ssaa: config.ssaa(),
            early_depth: self.early_depth,
        }
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print the pixel uber-shader for one variant
    Pixel(KeyArgs),
    /// Print the vertex uber-shader for one variant
    Vertex(KeyArgs),
    /// Print the uniform block declarations and their std140 layout
    Layout {
        #[arg(short, long, value_parser = parse_target, default_value = "opengl")]
        target: ShaderTarget,
    },
    /// Generate every reachable variant into a directory
    Precompile {
        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Restrict to one target (default: all)
        #[arg(short, long, value_parser = parse_target)]
        target: Option<ShaderTarget>,
    },
}

fn parse_target(name: &str) -> Result<ShaderTarget, String> {
    ShaderTarget::from_name(name).ok_or_else(|| {
        let names: Vec<_> = ShaderTarget::ALL.iter().map(|t| t.name()).collect();
        format!("unknown target '{}', expected one of {}", name, names.join(", "))
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = VideoConfig::load(&cli.config)?;

    match cli.command {
        Commands::Pixel(args) => {
            dump_pixel(&config, args.target, &args.key(&config), args.output.as_deref())?;
        }
        Commands::Vertex(args) => {
            dump_vertex(&config, args.target, &args.key(&config), args.output.as_deref())?;
        }
        Commands::Layout { target } => dump_layouts(target),
        Commands::Precompile { output_dir, target } => {
            let targets: Vec<ShaderTarget> = match target {
                Some(target) => vec![target],
                None => ShaderTarget::ALL.to_vec(),
            };
            let total = commands::variant_count(&config) * targets.len() as u64;
            let pb = create_progress_bar(total);
            let written = precompile(&config, &targets, &output_dir, &pb)?;
            pb.finish_with_message(format!("Wrote {} shaders", written));
        }
    }

    Ok(())
}

fn create_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}
