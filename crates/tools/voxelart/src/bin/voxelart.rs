//! Voxelart CLI - convert OBJ and glTF meshes into voxel-art glTF models

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use voxelart::export::ExportFormat;
use voxelart::pipeline::convert_as;
use voxelart::{load_meshes, ConvertConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// glTF JSON with an embedded buffer
    Gltf,
    /// Binary glTF
    Glb,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Gltf => ExportFormat::Gltf,
            Format::Glb => ExportFormat::Glb,
        }
    }
}

/// Voxelart CLI - Mesh to voxel-art conversion tool
#[derive(Parser)]
#[command(name = "voxelart")]
#[command(about = "Convert meshes into colored voxel cube models", long_about = None)]
struct Cli {
    /// Input mesh (.obj, .gltf or .glb)
    input: PathBuf,

    /// Output file (.gltf or .glb)
    output: PathBuf,

    /// Voxels along the longest axis
    #[arg(short, long)]
    resolution: Option<u32>,

    /// Cube shrink gap in [0, 0.5)
    #[arg(short, long)]
    gap: Option<f32>,

    /// Color banding step (1 keeps original colors)
    #[arg(short, long)]
    quantize: Option<u32>,

    /// Bounds padding as a fraction of the longest axis
    #[arg(long)]
    padding: Option<f32>,

    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format, guessed from the output extension when omitted
    #[arg(short, long, value_enum)]
    format: Option<Format>,
}

impl Cli {
    fn convert_config(&self) -> Result<ConvertConfig> {
        let mut config = match &self.config {
            Some(path) => ConvertConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ConvertConfig::default(),
        };

        if let Some(resolution) = self.resolution {
            config = config.with_resolution(resolution);
        }
        if let Some(gap) = self.gap {
            config = config.with_gap(gap);
        }
        if let Some(level) = self.quantize {
            config = config.with_color_quantization(level);
        }
        if let Some(padding) = self.padding {
            config = config.with_padding_ratio(padding);
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    if !cli.input.is_file() {
        bail!("input file not found: {}", cli.input.display());
    }

    let config = cli.convert_config()?;
    let format = cli
        .format
        .map(ExportFormat::from)
        .unwrap_or_else(|| ExportFormat::from_path(&cli.output));

    tracing::info!(
        "Converting {} (resolution {}, gap {}, quantization {})",
        cli.input.display(),
        config.resolution,
        config.gap,
        config.color_quantization
    );

    let meshes = load_meshes(&cli.input)
        .with_context(|| format!("failed to load {}", cli.input.display()))?;
    let report = convert_as(&meshes, &config, &cli.output, format)
        .with_context(|| format!("failed to convert {}", cli.input.display()))?;

    tracing::info!(
        "Done: {} meshes ({} skipped), {} voxels of size {:.6}, {} vertices, {} triangles",
        report.mesh_count,
        report.skipped_meshes,
        report.voxel_count,
        report.voxel_size,
        report.vertex_count,
        report.triangle_count
    );

    Ok(())
}
