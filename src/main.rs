//! CLI entry point for neuro-roi
//!
//! Works on region files written by the library:
//!
//! ```bash
//! neuro-roi regions
//! neuro-roi inspect rois/Ellipse_EB1a2b3c4d5e6f7a8b9.roi.json
//! neuro-roi segment rois/Fan_FB0011223344556677.roi.json --segments 12 --out segmented
//! neuro-roi convert rois/Fan_FB0011223344556677.roi.json --format hdf5
//! neuro-roi order rois/GlobularMustache_PB0123456789abcdef.roi.json --by tour
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use neuro_roi::catalog::catalog;
use neuro_roi::config::{RoiConfig, DEFAULT_CONFIG_PATH};
use neuro_roi::roi::{Region, RegionKind, SegmentOptions, SpatialAxis, ViewDirection};
use neuro_roi::storage::{self, StoreRegistry};
use neuro_roi::logging;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "neuro-roi")]
#[command(about = "Inspect, segment and convert anatomical ROI files", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List region categories, aliases and extraction protocols
    Regions,

    /// Print a summary of a saved region
    Inspect {
        /// Region file
        file: PathBuf,
    },

    /// Segment a saved region and save the result
    Segment {
        /// Region file
        file: PathBuf,

        /// Number of subregions (defaults from configuration)
        #[arg(long)]
        segments: Option<usize>,

        /// View direction (anterior, posterior, undefined)
        #[arg(long)]
        view: Option<ViewDirection>,

        /// Output directory (defaults from configuration)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Storage format (defaults from configuration)
        #[arg(long)]
        format: Option<String>,
    },

    /// Reorder the glomeruli of a saved glomerulus cluster and save the result
    Order {
        /// Region file
        file: PathBuf,

        /// Ordering (tour, pseudophase, x, y, z)
        #[arg(long, default_value = "tour")]
        by: String,

        /// Largest glomerulus count for tour ordering (defaults from configuration)
        #[arg(long)]
        ceiling: Option<usize>,

        /// Reverse axis ordering
        #[arg(long)]
        descending: bool,

        /// Output directory (defaults from configuration)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Storage format (defaults from configuration)
        #[arg(long)]
        format: Option<String>,
    },

    /// Re-save a region in another storage format
    Convert {
        /// Region file
        file: PathBuf,

        /// Target storage format
        #[arg(long)]
        format: String,

        /// Output directory (defaults from configuration)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RoiConfig::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.validate().context("invalid configuration")?;
    logging::init(&config.logging).map_err(|e| anyhow!(e))?;

    match cli.command {
        Commands::Regions => list_regions(),
        Commands::Inspect { file } => inspect(&file),
        Commands::Segment {
            file,
            segments,
            view,
            out,
            format,
        } => segment(&config, &file, segments, view, out, format),
        Commands::Order {
            file,
            by,
            ceiling,
            descending,
            out,
            format,
        } => order(&config, &file, &by, ceiling, descending, out, format),
        Commands::Convert { file, format, out } => convert(&config, &file, &format, out),
    }
}

fn list_regions() -> Result<()> {
    for category in catalog().categories() {
        println!("{}", category.name());
        println!("  aliases: {}", category.aliases().join(", "));
        let default = category.default_protocol().map(|p| p.name());
        for protocol in category.protocols() {
            let marker = if Some(protocol.name()) == default { "*" } else { " " };
            let caps = protocol.capabilities();
            println!(
                "  {} {:<40} -> {:<16} frames={} references={} anatomy={} shapes={} exclusion={}",
                marker,
                protocol.name(),
                protocol.region_class(),
                caps.accepts_frame_data,
                caps.accepts_reference_frames,
                caps.accepts_anatomy_reference,
                caps.shape_kind.map_or_else(|| "none".to_string(), |k| k.to_string()),
                caps.allows_exclusion,
            );
        }
    }
    println!("loadable classes: {}", storage::registered_classes().join(", "));
    Ok(())
}

fn load(file: &Path) -> Result<Region> {
    storage::load(file).with_context(|| format!("loading {}", file.display()))
}

fn inspect(file: &Path) -> Result<()> {
    let region = load(file)?;
    print!("{}", region);
    Ok(())
}

fn save(config: &RoiConfig, region: &Region, format: Option<&str>, out: Option<PathBuf>) -> Result<PathBuf> {
    let format = format.unwrap_or(&config.storage.default_format);
    let store = StoreRegistry::new().create(format)?;
    let dir = out.unwrap_or_else(|| config.storage.output_dir.clone());
    let path = storage::save(region, &dir, store.as_ref())
        .with_context(|| format!("saving to {}", dir.display()))?;
    Ok(path)
}

fn segment(
    config: &RoiConfig,
    file: &Path,
    segments: Option<usize>,
    view: Option<ViewDirection>,
    out: Option<PathBuf>,
    format: Option<String>,
) -> Result<()> {
    let mut region = load(file)?;
    let configured = match region.kind {
        RegionKind::Ellipse(_) => Some(config.segmentation.ellipse_segments),
        RegionKind::Fan(_) => Some(config.segmentation.fan_segments),
        _ => None,
    };
    let options = SegmentOptions {
        n_segments: segments.or(configured),
        view_direction: view,
        ..SegmentOptions::default()
    };
    region
        .segment(&options)
        .with_context(|| format!("segmenting {}", region.class_name()))?;

    let path = save(config, &region, format.as_deref(), out)?;
    info!(subregions = region.subregions().len(), path = %path.display(), "segmented");
    println!("{}", path.display());
    Ok(())
}

fn order(
    config: &RoiConfig,
    file: &Path,
    by: &str,
    ceiling: Option<usize>,
    descending: bool,
    out: Option<PathBuf>,
    format: Option<String>,
) -> Result<()> {
    let mut region = load(file)?;
    let order = match by.to_lowercase().as_str() {
        "tour" => region.sort_by_tour(config.segmentation.tour_ceiling(ceiling))?,
        "pseudophase" => region.sort_by_pseudophase()?,
        axis => {
            let axis: SpatialAxis = axis.parse()?;
            region.sort_by_axis(axis, descending)?
        }
    };

    let path = save(config, &region, format.as_deref(), out)?;
    info!(by, order = ?order, path = %path.display(), "reordered glomeruli");
    println!("{}", path.display());
    Ok(())
}

fn convert(config: &RoiConfig, file: &Path, format: &str, out: Option<PathBuf>) -> Result<()> {
    let region = load(file)?;
    let path = save(config, &region, Some(format), out)?;
    println!("{}", path.display());
    Ok(())
}
