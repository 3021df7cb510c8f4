//! urbanheat CLI - land surface temperature and urban heat indices

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use urbanheat_algorithms::statistics::{reduce_region, RegionParams};
use urbanheat_catalog::LocalCatalog;
use urbanheat_colormap::render_layer;
use urbanheat_core::io::{read_geotiff, read_geotiff_image, write_rgba_tiff, ExportReport, GeoTiffDirectorySink};
use urbanheat_core::{AreaOfInterest, Raster};
use urbanheat_pipeline::{export_outputs, map_layers, run_pipeline, PipelineConfig, RunSummary};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "urbanheat")]
#[command(author, version, about = "Land surface temperature and urban heat island indices", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and export NDVI, LST, UHI, UTFVI and true color
    Run {
        /// STAC ItemCollection JSON whose assets are local GeoTIFFs
        #[arg(long)]
        catalog: PathBuf,
        /// Area of interest as GeoJSON, in the CRS of the imagery
        #[arg(long)]
        aoi: PathBuf,
        /// Directory the GeoTIFF exports are written to
        #[arg(short, long)]
        out_dir: PathBuf,
        /// Pipeline configuration JSON; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// First acquisition date (YYYY-MM-DD), inclusive
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last acquisition date (YYYY-MM-DD), exclusive
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Collection id to filter on
        #[arg(long)]
        collection: Option<String>,
        /// Pixel size in CRS units
        #[arg(long)]
        scale: Option<f64>,
        /// Refuse regions with more pixels than this
        #[arg(long)]
        max_pixels: Option<u64>,
        /// Also write the rendered map layers as RGBA TIFFs
        #[arg(long)]
        quicklooks: bool,
        /// Write scalar results and export reports as JSON
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Statistics of the first band inside an area of interest
    Stats {
        /// Input raster file
        input: PathBuf,
        /// Area of interest as GeoJSON
        #[arg(long)]
        aoi: PathBuf,
        /// Pixel size in CRS units; must match the raster
        #[arg(long, default_value = "30.0")]
        scale: f64,
        /// Refuse regions with more pixels than this
        #[arg(long, default_value = "1000000000")]
        max_pixels: u64,
    },
    /// Print the default pipeline configuration as JSON
    Config,
}

/// Overrides given on the command line
#[derive(Debug, Default)]
struct ConfigOverrides {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    collection: Option<String>,
    scale: Option<f64>,
    max_pixels: Option<u64>,
}

#[derive(Serialize)]
struct RunReport<'a> {
    summary: RunSummary,
    exports: &'a [ExportReport],
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: Option<&Path>, overrides: ConfigOverrides) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config {}", p.display()))?;
            serde_json::from_str(&text).with_context(|| format!("Invalid config {}", p.display()))?
        }
        None => PipelineConfig::default(),
    };

    if let Some(start) = overrides.start {
        config.start = start;
    }
    if let Some(end) = overrides.end {
        config.end = end;
    }
    if let Some(collection) = overrides.collection {
        config.collection_id = collection;
    }
    if let Some(scale) = overrides.scale {
        config.scale = scale;
    }
    if let Some(max_pixels) = overrides.max_pixels {
        config.max_pixels = max_pixels;
    }
    config.validate().context("Invalid pipeline configuration")?;
    Ok(config)
}

fn read_aoi(path: &Path) -> Result<AreaOfInterest> {
    AreaOfInterest::from_geojson_file(path)
        .with_context(|| format!("Failed to read area of interest {}", path.display()))
}

/// File stem for a layer label, e.g. "True Color (432)" -> "true_color_432"
fn layer_slug(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}

fn section(title: &str) {
    println!("\n─── {} ───", title);
}

fn print_opt(label: &str, value: Option<f64>) {
    match value {
        Some(v) => println!("  {}: {:.4}", label, v),
        None => println!("  {}: undefined", label),
    }
}

// ─── Commands ───────────────────────────────────────────────────────────

fn run(
    catalog_path: &Path,
    aoi_path: &Path,
    out_dir: &Path,
    config: &PipelineConfig,
    quicklooks: bool,
    summary_path: Option<&Path>,
) -> Result<()> {
    let start = Instant::now();
    let aoi = read_aoi(aoi_path)?;
    let catalog = LocalCatalog::open(catalog_path)
        .with_context(|| format!("Failed to open catalog {}", catalog_path.display()))?;
    info!("Catalog: {} items", catalog.items().len());

    let pb = spinner("Computing composite and indices...");
    let output = run_pipeline(&catalog, &aoi, config);
    pb.finish_and_clear();
    let output = output.context("Pipeline failed")?;
    let summary = output.summary()?;

    section("Statistics");
    println!("  Images in composite: {}", summary.image_count);
    println!("  NDVI min: {:.4}", summary.ndvi_min);
    println!("  NDVI max: {:.4}", summary.ndvi_max);
    println!("  LST mean: {:.2} °C", summary.lst_mean);
    println!("  LST std dev: {:.2} °C", summary.lst_std_dev);
    print_opt("LST min", summary.lst_min);
    print_opt("LST max", summary.lst_max);
    println!("  Pixels in region: {}", summary.pixel_count);

    let pb = spinner("Writing exports...");
    let sink = GeoTiffDirectorySink::new(out_dir);
    let reports = export_outputs(&output, &sink, config, &aoi);
    pb.finish_and_clear();
    let reports = reports.context("Export failed")?;

    section("Exports");
    for report in &reports {
        println!("  {} -> {}", report.name, report.location);
    }

    if quicklooks {
        let dir = out_dir.join("quicklooks");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        section("Quicklooks");
        for layer in map_layers(&output, config)? {
            let rgba = render_layer(&layer)
                .with_context(|| format!("Failed to render layer {}", layer.label))?;
            let (rows, cols) = layer.image.shape();
            let transform = layer
                .image
                .transform()
                .copied()
                .context("Layer has no bands")?;
            let path = dir.join(format!("{}.tif", layer_slug(&layer.label)));
            write_rgba_tiff(&path, &rgba, rows, cols, &transform, layer.image.crs())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("  {} -> {}", layer.label, path.display());
        }
    }

    if let Some(path) = summary_path {
        let report = RunReport {
            summary,
            exports: &reports,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary {}", path.display()))?;
        println!("\nSummary saved to: {}", path.display());
    }

    println!("  Processing time: {:.2?}", start.elapsed());
    Ok(())
}

fn info_cmd(input: &Path) -> Result<()> {
    let pb = spinner("Reading raster...");
    let image = read_geotiff_image(input);
    pb.finish_and_clear();
    let image = image.with_context(|| format!("Failed to read {}", input.display()))?;

    let (rows, cols) = image.shape();
    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, rows * cols);
    println!("Bands: {}", image.band_names().join(", "));
    if let Some(t) = image.transform() {
        println!("Cell size: {}", t.cell_size());
        let (min_x, min_y, max_x, max_y) = t.bounds(cols, rows);
        println!(
            "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
            min_x, min_y, max_x, max_y
        );
    }
    if let Some(crs) = image.crs() {
        println!("CRS: {}", crs);
    }

    for band in image.bands() {
        let raster = &band.raster;
        let stats = raster.statistics();
        section(&band.name);
        if let Some(nodata) = raster.nodata() {
            println!("  NoData: {}", nodata);
        }
        print_opt("Min", stats.min);
        print_opt("Max", stats.max);
        print_opt("Mean", stats.mean);
        println!(
            "  Valid cells: {} ({:.1}%)",
            stats.valid_count,
            100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
        );
    }
    Ok(())
}

fn stats_cmd(input: &Path, aoi_path: &Path, params: RegionParams) -> Result<()> {
    let aoi = read_aoi(aoi_path)?;
    let raster: Raster<f64> =
        read_geotiff(input, None).with_context(|| format!("Failed to read {}", input.display()))?;

    let start = Instant::now();
    let stats = reduce_region(&raster, &aoi, params).context("Region reduction failed")?;

    section("Region statistics");
    println!("  Count: {}", stats.count);
    print_opt("Min", stats.min);
    print_opt("Max", stats.max);
    print_opt("Mean", stats.mean);
    print_opt("StdDev", stats.std_dev);
    println!("  Processing time: {:.2?}", start.elapsed());
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            catalog,
            aoi,
            out_dir,
            config,
            start,
            end,
            collection,
            scale,
            max_pixels,
            quicklooks,
            summary,
        } => {
            let overrides = ConfigOverrides {
                start,
                end,
                collection,
                scale,
                max_pixels,
            };
            let config = load_config(config.as_deref(), overrides)?;
            run(&catalog, &aoi, &out_dir, &config, quicklooks, summary.as_deref())?;
        }

        Commands::Info { input } => info_cmd(&input)?,

        Commands::Stats {
            input,
            aoi,
            scale,
            max_pixels,
        } => stats_cmd(&input, &aoi, RegionParams { scale, max_pixels })?,

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&PipelineConfig::default())?);
        }
    }

    Ok(())
}
