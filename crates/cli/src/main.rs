//! Nightlight CLI - economic activity from night-time lights

mod presenter;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use nightlight_analysis::clip::{clip, ClipMode};
use nightlight_analysis::country::{country_activity, correlate_with_gdp, cross_country_correlation};
use nightlight_analysis::reduce::{ReducerKind, DEFAULT_TILE_SIZE};
use nightlight_analysis::time_series::{aggregate_sources, default_labels};
use nightlight_analysis::AnalysisConfig;
use nightlight_core::io::{write_geotiff, GeoTiffSource};
use nightlight_core::vector::GeoJsonBoundaries;
use nightlight_core::{Boundary, BoundarySource, MaskedGrid, RasterSource};
use presenter::{ConsolePresenter, Presenter};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "nightlight")]
#[command(author, version, about = "Economic activity estimation from night-time lights", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON analysis configuration; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a radiance raster
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Total and average light intensity of a raster
    Stats {
        /// Input raster file
        input: PathBuf,
        /// Reduce in tiles instead of one pass
        #[arg(long)]
        chunked: bool,
        /// Tile edge in cells for chunked reduction (default: 2048)
        #[arg(short, long)]
        tile_size: Option<usize>,
        /// Worker threads for chunked reduction (default: all cores)
        #[arg(short = 'j', long)]
        threads: Option<usize>,
    },
    /// Correlate a country's lights with its GDP estimate
    Correlate {
        /// Input raster file
        input: PathBuf,
        /// Country boundaries (GeoJSON)
        boundaries: PathBuf,
        /// Country name
        #[arg(long)]
        country: String,
        /// Mask pixels outside the polygon, not only its bounding box
        #[arg(long)]
        exact: bool,
    },
    /// Light activity per country and its correlation with GDP
    Countries {
        /// Input raster file
        input: PathBuf,
        /// Country boundaries (GeoJSON)
        boundaries: PathBuf,
        /// Mask pixels outside the polygon, not only its bounding box
        #[arg(long)]
        exact: bool,
    },
    /// Mean light intensity over a sequence of rasters
    Timeseries {
        /// Glob pattern matching the rasters; files are taken in sorted order
        pattern: String,
        /// Comma-separated labels, one per file (default: Month 1, Month 2, ...)
        #[arg(short, long, value_delimiter = ',')]
        labels: Option<Vec<String>>,
    },
    /// Clip a raster to a country and save it
    Clip {
        /// Input raster file
        input: PathBuf,
        /// Country boundaries (GeoJSON)
        boundaries: PathBuf,
        /// Country name
        #[arg(long)]
        country: String,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Mask pixels outside the polygon, not only its bounding box
        #[arg(long)]
        exact: bool,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => AnalysisConfig::from_file(p)
            .with_context(|| format!("Failed to load config: {}", p.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn read_grid(path: &Path) -> Result<MaskedGrid> {
    let pb = spinner(&format!("Reading {}", path.display()));
    let grid = GeoTiffSource::new(path)
        .load()
        .with_context(|| format!("Failed to read raster: {}", path.display()));
    pb.finish_and_clear();
    grid
}

fn read_boundaries(path: &Path) -> Result<Vec<Boundary>> {
    let boundaries = GeoJsonBoundaries::new(path)
        .boundaries()
        .with_context(|| format!("Failed to read boundaries: {}", path.display()))?;
    debug!("Loaded {} boundaries from {}", boundaries.len(), path.display());
    Ok(boundaries)
}

fn resolve_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut paths = glob::glob(pattern)
        .with_context(|| format!("Invalid glob pattern: {}", pattern))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read a matched path")?;
    paths.sort();
    if paths.is_empty() {
        bail!("No files match {}", pattern);
    }
    Ok(paths)
}

/// Override the configured reducer only with the flags actually given
fn apply_reducer_flags(config: &mut AnalysisConfig, chunked: bool, tile_size: Option<usize>) {
    let configured = match config.reducer {
        ReducerKind::Chunked { tile_size } => Some(tile_size),
        ReducerKind::Eager => None,
    };
    if chunked || configured.is_some() {
        config.reducer = ReducerKind::Chunked {
            tile_size: tile_size.or(configured).unwrap_or(DEFAULT_TILE_SIZE),
        };
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    let mut config = load_config(cli.config.as_deref())?;
    let mut presenter = ConsolePresenter::stdout();

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let grid = read_grid(&input)?;
            let (rows, cols) = grid.shape();
            let bounds = grid.bounds();
            let gt = grid.transform();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, grid.len());
            println!("Cell size: {} x {}", gt.pixel_width, gt.pixel_height.abs());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(nodata) = grid.nodata() {
                println!("NoData: {}", nodata);
            }
            if let Some((min, max)) = grid.value_range() {
                println!("Range: {:.4} - {:.4}", min, max);
            }
            println!(
                "Valid cells: {} ({:.1}%)",
                grid.valid_count(),
                100.0 * grid.valid_count() as f64 / grid.len() as f64
            );
            match config.build_reducer()?.reduce(&grid) {
                Ok(s) => presenter.show_statistic("\nStatistics:", &s)?,
                Err(e) => println!("\nStatistics: {}", e),
            }
        }

        // ── Stats ────────────────────────────────────────────────────
        Commands::Stats {
            input,
            chunked,
            tile_size,
            threads,
        } => {
            apply_reducer_flags(&mut config, chunked, tile_size);
            if threads.is_some() {
                config.threads = threads;
            }
            let reducer = config.build_reducer()?;
            let grid = read_grid(&input)?;
            debug!(
                "Reducing with {:?} ({} worker threads available)",
                config.processing_mode(),
                nightlight_parallel::num_threads()
            );

            let start = Instant::now();
            let statistic = reducer.reduce(&grid)?;
            info!("{} reduction took {:.2?}", reducer.name(), start.elapsed());

            presenter.show_statistic(&format!("{}:", input.display()), &statistic)?;
        }

        // ── Correlate ────────────────────────────────────────────────
        Commands::Correlate {
            input,
            boundaries,
            country,
            exact,
        } => {
            if exact {
                config.clip_mode = ClipMode::Exact;
            }
            let grid = read_grid(&input)?;
            let boundaries = read_boundaries(&boundaries)?;

            let result = correlate_with_gdp(&grid, &boundaries, &country, &config.country_params())
                .with_context(|| format!("Failed to correlate {}", country))?;
            presenter.show_correlation(
                &format!("Correlation between night lights and GDP for {}", country),
                &result,
            )?;
        }

        // ── Countries ────────────────────────────────────────────────
        Commands::Countries {
            input,
            boundaries,
            exact,
        } => {
            if exact {
                config.clip_mode = ClipMode::Exact;
            }
            let reducer = config.build_reducer()?;
            let grid = read_grid(&input)?;
            let boundaries = read_boundaries(&boundaries)?;

            let pb = spinner(&format!("Reducing {} countries", boundaries.len()));
            let activity =
                country_activity(&grid, &boundaries, reducer.as_ref(), &config.country_params());
            pb.finish_and_clear();
            let activity = activity?;

            presenter.show_activity(&activity)?;
            match cross_country_correlation(&activity) {
                Ok(r) => presenter.show_correlation("\nTotal light vs GDP across countries", &r)?,
                Err(e) => println!("\nTotal light vs GDP across countries: {}", e),
            }
        }

        // ── Time series ──────────────────────────────────────────────
        Commands::Timeseries { pattern, labels } => {
            let paths = resolve_pattern(&pattern)?;
            let labels = labels.unwrap_or_else(|| default_labels(paths.len()));
            let reducer = config.build_reducer()?;
            let sources: Vec<GeoTiffSource> = paths.iter().map(GeoTiffSource::new).collect();

            let pb = spinner(&format!("Aggregating {} rasters", sources.len()));
            let series = aggregate_sources(&sources, &labels, reducer.as_ref());
            pb.finish_and_clear();

            presenter.show_series(&series?)?;
        }

        // ── Clip ─────────────────────────────────────────────────────
        Commands::Clip {
            input,
            boundaries,
            country,
            output,
            exact,
        } => {
            if exact {
                config.clip_mode = ClipMode::Exact;
            }
            let grid = read_grid(&input)?;
            let boundaries = read_boundaries(&boundaries)?;
            let boundary = nightlight_core::vector::find_boundary(&boundaries, &country)?;

            let start = Instant::now();
            let clipped = clip(&grid, boundary, config.clip_mode)?;
            write_geotiff(&clipped.grid, &output)
                .with_context(|| format!("Failed to write raster: {}", output.display()))?;

            let (rows, cols) = clipped.grid.shape();
            println!("Clipped {} ({} x {}) saved to: {}", boundary.name, cols, rows, output.display());
            println!("  Valid cells: {}", clipped.grid.valid_count());
            println!("  Processing time: {:.2?}", start.elapsed());
        }
    }

    Ok(())
}
