//! Oximap CLI - Multispectral tissue-oxygenation analysis

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oximap_algorithms::batch::{self, BatchConfig, FrameSource, OutputSpec};
use oximap_algorithms::calibration::CalibrationParams;
use oximap_algorithms::index::{IndexFormula, IndexParams};
use oximap_algorithms::mosaic;
use oximap_algorithms::tracking::TrackerParams;
use oximap_core::frame::BandStack;
use oximap_core::io;
use oximap_core::roi::RoiSet;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "oximap")]
#[command(author, version, about = "Multispectral tissue-oxygenation analysis", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a TIFF frame or band stack
    Info {
        /// Input file
        input: PathBuf,
    },
    /// Decode a raw mosaic frame into a band stack
    Decode {
        /// Input raw mosaic TIFF (single page)
        input: PathBuf,
        /// Output band-stack TIFF (one page per band)
        #[arg(short, long)]
        output: PathBuf,
        /// Mosaic tile edge length (4 for a 16-band sensor)
        #[arg(short, long, default_value = "4")]
        tile_size: usize,
    },
    /// Run the full pipeline over a folder of frames
    Run {
        /// White reference file
        #[arg(long)]
        white: PathBuf,
        /// Black reference file
        #[arg(long)]
        black: PathBuf,
        /// Folder containing the sample frames (processed in filename order)
        #[arg(long)]
        input_dir: PathBuf,
        /// Output directory for artifacts and summary
        #[arg(short, long)]
        output: PathBuf,
        /// ROI definition set (JSON); omit to skip ROI statistics
        #[arg(long)]
        rois: Option<PathBuf>,
        /// Band count of the instrument
        #[arg(long, default_value = "16")]
        bands: usize,
        /// Treat inputs as raw mosaic frames with this tile size
        #[arg(long)]
        tile_size: Option<usize>,
        /// Isosbestic band (difference formula) / numerator band (ratio)
        #[arg(long, default_value = "6")]
        band_a: usize,
        /// Hemoglobin-sensitive band
        #[arg(long, default_value = "5")]
        band_b: usize,
        /// Index formula: od-diff, ratio
        #[arg(long, default_value = "od-diff")]
        formula: String,
        /// Amplification factor for the index
        #[arg(long, default_value = "1.0")]
        amplification: f64,
        /// Denominator floor for the ratio formula
        #[arg(long, default_value = "0.01")]
        ratio_floor: f64,
        /// Display gamma for the visualization artifact
        #[arg(long, default_value = "0.7")]
        gamma: f64,
        /// White reference percentile
        #[arg(long, default_value = "95")]
        white_percentile: f64,
        /// Black reference percentile
        #[arg(long, default_value = "5")]
        black_percentile: f64,
        /// Segmentation threshold; omit to skip mask artifacts
        #[arg(long)]
        threshold: Option<f64>,
        /// Track ROIs across frames instead of keeping them fixed
        #[arg(long)]
        track: bool,
        /// Skip segmented mask artifacts
        #[arg(long)]
        skip_masks: bool,
        /// Skip the color visualization artifact
        #[arg(long)]
        skip_visualization: bool,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_formula(s: &str) -> Result<IndexFormula> {
    match s.to_lowercase().as_str() {
        "od-diff" | "od-difference" | "difference" => Ok(IndexFormula::OdDifference),
        "ratio" | "reflectance-ratio" => Ok(IndexFormula::ReflectanceRatio),
        _ => anyhow::bail!("Unknown formula: {}. Use od-diff or ratio.", s),
    }
}

/// Load a reference as a band stack, decoding from a raw mosaic when a
/// tile size is configured.
fn read_reference(path: &PathBuf, bands: usize, tile_size: Option<usize>) -> Result<BandStack<f64>> {
    let pb = spinner("Reading reference...");
    let stack = match tile_size {
        Some(tile) => {
            let raw = io::read_frame(path).context("Failed to read raw reference")?;
            mosaic::decode(&raw, tile).context("Failed to decode raw reference")?
        }
        None => io::read_bandstack(path, bands).context("Failed to read reference stack")?,
    };
    pb.finish_and_clear();
    info!("Reference {}: {} bands, {} x {}", path.display(), stack.bands(), stack.cols(), stack.rows());
    Ok(stack)
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pb = spinner("Reading file...");
            let pages = io::read_pages(&input).context("Failed to read file")?;
            pb.finish_and_clear();

            let (rows, cols) = pages[0].dim();
            println!("File: {}", input.display());
            println!("Pages (bands): {}", pages.len());
            println!("Dimensions: {} x {} ({} pixels per band)", cols, rows, rows * cols);

            let frame = oximap_core::Frame::from_array(pages[0].clone());
            let stats = frame.statistics();
            println!("\nFirst band statistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid pixels: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / frame.len() as f64
            );
        }

        // ── Decode ───────────────────────────────────────────────────
        Commands::Decode {
            input,
            output,
            tile_size,
        } => {
            let pb = spinner("Reading raw frame...");
            let raw = io::read_frame(&input).context("Failed to read raw frame")?;
            pb.finish_and_clear();

            let start = Instant::now();
            let stack = mosaic::decode(&raw, tile_size).context("Failed to decode mosaic")?;
            let elapsed = start.elapsed();

            io::write_stack_f32(&stack, &output).context("Failed to write band stack")?;
            println!(
                "Decoded {} bands of {} x {}",
                stack.bands(),
                stack.cols(),
                stack.rows()
            );
            done("Band stack", &output, elapsed);
        }

        // ── Run ──────────────────────────────────────────────────────
        Commands::Run {
            white,
            black,
            input_dir,
            output,
            rois,
            bands,
            tile_size,
            band_a,
            band_b,
            formula,
            amplification,
            ratio_floor,
            gamma,
            white_percentile,
            black_percentile,
            threshold,
            track,
            skip_masks,
            skip_visualization,
        } => {
            let formula = parse_formula(&formula)?;

            let white_stack = read_reference(&white, bands, tile_size)?;
            let black_stack = read_reference(&black, bands, tile_size)?;

            let roi_set = match &rois {
                Some(path) => {
                    Some(RoiSet::load(path).context("Failed to load ROI definitions")?)
                }
                None => None,
            };

            let sequence = batch::list_sequence(&input_dir)
                .context("Failed to list input folder")?;
            if sequence.is_empty() {
                anyhow::bail!("No TIFF files found in {}", input_dir.display());
            }
            info!("Processing {} frames from {}", sequence.len(), input_dir.display());

            let config = BatchConfig {
                source: match tile_size {
                    Some(tile) => FrameSource::Mosaic { tile_size: tile },
                    None => FrameSource::Stack,
                },
                expected_bands: bands,
                band_a,
                band_b,
                calibration: CalibrationParams {
                    white_percentile,
                    black_percentile,
                    ..Default::default()
                },
                index: IndexParams {
                    formula,
                    amplification,
                    ratio_floor,
                    gamma,
                },
                threshold,
                tracking: if track {
                    Some(TrackerParams::default())
                } else {
                    None
                },
                output: OutputSpec {
                    root: output.clone(),
                    write_masks: !skip_masks,
                    write_visualization: !skip_visualization,
                },
            };

            let pb = spinner("Processing sequence...");
            let start = Instant::now();
            let summary = batch::run(
                &sequence,
                &white_stack,
                &black_stack,
                roi_set.as_ref(),
                &config,
            )
            .context("Batch run failed")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            let summary_path = output.join("summary.csv");
            summary
                .write_csv(&summary_path)
                .context("Failed to write summary table")?;

            println!("Processed {} frames in {:.2?}", sequence.len(), elapsed);
            println!("Summary rows: {}", summary.rows.len());
            println!("Summary saved to: {}", summary_path.display());

            if !summary.warnings.is_empty() {
                println!("\nWarnings ({}):", summary.warnings.len());
                for warning in &summary.warnings {
                    println!("  - {}", warning);
                }
            }
        }
    }

    Ok(())
}
