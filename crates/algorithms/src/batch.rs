//! Batch processing over frame sequences
//!
//! Drives the full pipeline (decode, calibrate, index, segment, ROI
//! statistics with optional tracking) over an ordered file sequence,
//! writes per-frame artifacts, and accumulates a summary table. A single
//! file's failure is isolated: its rows are flagged and the run continues;
//! configuration-level failures abort before any per-frame work.

use crate::calibration::{self, CalibrationParams};
use crate::index::{self, IndexParams};
use crate::mosaic;
use crate::segment;
use crate::statistics::{roi_statistics, RoiStats};
use crate::tracking::{RoiTracker, TrackerParams};
use oximap_colormap::{auto_params, frame_to_rgb, ColorScheme, ColormapParams};
use oximap_core::frame::{BandStack, Frame};
use oximap_core::roi::{Roi, RoiSet};
use oximap_core::{io, Error, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How sample files are turned into band stacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    /// Single-page raw mosaic frames, decoded with the given tile size
    Mosaic { tile_size: usize },
    /// Archived multi-page band stacks
    Stack,
}

/// Per-frame artifact destinations
#[derive(Debug, Clone)]
pub struct OutputSpec {
    /// Root output directory; artifact categories are subdirectories
    pub root: PathBuf,
    /// Write segmented mask artifacts (requires a threshold)
    pub write_masks: bool,
    /// Write the color visualization artifact
    pub write_visualization: bool,
}

/// Configuration for one batch run.
///
/// An explicit value object passed into the run; there is no ambient
/// session state.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub source: FrameSource,
    /// Band count every stack in the sequence must expose
    pub expected_bands: usize,
    /// Isosbestic (difference formula) or numerator (ratio formula) band
    pub band_a: usize,
    /// Hemoglobin-sensitive band
    pub band_b: usize,
    pub calibration: CalibrationParams,
    pub index: IndexParams,
    /// Global segmentation threshold; `None` disables segmentation
    pub threshold: Option<f64>,
    /// Frame-to-frame ROI tracking; `None` keeps ROIs at fixed positions
    pub tracking: Option<TrackerParams>,
    pub output: OutputSpec,
}

/// One summary row per (file, ROI) pair
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub file: String,
    pub roi: String,
    pub mean: f64,
    pub std_dev: f64,
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
    pub status: String,
}

impl SummaryRow {
    fn ok(file: &str, roi: &Roi, stats: RoiStats) -> Self {
        Self {
            file: file.to_string(),
            roi: roi.name.clone(),
            mean: stats.mean,
            std_dev: stats.std_dev,
            x: roi.x,
            y: roi.y,
            w: roi.w,
            h: roi.h,
            status: "ok".to_string(),
        }
    }

    fn failed(file: &str, roi: &Roi, reason: &str) -> Self {
        Self {
            file: file.to_string(),
            roi: roi.name.clone(),
            mean: f64::NAN,
            std_dev: f64::NAN,
            x: roi.x,
            y: roi.y,
            w: roi.w,
            h: roi.h,
            status: format!("failed: {}", reason),
        }
    }
}

/// Accumulated result of a batch run.
///
/// Always complete even under partial per-file failures: failed rows are
/// flagged, skipped tracking observations are itemized in `warnings`.
#[derive(Debug, Default)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
    pub warnings: Vec<String>,
}

impl SummaryTable {
    /// Write the table as CSV
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv_writer(path.as_ref())?;
        writer
            .write_record(["file", "roi", "mean", "std_dev", "x", "y", "w", "h", "status"])
            .map_err(|e| Error::Other(format!("Cannot write summary header: {}", e)))?;

        for row in &self.rows {
            let record = [
                row.file.clone(),
                row.roi.clone(),
                format!("{:.6}", row.mean),
                format!("{:.6}", row.std_dev),
                row.x.to_string(),
                row.y.to_string(),
                row.w.to_string(),
                row.h.to_string(),
                row.status.clone(),
            ];
            writer
                .write_record(&record)
                .map_err(|e| Error::Other(format!("Cannot write summary row: {}", e)))?;
        }

        writer
            .flush()
            .map_err(|e| Error::Other(format!("Cannot flush summary: {}", e)))?;
        Ok(())
    }
}

fn csv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::Writer::from_path(path).map_err(|e| Error::Other(format!("Cannot create CSV: {}", e)))
}

/// Collect the TIFF files of a directory in lexicographic filename order.
///
/// The sort is the sequence ordering contract: stable and deterministic.
pub fn list_sequence<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_lowercase().as_str(), "tif" | "tiff"))
                .unwrap_or(false)
        })
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Extract a `HH-MM-SS-mmm` capture-time token from a file stem.
///
/// Capture software embeds the acquisition time in the filename
/// (e.g. `20241019_16-17-50-805_frame_0`); artifacts are named from that
/// token when present so outputs sort by capture time.
pub fn capture_token(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    if bytes.len() < 12 {
        return None;
    }

    let is_digit = |i: usize| bytes[i].is_ascii_digit();
    for start in 0..=bytes.len() - 12 {
        let b = &bytes[start..start + 12];
        let digit_positions = [0, 1, 3, 4, 6, 7, 9, 10, 11];
        if digit_positions.iter().all(|&p| is_digit(start + p))
            && b[2] == b'-'
            && b[5] == b'-'
            && b[8] == b'-'
        {
            return Some(stem[start..start + 12].to_string());
        }
    }
    None
}

/// Artifact base name for an input file: its capture-time token when
/// present, otherwise the file stem.
fn artifact_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    capture_token(stem).unwrap_or_else(|| stem.to_string())
}

/// Run the pipeline over a file sequence.
///
/// `white` and `black` are the decoded reference stacks; `rois` enables the
/// statistics phase. Frames are processed strictly in sequence order (the
/// trackers carry frame-to-frame state); ROI evaluation inside one frame is
/// parallel and fully joined before the next frame starts.
pub fn run(
    sequence: &[PathBuf],
    white: &BandStack<f64>,
    black: &BandStack<f64>,
    rois: Option<&RoiSet>,
    config: &BatchConfig,
) -> Result<SummaryTable> {
    validate_config(white, black, config)?;

    // ROI bounds are checked once against the run geometry, before any
    // per-frame work.
    if let Some(set) = rois {
        set.validate_bounds(white.rows(), white.cols())?;
    }

    let table = calibration::build_calibration(
        white,
        black,
        &[config.band_a, config.band_b],
        &config.calibration,
    )?;

    let mut summary = SummaryTable::default();
    for entry in table.entries().iter().filter(|e| e.degenerate) {
        summary.warnings.push(
            Error::CalibrationDegenerate {
                band: entry.band,
                white_value: entry.white_value,
                black_value: entry.black_value,
            }
            .to_string(),
        );
    }

    create_output_dirs(config)?;

    let mut trackers: Option<Vec<RoiTracker>> = None;

    for path in sequence {
        let file = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("<unnamed>")
            .to_string();
        let name = artifact_name(path);

        let index_frame = match process_frame(path, white, &table, config, &name, &mut summary) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(file = %file, error = %e, "frame rejected");
                summary.warnings.push(format!("{}: {}", file, e));
                if let Some(set) = rois {
                    for roi in set.iter() {
                        summary
                            .rows
                            .push(SummaryRow::failed(&file, roi, &e.to_string()));
                    }
                }
                continue;
            }
        };

        let Some(set) = rois else { continue };

        if let Some(params) = &config.tracking {
            if let Some(active) = trackers.as_mut() {
                // Later frames: advance each tracker, then measure at the
                // tracked position. Lost observations are skipped, not
                // failed; the collect is the per-frame barrier.
                let results: Vec<(Option<SummaryRow>, Option<String>)> = active
                    .par_iter_mut()
                    .map(|tracker| {
                        let update = tracker.update(&index_frame);
                        if update.success {
                            match roi_statistics(&index_frame, &update.rect) {
                                Ok(stats) => {
                                    (Some(SummaryRow::ok(&file, &update.rect, stats)), None)
                                }
                                Err(e) => (None, Some(format!("{}: {}", file, e))),
                            }
                        } else {
                            let e = Error::TrackingFailure {
                                roi: update.rect.name.clone(),
                                file: file.clone(),
                            };
                            (None, Some(e.to_string()))
                        }
                    })
                    .collect();

                for (row, warning) in results {
                    if let Some(row) = row {
                        summary.rows.push(row);
                    }
                    if let Some(message) = warning {
                        warn!("{}", message);
                        summary.warnings.push(message);
                    }
                }
            } else {
                // First processed frame: seed the trackers on it and
                // measure at the defined positions.
                let seeded: Result<Vec<RoiTracker>> = set
                    .iter()
                    .map(|roi| RoiTracker::init(&index_frame, roi, *params))
                    .collect();
                trackers = Some(seeded?);

                let rows: Result<Vec<SummaryRow>> = set
                    .rois()
                    .par_iter()
                    .map(|roi| Ok(SummaryRow::ok(&file, roi, roi_statistics(&index_frame, roi)?)))
                    .collect();
                summary.rows.extend(rows?);
            }
        } else {
            // No tracking: fixed positions every frame.
            let rows: Result<Vec<SummaryRow>> = set
                .rois()
                .par_iter()
                .map(|roi| Ok(SummaryRow::ok(&file, roi, roi_statistics(&index_frame, roi)?)))
                .collect();
            summary.rows.extend(rows?);
        }
    }

    info!(
        files = sequence.len(),
        rows = summary.rows.len(),
        warnings = summary.warnings.len(),
        "batch run complete"
    );
    Ok(summary)
}

/// Reject configurations that would invalidate every frame of the run.
fn validate_config(white: &BandStack<f64>, black: &BandStack<f64>, config: &BatchConfig) -> Result<()> {
    if let FrameSource::Mosaic { tile_size } = config.source {
        if tile_size * tile_size != config.expected_bands {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: tile_size.to_string(),
                reason: format!(
                    "tile yields {} bands, expected {}",
                    tile_size * tile_size,
                    config.expected_bands
                ),
            });
        }
    }

    for (tag, stack) in [("white", white), ("black", black)] {
        if stack.bands() != config.expected_bands {
            warn!(reference = tag, bands = stack.bands(), "reference rejected");
            return Err(Error::BandCountMismatch {
                expected: config.expected_bands,
                shape: vec![stack.bands(), stack.rows(), stack.cols()],
            });
        }
    }

    Ok(())
}

fn create_output_dirs(config: &BatchConfig) -> Result<()> {
    let root = &config.output.root;
    std::fs::create_dir_all(root.join("index"))?;
    std::fs::create_dir_all(root.join("reference"))?;
    if config.output.write_masks && config.threshold.is_some() {
        std::fs::create_dir_all(root.join("masks"))?;
    }
    if config.output.write_visualization {
        std::fs::create_dir_all(root.join("visualization"))?;
    }
    Ok(())
}

/// Load one file, calibrate, compute the index and write its artifacts.
///
/// Artifact write failures are isolated into warnings; a load or
/// calibration failure propagates so the caller can flag the file's rows.
fn process_frame(
    path: &Path,
    white: &BandStack<f64>,
    table: &calibration::CalibrationTable,
    config: &BatchConfig,
    name: &str,
    summary: &mut SummaryTable,
) -> Result<Frame<f64>> {
    let stack = load_stack(path, config)?;

    if (stack.rows(), stack.cols()) != (white.rows(), white.cols()) {
        return Err(Error::SizeMismatch {
            er: white.rows(),
            ec: white.cols(),
            ar: stack.rows(),
            ac: stack.cols(),
        });
    }

    let cal_a = table.get(config.band_a).ok_or(Error::InvalidParameter {
        name: "band_a",
        value: config.band_a.to_string(),
        reason: "band missing from calibration table".to_string(),
    })?;
    let cal_b = table.get(config.band_b).ok_or(Error::InvalidParameter {
        name: "band_b",
        value: config.band_b.to_string(),
        reason: "band missing from calibration table".to_string(),
    })?;

    let reflectance_a = calibration::to_reflectance(stack.band(config.band_a)?, cal_a);
    let reflectance_b = calibration::to_reflectance(stack.band(config.band_b)?, cal_b);
    let index_frame = index::compute_index(&reflectance_a, &reflectance_b, &config.index)?;

    let root = &config.output.root;
    let mut write = |result: Result<()>, what: &str| {
        if let Err(e) = result {
            warn!(artifact = what, error = %e, "artifact write failed");
            summary.warnings.push(format!("{} ({}): {}", name, what, e));
        }
    };

    write(
        io::write_frame_f32(&index_frame, root.join("index").join(format!("{}.tiff", name))),
        "index",
    );
    write(
        io::write_frame_f32(
            &reflectance_a,
            root.join("reference").join(format!("{}.tiff", name)),
        ),
        "reference",
    );

    if let Some(threshold) = config.threshold {
        if config.output.write_masks {
            let (above, below) = segment::segment(&index_frame, threshold)?;
            write(
                io::write_frame_f32(&above, root.join("masks").join(format!("{}_above.tiff", name))),
                "mask above",
            );
            write(
                io::write_frame_f32(&below, root.join("masks").join(format!("{}_below.tiff", name))),
                "mask below",
            );
        }
    }

    if config.output.write_visualization {
        let rgb = render_visualization(&index_frame, config.index.gamma);
        write(
            io::write_rgb8(
                &rgb,
                index_frame.rows(),
                index_frame.cols(),
                root.join("visualization").join(format!("{}.tiff", name)),
            ),
            "visualization",
        );
    }

    Ok(index_frame)
}

/// Render the display-side visualization of an index frame.
///
/// The index is normalized over its own range, pushed through the display
/// gamma, and color mapped. Only this artifact sees the gamma; every
/// persisted numeric value stays raw.
fn render_visualization(index_frame: &Frame<f64>, gamma: f64) -> Vec<u8> {
    let range = auto_params(index_frame, ColorScheme::Oxygenation);
    let span = (range.max - range.min).max(f64::EPSILON);

    let normalized = Frame::from_array(
        index_frame
            .data()
            .mapv(|v| (v - range.min) / span),
    );
    let display = index::enhance_for_display(&normalized, gamma);

    frame_to_rgb(
        &display,
        &ColormapParams::with_range(ColorScheme::Oxygenation, 0.0, 1.0),
    )
}

fn load_stack(path: &Path, config: &BatchConfig) -> Result<BandStack<f64>> {
    match config.source {
        FrameSource::Mosaic { tile_size } => {
            let raw = io::read_frame(path)?;
            mosaic::decode(&raw, tile_size)
        }
        FrameSource::Stack => io::read_bandstack(path, config.expected_bands),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_token_extraction() {
        assert_eq!(
            capture_token("20241019_16-17-50-805_frame_0"),
            Some("16-17-50-805".to_string())
        );
        assert_eq!(capture_token("16-17-50-805"), Some("16-17-50-805".to_string()));
        assert_eq!(capture_token("plain_sample"), None);
        assert_eq!(capture_token("12-34-56"), None);
    }

    #[test]
    fn test_artifact_name_falls_back_to_stem() {
        assert_eq!(
            artifact_name(Path::new("/data/sample_003.tiff")),
            "sample_003"
        );
        assert_eq!(
            artifact_name(Path::new("/data/20241019_16-17-50-805_f.tiff")),
            "16-17-50-805"
        );
    }

    #[test]
    fn test_list_sequence_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.tiff", "a.tif", "b.tiff", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = list_sequence(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.tif", "b.tiff", "c.tiff"]);
    }
}
