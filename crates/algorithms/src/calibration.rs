//! Radiometric calibration
//!
//! Converts raw sensor counts into reflectance and optical density using a
//! white/black reference pair. Reference levels are extracted per band as
//! percentiles rather than min/max, which rejects hot and dead pixel
//! outliers on the sensor.

use ndarray::ArrayView2;
use oximap_core::frame::{BandStack, Frame};
use oximap_core::{Error, Result};
use tracing::warn;

/// Parameters for building a calibration table
#[derive(Debug, Clone)]
pub struct CalibrationParams {
    /// Percentile of the white reference used as the white level
    pub white_percentile: f64,
    /// Percentile of the black reference used as the black level
    pub black_percentile: f64,
    /// Floor keeping reflectance strictly positive (and optical density finite)
    pub epsilon: f64,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            white_percentile: 95.0,
            black_percentile: 5.0,
            epsilon: 1e-6,
        }
    }
}

/// Calibration levels for one band
#[derive(Debug, Clone)]
pub struct BandCalibration {
    pub band: usize,
    pub white_value: f64,
    pub black_value: f64,
    pub epsilon: f64,
    /// Set when white_value <= black_value; reflectance for this band
    /// collapses toward epsilon (near-maximum density).
    pub degenerate: bool,
}

/// Per-band calibration levels, computed once per run from the reference
/// pair and immutable afterwards.
#[derive(Debug, Clone)]
pub struct CalibrationTable {
    entries: Vec<BandCalibration>,
}

impl CalibrationTable {
    /// Look up the entry for a band index
    pub fn get(&self, band: usize) -> Option<&BandCalibration> {
        self.entries.iter().find(|e| e.band == band)
    }

    pub fn entries(&self) -> &[BandCalibration] {
        &self.entries
    }

    /// Bands flagged degenerate during the build
    pub fn degenerate_bands(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|e| e.degenerate)
            .map(|e| e.band)
            .collect()
    }
}

/// Build a calibration table for the selected bands.
///
/// Both references must have identical shapes. A band whose white level
/// does not exceed its black level is flagged degenerate and reported once
/// here, not once per pixel or frame.
pub fn build_calibration(
    white: &BandStack<f64>,
    black: &BandStack<f64>,
    bands: &[usize],
    params: &CalibrationParams,
) -> Result<CalibrationTable> {
    if white.shape() != black.shape() {
        return Err(Error::SizeMismatch {
            er: white.rows(),
            ec: white.cols(),
            ar: black.rows(),
            ac: black.cols(),
        });
    }

    let mut entries = Vec::with_capacity(bands.len());

    for &band in bands {
        if band >= white.bands() {
            return Err(Error::InvalidParameter {
                name: "band",
                value: band.to_string(),
                reason: format!("reference stack has {} bands", white.bands()),
            });
        }

        let white_value = percentile(white.band(band)?, params.white_percentile);
        let black_value = percentile(black.band(band)?, params.black_percentile);

        let degenerate = white_value <= black_value;
        if degenerate {
            warn!(
                band,
                white_value, black_value, "degenerate calibration: white level <= black level"
            );
        }

        entries.push(BandCalibration {
            band,
            white_value,
            black_value,
            epsilon: params.epsilon,
            degenerate,
        });
    }

    Ok(CalibrationTable { entries })
}

/// Nearest-rank percentile over the finite values of a band
fn percentile(band: ArrayView2<'_, f64>, pct: f64) -> f64 {
    let mut values: Vec<f64> = band.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return f64::NAN;
    }

    let pct = pct.clamp(0.0, 100.0);
    let rank = ((values.len() - 1) as f64 * pct / 100.0).round() as usize;
    values.select_nth_unstable_by(rank, |a, b| {
        a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
    });
    values[rank]
}

/// Convert a raw band to reflectance.
///
/// `(raw - black) / (white - black + epsilon)`, clipped into
/// `[epsilon, 1]`. The strictly positive floor keeps the subsequent log
/// transform finite everywhere. A degenerate band has no usable dynamic
/// range and collapses to the floor (near-maximum density).
pub fn to_reflectance(raw_band: ArrayView2<'_, f64>, cal: &BandCalibration) -> Frame<f64> {
    if cal.degenerate {
        return Frame::from_array(raw_band.mapv(|_| cal.epsilon));
    }

    let denom = cal.white_value - cal.black_value + cal.epsilon;
    let data = raw_band.mapv(|v| ((v - cal.black_value) / denom).clamp(cal.epsilon, 1.0));
    Frame::from_array(data)
}

/// Optical density: `-ln(reflectance)` per pixel
pub fn to_optical_density(reflectance: &Frame<f64>) -> Frame<f64> {
    Frame::from_array(reflectance.data().mapv(|r| -r.ln()))
}
