//! Oxygenation index computation
//!
//! Combines two calibrated bands (isosbestic and hemoglobin-sensitive) into
//! a scalar index estimating relative tissue oxygenation. Two formulas are
//! in clinical use and neither is canonical, so the choice is an explicit
//! parameter.

use ndarray::Array2;
use oximap_core::frame::Frame;
use oximap_core::{Error, Result};
use rayon::prelude::*;

/// Index formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormula {
    /// `amplification * (OD_b - OD_a)`: optical-density difference,
    /// hemoglobin channel (b) minus isosbestic channel (a).
    OdDifference,
    /// `R_a / max(R_b, ratio_floor)`: reflectance ratio with a floored
    /// denominator against near-zero blow-up.
    ReflectanceRatio,
}

/// Parameters for index computation and its display path
#[derive(Debug, Clone)]
pub struct IndexParams {
    pub formula: IndexFormula,
    /// Scalar multiplier making small physiological differences visible.
    /// Applies identically to stored and display values for the
    /// difference formula; both share the same physical unit.
    pub amplification: f64,
    /// Denominator floor for the ratio formula
    pub ratio_floor: f64,
    /// Gamma for the display-enhancement path only
    pub gamma: f64,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            formula: IndexFormula::OdDifference,
            amplification: 1.0,
            ratio_floor: 0.01,
            gamma: 0.7,
        }
    }
}

/// Compute the oxygenation index from two reflectance bands.
///
/// Band `a` is the isosbestic (difference formula) or numerator (ratio
/// formula) channel; band `b` is the hemoglobin-sensitive channel. Both
/// frames must share dimensions. Optical densities for the difference
/// formula are derived internally from the reflectance inputs.
pub fn compute_index(
    reflectance_a: &Frame<f64>,
    reflectance_b: &Frame<f64>,
    params: &IndexParams,
) -> Result<Frame<f64>> {
    if reflectance_a.shape() != reflectance_b.shape() {
        return Err(Error::SizeMismatch {
            er: reflectance_a.rows(),
            ec: reflectance_a.cols(),
            ar: reflectance_b.rows(),
            ac: reflectance_b.cols(),
        });
    }

    let (rows, cols) = reflectance_a.shape();
    let formula = params.formula;
    let amplification = params.amplification;
    let ratio_floor = params.ratio_floor;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let ra = unsafe { reflectance_a.get_unchecked(row, col) };
                let rb = unsafe { reflectance_b.get_unchecked(row, col) };

                if ra.is_nan() || rb.is_nan() {
                    continue;
                }

                row_data[col] = match formula {
                    // OD_b - OD_a = -ln(rb) + ln(ra)
                    IndexFormula::OdDifference => amplification * (ra.ln() - rb.ln()),
                    IndexFormula::ReflectanceRatio => ra / rb.max(ratio_floor),
                };
            }
            row_data
        })
        .collect();

    let array =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(Frame::from_array(array))
}

/// Gamma-enhance a reflectance or index frame for display.
///
/// `value ^ gamma` with gamma < 1 brightening dark regions. Strictly a
/// presentation transform: the result must never replace persisted values
/// or feed ROI statistics.
pub fn enhance_for_display(frame: &Frame<f64>, gamma: f64) -> Frame<f64> {
    Frame::from_array(frame.data().mapv(|v| v.max(0.0).powf(gamma)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_od_difference() {
        // ra = 0.5 -> OD_a = ln 2; rb = 0.25 -> OD_b = ln 4.
        // index = OD_b - OD_a = ln 2.
        let a = Frame::filled(3, 3, 0.5);
        let b = Frame::filled(3, 3, 0.25);

        let index = compute_index(&a, &b, &IndexParams::default()).unwrap();
        assert!((index.get(1, 1).unwrap() - std::f64::consts::LN_2).abs() < 1e-10);
    }

    #[test]
    fn test_amplification_scales_stored_values() {
        let a = Frame::filled(2, 2, 0.5);
        let b = Frame::filled(2, 2, 0.25);
        let params = IndexParams {
            amplification: 5.0,
            ..Default::default()
        };

        let index = compute_index(&a, &b, &params).unwrap();
        assert!((index.get(0, 0).unwrap() - 5.0 * std::f64::consts::LN_2).abs() < 1e-10);
    }

    #[test]
    fn test_ratio_formula() {
        let a = Frame::filled(2, 2, 0.6);
        let b = Frame::filled(2, 2, 0.3);
        let params = IndexParams {
            formula: IndexFormula::ReflectanceRatio,
            ..Default::default()
        };

        let index = compute_index(&a, &b, &params).unwrap();
        assert!((index.get(0, 0).unwrap() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_ratio_floor_engages() {
        // Denominator 1e-6 is floored to 0.01, bounding the ratio at
        // 0.6 / 0.01 instead of 600000.
        let a = Frame::filled(2, 2, 0.6);
        let b = Frame::filled(2, 2, 1e-6);
        let params = IndexParams {
            formula: IndexFormula::ReflectanceRatio,
            ..Default::default()
        };

        let index = compute_index(&a, &b, &params).unwrap();
        assert!((index.get(0, 0).unwrap() - 60.0).abs() < 1e-10);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let a = Frame::filled(2, 2, 0.5);
        let b = Frame::filled(3, 2, 0.5);
        assert!(compute_index(&a, &b, &IndexParams::default()).is_err());
    }

    #[test]
    fn test_display_enhancement_does_not_touch_index() {
        let a = Frame::filled(2, 2, 0.5);
        let b = Frame::filled(2, 2, 0.25);
        let params = IndexParams::default();

        let index = compute_index(&a, &b, &params).unwrap();
        let display = enhance_for_display(&index, params.gamma);

        // The display frame differs; the stored index is unchanged.
        assert!((display.get(0, 0).unwrap() - index.get(0, 0).unwrap()).abs() > 1e-3);
        assert!((index.get(0, 0).unwrap() - std::f64::consts::LN_2).abs() < 1e-10);
    }

    #[test]
    fn test_display_gamma_brightens() {
        let frame = Frame::filled(1, 1, 0.25);
        let display = enhance_for_display(&frame, 0.5);
        assert!((display.get(0, 0).unwrap() - 0.5).abs() < 1e-10);
    }
}
