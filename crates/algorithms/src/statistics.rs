//! ROI statistics
//!
//! Per-region mean and standard deviation over a rectangular slice of an
//! index or band frame. Rectangles are validated against the frame size
//! once per set, before any per-frame work; evaluation of independent ROIs
//! within one frame is parallel with no shared state.

use oximap_core::frame::Frame;
use oximap_core::roi::{Roi, RoiSet};
use oximap_core::Result;
use rayon::prelude::*;

/// Statistics for one ROI on one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiStats {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

/// Compute mean and standard deviation over a ROI rectangle.
///
/// Fails with `RoiOutOfBounds` before touching any pixel if the rectangle
/// exceeds the frame. NaN pixels are excluded from the statistics.
pub fn roi_statistics(image: &Frame<f64>, roi: &Roi) -> Result<RoiStats> {
    let (rows, cols) = image.shape();
    roi.validate_bounds(rows, cols)?;

    let mut sum = 0.0;
    let mut count = 0usize;

    for r in roi.y..roi.y + roi.h {
        for c in roi.x..roi.x + roi.w {
            let v = unsafe { image.get_unchecked(r, c) };
            if v.is_nan() {
                continue;
            }
            sum += v;
            count += 1;
        }
    }

    if count == 0 {
        return Ok(RoiStats {
            mean: f64::NAN,
            std_dev: f64::NAN,
            count: 0,
        });
    }

    let mean = sum / count as f64;

    let mut var = 0.0;
    for r in roi.y..roi.y + roi.h {
        for c in roi.x..roi.x + roi.w {
            let v = unsafe { image.get_unchecked(r, c) };
            if v.is_nan() {
                continue;
            }
            var += (v - mean) * (v - mean);
        }
    }
    var /= count as f64;

    Ok(RoiStats {
        mean,
        std_dev: var.sqrt(),
        count,
    })
}

/// Evaluate every ROI of a set against one frame, in parallel.
///
/// The set must have been bounds-validated for this frame size; any ROI
/// failing here still returns its own error. Results come back in set
/// order.
pub fn roi_statistics_all(image: &Frame<f64>, rois: &RoiSet) -> Result<Vec<RoiStats>> {
    rois.rois()
        .par_iter()
        .map(|roi| roi_statistics(image, roi))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oximap_core::Error;

    #[test]
    fn test_uniform_region_mean() {
        let image = Frame::filled(50, 50, 7.25);

        // Placement is irrelevant for a uniform image.
        for roi in [
            Roi::new("a", 0, 0, 10, 10),
            Roi::new("b", 35, 40, 15, 10),
            Roi::new("c", 49, 49, 1, 1),
        ] {
            let stats = roi_statistics(&image, &roi).unwrap();
            assert!((stats.mean - 7.25).abs() < 1e-12);
            assert!(stats.std_dev.abs() < 1e-12);
            assert_eq!(stats.count, roi.w * roi.h);
        }
    }

    #[test]
    fn test_known_std_dev() {
        let mut image = Frame::new(1, 4);
        for (c, v) in [2.0, 4.0, 4.0, 6.0].iter().enumerate() {
            image.set(0, c, *v).unwrap();
        }

        let stats = roi_statistics(&image, &Roi::new("row", 0, 0, 4, 1)).unwrap();
        assert!((stats.mean - 4.0).abs() < 1e-12);
        // Population standard deviation of [2, 4, 4, 6] is sqrt(2).
        assert!((stats.std_dev - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_bounds_fails_before_access() {
        let image = Frame::filled(10, 10, 1.0);
        let err = roi_statistics(&image, &Roi::new("big", 5, 5, 10, 10)).unwrap_err();
        assert!(matches!(err, Error::RoiOutOfBounds { .. }));
    }

    #[test]
    fn test_nan_pixels_excluded() {
        let mut image = Frame::filled(4, 4, 3.0);
        image.set(1, 1, f64::NAN).unwrap();

        let stats = roi_statistics(&image, &Roi::new("all", 0, 0, 4, 4)).unwrap();
        assert_eq!(stats.count, 15);
        assert!((stats.mean - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_set_evaluation_order() {
        let mut image = Frame::filled(10, 10, 0.0);
        for r in 0..5 {
            for c in 0..5 {
                image.set(r, c, 10.0).unwrap();
            }
        }

        let set = RoiSet::new(vec![
            Roi::new("bright", 0, 0, 5, 5),
            Roi::new("dark", 5, 5, 5, 5),
        ])
        .unwrap();

        let stats = roi_statistics_all(&image, &set).unwrap();
        assert!((stats[0].mean - 10.0).abs() < 1e-12);
        assert!((stats[1].mean - 0.0).abs() < 1e-12);
    }
}
