//! Threshold segmentation
//!
//! Splits an index frame into a complementary mask pair around a single
//! global threshold. No adaptive or local thresholding.

use ndarray::Array2;
use oximap_core::frame::Frame;
use oximap_core::Result;
use rayon::prelude::*;

/// Split an index into complementary above/below masks.
///
/// `above[p] = index[p]` where `index[p] > threshold`, else 0;
/// `below[p] = index[p]` where `index[p] <= threshold`, else 0.
/// The two masks sum back to the index elementwise for any threshold.
pub fn segment(index: &Frame<f64>, threshold: f64) -> Result<(Frame<f64>, Frame<f64>)> {
    let (rows, cols) = index.shape();

    let pairs: Vec<(f64, f64)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                let v = unsafe { index.get_unchecked(row, col) };
                if v > threshold {
                    row_data.push((v, 0.0));
                } else {
                    row_data.push((0.0, v));
                }
            }
            row_data
        })
        .collect();

    let (above, below): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();

    let above = Array2::from_shape_vec((rows, cols), above)
        .map_err(|e| oximap_core::Error::Other(e.to_string()))?;
    let below = Array2::from_shape_vec((rows, cols), below)
        .map_err(|e| oximap_core::Error::Other(e.to_string()))?;

    Ok((Frame::from_array(above), Frame::from_array(below)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame() -> Frame<f64> {
        let mut frame = Frame::new(5, 5);
        for r in 0..5 {
            for c in 0..5 {
                frame.set(r, c, (r as f64) - 2.0 + (c as f64) * 0.1).unwrap();
            }
        }
        frame
    }

    #[test]
    fn test_masks_sum_to_index() {
        let index = gradient_frame();

        for threshold in [-10.0, -0.5, 0.0, 0.2, 1.7, 10.0] {
            let (above, below) = segment(&index, threshold).unwrap();
            for r in 0..5 {
                for c in 0..5 {
                    let sum = above.get(r, c).unwrap() + below.get(r, c).unwrap();
                    assert!((sum - index.get(r, c).unwrap()).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_masks_are_complementary() {
        let index = gradient_frame();
        let (above, below) = segment(&index, 0.2).unwrap();

        for r in 0..5 {
            for c in 0..5 {
                let a = above.get(r, c).unwrap();
                let b = below.get(r, c).unwrap();
                let v = index.get(r, c).unwrap();
                if v > 0.2 {
                    assert_eq!(a, v);
                    assert_eq!(b, 0.0);
                } else {
                    assert_eq!(a, 0.0);
                    assert_eq!(b, v);
                }
            }
        }
    }

    #[test]
    fn test_threshold_below_all_values() {
        let index = Frame::filled(3, 3, 1.0);
        let (above, below) = segment(&index, 0.0).unwrap();
        assert_eq!(above.get(0, 0).unwrap(), 1.0);
        assert_eq!(below.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_value_at_threshold_goes_below() {
        let index = Frame::filled(2, 2, 0.5);
        let (above, below) = segment(&index, 0.5).unwrap();
        assert_eq!(above.get(0, 0).unwrap(), 0.0);
        assert_eq!(below.get(0, 0).unwrap(), 0.5);
    }
}
