//! Multi-band stack with band-axis normalization

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameElement};
use ndarray::{Array3, ArrayView2, Axis};

/// An ordered stack of spectral bands.
///
/// Internally always band-major `(bands, rows, cols)`. Archived stacks come
/// in either band-major or band-minor axis order; [`BandStack::from_array3`]
/// identifies the band axis by matching the expected band count and
/// normalizes. The band count is constant for a given capture sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct BandStack<T: FrameElement> {
    data: Array3<T>,
}

impl<T: FrameElement> BandStack<T> {
    /// Wrap an array already in band-major `(bands, rows, cols)` order.
    pub fn band_major(data: Array3<T>) -> Self {
        Self { data }
    }

    /// Normalize an arbitrary 3-D array into a band-major stack.
    ///
    /// The band axis is the one whose length equals `expected_bands`. When
    /// more than one axis matches (e.g. a 16x16x16 cube) the leading axis
    /// wins, so band-major data passes through untouched. Fails with
    /// `BandCountMismatch` when no axis matches.
    pub fn from_array3(data: Array3<T>, expected_bands: usize) -> Result<Self> {
        let shape = data.shape().to_vec();

        if shape[0] == expected_bands {
            return Ok(Self { data });
        }
        if shape[2] == expected_bands {
            // Band-minor (rows, cols, bands): move the band axis to the front.
            let normalized = data.permuted_axes([2, 0, 1]).as_standard_layout().to_owned();
            return Ok(Self { data: normalized });
        }

        Err(Error::BandCountMismatch {
            expected: expected_bands,
            shape,
        })
    }

    /// Build a stack from equally sized band frames, in band order.
    pub fn from_bands(bands: Vec<Frame<T>>) -> Result<Self> {
        let first = bands.first().ok_or(Error::InvalidDimensions { rows: 0, cols: 0 })?;
        let (rows, cols) = first.shape();

        let mut data = Array3::zeros((bands.len(), rows, cols));
        for (i, band) in bands.iter().enumerate() {
            if band.shape() != (rows, cols) {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: band.rows(),
                    ac: band.cols(),
                });
            }
            data.index_axis_mut(Axis(0), i).assign(band.data());
        }

        Ok(Self { data })
    }

    /// Number of bands
    pub fn bands(&self) -> usize {
        self.data.shape()[0]
    }

    /// Number of rows per band
    pub fn rows(&self) -> usize {
        self.data.shape()[1]
    }

    /// Number of columns per band
    pub fn cols(&self) -> usize {
        self.data.shape()[2]
    }

    /// Dimensions as (bands, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// View of one band
    pub fn band(&self, band: usize) -> Result<ArrayView2<'_, T>> {
        if band >= self.bands() {
            return Err(Error::IndexOutOfBounds {
                row: band,
                col: 0,
                rows: self.bands(),
                cols: 0,
            });
        }
        Ok(self.data.index_axis(Axis(0), band))
    }

    /// Copy one band out as a standalone frame
    pub fn band_frame(&self, band: usize) -> Result<Frame<T>> {
        Ok(Frame::from_array(self.band(band)?.to_owned()))
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    /// Consume the stack and return the underlying array
    pub fn into_array(self) -> Array3<T> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_major_passthrough() {
        let data: Array3<f64> = Array3::zeros((16, 4, 6));
        let stack = BandStack::from_array3(data, 16).unwrap();
        assert_eq!(stack.shape(), (16, 4, 6));
    }

    #[test]
    fn test_band_minor_normalized() {
        let mut data: Array3<f64> = Array3::zeros((4, 6, 16));
        data[[2, 3, 7]] = 42.0;

        let stack = BandStack::from_array3(data, 16).unwrap();
        assert_eq!(stack.shape(), (16, 4, 6));
        assert_eq!(stack.band(7).unwrap()[[2, 3]], 42.0);
    }

    #[test]
    fn test_no_axis_match_rejected() {
        let data: Array3<f64> = Array3::zeros((8, 4, 6));
        let err = BandStack::from_array3(data, 16).unwrap_err();
        assert!(matches!(err, Error::BandCountMismatch { expected: 16, .. }));
    }

    #[test]
    fn test_ambiguous_cube_prefers_band_major() {
        let mut data: Array3<f64> = Array3::zeros((16, 16, 16));
        data[[3, 1, 2]] = 9.0;

        let stack = BandStack::from_array3(data, 16).unwrap();
        assert_eq!(stack.band(3).unwrap()[[1, 2]], 9.0);
    }

    #[test]
    fn test_from_bands() {
        let bands = vec![
            Frame::filled(2, 3, 1.0_f64),
            Frame::filled(2, 3, 2.0_f64),
        ];
        let stack = BandStack::from_bands(bands).unwrap();
        assert_eq!(stack.shape(), (2, 2, 3));
        assert_eq!(stack.band(1).unwrap()[[0, 0]], 2.0);
    }

    #[test]
    fn test_from_bands_size_mismatch() {
        let bands = vec![
            Frame::filled(2, 3, 1.0_f64),
            Frame::filled(3, 3, 2.0_f64),
        ];
        assert!(BandStack::from_bands(bands).is_err());
    }
}
