//! Mosaic decoding
//!
//! A tiled mosaic sensor samples N*N spectral bands through an N x N pixel
//! tile repeated across the detector. Decoding de-interleaves one raw frame
//! into a band-major stack of sub-sampled bands.

use ndarray::Array3;
use oximap_core::frame::{BandStack, Frame};
use oximap_core::{Error, Result};

/// De-interleave a raw mosaic frame into its N*N spectral bands.
///
/// Band `i * N + j` is the sub-grid sampled at tile row `i`, tile column
/// `j`, i.e. `raw[i..;N, j..;N]`. This ordering is fixed; downstream band
/// index conventions (isosbestic/hemoglobin channel numbers) depend on it.
///
/// Output bands are `floor(rows / N) x floor(cols / N)`; remainder rows and
/// columns at the right/bottom edge are discarded.
///
/// # Arguments
/// * `raw` - Raw mosaic-pattern frame
/// * `tile_size` - N, the mosaic tile edge length (4 for a 16-band sensor)
pub fn decode(raw: &Frame<f64>, tile_size: usize) -> Result<BandStack<f64>> {
    let (rows, cols) = raw.shape();

    if tile_size == 0 || rows / tile_size == 0 || cols / tile_size == 0 {
        return Err(Error::UnsupportedTileSize {
            tile_size,
            rows,
            cols,
        });
    }

    let out_rows = rows / tile_size;
    let out_cols = cols / tile_size;
    let bands = tile_size * tile_size;

    let mut data = Array3::zeros((bands, out_rows, out_cols));

    for i in 0..tile_size {
        for j in 0..tile_size {
            let band = i * tile_size + j;
            for r in 0..out_rows {
                for c in 0..out_cols {
                    data[[band, r, c]] =
                        unsafe { raw.get_unchecked(r * tile_size + i, c * tile_size + j) };
                }
            }
        }
    }

    Ok(BandStack::band_major(data))
}

/// Re-interleave a decoded stack back into a mosaic frame.
///
/// Inverse of [`decode`] over the truncated region: `decode` followed by
/// `interleave` reproduces the raw frame with edge remainders dropped.
pub fn interleave(stack: &BandStack<f64>, tile_size: usize) -> Result<Frame<f64>> {
    if tile_size == 0 || stack.bands() != tile_size * tile_size {
        return Err(Error::UnsupportedTileSize {
            tile_size,
            rows: stack.rows(),
            cols: stack.cols(),
        });
    }

    let (bands, out_rows, out_cols) = stack.shape();
    let mut raw = Frame::new(out_rows * tile_size, out_cols * tile_size);

    for band in 0..bands {
        let i = band / tile_size;
        let j = band % tile_size;
        let view = stack.band(band)?;
        for r in 0..out_rows {
            for c in 0..out_cols {
                raw.set(r * tile_size + i, c * tile_size + j, view[[r, c]])?;
            }
        }
    }

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 8x8 frame where pixel (r, c) encodes its own mosaic position:
    /// value = (r % 4) * 4 + (c % 4), i.e. the band it belongs to.
    fn mosaic_frame() -> Frame<f64> {
        let mut frame = Frame::new(8, 8);
        for r in 0..8 {
            for c in 0..8 {
                frame.set(r, c, ((r % 4) * 4 + (c % 4)) as f64).unwrap();
            }
        }
        frame
    }

    #[test]
    fn test_decode_band_order() {
        let stack = decode(&mosaic_frame(), 4).unwrap();
        assert_eq!(stack.shape(), (16, 2, 2));

        // Each band is constant and equal to its own index.
        for band in 0..16 {
            let view = stack.band(band).unwrap();
            for &v in view.iter() {
                assert_eq!(v, band as f64);
            }
        }
    }

    #[test]
    fn test_decode_truncates_edges() {
        let mut frame = Frame::new(9, 10);
        for r in 0..9 {
            for c in 0..10 {
                frame.set(r, c, (r * 10 + c) as f64).unwrap();
            }
        }

        let stack = decode(&frame, 4).unwrap();
        assert_eq!(stack.shape(), (16, 2, 2));
    }

    #[test]
    fn test_decode_roundtrip() {
        // 10x11 with tile 4 truncates to 8x8; the round-trip must
        // reproduce exactly that region.
        let mut frame = Frame::new(10, 11);
        for r in 0..10 {
            for c in 0..11 {
                frame.set(r, c, (r * 31 + c * 7) as f64).unwrap();
            }
        }

        let stack = decode(&frame, 4).unwrap();
        let back = interleave(&stack, 4).unwrap();

        assert_eq!(back.shape(), (8, 8));
        for r in 0..8 {
            for c in 0..8 {
                assert_eq!(back.get(r, c).unwrap(), frame.get(r, c).unwrap());
            }
        }
    }

    #[test]
    fn test_decode_rejects_zero_tile() {
        let err = decode(&mosaic_frame(), 0).unwrap_err();
        assert!(matches!(err, Error::UnsupportedTileSize { tile_size: 0, .. }));
    }

    #[test]
    fn test_decode_rejects_oversized_tile() {
        let frame = Frame::filled(3, 3, 1.0);
        let err = decode(&frame, 4).unwrap_err();
        assert!(matches!(err, Error::UnsupportedTileSize { tile_size: 4, .. }));
    }

    #[test]
    fn test_interleave_rejects_band_count_mismatch() {
        let stack = decode(&mosaic_frame(), 4).unwrap();
        assert!(interleave(&stack, 3).is_err());
    }
}
