//! Native TIFF reading/writing
//!
//! Uses the `tiff` crate for grayscale multi-page band stacks (one band per
//! page, band-major), 32-bit float analysis artifacts and 8-bit RGB
//! visualizations.

use crate::error::{Error, Result};
use crate::frame::{BandStack, Frame};
use ndarray::{Array2, Array3, Axis};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, RGB8};
use tiff::encoder::TiffEncoder;

/// Read every grayscale page of a TIFF file, cast to f64.
///
/// Returns one `Array2` per page. Every page must share the dimensions of
/// the first; multi-page files are band-major by convention.
pub fn read_pages<P: AsRef<Path>>(path: P) -> Result<Vec<Array2<f64>>> {
    let file = File::open(path.as_ref())?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let mut pages = Vec::new();
    let mut first_dims: Option<(u32, u32)> = None;

    loop {
        let (width, height) = decoder
            .dimensions()
            .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

        match first_dims {
            None => first_dims = Some((width, height)),
            Some((w, h)) if (width, height) != (w, h) => {
                return Err(Error::SizeMismatch {
                    er: h as usize,
                    ec: w as usize,
                    ar: height as usize,
                    ac: width as usize,
                });
            }
            _ => {}
        }

        let result = decoder
            .read_image()
            .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;
        pages.push(decode_page(result, height as usize, width as usize)?);

        if !decoder.more_images() {
            break;
        }
        decoder
            .next_image()
            .map_err(|e| Error::Other(format!("Cannot advance to next page: {}", e)))?;
    }

    Ok(pages)
}

fn decode_page(result: DecodingResult, rows: usize, cols: usize) -> Result<Array2<f64>> {
    let data: Vec<f64> = match result {
        DecodingResult::U8(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U16(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U64(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::F32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::F64(buf) => buf,
        _ => {
            return Err(Error::Other(
                "Unsupported TIFF pixel format (grayscale unsigned or float expected)".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions { rows, cols });
    }

    Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))
}

/// Read a single-page TIFF as one frame.
///
/// Fails with `SizeMismatch` if the file holds more than one page; raw
/// mosaic captures are always single-page.
pub fn read_frame<P: AsRef<Path>>(path: P) -> Result<Frame<f64>> {
    let pages = read_pages(path)?;
    if pages.len() != 1 {
        let (rows, cols) = pages[0].dim();
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: pages.len() * rows,
            ac: cols,
        });
    }
    let page = pages.into_iter().next().unwrap();
    Ok(Frame::from_array(page))
}

/// Read a multi-page TIFF as a band stack with the expected band count.
///
/// Pages map to the leading (band) axis; the count is validated through the
/// same normalization used for in-memory stacks, so a file whose page count
/// does not match `expected_bands` is rejected with `BandCountMismatch`.
pub fn read_bandstack<P: AsRef<Path>>(path: P, expected_bands: usize) -> Result<BandStack<f64>> {
    let pages = read_pages(path)?;
    let (rows, cols) = pages[0].dim();

    let mut data = Array3::zeros((pages.len(), rows, cols));
    for (i, page) in pages.iter().enumerate() {
        data.index_axis_mut(Axis(0), i).assign(page);
    }

    BandStack::from_array3(data, expected_bands)
}

/// Write a frame as a single-page 32-bit float grayscale TIFF
pub fn write_frame_f32<P: AsRef<Path>>(frame: &Frame<f64>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(|e| Error::Other(format!("TIFF encode error: {}", e)))?;

    let buf: Vec<f32> = frame.data().iter().map(|&v| v as f32).collect();
    encoder
        .write_image::<Gray32Float>(frame.cols() as u32, frame.rows() as u32, &buf)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

/// Write a band stack as a multi-page 32-bit float grayscale TIFF,
/// one page per band in band order.
pub fn write_stack_f32<P: AsRef<Path>>(stack: &BandStack<f64>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(|e| Error::Other(format!("TIFF encode error: {}", e)))?;

    for band in 0..stack.bands() {
        let view = stack.band(band)?;
        let buf: Vec<f32> = view.iter().map(|&v| v as f32).collect();
        encoder
            .write_image::<Gray32Float>(stack.cols() as u32, stack.rows() as u32, &buf)
            .map_err(|e| Error::Other(format!("Cannot write band {}: {}", band, e)))?;
    }

    Ok(())
}

/// Write an interleaved RGB buffer as an 8-bit RGB TIFF
pub fn write_rgb8<P: AsRef<Path>>(rgb: &[u8], rows: usize, cols: usize, path: P) -> Result<()> {
    if rgb.len() != rows * cols * 3 {
        return Err(Error::InvalidDimensions { rows, cols });
    }

    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(|e| Error::Other(format!("TIFF encode error: {}", e)))?;

    encoder
        .write_image::<RGB8>(cols as u32, rows as u32, rgb)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_frame_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.tiff");

        let mut frame = Frame::new(4, 5);
        for r in 0..4 {
            for c in 0..5 {
                frame.set(r, c, (r * 5 + c) as f64).unwrap();
            }
        }

        write_frame_f32(&frame, &path).unwrap();
        let back = read_frame(&path).unwrap();

        assert_eq!(back.shape(), (4, 5));
        for r in 0..4 {
            for c in 0..5 {
                assert!((back.get(r, c).unwrap() - (r * 5 + c) as f64).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_stack_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tiff");

        let mut data: Array3<f64> = Array3::zeros((3, 4, 5));
        for b in 0..3 {
            for r in 0..4 {
                for c in 0..5 {
                    data[[b, r, c]] = (b * 100 + r * 5 + c) as f64;
                }
            }
        }
        let stack = BandStack::band_major(data);

        write_stack_f32(&stack, &path).unwrap();
        let back = read_bandstack(&path, 3).unwrap();

        assert_eq!(back.shape(), (3, 4, 5));
        assert!((back.band(2).unwrap()[[3, 4]] - 219.0).abs() < 1e-6);
    }

    #[test]
    fn test_bandstack_page_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.tiff");

        let stack = BandStack::band_major(Array3::<f64>::zeros((3, 4, 5)));
        write_stack_f32(&stack, &path).unwrap();

        let err = read_bandstack(&path, 16).unwrap_err();
        assert!(matches!(err, Error::BandCountMismatch { expected: 16, .. }));
    }

    #[test]
    fn test_read_frame_rejects_multipage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.tiff");

        let stack = BandStack::band_major(Array3::<f64>::zeros((2, 4, 5)));
        write_stack_f32(&stack, &path).unwrap();

        assert!(read_frame(&path).is_err());
    }
}
