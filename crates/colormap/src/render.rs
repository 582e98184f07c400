//! Frame-to-RGB rendering using color schemes.

use crate::scheme::{evaluate, ColorScheme, Rgb};
use oximap_core::frame::{Frame, FrameElement};

/// Parameters for colormap rendering.
#[derive(Debug, Clone)]
pub struct ColormapParams {
    /// Color scheme to use.
    pub scheme: ColorScheme,
    /// Minimum value for normalization. Values below this are clamped.
    pub min: f64,
    /// Maximum value for normalization. Values above this are clamped.
    pub max: f64,
    /// Fill color for NaN pixels. Default: black.
    pub fill: [u8; 3],
}

impl ColormapParams {
    /// Create params with the given scheme over the unit range; use
    /// [`auto_params`] to detect the range from data instead.
    pub fn new(scheme: ColorScheme) -> Self {
        Self {
            scheme,
            min: 0.0,
            max: 1.0,
            fill: [0, 0, 0],
        }
    }

    /// Create params with explicit min/max range.
    pub fn with_range(scheme: ColorScheme, min: f64, max: f64) -> Self {
        Self {
            scheme,
            min,
            max,
            fill: [0, 0, 0],
        }
    }
}

/// Auto-detect min/max from a frame, returning `ColormapParams` ready to use.
///
/// Scans all finite pixels to find the data range.
pub fn auto_params<T: FrameElement>(frame: &Frame<T>, scheme: ColorScheme) -> ColormapParams {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for val in frame.data().iter() {
        if let Some(v) = val.to_f64() {
            if v.is_finite() {
                if v < min {
                    min = v;
                }
                if v > max {
                    max = v;
                }
            }
        }
    }

    // Edge case: all-NaN or constant frame
    if !min.is_finite() || !max.is_finite() {
        min = 0.0;
        max = 1.0;
    } else if (max - min).abs() < f64::EPSILON {
        max = min + 1.0;
    }

    ColormapParams::with_range(scheme, min, max)
}

/// Convert a frame to an interleaved RGB pixel buffer.
///
/// Returns a `Vec<u8>` of length `rows * cols * 3` in row-major order,
/// suitable for an 8-bit RGB image writer. NaN pixels are rendered with
/// `params.fill`.
pub fn frame_to_rgb<T: FrameElement>(frame: &Frame<T>, params: &ColormapParams) -> Vec<u8> {
    let rows = frame.rows();
    let cols = frame.cols();
    let range = params.max - params.min;
    let inv_range = if range.abs() > f64::EPSILON {
        1.0 / range
    } else {
        1.0
    };

    let mut rgb = vec![0u8; rows * cols * 3];

    for (i, val) in frame.data().iter().enumerate() {
        let offset = i * 3;

        match val.to_f64() {
            Some(v) if v.is_finite() => {
                let t = (v - params.min) * inv_range;
                let Rgb { r, g, b } = evaluate(params.scheme, t);
                rgb[offset] = r;
                rgb[offset + 1] = g;
                rgb[offset + 2] = b;
            }
            _ => {
                rgb[offset] = params.fill[0];
                rgb[offset + 1] = params.fill[1];
                rgb[offset + 2] = params.fill[2];
            }
        }
    }

    rgb
}
