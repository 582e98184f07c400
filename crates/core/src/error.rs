//! Error types for oximap

use thiserror::Error;

/// Main error type for oximap operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported tile size {tile_size} for a {rows}x{cols} frame")]
    UnsupportedTileSize {
        tile_size: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Band count mismatch: expected {expected} bands, no axis of shape {shape:?} matches")]
    BandCountMismatch { expected: usize, shape: Vec<usize> },

    #[error("Degenerate calibration for band {band}: white {white_value} <= black {black_value}")]
    CalibrationDegenerate {
        band: usize,
        white_value: f64,
        black_value: f64,
    },

    #[error("ROI '{name}' ({x}, {y}, {w}x{h}) exceeds frame bounds {rows}x{cols}")]
    RoiOutOfBounds {
        name: String,
        x: usize,
        y: usize,
        w: usize,
        h: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Tracking lost for ROI '{roi}' on frame '{file}'")]
    TrackingFailure { roi: String, file: String },

    #[error("Duplicate ROI name '{0}' in set")]
    DuplicateRoiName(String),

    #[error("Invalid frame dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("Index out of bounds: ({row}, {col}) in frame of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Frame size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch {
        er: usize,
        ec: usize,
        ar: usize,
        ac: usize,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for oximap operations
pub type Result<T> = std::result::Result<T, Error>;
