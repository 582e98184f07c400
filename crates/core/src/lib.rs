//! # Oximap Core
//!
//! Core types and I/O for the oximap multispectral analysis library.
//!
//! This crate provides:
//! - `Frame<T>`: generic single-band 2-D frame
//! - `BandStack<T>`: band-major multi-band stack with axis normalization
//! - ROI definitions with JSON persistence
//! - Native TIFF I/O for stacks, float artifacts and RGB visualizations
//! - A periodic background recorder with cooperative cancellation

pub mod error;
pub mod frame;
pub mod io;
pub mod recorder;
pub mod roi;

pub use error::{Error, Result};
pub use frame::{BandStack, Frame, FrameElement, FrameStatistics};
pub use recorder::Recorder;
pub use roi::{Roi, RoiSet};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::frame::{BandStack, Frame, FrameElement};
    pub use crate::roi::{Roi, RoiSet};
}
