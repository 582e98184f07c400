//! # Oximap Algorithms
//!
//! Multispectral processing algorithms for oximap.
//!
//! ## Pipeline stages
//!
//! - **mosaic**: de-interleave raw mosaic frames into band stacks
//! - **calibration**: white/black reference calibration, reflectance,
//!   optical density
//! - **index**: oxygenation index formulas and the display path
//! - **segment**: threshold segmentation into complementary masks
//! - **statistics**: per-ROI mean/standard deviation
//! - **tracking**: frame-to-frame ROI correlation tracking
//! - **batch**: sequence runner, artifacts and summary table

pub mod batch;
pub mod calibration;
pub mod index;
pub mod mosaic;
pub mod segment;
pub mod statistics;
pub mod tracking;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::batch::{run, BatchConfig, FrameSource, OutputSpec, SummaryTable};
    pub use crate::calibration::{
        build_calibration, to_optical_density, to_reflectance, CalibrationParams,
        CalibrationTable,
    };
    pub use crate::index::{compute_index, enhance_for_display, IndexFormula, IndexParams};
    pub use crate::mosaic::{decode, interleave};
    pub use crate::segment::segment;
    pub use crate::statistics::{roi_statistics, roi_statistics_all, RoiStats};
    pub use crate::tracking::{RoiTracker, TrackerParams};
    pub use oximap_core::prelude::*;
}
