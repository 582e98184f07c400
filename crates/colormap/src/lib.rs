//! # Oximap Colormap
//!
//! Color mapping and frame-to-RGB rendering for oximap.
//!
//! Provides predefined color schemes plus a generic multi-stop
//! interpolation engine. The main entry point is [`frame_to_rgb`] which
//! converts a `Frame<T>` into an interleaved RGB pixel buffer for the
//! per-frame visualization artifact.
//!
//! ## Usage
//!
//! ```ignore
//! use oximap_colormap::{ColorScheme, ColormapParams, frame_to_rgb};
//!
//! let params = ColormapParams::new(ColorScheme::Oxygenation);
//! let rgb = frame_to_rgb(&index_frame, &params);
//! ```

mod render;
mod scheme;

pub use render::{auto_params, frame_to_rgb, ColormapParams};
pub use scheme::{evaluate, ColorScheme, ColorStop, Rgb};
