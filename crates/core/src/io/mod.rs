//! I/O operations for frames, band stacks and ROI sets

mod native;

pub use native::{
    read_bandstack, read_frame, read_pages, write_frame_f32, write_rgb8, write_stack_f32,
};
