//! Frame element trait for generic pixel values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a frame pixel.
///
/// Bounds the types usable as sample values, ensuring they support the
/// numeric conversions the pipeline needs.
pub trait FrameElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Whether this value is not a number (always false for integers)
    fn is_nan_value(&self) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert an f64 into this type, if representable
    fn from_f64(value: f64) -> Option<Self> {
        NumCast::from(value)
    }
}

macro_rules! impl_frame_element_int {
    ($t:ty) => {
        impl FrameElement for $t {
            fn is_float() -> bool {
                false
            }

            fn is_nan_value(&self) -> bool {
                false
            }
        }
    };
}

macro_rules! impl_frame_element_float {
    ($t:ty) => {
        impl FrameElement for $t {
            fn is_float() -> bool {
                true
            }

            fn is_nan_value(&self) -> bool {
                self.is_nan()
            }
        }
    };
}

impl_frame_element_int!(u8);
impl_frame_element_int!(u16);
impl_frame_element_int!(u32);
impl_frame_element_int!(u64);
impl_frame_element_float!(f32);
impl_frame_element_float!(f64);
