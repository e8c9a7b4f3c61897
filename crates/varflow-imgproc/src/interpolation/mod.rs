//! Pixel interpolation methods for image resampling.
//!
//! Every sampler here follows the same border policy as
//! [`varflow_image::Image::get_pixel_clamped`]: sample positions outside the
//! image read the nearest edge pixel.
//!
//! # Common Use Cases
//!
//! - Image resizing with `crate::resize`
//! - Flow warping with `crate::warp`
//! - Custom remapping operations

mod bilinear;

/// Grid generation and coordinate mapping utilities.
pub mod grid;

mod remap;

pub use bilinear::bilinear_interpolation;
pub use remap::remap;
