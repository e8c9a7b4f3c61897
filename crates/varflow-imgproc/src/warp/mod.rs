//! Image warping by dense displacement fields.
//!
//! A flow field `(u, v)` maps every pixel `(x, y)` of the output to the
//! source position `(x + u(x, y), y + v(x, y))`, which is sampled bilinearly
//! with border clamping.
//!
//! # Examples
//!
//! Shifting an image one pixel to the left:
//!
//! ```
//! use varflow_image::Image;
//! use varflow_imgproc::warp::warp_flow;
//!
//! let src = Image::<f32, 1>::new([3, 1].into(), vec![1.0, 2.0, 3.0]).unwrap();
//! let u = Image::<f32, 1>::from_size_val(src.size(), 1.0).unwrap();
//! let v = Image::<f32, 1>::from_size_val(src.size(), 0.0).unwrap();
//! let mut dst = Image::<f32, 1>::from_size_val(src.size(), 0.0).unwrap();
//!
//! warp_flow(&src, &u, &v, &mut dst).unwrap();
//! assert_eq!(dst.as_slice(), &[2.0, 3.0, 3.0]);
//! ```

mod flow;

pub use flow::{flow_inside_mask, warp_flow};
