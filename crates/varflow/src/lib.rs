#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use varflow_image as image;

#[doc(inline)]
pub use varflow_imgproc as imgproc;

#[doc(inline)]
pub use varflow_optflow as optflow;
