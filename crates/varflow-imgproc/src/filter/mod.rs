//! Filter operations
//!
//! This module provides filter operations for image processing. All filters
//! replicate the border pixels, matching the clamping policy of the samplers.

/// Filter kernels
pub mod kernels;

/// Filter operations
mod ops;
pub use ops::*;

/// Separable filter operations
mod separable_filter;
pub use separable_filter::*;
