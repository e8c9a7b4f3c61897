#![deny(missing_docs)]
//! Coarse-to-fine variational optical flow.
//!
//! The flow between two images is estimated on a gaussian pyramid, from the
//! coarsest level to the input resolution. At every level the energy
//!
//! `E(u, v) = sum psi(|I2(x + w) - I1(x)|^2) + alpha * sum phi(|grad u|^2 + |grad v|^2)`
//!
//! is minimised by repeated linearisation around the current flow (outer
//! iterations), robust reweighting (inner iterations) and a fixed budget of
//! conjugate gradient iterations on the resulting sparse system.
//!
//! Images are [`varflow_image::Image<f32, C>`] in channel-last order; any
//! channel count is accepted as long as both images share it.

/// conjugate gradient solver.
pub mod cg;

/// Error types for the optical flow module.
pub mod error;

/// flow estimation entry points.
pub mod estimator;

/// dense flow field type.
pub mod flow;

/// single level refinement and energy evaluation.
pub mod level;

pub mod linearize;

/// solver configuration.
pub mod params;

pub mod penalty;

/// paired image pyramid.
pub mod pyramid;

pub mod system;

pub use crate::error::FlowError;
pub use crate::estimator::{estimate, warp, FlowEstimator, FlowOutput};
pub use crate::flow::FlowField;
pub use crate::params::FlowParams;
pub use crate::penalty::Penalty;
pub use crate::pyramid::{FlowPyramid, PyramidLevel};
