use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::penalty::Penalty;

/// Parameters of the coarse-to-fine variational solver.
///
/// Missing fields take their default value when deserializing, so a config
/// file only needs to list what it overrides.
///
/// # Example
///
/// ```
/// use varflow_optflow::FlowParams;
///
/// let params = FlowParams::default().with_alpha(0.02).with_outer_iterations(5);
/// assert!(params.validate().is_ok());
/// assert_eq!(params.ratio, 0.75);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowParams {
    /// Weight of the smoothness term, must be positive.
    pub alpha: f32,
    /// Downsampling factor between pyramid levels, in `(0, 1)`.
    pub ratio: f32,
    /// Smallest width or height a coarser pyramid level may have.
    pub min_width: usize,
    /// Number of warping (linearisation) iterations per level.
    pub outer_iterations: usize,
    /// Number of robust reweighting iterations per warp.
    pub inner_iterations: usize,
    /// Number of conjugate gradient iterations per linear solve.
    pub cg_iterations: usize,
    /// Penalty applied to the brightness constancy residual.
    pub data_penalty: Penalty,
    /// Penalty applied to the squared flow gradient magnitude.
    pub smoothness_penalty: Penalty,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            ratio: 0.75,
            min_width: 30,
            outer_iterations: 15,
            inner_iterations: 1,
            cg_iterations: 40,
            data_penalty: Penalty::default(),
            smoothness_penalty: Penalty::default(),
        }
    }
}

impl FlowParams {
    /// Set the smoothness weight.
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the pyramid downsampling ratio.
    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    /// Set the minimum pyramid level width.
    pub fn with_min_width(mut self, min_width: usize) -> Self {
        self.min_width = min_width;
        self
    }

    /// Set the number of outer fixed-point iterations.
    pub fn with_outer_iterations(mut self, iterations: usize) -> Self {
        self.outer_iterations = iterations;
        self
    }

    /// Set the number of inner fixed-point iterations.
    pub fn with_inner_iterations(mut self, iterations: usize) -> Self {
        self.inner_iterations = iterations;
        self
    }

    /// Set the number of conjugate gradient iterations.
    pub fn with_cg_iterations(mut self, iterations: usize) -> Self {
        self.cg_iterations = iterations;
        self
    }

    /// Set the data term penalty.
    pub fn with_data_penalty(mut self, penalty: Penalty) -> Self {
        self.data_penalty = penalty;
        self
    }

    /// Set the smoothness term penalty.
    pub fn with_smoothness_penalty(mut self, penalty: Penalty) -> Self {
        self.smoothness_penalty = penalty;
        self
    }

    /// Check that every parameter is in its valid range.
    ///
    /// Iteration counts may be zero, which disables the corresponding stage.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::InvalidParameter`] naming the first bad field.
    pub fn validate(&self) -> Result<(), FlowError> {
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(FlowError::InvalidParameter {
                name: "alpha",
                reason: format!("must be positive and finite, got {}", self.alpha),
            });
        }

        if !(self.ratio > 0.0 && self.ratio < 1.0) {
            return Err(FlowError::InvalidParameter {
                name: "ratio",
                reason: format!("must be in (0, 1), got {}", self.ratio),
            });
        }

        if self.min_width == 0 {
            return Err(FlowError::InvalidParameter {
                name: "min_width",
                reason: "must be positive".to_string(),
            });
        }

        self.data_penalty
            .check()
            .map_err(|reason| FlowError::InvalidParameter {
                name: "data_penalty",
                reason,
            })?;

        self.smoothness_penalty
            .check()
            .map_err(|reason| FlowError::InvalidParameter {
                name: "smoothness_penalty",
                reason,
            })?;

        Ok(())
    }
}
