use varflow_image::ImageError;

/// An error type for the optical flow module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FlowError {
    /// Error when the input images or flow fields are inconsistent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error when a solver parameter is out of its valid range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// What is wrong with its value.
        reason: String,
    },

    /// Error when the linear solve produced non-finite values.
    #[error("Non-finite flow increment at level {level}, outer iteration {iteration}")]
    NumericalFailure {
        /// Pyramid level, 0 being the finest.
        level: usize,
        /// Outer fixed-point iteration within that level.
        iteration: usize,
    },

    /// Error raised by an image operation.
    #[error(transparent)]
    Image(#[from] ImageError),
}
