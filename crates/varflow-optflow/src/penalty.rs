//! Robust penalty functions for the data and smoothness terms.

use serde::{Deserialize, Serialize};

/// A penalty `psi(s)` applied to a squared residual `s`.
///
/// The solver only needs the value for energy evaluation and the derivative
/// `psi'(s)` as the reweighting factor of the linearised system.
pub trait RobustPenalty: Send + Sync {
    /// Penalty of a squared residual.
    fn value(&self, squared_norm: f32) -> f32;

    /// Derivative of the penalty with respect to the squared residual.
    fn weight(&self, squared_norm: f32) -> f32;
}

/// Charbonnier penalty `sqrt(s + eps^2)`, a differentiable L1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Charbonnier {
    /// Smoothing constant, bounds the weight by `1 / (2 eps)`.
    pub epsilon: f32,
}

impl RobustPenalty for Charbonnier {
    fn value(&self, squared_norm: f32) -> f32 {
        (squared_norm + self.epsilon * self.epsilon).sqrt()
    }

    fn weight(&self, squared_norm: f32) -> f32 {
        0.5 / (squared_norm + self.epsilon * self.epsilon).sqrt()
    }
}

/// Plain sum of squares: weight always 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadratic;

impl RobustPenalty for Quadratic {
    fn value(&self, squared_norm: f32) -> f32 {
        squared_norm
    }

    fn weight(&self, _squared_norm: f32) -> f32 {
        1.0
    }
}

/// Serializable choice of penalty, as stored in [`crate::FlowParams`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Penalty {
    /// See [`Charbonnier`].
    Charbonnier {
        /// Smoothing constant.
        epsilon: f32,
    },
    /// See [`Quadratic`].
    Quadratic,
}

impl Default for Penalty {
    fn default() -> Self {
        Penalty::Charbonnier { epsilon: 1e-3 }
    }
}

impl Penalty {
    pub(crate) fn check(&self) -> Result<(), String> {
        match *self {
            Penalty::Charbonnier { epsilon } if !(epsilon.is_finite() && epsilon > 0.0) => Err(
                format!("charbonnier epsilon must be positive and finite, got {epsilon}"),
            ),
            _ => Ok(()),
        }
    }
}

impl RobustPenalty for Penalty {
    #[inline]
    fn value(&self, squared_norm: f32) -> f32 {
        match *self {
            Penalty::Charbonnier { epsilon } => Charbonnier { epsilon }.value(squared_norm),
            Penalty::Quadratic => Quadratic.value(squared_norm),
        }
    }

    #[inline]
    fn weight(&self, squared_norm: f32) -> f32 {
        match *self {
            Penalty::Charbonnier { epsilon } => Charbonnier { epsilon }.weight(squared_norm),
            Penalty::Quadratic => Quadratic.weight(squared_norm),
        }
    }
}
