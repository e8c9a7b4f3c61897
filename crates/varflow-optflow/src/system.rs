//! Reweighted linear system of the flow increment.
//!
//! Unknowns are stored interleaved, `[du0, dv0, du1, dv1, ...]` in row-major
//! pixel order. The system couples every pixel to its 4-neighbours through the
//! smoothness term and is never materialised: [`FlowSystem`] only knows how to
//! multiply a vector.

use rayon::prelude::*;
use varflow_image::{Image, ImageSize};
use varflow_imgproc::parallel::par_iter_rows_indexed;

use crate::error::FlowError;
use crate::flow::FlowField;
use crate::linearize::Derivatives;
use crate::penalty::RobustPenalty;

/// A symmetric linear operator given by its matrix-vector product.
pub trait LinearOperator: Sync {
    /// Number of unknowns.
    fn len(&self) -> usize;

    /// Whether the operator has no unknowns.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compute `out = A * x`.
    fn apply(&self, x: &[f32], out: &mut [f32]);
}

fn check_size(expected: ImageSize, got: ImageSize, what: &str) -> Result<(), FlowError> {
    if expected != got {
        return Err(FlowError::InvalidInput(format!(
            "{what} has size {got}, expected {expected}"
        )));
    }
    Ok(())
}

/// Robust data weights `psi'((it + ix du + iy dv)^2)`, one per channel.
pub fn data_weights<const C: usize>(
    derivs: &Derivatives<C>,
    du: &Image<f32, 1>,
    dv: &Image<f32, 1>,
    penalty: &impl RobustPenalty,
) -> Result<Image<f32, C>, FlowError> {
    let size = derivs.it.size();
    check_size(size, du.size(), "du")?;
    check_size(size, dv.size(), "dv")?;

    let cols = size.width;
    let (ix, iy, it) = (
        derivs.ix.as_slice(),
        derivs.iy.as_slice(),
        derivs.it.as_slice(),
    );
    let (du, dv) = (du.as_slice(), dv.as_slice());

    let mut weights = Image::from_size_val(size, 0.0)?;
    par_iter_rows_indexed(&mut weights, |x, y, w| {
        let p = y * cols + x;
        for (c, w_c) in w.iter_mut().enumerate() {
            let i = p * C + c;
            let r = it[i] + ix[i] * du[p] + iy[i] * dv[p];
            *w_c = penalty.weight(r * r);
        }
    });

    Ok(weights)
}

/// Squared flow gradient magnitude by forward differences.
///
/// The difference across the last column or row is zero.
pub(crate) fn gradient_norm_sq(u: &Image<f32, 1>, v: &Image<f32, 1>, x: usize, y: usize) -> f32 {
    let (cols, rows) = (u.cols(), u.rows());
    let (u, v) = (u.as_slice(), v.as_slice());
    let p = y * cols + x;

    let (ux, vx) = if x + 1 < cols {
        (u[p + 1] - u[p], v[p + 1] - v[p])
    } else {
        (0.0, 0.0)
    };
    let (uy, vy) = if y + 1 < rows {
        (u[p + cols] - u[p], v[p + cols] - v[p])
    } else {
        (0.0, 0.0)
    };

    ux * ux + uy * uy + vx * vx + vy * vy
}

/// Robust smoothness weights `phi'(|grad u|^2 + |grad v|^2)` of the total flow.
pub fn smoothness_weights(
    u: &Image<f32, 1>,
    v: &Image<f32, 1>,
    penalty: &impl RobustPenalty,
) -> Result<Image<f32, 1>, FlowError> {
    check_size(u.size(), v.size(), "v")?;

    let mut weights = Image::from_size_val(u.size(), 0.0)?;
    par_iter_rows_indexed(&mut weights, |x, y, w| {
        w[0] = penalty.weight(gradient_norm_sq(u, v, x, y));
    });

    Ok(weights)
}

/// The linear system `A [du, dv] = b` of one inner iteration.
///
/// `A = D + alpha * L` where `D` holds the per-pixel 2x2 data blocks summed
/// over channels and `L` is the weighted graph Laplacian of the pixel grid.
/// The edge between a pixel and its right or lower neighbour has the
/// smoothness weight of the pixel itself.
#[derive(Debug, Clone)]
pub struct FlowSystem {
    size: ImageSize,
    alpha: f32,
    /// `[a11, a12, a22]` per pixel.
    data: Vec<[f32; 3]>,
    smoothness: Vec<f32>,
    rhs: Vec<f32>,
}

impl FlowSystem {
    /// Assemble the system around the current flow.
    ///
    /// # Arguments
    ///
    /// * `derivs` - Derivatives of the data term at the current flow.
    /// * `data_weights` - Output of [`data_weights`].
    /// * `smoothness_weights` - Output of [`smoothness_weights`].
    /// * `flow` - The flow the increment is added to.
    /// * `alpha` - Weight of the smoothness term.
    pub fn assemble<const C: usize>(
        derivs: &Derivatives<C>,
        data_weights: &Image<f32, C>,
        smoothness_weights: &Image<f32, 1>,
        flow: &FlowField,
        alpha: f32,
    ) -> Result<Self, FlowError> {
        let size = derivs.it.size();
        check_size(size, data_weights.size(), "data weights")?;
        check_size(size, smoothness_weights.size(), "smoothness weights")?;
        check_size(size, flow.size(), "flow")?;

        let (ix, iy, it) = (
            derivs.ix.as_slice(),
            derivs.iy.as_slice(),
            derivs.it.as_slice(),
        );
        let psi = data_weights.as_slice();

        let mut data = vec![[0.0f32; 3]; size.num_pixels()];
        let mut rhs = vec![0.0f32; 2 * size.num_pixels()];

        data.par_iter_mut()
            .zip(rhs.par_chunks_exact_mut(2))
            .enumerate()
            .for_each(|(p, (block, b))| {
                let mut acc = [0.0f32; 5];
                for c in 0..C {
                    let i = p * C + c;
                    let w = psi[i];
                    acc[0] += w * ix[i] * ix[i];
                    acc[1] += w * ix[i] * iy[i];
                    acc[2] += w * iy[i] * iy[i];
                    acc[3] += w * ix[i] * it[i];
                    acc[4] += w * iy[i] * it[i];
                }
                *block = [acc[0], acc[1], acc[2]];
                b[0] = -acc[3];
                b[1] = -acc[4];
            });

        let mut system = Self {
            size,
            alpha,
            data,
            smoothness: smoothness_weights.as_slice().to_vec(),
            rhs,
        };

        // b -= alpha * L [u, v]
        let current = flow.to_interleaved();
        let mut laplacian = vec![0.0f32; current.len()];
        system.apply_laplacian(&current, &mut laplacian);
        system
            .rhs
            .par_iter_mut()
            .zip(laplacian.par_iter())
            .for_each(|(b, l)| *b -= alpha * l);

        Ok(system)
    }

    /// Size of the pixel grid.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Right-hand side `b`.
    pub fn rhs(&self) -> &[f32] {
        &self.rhs
    }

    /// Weighted Laplacian term of row `y`, written into `out_row`.
    fn laplacian_row(&self, x: &[f32], out_row: &mut [f32], y: usize) {
        let (cols, rows) = (self.size.width, self.size.height);
        let w = &self.smoothness;

        for (c, out) in out_row.chunks_exact_mut(2).enumerate() {
            let p = y * cols + c;
            let (xu, xv) = (x[2 * p], x[2 * p + 1]);
            let mut acc = [0.0f32; 2];

            let mut edge = |q: usize, weight: f32| {
                acc[0] += weight * (xu - x[2 * q]);
                acc[1] += weight * (xv - x[2 * q + 1]);
            };

            if c + 1 < cols {
                edge(p + 1, w[p]);
            }
            if c > 0 {
                edge(p - 1, w[p - 1]);
            }
            if y + 1 < rows {
                edge(p + cols, w[p]);
            }
            if y > 0 {
                edge(p - cols, w[p - cols]);
            }

            out[0] = acc[0];
            out[1] = acc[1];
        }
    }

    fn apply_laplacian(&self, x: &[f32], out: &mut [f32]) {
        let stride = 2 * self.size.width;
        if stride == 0 {
            return;
        }
        out.par_chunks_exact_mut(stride)
            .enumerate()
            .for_each(|(y, out_row)| self.laplacian_row(x, out_row, y));
    }
}

impl LinearOperator for FlowSystem {
    fn len(&self) -> usize {
        self.rhs.len()
    }

    fn apply(&self, x: &[f32], out: &mut [f32]) {
        let stride = 2 * self.size.width;
        if stride == 0 {
            return;
        }
        out.par_chunks_exact_mut(stride)
            .enumerate()
            .for_each(|(y, out_row)| {
                self.laplacian_row(x, out_row, y);
                for (c, out) in out_row.chunks_exact_mut(2).enumerate() {
                    let p = y * self.size.width + c;
                    let [a11, a12, a22] = self.data[p];
                    let (xu, xv) = (x[2 * p], x[2 * p + 1]);
                    out[0] = a11 * xu + a12 * xv + self.alpha * out[0];
                    out[1] = a12 * xu + a22 * xv + self.alpha * out[1];
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::penalty::{Charbonnier, Quadratic};
    use approx::assert_relative_eq;

    fn derivs_from_fn(
        size: ImageSize,
        f: impl Fn(usize, usize) -> (f32, f32, f32),
    ) -> Result<Derivatives<1>, FlowError> {
        Ok(Derivatives {
            ix: Image::from_fn(size, |x, y, _| f(x, y).0)?,
            iy: Image::from_fn(size, |x, y, _| f(x, y).1)?,
            it: Image::from_fn(size, |x, y, _| f(x, y).2)?,
        })
    }

    fn dense_matrix(op: &impl LinearOperator) -> Vec<Vec<f32>> {
        let n = op.len();
        (0..n)
            .map(|j| {
                let mut e = vec![0.0; n];
                e[j] = 1.0;
                let mut col = vec![0.0; n];
                op.apply(&e, &mut col);
                col
            })
            .collect()
    }

    #[test]
    fn test_data_weights_are_pure() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 3,
            height: 2,
        };
        let derivs = derivs_from_fn(size, |x, y| (1.0, 0.5, x as f32 - y as f32))?;
        let du = Image::<f32, 1>::from_size_val(size, 1.0)?;
        let dv = Image::<f32, 1>::from_size_val(size, -2.0)?;

        let w = data_weights(&derivs, &du, &dv, &Quadratic)?;
        assert!(w.as_slice().iter().all(|&v| v == 1.0));

        let penalty = Charbonnier { epsilon: 1e-3 };
        let w1 = data_weights(&derivs, &du, &dv, &penalty)?;
        let w2 = data_weights(&derivs, &du, &dv, &penalty)?;
        assert_eq!(w1, w2);
        // residual at (0, 0) is 0 + 1 - 1 = 0, the weight saturates
        assert_relative_eq!(*w1.get_pixel(0, 0, 0)?, 500.0, epsilon = 1e-2);
        // residual at (2, 0) is 2, weight 1 / (2 * 2)
        assert_relative_eq!(*w1.get_pixel(2, 0, 0)?, 0.25, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn test_smoothness_weights_forward_differences() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 3,
            height: 3,
        };
        let u = Image::<f32, 1>::from_fn(size, |x, _, _| x as f32)?;
        let v = Image::<f32, 1>::from_size_val(size, 0.0)?;
        let w = smoothness_weights(&u, &v, &Charbonnier { epsilon: 1e-3 })?;

        // unit gradient inside, zero on the last column
        assert_relative_eq!(*w.get_pixel(0, 1, 0)?, 0.5, epsilon = 1e-4);
        assert_relative_eq!(*w.get_pixel(2, 1, 0)?, 500.0, epsilon = 1e-2);
        Ok(())
    }

    #[test]
    fn test_operator_is_symmetric() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 4,
            height: 3,
        };
        let derivs = derivs_from_fn(size, |x, y| {
            (0.1 * x as f32, 0.2 - 0.05 * y as f32, 0.01 * (x * y) as f32)
        })?;
        let psi = Image::<f32, 1>::from_fn(size, |x, y, _| 1.0 + (x + y) as f32)?;
        let phi = Image::<f32, 1>::from_fn(size, |x, y, _| 0.5 + 0.1 * (x * 3 + y) as f32)?;
        let flow = FlowField::zeros(size)?;

        let system = FlowSystem::assemble(&derivs, &psi, &phi, &flow, 0.3)?;
        assert_eq!(system.len(), 24);

        let a = dense_matrix(&system);
        for i in 0..a.len() {
            for j in 0..a.len() {
                assert_relative_eq!(a[i][j], a[j][i], epsilon = 1e-6);
            }
            assert!(a[i][i] > 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_rhs_without_smoothness_contribution() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 2,
            height: 2,
        };
        let derivs = derivs_from_fn(size, |_, _| (2.0, 1.0, 0.5))?;
        let psi = Image::<f32, 1>::from_size_val(size, 1.0)?;
        let phi = Image::<f32, 1>::from_size_val(size, 1.0)?;
        let flow = FlowField::zeros(size)?;

        let system = FlowSystem::assemble(&derivs, &psi, &phi, &flow, 1.0)?;
        for b in system.rhs().chunks_exact(2) {
            assert_relative_eq!(b[0], -1.0);
            assert_relative_eq!(b[1], -0.5);
        }

        // a constant increment is not penalised by the smoothness term
        let x = [1.0, 0.0].repeat(4);
        let mut out = vec![0.0; 8];
        system.apply(&x, &mut out);
        for o in out.chunks_exact(2) {
            assert_relative_eq!(o[0], 4.0);
            assert_relative_eq!(o[1], 2.0);
        }
        Ok(())
    }

    #[test]
    fn test_rhs_includes_current_flow_laplacian() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 3,
            height: 1,
        };
        let derivs = derivs_from_fn(size, |_, _| (0.0, 0.0, 0.0))?;
        let psi = Image::<f32, 1>::from_size_val(size, 1.0)?;
        let phi = Image::<f32, 1>::from_size_val(size, 1.0)?;
        let u = Image::<f32, 1>::new(size, vec![0.0, 1.0, 0.0])?;
        let v = Image::<f32, 1>::from_size_val(size, 0.0)?;
        let flow = FlowField::new(u, v)?;

        let system = FlowSystem::assemble(&derivs, &psi, &phi, &flow, 2.0)?;
        // L u = [-1, 2, -1]
        let expected_u = [2.0, -4.0, 2.0];
        for (b, e) in system.rhs().chunks_exact(2).zip(expected_u) {
            assert_relative_eq!(b[0], e);
            assert_relative_eq!(b[1], 0.0);
        }
        Ok(())
    }
}
