use rayon::prelude::*;
use varflow_imgproc::parallel::par_chunked_sum;

use crate::system::LinearOperator;

/// Outcome of a [`conjugate_gradient`] run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CgReport {
    /// Iterations actually performed.
    pub iterations: usize,
    /// Squared norm of the final residual `b - A x`.
    pub residual_norm_sq: f32,
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    par_chunked_sum(a.len(), |range| {
        a[range.clone()]
            .iter()
            .zip(&b[range])
            .map(|(x, y)| x * y)
            .sum()
    })
}

/// Solve `A x = b` with a fixed budget of conjugate gradient iterations.
///
/// `x` holds the initial guess on entry and the estimate on return. The loop
/// runs `iterations` times unless the residual vanishes exactly or the search
/// direction has non-positive curvature.
///
/// # Arguments
///
/// * `op` - Symmetric positive semi-definite operator.
/// * `b` - Right-hand side, of length `op.len()`.
/// * `x` - Initial guess and solution, of length `op.len()`.
/// * `iterations` - Maximum number of iterations.
pub fn conjugate_gradient(
    op: &impl LinearOperator,
    b: &[f32],
    x: &mut [f32],
    iterations: usize,
) -> CgReport {
    let n = op.len();
    debug_assert_eq!(b.len(), n);
    debug_assert_eq!(x.len(), n);

    // r = b - A x
    let mut r = vec![0.0f32; n];
    op.apply(x, &mut r);
    r.par_iter_mut()
        .zip(b.par_iter())
        .for_each(|(r, b)| *r = b - *r);

    let mut p = r.clone();
    let mut ap = vec![0.0f32; n];
    let mut rr = dot(&r, &r);
    let mut performed = 0;

    for k in 0..iterations {
        if rr == 0.0 {
            break;
        }

        op.apply(&p, &mut ap);
        let pap = dot(&p, &ap);
        if pap.is_nan() || pap <= 0.0 {
            log::trace!("cg stopped at iteration {k}: curvature {pap}");
            break;
        }

        let step = rr / pap;
        x.par_iter_mut()
            .zip(p.par_iter())
            .for_each(|(x, p)| *x += step * p);
        r.par_iter_mut()
            .zip(ap.par_iter())
            .for_each(|(r, ap)| *r -= step * ap);

        let rr_next = dot(&r, &r);
        let beta = rr_next / rr;
        p.par_iter_mut()
            .zip(r.par_iter())
            .for_each(|(p, r)| *p = r + beta * *p);

        rr = rr_next;
        performed += 1;
    }

    log::trace!("cg: {performed} iterations, residual {rr:e}");

    CgReport {
        iterations: performed,
        residual_norm_sq: rr,
    }
}
