use varflow_image::Image;
use varflow_imgproc::{
    parallel::par_chunked_sum,
    warp::{flow_inside_mask, warp_flow},
};

use crate::cg::conjugate_gradient;
use crate::error::FlowError;
use crate::flow::FlowField;
use crate::linearize::linearize;
use crate::params::FlowParams;
use crate::penalty::RobustPenalty;
use crate::system::{data_weights, gradient_norm_sq, smoothness_weights, FlowSystem};

fn check_level_inputs<const C: usize>(
    image1: &Image<f32, C>,
    image2: &Image<f32, C>,
    flow: &FlowField,
) -> Result<(), FlowError> {
    if image1.size() != image2.size() || image1.size() != flow.size() {
        return Err(FlowError::InvalidInput(format!(
            "level inputs differ in size: image1 {}, image2 {}, flow {}",
            image1.size(),
            image2.size(),
            flow.size()
        )));
    }
    Ok(())
}

/// Refine a flow field at a single pyramid level.
///
/// Each outer iteration linearises the data term around the current flow and
/// solves for an increment. Each inner iteration recomputes the robust
/// weights from the current increment, assembles the reweighted system and
/// runs the conjugate gradient warm-started from the previous increment. The
/// increment is added to the flow at the end of the outer iteration.
///
/// # Arguments
///
/// * `image1` - The reference image at this level.
/// * `image2` - The image warped towards `image1`.
/// * `init` - The initial flow, same size as the images.
/// * `params` - Solver parameters.
/// * `level` - Index of the level, only used in logs and errors.
///
/// # Errors
///
/// [`FlowError::NumericalFailure`] if the solve produced a non-finite value.
pub fn refine_level<const C: usize>(
    image1: &Image<f32, C>,
    image2: &Image<f32, C>,
    init: &FlowField,
    params: &FlowParams,
    level: usize,
) -> Result<FlowField, FlowError> {
    check_level_inputs(image1, image2, init)?;

    let size = image1.size();
    let mut flow = init.clone();

    for iteration in 0..params.outer_iterations {
        let derivs = linearize(image1, image2, &flow)?;
        let mut increment = vec![0.0f32; 2 * size.num_pixels()];

        for _ in 0..params.inner_iterations {
            let delta = FlowField::from_interleaved(size, &increment)?;
            let psi = data_weights(&derivs, delta.u(), delta.v(), &params.data_penalty)?;

            let total = flow.add(&delta)?;
            let phi = smoothness_weights(total.u(), total.v(), &params.smoothness_penalty)?;

            let system = FlowSystem::assemble(&derivs, &psi, &phi, &flow, params.alpha)?;
            let report = conjugate_gradient(
                &system,
                system.rhs(),
                &mut increment,
                params.cg_iterations,
            );

            if !report.residual_norm_sq.is_finite() {
                return Err(FlowError::NumericalFailure { level, iteration });
            }
        }

        if increment.iter().any(|d| !d.is_finite()) {
            return Err(FlowError::NumericalFailure { level, iteration });
        }

        flow = flow.add(&FlowField::from_interleaved(size, &increment)?)?;

        if log::log_enabled!(log::Level::Debug) {
            let energy = flow_energy(image1, image2, &flow, params)?;
            log::debug!("level {level} iteration {iteration}: energy {energy:.6}");
        }
    }

    Ok(flow)
}

/// Evaluate the robust energy of a flow field without linearisation.
///
/// `E = sum psi(|I2(x + w) - I1(x)|^2) + alpha * sum phi(|grad u|^2 + |grad v|^2)`,
/// where the data sum runs over channels and skips pixels whose displaced
/// position falls outside the image.
pub fn flow_energy<const C: usize>(
    image1: &Image<f32, C>,
    image2: &Image<f32, C>,
    flow: &FlowField,
    params: &FlowParams,
) -> Result<f32, FlowError> {
    check_level_inputs(image1, image2, flow)?;

    let size = image1.size();
    let mut warped = Image::from_size_val(size, 0.0)?;
    warp_flow(image2, flow.u(), flow.v(), &mut warped)?;

    let mut mask = Image::<f32, 1>::from_size_val(size, 0.0)?;
    flow_inside_mask(flow.u(), flow.v(), &mut mask)?;

    let (i1, i2, m) = (image1.as_slice(), warped.as_slice(), mask.as_slice());
    let data = par_chunked_sum(size.num_pixels(), |range| {
        range
            .filter(|&p| m[p] != 0.0)
            .map(|p| {
                (0..C)
                    .map(|c| {
                        let r = i2[p * C + c] - i1[p * C + c];
                        params.data_penalty.value(r * r)
                    })
                    .sum::<f32>()
            })
            .sum()
    });

    let cols = size.width;
    let smoothness = par_chunked_sum(size.num_pixels(), |range| {
        range
            .map(|p| {
                let norm = gradient_norm_sq(flow.u(), flow.v(), p % cols, p / cols);
                params.smoothness_penalty.value(norm)
            })
            .sum()
    });

    Ok(data + params.alpha * smoothness)
}
