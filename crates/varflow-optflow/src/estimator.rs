use varflow_image::Image;
use varflow_imgproc::warp::warp_flow;

use crate::error::FlowError;
use crate::flow::FlowField;
use crate::level::refine_level;
use crate::params::FlowParams;
use crate::pyramid::FlowPyramid;

/// Result of a flow estimation.
#[derive(Debug, Clone)]
pub struct FlowOutput<const C: usize> {
    /// Flow from the first image to the second, at full resolution.
    pub flow: FlowField,
    /// The second image warped by `flow`, aligned with the first image.
    pub warped: Image<f32, C>,
}

/// Coarse-to-fine variational optical flow estimator.
///
/// # Example
///
/// ```
/// use varflow_image::Image;
/// use varflow_optflow::{FlowEstimator, FlowParams};
///
/// let image = Image::<f32, 1>::from_fn([40, 32].into(), |x, y, _| {
///     ((x as f32 / 4.0).sin() * (y as f32 / 5.0).cos()) * 0.5 + 0.5
/// })
/// .unwrap();
///
/// let estimator = FlowEstimator::new(FlowParams::default()).unwrap();
/// let output = estimator.estimate(&image, &image).unwrap();
/// assert!(output.flow.max_magnitude() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct FlowEstimator {
    params: FlowParams,
}

impl FlowEstimator {
    /// Create an estimator after validating its parameters.
    pub fn new(params: FlowParams) -> Result<Self, FlowError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The parameters in use.
    pub fn params(&self) -> &FlowParams {
        &self.params
    }

    /// Estimate the flow from `image1` to `image2`.
    ///
    /// The flow starts at zero on the coarsest pyramid level. Each level
    /// refines the flow inherited from the level below, upsampled to its
    /// resolution. The second image is finally warped by the full resolution
    /// flow.
    ///
    /// # Errors
    ///
    /// [`FlowError::InvalidInput`] if the images differ in size or are empty,
    /// [`FlowError::NumericalFailure`] if a level solve diverged.
    pub fn estimate<const C: usize>(
        &self,
        image1: &Image<f32, C>,
        image2: &Image<f32, C>,
    ) -> Result<FlowOutput<C>, FlowError> {
        if image1.size() != image2.size() {
            return Err(FlowError::InvalidInput(format!(
                "image sizes differ: {} vs {}",
                image1.size(),
                image2.size()
            )));
        }

        if image1.is_empty() {
            return Err(FlowError::InvalidInput(format!(
                "cannot estimate flow on an empty image ({})",
                image1.size()
            )));
        }

        let params = &self.params;
        let pyramid = FlowPyramid::build(image1, image2, params.ratio, params.min_width)?;

        log::debug!(
            "estimating flow on {} with {} pyramid levels",
            image1.size(),
            pyramid.num_levels()
        );

        let mut flow = FlowField::zeros(pyramid.coarsest().size())?;

        for (index, level) in pyramid.iter_coarse_to_fine() {
            if flow.size() != level.size() {
                flow = flow.upsample(level.size())?;
            }

            let now = std::time::Instant::now();
            flow = refine_level(level.image1(), level.image2(), &flow, params, index)?;

            log::debug!(
                "level {index} ({}) done in {:?}, max displacement {:.3}",
                level.size(),
                now.elapsed(),
                flow.max_magnitude()
            );
        }

        let warped = warp(image2, flow.u(), flow.v())?;

        Ok(FlowOutput { flow, warped })
    }
}

/// Estimate the optical flow between two images.
///
/// Shorthand for [`FlowEstimator::new`] followed by [`FlowEstimator::estimate`].
pub fn estimate<const C: usize>(
    image1: &Image<f32, C>,
    image2: &Image<f32, C>,
    params: &FlowParams,
) -> Result<FlowOutput<C>, FlowError> {
    FlowEstimator::new(params.clone())?.estimate(image1, image2)
}

/// Warp an image by an existing flow field.
///
/// # Errors
///
/// [`FlowError::InvalidInput`] if either flow component does not match the
/// image size.
///
/// # Example
///
/// ```
/// use varflow_image::Image;
/// use varflow_optflow::warp;
///
/// let image = Image::<f32, 1>::new([3, 1].into(), vec![1.0, 2.0, 3.0]).unwrap();
/// let u = Image::<f32, 1>::from_size_val(image.size(), -1.0).unwrap();
/// let v = Image::<f32, 1>::from_size_val(image.size(), 0.0).unwrap();
///
/// let warped = warp(&image, &u, &v).unwrap();
/// assert_eq!(warped.as_slice(), &[1.0, 1.0, 2.0]);
/// ```
pub fn warp<const C: usize>(
    image: &Image<f32, C>,
    flow_u: &Image<f32, 1>,
    flow_v: &Image<f32, 1>,
) -> Result<Image<f32, C>, FlowError> {
    for (name, flow) in [("flow_u", flow_u), ("flow_v", flow_v)] {
        if flow.size() != image.size() {
            return Err(FlowError::InvalidInput(format!(
                "{name} has size {}, image has size {}",
                flow.size(),
                image.size()
            )));
        }
    }

    let mut warped = Image::from_size_val(image.size(), 0.0)?;
    warp_flow(image, flow_u, flow_v, &mut warped)?;
    Ok(warped)
}
