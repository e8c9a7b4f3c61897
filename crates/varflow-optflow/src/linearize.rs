//! Linearisation of the brightness constancy term around the current flow.

use rayon::prelude::*;
use varflow_image::{ops, Image};
use varflow_imgproc::{
    filter::{presmooth, spatial_gradient},
    warp::{flow_inside_mask, warp_flow},
};

use crate::error::FlowError;
use crate::flow::FlowField;

/// Weight of the reference image in the blend the spatial derivatives are taken on.
const GRADIENT_BLEND: f32 = 0.4;

/// Image derivatives of the data term at one linearisation point.
///
/// For an increment `(du, dv)` the brightness residual of channel `c` is
/// approximated by `it + ix * du + iy * dv`.
#[derive(Debug, Clone)]
pub struct Derivatives<const C: usize> {
    /// Horizontal derivative.
    pub ix: Image<f32, C>,
    /// Vertical derivative.
    pub iy: Image<f32, C>,
    /// Temporal difference between the warped second image and the first.
    pub it: Image<f32, C>,
}

/// Warp `image2` by `flow` and compute the derivatives of the data term.
///
/// Both images are presmoothed, the spatial derivatives are taken on
/// `0.4 * image1 + 0.6 * warped` and the temporal one is `warped - image1`.
/// Pixels whose sample position falls outside `image2` carry no data
/// constraint: all three derivatives are zero there.
pub fn linearize<const C: usize>(
    image1: &Image<f32, C>,
    image2: &Image<f32, C>,
    flow: &FlowField,
) -> Result<Derivatives<C>, FlowError> {
    let size = image1.size();

    let mut warped = Image::from_size_val(size, 0.0)?;
    warp_flow(image2, flow.u(), flow.v(), &mut warped)?;

    let mut mask = Image::<f32, 1>::from_size_val(size, 0.0)?;
    flow_inside_mask(flow.u(), flow.v(), &mut mask)?;

    let mut smooth1 = Image::from_size_val(size, 0.0)?;
    let mut smooth2 = Image::from_size_val(size, 0.0)?;
    presmooth(image1, &mut smooth1)?;
    presmooth(&warped, &mut smooth2)?;

    // blend = 0.6 * smooth2 + 0.4 * smooth1
    let mut scaled2 = Image::from_size_val(size, 0.0)?;
    let mut blend = Image::from_size_val(size, 0.0)?;
    ops::scale(&smooth2, 1.0 - GRADIENT_BLEND, &mut scaled2)?;
    ops::add_scaled(&scaled2, &smooth1, GRADIENT_BLEND, &mut blend)?;

    let mut ix = Image::from_size_val(size, 0.0)?;
    let mut iy = Image::from_size_val(size, 0.0)?;
    spatial_gradient(&blend, &mut ix, &mut iy)?;

    let mut it = Image::from_size_val(size, 0.0)?;
    ops::sub(&smooth2, &smooth1, &mut it)?;

    for derivative in [&mut ix, &mut iy, &mut it] {
        apply_mask(derivative, &mask);
    }

    Ok(Derivatives { ix, iy, it })
}

fn apply_mask<const C: usize>(image: &mut Image<f32, C>, mask: &Image<f32, 1>) {
    image
        .as_slice_mut()
        .par_chunks_exact_mut(C)
        .zip(mask.as_slice().par_iter())
        .for_each(|(pixel, &m)| {
            if m == 0.0 {
                pixel.fill(0.0);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use varflow_image::ImageSize;

    #[test]
    fn test_identical_images_have_no_temporal_term() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 12,
            height: 10,
        };
        let image = Image::<f32, 3>::from_fn(size, |x, y, c| (x * x + y + c) as f32 * 0.01)?;
        let flow = FlowField::zeros(size)?;

        let d = linearize(&image, &image, &flow)?;
        assert!(d.it.as_slice().iter().all(|&v| v == 0.0));
        assert!(d.ix.as_slice().iter().any(|&v| v > 0.0));
        Ok(())
    }

    #[test]
    fn test_ramp_derivatives() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 16,
            height: 16,
        };
        // image2 is image1 moved one pixel to the right
        let image1 = Image::<f32, 1>::from_fn(size, |x, _, _| 0.1 * x as f32)?;
        let image2 = Image::<f32, 1>::from_fn(size, |x, _, _| 0.1 * x as f32 - 0.1)?;
        let flow = FlowField::zeros(size)?;

        let d = linearize(&image1, &image2, &flow)?;
        for y in 4..12 {
            for x in 4..12 {
                assert_relative_eq!(*d.ix.get_pixel(x, y, 0)?, 0.1, epsilon = 1e-4);
                assert_relative_eq!(*d.iy.get_pixel(x, y, 0)?, 0.0, epsilon = 1e-4);
                assert_relative_eq!(*d.it.get_pixel(x, y, 0)?, -0.1, epsilon = 1e-4);
            }
        }
        Ok(())
    }

    #[test]
    fn test_out_of_bounds_samples_are_masked() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 8,
            height: 6,
        };
        let image1 = Image::<f32, 1>::from_fn(size, |x, y, _| (x + 3 * y) as f32)?;
        let image2 = Image::<f32, 1>::from_fn(size, |x, y, _| (2 * x + y) as f32)?;
        let u = Image::<f32, 1>::from_size_val(size, 2.5)?;
        let v = Image::<f32, 1>::from_size_val(size, 0.0)?;
        let flow = FlowField::new(u, v)?;

        let d = linearize(&image1, &image2, &flow)?;
        for y in 0..size.height {
            for x in 0..size.width {
                if x as f32 + 2.5 > (size.width - 1) as f32 {
                    assert_eq!(*d.it.get_pixel(x, y, 0)?, 0.0);
                    assert_eq!(*d.ix.get_pixel(x, y, 0)?, 0.0);
                    assert_eq!(*d.iy.get_pixel(x, y, 0)?, 0.0);
                }
            }
        }
        assert!(d.it.get_pixel(0, 0, 0)?.abs() > 0.0);
        Ok(())
    }
}
