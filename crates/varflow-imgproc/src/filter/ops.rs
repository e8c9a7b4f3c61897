use varflow_image::{Image, ImageError};

use crate::parallel::par_iter_rows_indexed;

use super::{kernels, separable_filter};

/// Blur an image using a gaussian blur filter
///
/// The kernel spans three sigmas on each side of the centre tap.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `sigma` - The sigma of the gaussian kernel, used for both axes.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn gaussian_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    sigma: f32,
) -> Result<(), ImageError> {
    let kernel = kernels::gaussian_kernel_1d(kernels::gaussian_kernel_size(sigma), sigma);
    separable_filter(src, dst, &kernel, &kernel)
}

/// Smooth an image with the fixed 5-tap kernel used before flow derivatives.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn presmooth<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    let kernel = kernels::flow_presmooth_kernel_1d();
    separable_filter(src, dst, &kernel, &kernel)
}

/// Compute the first order image derivatives in x and y.
///
/// Uses the 5-tap fourth-order central difference along one axis and no
/// smoothing along the other, with replicated borders. A constant region has
/// a gradient of exactly zero.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dx` - The horizontal derivative with shape (H, W, C).
/// * `dy` - The vertical derivative with shape (H, W, C).
pub fn spatial_gradient<const C: usize>(
    src: &Image<f32, C>,
    dx: &mut Image<f32, C>,
    dy: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    for dst in [&*dx, &*dy] {
        if src.size() != dst.size() {
            return Err(ImageError::InvalidImageSize(
                src.cols(),
                src.rows(),
                dst.cols(),
                dst.rows(),
            ));
        }
    }

    par_iter_rows_indexed(dx, |x, y, dst_pixel| {
        let (x, y) = (x as isize, y as isize);
        for (c, out) in dst_pixel.iter_mut().enumerate() {
            let at = |o: isize| src.get_pixel_clamped(x + o, y, c);
            *out = kernels::central_difference_5(at(-2), at(-1), at(1), at(2));
        }
    });

    par_iter_rows_indexed(dy, |x, y, dst_pixel| {
        let (x, y) = (x as isize, y as isize);
        for (c, out) in dst_pixel.iter_mut().enumerate() {
            let at = |o: isize| src.get_pixel_clamped(x, y + o, c);
            *out = kernels::central_difference_5(at(-2), at(-1), at(1), at(2));
        }
    });

    Ok(())
}
