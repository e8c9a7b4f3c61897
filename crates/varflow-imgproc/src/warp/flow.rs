use varflow_image::{Image, ImageError};

use crate::interpolation::bilinear_interpolation;
use crate::parallel;

fn check_flow_size<const C: usize>(
    src: &Image<f32, C>,
    flow_u: &Image<f32, 1>,
    flow_v: &Image<f32, 1>,
) -> Result<(), ImageError> {
    for flow in [flow_u, flow_v] {
        if flow.size() != src.size() {
            return Err(ImageError::InvalidImageSize(
                src.width(),
                src.height(),
                flow.width(),
                flow.height(),
            ));
        }
    }
    Ok(())
}

/// Warp an image with a dense flow field.
///
/// `dst(x, y, c) = bilinear(src, x + flow_u(x, y), y + flow_v(x, y), c)`.
///
/// # Arguments
///
/// * `src` - The image to resample with shape (H, W, C).
/// * `flow_u` - The horizontal displacement with shape (H, W).
/// * `flow_v` - The vertical displacement with shape (H, W).
/// * `dst` - The warped image with shape (H, W, C).
///
/// # Errors
///
/// The flow components and `dst` must have the size of `src`.
pub fn warp_flow<const C: usize>(
    src: &Image<f32, C>,
    flow_u: &Image<f32, 1>,
    flow_v: &Image<f32, 1>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    check_flow_size(src, flow_u, flow_v)?;

    if dst.size() != src.size() {
        return Err(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        ));
    }

    let cols = src.cols();
    let (u, v) = (flow_u.as_slice(), flow_v.as_slice());

    parallel::par_iter_rows_indexed(dst, |x, y, dst_pixel| {
        let i = y * cols + x;
        let px = bilinear_interpolation(src, x as f32 + u[i], y as f32 + v[i]);
        dst_pixel.copy_from_slice(&px);
    });

    Ok(())
}

/// Mark the pixels whose displaced position falls inside the image.
///
/// `mask(x, y)` is `1.0` when `(x + u, y + v)` lies in `[0, W-1] x [0, H-1]`
/// and `0.0` otherwise, i.e. when [`warp_flow`] had to clamp the sample.
///
/// # Errors
///
/// The flow components and `mask` must share the same size.
pub fn flow_inside_mask(
    flow_u: &Image<f32, 1>,
    flow_v: &Image<f32, 1>,
    mask: &mut Image<f32, 1>,
) -> Result<(), ImageError> {
    check_flow_size(mask, flow_u, flow_v)?;

    let (cols, rows) = (mask.cols(), mask.rows());
    let (max_x, max_y) = (cols as f32 - 1.0, rows as f32 - 1.0);
    let (u, v) = (flow_u.as_slice(), flow_v.as_slice());

    parallel::par_iter_rows_indexed(mask, |x, y, m| {
        let i = y * cols + x;
        let (px, py) = (x as f32 + u[i], y as f32 + v[i]);
        let inside = px >= 0.0 && px <= max_x && py >= 0.0 && py <= max_y;
        m[0] = if inside { 1.0 } else { 0.0 };
    });

    Ok(())
}
