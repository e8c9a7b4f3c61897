use varflow_image::Image;

/// Kernel for bilinear interpolation
///
/// The four integer neighbours of `(u, v)` are clamped to the image before
/// they are read, so the result never extrapolates past the border. Sampling
/// at integer coordinates returns the source pixel unchanged.
///
/// # Arguments
///
/// * `image` - The input image container, must not be empty.
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
///
/// # Returns
///
/// The interpolated pixel values.
///
/// # Example
///
/// ```
/// use varflow_image::Image;
/// use varflow_imgproc::interpolation::bilinear_interpolation;
///
/// let image = Image::<f32, 1>::new([2, 2].into(), vec![0.0, 1.0, 2.0, 3.0]).unwrap();
///
/// assert_eq!(bilinear_interpolation(&image, 0.5, 0.5), [1.5]);
/// assert_eq!(bilinear_interpolation(&image, -3.0, 7.0), [2.0]);
/// ```
pub fn bilinear_interpolation<const C: usize>(image: &Image<f32, C>, u: f32, v: f32) -> [f32; C] {
    let (rows, cols) = (image.rows() as isize, image.cols() as isize);

    let u0 = u.floor();
    let v0 = v.floor();

    let frac_u = u - u0;
    let frac_v = v - v0;

    let frac_uu = 1.0 - frac_u;
    let frac_vv = 1.0 - frac_v;

    let w00 = frac_uu * frac_vv;
    let w01 = frac_u * frac_vv;
    let w10 = frac_uu * frac_v;
    let w11 = frac_u * frac_v;

    // the float to int cast saturates, large offsets still end up clamped
    let iu0 = (u0 as isize).clamp(0, cols - 1) as usize;
    let iv0 = (v0 as isize).clamp(0, rows - 1) as usize;
    let iu1 = (u0 as isize).saturating_add(1).clamp(0, cols - 1) as usize;
    let iv1 = (v0 as isize).saturating_add(1).clamp(0, rows - 1) as usize;

    let cols = cols as usize;
    let base00 = (iv0 * cols + iu0) * C;
    let base01 = (iv0 * cols + iu1) * C;
    let base10 = (iv1 * cols + iu0) * C;
    let base11 = (iv1 * cols + iu1) * C;

    let data = image.as_slice();

    let p00 = &data[base00..base00 + C];
    let p01 = &data[base01..base01 + C];
    let p10 = &data[base10..base10 + C];
    let p11 = &data[base11..base11 + C];

    let mut pixel = [0.0; C];
    for k in 0..C {
        pixel[k] = p00[k] * w00 + p01[k] * w01 + p10[k] * w10 + p11[k] * w11;
    }

    pixel
}
