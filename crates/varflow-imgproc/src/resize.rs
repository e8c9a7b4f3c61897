use crate::interpolation::{grid::meshgrid_from_fn, remap};
use varflow_image::{Image, ImageError};

/// Resize an image to the size of `dst` with bilinear interpolation.
///
/// Pixel centres are aligned: output pixel `x` samples the source at
/// `(x + 0.5) * src_width / dst_width - 0.5`, and likewise for rows, so a
/// displacement of `d` source pixels corresponds to `d * dst_width / src_width`
/// destination pixels. Positions outside the source are clamped to its border.
///
/// # Arguments
///
/// * `src` - The input image container.
/// * `dst` - The output image container, its size selects the new resolution.
///
/// # Errors
///
/// Fails if `src` is empty while `dst` is not.
///
/// # Example
///
/// ```
/// use varflow_image::{Image, ImageSize};
/// use varflow_imgproc::resize::resize_bilinear;
///
/// let image = Image::<_, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![0f32; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let new_size = ImageSize {
///     width: 2,
///     height: 3,
/// };
///
/// let mut image_resized = Image::<_, 3>::from_size_val(new_size, 0.0).unwrap();
///
/// resize_bilinear(&image, &mut image_resized).unwrap();
///
/// assert_eq!(image_resized.num_channels(), 3);
/// assert_eq!(image_resized.size().width, 2);
/// assert_eq!(image_resized.size().height, 3);
/// ```
pub fn resize_bilinear<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    if dst.is_empty() {
        return Ok(());
    }

    if src.is_empty() {
        return Err(ImageError::InvalidImageSize(
            dst.width(),
            dst.height(),
            src.width(),
            src.height(),
        ));
    }

    if src.size() == dst.size() {
        dst.as_slice_mut().copy_from_slice(src.as_slice());
        return Ok(());
    }

    let scale_x = src.width() as f32 / dst.width() as f32;
    let scale_y = src.height() as f32 / dst.height() as f32;

    let (map_x, map_y) = meshgrid_from_fn(dst.cols(), dst.rows(), |x, y| {
        (
            (x as f32 + 0.5) * scale_x - 0.5,
            (y as f32 + 0.5) * scale_y - 0.5,
        )
    })?;

    remap(src, dst, &map_x, &map_y)
}
