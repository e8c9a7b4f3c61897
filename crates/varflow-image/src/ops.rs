use crate::{Image, ImageError};

fn check_same_size<T, U, const C1: usize, const C2: usize>(
    a: &Image<T, C1>,
    b: &Image<U, C2>,
) -> Result<(), ImageError> {
    if a.size() != b.size() {
        return Err(ImageError::InvalidImageSize(
            a.width(),
            a.height(),
            b.width(),
            b.height(),
        ));
    }
    Ok(())
}

fn zip_with<const C: usize>(
    src1: &Image<f32, C>,
    src2: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    f: impl Fn(f32, f32) -> f32,
) -> Result<(), ImageError> {
    check_same_size(src1, src2)?;
    check_same_size(src1, dst)?;

    dst.as_slice_mut()
        .iter_mut()
        .zip(src1.as_slice().iter().zip(src2.as_slice().iter()))
        .for_each(|(out, (&a, &b))| *out = f(a, b));

    Ok(())
}

/// Elementwise sum `dst = src1 + src2`.
///
/// # Errors
///
/// The three images must share the same size.
///
/// # Example
///
/// ```
/// use varflow_image::{ops, Image};
///
/// let a = Image::<f32, 1>::new([2, 1].into(), vec![1.0, 2.0]).unwrap();
/// let b = Image::<f32, 1>::new([2, 1].into(), vec![0.5, 0.5]).unwrap();
/// let mut c = Image::<f32, 1>::from_size_val(a.size(), 0.0).unwrap();
///
/// ops::add(&a, &b, &mut c).unwrap();
/// assert_eq!(c.as_slice(), &[1.5, 2.5]);
/// ```
pub fn add<const C: usize>(
    src1: &Image<f32, C>,
    src2: &Image<f32, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    zip_with(src1, src2, dst, |a, b| a + b)
}

/// Elementwise difference `dst = src1 - src2`.
///
/// # Errors
///
/// The three images must share the same size.
pub fn sub<const C: usize>(
    src1: &Image<f32, C>,
    src2: &Image<f32, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    zip_with(src1, src2, dst, |a, b| a - b)
}

/// Elementwise product `dst = src1 * src2`.
///
/// # Errors
///
/// The three images must share the same size.
pub fn mul<const C: usize>(
    src1: &Image<f32, C>,
    src2: &Image<f32, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    zip_with(src1, src2, dst, |a, b| a * b)
}

/// Weighted sum `dst = src1 + k * src2`.
///
/// # Errors
///
/// The three images must share the same size.
pub fn add_scaled<const C: usize>(
    src1: &Image<f32, C>,
    src2: &Image<f32, C>,
    k: f32,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    zip_with(src1, src2, dst, |a, b| a + k * b)
}

/// Multiply every element by `k`, `dst = k * src`.
///
/// # Errors
///
/// Both images must share the same size.
pub fn scale<const C: usize>(
    src: &Image<f32, C>,
    k: f32,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    dst.as_slice_mut()
        .iter_mut()
        .zip(src.as_slice().iter())
        .for_each(|(out, &a)| *out = k * a);

    Ok(())
}

/// Cast the pixel data of an image to a different type.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image.
/// * `scale` - The scale to multiply the pixel data with.
///
/// Example:
///
/// ```
/// use varflow_image::{Image, ImageSize};
/// use varflow_image::ops::cast_and_scale;
///
/// let image = Image::<u8, 1>::new(
///  ImageSize {
///   width: 2,
///  height: 1,
/// },
/// vec![0u8, 255],
/// ).unwrap();
///
/// let mut image_f32 = Image::from_size_val(image.size(), 0.0f32).unwrap();
///
/// cast_and_scale(&image, &mut image_f32, 1. / 255.0).unwrap();
///
/// assert_eq!(image_f32.get_pixel(0, 0, 0).unwrap(), &0.0f32);
/// assert_eq!(image_f32.get_pixel(1, 0, 0).unwrap(), &1.0f32);
/// ```
pub fn cast_and_scale<T, U, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<U, C>,
    scale: U,
) -> Result<(), ImageError>
where
    T: Copy + num_traits::NumCast,
    U: Copy + num_traits::NumCast + std::ops::Mul<U, Output = U>,
{
    check_same_size(src, dst)?;

    dst.as_slice_mut()
        .iter_mut()
        .zip(src.as_slice().iter())
        .try_for_each(|(out, &inp)| {
            let x = U::from(inp).ok_or(ImageError::CastError(
                std::any::type_name::<U>().to_string(),
            ))?;
            *out = x * scale;
            Ok::<(), ImageError>(())
        })?;

    Ok(())
}
