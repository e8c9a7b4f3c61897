use crate::filter::gaussian_blur;
use crate::resize::resize_bilinear;
use varflow_image::{Image, ImageError, ImageSize};

fn check_ratio(ratio: f32) -> Result<(), ImageError> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(ImageError::InvalidPyramidRatio(ratio));
    }
    Ok(())
}

/// Anti-aliasing sigma used when shrinking an image by `ratio`.
pub fn pyramid_sigma(ratio: f32) -> f32 {
    1.0 / ratio - 1.0
}

/// Compute the level sizes of a pyramid, finest first.
///
/// Level 0 is `size` itself. Each following level is
/// `floor(width * ratio) x floor(height * ratio)` of the previous one, and
/// construction stops before a level whose width or height would fall below
/// `min_width`. The base level is always present, even if it is already
/// smaller than `min_width`.
///
/// # Errors
///
/// Fails if `ratio` is not in `(0, 1)`.
///
/// # Example
///
/// ```
/// use varflow_imgproc::pyramid::pyramid_sizes;
///
/// let sizes = pyramid_sizes([64, 64].into(), 0.75, 30).unwrap();
/// let widths: Vec<usize> = sizes.iter().map(|s| s.width).collect();
/// assert_eq!(widths, vec![64, 48, 36]);
/// ```
pub fn pyramid_sizes(
    size: ImageSize,
    ratio: f32,
    min_width: usize,
) -> Result<Vec<ImageSize>, ImageError> {
    check_ratio(ratio)?;

    let mut sizes = vec![size];
    let mut current = size;

    loop {
        let next = ImageSize {
            width: (current.width as f32 * ratio).floor() as usize,
            height: (current.height as f32 * ratio).floor() as usize,
        };

        if next.width < min_width.max(1) || next.height < min_width.max(1) {
            break;
        }

        // a ratio close to one may stop shrinking tiny images
        if next == current {
            break;
        }

        sizes.push(next);
        current = next;
    }

    Ok(sizes)
}

/// Blur and shrink an image into `dst`.
///
/// The source is smoothed with a gaussian of sigma [`pyramid_sigma`]`(ratio)`
/// and then bilinearly resampled to the size of `dst`.
///
/// # Arguments
///
/// * `src` - The finer level.
/// * `dst` - The coarser level, its size selects the output resolution.
/// * `ratio` - The downsampling ratio the anti-aliasing filter is tuned for.
pub fn pyrdown_ratio<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    ratio: f32,
) -> Result<(), ImageError> {
    check_ratio(ratio)?;

    let mut blurred = Image::<f32, C>::from_size_val(src.size(), 0.0)?;
    gaussian_blur(src, &mut blurred, pyramid_sigma(ratio))?;

    resize_bilinear(&blurred, dst)
}

/// Build a gaussian pyramid of an image, finest level first.
///
/// # Arguments
///
/// * `image` - The base image, stored as level 0.
/// * `ratio` - Downsampling factor between consecutive levels, in `(0, 1)`.
/// * `min_width` - No level other than the base has a side below this value.
///
/// # Example
///
/// ```
/// use varflow_image::Image;
/// use varflow_imgproc::pyramid::build_pyramid;
///
/// let image = Image::<f32, 1>::from_size_val([40, 20].into(), 1.0).unwrap();
/// let pyramid = build_pyramid(&image, 0.5, 5).unwrap();
/// assert_eq!(pyramid.len(), 3);
/// assert_eq!(pyramid[2].width(), 10);
/// ```
pub fn build_pyramid<const C: usize>(
    image: &Image<f32, C>,
    ratio: f32,
    min_width: usize,
) -> Result<Vec<Image<f32, C>>, ImageError> {
    let sizes = pyramid_sizes(image.size(), ratio, min_width)?;

    let mut levels = Vec::with_capacity(sizes.len());
    levels.push(image.clone());

    for size in sizes.into_iter().skip(1) {
        let mut coarser = Image::<f32, C>::from_size_val(size, 0.0)?;
        if let Some(finer) = levels.last() {
            pyrdown_ratio(finer, &mut coarser, ratio)?;
        }
        levels.push(coarser);
    }

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pyramid_sizes_termination() -> Result<(), ImageError> {
        for &(w, h) in &[(64usize, 64usize), (640, 480), (31, 200), (17, 5), (1, 1)] {
            for &ratio in &[0.5f32, 0.75, 0.9] {
                for &min_width in &[1usize, 8, 30, 1000] {
                    let sizes = pyramid_sizes([w, h].into(), ratio, min_width)?;
                    assert!(!sizes.is_empty());
                    assert_eq!(sizes[0], ImageSize::from([w, h]));
                    for s in sizes.iter().skip(1) {
                        assert!(s.width >= min_width && s.height >= min_width);
                    }
                    for pair in sizes.windows(2) {
                        assert_eq!(
                            pair[1].width,
                            (pair[0].width as f32 * ratio).floor() as usize
                        );
                        assert_eq!(
                            pair[1].height,
                            (pair[0].height as f32 * ratio).floor() as usize
                        );
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_pyramid_sizes_base_smaller_than_min() -> Result<(), ImageError> {
        let sizes = pyramid_sizes([20, 20].into(), 0.75, 30)?;
        assert_eq!(sizes, vec![ImageSize::from([20, 20])]);
        Ok(())
    }

    #[test]
    fn test_pyramid_invalid_ratio() {
        for ratio in [0.0, 1.0, -0.5, 1.5, f32::NAN] {
            assert!(pyramid_sizes([10, 10].into(), ratio, 1).is_err());
        }
    }

    #[test]
    fn test_build_pyramid_constant_image() -> Result<(), ImageError> {
        let image = Image::<f32, 3>::from_size_val([50, 38].into(), 0.4)?;
        let levels = build_pyramid(&image, 0.75, 10)?;
        assert_eq!(levels.len(), 5);
        assert_eq!(levels[1].size(), ImageSize::from([37, 28]));
        for level in &levels {
            assert!(level.as_slice().iter().all(|v| (v - 0.4).abs() < 1e-5));
        }
        Ok(())
    }
}
