use rayon::prelude::*;
use varflow_image::{Image, ImageError};

use crate::parallel::ExecutionStrategy;

/// A separable 2D filter that applies horizontal and vertical 1D correlations sequentially.
///
/// Taps falling outside the image read the nearest border pixel.
struct SeparableFilter<'a> {
    kernel_x: &'a [f32],
    kernel_y: &'a [f32],
    half_x: isize,
    half_y: isize,
}

impl<'a> SeparableFilter<'a> {
    fn new(kernel_x: &'a [f32], kernel_y: &'a [f32]) -> Self {
        Self {
            kernel_x,
            kernel_y,
            half_x: (kernel_x.len() / 2) as isize,
            half_y: (kernel_y.len() / 2) as isize,
        }
    }

    /// Horizontal pass over one row.
    fn filter_row<const C: usize>(&self, src_row: &[f32], dst_row: &mut [f32], cols: usize) {
        let last = cols as isize - 1;
        for c in 0..cols {
            let mut acc = [0.0f32; C];
            for (i, &k) in self.kernel_x.iter().enumerate() {
                let x = (c as isize + i as isize - self.half_x).clamp(0, last) as usize;
                let px = &src_row[x * C..x * C + C];
                for (acc_val, &v) in acc.iter_mut().zip(px.iter()) {
                    *acc_val += v * k;
                }
            }
            dst_row[c * C..c * C + C].copy_from_slice(&acc);
        }
    }

    /// Vertical pass producing output row `r` from the horizontally filtered buffer.
    fn filter_col<const C: usize>(
        &self,
        temp: &[f32],
        dst_row: &mut [f32],
        r: usize,
        rows: usize,
        cols: usize,
    ) {
        let stride = cols * C;
        let last = rows as isize - 1;
        dst_row.iter_mut().for_each(|v| *v = 0.0);
        for (i, &k) in self.kernel_y.iter().enumerate() {
            let y = (r as isize + i as isize - self.half_y).clamp(0, last) as usize;
            let src_row = &temp[y * stride..(y + 1) * stride];
            for (out, &v) in dst_row.iter_mut().zip(src_row.iter()) {
                *out += v * k;
            }
        }
    }

    fn apply<const C: usize>(
        &self,
        src: &Image<f32, C>,
        dst: &mut Image<f32, C>,
        strategy: ExecutionStrategy,
    ) {
        let (rows, cols) = (src.rows(), src.cols());
        if rows == 0 || cols == 0 {
            return;
        }
        let stride = cols * C;
        let mut temp = vec![0.0f32; src.as_slice().len()];

        if strategy.is_parallel(rows * cols) {
            temp.par_chunks_exact_mut(stride)
                .zip(src.as_slice().par_chunks_exact(stride))
                .for_each(|(temp_row, src_row)| self.filter_row::<C>(src_row, temp_row, cols));

            dst.as_slice_mut()
                .par_chunks_exact_mut(stride)
                .enumerate()
                .for_each(|(r, dst_row)| self.filter_col::<C>(&temp, dst_row, r, rows, cols));
        } else {
            temp.chunks_exact_mut(stride)
                .zip(src.as_slice().chunks_exact(stride))
                .for_each(|(temp_row, src_row)| self.filter_row::<C>(src_row, temp_row, cols));

            dst.as_slice_mut()
                .chunks_exact_mut(stride)
                .enumerate()
                .for_each(|(r, dst_row)| self.filter_col::<C>(&temp, dst_row, r, rows, cols));
        }
    }
}

/// Apply a separable filter with execution strategy control.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
/// * `strategy` - Execution strategy: `Serial`, `Parallel`, or `Auto`.
pub fn separable_filter_with_strategy<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    if kernel_x.is_empty() || kernel_y.is_empty() {
        return Err(ImageError::InvalidKernelLength(
            kernel_x.len(),
            kernel_y.len(),
        ));
    }

    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    SeparableFilter::new(kernel_x, kernel_y).apply(src, dst, strategy);

    Ok(())
}

/// Apply a separable filter to an image.
///
/// Uses `ExecutionStrategy::Auto`. For explicit control, use
/// [`separable_filter_with_strategy`].
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
pub fn separable_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
) -> Result<(), ImageError> {
    separable_filter_with_strategy(src, dst, kernel_x, kernel_y, ExecutionStrategy::Auto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use varflow_image::ImageSize;

    #[test]
    fn test_separable_filter_f32() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 5,
            height: 5,
        };

        #[rustfmt::skip]
        let img = Image::new(
            size,
            vec![
                0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0,
            ],
        )?;

        let mut dst = Image::<_, 1>::from_size_val(img.size(), 0f32)?;
        let kernel_x = vec![1.0, 1.0, 1.0];
        let kernel_y = vec![1.0, 1.0, 1.0];
        separable_filter(&img, &mut dst, &kernel_x, &kernel_y)?;

        #[rustfmt::skip]
        assert_eq!(
            dst.as_slice(),
            &[
                0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 1.0, 1.0, 1.0, 0.0,
                0.0, 1.0, 1.0, 1.0, 0.0,
                0.0, 1.0, 1.0, 1.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0,
            ]
        );

        let xsum = dst.as_slice().iter().sum::<f32>();
        assert_eq!(xsum, 9.0);

        Ok(())
    }

    #[test]
    fn test_separable_filter_replicates_border() -> Result<(), ImageError> {
        #[rustfmt::skip]
        let img = Image::<f32, 1>::new(
            [3, 1].into(),
            vec![3.0, 6.0, 9.0],
        )?;
        let mut dst = Image::<f32, 1>::from_size_val(img.size(), 0.0)?;
        let box3 = [1.0 / 3.0; 3];
        separable_filter(&img, &mut dst, &box3, &[1.0])?;

        // (3 + 3 + 6) / 3, (3 + 6 + 9) / 3, (6 + 9 + 9) / 3
        let expected = [4.0, 6.0, 8.0];
        for (a, b) in dst.as_slice().iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-5);
        }

        // a constant image stays constant under any normalized kernel
        let flat = Image::<f32, 2>::from_size_val([4, 3].into(), 0.25)?;
        let mut out = Image::<f32, 2>::from_size_val(flat.size(), 0.0)?;
        separable_filter(&flat, &mut out, &[0.2, 0.6, 0.2], &[0.5, 0.5])?;
        assert!(out.as_slice().iter().all(|v| (v - 0.25).abs() < 1e-6));

        Ok(())
    }

    #[test]
    fn test_separable_filter_with_strategy() -> Result<(), ImageError> {
        let img = Image::<f32, 3>::from_fn([37, 23].into(), |x, y, c| {
            ((x * 7 + y * 3 + c) % 11) as f32
        })?;
        let kernel_x = vec![0.25, 0.5, 0.25];
        let kernel_y = vec![0.1, 0.2, 0.4, 0.2, 0.1];

        let mut dst_serial = Image::<f32, 3>::from_size_val(img.size(), 0.0)?;
        separable_filter_with_strategy(
            &img,
            &mut dst_serial,
            &kernel_x,
            &kernel_y,
            ExecutionStrategy::Serial,
        )?;

        let mut dst_parallel = Image::<f32, 3>::from_size_val(img.size(), 0.0)?;
        separable_filter_with_strategy(
            &img,
            &mut dst_parallel,
            &kernel_x,
            &kernel_y,
            ExecutionStrategy::Parallel,
        )?;

        assert_eq!(dst_serial.as_slice(), dst_parallel.as_slice());
        Ok(())
    }

    #[test]
    fn test_separable_filter_errors() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([3, 3].into(), 0.0)?;
        let mut dst = Image::<f32, 1>::from_size_val([3, 3].into(), 0.0)?;
        assert_eq!(
            separable_filter(&img, &mut dst, &[], &[1.0]),
            Err(ImageError::InvalidKernelLength(0, 1))
        );

        let mut small = Image::<f32, 1>::from_size_val([2, 3].into(), 0.0)?;
        assert!(separable_filter(&img, &mut small, &[1.0], &[1.0]).is_err());
        Ok(())
    }
}
