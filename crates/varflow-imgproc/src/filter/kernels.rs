/// Create a gaussian blur kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel.
/// * `sigma` - The sigma of the gaussian kernel.
///
/// # Returns
///
/// A vector of the kernel.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f32) -> Vec<f32> {
    let mut kernel = Vec::with_capacity(kernel_size);

    let mean = (kernel_size - 1) as f32 / 2.0;
    let sigma_sq = sigma * sigma;

    // compute the kernel
    for i in 0..kernel_size {
        let x = i as f32 - mean;
        kernel.push((-(x * x) / (2.0 * sigma_sq)).exp());
    }

    // normalize the kernel
    let norm = kernel.iter().sum::<f32>();
    kernel.iter_mut().for_each(|k| *k /= norm);
    kernel
}

/// Odd kernel size covering three sigmas on each side, at least 3 taps.
pub fn gaussian_kernel_size(sigma: f32) -> usize {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    2 * radius + 1
}

/// Light 5-tap smoothing applied to both frames before differentiation.
pub fn flow_presmooth_kernel_1d() -> [f32; 5] {
    [0.02, 0.11, 0.74, 0.11, 0.02]
}

/// Fourth-order central difference `(f(x-2) - 8f(x-1) + 8f(x+1) - f(x+2)) / 12`.
///
/// Evaluated on the antisymmetric pairs, so equal samples give exactly zero.
#[inline]
pub fn central_difference_5(m2: f32, m1: f32, p1: f32, p2: f32) -> f32 {
    (8.0 * (p1 - m1) - (p2 - m2)) / 12.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gaussian_kernel_1d() {
        let kernel = gaussian_kernel_1d(5, 0.5);

        let expected = [
            0.00026386508,
            0.10645077,
            0.78657067,
            0.10645077,
            0.00026386508,
        ];

        for (k, e) in kernel.iter().zip(expected.iter()) {
            assert_relative_eq!(k, e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_gaussian_kernel_size() {
        assert_eq!(gaussian_kernel_size(0.05), 3);
        assert_eq!(gaussian_kernel_size(1.0), 7);
        assert_eq!(gaussian_kernel_size(0.3), 3);
    }

    #[test]
    fn test_presmooth_kernel_sum() {
        let sum = flow_presmooth_kernel_1d().iter().sum::<f32>();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_central_difference_5() {
        assert_eq!(central_difference_5(0.7, 0.7, 0.7, 0.7), 0.0);
        assert_eq!(central_difference_5(1e6, 1e6, 1e6, 1e6), 0.0);
        // exact on cubics: f(x) = x^3 around x = 1
        assert_relative_eq!(central_difference_5(-1.0, 0.0, 8.0, 27.0), 3.0, epsilon = 1e-6);
    }
}
