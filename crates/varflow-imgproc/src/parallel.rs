use std::ops::Range;

use rayon::prelude::*;

use varflow_image::Image;

/// Images with fewer pixels than this run serially under [`ExecutionStrategy::Auto`].
const AUTO_PARALLEL_MIN_PIXELS: usize = 16_384;

/// Number of elements folded by one task in [`par_chunked_sum`].
pub const REDUCTION_CHUNK: usize = 4096;

/// Controls how parallel operations are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    Serial,

    /// Process rows in parallel on the global rayon thread pool.
    Parallel,

    /// Parallel for large images, serial otherwise.
    #[default]
    Auto,
}

impl ExecutionStrategy {
    /// Whether an image with `num_pixels` pixels should be processed in parallel.
    pub fn is_parallel(&self, num_pixels: usize) -> bool {
        match self {
            ExecutionStrategy::Serial => false,
            ExecutionStrategy::Parallel => true,
            ExecutionStrategy::Auto => num_pixels >= AUTO_PARALLEL_MIN_PIXELS,
        }
    }
}

/// Apply a function to each pixel of `dst` in parallel, passing its column and row.
///
/// Rows are handed to rayon as disjoint chunks, so every output pixel is
/// written exactly once by exactly one task.
pub fn par_iter_rows_indexed<const C: usize>(
    dst: &mut Image<f32, C>,
    f: impl Fn(usize, usize, &mut [f32]) + Send + Sync,
) {
    let cols = dst.cols();
    if cols == 0 {
        return;
    }
    dst.as_slice_mut()
        .par_chunks_exact_mut(C * cols)
        .enumerate()
        .for_each(|(r, dst_chunk)| {
            dst_chunk
                .chunks_exact_mut(C)
                .enumerate()
                .for_each(|(c, dst_pixel)| f(c, r, dst_pixel));
        });
}

/// Apply a function to each pixel for grid sampling in parallel.
pub fn par_iter_rows_resample<const C: usize>(
    dst: &mut Image<f32, C>,
    map_x: &Image<f32, 1>,
    map_y: &Image<f32, 1>,
    f: impl Fn(&f32, &f32, &mut [f32]) + Send + Sync,
) {
    let cols = dst.cols();
    if cols == 0 {
        return;
    }
    let map_x_slice = map_x.as_slice();
    let map_y_slice = map_y.as_slice();

    dst.as_slice_mut()
        .par_chunks_exact_mut(C * cols)
        .zip(map_x_slice.par_chunks_exact(cols))
        .zip(map_y_slice.par_chunks_exact(cols))
        .for_each(|((dst_chunk, map_x_chunk), map_y_chunk)| {
            dst_chunk
                .chunks_exact_mut(C)
                .zip(map_x_chunk.iter().zip(map_y_chunk.iter()))
                .for_each(|(dst_pixel, (x, y))| {
                    f(x, y, dst_pixel);
                });
        });
}

/// Sum `f` over `0..len` split in fixed chunks of [`REDUCTION_CHUNK`] elements.
///
/// The partial sums are collected in chunk order and added serially, so the
/// result does not depend on how rayon schedules the chunks.
pub fn par_chunked_sum(len: usize, f: impl Fn(Range<usize>) -> f32 + Send + Sync) -> f32 {
    let num_chunks = len.div_ceil(REDUCTION_CHUNK);
    let partials: Vec<f32> = (0..num_chunks)
        .into_par_iter()
        .map(|i| {
            let start = i * REDUCTION_CHUNK;
            f(start..(start + REDUCTION_CHUNK).min(len))
        })
        .collect();
    partials.iter().sum()
}
