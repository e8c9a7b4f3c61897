use varflow_image::{Image, ImageSize};
use varflow_imgproc::pyramid::{pyramid_sizes, pyrdown_ratio};

use crate::error::FlowError;

/// One resolution of a [`FlowPyramid`].
#[derive(Debug, Clone)]
pub struct PyramidLevel<const C: usize> {
    image1: Image<f32, C>,
    image2: Image<f32, C>,
}

impl<const C: usize> PyramidLevel<C> {
    /// First image at this resolution.
    pub fn image1(&self) -> &Image<f32, C> {
        &self.image1
    }

    /// Second image at this resolution.
    pub fn image2(&self) -> &Image<f32, C> {
        &self.image2
    }

    /// Size shared by both images.
    pub fn size(&self) -> ImageSize {
        self.image1.size()
    }
}

/// Paired gaussian pyramids of two images, finest level first.
///
/// Both images go through the same size sequence so that corresponding
/// levels stay aligned. There is always at least one level, the inputs.
#[derive(Debug, Clone)]
pub struct FlowPyramid<const C: usize> {
    levels: Vec<PyramidLevel<C>>,
}

impl<const C: usize> FlowPyramid<C> {
    /// Build the pyramid of an image pair.
    ///
    /// # Arguments
    ///
    /// * `image1` - The reference image.
    /// * `image2` - The image to register against `image1`, same size.
    /// * `ratio` - Downsampling factor between levels, in `(0, 1)`.
    /// * `min_width` - Smallest side a coarser level may have.
    ///
    /// # Errors
    ///
    /// Fails with [`FlowError::InvalidInput`] if the images differ in size.
    pub fn build(
        image1: &Image<f32, C>,
        image2: &Image<f32, C>,
        ratio: f32,
        min_width: usize,
    ) -> Result<Self, FlowError> {
        if image1.size() != image2.size() {
            return Err(FlowError::InvalidInput(format!(
                "image sizes differ: {} vs {}",
                image1.size(),
                image2.size()
            )));
        }

        let sizes = pyramid_sizes(image1.size(), ratio, min_width)?;

        let mut levels = Vec::with_capacity(sizes.len());
        levels.push(PyramidLevel {
            image1: image1.clone(),
            image2: image2.clone(),
        });

        for size in sizes.into_iter().skip(1) {
            let mut next = PyramidLevel {
                image1: Image::from_size_val(size, 0.0)?,
                image2: Image::from_size_val(size, 0.0)?,
            };
            if let Some(prev) = levels.last() {
                pyrdown_ratio(&prev.image1, &mut next.image1, ratio)?;
                pyrdown_ratio(&prev.image2, &mut next.image2, ratio)?;
            }
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Number of levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Level `index`, 0 being the finest.
    pub fn level(&self, index: usize) -> Option<&PyramidLevel<C>> {
        self.levels.get(index)
    }

    /// The input resolution.
    pub fn finest(&self) -> &PyramidLevel<C> {
        &self.levels[0]
    }

    /// The smallest resolution.
    pub fn coarsest(&self) -> &PyramidLevel<C> {
        &self.levels[self.levels.len() - 1]
    }

    /// Iterate `(index, level)` pairs from the coarsest level to the finest.
    pub fn iter_coarse_to_fine(
        &self,
    ) -> impl Iterator<Item = (usize, &PyramidLevel<C>)> + '_ {
        self.levels.iter().enumerate().rev()
    }
}
