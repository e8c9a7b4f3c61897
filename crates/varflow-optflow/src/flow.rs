use varflow_image::{ops, Image, ImageSize};
use varflow_imgproc::resize::resize_bilinear;

use crate::error::FlowError;

/// A dense displacement field.
///
/// `u` holds the horizontal and `v` the vertical displacement of every pixel,
/// both in pixels of the image the field belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowField {
    u: Image<f32, 1>,
    v: Image<f32, 1>,
}

impl FlowField {
    /// Create a flow field from its two components.
    ///
    /// # Errors
    ///
    /// Fails with [`FlowError::InvalidInput`] if `u` and `v` differ in size.
    pub fn new(u: Image<f32, 1>, v: Image<f32, 1>) -> Result<Self, FlowError> {
        if u.size() != v.size() {
            return Err(FlowError::InvalidInput(format!(
                "flow components differ in size: u is {}, v is {}",
                u.size(),
                v.size()
            )));
        }
        Ok(Self { u, v })
    }

    /// Create an all-zero flow field.
    pub fn zeros(size: ImageSize) -> Result<Self, FlowError> {
        Ok(Self {
            u: Image::from_size_val(size, 0.0)?,
            v: Image::from_size_val(size, 0.0)?,
        })
    }

    /// Build a flow field from `[u0, v0, u1, v1, ...]` in row-major pixel order.
    pub fn from_interleaved(size: ImageSize, data: &[f32]) -> Result<Self, FlowError> {
        if data.len() != 2 * size.num_pixels() {
            return Err(FlowError::InvalidInput(format!(
                "expected {} interleaved flow values for {}, got {}",
                2 * size.num_pixels(),
                size,
                data.len()
            )));
        }
        let u = data.iter().step_by(2).copied().collect();
        let v = data.iter().skip(1).step_by(2).copied().collect();
        Self::new(Image::new(size, u)?, Image::new(size, v)?)
    }

    /// The flow as `[u0, v0, u1, v1, ...]` in row-major pixel order.
    pub fn to_interleaved(&self) -> Vec<f32> {
        self.u
            .as_slice()
            .iter()
            .zip(self.v.as_slice())
            .flat_map(|(&u, &v)| [u, v])
            .collect()
    }

    /// Size of the field.
    pub fn size(&self) -> ImageSize {
        self.u.size()
    }

    /// Horizontal displacement.
    pub fn u(&self) -> &Image<f32, 1> {
        &self.u
    }

    /// Vertical displacement.
    pub fn v(&self) -> &Image<f32, 1> {
        &self.v
    }

    /// Consume the field and return `(u, v)`.
    pub fn into_parts(self) -> (Image<f32, 1>, Image<f32, 1>) {
        (self.u, self.v)
    }

    /// Componentwise sum of two flow fields.
    pub fn add(&self, other: &FlowField) -> Result<FlowField, FlowError> {
        let mut u = Image::from_size_val(self.size(), 0.0)?;
        let mut v = Image::from_size_val(self.size(), 0.0)?;
        ops::add(&self.u, &other.u, &mut u)?;
        ops::add(&self.v, &other.v, &mut v)?;
        Ok(FlowField { u, v })
    }

    /// Resample the field to `size` for use at another pyramid level.
    ///
    /// Both components are resized bilinearly, then `u` is multiplied by the
    /// width ratio and `v` by the height ratio so the displacements are
    /// expressed in pixels of the new resolution.
    ///
    /// # Example
    ///
    /// ```
    /// use varflow_image::Image;
    /// use varflow_optflow::FlowField;
    ///
    /// let u = Image::<f32, 1>::from_size_val([36, 36].into(), 1.5).unwrap();
    /// let v = Image::<f32, 1>::from_size_val([36, 36].into(), -1.0).unwrap();
    /// let flow = FlowField::new(u, v).unwrap().upsample([48, 48].into()).unwrap();
    /// assert!((flow.u().as_slice()[0] - 2.0).abs() < 1e-5);
    /// ```
    pub fn upsample(&self, size: ImageSize) -> Result<FlowField, FlowError> {
        let old = self.size();
        if old.is_empty() {
            return Err(FlowError::InvalidInput(format!(
                "cannot resample an empty flow field to {size}"
            )));
        }

        let mut u = Image::from_size_val(size, 0.0)?;
        let mut v = Image::from_size_val(size, 0.0)?;
        resize_bilinear(&self.u, &mut u)?;
        resize_bilinear(&self.v, &mut v)?;

        let scale_u = size.width as f32 / old.width as f32;
        let scale_v = size.height as f32 / old.height as f32;
        u.as_slice_mut().iter_mut().for_each(|x| *x *= scale_u);
        v.as_slice_mut().iter_mut().for_each(|x| *x *= scale_v);

        Ok(FlowField { u, v })
    }

    /// Whether every displacement is finite.
    pub fn is_finite(&self) -> bool {
        self.u.as_slice().iter().all(|x| x.is_finite())
            && self.v.as_slice().iter().all(|x| x.is_finite())
    }

    /// Mean horizontal and vertical displacement.
    pub fn mean(&self) -> (f32, f32) {
        let n = self.size().num_pixels().max(1) as f64;
        let mean = |img: &Image<f32, 1>| {
            (img.as_slice().iter().map(|&x| x as f64).sum::<f64>() / n) as f32
        };
        (mean(&self.u), mean(&self.v))
    }

    /// Largest displacement length over the field.
    pub fn max_magnitude(&self) -> f32 {
        self.u
            .as_slice()
            .iter()
            .zip(self.v.as_slice())
            .map(|(u, v)| u.hypot(*v))
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_rejects_mismatch() -> Result<(), FlowError> {
        let u = Image::<f32, 1>::from_size_val([4, 3].into(), 0.0)?;
        let v = Image::<f32, 1>::from_size_val([3, 4].into(), 0.0)?;
        assert!(matches!(
            FlowField::new(u, v),
            Err(FlowError::InvalidInput(_))
        ));
        Ok(())
    }

    #[test]
    fn test_interleaved_layout() -> Result<(), FlowError> {
        let size = ImageSize {
            width: 2,
            height: 1,
        };
        let flow = FlowField::from_interleaved(size, &[1.0, 2.0, 3.0, 4.0])?;
        assert_eq!(flow.u().as_slice(), &[1.0, 3.0]);
        assert_eq!(flow.v().as_slice(), &[2.0, 4.0]);
        assert_eq!(flow.to_interleaved(), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(FlowField::from_interleaved(size, &[1.0]).is_err());

        let (u, v) = flow.into_parts();
        assert_eq!(u.into_vec(), vec![1.0, 3.0]);
        assert_eq!(v.into_vec(), vec![2.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_upsample_rescales_per_axis() -> Result<(), FlowError> {
        let u = Image::<f32, 1>::from_size_val([10, 20].into(), 1.0)?;
        let v = Image::<f32, 1>::from_size_val([10, 20].into(), 1.0)?;
        let flow = FlowField::new(u, v)?.upsample([15, 25].into())?;
        assert_eq!(flow.size(), ImageSize::from([15, 25]));
        assert!(flow.u().as_slice().iter().all(|&x| (x - 1.5).abs() < 1e-6));
        assert!(flow.v().as_slice().iter().all(|&x| (x - 1.25).abs() < 1e-6));
        Ok(())
    }

    #[test]
    fn test_add_and_stats() -> Result<(), FlowError> {
        let a = FlowField::new(
            Image::new([2, 1].into(), vec![3.0, 0.0])?,
            Image::new([2, 1].into(), vec![4.0, 0.0])?,
        )?;
        let b = FlowField::zeros(a.size())?;
        let sum = a.add(&b)?;
        assert_eq!(sum, a);
        assert_relative_eq!(sum.max_magnitude(), 5.0);
        assert_eq!(sum.mean(), (1.5, 2.0));
        assert!(sum.is_finite());
        Ok(())
    }
}
