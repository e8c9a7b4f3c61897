use crate::error::ImageError;

/// Image size in pixels
///
/// A struct to represent the size of an image in pixels.
///
/// # Examples
///
/// ```
/// use varflow_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl ImageSize {
    /// Number of pixels covered by this size.
    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

/// Represents an image with pixel data.
///
/// The pixel data is stored row-major with interleaved channels (HWC): the
/// element at column `x`, row `y` and channel `c` lives at index
/// `(y * width + x) * CHANNELS + c`. The same ordering is used when the data is
/// handed in through [`Image::new`] and when it is read back through
/// [`Image::as_slice`] or [`Image::into_vec`].
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const CHANNELS: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Create a new image from pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `data` - The pixel data of the image in HWC order.
    ///
    /// # Returns
    ///
    /// A new image with the given pixel data.
    ///
    /// # Errors
    ///
    /// If the length of the pixel data does not match the image size, or if
    /// the image is declared with zero channels, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use varflow_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 3>::new(
    ///    ImageSize {
    ///       width: 10,
    ///      height: 20,
    ///  },
    /// vec![0u8; 10 * 20 * 3],
    /// ).unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.size().height, 20);
    /// assert_eq!(image.num_channels(), 3);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        if CHANNELS == 0 {
            return Err(ImageError::ZeroChannels);
        }

        // check if the data length matches the image size
        if data.len() != size.width * size.height * CHANNELS {
            return Err(ImageError::InvalidChannelShape(
                data.len(),
                size.width * size.height * CHANNELS,
            ));
        }

        Ok(Self { size, data })
    }

    /// Create a new image with the given size and default pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `val` - The default value of the pixel data.
    ///
    /// # Examples
    ///
    /// ```
    /// use varflow_image::{Image, ImageSize};
    ///
    /// let image = Image::<f32, 1>::from_size_val(
    ///   ImageSize {
    ///     width: 10,
    ///    height: 20,
    /// }, 0.0).unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.num_channels(), 1);
    /// ```
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let data = vec![val; size.width * size.height * CHANNELS];
        Image::new(size, data)
    }

    /// Create a new image by evaluating `f(x, y, c)` for every element.
    ///
    /// Handy to build synthetic patterns.
    ///
    /// # Examples
    ///
    /// ```
    /// use varflow_image::{Image, ImageSize};
    ///
    /// let ramp = Image::<f32, 1>::from_fn([3, 2].into(), |x, _, _| x as f32).unwrap();
    /// assert_eq!(ramp.as_slice(), &[0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
    /// ```
    pub fn from_fn(
        size: ImageSize,
        f: impl Fn(usize, usize, usize) -> T,
    ) -> Result<Self, ImageError> {
        let mut data = Vec::with_capacity(size.width * size.height * CHANNELS);
        for y in 0..size.height {
            for x in 0..size.width {
                for c in 0..CHANNELS {
                    data.push(f(x, y, c));
                }
            }
        }
        Image::new(size, data)
    }

    /// Get the size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Get the number of columns of the image.
    pub fn cols(&self) -> usize {
        self.size.width
    }

    /// Get the number of rows of the image.
    pub fn rows(&self) -> usize {
        self.size.height
    }

    /// Get the width of the image in pixels.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the height of the image in pixels.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get the number of channels in the image.
    pub fn num_channels(&self) -> usize {
        CHANNELS
    }

    /// Whether the image holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Get the pixel data of the image in HWC order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Get the mutable pixel data of the image in HWC order.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the image and return its pixel data in HWC order.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    #[inline]
    fn offset(&self, x: usize, y: usize, ch: usize) -> usize {
        (y * self.size.width + x) * CHANNELS + ch
    }

    fn check_bounds(&self, x: usize, y: usize, ch: usize) -> Result<(), ImageError> {
        if x >= self.width() || y >= self.height() {
            return Err(ImageError::PixelIndexOutOfBounds(
                x,
                y,
                self.width(),
                self.height(),
            ));
        }

        if ch >= CHANNELS {
            return Err(ImageError::ChannelIndexOutOfBounds(ch, CHANNELS));
        }

        Ok(())
    }

    /// Get a reference to a pixel value.
    ///
    /// # Arguments
    ///
    /// * `x` - The x-coordinate of the pixel.
    /// * `y` - The y-coordinate of the pixel.
    /// * `ch` - The channel index of the pixel.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinates or the channel are out of bounds.
    pub fn get_pixel(&self, x: usize, y: usize, ch: usize) -> Result<&T, ImageError> {
        self.check_bounds(x, y, ch)?;
        Ok(&self.data[self.offset(x, y, ch)])
    }

    /// Set a pixel value.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinates or the channel are out of bounds.
    pub fn set_pixel(&mut self, x: usize, y: usize, ch: usize, val: T) -> Result<(), ImageError> {
        self.check_bounds(x, y, ch)?;
        let offset = self.offset(x, y, ch);
        self.data[offset] = val;
        Ok(())
    }

    /// Read a pixel with coordinates clamped to the image border.
    ///
    /// Every sampler in the workspace goes through this policy: a coordinate
    /// outside the image reads the nearest valid pixel, it never wraps.
    ///
    /// # Panics
    ///
    /// Panics if the image is empty or `ch >= CHANNELS`.
    #[inline]
    pub fn get_pixel_clamped(&self, x: isize, y: isize, ch: usize) -> T
    where
        T: Copy,
    {
        let xc = x.clamp(0, self.width() as isize - 1) as usize;
        let yc = y.clamp(0, self.height() as isize - 1) as usize;
        self.data[self.offset(xc, yc, ch)]
    }

    /// Get a channel of the image.
    ///
    /// # Errors
    ///
    /// If the channel index is out of bounds, an error is returned.
    pub fn channel(&self, channel: usize) -> Result<Image<T, 1>, ImageError>
    where
        T: Clone,
    {
        if channel >= CHANNELS {
            return Err(ImageError::ChannelIndexOutOfBounds(channel, CHANNELS));
        }

        let channel_data = self
            .data
            .iter()
            .skip(channel)
            .step_by(CHANNELS)
            .cloned()
            .collect();

        Image::new(self.size(), channel_data)
    }

    /// Split the image into its channels.
    ///
    /// # Examples
    ///
    /// ```
    /// use varflow_image::{Image, ImageSize};
    ///
    /// let image = Image::<f32, 2>::from_size_val(
    ///   ImageSize {
    ///    width: 10,
    ///   height: 20,
    /// },
    /// 0.0f32).unwrap();
    ///
    /// let channels = image.split_channels().unwrap();
    /// assert_eq!(channels.len(), 2);
    /// ```
    pub fn split_channels(&self) -> Result<Vec<Image<T, 1>>, ImageError>
    where
        T: Clone,
    {
        (0..CHANNELS).map(|i| self.channel(i)).collect()
    }

    /// Interleave single channel images into one multi-channel image.
    ///
    /// # Errors
    ///
    /// Fails if the planes do not share a size.
    pub fn from_channels(channels: &[Image<T, 1>; CHANNELS]) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let size = match channels.first() {
            Some(ch) => ch.size(),
            None => return Err(ImageError::ZeroChannels),
        };

        if let Some(bad) = channels.iter().find(|ch| ch.size() != size) {
            return Err(ImageError::InvalidImageSize(
                size.width,
                size.height,
                bad.width(),
                bad.height(),
            ));
        }

        let mut data = Vec::with_capacity(size.num_pixels() * CHANNELS);
        for i in 0..size.num_pixels() {
            for ch in channels.iter() {
                data.push(ch.data[i].clone());
            }
        }

        Image::new(size, data)
    }

    /// Cast the pixel data to a different type and scale it.
    ///
    /// # Errors
    ///
    /// If the pixel data cannot be cast to the new type, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use varflow_image::{Image, ImageSize};
    ///
    /// let data = vec![0u8, 0, 255, 0, 0, 255];
    ///
    /// let image_u8 = Image::<u8, 3>::new(
    /// ImageSize {
    ///   height: 2,
    ///   width: 1,
    /// },
    /// data,
    /// ).unwrap();
    ///
    /// let image_f32 = image_u8.cast_and_scale::<f32>(1. / 255.0).unwrap();
    ///
    /// assert_eq!(image_f32.get_pixel(0, 1, 2).unwrap(), &1.0f32);
    /// ```
    pub fn cast_and_scale<U>(&self, scale: U) -> Result<Image<U, CHANNELS>, ImageError>
    where
        U: num_traits::NumCast + std::ops::Mul<Output = U> + Copy,
        T: num_traits::NumCast + Copy,
    {
        let casted_data = self
            .data
            .iter()
            .map(|&x| {
                let xu = U::from(x).ok_or_else(|| {
                    ImageError::CastError(std::any::type_name::<U>().to_string())
                })?;
                Ok(xu * scale)
            })
            .collect::<Result<Vec<U>, ImageError>>()?;

        Image::new(self.size(), casted_data)
    }
}

#[cfg(test)]
mod tests {
    use crate::image::{Image, ImageError, ImageSize};

    #[test]
    fn image_size() {
        let image_size = ImageSize {
            width: 10,
            height: 20,
        };
        assert_eq!(image_size.width, 10);
        assert_eq!(image_size.height, 20);
        assert_eq!(image_size.num_pixels(), 200);
        assert!(!image_size.is_empty());
    }

    #[test]
    fn image_smoke() -> Result<(), ImageError> {
        let image = Image::<u8, 3>::new(
            ImageSize {
                width: 10,
                height: 20,
            },
            vec![0u8; 10 * 20 * 3],
        )?;
        assert_eq!(image.size().width, 10);
        assert_eq!(image.size().height, 20);
        assert_eq!(image.num_channels(), 3);

        Ok(())
    }

    #[test]
    fn image_wrong_length() {
        let res = Image::<f32, 2>::new([2, 2].into(), vec![0.0; 7]);
        assert_eq!(res, Err(ImageError::InvalidChannelShape(7, 8)));
    }

    #[test]
    fn image_zero_channels() {
        let res = Image::<f32, 0>::new([2, 2].into(), vec![]);
        assert_eq!(res, Err(ImageError::ZeroChannels));
    }

    #[test]
    fn image_hwc_layout() -> Result<(), ImageError> {
        let image = Image::<f32, 2>::from_fn([3, 2].into(), |x, y, c| {
            (100 * y + 10 * x + c) as f32
        })?;
        // (y * width + x) * C + c = (3 + 2) * 2 + 1
        assert_eq!(image.as_slice()[11], 121.0);
        assert_eq!(image.get_pixel(2, 1, 1)?, &121.0);
        Ok(())
    }

    #[test]
    fn image_get_set_bounds() -> Result<(), ImageError> {
        let mut image = Image::<f32, 1>::from_size_val([2, 3].into(), 0.0)?;
        image.set_pixel(1, 2, 0, 5.0)?;
        assert_eq!(image.get_pixel(1, 2, 0)?, &5.0);
        assert_eq!(
            image.get_pixel(2, 0, 0),
            Err(ImageError::PixelIndexOutOfBounds(2, 0, 2, 3))
        );
        assert_eq!(
            image.set_pixel(0, 0, 1, 1.0),
            Err(ImageError::ChannelIndexOutOfBounds(1, 1))
        );
        Ok(())
    }

    #[test]
    fn image_clamped_reads() -> Result<(), ImageError> {
        #[rustfmt::skip]
        let image = Image::<f32, 1>::new(
            [3, 2].into(),
            vec![
                0.0, 1.0, 2.0,
                3.0, 4.0, 5.0,
            ],
        )?;
        assert_eq!(image.get_pixel_clamped(-4, -1, 0), 0.0);
        assert_eq!(image.get_pixel_clamped(7, 0, 0), 2.0);
        assert_eq!(image.get_pixel_clamped(1, 9, 0), 4.0);
        assert_eq!(image.get_pixel_clamped(5, 5, 0), 5.0);
        Ok(())
    }

    #[test]
    fn image_cast_and_scale() -> Result<(), ImageError> {
        let image_u8 = Image::<u8, 1>::new([2, 1].into(), vec![0, 255])?;
        let image_f32 = image_u8.cast_and_scale(1.0f32 / 255.0)?;
        assert_eq!(image_f32.as_slice(), &[0.0, 1.0]);
        Ok(())
    }

    #[test]
    fn image_channel() -> Result<(), ImageError> {
        let image = Image::<f32, 3>::new(
            ImageSize {
                height: 2,
                width: 1,
            },
            vec![0., 1., 2., 3., 4., 5.],
        )?;

        let channel = image.channel(2)?;
        assert_eq!(channel.get_pixel(0, 1, 0)?, &5.0f32);
        assert!(image.channel(3).is_err());

        Ok(())
    }

    #[test]
    fn image_split_and_merge_channels() -> Result<(), ImageError> {
        let image = Image::<f32, 3>::new(
            ImageSize {
                height: 2,
                width: 1,
            },
            vec![0., 1., 2., 3., 4., 5.],
        )?;
        let channels = image.split_channels()?;
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].as_slice(), &[0.0, 3.0]);
        assert_eq!(channels[1].as_slice(), &[1.0, 4.0]);
        assert_eq!(channels[2].as_slice(), &[2.0, 5.0]);

        let planes: [Image<f32, 1>; 3] = [
            channels[0].clone(),
            channels[1].clone(),
            channels[2].clone(),
        ];
        let merged = Image::<f32, 3>::from_channels(&planes)?;
        assert_eq!(merged, image);

        Ok(())
    }
}
