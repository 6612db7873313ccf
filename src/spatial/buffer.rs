//! Colour-tagged pixel buffers and the descriptors compared by metrics

use image::{DynamicImage, RgbImage};
use ndarray::{Array3, ArrayView3, Axis, Slice};

use crate::colour::space::{self, ColourSpace};
use crate::io::error::{MosaicError, Result, computation_error, invalid_parameter, shape_mismatch};

/// Number of channels every buffer carries
pub const CHANNELS: usize = 3;

/// A (height, width, 3) array of pixels tagged with its colour space
///
/// Single-channel and alpha-carrying sources are normalised to three channels
/// on ingestion, so the last axis always has length 3.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    data: Array3<f64>,
    space: ColourSpace,
}

impl PixelBuffer {
    /// Wrap an existing array
    ///
    /// # Errors
    ///
    /// Returns an error if the last axis does not hold exactly three channels
    pub fn new(data: Array3<f64>, space: ColourSpace) -> Result<Self> {
        let (height, width, channels) = data.dim();
        if channels != CHANNELS {
            return Err(shape_mismatch(&[height, width, channels], &[height, width, CHANNELS]));
        }
        Ok(Self { data, space })
    }

    /// A buffer where every pixel has the same value
    pub fn filled(height: usize, width: usize, pixel: [f64; 3], space: ColourSpace) -> Self {
        let mut data = Array3::zeros((height, width, CHANNELS));
        for mut lane in data.lanes_mut(Axis(2)) {
            lane.iter_mut().zip(pixel).for_each(|(dst, v)| *dst = v);
        }
        Self { data, space }
    }

    /// Build an RGB buffer from a decoded image of any channel layout
    ///
    /// Greyscale values are replicated across R, G and B; alpha is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoded pixel data cannot be reshaped
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        Self::from_rgb_image(&image.to_rgb8())
    }

    /// Build an RGB buffer from an 8-bit RGB image
    ///
    /// # Errors
    ///
    /// Returns an error if the pixel data cannot be reshaped
    pub fn from_rgb_image(image: &RgbImage) -> Result<Self> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let values = image.as_raw().iter().map(|&v| f64::from(v)).collect();
        let data = Array3::from_shape_vec((height, width, CHANNELS), values)
            .map_err(|e| computation_error("image ingestion", &e))?;
        Ok(Self {
            data,
            space: ColourSpace::Rgb,
        })
    }

    /// Encode an RGB buffer as an 8-bit image, rounding and clamping each channel
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is not RGB or its dimensions overflow `u32`
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        if self.space != ColourSpace::Rgb {
            return Err(MosaicError::ColourSpaceMismatch {
                expected: ColourSpace::Rgb,
                found: self.space,
            });
        }
        let width = u32::try_from(self.width())
            .map_err(|e| invalid_parameter("width", &self.width(), &e))?;
        let height = u32::try_from(self.height())
            .map_err(|e| invalid_parameter("height", &self.height(), &e))?;
        let bytes = self
            .data
            .iter()
            .map(|&v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        RgbImage::from_raw(width, height, bytes)
            .ok_or_else(|| computation_error("image encoding", &"buffer size mismatch"))
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.height() * self.width()
    }

    /// Shape as (height, width, channels)
    pub fn shape(&self) -> [usize; 3] {
        let (h, w, c) = self.data.dim();
        [h, w, c]
    }

    /// Colour space the values are expressed in
    pub const fn space(&self) -> ColourSpace {
        self.space
    }

    /// Underlying pixel array
    pub const fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Borrowed view of the pixel array
    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    /// Convert to the uniform colour space
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::InvalidConversion`] if already UCS
    pub fn to_ucs(&self) -> Result<Self> {
        space::to_ucs(self)
    }

    /// Convert back to RGB
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::InvalidConversion`] if already RGB
    pub fn to_rgb(&self) -> Result<Self> {
        space::to_rgb(self)
    }

    /// Apply a per-pixel transform, tagging the result with `space`
    pub(crate) fn map_pixels(&self, transform: impl Fn([f64; 3]) -> [f64; 3], space: ColourSpace) -> Self {
        let mut data = self.data.clone();
        for mut lane in data.lanes_mut(Axis(2)) {
            if let (Some(&r), Some(&g), Some(&b)) = (lane.get(0), lane.get(1), lane.get(2)) {
                let out = transform([r, g, b]);
                lane.iter_mut().zip(out).for_each(|(dst, v)| *dst = v);
            }
        }
        Self { data, space }
    }

    /// Copy out the rectangle starting at (`top`, `left`)
    ///
    /// # Errors
    ///
    /// Returns an error if the rectangle does not fit inside the buffer
    pub fn region(&self, top: usize, left: usize, height: usize, width: usize) -> Result<Self> {
        self.check_bounds(top, left, height, width)?;
        let data = self
            .data
            .slice_axis(Axis(0), Slice::from(top..top + height))
            .slice_axis(Axis(1), Slice::from(left..left + width))
            .to_owned();
        Ok(Self {
            data,
            space: self.space,
        })
    }

    /// Overwrite the rectangle at (`top`, `left`) with `source`
    ///
    /// # Errors
    ///
    /// Returns an error if the spaces differ or `source` does not fit
    pub fn paste(&mut self, top: usize, left: usize, source: &Self) -> Result<()> {
        if source.space != self.space {
            return Err(MosaicError::ColourSpaceMismatch {
                expected: self.space,
                found: source.space,
            });
        }
        self.check_bounds(top, left, source.height(), source.width())?;
        let mut target = self
            .data
            .slice_axis_mut(Axis(0), Slice::from(top..top + source.height()));
        target.slice_axis_inplace(Axis(1), Slice::from(left..left + source.width()));
        target.assign(&source.data);
        Ok(())
    }

    /// Per-channel sums over every pixel
    pub fn summary(&self) -> ChannelSummary {
        let mut sums = [0.0; CHANNELS];
        for lane in self.data.lanes(Axis(2)) {
            sums.iter_mut().zip(lane.iter()).for_each(|(s, v)| *s += v);
        }
        ChannelSummary {
            sums,
            pixels: self.pixel_count(),
        }
    }

    fn check_bounds(&self, top: usize, left: usize, height: usize, width: usize) -> Result<()> {
        let fits = top
            .checked_add(height)
            .is_some_and(|bottom| bottom <= self.height())
            && left
                .checked_add(width)
                .is_some_and(|right| right <= self.width());
        if fits {
            Ok(())
        } else {
            Err(invalid_parameter(
                "region",
                &format!("{height}x{width} at ({top}, {left})"),
                &format!("outside {}x{} buffer", self.height(), self.width()),
            ))
        }
    }
}

/// Per-channel sums of a buffer, cached for cheap lower-bound pruning
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelSummary {
    /// Sum of each channel over all pixels
    pub sums: [f64; 3],
    /// Number of pixels summed
    pub pixels: usize,
}

impl ChannelSummary {
    /// Sum of all channels over all pixels
    pub fn total(&self) -> f64 {
        self.sums.iter().sum()
    }

    /// Mean pixel
    pub fn mean(&self) -> [f64; 3] {
        let n = self.pixels.max(1) as f64;
        self.sums.map(|s| s / n)
    }
}

/// The reduced representation of a tile or grid cell that metrics compare
///
/// Holds the full cell-sized pixel buffer plus its channel summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pixels: PixelBuffer,
    summary: ChannelSummary,
}

impl Descriptor {
    /// Describe a buffer
    pub fn new(pixels: PixelBuffer) -> Self {
        let summary = pixels.summary();
        Self { pixels, summary }
    }

    /// Pixels being compared
    pub const fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Borrowed view of the pixels
    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.pixels.view()
    }

    /// Colour space of the described pixels
    pub const fn space(&self) -> ColourSpace {
        self.pixels.space()
    }

    /// Shape of the described pixels
    pub fn shape(&self) -> [usize; 3] {
        self.pixels.shape()
    }

    /// Cached channel sums
    pub const fn summary(&self) -> &ChannelSummary {
        &self.summary
    }

    /// Re-express the descriptor in the other colour space
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::InvalidConversion`] if already in `target`
    pub fn convert(&self, target: ColourSpace) -> Result<Self> {
        let pixels = match target {
            ColourSpace::Ucs => self.pixels.to_ucs()?,
            ColourSpace::Rgb => self.pixels.to_rgb()?,
        };
        Ok(Self::new(pixels))
    }
}
