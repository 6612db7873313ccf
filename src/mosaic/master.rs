//! The target image a mosaic reconstructs

use std::path::Path;

use image::DynamicImage;

use crate::colour::palette::{Cdf, Palette};
use crate::colour::space::ColourSpace;
use crate::io::error::Result;
use crate::io::image::decode_file;
use crate::spatial::buffer::PixelBuffer;

/// Target image: a tagged pixel buffer plus its source dimensions
///
/// Space conversions and histogram matching return new masters; the pixels
/// of an existing master are never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Master {
    pixels: PixelBuffer,
}

impl Master {
    /// Decode an image file into an RGB master
    ///
    /// # Errors
    ///
    /// Returns [`crate::MosaicError::Decode`] naming `path` if it cannot be read or decoded
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let image = decode_file(path.as_ref())?;
        Self::from_image(&image)
    }

    /// Build an RGB master from a decoded image of any channel layout
    ///
    /// # Errors
    ///
    /// Returns an error if the pixel data cannot be reshaped
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        Ok(Self {
            pixels: PixelBuffer::from_image(image)?,
        })
    }

    /// Wrap an existing buffer
    pub const fn from_buffer(pixels: PixelBuffer) -> Self {
        Self { pixels }
    }

    /// Pixels of the master
    pub const fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// Current colour space
    pub const fn space(&self) -> ColourSpace {
        self.pixels.space()
    }

    /// A copy of this master in the uniform colour space
    ///
    /// # Errors
    ///
    /// Returns [`crate::MosaicError::InvalidConversion`] if already UCS
    pub fn to_ucs(&self) -> Result<Self> {
        Ok(Self {
            pixels: self.pixels.to_ucs()?,
        })
    }

    /// A copy of this master in RGB
    ///
    /// # Errors
    ///
    /// Returns [`crate::MosaicError::InvalidConversion`] if already RGB
    pub fn to_rgb(&self) -> Result<Self> {
        Ok(Self {
            pixels: self.pixels.to_rgb()?,
        })
    }

    /// Per-channel 256-bin histogram of the current pixels
    pub fn palette(&self) -> Palette {
        Palette::from_buffer(&self.pixels)
    }

    /// Per-channel cumulative distributions of the current pixels
    pub fn cdfs(&self) -> Cdf {
        self.palette().cdfs()
    }

    /// Remap each channel so its distribution follows `reference`
    ///
    /// Every pixel is quantised to its histogram level, sent through the
    /// CDF-matching lookup table and placed back at the centre of the new level.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MosaicError::ColourSpaceMismatch`] if `reference` was
    /// taken in another space
    pub fn match_histogram(&self, reference: &Palette) -> Result<Self> {
        let space = self.space();
        let lut = self.cdfs().matching_lut(&reference.cdfs())?;
        let remap = |pixel: [f64; 3]| {
            let mut out = pixel;
            for (channel, value) in out.iter_mut().enumerate() {
                let level = space.quantize(channel, *value);
                if let Some(&mapped) = lut.get((channel, level)) {
                    *value = space.dequantize(channel, mapped);
                }
            }
            out
        };
        tracing::debug!(%space, "matched master histogram to reference palette");
        Ok(Self {
            pixels: self.pixels.map_pixels(remap, space),
        })
    }

    /// Write a histogram chart of the master's palette
    ///
    /// # Errors
    ///
    /// Returns an error if the chart cannot be written
    pub fn plot(&self, output_path: impl AsRef<Path>) -> Result<()> {
        self.palette().plot(output_path)
    }
}
