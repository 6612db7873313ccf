//! Per-channel histograms, cumulative distributions and histogram matching

use std::path::Path;

use ndarray::{Array2, ArrayView1, Axis};

use crate::colour::space::{ColourSpace, LEVELS};
use crate::io::error::{MosaicError, Result};
use crate::io::visualization::plot_palette;
use crate::spatial::buffer::{CHANNELS, PixelBuffer};

/// A 256-bin histogram per channel
///
/// Values are binned through [`ColourSpace::quantize`], so a palette can be
/// taken of a buffer in either space; palettes of different spaces never mix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    counts: Array2<u64>,
    space: ColourSpace,
}

impl Palette {
    /// A palette with no pixels counted
    pub fn empty(space: ColourSpace) -> Self {
        Self {
            counts: Array2::zeros((CHANNELS, LEVELS)),
            space,
        }
    }

    /// Histogram every pixel of a buffer
    pub fn from_buffer(buffer: &PixelBuffer) -> Self {
        let mut palette = Self::empty(buffer.space());
        palette.count_pixels(buffer);
        palette
    }

    // Callers guarantee `buffer` is in this palette's space
    pub(crate) fn count_pixels(&mut self, buffer: &PixelBuffer) {
        for lane in buffer.data().lanes(Axis(2)) {
            for (channel, &value) in lane.iter().enumerate() {
                let level = self.space.quantize(channel, value);
                if let Some(count) = self.counts.get_mut((channel, level)) {
                    *count += 1;
                }
            }
        }
    }

    /// Add another palette's counts into this one
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::ColourSpaceMismatch`] if the spaces differ
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if other.space != self.space {
            return Err(MosaicError::ColourSpaceMismatch {
                expected: self.space,
                found: other.space,
            });
        }
        self.counts += &other.counts;
        Ok(())
    }

    /// Colour space the histogram was taken in
    pub const fn space(&self) -> ColourSpace {
        self.space
    }

    /// Raw (channel, level) counts
    pub const fn counts(&self) -> &Array2<u64> {
        &self.counts
    }

    /// Histogram of a single channel
    pub fn channel(&self, channel: usize) -> Option<ArrayView1<'_, u64>> {
        (channel < CHANNELS).then(|| self.counts.row(channel))
    }

    /// Number of samples counted in a channel
    pub fn total(&self, channel: usize) -> u64 {
        self.channel(channel).map_or(0, |row| row.sum())
    }

    /// Cumulative distributions derived from this palette
    pub fn cdfs(&self) -> Cdf {
        let mut values = self.counts.clone();
        values.accumulate_axis_inplace(Axis(1), |&previous, current| *current += previous);
        Cdf {
            values,
            space: self.space,
        }
    }

    /// Draw the histogram as a PNG chart
    ///
    /// # Errors
    ///
    /// Returns an error if the chart cannot be written
    pub fn plot(&self, output_path: impl AsRef<Path>) -> Result<()> {
        plot_palette(self, output_path.as_ref())
    }
}

/// Non-decreasing cumulative counts per channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cdf {
    values: Array2<u64>,
    space: ColourSpace,
}

impl Cdf {
    /// Colour space of the underlying palette
    pub const fn space(&self) -> ColourSpace {
        self.space
    }

    /// Raw (channel, level) cumulative counts
    pub const fn values(&self) -> &Array2<u64> {
        &self.values
    }

    /// Cumulative counts of a single channel
    pub fn channel(&self, channel: usize) -> Option<ArrayView1<'_, u64>> {
        (channel < CHANNELS).then(|| self.values.row(channel))
    }

    /// Final cumulative count of a channel
    pub fn total(&self, channel: usize) -> u64 {
        self.channel(channel)
            .and_then(|row| row.last().copied())
            .unwrap_or(0)
    }

    /// Level lookup tables sending this distribution onto `reference`
    ///
    /// Each level maps to the lowest reference level whose cumulative share is
    /// at least the source level's cumulative share. A channel with no samples
    /// on either side maps to itself.
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::ColourSpaceMismatch`] if the spaces differ
    pub fn matching_lut(&self, reference: &Self) -> Result<Array2<usize>> {
        if reference.space != self.space {
            return Err(MosaicError::ColourSpaceMismatch {
                expected: self.space,
                found: reference.space,
            });
        }

        let mut lut = Array2::from_shape_fn((CHANNELS, LEVELS), |(_, level)| level);
        for (channel, mut mapping) in lut.outer_iter_mut().enumerate() {
            let (Some(source), Some(target)) = (self.channel(channel), reference.channel(channel))
            else {
                continue;
            };
            let source_total = u128::from(self.total(channel));
            let target_total = u128::from(reference.total(channel));
            if source_total == 0 || target_total == 0 {
                continue;
            }

            // Both sequences are non-decreasing, so the target cursor only advances
            let mut cursor = 0;
            for (dst, &count) in mapping.iter_mut().zip(source.iter()) {
                let wanted = u128::from(count) * target_total;
                while cursor < LEVELS - 1
                    && target
                        .get(cursor)
                        .is_some_and(|&t| u128::from(t) * source_total < wanted)
                {
                    cursor += 1;
                }
                *dst = cursor;
            }
        }
        Ok(lut)
    }
}
