//! Mosaic constants and runtime configuration defaults

use crate::colour::space::ColourSpace;
use crate::io::error::{Result, invalid_parameter};
use crate::metrics::builtin::NORM;
use crate::spatial::cell::TileSize;

/// Default edge length of square tiles, in pixels
pub const DEFAULT_TILE_SIDE: usize = 32;

/// Default metric name
pub const DEFAULT_METRIC: &str = NORM;

/// Default reuse limit (0 = unlimited)
pub const DEFAULT_MAX_REPEATS: usize = 0;

// Keeps a single tile buffer well inside memory limits
/// Maximum allowed tile dimension
pub const MAX_TILE_DIMENSION: usize = 4096;

// Progress bar display settings
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;
/// Cells matched between progress bar redraws
pub const PROGRESS_UPDATE_INTERVAL: usize = 16;

// Output settings
/// Suffix added to output filenames
pub const OUTPUT_SUFFIX: &str = "_mosaic";
/// Delay between GIF animation frames
pub const GIF_FRAME_DELAY_MS: u32 = 40;
/// Minimum frame delay that viewers reliably support (in milliseconds)
pub const VIEWER_MIN_FRAME_DELAY_MS: u32 = 20;
/// Upper bound on intermediate frames in a build animation
pub const MAX_GIF_FRAMES: usize = 120;
/// Brightness factor applied to the master behind a build animation
pub const BUILD_BACKGROUND_DIM: f64 = 0.35;

// Palette chart layout
/// Horizontal pixels per histogram level
pub const PLOT_BIN_WIDTH: usize = 2;
/// Vertical pixels per channel panel
pub const PLOT_CHANNEL_HEIGHT: usize = 120;

/// Options the mosaic core consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosaicConfig {
    /// Registered metric name
    pub metric: String,
    /// Size of every tile and grid cell
    pub tile_size: TileSize,
    /// Maximum selections per tile, 0 for unlimited
    pub max_repeats: usize,
    /// Space in which distances are measured
    pub colour_space: ColourSpace,
    /// Remap the master's histogram onto the pool's before matching
    pub match_histogram: bool,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            metric: DEFAULT_METRIC.to_string(),
            tile_size: TileSize::square(DEFAULT_TILE_SIDE),
            max_repeats: DEFAULT_MAX_REPEATS,
            colour_space: ColourSpace::Rgb,
            match_histogram: false,
        }
    }
}

impl MosaicConfig {
    /// Check the options are usable
    ///
    /// Metric names are resolved later against a registry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MosaicError::InvalidParameter`] for an empty metric name
    /// or an invalid tile size
    pub fn validate(&self) -> Result<()> {
        if self.metric.trim().is_empty() {
            return Err(invalid_parameter(
                "metric",
                &self.metric,
                &"metric name must not be empty",
            ));
        }
        self.tile_size.validate()
    }
}
