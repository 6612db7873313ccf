//! Grid geometry: tile sizing, cropping to whole cells and row-major partitioning

use std::fmt;
use std::str::FromStr;

use crate::io::configuration::MAX_TILE_DIMENSION;
use crate::io::error::{MosaicError, Result, invalid_parameter};
use crate::spatial::buffer::{CHANNELS, Descriptor, PixelBuffer};

/// Pixel dimensions shared by every tile and grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileSize {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
}

impl TileSize {
    /// Create a tile size
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Create a square tile size
    pub const fn square(side: usize) -> Self {
        Self::new(side, side)
    }

    /// Shape of a tile buffer as (height, width, channels)
    pub const fn shape(&self) -> [usize; 3] {
        [self.height, self.width, CHANNELS]
    }

    /// Check both dimensions are non-zero and within [`MAX_TILE_DIMENSION`]
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::InvalidParameter`] naming the offending size
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid_parameter(
                "tile_size",
                self,
                &"dimensions must be positive",
            ));
        }
        if self.width > MAX_TILE_DIMENSION || self.height > MAX_TILE_DIMENSION {
            return Err(invalid_parameter(
                "tile_size",
                self,
                &format!("dimensions must not exceed {MAX_TILE_DIMENSION}"),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for TileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for TileSize {
    type Err = MosaicError;

    /// Parses `N` (square) or `WxH`
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| invalid_parameter("tile_size", &s, &e))
        };
        let size = match s.split_once(['x', 'X']) {
            Some((width, height)) => Self::new(parse(width)?, parse(height)?),
            None => Self::square(parse(s)?),
        };
        size.validate()?;
        Ok(size)
    }
}

/// Integer grid fitted over a master image
///
/// Any pixels beyond a whole number of cells on the right or bottom edge are
/// cropped, never stretched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// Number of cell rows
    pub rows: usize,
    /// Number of cell columns
    pub cols: usize,
    /// Size of each cell
    pub tile_size: TileSize,
}

impl GridLayout {
    /// Fit the largest whole grid of `tile_size` cells inside `width` x `height`
    ///
    /// # Errors
    ///
    /// Returns an error if the tile size is invalid or larger than the image
    pub fn fit(width: usize, height: usize, tile_size: TileSize) -> Result<Self> {
        tile_size.validate()?;
        let cols = width / tile_size.width;
        let rows = height / tile_size.height;
        if rows == 0 || cols == 0 {
            return Err(invalid_parameter(
                "tile_size",
                &tile_size,
                &format!("larger than the {width}x{height} master"),
            ));
        }
        Ok(Self {
            rows,
            cols,
            tile_size,
        })
    }

    /// Total number of cells
    pub const fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Width of the assembled mosaic
    pub const fn output_width(&self) -> usize {
        self.cols * self.tile_size.width
    }

    /// Height of the assembled mosaic
    pub const fn output_height(&self) -> usize {
        self.rows * self.tile_size.height
    }

    /// Top-left pixel of a cell as (top, left)
    pub const fn cell_origin(&self, row: usize, col: usize) -> (usize, usize) {
        (row * self.tile_size.height, col * self.tile_size.width)
    }

    /// Cell positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| (row, col)))
    }
}

/// One rectangular region of the master with its descriptor
#[derive(Debug, Clone)]
pub struct GridCell {
    /// Cell row
    pub row: usize,
    /// Cell column
    pub col: usize,
    /// Top pixel of the region in the master
    pub top: usize,
    /// Left pixel of the region in the master
    pub left: usize,
    descriptor: Descriptor,
}

impl GridCell {
    /// Descriptor of the cell's pixels
    pub const fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

/// Split a buffer into the cells of `layout`, in row-major order
///
/// # Errors
///
/// Returns an error if the layout does not fit inside the buffer
pub fn partition(buffer: &PixelBuffer, layout: &GridLayout) -> Result<Vec<GridCell>> {
    let TileSize { width, height } = layout.tile_size;
    layout
        .positions()
        .map(|(row, col)| {
            let (top, left) = layout.cell_origin(row, col);
            let pixels = buffer.region(top, left, height, width)?;
            Ok(GridCell {
                row,
                col,
                top,
                left,
                descriptor: Descriptor::new(pixels),
            })
        })
        .collect()
}
