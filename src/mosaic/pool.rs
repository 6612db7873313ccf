//! The tile library and best-match search
//!
//! Tiles keep insertion order for their whole life: it is the order of the
//! search scan and therefore the tie-break. Each tile carries its own reuse
//! counter, owned by the pool, so separate builds never share state.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use image::imageops::FilterType;

use crate::colour::palette::Palette;
use crate::colour::space::ColourSpace;
use crate::io::error::{MosaicError, Result, invalid_parameter, shape_mismatch};
use crate::io::image::{decode_file, discover_images};
use crate::metrics::registry::{Metric, measure};
use crate::spatial::buffer::{Descriptor, PixelBuffer};
use crate::spatial::cell::TileSize;

/// Relative slack applied to lower bounds before pruning
///
/// Bounds and distances are summed in different orders, so a bound may exceed
/// the exact distance by a few ulps; pruning only past this margin keeps the
/// search identical to a full scan.
const PRUNE_TOLERANCE: f64 = 1e-9;

/// Position of a tile in its pool's insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub usize);

/// A candidate image resized to the cell dimensions
#[derive(Debug, Clone)]
pub struct Tile {
    source: String,
    descriptor: Descriptor,
    uses: usize,
}

impl Tile {
    /// Identifier of the image the tile came from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Cached descriptor compared against grid cells
    pub const fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Tile pixels
    pub const fn pixels(&self) -> &PixelBuffer {
        self.descriptor.pixels()
    }

    /// Times this tile has been selected since the last reset
    pub const fn uses(&self) -> usize {
        self.uses
    }
}

/// A tile source that was skipped during loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Identifier of the skipped source
    pub source: String,
    /// Why it was skipped
    pub reason: String,
}

/// Ordered collection of tiles sharing one size and colour space
#[derive(Debug, Clone)]
pub struct Pool {
    tiles: Vec<Tile>,
    tile_size: TileSize,
    space: ColourSpace,
    warnings: Vec<LoadWarning>,
}

impl Pool {
    /// An empty RGB pool
    ///
    /// # Errors
    ///
    /// Returns an error if `tile_size` is invalid
    pub fn new(tile_size: TileSize) -> Result<Self> {
        tile_size.validate()?;
        Ok(Self {
            tiles: Vec::new(),
            tile_size,
            space: ColourSpace::Rgb,
            warnings: Vec::new(),
        })
    }

    /// Decode and add every source, skipping those that fail
    ///
    /// A source that cannot be decoded is logged and recorded in
    /// [`Pool::warnings`] instead of failing the whole load.
    ///
    /// # Errors
    ///
    /// Returns an error only if `tile_size` is invalid
    pub fn load<P: AsRef<Path>>(sources: &[P], tile_size: TileSize) -> Result<Self> {
        let mut pool = Self::new(tile_size)?;
        for source in sources {
            let path = source.as_ref();
            let loaded = decode_file(path).and_then(|image| pool.push_image(path.display(), &image));
            if let Err(error) = loaded {
                pool.skip(path.display().to_string(), &error);
            }
        }
        tracing::info!(
            loaded = pool.len(),
            skipped = pool.warnings.len(),
            tile_size = %tile_size,
            "tile pool loaded"
        );
        Ok(pool)
    }

    /// Load every image file found directly inside `dir`, in path order
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or `tile_size` is invalid
    pub fn from_dir(dir: impl AsRef<Path>, tile_size: TileSize) -> Result<Self> {
        let sources: Vec<PathBuf> = discover_images(dir.as_ref())?;
        Self::load(&sources, tile_size)
    }

    /// Build a pool from already-decoded images
    ///
    /// # Errors
    ///
    /// Returns an error if `tile_size` is invalid
    pub fn from_images<I, S>(images: I, tile_size: TileSize) -> Result<Self>
    where
        I: IntoIterator<Item = (S, DynamicImage)>,
        S: Into<String>,
    {
        let mut pool = Self::new(tile_size)?;
        for (source, image) in images {
            let source = source.into();
            if let Err(error) = pool.push_image(&source, &image) {
                pool.skip(source, &error);
            }
        }
        Ok(pool)
    }

    /// Crop to the tile aspect ratio, resize and append an image
    ///
    /// The tile is converted to the pool's colour space.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is empty or cannot be ingested after resizing
    pub fn push_image(&mut self, source: impl ToString, image: &DynamicImage) -> Result<TileId> {
        if image.width() == 0 || image.height() == 0 {
            return Err(invalid_parameter(
                "tile image",
                &format!("{}x{}", image.width(), image.height()),
                &"has no pixels",
            ));
        }
        let width = u32::try_from(self.tile_size.width)
            .map_err(|e| invalid_parameter("tile_size", &self.tile_size, &e))?;
        let height = u32::try_from(self.tile_size.height)
            .map_err(|e| invalid_parameter("tile_size", &self.tile_size, &e))?;
        let resized = image.resize_to_fill(width, height, FilterType::Lanczos3);
        let mut pixels = PixelBuffer::from_image(&resized)?;
        if self.space == ColourSpace::Ucs {
            pixels = pixels.to_ucs()?;
        }
        self.push_buffer(source, pixels)
    }

    /// Append a tile from a buffer of exactly the tile size and pool space
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer's shape or colour space differs from the pool's
    pub fn push_buffer(&mut self, source: impl ToString, pixels: PixelBuffer) -> Result<TileId> {
        if pixels.space() != self.space {
            return Err(MosaicError::ColourSpaceMismatch {
                expected: self.space,
                found: pixels.space(),
            });
        }
        if pixels.shape() != self.tile_size.shape() {
            return Err(shape_mismatch(&pixels.shape(), &self.tile_size.shape()));
        }
        let id = TileId(self.tiles.len());
        self.tiles.push(Tile {
            source: source.to_string(),
            descriptor: Descriptor::new(pixels),
            uses: 0,
        });
        Ok(id)
    }

    fn skip(&mut self, source: String, error: &MosaicError) {
        tracing::warn!(source = %source, error = %error, "skipping tile");
        self.warnings.push(LoadWarning {
            source,
            reason: error.to_string(),
        });
    }

    /// Number of tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the pool holds no tiles
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tiles in insertion order
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Look up a tile
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.0)
    }

    /// Size shared by every tile
    pub const fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    /// Colour space shared by every tile
    pub const fn space(&self) -> ColourSpace {
        self.space
    }

    /// Sources skipped while loading
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// Times a tile has been selected, zero for unknown ids
    pub fn uses(&self, id: TileId) -> usize {
        self.tile(id).map_or(0, Tile::uses)
    }

    /// Clear every reuse counter
    pub fn reset_usage(&mut self) {
        self.tiles.iter_mut().for_each(|tile| tile.uses = 0);
    }

    /// A copy of this pool in the uniform colour space, counters preserved
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::InvalidConversion`] if already UCS
    pub fn to_ucs(&self) -> Result<Self> {
        self.convert(ColourSpace::Ucs)
    }

    /// A copy of this pool in RGB, counters preserved
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::InvalidConversion`] if already RGB
    pub fn to_rgb(&self) -> Result<Self> {
        self.convert(ColourSpace::Rgb)
    }

    fn convert(&self, target: ColourSpace) -> Result<Self> {
        if self.space == target {
            return Err(MosaicError::InvalidConversion {
                from: self.space,
                to: target,
            });
        }
        let tiles = self
            .tiles
            .iter()
            .map(|tile| {
                Ok(Tile {
                    source: tile.source.clone(),
                    descriptor: tile.descriptor.convert(target)?,
                    uses: tile.uses,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            tiles,
            tile_size: self.tile_size,
            space: target,
            warnings: self.warnings.clone(),
        })
    }

    /// Combined histogram of every tile
    pub fn palette(&self) -> Palette {
        let mut palette = Palette::empty(self.space);
        for tile in &self.tiles {
            palette.count_pixels(tile.pixels());
        }
        palette
    }

    /// Select the eligible tile closest to `cell` and count the selection
    ///
    /// Tiles whose reuse count has reached a positive `max_repeats` are
    /// ineligible; `max_repeats == 0` means unlimited reuse. Ties go to the
    /// earliest tile. Tiles whose metric lower bound strictly exceeds the best
    /// distance so far are skipped without changing the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if `cell` or the pool is not in `space`, if the cell
    /// shape differs from the tile shape, or [`MosaicError::EmptyPool`] if no
    /// tile is eligible
    pub fn best_match(
        &mut self,
        cell: &Descriptor,
        metric: &dyn Metric,
        space: ColourSpace,
        max_repeats: usize,
    ) -> Result<TileId> {
        for found in [self.space, cell.space()] {
            if found != space {
                return Err(MosaicError::ColourSpaceMismatch {
                    expected: space,
                    found,
                });
            }
        }
        if cell.shape() != self.tile_size.shape() {
            return Err(shape_mismatch(&self.tile_size.shape(), &cell.shape()));
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, tile) in self.tiles.iter().enumerate() {
            if max_repeats > 0 && tile.uses >= max_repeats {
                continue;
            }
            if let Some((_, best_distance)) = best {
                let bound = metric.lower_bound(tile.descriptor.summary(), cell.summary());
                let threshold = best_distance.mul_add(1.0 + PRUNE_TOLERANCE, PRUNE_TOLERANCE);
                if bound.is_some_and(|b| b > threshold) {
                    continue;
                }
            }
            let distance = measure(metric, &tile.descriptor, cell)?;
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((index, distance));
            }
        }

        let (index, distance) = best.ok_or_else(|| MosaicError::EmptyPool {
            cell: None,
            pool_size: self.tiles.len(),
        })?;
        if let Some(tile) = self.tiles.get_mut(index) {
            tile.uses += 1;
            tracing::trace!(tile = %tile.source, distance, uses = tile.uses, "tile selected");
        }
        Ok(TileId(index))
    }
}
