//! Grid partitioning, cell-to-tile matching and mosaic assembly
//!
//! A build moves through `Configured -> Partitioned -> Matched -> Assembled`.
//! Each step checks the stage it requires, so calling them out of order is an
//! error rather than a silently wrong mosaic. Cells are always visited in
//! row-major order, which fixes tie-breaks and reuse-limit effects for a given
//! set of inputs.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::RgbImage;

use crate::colour::space::ColourSpace;
use crate::io::error::{MosaicError, Result, WithContext, computation_error, shape_mismatch};
use crate::io::image::export_image;
use crate::metrics::registry::Metric;
use crate::mosaic::master::Master;
use crate::mosaic::pool::{Pool, TileId};
use crate::spatial::buffer::PixelBuffer;
use crate::spatial::cell::{GridCell, GridLayout, TileSize, partition};

/// Progress of a single mosaic build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// Inputs are set, nothing computed
    Configured,
    /// Cells and their descriptors exist
    Partitioned,
    /// Every cell has a tile
    Matched,
    /// The mosaic has been produced
    Assembled,
}

impl BuildStage {
    /// Lower-case stage name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::Partitioned => "partitioned",
            Self::Matched => "matched",
            Self::Assembled => "assembled",
        }
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sizing and reuse parameters of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    /// Size of every cell and tile
    pub tile_size: TileSize,
    /// Maximum selections per tile, 0 for unlimited
    pub max_repeats: usize,
}

/// The tile chosen for one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Assignment {
    /// Cell row
    pub row: usize,
    /// Cell column
    pub col: usize,
    /// Selected tile
    pub tile: TileId,
}

/// An assembled mosaic
#[derive(Debug, Clone, PartialEq)]
pub struct Mosaic {
    pixels: PixelBuffer,
    layout: GridLayout,
}

impl Mosaic {
    /// Assembled pixels in the build's colour space
    pub const fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Grid the mosaic was assembled on
    pub const fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// Colour space of the pixels
    pub const fn space(&self) -> ColourSpace {
        self.pixels.space()
    }

    /// A copy converted back to RGB
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::InvalidConversion`] if already RGB
    pub fn to_rgb(&self) -> Result<Self> {
        Ok(Self {
            pixels: self.pixels.to_rgb()?,
            layout: self.layout,
        })
    }

    /// Encode as an 8-bit RGB image, converting from UCS first if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the pixels cannot be encoded
    pub fn to_image(&self) -> Result<RgbImage> {
        match self.space() {
            ColourSpace::Rgb => self.pixels.to_rgb_image(),
            ColourSpace::Ucs => self.pixels.to_rgb()?.to_rgb_image(),
        }
    }

    /// Encode and write to `output_path`
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails
    pub fn save(&self, output_path: impl AsRef<Path>) -> Result<()> {
        export_image(&self.to_image()?, output_path.as_ref())
    }
}

/// Drives one mosaic build over a master, a pool and a metric
pub struct MosaicGrid {
    master: Master,
    pool: Pool,
    metric: Arc<dyn Metric>,
    config: GridConfig,
    layout: GridLayout,
    stage: BuildStage,
    cells: Vec<GridCell>,
    assignments: Vec<Assignment>,
}

impl MosaicGrid {
    /// Configure a build
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The pool's tile size differs from `config.tile_size`
    /// - The master and pool are in different colour spaces
    /// - The tile size is invalid or larger than the master
    pub fn new(
        master: Master,
        pool: Pool,
        metric: Arc<dyn Metric>,
        config: GridConfig,
    ) -> Result<Self> {
        if pool.tile_size() != config.tile_size {
            return Err(shape_mismatch(
                &pool.tile_size().shape(),
                &config.tile_size.shape(),
            ));
        }
        if pool.space() != master.space() {
            return Err(MosaicError::ColourSpaceMismatch {
                expected: master.space(),
                found: pool.space(),
            });
        }
        let layout = GridLayout::fit(master.width(), master.height(), config.tile_size)?;
        Ok(Self {
            master,
            pool,
            metric,
            config,
            layout,
            stage: BuildStage::Configured,
            cells: Vec::new(),
            assignments: Vec::new(),
        })
    }

    /// Current stage
    pub const fn stage(&self) -> BuildStage {
        self.stage
    }

    /// Grid fitted over the master
    pub const fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Build parameters
    pub const fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Colour space the build compares in
    pub const fn space(&self) -> ColourSpace {
        self.master.space()
    }

    /// Target image
    pub const fn master(&self) -> &Master {
        &self.master
    }

    /// Tile pool, including its reuse counters
    pub const fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Cells in row-major order; empty before partitioning
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Assignments made so far, in row-major order
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Cells still waiting for a tile
    pub fn remaining(&self) -> usize {
        self.cells.len().saturating_sub(self.assignments.len())
    }

    fn require(&self, operation: &'static str, expected: BuildStage) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(MosaicError::InvalidStage {
                operation,
                expected: expected.name(),
                actual: self.stage.name(),
            })
        }
    }

    /// Split the master into cells, cropping any partial row or column
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::InvalidStage`] unless the grid is configured
    pub fn partition(&mut self) -> Result<&[GridCell]> {
        self.require("partition", BuildStage::Configured)?;
        self.cells = partition(self.master.pixels(), &self.layout)?;
        self.assignments = Vec::with_capacity(self.cells.len());
        self.stage = BuildStage::Partitioned;
        tracing::info!(
            rows = self.layout.rows,
            cols = self.layout.cols,
            cropped_width = self.master.width() - self.layout.output_width(),
            cropped_height = self.master.height() - self.layout.output_height(),
            "master partitioned"
        );
        Ok(&self.cells)
    }

    /// Match the next cell in row-major order
    ///
    /// Returns whether any cells remain unmatched; the grid becomes
    /// [`BuildStage::Matched`] once none do.
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::InvalidStage`] unless the grid is partitioned, or
    /// [`MosaicError::EmptyPool`] carrying the cell if no tile is eligible
    pub fn match_next(&mut self) -> Result<bool> {
        self.require("match cells", BuildStage::Partitioned)?;
        let space = self.space();
        if let Some(cell) = self.cells.get(self.assignments.len()) {
            let tile = self
                .pool
                .best_match(
                    cell.descriptor(),
                    self.metric.as_ref(),
                    space,
                    self.config.max_repeats,
                )
                .with_cell(cell.row, cell.col)?;
            self.assignments.push(Assignment {
                row: cell.row,
                col: cell.col,
                tile,
            });
        }

        if self.remaining() > 0 {
            return Ok(true);
        }
        self.stage = BuildStage::Matched;
        let distinct: HashSet<TileId> = self.assignments.iter().map(|a| a.tile).collect();
        tracing::info!(
            cells = self.assignments.len(),
            distinct_tiles = distinct.len(),
            "cells matched"
        );
        Ok(false)
    }

    /// Match every remaining cell
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::InvalidStage`] unless the grid is partitioned, or
    /// [`MosaicError::EmptyPool`] carrying the first cell that found no tile
    pub fn match_cells(&mut self) -> Result<&[Assignment]> {
        while self.match_next()? {}
        Ok(&self.assignments)
    }

    /// Copy every assigned tile into a freshly allocated mosaic
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::InvalidStage`] unless every cell is matched
    pub fn assemble(&mut self) -> Result<Mosaic> {
        self.require("assemble", BuildStage::Matched)?;
        let mut pixels = PixelBuffer::filled(
            self.layout.output_height(),
            self.layout.output_width(),
            [0.0; 3],
            self.space(),
        );
        for assignment in &self.assignments {
            let tile = self.pool.tile(assignment.tile).ok_or_else(|| {
                computation_error("assemble", &format!("unknown tile {}", assignment.tile.0))
            })?;
            let (top, left) = self.layout.cell_origin(assignment.row, assignment.col);
            pixels.paste(top, left, tile.pixels())?;
        }
        self.stage = BuildStage::Assembled;
        tracing::info!(
            width = pixels.width(),
            height = pixels.height(),
            "mosaic assembled"
        );
        Ok(Mosaic {
            pixels,
            layout: self.layout,
        })
    }

    /// Run partition, matching and assembly from a configured grid
    ///
    /// # Errors
    ///
    /// Propagates the first error of any stage
    pub fn build(&mut self) -> Result<Mosaic> {
        self.partition()?;
        self.match_cells()?;
        self.assemble()
    }

    /// Return to [`BuildStage::Configured`], clearing cells, assignments and pool usage
    pub fn reset(&mut self) {
        self.cells.clear();
        self.assignments.clear();
        self.pool.reset_usage();
        self.stage = BuildStage::Configured;
    }
}

impl fmt::Debug for MosaicGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MosaicGrid")
            .field("layout", &self.layout)
            .field("config", &self.config)
            .field("stage", &self.stage)
            .field("tiles", &self.pool.len())
            .field("assignments", &self.assignments.len())
            .finish_non_exhaustive()
    }
}
