//! Photomosaic assembly: rebuild a target image from a pool of small tile images
//!
//! The target (the [`mosaic::master::Master`]) is cut into a grid of cells, every
//! cell is compared against every eligible tile of a [`mosaic::pool::Pool`] under a
//! pluggable colour distance [`metrics::registry::Metric`], and the closest tiles
//! are copied into a new image. Distances can be measured in RGB or in a
//! perceptually uniform colour space, optionally after matching the target's
//! histogram to the pool's.

#![forbid(unsafe_code)]

/// Colour spaces, histograms and histogram matching
pub mod colour;
/// Input/output operations, configuration and error handling
pub mod io;
/// Colour distance metrics and their registry
pub mod metrics;
/// Master image, tile pool and the grid that assembles the mosaic
pub mod mosaic;
/// Pixel buffers, descriptors and grid geometry
pub mod spatial;

pub use io::error::{MosaicError, Result};
