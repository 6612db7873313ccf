//! Spatial data structures
//!
//! This module contains spatial-related functionality including:
//! - Colour-tagged pixel buffers and descriptors
//! - Tile sizing and grid partitioning

/// Pixel buffers and descriptors
pub mod buffer;
/// Grid geometry and cells
pub mod cell;
