//! The mosaic engine: target image, tile library and grid assembly

/// Cell partitioning, matching and assembly state machine
pub mod grid;
/// The target image
pub mod master;
/// The tile library with reuse accounting
pub mod pool;
