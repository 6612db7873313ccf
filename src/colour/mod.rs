/// Per-channel histograms and cumulative distributions
pub mod palette;
/// Colour-space tags and RGB <-> UCS transforms
pub mod space;
