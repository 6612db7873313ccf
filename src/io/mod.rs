/// Command-line interface and build orchestration
pub mod cli;
/// Constants and the validated configuration surface
pub mod configuration;
/// Error taxonomy and context helpers
pub mod error;
/// Image decoding, export and discovery
pub mod image;
/// Terminal progress display
pub mod progress;
/// Palette charts and build animations
pub mod visualization;
