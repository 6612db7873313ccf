/// Built-in greyscale, norm and L*u*v* approximation metrics
pub mod builtin;
/// Metric trait and named registry
pub mod registry;
