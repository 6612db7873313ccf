//! Named lookup of distance metrics
//!
//! Built-ins are registered once into a process-wide table on first use; the
//! table is never mutated afterwards, so concurrent lookups need no locking.
//! Callers wanting custom metrics build their own registry on top of the
//! built-ins and pass it explicitly.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use ndarray::ArrayView3;

use crate::io::error::{MosaicError, Result, computation_error, shape_mismatch};
use crate::metrics::builtin::{GREYSCALE, Greyscale, LUV_APPROX, LuvApprox, NORM, Norm};
use crate::spatial::buffer::{ChannelSummary, Descriptor};

/// A colour distance between two equally shaped pixel arrays
///
/// Lower is more similar; implementations must return a non-negative value and
/// must not depend on anything but their operands.
pub trait Metric: Send + Sync {
    /// Distance between a tile descriptor and a cell descriptor
    fn distance(&self, tile: ArrayView3<'_, f64>, cell: ArrayView3<'_, f64>) -> f64;

    /// A value never greater than [`Metric::distance`] for operands with these summaries
    ///
    /// Used only to skip tiles that cannot beat the current best match, so it
    /// must be a true lower bound. The default offers none.
    fn lower_bound(&self, _tile: &ChannelSummary, _cell: &ChannelSummary) -> Option<f64> {
        None
    }
}

/// Adapts a plain function or closure into a [`Metric`]
pub struct FnMetric<F>(F);

impl<F> FnMetric<F> {
    /// Wrap a distance function
    pub const fn new(function: F) -> Self {
        Self(function)
    }
}

impl<F> Metric for FnMetric<F>
where
    F: Fn(ArrayView3<'_, f64>, ArrayView3<'_, f64>) -> f64 + Send + Sync,
{
    fn distance(&self, tile: ArrayView3<'_, f64>, cell: ArrayView3<'_, f64>) -> f64 {
        (self.0)(tile, cell)
    }
}

/// Apply a metric to two descriptors after checking they are comparable
///
/// # Errors
///
/// Returns an error if the descriptors differ in colour space or shape, or if
/// the metric produces a NaN or negative distance
pub fn measure(metric: &dyn Metric, tile: &Descriptor, cell: &Descriptor) -> Result<f64> {
    if tile.space() != cell.space() {
        return Err(MosaicError::ColourSpaceMismatch {
            expected: cell.space(),
            found: tile.space(),
        });
    }
    if tile.shape() != cell.shape() {
        return Err(shape_mismatch(&tile.shape(), &cell.shape()));
    }
    let distance = metric.distance(tile.view(), cell.view());
    if distance.is_nan() {
        return Err(computation_error("metric distance", &"metric returned NaN"));
    }
    if distance < 0.0 {
        return Err(computation_error(
            "metric distance",
            &format!("metric returned negative distance {distance}"),
        ));
    }
    Ok(distance)
}

/// Metrics keyed by name
#[derive(Clone, Default)]
pub struct MetricRegistry {
    metrics: BTreeMap<String, Arc<dyn Metric>>,
}

static BUILTIN: LazyLock<MetricRegistry> = LazyLock::new(MetricRegistry::with_builtins);

/// The process-wide registry holding the built-in metrics
pub fn builtin() -> &'static MetricRegistry {
    &BUILTIN
}

impl MetricRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `greyscale`, `norm` and `luv_approx`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(GREYSCALE, Greyscale)
            .register(NORM, Norm::euclidean())
            .register(LUV_APPROX, LuvApprox);
        registry
    }

    /// Add or replace a metric
    pub fn register(&mut self, name: impl Into<String>, metric: impl Metric + 'static) -> &mut Self {
        self.metrics.insert(name.into(), Arc::new(metric));
        self
    }

    /// Add or replace a metric given as a function
    pub fn register_fn<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(ArrayView3<'_, f64>, ArrayView3<'_, f64>) -> f64 + Send + Sync + 'static,
    {
        self.register(name, FnMetric(function))
    }

    /// Look up a metric by name
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::UnknownMetric`] if nothing is registered under `name`
    pub fn get(&self, name: &str) -> Result<Arc<dyn Metric>> {
        self.metrics
            .get(name)
            .cloned()
            .ok_or_else(|| MosaicError::UnknownMetric {
                name: name.to_string(),
            })
    }

    /// Whether a metric is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
