//! Built-in colour distance metrics
//!
//! All three treat their operands as (height, width, 3) arrays and reduce the
//! per-pixel differences to one non-negative scalar. None of them converts
//! colour spaces; callers compare descriptors already tagged with one space.

use ndarray::{ArrayView1, ArrayView3, Axis, Zip};

use crate::io::error::{Result, invalid_parameter};
use crate::metrics::registry::Metric;
use crate::spatial::buffer::{CHANNELS, ChannelSummary};

/// Registry name of [`Greyscale`]
pub const GREYSCALE: &str = "greyscale";
/// Registry name of [`Norm`]
pub const NORM: &str = "norm";
/// Registry name of [`LuvApprox`]
pub const LUV_APPROX: &str = "luv_approx";

/// Euclidean distance between per-pixel channel means
///
/// Collapses colour entirely and compares brightness only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Greyscale;

impl Metric for Greyscale {
    fn distance(&self, tile: ArrayView3<'_, f64>, cell: ArrayView3<'_, f64>) -> f64 {
        tile.lanes(Axis(2))
            .into_iter()
            .zip(cell.lanes(Axis(2)))
            .map(|(a, b)| {
                let d = (a.sum() - b.sum()) / CHANNELS as f64;
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }

    fn lower_bound(&self, tile: &ChannelSummary, cell: &ChannelSummary) -> Option<f64> {
        // Cauchy-Schwarz over the per-pixel mean differences
        let pixels = tile.pixels.max(1) as f64;
        Some((tile.total() - cell.total()).abs() / (CHANNELS as f64 * pixels.sqrt()))
    }
}

/// Lp norm of the raw per-channel differences
#[derive(Debug, Clone, Copy)]
pub struct Norm {
    order: f64,
}

impl Norm {
    /// The order-2 (Euclidean) norm
    pub const fn euclidean() -> Self {
        Self { order: 2.0 }
    }

    /// A norm of arbitrary order; `f64::INFINITY` gives the maximum norm
    ///
    /// # Errors
    ///
    /// Returns an error if `order` is below 1 or NaN
    pub fn with_order(order: f64) -> Result<Self> {
        if order.is_nan() || order < 1.0 {
            return Err(invalid_parameter(
                "norm_order",
                &order,
                &"order must be at least 1",
            ));
        }
        Ok(Self { order })
    }

    /// Order of the norm
    pub const fn order(&self) -> f64 {
        self.order
    }
}

impl Default for Norm {
    fn default() -> Self {
        Self::euclidean()
    }
}

impl Metric for Norm {
    fn distance(&self, tile: ArrayView3<'_, f64>, cell: ArrayView3<'_, f64>) -> f64 {
        let zip = Zip::from(tile).and(cell);
        if self.order.is_infinite() {
            zip.fold(0.0, |acc: f64, &a, &b| acc.max((a - b).abs()))
        } else if (self.order - 2.0).abs() < f64::EPSILON {
            zip.fold(0.0, |acc, &a, &b| (a - b).mul_add(a - b, acc)).sqrt()
        } else if (self.order - 1.0).abs() < f64::EPSILON {
            zip.fold(0.0, |acc, &a, &b| acc + (a - b).abs())
        } else {
            let order = self.order;
            zip.fold(0.0, |acc, &a, &b| acc + (a - b).abs().powf(order))
                .powf(order.recip())
        }
    }

    fn lower_bound(&self, tile: &ChannelSummary, cell: &ChannelSummary) -> Option<f64> {
        // Hoelder: |sum d| <= N^(1 - 1/p) * ||d||_p
        let entries = (tile.pixels.max(1) * CHANNELS) as f64;
        let scale = entries.powf(self.order.recip() - 1.0);
        Some((tile.total() - cell.total()).abs() * scale)
    }
}

/// Low-cost approximation of CIE-LUV distance on RGB values
///
/// Weights the red and blue differences by the mean red level of the two
/// pixels, following the "redmean" approximation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LuvApprox;

impl Metric for LuvApprox {
    fn distance(&self, tile: ArrayView3<'_, f64>, cell: ArrayView3<'_, f64>) -> f64 {
        tile.lanes(Axis(2))
            .into_iter()
            .zip(cell.lanes(Axis(2)))
            .map(|(a, b)| {
                let weighted = redmean_weighted(a, b);
                weighted * weighted
            })
            .sum::<f64>()
            .sqrt()
    }
}

fn redmean_weighted(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let channel = |view: &ArrayView1<'_, f64>, i: usize| view.get(i).copied().unwrap_or(0.0);
    let r = ((channel(&a, 0) + channel(&b, 0)) / 2.0).floor();
    let [dr, dg, db] = [0, 1, 2].map(|i| channel(&a, i) - channel(&b, i));
    (767.0 - r).mul_add(db * db, (512.0 + r).mul_add(dr * dr, 1024.0 * dg * dg))
}
