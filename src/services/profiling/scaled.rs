//! Polars aggregates over finite values divided by a power of two.
//!
//! Dividing by a power of two is exact, so the aggregates are unchanged,
//! but sums and differences of values near `f64::MAX` stay finite and
//! products of values near the subnormal range do not flush to zero.

use polars::prelude::{
    ChunkAgg, ChunkQuantile, ChunkVar, Float64Chunked, NewChunkedArray, QuantileInterpolOptions,
};

pub(crate) struct ScaledSeries {
    values: Float64Chunked,
    scale: f64,
}

impl ScaledSeries {
    /// `values` must be finite.
    pub fn new(name: &str, values: &[f64]) -> Self {
        let scale = power_of_two_scale(values);
        let scaled: Vec<f64> = values.iter().map(|v| v / scale).collect();
        Self {
            values: Float64Chunked::from_vec(name, scaled),
            scale,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn mean(&self) -> Option<f64> {
        self.values.mean().map(|m| m * self.scale)
    }

    /// Sample standard deviation; absent below two values.
    pub fn std(&self) -> Option<f64> {
        if self.len() < 2 {
            return None;
        }
        self.values.std(1).map(|s| s * self.scale)
    }

    pub fn median(&self) -> Option<f64> {
        self.values.median().map(|m| m * self.scale)
    }

    /// Linear interpolation between the two closest ranks.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        self.values
            .quantile(q, QuantileInterpolOptions::Linear)
            .ok()
            .flatten()
            .map(|v| v * self.scale)
    }

    pub fn is_constant(&self) -> bool {
        self.values.min() == self.values.max()
    }

    /// Deviations from the mean, left in scaled units.
    pub fn centered(&self) -> Option<Float64Chunked> {
        let mean = self.values.mean()?;
        Some(&self.values - mean)
    }
}

/// Largest power of two not above the largest magnitude, kept inside the
/// normal range. `1.0` for empty or all-zero input.
fn power_of_two_scale(values: &[f64]) -> f64 {
    let largest = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if largest == 0.0 || !largest.is_finite() {
        return 1.0;
    }
    let exponent = (largest.log2().floor() as i64).clamp(-1022, 1023);
    f64::from_bits(((exponent + 1023) as u64) << 52)
}
