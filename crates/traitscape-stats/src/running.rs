//! Single-pass accumulation of mean and variance.
//!
//! Null-model tests draw hundreds of randomized communities per plot and trait.
//! [`RunningStats`] folds each draw into a running mean and sum of squared
//! deviations (Welford's algorithm) so the null distribution never has to be
//! kept in memory.

use serde::{Deserialize, Serialize};

/// Running mean and variance of a stream of `f64` values.
///
/// NaN values are counted separately and do not affect the moments.
///
/// # Examples
///
/// ```
/// use traitscape_stats::running::RunningStats;
///
/// let mut stats = RunningStats::new();
/// for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     stats.push(v);
/// }
/// assert_eq!(stats.mean(), 5.0);
/// assert!((stats.sample_variance() - 32.0 / 7.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: usize,
    nan_count: usize,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value to the accumulator.
    #[expect(clippy::cast_precision_loss)]
    pub fn push(&mut self, value: f64) {
        if value.is_nan() {
            self.nan_count += 1;
            return;
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Number of non-NaN values pushed so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of NaN values pushed so far.
    #[must_use]
    pub fn nan_count(&self) -> usize {
        self.nan_count
    }

    /// Mean of the pushed values, NaN if none.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 { f64::NAN } else { self.mean }
    }

    /// Sample variance (`n - 1` denominator), NaN with fewer than two values.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            f64::NAN
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Sample standard deviation.
    #[must_use]
    pub fn sample_std_dev(&self) -> f64 {
        self.sample_variance().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptive::DescriptiveStats;

    #[test]
    fn test_empty_accumulator() {
        let stats = RunningStats::new();
        assert_eq!(stats.count(), 0);
        assert!(stats.mean().is_nan());
        assert!(stats.sample_variance().is_nan());
    }

    #[test]
    fn test_matches_descriptive_stats() {
        let values = [0.3, -1.2, 4.5, 2.25, 2.25, 9.0, -3.5];
        let mut running = RunningStats::new();
        for v in values {
            running.push(v);
        }
        let batch = DescriptiveStats::new(values).unwrap();
        assert!((running.mean() - batch.mean).abs() < 1e-12);
        assert!((running.sample_variance() - batch.variance).abs() < 1e-12);
    }

    #[test]
    fn test_nan_is_counted_separately() {
        let mut stats = RunningStats::new();
        stats.push(1.0);
        stats.push(f64::NAN);
        stats.push(3.0);
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.nan_count(), 1);
        assert_eq!(stats.mean(), 2.0);
    }

    #[test]
    fn test_constant_stream_has_zero_variance() {
        let mut stats = RunningStats::new();
        for _ in 0..10 {
            stats.push(2.5);
        }
        assert_eq!(stats.sample_variance(), 0.0);
    }
}
