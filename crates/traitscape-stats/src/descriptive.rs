//! Batch summaries of a sample
//!
//! Used for per-column summaries of tables and for the SES distribution of
//! each trait. Variance uses the `n - 1` denominator, so results match R's
//! `var` and `sd`.

/// Location and spread of a sample of `f64` values, NaN excluded.
#[derive(Debug, Clone)]
pub struct DescriptiveStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample variance, 0.0 for a single value.
    pub variance: f64,
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Summarizes unsorted values, or `None` when no value is a number.
    ///
    /// # Examples
    ///
    /// ```
    /// # use traitscape_stats::descriptive::DescriptiveStats;
    /// let values = [5.0, 2.0, 4.0, 1.0, 3.0];
    /// let stats = DescriptiveStats::new(values).unwrap();
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.mean, 3.0);
    /// assert_eq!(stats.median, 3.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values
            .into_iter()
            .filter(|v| !v.is_nan())
            .collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Summarizes values already sorted ascending and free of NaN.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is out of order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use traitscape_stats::descriptive::DescriptiveStats;
    /// let values = [1.0, 2.0, 3.0, 4.0];
    /// let stats = DescriptiveStats::from_sorted(&values).unwrap();
    /// assert_eq!(stats.median, 2.5);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let mid = count / 2;
        let median = if count.is_multiple_of(2) {
            f64::midpoint(sorted_values[mid - 1], sorted_values[mid])
        } else {
            sorted_values[mid]
        };
        let variance = if count < 2 {
            0.0
        } else {
            sorted_values
                .iter()
                .map(|v| (v - mean).powi(2))
                .sum::<f64>()
                / (n - 1.0)
        };
        let std_dev = variance.sqrt();

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            variance,
            std_dev,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values() {
        assert!(DescriptiveStats::new([]).is_none());
        assert!(DescriptiveStats::new([f64::NAN]).is_none());
    }

    #[test]
    fn test_single_value() {
        let stats = DescriptiveStats::new([7.0]).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, 7.0);
        assert_eq!(stats.median, 7.0);
        assert_eq!(stats.variance, 0.0);
    }

    #[test]
    fn test_sample_variance() {
        // R: var(c(2, 4, 4, 4, 5, 5, 7, 9)) = 4.571429
        let stats = DescriptiveStats::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.mean, 5.0);
        assert!((stats.variance - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(stats.median, 4.5);
    }

    #[test]
    fn test_nan_values_are_skipped() {
        let stats = DescriptiveStats::new([1.0, f64::NAN, 3.0]).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 2.0);
    }
}
