//! Standardized effect sizes against a null distribution.
//!
//! For an observed statistic and a null distribution obtained by
//! randomization, the standardized effect size is
//!
//! ```text
//! SES = (observed - mean(null)) / sd(null)
//! ```
//!
//! Under a normal approximation `|SES| >= 1.96` marks a two-tailed 5% result.
//! A null distribution without variance leaves SES undefined (NaN) and the
//! result is never reported as significant. Null draws that agree up to
//! floating-point rounding count as having no variance.

use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use crate::running::RunningStats;

/// Two-tailed 5% critical value of the standard normal distribution.
pub const SIGNIFICANCE_THRESHOLD: f64 = 1.96;

/// Null standard deviations at or below this fraction of `max(|null mean|, 1)`
/// are treated as zero.
pub const NULL_SD_TOLERANCE: f64 = 1e-12;

/// Observed statistic compared with a summarized null distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSize {
    pub observed: f64,
    pub null_mean: f64,
    pub null_sd: f64,
    /// Standardized effect size, NaN when undefined.
    pub ses: f64,
    /// Two-tailed p-value of `ses` under the standard normal.
    pub p_normal: f64,
}

impl EffectSize {
    /// Builds an effect size from explicit null moments.
    ///
    /// # Examples
    ///
    /// ```
    /// use traitscape_stats::effect_size::EffectSize;
    ///
    /// let es = EffectSize::new(3.0, 1.0, 1.0);
    /// assert_eq!(es.ses, 2.0);
    /// assert!(es.is_significant());
    ///
    /// let flat = EffectSize::new(3.0, 1.0, 0.0);
    /// assert!(flat.ses.is_nan());
    /// assert!(!flat.is_significant());
    /// ```
    #[must_use]
    pub fn new(observed: f64, null_mean: f64, null_sd: f64) -> Self {
        let ses = standardized_effect_size(observed, null_mean, null_sd);
        Self {
            observed,
            null_mean,
            null_sd,
            ses,
            p_normal: normal_two_tailed_p(ses),
        }
    }

    /// Builds an effect size from an accumulated null distribution.
    #[must_use]
    pub fn from_null(observed: f64, null: &RunningStats) -> Self {
        Self::new(observed, null.mean(), null.sample_std_dev())
    }

    /// Whether `|SES|` reaches [`SIGNIFICANCE_THRESHOLD`].
    #[must_use]
    pub fn is_significant(&self) -> bool {
        is_significant(self.ses)
    }
}

/// `(observed - null_mean) / null_sd`, NaN when `null_sd` is undefined or
/// zero within [`NULL_SD_TOLERANCE`].
///
/// # Examples
///
/// ```
/// use traitscape_stats::effect_size::standardized_effect_size;
///
/// assert_eq!(standardized_effect_size(3.0, 1.0, 0.5), 4.0);
/// // rounding noise around a constant null distribution
/// assert!(standardized_effect_size(0.1 - 1e-17, 0.1, 9.4e-18).is_nan());
/// ```
#[must_use]
pub fn standardized_effect_size(observed: f64, null_mean: f64, null_sd: f64) -> f64 {
    if null_sd.is_nan() || null_sd.is_infinite() || is_flat(null_mean, null_sd) {
        return f64::NAN;
    }
    (observed - null_mean) / null_sd
}

fn is_flat(null_mean: f64, null_sd: f64) -> bool {
    let scale = if null_mean.is_finite() {
        null_mean.abs().max(1.0)
    } else {
        1.0
    };
    null_sd <= NULL_SD_TOLERANCE * scale
}

/// Whether `|ses|` reaches [`SIGNIFICANCE_THRESHOLD`]. NaN is never significant.
#[must_use]
pub fn is_significant(ses: f64) -> bool {
    ses.abs() >= SIGNIFICANCE_THRESHOLD
}

/// Two-tailed p-value `2 * (1 - Φ(|z|))`, NaN for NaN input.
#[must_use]
pub fn normal_two_tailed_p(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    erfc(z.abs() / std::f64::consts::SQRT_2)
}

/// Position of an observed value within a randomized null distribution.
///
/// Counts null draws strictly below, equal to and strictly above the observed
/// value. Ties count toward both tails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankCounts {
    pub lower: usize,
    pub equal: usize,
    pub higher: usize,
}

impl RankCounts {
    /// Records one null draw relative to `observed`. NaN draws are ignored.
    pub fn push(&mut self, observed: f64, null_value: f64) {
        if observed.is_nan() || null_value.is_nan() {
            return;
        }
        match null_value.total_cmp(&observed) {
            std::cmp::Ordering::Less => self.lower += 1,
            std::cmp::Ordering::Equal => self.equal += 1,
            std::cmp::Ordering::Greater => self.higher += 1,
        }
    }

    /// Number of null draws recorded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.lower + self.equal + self.higher
    }

    /// Two-tailed rank-based p-value, counting the observed value as one draw.
    ///
    /// NaN when no draws were recorded.
    ///
    /// # Examples
    ///
    /// ```
    /// use traitscape_stats::effect_size::RankCounts;
    ///
    /// // observed value larger than all 99 null draws
    /// let counts = RankCounts { lower: 99, equal: 0, higher: 0 };
    /// assert_eq!(counts.two_tailed_p(), 0.02);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn two_tailed_p(&self) -> f64 {
        let n = self.total();
        if n == 0 {
            return f64::NAN;
        }
        let at_most = self.lower + self.equal + 1;
        let at_least = self.higher + self.equal + 1;
        let tail = at_most.min(at_least) as f64 / (n + 1) as f64;
        (2.0 * tail).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_variance_is_undefined() {
        assert!(standardized_effect_size(1.0, 1.0, 0.0).is_nan());
        assert!(standardized_effect_size(1.0, 1.0, f64::NAN).is_nan());
        assert!(!is_significant(f64::NAN));
    }

    #[test]
    fn test_rounding_noise_is_zero_variance() {
        assert!(standardized_effect_size(0.099_999_999_999_999_98, 0.1, 9.38e-18).is_nan());
        assert!(standardized_effect_size(1e6 + 1e-9, 1e6, 1e-7).is_nan());
        assert!(standardized_effect_size(-5.0, -5.0, 1e-13).is_nan());
        assert!(!EffectSize::new(0.099_999_999_999_999_98, 0.1, 9.38e-18).is_significant());
        // small but genuine spread is kept
        assert!((standardized_effect_size(1e-3, 0.0, 1e-6) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(is_significant(1.96));
        assert!(is_significant(-1.96));
        assert!(!is_significant(1.95));
    }

    #[test]
    fn test_normal_p_value() {
        assert!((normal_two_tailed_p(0.0) - 1.0).abs() < 1e-12);
        assert!((normal_two_tailed_p(1.959_964) - 0.05).abs() < 1e-6);
        assert!((normal_two_tailed_p(-1.959_964) - 0.05).abs() < 1e-6);
        assert!(normal_two_tailed_p(f64::NAN).is_nan());
    }

    #[test]
    fn test_ses_scale_invariance() {
        let base = EffectSize::new(3.0, 2.0, 0.5);
        let scaled = EffectSize::new(3.0 * 4.0, 2.0 * 4.0, 0.5 * 4.0);
        assert!((base.ses - scaled.ses).abs() < 1e-12);
    }

    #[test]
    fn test_rank_counts_ties() {
        let mut counts = RankCounts::default();
        for v in [1.0, 2.0, 2.0, 3.0] {
            counts.push(2.0, v);
        }
        assert_eq!(
            counts,
            RankCounts {
                lower: 1,
                equal: 2,
                higher: 1
            }
        );
        assert_eq!(counts.two_tailed_p(), 1.0);
    }

    #[test]
    fn test_rank_counts_ignore_nan() {
        let mut counts = RankCounts::default();
        counts.push(f64::NAN, 1.0);
        counts.push(1.0, f64::NAN);
        assert_eq!(counts.total(), 0);
        assert!(counts.two_tailed_p().is_nan());
    }
}
