//! Multiple-testing correction of p-values.
//!
//! Matches the semantics of R's `p.adjust`: NaN entries are left untouched and
//! do not count toward the number of tests.

use serde::{Deserialize, Serialize};

/// P-value adjustment method.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr,
)]
pub enum PAdjust {
    /// No adjustment.
    None,
    /// Holm's step-down family-wise error correction.
    #[default]
    Holm,
    /// Benjamini-Hochberg false discovery rate.
    BenjaminiHochberg,
}

impl PAdjust {
    /// Returns the adjusted p-values in the original order.
    ///
    /// # Examples
    ///
    /// ```
    /// use traitscape_stats::adjust::PAdjust;
    ///
    /// let p = [0.01, 0.04, 0.03];
    /// let holm = PAdjust::Holm.apply(&p);
    /// assert!((holm[0] - 0.03).abs() < 1e-12);
    /// assert!((holm[1] - 0.06).abs() < 1e-12);
    /// assert!((holm[2] - 0.06).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn apply(self, p_values: &[f64]) -> Vec<f64> {
        let mut adjusted = p_values.to_vec();
        let mut order = (0..p_values.len())
            .filter(|&i| !p_values[i].is_nan())
            .collect::<Vec<_>>();
        order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
        let n = order.len();

        match self {
            PAdjust::None => {}
            PAdjust::Holm => {
                let mut running_max = 0.0_f64;
                for (rank, &i) in order.iter().enumerate() {
                    let factor = count_as_f64(n - rank);
                    running_max = running_max.max((factor * p_values[i]).min(1.0));
                    adjusted[i] = running_max;
                }
            }
            PAdjust::BenjaminiHochberg => {
                let mut running_min = 1.0_f64;
                for (rank, &i) in order.iter().enumerate().rev() {
                    let factor = count_as_f64(n) / count_as_f64(rank + 1);
                    running_min = running_min.min(factor * p_values[i]);
                    adjusted[i] = running_min;
                }
            }
        }
        adjusted
    }
}

#[expect(clippy::cast_precision_loss)]
fn count_as_f64(n: usize) -> f64 {
    n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_parse_method_name() {
        assert_eq!("holm".parse::<PAdjust>().unwrap(), PAdjust::Holm);
        assert_eq!(
            "BenjaminiHochberg".parse::<PAdjust>().unwrap(),
            PAdjust::BenjaminiHochberg
        );
        assert!("bonferroni".parse::<PAdjust>().is_err());
    }

    #[test]
    fn test_none_is_identity() {
        let p = [0.2, 0.01, 0.5];
        assert_eq!(PAdjust::None.apply(&p), p.to_vec());
    }

    #[test]
    fn test_holm_matches_r() {
        // p.adjust(c(0.01, 0.02, 0.03, 0.04, 0.05), "holm")
        let p = [0.01, 0.02, 0.03, 0.04, 0.05];
        assert_close(&PAdjust::Holm.apply(&p), &[0.05, 0.08, 0.09, 0.09, 0.09]);
    }

    #[test]
    fn test_bh_matches_r() {
        // p.adjust(c(0.01, 0.02, 0.03, 0.04, 0.05), "BH")
        let p = [0.01, 0.02, 0.03, 0.04, 0.05];
        assert_close(
            &PAdjust::BenjaminiHochberg.apply(&p),
            &[0.05, 0.05, 0.05, 0.05, 0.05],
        );
    }

    #[test]
    fn test_adjusted_values_are_capped() {
        let p = [0.6, 0.7, 0.9];
        for adjusted in PAdjust::Holm.apply(&p) {
            assert!(adjusted <= 1.0);
        }
    }

    #[test]
    fn test_nan_is_preserved_and_not_counted() {
        let p = [0.01, f64::NAN, 0.02];
        let adjusted = PAdjust::Holm.apply(&p);
        assert!((adjusted[0] - 0.02).abs() < 1e-12);
        assert!(adjusted[1].is_nan());
        assert!((adjusted[2] - 0.02).abs() < 1e-12);
    }
}
