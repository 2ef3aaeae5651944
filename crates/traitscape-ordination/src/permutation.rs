//! Permutation tests
//!
//! A statistic is recomputed on permuted data and the observed value is
//! ranked among the permuted ones:
//!
//! ```text
//! p = (count(statistic* >= statistic) + 1) / (permutations + 1)
//! ```
//!
//! The observed value counts as one permutation, so p is never zero.

use rand::{Rng, seq::SliceRandom as _};
use serde::{Deserialize, Serialize};
use traitscape_stats::linalg::Matrix;

/// Upper-tail permutation test of one statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PermutationTest {
    pub statistic: f64,
    pub permutations: usize,
    /// Permuted statistics at least as large as the observed one.
    pub exceedances: usize,
    pub p_value: f64,
}

impl PermutationTest {
    /// Runs `permutations` draws of `permuted` against `statistic`.
    ///
    /// A NaN observed statistic yields a NaN p-value without drawing.
    pub fn run<F, E>(statistic: f64, permutations: usize, mut permuted: F) -> Result<Self, E>
    where
        F: FnMut() -> Result<f64, E>,
    {
        if statistic.is_nan() {
            return Ok(Self {
                statistic,
                permutations,
                exceedances: 0,
                p_value: f64::NAN,
            });
        }
        let mut exceedances = 0;
        for _ in 0..permutations {
            if exceeds(permuted()?, statistic) {
                exceedances += 1;
            }
        }
        Ok(Self {
            statistic,
            permutations,
            exceedances,
            p_value: p_value(exceedances, permutations),
        })
    }
}

/// Relative tolerance for ties between permuted and observed statistics.
const TIE_TOLERANCE: f64 = 1e-10;

/// `permuted >= observed`, treating values within rounding error as ties.
pub(crate) fn exceeds(permuted: f64, observed: f64) -> bool {
    permuted >= observed - TIE_TOLERANCE * observed.abs().max(1.0)
}

/// `(exceedances + 1) / (permutations + 1)`.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn p_value(exceedances: usize, permutations: usize) -> f64 {
    (exceedances + 1) as f64 / (permutations + 1) as f64
}

/// A uniformly random permutation of `0..n`.
pub(crate) fn random_permutation<R>(n: usize, rng: &mut R) -> Vec<usize>
where
    R: Rng + ?Sized,
{
    let mut order = (0..n).collect::<Vec<_>>();
    order.shuffle(rng);
    order
}

/// Row `i` of the result is row `order[i]` of `matrix`.
pub(crate) fn permute_rows(matrix: &Matrix, order: &[usize]) -> Matrix {
    let mut out = Matrix::zeros(matrix.rows(), matrix.cols());
    for (i, &src) in order.iter().enumerate() {
        out.row_mut(i).copy_from_slice(matrix.row(src));
    }
    out
}

/// Column `j` of the result is column `order[j]` of `matrix`.
pub(crate) fn permute_cols(matrix: &Matrix, order: &[usize]) -> Matrix {
    let mut out = Matrix::zeros(matrix.rows(), matrix.cols());
    for r in 0..matrix.rows() {
        for (j, &src) in order.iter().enumerate() {
            out[(r, j)] = matrix[(r, src)];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    #[test]
    fn test_p_value_counts_observed() {
        assert_eq!(p_value(0, 99), 0.01);
        assert_eq!(p_value(99, 99), 1.0);
    }

    #[test]
    fn test_run_counts_exceedances() {
        let mut draws = [1.0, 5.0, 3.0, 2.0].into_iter();
        let test = PermutationTest::run(3.0, 4, || {
            Ok::<_, std::convert::Infallible>(draws.next().unwrap_or(0.0))
        })
        .unwrap();
        assert_eq!(test.exceedances, 2);
        assert_eq!(test.p_value, 0.6);
    }

    #[test]
    fn test_nan_statistic_is_not_tested() {
        let test = PermutationTest::run(f64::NAN, 10, || -> Result<f64, ()> {
            panic!("should not draw")
        })
        .unwrap();
        assert!(test.p_value.is_nan());
    }

    #[test]
    fn test_permute_rows_and_cols() {
        let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(
            permute_rows(&m, &[1, 0]).to_rows(),
            vec![vec![3.0, 4.0], vec![1.0, 2.0]]
        );
        assert_eq!(
            permute_cols(&m, &[1, 0]).to_rows(),
            vec![vec![2.0, 1.0], vec![4.0, 3.0]]
        );
    }

    #[test]
    fn test_random_permutation_is_permutation() {
        let mut rng = Pcg64::seed_from_u64(0);
        let mut order = random_permutation(10, &mut rng);
        order.sort_unstable();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }
}
