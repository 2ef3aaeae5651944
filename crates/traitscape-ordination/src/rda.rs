//! Redundancy analysis
//!
//! The response table Y (plots × species, often Hellinger-transformed) is
//! centered and regressed on the standardized explanatory table X
//! (plots × variables):
//!
//! ```text
//! Ŷ = X (XᵀX)⁻¹ Xᵀ Y
//! ```
//!
//! A PCA of the fitted values gives the constrained axes. Inertia is measured
//! as the sum of column variances, so `R² = constrained / total`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use traitscape_community::table::Table;
use traitscape_stats::linalg::Matrix;

use crate::{
    OrdinationError, Result, axis_names, correlation, ensure_complete,
    pca::leading_columns,
    permutation::{self, PermutationTest},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rda {
    pub total_inertia: f64,
    pub constrained_inertia: f64,
    pub r_squared: f64,
    /// Ezekiel's adjustment `1 - (1 - R²)(n - 1)/(n - q - 1)`.
    pub adj_r_squared: f64,
    /// Constrained eigenvalues of the retained axes.
    pub eigenvalues: Vec<f64>,
    /// Eigenvalues as a proportion of total inertia.
    pub proportion: Vec<f64>,
    /// Linear-combination site scores: fitted values projected on the axes.
    pub site_scores: Table,
    /// Response variables × axes.
    pub response_scores: Table,
    /// Correlation of each explanatory variable with the site scores.
    pub biplot_scores: Table,
}

/// Centered Y, standardized X and the hat matrix of X.
struct Design {
    y: Matrix,
    hat: Matrix,
    x: Matrix,
    total: f64,
}

impl Design {
    fn new(response: &Table, explanatory: &Table) -> Result<Self> {
        let n = response.nrows();
        let q = explanatory.ncols();
        if explanatory.nrows() != n {
            return Err(traitscape_community::CommunityError::DimensionMismatch {
                what: "explanatory rows",
                expected: n,
                found: explanatory.nrows(),
            }
            .into());
        }
        if response.ncols() == 0 {
            return Err(OrdinationError::NoColumns {
                what: "RDA response",
            });
        }
        if q == 0 {
            return Err(OrdinationError::NoColumns {
                what: "RDA explanatory table",
            });
        }
        if n < q + 2 {
            return Err(OrdinationError::TooFewRows {
                what: "RDA",
                required: q + 2,
                found: n,
            });
        }
        ensure_complete("RDA response", response)?;
        ensure_complete("RDA explanatory table", explanatory)?;

        let y = response.scale_columns(false).into_values();
        let x = explanatory.scale_columns(true).into_values();
        let total = y.sum_of_squares();
        if total <= 0.0 {
            return Err(OrdinationError::NoVariance {
                what: "RDA response",
            });
        }
        let xtx = x.t_matmul(&x)?;
        let hat = x.matmul(&xtx.solve(&x.transpose())?)?;
        Ok(Self { y, hat, x, total })
    }

    fn rows(&self) -> usize {
        self.y.rows()
    }

    fn predictors(&self) -> usize {
        self.x.cols()
    }

    /// Pseudo-F of a fitted sum of squares.
    #[expect(clippy::cast_precision_loss)]
    fn pseudo_f(&self, constrained: f64) -> f64 {
        let q = self.predictors() as f64;
        let residual_df = (self.rows() - self.predictors() - 1) as f64;
        let residual = (self.total - constrained).max(0.0);
        (constrained / q) / (residual / residual_df)
    }
}

impl Rda {
    /// Fits an RDA keeping at most `n_axes` constrained axes.
    ///
    /// Rows of `response` and `explanatory` are matched by position.
    pub fn fit(response: &Table, explanatory: &Table, n_axes: usize) -> Result<Self> {
        let design = Design::new(response, explanatory)?;
        let n = design.rows();
        #[expect(clippy::cast_precision_loss)]
        let denom = (n - 1) as f64;

        let fitted = design.hat.matmul(&design.y)?;
        let total_inertia = design.total / denom;
        let constrained_inertia = fitted.sum_of_squares() / denom;
        let r_squared = constrained_inertia / total_inertia;
        #[expect(clippy::cast_precision_loss)]
        let adj_r_squared =
            1.0 - (1.0 - r_squared) * denom / (n - design.predictors() - 1) as f64;

        let eigen = fitted.t_matmul(&fitted)?.scaled(1.0 / denom).symmetric_eigen()?;
        let rank = design.predictors().min(response.ncols());
        let k = n_axes.clamp(1, rank);
        let eigenvalues = eigen.values[..k]
            .iter()
            .map(|v| v.max(0.0))
            .collect::<Vec<_>>();
        let proportion = eigenvalues.iter().map(|v| v / total_inertia).collect();
        let vectors = leading_columns(&eigen.vectors, k);
        let site_scores = fitted.matmul(&vectors)?;

        let mut biplot = Matrix::zeros(design.predictors(), k);
        for j in 0..design.predictors() {
            let xj = design.x.column(j).collect::<Vec<_>>();
            for a in 0..k {
                let scores = site_scores.column(a).collect::<Vec<_>>();
                biplot[(j, a)] = correlation(&xj, &scores);
            }
        }

        let axes = axis_names("RDA", k);
        Ok(Self {
            total_inertia,
            constrained_inertia,
            r_squared,
            adj_r_squared,
            eigenvalues,
            proportion,
            site_scores: Table::new(response.row_names().to_vec(), axes.clone(), site_scores)?,
            response_scores: Table::new(response.col_names().to_vec(), axes.clone(), vectors)?,
            biplot_scores: Table::new(explanatory.col_names().to_vec(), axes, biplot)?,
        })
    }

    /// Permutation test of the whole model: rows of the response are permuted
    /// and the pseudo-F statistic
    /// `(constrained / q) / ((total - constrained) / (n - q - 1))` recomputed.
    pub fn permutation_test<R>(
        response: &Table,
        explanatory: &Table,
        permutations: usize,
        rng: &mut R,
    ) -> Result<PermutationTest>
    where
        R: Rng + ?Sized,
    {
        let design = Design::new(response, explanatory)?;
        let observed = design.pseudo_f(design.hat.matmul(&design.y)?.sum_of_squares());
        PermutationTest::run(observed, permutations, || {
            let order = permutation::random_permutation(design.rows(), rng);
            let shuffled = permutation::permute_rows(&design.y, &order);
            let constrained = design.hat.matmul(&shuffled)?.sum_of_squares();
            Ok(design.pseudo_f(constrained))
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{prefix}{i}")).collect()
    }

    /// Two species responding linearly to one gradient plus a noise variable.
    fn gradient(noise: &[f64]) -> (Table, Table) {
        let n = noise.len();
        let env = (0..n).map(|i| vec![i as f64, noise[i]]).collect();
        let y = (0..n)
            .map(|i| vec![2.0 * i as f64 + 1.0, 10.0 - i as f64])
            .collect();
        (
            Table::from_rows(names("p", n), names("sp", 2), y).unwrap(),
            Table::from_rows(names("p", n), vec!["gradient".into(), "noise".into()], env)
                .unwrap(),
        )
    }

    const NOISE: [f64; 8] = [0.3, -1.2, 0.8, 0.1, -0.5, 1.5, -0.9, 0.4];

    #[test]
    fn test_perfect_fit() {
        let (y, x) = gradient(&NOISE);
        let rda = Rda::fit(&y, &x, 2).unwrap();
        assert!((rda.r_squared - 1.0).abs() < 1e-9);
        assert!((rda.adj_r_squared - 1.0).abs() < 1e-9);
        assert!((rda.constrained_inertia - rda.total_inertia).abs() < 1e-9);
        // the response is one-dimensional
        assert!((rda.proportion[0] - 1.0).abs() < 1e-9);
        assert!(rda.eigenvalues[1].abs() < 1e-9);
        assert!((rda.biplot_scores.get(0, 0).abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrelated_predictor_explains_little() {
        let n = 12;
        let y = Table::from_rows(
            names("p", n),
            names("sp", 1),
            (0..n).map(|i| vec![if i % 2 == 0 { 1.0 } else { -1.0 }]).collect(),
        )
        .unwrap();
        let x = Table::from_rows(
            names("p", n),
            vec!["trend".into()],
            (0..n).map(|i| vec![i as f64]).collect(),
        )
        .unwrap();
        let rda = Rda::fit(&y, &x, 1).unwrap();
        assert!(rda.r_squared < 0.1);
        assert!(rda.adj_r_squared < rda.r_squared);
    }

    #[test]
    fn test_permutation_test_detects_gradient() {
        let (y, x) = gradient(&NOISE);
        let mut rng = Pcg64::seed_from_u64(17);
        let test = Rda::permutation_test(&y, &x, 199, &mut rng).unwrap();
        assert!(test.statistic.is_infinite() || test.statistic > 1e6);
        assert!(test.p_value < 0.05, "{test:?}");
    }

    #[test]
    fn test_row_count_mismatch() {
        let (y, _) = gradient(&NOISE);
        let (_, x) = gradient(&NOISE[..6]);
        assert!(Rda::fit(&y, &x, 1).is_err());
    }

    #[test]
    fn test_too_many_predictors() {
        let (y, x) = gradient(&NOISE[..3]);
        assert!(matches!(
            Rda::fit(&y, &x, 1),
            Err(OrdinationError::TooFewRows { required: 4, .. })
        ));
    }
}
