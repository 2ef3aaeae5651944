//! Principal component analysis
//!
//! Columns are centered (and optionally scaled to unit variance, giving a
//! correlation-matrix PCA); the covariance matrix is eigen-decomposed with
//! Jacobi rotations. Site scores are the centered data projected on the
//! eigenvectors, so the variance of axis `k` equals eigenvalue `k`.

use serde::{Deserialize, Serialize};
use traitscape_community::table::Table;
use traitscape_stats::linalg::Matrix;

use crate::{OrdinationError, Result, axis_names, ensure_complete};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    pub scaled: bool,
    /// Sum of all eigenvalues (total variance of the analysed columns).
    pub total_variance: f64,
    /// Eigenvalues of the retained axes, descending.
    pub eigenvalues: Vec<f64>,
    pub proportion: Vec<f64>,
    pub cumulative: Vec<f64>,
    /// Variables × axes, unit-length eigenvectors.
    pub loadings: Table,
    /// Rows × axes.
    pub scores: Table,
}

impl Pca {
    /// Fits a PCA keeping at most `n_axes` axes.
    ///
    /// # Examples
    ///
    /// ```
    /// use traitscape_community::table::Table;
    /// use traitscape_ordination::pca::Pca;
    ///
    /// let table = Table::from_rows(
    ///     vec!["a".into(), "b".into(), "c".into()],
    ///     vec!["x".into(), "y".into()],
    ///     vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]],
    /// )?;
    /// let pca = Pca::fit(&table, false, 2)?;
    /// assert!((pca.proportion[0] - 1.0).abs() < 1e-12);
    /// # Ok::<(), traitscape_ordination::OrdinationError>(())
    /// ```
    pub fn fit(table: &Table, scale: bool, n_axes: usize) -> Result<Self> {
        if table.nrows() < 2 {
            return Err(OrdinationError::TooFewRows {
                what: "PCA",
                required: 2,
                found: table.nrows(),
            });
        }
        if table.ncols() == 0 {
            return Err(OrdinationError::NoColumns { what: "PCA" });
        }
        ensure_complete("PCA input", table)?;

        let centered = table.scale_columns(scale);
        let x = centered.values();
        #[expect(clippy::cast_precision_loss)]
        let covariance = x.t_matmul(x)?.scaled(1.0 / (x.rows() - 1) as f64);
        let eigen = covariance.symmetric_eigen()?;
        let values = eigen.values.iter().map(|v| v.max(0.0)).collect::<Vec<_>>();
        let total_variance = values.iter().sum::<f64>();
        if total_variance <= 0.0 {
            return Err(OrdinationError::NoVariance { what: "PCA input" });
        }

        let k = n_axes.clamp(1, values.len());
        let vectors = leading_columns(&eigen.vectors, k);
        let scores = x.matmul(&vectors)?;
        let eigenvalues = values[..k].to_vec();
        let proportion = eigenvalues
            .iter()
            .map(|v| v / total_variance)
            .collect::<Vec<_>>();
        let cumulative = proportion
            .iter()
            .scan(0.0, |acc, p| {
                *acc += p;
                Some(*acc)
            })
            .collect();

        let axes = axis_names("PC", k);
        Ok(Self {
            scaled: scale,
            total_variance,
            eigenvalues,
            proportion,
            cumulative,
            loadings: Table::new(table.col_names().to_vec(), axes.clone(), vectors)?,
            scores: Table::new(table.row_names().to_vec(), axes, scores)?,
        })
    }
}

/// The first `k` columns of `matrix`.
pub(crate) fn leading_columns(matrix: &Matrix, k: usize) -> Matrix {
    let mut out = Matrix::zeros(matrix.rows(), k);
    for r in 0..matrix.rows() {
        out.row_mut(r).copy_from_slice(&matrix.row(r)[..k]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            (1..=5).map(|i| format!("s{i}")).collect(),
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![2.0, 1.0, 10.0],
                vec![4.0, 3.0, 11.0],
                vec![6.0, 2.0, 9.0],
                vec![8.0, 5.0, 12.0],
                vec![10.0, 4.0, 8.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_eigenvalues_sum_to_total_variance() {
        let pca = Pca::fit(&sample(), false, 3).unwrap();
        // sample variances of the columns: 10, 2.5, 2.5
        assert!((pca.total_variance - 15.0).abs() < 1e-9);
        assert!((pca.eigenvalues.iter().sum::<f64>() - 15.0).abs() < 1e-9);
        assert!((pca.cumulative[2] - 1.0).abs() < 1e-12);
        assert!(pca.eigenvalues.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_score_variance_equals_eigenvalue() {
        let pca = Pca::fit(&sample(), true, 2).unwrap();
        assert!((pca.total_variance - 3.0).abs() < 1e-9);
        for k in 0..2 {
            let scores = pca.scores.column(k).collect::<Vec<_>>();
            let mean = scores.iter().sum::<f64>() / 5.0;
            let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((variance - pca.eigenvalues[k]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_loadings_sign_convention() {
        let pca = Pca::fit(&sample(), false, 3).unwrap();
        for k in 0..3 {
            let column = pca.loadings.column(k).collect::<Vec<_>>();
            let dominant = column
                .iter()
                .copied()
                .max_by(|x, y| x.abs().total_cmp(&y.abs()))
                .unwrap();
            assert!(dominant > 0.0);
            let norm = column.iter().map(|v| v * v).sum::<f64>();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_too_few_rows() {
        let table = Table::from_rows(vec!["a".into()], vec!["x".into()], vec![vec![1.0]]).unwrap();
        assert!(matches!(
            Pca::fit(&table, false, 1),
            Err(OrdinationError::TooFewRows { .. })
        ));
    }

    #[test]
    fn test_missing_value_rejected() {
        let mut table = sample();
        table.set(1, 2, f64::NAN);
        assert!(matches!(
            Pca::fit(&table, false, 1),
            Err(OrdinationError::MissingValue { .. })
        ));
    }
}
