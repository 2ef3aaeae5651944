//! Shared weighting of the R, L and Q tables
//!
//! L is turned into a correspondence table `P = L / ΣL` with plot weights
//! `p_i.` and species weights `p_.j`. R columns are standardized with plot
//! weights and Q columns with species weights, so that the cross table
//!
//! ```text
//! Z = Rᵀ (P - p_i. p_.jᵀ) Q
//! ```
//!
//! holds the abundance-weighted correlation of every environment variable
//! with every trait.

use traitscape_community::{abundance::check_abundance, cwm::match_traits, table::Table};
use traitscape_stats::linalg::Matrix;

use crate::{OrdinationError, Result, ensure_complete};

/// R, L and Q with plots and species matched by name.
#[derive(Debug, Clone)]
pub(crate) struct Tables {
    pub(crate) env: Table,
    pub(crate) abundance: Table,
    pub(crate) traits: Table,
}

impl Tables {
    /// Reorders R rows to L's plots and Q rows to L's species.
    pub(crate) fn new(env: &Table, abundance: &Table, traits: &Table) -> Result<Self> {
        ensure_complete("environment table", env)?;
        ensure_complete("trait table", traits)?;
        if env.ncols() == 0 {
            return Err(OrdinationError::NoColumns {
                what: "environment table",
            });
        }
        if traits.ncols() == 0 {
            return Err(OrdinationError::NoColumns {
                what: "trait table",
            });
        }
        check_abundance(abundance)?;
        Ok(Self {
            env: env.select_rows(abundance.row_names())?,
            abundance: abundance.clone(),
            traits: match_traits(abundance, traits)?,
        })
    }
}

/// Correspondence weights of an abundance matrix.
#[derive(Debug, Clone)]
pub(crate) struct Weights {
    /// `L / ΣL`
    pub(crate) p: Matrix,
    pub(crate) rows: Vec<f64>,
    pub(crate) cols: Vec<f64>,
}

impl Weights {
    /// Fails when a plot or species has zero total abundance.
    pub(crate) fn new(abundance: &Matrix, plots: &[String], species: &[String]) -> Result<Self> {
        let total = abundance.as_slice().iter().sum::<f64>();
        let p = abundance.clone().scaled(1.0 / total);
        let rows = (0..p.rows()).map(|i| p.row(i).iter().sum()).collect::<Vec<f64>>();
        let cols = (0..p.cols()).map(|j| p.column(j).sum()).collect::<Vec<f64>>();
        if let Some(i) = rows.iter().position(|w| w.is_nan() || *w <= 0.0) {
            return Err(OrdinationError::EmptyMargin {
                axis: "plot",
                name: plots[i].clone(),
            });
        }
        if let Some(j) = cols.iter().position(|w| w.is_nan() || *w <= 0.0) {
            return Err(OrdinationError::EmptyMargin {
                axis: "species",
                name: species[j].clone(),
            });
        }
        Ok(Self { p, rows, cols })
    }

    /// The cross table `Rᵀ (P - p_i. p_.jᵀ) Q` of standardized R and Q.
    pub(crate) fn cross(&self, env: &Matrix, traits: &Matrix) -> Result<Matrix> {
        let mut centered = self.p.clone();
        for i in 0..centered.rows() {
            for j in 0..centered.cols() {
                centered[(i, j)] -= self.rows[i] * self.cols[j];
            }
        }
        Ok(env.t_matmul(&centered)?.matmul(traits)?)
    }
}

/// Column-wise weighted standardization (weights summing to one).
///
/// Returns the standardized matrix and, per column, whether it was constant.
/// Constant columns are centered to zero.
pub(crate) fn standardize(matrix: &Matrix, weights: &[f64]) -> (Matrix, Vec<bool>) {
    let mut out = matrix.clone();
    let mut constant = vec![false; matrix.cols()];
    for c in 0..matrix.cols() {
        let mean = matrix
            .column(c)
            .zip(weights)
            .map(|(v, w)| v * w)
            .sum::<f64>();
        let variance = matrix
            .column(c)
            .zip(weights)
            .map(|(v, w)| w * (v - mean) * (v - mean))
            .sum::<f64>();
        let sd = variance.sqrt();
        constant[c] = sd.is_nan() || sd <= 1e-12 * mean.abs().max(1.0);
        for r in 0..matrix.rows() {
            out[(r, c)] = if constant[c] {
                0.0
            } else {
                (matrix[(r, c)] - mean) / sd
            };
        }
    }
    (out, constant)
}

/// Standardized R and Q against the weights of `abundance`, and their cross table.
pub(crate) struct CrossTable {
    pub(crate) env: Matrix,
    pub(crate) traits: Matrix,
    pub(crate) constant_env: Vec<bool>,
    pub(crate) constant_traits: Vec<bool>,
    pub(crate) z: Matrix,
}

impl CrossTable {
    pub(crate) fn new(
        env: &Matrix,
        abundance: &Matrix,
        traits: &Matrix,
        plots: &[String],
        species: &[String],
    ) -> Result<Self> {
        let weights = Weights::new(abundance, plots, species)?;
        let (env, constant_env) = standardize(env, &weights.rows);
        let (traits, constant_traits) = standardize(traits, &weights.cols);
        let z = weights.cross(&env, &traits)?;
        Ok(Self {
            env,
            traits,
            constant_env,
            constant_traits,
            z,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_standardize() {
        let m = Matrix::from_rows(&[vec![1.0, 5.0], vec![3.0, 5.0]]).unwrap();
        let (out, constant) = standardize(&m, &[0.5, 0.5]);
        assert_eq!(out.column(0).collect::<Vec<_>>(), vec![-1.0, 1.0]);
        assert_eq!(out.column(1).collect::<Vec<_>>(), vec![0.0, 0.0]);
        assert_eq!(constant, vec![false, true]);
    }

    #[test]
    fn test_empty_species_is_rejected() {
        let l = Matrix::from_rows(&[vec![1.0, 0.0], vec![2.0, 0.0]]).unwrap();
        let err = Weights::new(&l, &["p1".into(), "p2".into()], &["a".into(), "b".into()])
            .unwrap_err();
        assert!(matches!(
            err,
            OrdinationError::EmptyMargin { axis: "species", ref name } if name == "b"
        ));
    }

    #[test]
    fn test_tables_align_by_name() {
        let names = |v: &[&str]| v.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>();
        let r = Table::from_rows(names(&["p2", "p1"]), names(&["t"]), vec![vec![2.0], vec![1.0]])
            .unwrap();
        let l = Table::from_rows(
            names(&["p1", "p2"]),
            names(&["a", "b"]),
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();
        let q = Table::from_rows(names(&["b", "a"]), names(&["h"]), vec![vec![9.0], vec![8.0]])
            .unwrap();
        let tables = Tables::new(&r, &l, &q).unwrap();
        assert_eq!(tables.env.column(0).collect::<Vec<_>>(), vec![1.0, 2.0]);
        assert_eq!(tables.traits.column(0).collect::<Vec<_>>(), vec![8.0, 9.0]);
    }
}
