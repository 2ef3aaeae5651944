//! RLQ analysis
//!
//! Links environment (R, plots × variables) to traits (Q, species × traits)
//! through abundances (L, plots × species). With `P = L / ΣL` and its
//! margins as weights, R and Q are standardized and the cross table
//! `Z = Rᵀ (P - p_i. p_.jᵀ) Q` is decomposed:
//!
//! - eigenvalues of `ZᵀZ` give the co-inertia carried by each axis
//! - trait coefficients `v` are the eigenvectors
//! - environment coefficients are `u = Z v / √λ`
//!
//! Plots are scored by their environment and species by their traits, so
//! both sets of scores share the same axes.
//!
//! The permutation test uses the total inertia `‖Z‖²` with plots permuted
//! (model 2) and species permuted (model 4). The combined p-value is the
//! larger of the two, which controls type I error whether the link is
//! broken on the environment side or the trait side (ter Braak et al. 2012).

use rand::Rng;
use serde::{Deserialize, Serialize};
use traitscape_community::table::Table;
use traitscape_stats::linalg::Matrix;

use crate::{
    OrdinationError, Result, axis_names,
    coinertia::{CrossTable, Tables},
    pca::leading_columns,
    permutation::{self, PermutationTest},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rlq {
    /// Total co-inertia `‖Z‖²`.
    pub total_inertia: f64,
    pub eigenvalues: Vec<f64>,
    /// Eigenvalues as a proportion of total inertia.
    pub proportion: Vec<f64>,
    /// Environment variables × axes.
    pub env_coefficients: Table,
    /// Traits × axes.
    pub trait_coefficients: Table,
    /// Plots × axes.
    pub plot_scores: Table,
    /// Species × axes.
    pub species_scores: Table,
}

/// Model 2 and model 4 permutation tests of total RLQ inertia.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RlqTest {
    /// Plots permuted.
    pub model2: PermutationTest,
    /// Species permuted.
    pub model4: PermutationTest,
    /// `max(model2.p_value, model4.p_value)`.
    pub p_combined: f64,
}

impl Rlq {
    /// Fits RLQ keeping at most `n_axes` axes.
    ///
    /// Plots are matched by name between R and L and species between L and Q.
    /// Plots or species with zero total abundance are rejected.
    pub fn fit(env: &Table, abundance: &Table, traits: &Table, n_axes: usize) -> Result<Self> {
        let tables = Tables::new(env, abundance, traits)?;
        let cross = cross_table(&tables, tables.abundance.values())?;
        let z = &cross.z;

        let eigen = z.t_matmul(z)?.symmetric_eigen()?;
        let total_inertia = z.sum_of_squares();
        let rank = z.rows().min(z.cols());
        let k = n_axes.clamp(1, rank);
        let eigenvalues = eigen.values[..k]
            .iter()
            .map(|v| v.max(0.0))
            .collect::<Vec<_>>();
        let proportion = eigenvalues
            .iter()
            .map(|v| {
                if total_inertia > 0.0 {
                    v / total_inertia
                } else {
                    f64::NAN
                }
            })
            .collect();

        let v = leading_columns(&eigen.vectors, k);
        let zv = z.matmul(&v)?;
        let mut u = Matrix::zeros(z.rows(), k);
        for a in 0..k {
            let norm = eigenvalues[a].sqrt();
            if norm <= f64::EPSILON * total_inertia.sqrt().max(1.0) {
                continue;
            }
            for i in 0..z.rows() {
                u[(i, a)] = zv[(i, a)] / norm;
            }
        }
        let plot_scores = cross.env.matmul(&u)?;
        let species_scores = cross.traits.matmul(&v)?;

        let axes = axis_names("RLQ", k);
        Ok(Self {
            total_inertia,
            eigenvalues,
            proportion,
            env_coefficients: Table::new(tables.env.col_names().to_vec(), axes.clone(), u)?,
            trait_coefficients: Table::new(tables.traits.col_names().to_vec(), axes.clone(), v)?,
            plot_scores: Table::new(tables.abundance.row_names().to_vec(), axes.clone(), plot_scores)?,
            species_scores: Table::new(tables.abundance.col_names().to_vec(), axes, species_scores)?,
        })
    }

    /// Permutation test of total inertia under models 2 and 4.
    pub fn permutation_test<R>(
        env: &Table,
        abundance: &Table,
        traits: &Table,
        permutations: usize,
        rng: &mut R,
    ) -> Result<RlqTest>
    where
        R: Rng + ?Sized,
    {
        let tables = Tables::new(env, abundance, traits)?;
        let l = tables.abundance.values();
        let observed = cross_table(&tables, l)?.z.sum_of_squares();

        let model2 = PermutationTest::run(observed, permutations, || {
            let order = permutation::random_permutation(l.rows(), rng);
            Ok::<_, OrdinationError>(cross_table(&tables, &permutation::permute_rows(l, &order))?
                .z
                .sum_of_squares())
        })?;
        let model4 = PermutationTest::run(observed, permutations, || {
            let order = permutation::random_permutation(l.cols(), rng);
            Ok::<_, OrdinationError>(cross_table(&tables, &permutation::permute_cols(l, &order))?
                .z
                .sum_of_squares())
        })?;
        Ok(RlqTest {
            model2,
            model4,
            p_combined: model2.p_value.max(model4.p_value),
        })
    }
}

pub(crate) fn cross_table(tables: &Tables, abundance: &Matrix) -> Result<CrossTable> {
    CrossTable::new(
        tables.env.values(),
        abundance,
        tables.traits.values(),
        tables.abundance.row_names(),
        tables.abundance.col_names(),
    )
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{prefix}{i}")).collect()
    }

    /// Species `j` has trait value `j` and is most abundant in plot `j`,
    /// whose temperature is `j`.
    fn matched_gradient(n: usize) -> (Table, Table, Table) {
        let env = Table::from_rows(
            names("p", n),
            vec!["temperature".into(), "moisture".into()],
            (0..n)
                .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
                .collect(),
        )
        .unwrap();
        let abundance = Table::from_rows(
            names("p", n),
            names("s", n),
            (0..n)
                .map(|i| {
                    (0..n)
                        .map(|j| match i.abs_diff(j) {
                            0 => 10.0,
                            1 => 3.0,
                            _ => 0.5,
                        })
                        .collect()
                })
                .collect(),
        )
        .unwrap();
        let traits = Table::from_rows(
            names("s", n),
            vec!["height".into()],
            (0..n).map(|j| vec![j as f64]).collect(),
        )
        .unwrap();
        (env, abundance, traits)
    }

    #[test]
    fn test_eigenvalues_partition_inertia() {
        let (r, l, q) = matched_gradient(8);
        let rlq = Rlq::fit(&r, &l, &q, 2).unwrap();
        // one trait: a single axis carries all co-inertia
        assert_eq!(rlq.eigenvalues.len(), 1);
        assert!((rlq.proportion[0] - 1.0).abs() < 1e-9);
        assert!(rlq.total_inertia > 0.0);
    }

    #[test]
    fn test_scores_follow_gradient() {
        let (r, l, q) = matched_gradient(8);
        let rlq = Rlq::fit(&r, &l, &q, 1).unwrap();
        // trait coefficient sign is positive by convention, so tall species score high
        let species = rlq.species_scores.column(0).collect::<Vec<_>>();
        assert!(species.windows(2).all(|w| w[0] < w[1]));
        let temperature = rlq.env_coefficients.get(0, 0);
        let moisture = rlq.env_coefficients.get(1, 0);
        assert!(temperature > moisture.abs());
    }

    #[test]
    fn test_zero_total_plot_rejected() {
        let (r, mut l, q) = matched_gradient(4);
        for s in 0..4 {
            l.set(2, s, 0.0);
        }
        assert!(matches!(
            Rlq::fit(&r, &l, &q, 1),
            Err(OrdinationError::EmptyMargin { axis: "plot", .. })
        ));
    }

    #[test]
    fn test_permutation_test_detects_link() {
        let (r, l, q) = matched_gradient(10);
        let mut rng = Pcg64::seed_from_u64(3);
        let test = Rlq::permutation_test(&r, &l, &q, 199, &mut rng).unwrap();
        assert!(test.model2.p_value < 0.05, "{test:?}");
        assert!(test.model4.p_value < 0.05, "{test:?}");
        assert_eq!(
            test.p_combined,
            test.model2.p_value.max(test.model4.p_value)
        );
    }
}
