//! Fourth-corner analysis
//!
//! Tests every environment variable × trait pair for association. The
//! statistic is the Pearson correlation between `R(i, k)` and `Q(j, t)` over
//! all plot/species pairs `(i, j)`, weighted by `L(i, j)`. Each correlation
//! is tested two-sided by permuting plots (model 2) and species (model 4);
//! the combined p-value is the larger of the two, adjusted across all pairs.

use rand::Rng;
use serde::{Deserialize, Serialize};
use traitscape_community::table::Table;
use traitscape_stats::{adjust::PAdjust, linalg::Matrix};

use crate::{
    Result,
    coinertia::Tables,
    permutation::{self, exceeds},
    rlq::cross_table,
};

/// Result for one environment variable and trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FourthCornerCell {
    pub variable: String,
    #[serde(rename = "trait")]
    pub trait_name: String,
    /// Weighted correlation, NaN when either column is constant.
    pub r: f64,
    pub p_model2: f64,
    pub p_model4: f64,
    pub p_combined: f64,
    pub p_adjusted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FourthCorner {
    pub permutations: usize,
    pub adjust: PAdjust,
    /// Variables in row-major order of `correlation`.
    pub cells: Vec<FourthCornerCell>,
    /// Environment variables × traits.
    pub correlation: Table,
    /// Adjusted combined p-values, environment variables × traits.
    pub p_adjusted: Table,
}

impl FourthCorner {
    /// Runs the analysis with `permutations` draws per model.
    ///
    /// Plots are matched by name between R and L and species between L and Q.
    pub fn run<R>(
        env: &Table,
        abundance: &Table,
        traits: &Table,
        permutations: usize,
        adjust: PAdjust,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let tables = Tables::new(env, abundance, traits)?;
        let l = tables.abundance.values();
        let cross = cross_table(&tables, l)?;
        let mut r = cross.z.clone();
        for k in 0..r.rows() {
            for t in 0..r.cols() {
                if cross.constant_env[k] || cross.constant_traits[t] {
                    r[(k, t)] = f64::NAN;
                }
            }
        }

        let mut model2 = vec![0; r.rows() * r.cols()];
        let mut model4 = vec![0; r.rows() * r.cols()];
        for _ in 0..permutations {
            let order = permutation::random_permutation(l.rows(), rng);
            let z = cross_table(&tables, &permutation::permute_rows(l, &order))?.z;
            count_exceedances(&r, &z, &mut model2);

            let order = permutation::random_permutation(l.cols(), rng);
            let z = cross_table(&tables, &permutation::permute_cols(l, &order))?.z;
            count_exceedances(&r, &z, &mut model4);
        }

        let p = |value: f64, count: usize| {
            if value.is_nan() {
                f64::NAN
            } else {
                permutation::p_value(count, permutations)
            }
        };
        let mut cells = vec![];
        for (k, variable) in tables.env.col_names().iter().enumerate() {
            for (t, trait_name) in tables.traits.col_names().iter().enumerate() {
                let i = k * r.cols() + t;
                let p_model2 = p(r[(k, t)], model2[i]);
                let p_model4 = p(r[(k, t)], model4[i]);
                cells.push(FourthCornerCell {
                    variable: variable.clone(),
                    trait_name: trait_name.clone(),
                    r: r[(k, t)],
                    p_model2,
                    p_model4,
                    p_combined: p_model2.max(p_model4),
                    p_adjusted: f64::NAN,
                });
            }
        }
        let combined = cells.iter().map(|c| c.p_combined).collect::<Vec<_>>();
        for (cell, adjusted) in cells.iter_mut().zip(adjust.apply(&combined)) {
            cell.p_adjusted = adjusted;
        }

        let p_adjusted = Matrix::from_vec(
            r.rows(),
            r.cols(),
            cells.iter().map(|c| c.p_adjusted).collect(),
        )?;
        let env_names = tables.env.col_names().to_vec();
        let trait_names = tables.traits.col_names().to_vec();
        Ok(Self {
            permutations,
            adjust,
            cells,
            correlation: Table::new(env_names.clone(), trait_names.clone(), r)?,
            p_adjusted: Table::new(env_names, trait_names, p_adjusted)?,
        })
    }

    /// Cells whose adjusted p-value is at most `alpha`.
    pub fn significant(&self, alpha: f64) -> impl Iterator<Item = &FourthCornerCell> {
        self.cells.iter().filter(move |c| c.p_adjusted <= alpha)
    }
}

fn count_exceedances(observed: &Matrix, permuted: &Matrix, counts: &mut [usize]) {
    for (i, (r, z)) in observed
        .as_slice()
        .iter()
        .zip(permuted.as_slice())
        .enumerate()
    {
        if exceeds(z.abs(), r.abs()) {
            counts[i] += 1;
        }
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

    fn tables(n: usize) -> (Table, Table, Table) {
        let env = Table::from_rows(
            names("p", n),
            vec!["temperature".into(), "constant".into()],
            (0..n).map(|i| vec![i as f64, 1.0]).collect(),
        )
        .unwrap();
        let abundance = Table::from_rows(
            names("p", n),
            names("s", n),
            (0..n)
                .map(|i| {
                    (0..n)
                        .map(|j| if i == j { 8.0 } else { 1.0 })
                        .collect()
                })
                .collect(),
        )
        .unwrap();
        let traits = Table::from_rows(
            names("s", n),
            vec!["height".into(), "sla".into()],
            (0..n)
                .map(|j| vec![j as f64, ((j * 3) % 4) as f64])
                .collect(),
        )
        .unwrap();
        (env, abundance, traits)
    }

    #[test]
    fn test_weighted_correlation() {
        // diagonal-only abundances pair each plot with one species
        let n = 5;
        let (env, _, traits) = tables(n);
        let abundance = Table::from_rows(
            names("p", n),
            names("s", n),
            (0..n)
                .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
                .collect(),
        )
        .unwrap();
        let mut rng = Pcg64::seed_from_u64(0);
        let fc = FourthCorner::run(&env, &abundance, &traits, 0, PAdjust::None, &mut rng).unwrap();
        assert!((fc.correlation.get(0, 0) - 1.0).abs() < 1e-12);
        let expected = crate::correlation(
            &[0.0, 1.0, 2.0, 3.0, 4.0],
            &[0.0, 3.0, 2.0, 1.0, 0.0],
        );
        assert!((fc.correlation.get(0, 1) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_constant_variable_gives_nan() {
        let (env, abundance, traits) = tables(6);
        let mut rng = Pcg64::seed_from_u64(1);
        let fc = FourthCorner::run(&env, &abundance, &traits, 19, PAdjust::Holm, &mut rng)
            .unwrap();
        assert_eq!(fc.cells.len(), 4);
        let constant = &fc.cells[2];
        assert_eq!(constant.variable, "constant");
        assert!(constant.r.is_nan());
        assert!(constant.p_adjusted.is_nan());
        assert!(fc.p_adjusted.get(1, 0).is_nan());
    }

    #[test]
    fn test_strong_association_is_significant() {
        let (env, abundance, traits) = tables(10);
        let mut rng = Pcg64::seed_from_u64(2);
        let fc = FourthCorner::run(&env, &abundance, &traits, 199, PAdjust::Holm, &mut rng)
            .unwrap();
        let cell = &fc.cells[0];
        assert_eq!(
            (cell.variable.as_str(), cell.trait_name.as_str()),
            ("temperature", "height")
        );
        assert!(cell.r > 0.3);
        assert!(cell.p_model2 < 0.05, "{cell:?}");
        assert!(cell.p_model4 < 0.05, "{cell:?}");
        assert!(cell.p_adjusted >= cell.p_combined);
        assert!(fc.significant(0.05).any(|c| c.trait_name == "height"));
    }
}
