//! Null models for randomizing community data
//!
//! Each model breaks one link between plots, species and traits while keeping
//! selected marginal properties of the data intact:
//!
//! | model | randomizes | preserves |
//! |-------|-----------|-----------|
//! | [`Richness`](NullModel::Richness) | abundances within each plot | plot totals and richness |
//! | [`Frequency`](NullModel::Frequency) | abundances within each species | species totals and frequency |
//! | [`IndependentSwap`](NullModel::IndependentSwap) | occupied cells of 2×2 checkerboards | occurrence counts of plots and species |
//! | [`QuantitativeSwap`](NullModel::QuantitativeSwap) | abundance around 2×2 cycles | plot totals and species totals |
//! | [`TraitShuffle`](NullModel::TraitShuffle) | species labels of the trait table | the abundance table |
//!
//! Every randomization starts from the observed matrix, so replicates are
//! independent draws rather than steps of one chain.

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use traitscape_stats::linalg::Matrix;

/// Attempted swaps per randomization when none is given.
pub const DEFAULT_SWAPS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NullModel {
    Richness,
    Frequency,
    IndependentSwap { swaps: usize },
    QuantitativeSwap { swaps: usize },
    TraitShuffle,
}

impl Default for NullModel {
    fn default() -> Self {
        NullModel::IndependentSwap {
            swaps: DEFAULT_SWAPS,
        }
    }
}

impl NullModel {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            NullModel::Richness => "richness",
            NullModel::Frequency => "frequency",
            NullModel::IndependentSwap { .. } => "independent_swap",
            NullModel::QuantitativeSwap { .. } => "quantitative_swap",
            NullModel::TraitShuffle => "trait_shuffle",
        }
    }

    /// Parses a model name, using `swaps` for the swap-based models.
    #[must_use]
    pub fn from_name(name: &str, swaps: usize) -> Option<Self> {
        let model = match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "richness" => NullModel::Richness,
            "frequency" => NullModel::Frequency,
            "independent_swap" | "independentswap" => NullModel::IndependentSwap { swaps },
            "quantitative_swap" | "quantitativeswap" => NullModel::QuantitativeSwap { swaps },
            "trait_shuffle" | "traitshuffle" => NullModel::TraitShuffle,
            _ => return None,
        };
        Some(model)
    }

    /// Whether the model permutes the trait table instead of the abundances.
    #[must_use]
    pub fn randomizes_traits(self) -> bool {
        matches!(self, NullModel::TraitShuffle)
    }

    /// A randomized copy of a plots × species abundance matrix.
    ///
    /// [`TraitShuffle`](NullModel::TraitShuffle) returns the matrix unchanged.
    #[must_use]
    pub fn randomize_abundance<R>(self, abundance: &Matrix, rng: &mut R) -> Matrix
    where
        R: Rng + ?Sized,
    {
        let mut out = abundance.clone();
        self.randomize_abundance_in_place(&mut out, rng);
        out
    }

    /// Randomizes an abundance matrix in place.
    pub fn randomize_abundance_in_place<R>(self, abundance: &mut Matrix, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        match self {
            NullModel::Richness => {
                for p in 0..abundance.rows() {
                    abundance.row_mut(p).shuffle(rng);
                }
            }
            NullModel::Frequency => shuffle_columns(abundance, rng),
            NullModel::IndependentSwap { swaps } => {
                for _ in 0..swaps {
                    independent_swap(abundance, rng);
                }
            }
            NullModel::QuantitativeSwap { swaps } => {
                for _ in 0..swaps {
                    quantitative_swap(abundance, rng);
                }
            }
            NullModel::TraitShuffle => {}
        }
    }

    /// A copy of a species × traits matrix with its rows permuted.
    ///
    /// Models other than [`TraitShuffle`](NullModel::TraitShuffle) return the
    /// matrix unchanged.
    #[must_use]
    pub fn randomize_traits<R>(self, traits: &Matrix, rng: &mut R) -> Matrix
    where
        R: Rng + ?Sized,
    {
        let mut out = traits.clone();
        if self.randomizes_traits() {
            // Fisher-Yates over whole rows
            for i in (1..out.rows()).rev() {
                let j = rng.random_range(0..=i);
                out.swap_rows(i, j);
            }
        }
        out
    }
}

fn shuffle_columns<R>(matrix: &mut Matrix, rng: &mut R)
where
    R: Rng + ?Sized,
{
    for c in 0..matrix.cols() {
        for i in (1..matrix.rows()).rev() {
            let j = rng.random_range(0..=i);
            let tmp = matrix[(i, c)];
            matrix[(i, c)] = matrix[(j, c)];
            matrix[(j, c)] = tmp;
        }
    }
}

/// Two distinct indices below `n`, `None` when `n < 2`.
fn distinct_pair<R>(n: usize, rng: &mut R) -> Option<(usize, usize)>
where
    R: Rng + ?Sized,
{
    if n < 2 {
        return None;
    }
    let a = rng.random_range(0..n);
    let mut b = rng.random_range(0..n - 1);
    if b >= a {
        b += 1;
    }
    Some((a, b))
}

/// Picks plots `i, j` and species `k, l`.
fn pick_cycle<R>(matrix: &Matrix, rng: &mut R) -> Option<(usize, usize, usize, usize)>
where
    R: Rng + ?Sized,
{
    let (i, j) = distinct_pair(matrix.rows(), rng)?;
    let (k, l) = distinct_pair(matrix.cols(), rng)?;
    Some((i, j, k, l))
}

fn independent_swap<R>(matrix: &mut Matrix, rng: &mut R)
where
    R: Rng + ?Sized,
{
    let Some((i, j, k, l)) = pick_cycle(matrix, rng) else {
        return;
    };
    // checkerboard: (i,k) and (j,l) occupied, (i,l) and (j,k) empty
    if matrix[(i, k)] > 0.0 && matrix[(j, l)] > 0.0 && matrix[(i, l)] <= 0.0 && matrix[(j, k)] <= 0.0
    {
        matrix[(i, l)] = matrix[(i, k)];
        matrix[(j, k)] = matrix[(j, l)];
        matrix[(i, k)] = 0.0;
        matrix[(j, l)] = 0.0;
    }
}

fn quantitative_swap<R>(matrix: &mut Matrix, rng: &mut R)
where
    R: Rng + ?Sized,
{
    let Some((i, j, k, l)) = pick_cycle(matrix, rng) else {
        return;
    };
    let d = matrix[(i, k)].min(matrix[(j, l)]);
    if d > 0.0 {
        matrix[(i, k)] -= d;
        matrix[(j, l)] -= d;
        matrix[(i, l)] += d;
        matrix[(j, k)] += d;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    fn sample() -> Matrix {
        Matrix::from_rows(&[
            vec![5.0, 0.0, 3.0, 1.0],
            vec![0.0, 2.0, 0.0, 4.0],
            vec![1.0, 1.0, 0.0, 0.0],
            vec![0.0, 6.0, 2.0, 0.0],
        ])
        .unwrap()
    }

    fn row_totals(m: &Matrix) -> Vec<f64> {
        (0..m.rows()).map(|r| m.row(r).iter().sum()).collect()
    }

    fn col_totals(m: &Matrix) -> Vec<f64> {
        (0..m.cols()).map(|c| m.column(c).sum()).collect()
    }

    fn row_occupancy(m: &Matrix) -> Vec<usize> {
        (0..m.rows())
            .map(|r| m.row(r).iter().filter(|v| **v > 0.0).count())
            .collect()
    }

    fn col_occupancy(m: &Matrix) -> Vec<usize> {
        (0..m.cols())
            .map(|c| m.column(c).filter(|v| *v > 0.0).count())
            .collect()
    }

    fn sorted(mut values: Vec<f64>) -> Vec<f64> {
        values.sort_by(f64::total_cmp);
        values
    }

    #[test]
    fn test_richness_keeps_row_contents() {
        let m = sample();
        let mut rng = Pcg64::seed_from_u64(1);
        let out = NullModel::Richness.randomize_abundance(&m, &mut rng);
        for r in 0..m.rows() {
            assert_eq!(sorted(out.row(r).to_vec()), sorted(m.row(r).to_vec()));
        }
    }

    #[test]
    fn test_frequency_keeps_column_contents() {
        let m = sample();
        let mut rng = Pcg64::seed_from_u64(2);
        let out = NullModel::Frequency.randomize_abundance(&m, &mut rng);
        for c in 0..m.cols() {
            assert_eq!(
                sorted(out.column(c).collect()),
                sorted(m.column(c).collect())
            );
        }
    }

    #[test]
    fn test_independent_swap_keeps_occupancy() {
        let m = sample();
        let mut rng = Pcg64::seed_from_u64(3);
        let out = NullModel::default().randomize_abundance(&m, &mut rng);
        assert_eq!(row_occupancy(&out), row_occupancy(&m));
        assert_eq!(col_occupancy(&out), col_occupancy(&m));
        assert_eq!(row_totals(&out), row_totals(&m));
    }

    #[test]
    fn test_trait_shuffle_permutes_rows_only() {
        let q = Matrix::from_rows(&[vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]]).unwrap();
        let mut rng = Pcg64::seed_from_u64(4);
        let model = NullModel::TraitShuffle;
        let out = model.randomize_traits(&q, &mut rng);
        let mut rows = out.to_rows();
        rows.sort_by(|a, b| a[0].total_cmp(&b[0]));
        assert_eq!(rows, q.to_rows());

        let l = sample();
        assert_eq!(model.randomize_abundance(&l, &mut rng), l);
        assert_eq!(NullModel::Richness.randomize_traits(&q, &mut rng), q);
    }

    #[test]
    fn test_swaps_on_degenerate_matrix_are_noops() {
        let m = Matrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        let mut rng = Pcg64::seed_from_u64(5);
        for model in [
            NullModel::IndependentSwap { swaps: 50 },
            NullModel::QuantitativeSwap { swaps: 50 },
        ] {
            assert_eq!(model.randomize_abundance(&m, &mut rng), m);
        }
    }

    #[test]
    fn test_model_names() {
        for model in [
            NullModel::Richness,
            NullModel::Frequency,
            NullModel::IndependentSwap { swaps: 7 },
            NullModel::QuantitativeSwap { swaps: 7 },
            NullModel::TraitShuffle,
        ] {
            assert_eq!(NullModel::from_name(model.name(), 7), Some(model));
        }
        assert_eq!(
            NullModel::from_name("Independent-Swap", 3),
            Some(NullModel::IndependentSwap { swaps: 3 })
        );
        assert_eq!(NullModel::from_name("curveball", 3), None);
    }

    fn integer_matrix() -> impl Strategy<Value = Matrix> {
        (2usize..6, 2usize..6).prop_flat_map(|(rows, cols)| {
            prop::collection::vec(0u8..5, rows * cols).prop_map(move |cells| {
                Matrix::from_vec(rows, cols, cells.into_iter().map(f64::from).collect()).unwrap()
            })
        })
    }

    proptest! {
        #[test]
        fn test_quantitative_swap_keeps_margins(m in integer_matrix(), seed in any::<u64>()) {
            let mut rng = Pcg64::seed_from_u64(seed);
            let out = NullModel::QuantitativeSwap { swaps: 200 }.randomize_abundance(&m, &mut rng);
            prop_assert_eq!(row_totals(&out), row_totals(&m));
            prop_assert_eq!(col_totals(&out), col_totals(&m));
            prop_assert!(out.as_slice().iter().all(|v| *v >= 0.0));
        }

        #[test]
        fn test_independent_swap_keeps_occurrences(m in integer_matrix(), seed in any::<u64>()) {
            let mut rng = Pcg64::seed_from_u64(seed);
            let out = NullModel::IndependentSwap { swaps: 200 }.randomize_abundance(&m, &mut rng);
            prop_assert_eq!(row_occupancy(&out), row_occupancy(&m));
            prop_assert_eq!(col_occupancy(&out), col_occupancy(&m));
            prop_assert_eq!(row_totals(&out), row_totals(&m));
        }

        #[test]
        fn test_richness_keeps_row_margins(m in integer_matrix(), seed in any::<u64>()) {
            let mut rng = Pcg64::seed_from_u64(seed);
            let out = NullModel::Richness.randomize_abundance(&m, &mut rng);
            for r in 0..m.rows() {
                prop_assert_eq!(sorted(out.row(r).to_vec()), sorted(m.row(r).to_vec()));
            }
            prop_assert_eq!(row_totals(&out), row_totals(&m));
            prop_assert_eq!(row_occupancy(&out), row_occupancy(&m));
        }

        #[test]
        fn test_frequency_keeps_column_margins(m in integer_matrix(), seed in any::<u64>()) {
            let mut rng = Pcg64::seed_from_u64(seed);
            let out = NullModel::Frequency.randomize_abundance(&m, &mut rng);
            for c in 0..m.cols() {
                prop_assert_eq!(sorted(out.column(c).collect()), sorted(m.column(c).collect()));
            }
            prop_assert_eq!(col_totals(&out), col_totals(&m));
            prop_assert_eq!(col_occupancy(&out), col_occupancy(&m));
        }
    }
}
