//! Null-model randomization tests of community-weighted means
//!
//! [`NullModelTest::run`] compares the observed CWM of every plot and trait
//! with the CWMs of randomized communities. Null moments and ranks are
//! accumulated on the fly, so memory use does not grow with the number of
//! iterations.
//!
//! The result, a [`SesTable`], is serializable and carries the model, the
//! seed and a timestamp so that saved runs can be reloaded and reproduced.

use chrono::{DateTime, Utc};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use traitscape_stats::{
    descriptive::DescriptiveStats,
    effect_size::{self, EffectSize, RankCounts},
    linalg::Matrix,
    running::RunningStats,
};

use crate::{
    Result,
    abundance::check_abundance,
    align::{OrderCheck, check_row_order},
    cwm::{cwm_into, match_traits},
    null_model::NullModel,
    table::Table,
};

/// Default number of randomizations.
pub const DEFAULT_ITERATIONS: usize = 999;

/// Configuration of a null-model test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullModelTest {
    pub model: NullModel,
    pub iterations: usize,
    /// RNG seed; a random one is drawn (and recorded) when `None`.
    pub seed: Option<u64>,
}

impl Default for NullModelTest {
    fn default() -> Self {
        Self {
            model: NullModel::default(),
            iterations: DEFAULT_ITERATIONS,
            seed: None,
        }
    }
}

impl NullModelTest {
    #[must_use]
    pub fn new(model: NullModel, iterations: usize, seed: Option<u64>) -> Self {
        Self {
            model,
            iterations,
            seed,
        }
    }

    /// Runs the test on an abundance table (plots × species) and a trait table
    /// (species × traits) with identical species sets.
    ///
    /// # Examples
    ///
    /// ```
    /// use traitscape_community::{
    ///     null_model::NullModel, randomization::NullModelTest, table::Table,
    /// };
    ///
    /// let l = Table::from_rows(
    ///     vec!["p1".into(), "p2".into()],
    ///     vec!["a".into(), "b".into(), "c".into()],
    ///     vec![vec![4.0, 1.0, 0.0], vec![0.0, 2.0, 3.0]],
    /// )?;
    /// let q = Table::from_rows(
    ///     vec!["a".into(), "b".into(), "c".into()],
    ///     vec!["height".into()],
    ///     vec![vec![1.0], vec![2.0], vec![3.0]],
    /// )?;
    /// let test = NullModelTest::new(NullModel::TraitShuffle, 99, Some(42));
    /// let ses = test.run(&l, &q)?;
    /// assert_eq!(ses.seed, 42);
    /// assert_eq!(ses.ses.nrows(), 2);
    /// # Ok::<(), traitscape_community::CommunityError>(())
    /// ```
    pub fn run(&self, abundance: &Table, traits: &Table) -> Result<SesTable> {
        self.run_with_progress(abundance, traits, |_| {})
    }

    /// Like [`run`](Self::run), calling `progress` with the number of
    /// completed iterations after each one.
    pub fn run_with_progress<F>(
        &self,
        abundance: &Table,
        traits: &Table,
        mut progress: F,
    ) -> Result<SesTable>
    where
        F: FnMut(usize),
    {
        check_abundance(abundance)?;
        let traits = match_traits(abundance, traits)?;
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = Pcg64::seed_from_u64(seed);

        let l = abundance.values();
        let q = traits.values();
        let (plots, num_traits) = (l.rows(), q.cols());

        let mut observed = Matrix::zeros(plots, num_traits);
        cwm_into(l, q, &mut observed);

        let mut moments = vec![RunningStats::new(); plots * num_traits];
        let mut ranks = vec![RankCounts::default(); plots * num_traits];
        let mut null = Matrix::zeros(plots, num_traits);
        let mut shuffled = l.clone();

        for iteration in 0..self.iterations {
            if self.model.randomizes_traits() {
                let shuffled_traits = self.model.randomize_traits(q, &mut rng);
                cwm_into(l, &shuffled_traits, &mut null);
            } else {
                shuffled.clone_from(l);
                self.model
                    .randomize_abundance_in_place(&mut shuffled, &mut rng);
                cwm_into(&shuffled, q, &mut null);
            }
            for p in 0..plots {
                for t in 0..num_traits {
                    let i = p * num_traits + t;
                    moments[i].push(null[(p, t)]);
                    ranks[i].push(observed[(p, t)], null[(p, t)]);
                }
            }
            progress(iteration + 1);
        }

        let mut null_mean = Matrix::zeros(plots, num_traits);
        let mut null_sd = Matrix::zeros(plots, num_traits);
        let mut ses = Matrix::zeros(plots, num_traits);
        let mut p_normal = Matrix::zeros(plots, num_traits);
        let mut p_rank = Matrix::zeros(plots, num_traits);
        for p in 0..plots {
            for t in 0..num_traits {
                let i = p * num_traits + t;
                let es = EffectSize::from_null(observed[(p, t)], &moments[i]);
                null_mean[(p, t)] = es.null_mean;
                null_sd[(p, t)] = es.null_sd;
                ses[(p, t)] = es.ses;
                p_normal[(p, t)] = es.p_normal;
                p_rank[(p, t)] = ranks[i].two_tailed_p();
            }
        }

        let like = |values| {
            Table::new(
                abundance.row_names().to_vec(),
                traits.col_names().to_vec(),
                values,
            )
        };
        Ok(SesTable {
            model: self.model,
            iterations: self.iterations,
            seed,
            created_at: Utc::now(),
            observed: like(observed)?,
            null_mean: like(null_mean)?,
            null_sd: like(null_sd)?,
            ses: like(ses)?,
            p_normal: like(p_normal)?,
            p_rank: like(p_rank)?,
        })
    }
}

/// Result of a [`NullModelTest`]: plots × traits tables of every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SesTable {
    pub model: NullModel,
    pub iterations: usize,
    pub seed: u64,
    pub created_at: DateTime<Utc>,
    pub observed: Table,
    pub null_mean: Table,
    pub null_sd: Table,
    pub ses: Table,
    pub p_normal: Table,
    pub p_rank: Table,
}

/// One plot/trait cell of a [`SesTable`] in long format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SesRecord {
    pub plot: String,
    #[serde(rename = "trait")]
    pub trait_name: String,
    pub observed: f64,
    pub null_mean: f64,
    pub null_sd: f64,
    pub ses: f64,
    pub p_normal: f64,
    pub p_rank: f64,
    pub significant: bool,
}

/// Distribution of SES values of one trait across plots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitSesSummary {
    #[serde(rename = "trait")]
    pub trait_name: String,
    /// Plots with a defined SES.
    pub n_plots: usize,
    pub mean_ses: f64,
    pub sd_ses: f64,
    /// Plots with SES ≤ -1.96 (trait values lower than expected).
    pub n_low: usize,
    /// Plots with SES ≥ 1.96.
    pub n_high: usize,
    /// One-sample t statistic of the mean SES against zero.
    pub t_statistic: f64,
}

impl SesTable {
    /// Effect size of one cell.
    #[must_use]
    pub fn effect_size(&self, plot: usize, trait_index: usize) -> EffectSize {
        EffectSize {
            observed: self.observed.get(plot, trait_index),
            null_mean: self.null_mean.get(plot, trait_index),
            null_sd: self.null_sd.get(plot, trait_index),
            ses: self.ses.get(plot, trait_index),
            p_normal: self.p_normal.get(plot, trait_index),
        }
    }

    /// `(plot, trait)` names of every significant cell.
    #[must_use]
    pub fn significant_cells(&self) -> Vec<(&str, &str)> {
        let mut cells = vec![];
        for (p, plot) in self.ses.row_names().iter().enumerate() {
            for (t, name) in self.ses.col_names().iter().enumerate() {
                if effect_size::is_significant(self.ses.get(p, t)) {
                    cells.push((plot.as_str(), name.as_str()));
                }
            }
        }
        cells
    }

    /// Per-trait summary of SES across plots. Undefined SES values are skipped.
    #[must_use]
    pub fn summary(&self) -> Vec<TraitSesSummary> {
        self.ses
            .col_names()
            .iter()
            .enumerate()
            .map(|(t, name)| {
                let values = self
                    .ses
                    .column(t)
                    .filter(|v| !v.is_nan())
                    .collect::<Vec<_>>();
                let n_low = values
                    .iter()
                    .filter(|v| **v <= -effect_size::SIGNIFICANCE_THRESHOLD)
                    .count();
                let n_high = values
                    .iter()
                    .filter(|v| **v >= effect_size::SIGNIFICANCE_THRESHOLD)
                    .count();
                let stats = DescriptiveStats::new(values.iter().copied());
                let (mean_ses, sd_ses) = stats
                    .as_ref()
                    .map_or((f64::NAN, f64::NAN), |s| (s.mean, s.std_dev));
                TraitSesSummary {
                    trait_name: name.clone(),
                    n_plots: values.len(),
                    mean_ses,
                    sd_ses,
                    n_low,
                    n_high,
                    t_statistic: one_sample_t(mean_ses, sd_ses, values.len()),
                }
            })
            .collect()
    }

    /// Compares plot order of the observed and null tables.
    ///
    /// A snapshot edited or assembled by hand can end up with misaligned rows;
    /// callers are expected to warn and continue.
    #[must_use]
    pub fn check_alignment(&self) -> OrderCheck {
        [&self.null_mean, &self.null_sd, &self.ses]
            .into_iter()
            .map(|table| check_row_order(&self.observed, table))
            .find(OrderCheck::is_mismatch)
            .unwrap_or(OrderCheck::Aligned)
    }

    /// Flattens the table into one record per plot and trait.
    #[must_use]
    pub fn to_records(&self) -> Vec<SesRecord> {
        let mut records = vec![];
        for (p, plot) in self.observed.row_names().iter().enumerate() {
            for (t, name) in self.observed.col_names().iter().enumerate() {
                let es = self.effect_size(p, t);
                records.push(SesRecord {
                    plot: plot.clone(),
                    trait_name: name.clone(),
                    observed: es.observed,
                    null_mean: es.null_mean,
                    null_sd: es.null_sd,
                    ses: es.ses,
                    p_normal: es.p_normal,
                    p_rank: self.p_rank.get(p, t),
                    significant: es.is_significant(),
                });
            }
        }
        records
    }
}

#[expect(clippy::cast_precision_loss)]
fn one_sample_t(mean: f64, sd: f64, n: usize) -> f64 {
    if n < 2 || sd.is_nan() || sd <= 0.0 {
        return f64::NAN;
    }
    mean / (sd / (n as f64).sqrt())
}
