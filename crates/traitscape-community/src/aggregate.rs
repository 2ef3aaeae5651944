//! Aggregating individual measurements into species and plot tables
//!
//! Trait values are usually averaged per species to build Q. Size-related
//! traits (height, seed mass, leaf area) are right-skewed and are commonly
//! averaged on a log10 scale; [`TraitTransform::Log10`] applies that before
//! averaging.

use serde::{Deserialize, Serialize};
use traitscape_stats::{linalg::Matrix, running::RunningStats};

use crate::{Result, abundance::Interner, individual::IndividualTable, table::Table};

/// Transformation applied to each measurement before aggregation.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr,
)]
pub enum TraitTransform {
    #[default]
    Identity,
    /// log10 of the value; non-positive values become missing.
    Log10,
}

impl TraitTransform {
    #[must_use]
    pub fn apply(self, value: f64) -> Option<f64> {
        match self {
            TraitTransform::Identity => Some(value),
            TraitTransform::Log10 if value > 0.0 => Some(value.log10()),
            TraitTransform::Log10 => None,
        }
    }
}

/// Mean trait values per species (the Q table).
///
/// Missing values are skipped; a species with no measurement of a trait gets
/// NaN. Species keep their order of first appearance.
///
/// # Examples
///
/// ```
/// use traitscape_community::{
///     aggregate::{TraitTransform, species_means},
///     individual::{Individual, IndividualTable},
/// };
///
/// let mut individuals = IndividualTable::new(vec!["height".into()]);
/// for (id, species, height) in [("1", "A", 10.0), ("2", "A", 1000.0), ("3", "B", 100.0)] {
///     individuals.push(Individual {
///         id: id.into(),
///         plot: "p1".into(),
///         species: species.into(),
///         traits: vec![Some(height)],
///     })?;
/// }
/// let q = species_means(&individuals, TraitTransform::Log10)?;
/// assert_eq!(q.cell("A", "height"), Some(2.0));
/// assert_eq!(q.cell("B", "height"), Some(2.0));
/// # Ok::<(), traitscape_community::CommunityError>(())
/// ```
pub fn species_means(individuals: &IndividualTable, transform: TraitTransform) -> Result<Table> {
    grouped_means(individuals, transform, |ind| ind.species.clone())
}

/// Mean trait values per plot and species, row names `plot:species`.
///
/// Keeps intraspecific variation between plots visible.
pub fn plot_species_means(
    individuals: &IndividualTable,
    transform: TraitTransform,
) -> Result<Table> {
    grouped_means(individuals, transform, |ind| {
        format!("{}:{}", ind.plot, ind.species)
    })
}

/// Plot-level trait means over every measured individual.
///
/// Equivalent to a community-weighted mean in which each species is weighted
/// by its number of measured individuals and trait values vary within species.
pub fn cwm_from_individuals(
    individuals: &IndividualTable,
    transform: TraitTransform,
) -> Result<Table> {
    grouped_means(individuals, transform, |ind| ind.plot.clone())
}

/// Number of measured individuals per plot and species.
pub fn individual_counts(individuals: &IndividualTable) -> Result<Table> {
    let mut plots = Interner::default();
    let mut species = Interner::default();
    let cells = individuals
        .individuals()
        .iter()
        .map(|ind| (plots.intern(&ind.plot), species.intern(&ind.species)))
        .collect::<Vec<_>>();
    let mut values = Matrix::zeros(plots.names.len(), species.names.len());
    for (p, s) in cells {
        values[(p, s)] += 1.0;
    }
    Table::new(plots.names, species.names, values)
}

fn grouped_means<F>(
    individuals: &IndividualTable,
    transform: TraitTransform,
    mut key: F,
) -> Result<Table>
where
    F: FnMut(&crate::individual::Individual) -> String,
{
    let num_traits = individuals.trait_names().len();
    let mut groups = Interner::default();
    let mut accumulators: Vec<Vec<RunningStats>> = vec![];

    for ind in individuals.individuals() {
        let g = groups.intern(&key(ind));
        if g == accumulators.len() {
            accumulators.push(vec![RunningStats::new(); num_traits]);
        }
        for (acc, value) in accumulators[g].iter_mut().zip(&ind.traits) {
            if let Some(v) = value.and_then(|v| transform.apply(v)) {
                acc.push(v);
            }
        }
    }

    let rows = accumulators
        .iter()
        .map(|accs| accs.iter().map(RunningStats::mean).collect())
        .collect();
    Table::from_rows(groups.names, individuals.trait_names().to_vec(), rows)
}
