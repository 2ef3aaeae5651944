use std::path::PathBuf;

use anyhow::Context;
use traitscape_community::{
    aggregate::{self, TraitTransform},
    io,
};

use crate::util::Output;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GroupBy {
    /// One row per species
    #[default]
    Species,
    /// One row per plot and species (`plot:species`)
    PlotSpecies,
    /// One row per plot, averaging all measured individuals
    Plot,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AggregateArg {
    /// Individual measurements CSV (plot, species, optional id, traits...)
    #[arg(long)]
    individuals: PathBuf,
    /// Transformation applied before averaging (identity, log10)
    #[arg(long, default_value = "identity")]
    transform: TraitTransform,
    /// Grouping of individuals
    #[arg(long, value_enum, default_value_t = GroupBy::Species)]
    pub(crate) by: GroupBy,
    /// Output CSV file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &AggregateArg) -> anyhow::Result<()> {
    let individuals = io::read_individuals(&arg.individuals).with_context(|| {
        format!(
            "Failed to read individuals: {}",
            arg.individuals.display()
        )
    })?;
    eprintln!(
        "Loaded {} individuals with {} traits",
        individuals.len(),
        individuals.trait_names().len()
    );

    let table = match arg.by {
        GroupBy::Species => aggregate::species_means(&individuals, arg.transform)?,
        GroupBy::PlotSpecies => aggregate::plot_species_means(&individuals, arg.transform)?,
        GroupBy::Plot => aggregate::cwm_from_individuals(&individuals, arg.transform)?,
    };
    eprintln!("Aggregated into {} rows", table.nrows());
    Output::save_table(&table, arg.output.clone())
}
