use clap::{Parser, Subcommand};

use self::{
    aggregate::AggregateArg, cwm::CwmArg, fourth_corner::FourthCornerArg, null_test::NullTestArg,
    pca::PcaArg, rda::RdaArg, rlq::RlqArg, simulate::SimulateArg,
    summarize_snapshot::SummarizeSnapshotArg,
};

mod aggregate;
mod cwm;
mod fourth_corner;
mod null_test;
mod pca;
mod rda;
mod rlq;
mod simulate;
mod summarize_snapshot;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Simulate a trait-environment community and write CSV tables
    Simulate(#[clap(flatten)] SimulateArg),
    /// Aggregate individual measurements into a trait table
    Aggregate(#[clap(flatten)] AggregateArg),
    /// Compute community-weighted mean trait values
    Cwm(#[clap(flatten)] CwmArg),
    /// Test CWMs against a null model and report standardized effect sizes
    NullTest(#[clap(flatten)] NullTestArg),
    /// Summarize a saved null-model snapshot
    SummarizeSnapshot(#[clap(flatten)] SummarizeSnapshotArg),
    /// Principal component analysis of a table
    Pca(#[clap(flatten)] PcaArg),
    /// Redundancy analysis of a response table on explanatory variables
    Rda(#[clap(flatten)] RdaArg),
    /// RLQ analysis of environment, abundance and trait tables
    Rlq(#[clap(flatten)] RlqArg),
    /// Fourth-corner correlations between environment and traits
    FourthCorner(#[clap(flatten)] FourthCornerArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Simulate(arg) => simulate::run(&arg)?,
        Mode::Aggregate(arg) => aggregate::run(&arg)?,
        Mode::Cwm(arg) => cwm::run(&arg)?,
        Mode::NullTest(arg) => null_test::run(&arg)?,
        Mode::SummarizeSnapshot(arg) => summarize_snapshot::run(&arg)?,
        Mode::Pca(arg) => pca::run(&arg)?,
        Mode::Rda(arg) => rda::run(&arg)?,
        Mode::Rlq(arg) => rlq::run(&arg)?,
        Mode::FourthCorner(arg) => fourth_corner::run(&arg)?,
    }
    Ok(())
}

/// Abundance and trait table inputs shared by several subcommands
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CommunityInput {
    /// Abundance CSV (plots x species, or long records with --long)
    #[arg(long)]
    pub abundance: std::path::PathBuf,
    /// Trait CSV (species x traits)
    #[arg(long)]
    pub traits: std::path::PathBuf,
    /// Read abundance as long plot/species/abundance records
    #[arg(long)]
    pub long: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::aggregate::GroupBy;

    fn group_by(args: &[&str]) -> Option<GroupBy> {
        let args = CommandArgs::try_parse_from(
            ["traitscape", "aggregate", "--individuals", "individuals.csv"]
                .iter()
                .chain(args)
                .copied(),
        )
        .ok()?;
        match args.mode {
            Mode::Aggregate(arg) => Some(arg.by),
            _ => None,
        }
    }

    #[test]
    fn test_aggregate_group_by_values() {
        assert_eq!(group_by(&[]), Some(GroupBy::Species));
        assert_eq!(group_by(&["--by", "plot-species"]), Some(GroupBy::PlotSpecies));
        assert_eq!(group_by(&["--by", "plot"]), Some(GroupBy::Plot));
        assert_eq!(group_by(&["--by", "genus"]), None);
    }

    #[test]
    fn test_command_definition_is_valid() {
        use clap::CommandFactory as _;
        CommandArgs::command().debug_assert();
    }
}
