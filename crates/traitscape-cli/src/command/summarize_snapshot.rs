use std::{io::Write, path::PathBuf};

use traitscape_community::randomization::SesTable;

use crate::util::read_json_file;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SummarizeSnapshotArg {
    /// Path to a snapshot JSON file written by `null-test --snapshot`
    #[arg(long)]
    pub snapshot: PathBuf,
}

pub(crate) fn run(arg: &SummarizeSnapshotArg) -> anyhow::Result<()> {
    let result: SesTable = read_json_file("snapshot", &arg.snapshot)?;
    if let Some(warning) = result.check_alignment().warning() {
        eprintln!("{warning} (observed vs null tables)");
    }
    print_summary(&result, &mut std::io::stdout().lock())
}

pub(crate) fn print_summary<W>(result: &SesTable, out: &mut W) -> anyhow::Result<()>
where
    W: Write,
{
    writeln!(
        out,
        "Null model: {} ({} iterations, seed {}, created {})",
        result.model.name(),
        result.iterations,
        result.seed,
        result.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        out,
        "{:<20} {:>7} {:>9} {:>8} {:>6} {:>6} {:>8}",
        "trait", "plots", "mean SES", "sd SES", "low", "high", "t"
    )?;
    for summary in result.summary() {
        writeln!(
            out,
            "{:<20} {:>7} {:>9.3} {:>8.3} {:>6} {:>6} {:>8.3}",
            summary.trait_name,
            summary.n_plots,
            summary.mean_ses,
            summary.sd_ses,
            summary.n_low,
            summary.n_high,
            summary.t_statistic
        )?;
    }
    Ok(())
}
