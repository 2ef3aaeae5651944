use std::path::PathBuf;

use traitscape_community::{abundance::relative_abundance, cwm::cwm};

use crate::{
    command::CommunityInput,
    util::{Output, align_with_warnings, read_abundance, read_table},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CwmArg {
    #[clap(flatten)]
    input: CommunityInput,
    /// Convert abundances to percent cover before weighting
    #[arg(long)]
    relative: bool,
    /// Output CSV file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &CwmArg) -> anyhow::Result<()> {
    let mut abundance = read_abundance(&arg.input.abundance, arg.input.long)?;
    let traits = read_table("trait", &arg.input.traits)?;
    if arg.relative {
        abundance = relative_abundance(&abundance, true);
    }

    let aligned = align_with_warnings(&abundance, &traits)?;
    let result = cwm(&aligned.abundance, &aligned.traits)?;

    let empty = aligned
        .abundance
        .row_sums()
        .into_iter()
        .filter(|total| *total <= 0.0)
        .count();
    if empty > 0 {
        eprintln!("WARNING: {empty} plots have no abundance; their CWM is NA");
    }
    Output::save_table(&result, arg.output.clone())
}
