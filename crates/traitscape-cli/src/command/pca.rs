use std::path::PathBuf;

use traitscape_ordination::pca::Pca;

use crate::util::{Output, read_table};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PcaArg {
    /// Input CSV table (rows x variables)
    #[arg(long)]
    table: PathBuf,
    /// Scale variables to unit variance (correlation PCA)
    #[arg(long)]
    scale: bool,
    /// Number of axes to keep
    #[arg(long, default_value_t = 2)]
    axes: usize,
    /// Output JSON file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &PcaArg) -> anyhow::Result<()> {
    let table = read_table("input", &arg.table)?;
    let pca = Pca::fit(&table, arg.scale, arg.axes)?;
    for (k, (value, proportion)) in pca.eigenvalues.iter().zip(&pca.proportion).enumerate() {
        eprintln!(
            "PC{}: eigenvalue {value:.4} ({:.1}%)",
            k + 1,
            proportion * 100.0
        );
    }
    Output::save_json(&pca, arg.output.clone())
}
