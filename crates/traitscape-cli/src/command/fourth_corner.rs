use std::path::PathBuf;

use serde::Serialize;
use traitscape_ordination::fourth_corner::FourthCorner;
use traitscape_stats::adjust::PAdjust;

use crate::{
    command::CommunityInput,
    util::{Output, align_with_warnings, read_abundance, read_table, seeded_rng, warn_plot_order},
};

const ALPHA: f64 = 0.05;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct FourthCornerArg {
    /// Environment CSV (plots x variables)
    #[arg(long)]
    env: PathBuf,
    #[clap(flatten)]
    input: CommunityInput,
    /// Permutations per model
    #[arg(long, default_value_t = 999)]
    permutations: usize,
    /// P-value adjustment (none, holm, benjaminihochberg)
    #[arg(long, default_value = "holm")]
    adjust: PAdjust,
    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,
    /// Output JSON file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct FourthCornerReport {
    #[serde(flatten)]
    result: FourthCorner,
    seed: u64,
}

pub(crate) fn run(arg: &FourthCornerArg) -> anyhow::Result<()> {
    let env = read_table("environment", &arg.env)?;
    let abundance = read_abundance(&arg.input.abundance, arg.input.long)?;
    let traits = read_table("trait", &arg.input.traits)?;
    warn_plot_order("environment", &env, "abundance", &abundance);
    let aligned = align_with_warnings(&abundance, &traits)?;

    let (mut rng, seed) = seeded_rng(arg.seed);
    eprintln!(
        "Testing {} x {} pairs with {} permutations per model...",
        env.ncols(),
        aligned.traits.ncols(),
        arg.permutations
    );
    let result = FourthCorner::run(
        &env,
        &aligned.abundance,
        &aligned.traits,
        arg.permutations,
        arg.adjust,
        &mut rng,
    )?;
    for cell in result.significant(ALPHA) {
        eprintln!(
            "  {} ~ {}: r = {:.3}, adjusted p = {:.4}",
            cell.variable, cell.trait_name, cell.r, cell.p_adjusted
        );
    }

    Output::save_json(&FourthCornerReport { result, seed }, arg.output.clone())
}
