use std::path::PathBuf;

use serde::Serialize;
use traitscape_ordination::rlq::{Rlq, RlqTest};

use crate::{
    command::CommunityInput,
    util::{Output, align_with_warnings, read_abundance, read_table, seeded_rng, warn_plot_order},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RlqArg {
    /// Environment CSV (plots x variables)
    #[arg(long)]
    env: PathBuf,
    #[clap(flatten)]
    input: CommunityInput,
    /// Number of axes to keep
    #[arg(long, default_value_t = 2)]
    axes: usize,
    /// Permutations per model for the inertia test (0 to skip)
    #[arg(long, default_value_t = 999)]
    permutations: usize,
    /// RNG seed for the permutation test
    #[arg(long)]
    seed: Option<u64>,
    /// Output JSON file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RlqReport {
    #[serde(flatten)]
    rlq: Rlq,
    permutation_test: Option<RlqTest>,
    seed: Option<u64>,
}

pub(crate) fn run(arg: &RlqArg) -> anyhow::Result<()> {
    let env = read_table("environment", &arg.env)?;
    let abundance = read_abundance(&arg.input.abundance, arg.input.long)?;
    let traits = read_table("trait", &arg.input.traits)?;
    warn_plot_order("environment", &env, "abundance", &abundance);
    let aligned = align_with_warnings(&abundance, &traits)?;

    let rlq = Rlq::fit(&env, &aligned.abundance, &aligned.traits, arg.axes)?;
    for (k, (value, proportion)) in rlq.eigenvalues.iter().zip(&rlq.proportion).enumerate() {
        eprintln!(
            "RLQ{}: eigenvalue {value:.4} ({:.1}%)",
            k + 1,
            proportion * 100.0
        );
    }

    let (permutation_test, seed) = if arg.permutations > 0 {
        let (mut rng, seed) = seeded_rng(arg.seed);
        let test = Rlq::permutation_test(
            &env,
            &aligned.abundance,
            &aligned.traits,
            arg.permutations,
            &mut rng,
        )?;
        eprintln!(
            "Total inertia = {:.4}, p (model 2) = {:.4}, p (model 4) = {:.4}, combined p = {:.4}",
            test.model2.statistic, test.model2.p_value, test.model4.p_value, test.p_combined
        );
        (Some(test), Some(seed))
    } else {
        (None, None)
    };

    Output::save_json(
        &RlqReport {
            rlq,
            permutation_test,
            seed,
        },
        arg.output.clone(),
    )
}
