use std::path::PathBuf;

use serde::Serialize;
use traitscape_community::abundance::hellinger;
use traitscape_ordination::{permutation::PermutationTest, rda::Rda};

use crate::util::{Output, read_table, seeded_rng, warn_plot_order};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RdaArg {
    /// Response CSV (plots x species)
    #[arg(long)]
    response: PathBuf,
    /// Explanatory CSV (plots x variables)
    #[arg(long)]
    explanatory: PathBuf,
    /// Hellinger-transform the response before fitting
    #[arg(long)]
    hellinger: bool,
    /// Number of constrained axes to keep
    #[arg(long, default_value_t = 2)]
    axes: usize,
    /// Permutations for the model test (0 to skip)
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
struct RdaReport {
    #[serde(flatten)]
    rda: Rda,
    permutation_test: Option<PermutationTest>,
    seed: Option<u64>,
}

pub(crate) fn run(arg: &RdaArg) -> anyhow::Result<()> {
    let mut response = read_table("response", &arg.response)?;
    let explanatory = read_table("explanatory", &arg.explanatory)?;
    warn_plot_order("response", &response, "explanatory", &explanatory);
    if arg.hellinger {
        response = hellinger(&response);
    }

    let rda = Rda::fit(&response, &explanatory, arg.axes)?;
    eprintln!(
        "R2 = {:.4}, adjusted R2 = {:.4}",
        rda.r_squared, rda.adj_r_squared
    );

    let (permutation_test, seed) = if arg.permutations > 0 {
        let (mut rng, seed) = seeded_rng(arg.seed);
        let test = Rda::permutation_test(&response, &explanatory, arg.permutations, &mut rng)?;
        eprintln!(
            "pseudo-F = {:.4}, p = {:.4} ({} permutations)",
            test.statistic, test.p_value, test.permutations
        );
        (Some(test), Some(seed))
    } else {
        (None, None)
    };

    Output::save_json(
        &RdaReport {
            rda,
            permutation_test,
            seed,
        },
        arg.output.clone(),
    )
}
