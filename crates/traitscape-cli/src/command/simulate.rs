use std::path::PathBuf;

use traitscape_sim::{config::SimulationConfig, simulate::simulate};

use crate::util::read_json_file;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    /// Simulation config JSON (defaults apply to missing fields)
    #[arg(long)]
    config: Option<PathBuf>,
    /// RNG seed, overriding the config
    #[arg(long)]
    seed: Option<u64>,
    /// Directory for the generated CSV files
    #[arg(long, default_value = "simulated")]
    out_dir: PathBuf,
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let mut config = match &arg.config {
        Some(path) => read_json_file::<SimulationConfig, _>("simulation config", path)?,
        None => SimulationConfig::default(),
    };
    if arg.seed.is_some() {
        config.seed = arg.seed;
    }

    eprintln!(
        "Simulating {} plots x {} species...",
        config.num_plots, config.num_species
    );
    let data = simulate(&config)?;
    data.write_csv(&arg.out_dir)?;

    let present = data
        .abundance
        .values()
        .as_slice()
        .iter()
        .filter(|v| **v > 0.0)
        .count();
    eprintln!("Seed: {}", data.seed);
    eprintln!(
        "Wrote {} occurrences and {} individuals to {}",
        present,
        data.individuals.len(),
        arg.out_dir.display()
    );
    Ok(())
}
