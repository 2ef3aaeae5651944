//! Niche-model community simulation

use std::path::Path;

use rand::{Rng, SeedableRng as _};
use rand_distr::{Distribution as _, LogNormal, Normal};
use rand_pcg::Pcg64;
use traitscape_community::{
    abundance::{AbundanceRecord, abundance_to_records, relative_abundance},
    individual::{Individual, IndividualTable},
    io,
    table::Table,
};
use traitscape_stats::linalg::Matrix;

use crate::{Result, SimError, config::SimulationConfig};

/// Standard deviation of the log-scale noise on species trait means.
const TRAIT_MEAN_NOISE: f64 = 0.2;

/// Tables drawn by [`simulate`].
#[derive(Debug, Clone)]
pub struct SimulatedDataset {
    /// Seed that reproduces this dataset.
    pub seed: u64,
    /// Plots × covariates (R).
    pub environment: Table,
    /// Species × covariates niche optima.
    pub optima: Table,
    /// Species × traits, true species means (Q).
    pub species_traits: Table,
    /// Plots × species counts (L).
    pub abundance: Table,
    pub individuals: IndividualTable,
}

/// Draws a dataset, using `config.seed` or a fresh random seed.
pub fn simulate(config: &SimulationConfig) -> Result<SimulatedDataset> {
    config.validate()?;
    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = Pcg64::seed_from_u64(seed);

    let plots = labels("plot", config.num_plots);
    let species = labels("sp", config.num_species);
    let covariates = config
        .environment
        .iter()
        .map(|c| c.name.clone())
        .collect::<Vec<_>>();
    let trait_names = config
        .traits
        .iter()
        .map(|t| t.name.clone())
        .collect::<Vec<_>>();

    let environment = draw_covariates(config, config.num_plots, &mut rng)?;
    let optima = draw_covariates(config, config.num_species, &mut rng)?;

    let noise = Normal::new(0.0, TRAIT_MEAN_NOISE)?;
    let mut trait_means = Matrix::zeros(config.num_species, config.traits.len());
    for s in 0..config.num_species {
        for (t, spec) in config.traits.iter().enumerate() {
            let c = config
                .covariate_index(&spec.covariate)
                .ok_or_else(|| SimError::UnknownCovariate {
                    trait_name: spec.name.clone(),
                    covariate: spec.covariate.clone(),
                })?;
            let cov = &config.environment[c];
            let z = (optima[(s, c)] - cov.mean) / cov.sd;
            trait_means[(s, t)] = spec.median * (spec.strength * z + noise.sample(&mut rng)).exp();
        }
    }

    let mut abundance = Matrix::zeros(config.num_plots, config.num_species);
    for p in 0..config.num_plots {
        for s in 0..config.num_species {
            let mut log_response = 0.0;
            for (c, cov) in config.environment.iter().enumerate() {
                let width = config.niche_breadth * cov.sd;
                let distance = environment[(p, c)] - optima[(s, c)];
                log_response -= distance * distance / (2.0 * width * width);
            }
            let expected = config.max_abundance * log_response.exp();
            let noisy = Normal::new(expected, expected.sqrt())?.sample(&mut rng);
            abundance[(p, s)] = noisy.round().max(0.0);
        }
    }

    let mut individuals = IndividualTable::new(trait_names.clone());
    let spreads = config
        .traits
        .iter()
        .map(|t| (1.0 + t.cv * t.cv).ln().sqrt())
        .collect::<Vec<_>>();
    for p in 0..config.num_plots {
        for s in 0..config.num_species {
            if abundance[(p, s)] <= 0.0 {
                continue;
            }
            for k in 1..=config.individuals_per_species {
                let traits = spreads
                    .iter()
                    .enumerate()
                    .map(|(t, sigma)| {
                        let dist = LogNormal::new(trait_means[(s, t)].ln(), *sigma)?;
                        Ok::<_, SimError>(Some(dist.sample(&mut rng)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                individuals.push(Individual {
                    id: format!("{}-{}-{k}", plots[p], species[s]),
                    plot: plots[p].clone(),
                    species: species[s].clone(),
                    traits,
                })?;
            }
        }
    }

    Ok(SimulatedDataset {
        seed,
        environment: Table::new(plots.clone(), covariates.clone(), environment)?,
        optima: Table::new(species.clone(), covariates, optima)?,
        species_traits: Table::new(species.clone(), trait_names, trait_means)?,
        abundance: Table::new(plots, species, abundance)?,
        individuals,
    })
}

impl SimulatedDataset {
    /// Positive abundances in long format.
    #[must_use]
    pub fn abundance_records(&self) -> Vec<AbundanceRecord> {
        abundance_to_records(&self.abundance)
    }

    /// Abundances as percent cover per plot.
    #[must_use]
    pub fn relative_cover(&self) -> Table {
        relative_abundance(&self.abundance, true)
    }

    /// Writes `environment.csv`, `abundance.csv` (long), `individuals.csv`
    /// and `species_traits.csv` into `dir`, creating it if needed.
    pub fn write_csv(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|source| SimError::Io {
            path: dir.to_owned(),
            source,
        })?;
        io::write_table(&dir.join("environment.csv"), &self.environment)?;
        io::write_abundance_records(&dir.join("abundance.csv"), &self.abundance_records())?;
        io::write_individuals(&dir.join("individuals.csv"), &self.individuals)?;
        io::write_table(&dir.join("species_traits.csv"), &self.species_traits)?;
        Ok(())
    }
}

fn draw_covariates<R>(config: &SimulationConfig, rows: usize, rng: &mut R) -> Result<Matrix>
where
    R: Rng + ?Sized,
{
    let mut out = Matrix::zeros(rows, config.environment.len());
    for (c, cov) in config.environment.iter().enumerate() {
        let dist = Normal::new(cov.mean, cov.sd)?;
        for r in 0..rows {
            out[(r, c)] = dist.sample(rng);
        }
    }
    Ok(out)
}

/// `prefix01`, `prefix02`, ... zero-padded to the width of `count`.
fn labels(prefix: &str, count: usize) -> Vec<String> {
    let width = count.to_string().len().max(2);
    (1..=count).map(|i| format!("{prefix}{i:0width$}")).collect()
}
