//! Simulation parameters
//!
//! Every field has a default, so a JSON file only needs the values it
//! changes:
//!
//! ```json
//! { "num_plots": 50, "niche_breadth": 0.5, "seed": 7 }
//! ```

use serde::{Deserialize, Serialize};

use crate::{Result, SimError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_plots: usize,
    pub num_species: usize,
    pub environment: Vec<CovariateSpec>,
    pub traits: Vec<TraitSpec>,
    /// Niche width in units of each covariate's standard deviation.
    pub niche_breadth: f64,
    /// Expected abundance of a species at its optimum.
    pub max_abundance: f64,
    /// Measured individuals per species present in a plot.
    pub individuals_per_species: usize,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_plots: 30,
            num_species: 20,
            environment: vec![
                CovariateSpec::new("temperature", 15.0, 5.0),
                CovariateSpec::new("rainfall_seasonality", 50.0, 15.0),
            ],
            traits: vec![
                TraitSpec::new("height", 1.0, 0.3, "temperature", 0.5),
                TraitSpec::new("sla", 15.0, 0.2, "rainfall_seasonality", -0.4),
                TraitSpec::new("seed_mass", 2.0, 0.4, "rainfall_seasonality", 0.6),
                TraitSpec::new("leaf_n", 20.0, 0.15, "temperature", 0.3),
            ],
            niche_breadth: 1.0,
            max_abundance: 100.0,
            individuals_per_species: 5,
            seed: None,
        }
    }
}

/// A normally distributed environmental covariate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovariateSpec {
    pub name: String,
    pub mean: f64,
    pub sd: f64,
}

impl CovariateSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, mean: f64, sd: f64) -> Self {
        Self {
            name: name.into(),
            mean,
            sd,
        }
    }
}

/// A log-normally distributed trait linked to one covariate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitSpec {
    pub name: String,
    /// Trait value of a species whose optimum sits at the covariate mean.
    pub median: f64,
    /// Coefficient of variation among individuals of one species.
    pub cv: f64,
    /// Name of the covariate the trait responds to.
    pub covariate: String,
    /// Log-scale change of the species mean per standard deviation of optimum.
    pub strength: f64,
}

impl TraitSpec {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        median: f64,
        cv: f64,
        covariate: impl Into<String>,
        strength: f64,
    ) -> Self {
        Self {
            name: name.into(),
            median,
            cv,
            covariate: covariate.into(),
            strength,
        }
    }
}

impl SimulationConfig {
    /// Checks parameter ranges and trait-covariate references.
    pub fn validate(&self) -> Result<()> {
        #[expect(clippy::cast_precision_loss)]
        let counts = [
            ("num_plots", self.num_plots as f64),
            ("num_species", self.num_species as f64),
        ];
        for (name, value) in counts {
            require(name, value, value >= 1.0)?;
        }
        require("niche_breadth", self.niche_breadth, self.niche_breadth > 0.0)?;
        require("max_abundance", self.max_abundance, self.max_abundance > 0.0)?;
        for cov in &self.environment {
            require(&format!("{} sd", cov.name), cov.sd, cov.sd > 0.0)?;
            require(&format!("{} mean", cov.name), cov.mean, cov.mean.is_finite())?;
        }
        for spec in &self.traits {
            require(&format!("{} median", spec.name), spec.median, spec.median > 0.0)?;
            require(&format!("{} cv", spec.name), spec.cv, spec.cv >= 0.0)?;
            require(
                &format!("{} strength", spec.name),
                spec.strength,
                spec.strength.is_finite(),
            )?;
            if self.covariate_index(&spec.covariate).is_none() {
                return Err(SimError::UnknownCovariate {
                    trait_name: spec.name.clone(),
                    covariate: spec.covariate.clone(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn covariate_index(&self, name: &str) -> Option<usize> {
        self.environment.iter().position(|c| c.name == name)
    }
}

fn require(name: &str, value: f64, ok: bool) -> Result<()> {
    if ok && !value.is_nan() {
        Ok(())
    } else {
        Err(SimError::InvalidParameter {
            name: name.to_owned(),
            value,
        })
    }
}
