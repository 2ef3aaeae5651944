//! Simulated trait-environment communities
//!
//! Generates the three tables of a trait-based community study from a
//! niche model: plots get environmental conditions, species get optima along
//! each covariate, species trait means follow their optima, and abundances
//! follow a Gaussian response to the distance between plot conditions and
//! species optima. Individual measurements are drawn around the species
//! means.
//!
//! The output feeds every other part of the workspace, so a simulated dataset
//! with a known trait-environment link is the natural end-to-end check.
//!
//! # Examples
//!
//! ```
//! use traitscape_sim::{config::SimulationConfig, simulate::simulate};
//!
//! let config = SimulationConfig {
//!     num_plots: 5,
//!     num_species: 4,
//!     seed: Some(1),
//!     ..SimulationConfig::default()
//! };
//! let data = simulate(&config)?;
//! assert_eq!(data.environment.nrows(), 5);
//! assert_eq!(data.species_traits.nrows(), 4);
//! # Ok::<(), traitscape_sim::SimError>(())
//! ```

use std::path::PathBuf;

use traitscape_community::CommunityError;

pub mod config;
pub mod simulate;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum SimError {
    #[display("{_0}")]
    #[from]
    Community(CommunityError),
    #[display("{_0}")]
    #[from]
    Distribution(rand_distr::NormalError),
    #[display("invalid {name}: {value}")]
    InvalidParameter { name: String, value: f64 },
    #[display("trait '{trait_name}' responds to unknown covariate '{covariate}'")]
    UnknownCovariate {
        trait_name: String,
        covariate: String,
    },
    #[display("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
