//! Community tables and trait aggregation for functional ecology
//!
//! This crate models the three tables of trait-based community analysis and
//! the statistics that connect them:
//!
//! - **R** (plots × environmental covariates)
//! - **L** (plots × species abundances)
//! - **Q** (species × traits)
//!
//! All three are [`table::Table`]s: labeled dense matrices whose row and column
//! names carry plot, species, covariate and trait identifiers.
//!
//! # Workflows
//!
//! ## From raw measurements to tables
//!
//! 1. **Load individuals** ([`io::read_individuals`]): one row per measured organism
//! 2. **Aggregate traits** ([`aggregate::species_means`]): species means, optionally of log10 values
//! 3. **Load abundances** ([`io::read_abundance_records`]): long plot/species/abundance records
//! 4. **Reshape** ([`abundance::abundance_from_records`]): wide L table, missing combinations zero
//!
//! ## Community-weighted means and environmental filtering
//!
//! 1. **Align species** ([`align::align_species`]): intersect L's columns with Q's rows
//! 2. **CWM** ([`cwm::cwm`]): abundance-weighted trait mean per plot
//! 3. **Null-model test** ([`randomization::NullModelTest`]): randomize L or Q with a
//!    [`null_model::NullModel`], accumulate the null CWM distribution and report
//!    standardized effect sizes ([`randomization::SesTable`])
//!
//! # Examples
//!
//! ```
//! use traitscape_community::{cwm::cwm, table::Table};
//!
//! let traits = Table::from_rows(
//!     vec!["A".into(), "B".into()],
//!     vec!["height".into()],
//!     vec![vec![2.0], vec![4.0]],
//! )?;
//! let abundance = Table::from_rows(
//!     vec!["X".into(), "Y".into()],
//!     vec!["A".into(), "B".into()],
//!     vec![vec![3.0, 1.0], vec![0.0, 2.0]],
//! )?;
//!
//! let cwm = cwm(&abundance, &traits)?;
//! assert_eq!(cwm.get(0, 0), 2.5);
//! assert_eq!(cwm.get(1, 0), 4.0);
//! # Ok::<(), traitscape_community::CommunityError>(())
//! ```

use std::path::PathBuf;

use traitscape_stats::linalg::LinalgError;

pub mod abundance;
pub mod aggregate;
pub mod align;
pub mod cwm;
pub mod individual;
pub mod io;
pub mod null_model;
pub mod randomization;
pub mod table;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum CommunityError {
    #[display("{what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[display("duplicate {axis} name '{name}'")]
    DuplicateName { axis: &'static str, name: String },
    #[display("unknown {axis} name '{name}'")]
    UnknownName { axis: &'static str, name: String },
    #[display(
        "species differ between abundance and trait tables \
         (missing traits: {missing_traits:?}, missing abundance: {missing_abundance:?})"
    )]
    SpeciesMismatch {
        missing_traits: Vec<String>,
        missing_abundance: Vec<String>,
    },
    #[display("invalid abundance {value} for species '{species}' in plot '{plot}'")]
    InvalidAbundance {
        plot: String,
        species: String,
        value: f64,
    },
    #[display("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[display("{}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[display("{}:{line}: cannot parse '{value}' in column '{column}'", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },
    #[display("{}: missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[display("{_0}")]
    #[from]
    Linalg(LinalgError),
}

pub type Result<T, E = CommunityError> = std::result::Result<T, E>;
