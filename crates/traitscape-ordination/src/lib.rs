//! Constrained and unconstrained ordination of community tables
//!
//! - [`pca::Pca`]: principal components of a single table
//! - [`rda::Rda`]: redundancy analysis, the PCA of a response table fitted by
//!   a linear model on explanatory variables
//! - [`rlq::Rlq`]: co-inertia of environment (R) and traits (Q) through
//!   abundances (L)
//! - [`fourth_corner::FourthCorner`]: abundance-weighted correlation of every
//!   environment variable with every trait
//!
//! Results are plain serializable structs built from
//! [`Table`](traitscape_community::table::Table)s with axis columns named
//! `PC1`, `RDA1`, `RLQ1`, ....
//!
//! Permutation tests share [`permutation::PermutationTest`]. Every random
//! draw comes from a caller-supplied RNG, so seeded runs are reproducible.

use traitscape_community::CommunityError;
use traitscape_stats::linalg::LinalgError;

mod coinertia;
pub mod fourth_corner;
pub mod pca;
pub mod permutation;
pub mod rda;
pub mod rlq;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum OrdinationError {
    #[display("{_0}")]
    #[from]
    Community(CommunityError),
    #[display("{_0}")]
    #[from]
    Linalg(LinalgError),
    #[display("{what} needs at least {required} rows, found {found}")]
    TooFewRows {
        what: &'static str,
        required: usize,
        found: usize,
    },
    #[display("{what} has no columns")]
    NoColumns { what: &'static str },
    #[display("{what} has a missing value at row '{row}', column '{column}'")]
    MissingValue {
        what: &'static str,
        row: String,
        column: String,
    },
    #[display("{axis} '{name}' has zero total abundance")]
    EmptyMargin { axis: &'static str, name: String },
    #[display("{what} has no variance")]
    NoVariance { what: &'static str },
}

pub type Result<T, E = OrdinationError> = std::result::Result<T, E>;

fn axis_names(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|k| format!("{prefix}{k}")).collect()
}

fn ensure_complete(what: &'static str, table: &traitscape_community::table::Table) -> Result<()> {
    for r in 0..table.nrows() {
        if let Some(c) = table.row(r).iter().position(|v| !v.is_finite()) {
            return Err(OrdinationError::MissingValue {
                what,
                row: table.row_names()[r].clone(),
                column: table.col_names()[c].clone(),
            });
        }
    }
    Ok(())
}

/// Pearson correlation of two equally long sequences, NaN if either is constant.
fn correlation(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    #[expect(clippy::cast_precision_loss)]
    let nf = n as f64;
    let mx = x.iter().sum::<f64>() / nf;
    let my = y.iter().sum::<f64>() / nf;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}
