//! Community-weighted mean (CWM) trait values
//!
//! For plot `p` and trait `t`:
//!
//! ```text
//! CWM(p, t) = Σ_s L(p, s) · Q(s, t) / Σ_s L(p, s)
//! ```
//!
//! Weights are normalized per plot before summing, so a plot dominated by a
//! single species reproduces that species' trait value exactly. Species with
//! zero abundance do not contribute, even when their trait value is missing.
//! A plot with zero total abundance has an undefined CWM and yields NaN.

use std::collections::HashSet;

use traitscape_stats::linalg::Matrix;

use crate::{CommunityError, Result, abundance::check_abundance, table::Table};

/// Community-weighted means of `traits` (species × traits) over `abundance`
/// (plots × species).
///
/// Species are matched by name and Q rows may be in any order, but both
/// tables must contain exactly the same species; use
/// [`align_species`](crate::align::align_species) first when they do not.
/// Abundances must be finite and non-negative
/// ([`CommunityError::InvalidAbundance`] otherwise).
///
/// # Examples
///
/// ```
/// use traitscape_community::{cwm::cwm, table::Table};
///
/// let q = Table::from_rows(
///     vec!["s1".into(), "s2".into()],
///     vec!["t".into()],
///     vec![vec![1.0], vec![3.0]],
/// )?;
/// let l = Table::from_rows(
///     vec!["p1".into(), "p2".into(), "empty".into()],
///     vec!["s1".into(), "s2".into()],
///     vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 0.0]],
/// )?;
/// let out = cwm(&l, &q)?;
/// assert_eq!(out.column(0).take(2).collect::<Vec<_>>(), vec![1.0, 3.0]);
/// assert!(out.get(2, 0).is_nan());
/// # Ok::<(), traitscape_community::CommunityError>(())
/// ```
pub fn cwm(abundance: &Table, traits: &Table) -> Result<Table> {
    check_abundance(abundance)?;
    let matched = match_traits(abundance, traits)?;
    let mut out = Matrix::zeros(abundance.nrows(), traits.ncols());
    cwm_into(abundance.values(), matched.values(), &mut out);
    Table::new(
        abundance.row_names().to_vec(),
        traits.col_names().to_vec(),
        out,
    )
}

/// Reorders Q rows to follow L's columns.
///
/// Fails with [`CommunityError::SpeciesMismatch`] when the species sets differ.
pub fn match_traits(abundance: &Table, traits: &Table) -> Result<Table> {
    let abundance_species = abundance
        .col_names()
        .iter()
        .map(String::as_str)
        .collect::<HashSet<_>>();
    let trait_species = traits
        .row_names()
        .iter()
        .map(String::as_str)
        .collect::<HashSet<_>>();
    if abundance_species != trait_species {
        let mut missing_traits = abundance_species
            .difference(&trait_species)
            .map(|s| (*s).to_owned())
            .collect::<Vec<_>>();
        let mut missing_abundance = trait_species
            .difference(&abundance_species)
            .map(|s| (*s).to_owned())
            .collect::<Vec<_>>();
        missing_traits.sort();
        missing_abundance.sort();
        return Err(CommunityError::SpeciesMismatch {
            missing_traits,
            missing_abundance,
        });
    }
    traits.select_rows(abundance.col_names())
}

/// CWM on raw matrices whose species axes are already aligned.
///
/// `abundance` is plots × species, `traits` is species × traits and `out` is
/// plots × traits. Writing into `out` lets repeated randomizations reuse one
/// buffer.
///
/// # Panics
///
/// Panics if the matrix shapes are inconsistent.
pub fn cwm_into(abundance: &Matrix, traits: &Matrix, out: &mut Matrix) {
    assert_eq!(abundance.cols(), traits.rows(), "species axes differ");
    assert_eq!(out.rows(), abundance.rows(), "plot axes differ");
    assert_eq!(out.cols(), traits.cols(), "trait axes differ");

    for p in 0..abundance.rows() {
        let row = abundance.row(p);
        let total = row.iter().sum::<f64>();
        if total <= 0.0 || total.is_nan() {
            for t in 0..traits.cols() {
                out[(p, t)] = f64::NAN;
            }
            continue;
        }
        for t in 0..traits.cols() {
            out[(p, t)] = 0.0;
        }
        for (s, &a) in row.iter().enumerate() {
            if a <= 0.0 {
                continue;
            }
            let weight = a / total;
            for t in 0..traits.cols() {
                out[(p, t)] += weight * traits[(s, t)];
            }
        }
    }
}
