//! Abundance (L) tables
//!
//! Field surveys usually record abundance in long format, one row per
//! plot/species observation. [`abundance_from_records`] reshapes those records
//! into a plot × species table where unobserved combinations are zero.
//! Wide tables go through [`abundance_from_wide`], which applies the same
//! rule to missing cells.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use traitscape_stats::linalg::Matrix;

use crate::{CommunityError, Result, table::Table};

/// One plot/species observation in long format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbundanceRecord {
    pub plot: String,
    pub species: String,
    pub abundance: f64,
}

impl AbundanceRecord {
    #[must_use]
    pub fn new(plot: impl Into<String>, species: impl Into<String>, abundance: f64) -> Self {
        Self {
            plot: plot.into(),
            species: species.into(),
            abundance,
        }
    }
}

/// Reshapes long records into a plot × species table.
///
/// Plots and species keep the order of their first appearance. Repeated
/// plot/species records are summed. Negative or NaN abundances are rejected.
///
/// # Examples
///
/// ```
/// use traitscape_community::abundance::{AbundanceRecord, abundance_from_records};
///
/// let records = [
///     AbundanceRecord::new("X", "A", 3.0),
///     AbundanceRecord::new("X", "B", 1.0),
///     AbundanceRecord::new("Y", "B", 2.0),
/// ];
/// let l = abundance_from_records(&records)?;
/// assert_eq!(l.cell("Y", "A"), Some(0.0));
/// assert_eq!(l.cell("Y", "B"), Some(2.0));
/// # Ok::<(), traitscape_community::CommunityError>(())
/// ```
pub fn abundance_from_records(records: &[AbundanceRecord]) -> Result<Table> {
    let mut plots = Interner::default();
    let mut species = Interner::default();
    let mut cells = Vec::with_capacity(records.len());
    for record in records {
        if record.abundance.is_nan() || record.abundance < 0.0 {
            return Err(CommunityError::InvalidAbundance {
                plot: record.plot.clone(),
                species: record.species.clone(),
                value: record.abundance,
            });
        }
        let p = plots.intern(&record.plot);
        let s = species.intern(&record.species);
        cells.push((p, s, record.abundance));
    }

    let mut values = Matrix::zeros(plots.names.len(), species.names.len());
    for (p, s, abundance) in cells {
        values[(p, s)] += abundance;
    }
    Table::new(plots.names, species.names, values)
}

/// Turns a wide plot × species table into an abundance table.
///
/// Missing (NaN) cells mean the species was not recorded and become zero.
/// Negative or infinite cells are rejected.
///
/// # Examples
///
/// ```
/// use traitscape_community::{abundance::abundance_from_wide, table::Table};
///
/// let wide = Table::from_rows(
///     vec!["X".into()],
///     vec!["A".into(), "B".into()],
///     vec![vec![3.0, f64::NAN]],
/// )?;
/// let l = abundance_from_wide(wide)?;
/// assert_eq!(l.row(0), &[3.0, 0.0]);
/// # Ok::<(), traitscape_community::CommunityError>(())
/// ```
pub fn abundance_from_wide(mut table: Table) -> Result<Table> {
    for p in 0..table.nrows() {
        for s in 0..table.ncols() {
            if table.get(p, s).is_nan() {
                table.set(p, s, 0.0);
            }
        }
    }
    check_abundance(&table)?;
    Ok(table)
}

/// Fails with [`CommunityError::InvalidAbundance`] on the first cell that is
/// negative or not finite.
pub fn check_abundance(abundance: &Table) -> Result<()> {
    for p in 0..abundance.nrows() {
        if let Some(s) = abundance
            .row(p)
            .iter()
            .position(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(CommunityError::InvalidAbundance {
                plot: abundance.row_names()[p].clone(),
                species: abundance.col_names()[s].clone(),
                value: abundance.get(p, s),
            });
        }
    }
    Ok(())
}

/// Flattens a plot × species table back into long records, skipping zeros.
#[must_use]
pub fn abundance_to_records(abundance: &Table) -> Vec<AbundanceRecord> {
    let mut records = vec![];
    for (p, plot) in abundance.row_names().iter().enumerate() {
        for (s, species) in abundance.col_names().iter().enumerate() {
            let value = abundance.get(p, s);
            if value != 0.0 {
                records.push(AbundanceRecord::new(plot.clone(), species.clone(), value));
            }
        }
    }
    records
}

/// Divides every plot by its total abundance.
///
/// With `percent`, relative abundances are expressed as percent cover
/// (summing to 100). Plots with zero total stay zero.
#[must_use]
pub fn relative_abundance(abundance: &Table, percent: bool) -> Table {
    let scale = if percent { 100.0 } else { 1.0 };
    let totals = abundance.row_sums();
    let mut out = abundance.clone();
    for (p, total) in totals.into_iter().enumerate() {
        if total <= 0.0 {
            continue;
        }
        for s in 0..out.ncols() {
            let v = out.get(p, s);
            out.set(p, s, v / total * scale);
        }
    }
    out
}

/// Hellinger transformation: square root of relative abundance.
///
/// Makes abundance tables suitable for Euclidean methods such as RDA
/// (Legendre & Gallagher 2001).
#[must_use]
pub fn hellinger(abundance: &Table) -> Table {
    relative_abundance(abundance, false).map(f64::sqrt)
}

/// Number of species with positive abundance in each plot.
#[must_use]
pub fn richness(abundance: &Table) -> Vec<usize> {
    (0..abundance.nrows())
        .map(|p| abundance.row(p).iter().filter(|v| **v > 0.0).count())
        .collect()
}

#[derive(Debug, Default)]
pub(crate) struct Interner {
    pub(crate) names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Interner {
    pub(crate) fn intern(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        self.names.push(name.to_owned());
        self.index.insert(name.to_owned(), i);
        i
    }
}
