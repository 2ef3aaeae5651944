//! Matching identifiers across tables
//!
//! CWM needs the same species in L's columns and Q's rows, and joint analyses
//! of R, L and derived tables need the same plots in the same order. Neither
//! condition is enforced by the data: species lists drift between surveys and
//! trait databases, and tables are often read from separate files.
//!
//! [`align_species`] keeps the shared species and reports what it dropped;
//! [`check_row_order`] reports the first plot that differs. Both leave the
//! decision to warn or stop to the caller.

use std::collections::HashSet;

use crate::{Result, table::Table};

/// Abundance and trait tables restricted to their shared species.
#[derive(Debug, Clone)]
pub struct SpeciesAlignment {
    /// L restricted to shared species (columns in original L order).
    pub abundance: Table,
    /// Q restricted to shared species, rows in the same order as `abundance` columns.
    pub traits: Table,
    /// Species present in L but without trait data.
    pub dropped_from_abundance: Vec<String>,
    /// Species with trait data but absent from L.
    pub dropped_from_traits: Vec<String>,
}

impl SpeciesAlignment {
    /// Whether any species was dropped from either table.
    #[must_use]
    pub fn is_lossy(&self) -> bool {
        !self.dropped_from_abundance.is_empty() || !self.dropped_from_traits.is_empty()
    }
}

/// Intersects the species of an abundance table (columns) and a trait table (rows).
///
/// # Examples
///
/// ```
/// use traitscape_community::{align::align_species, table::Table};
///
/// let l = Table::from_rows(
///     vec!["p1".into()],
///     vec!["a".into(), "b".into(), "c".into()],
///     vec![vec![1.0, 2.0, 3.0]],
/// )?;
/// let q = Table::from_rows(
///     vec!["c".into(), "a".into(), "z".into()],
///     vec!["sla".into()],
///     vec![vec![30.0], vec![10.0], vec![99.0]],
/// )?;
/// let aligned = align_species(&l, &q)?;
/// assert_eq!(aligned.abundance.col_names(), aligned.traits.row_names());
/// assert_eq!(aligned.dropped_from_abundance, vec!["b".to_owned()]);
/// assert_eq!(aligned.dropped_from_traits, vec!["z".to_owned()]);
/// # Ok::<(), traitscape_community::CommunityError>(())
/// ```
pub fn align_species(abundance: &Table, traits: &Table) -> Result<SpeciesAlignment> {
    let trait_species = traits
        .row_names()
        .iter()
        .map(String::as_str)
        .collect::<HashSet<_>>();
    let abundance_species = abundance
        .col_names()
        .iter()
        .map(String::as_str)
        .collect::<HashSet<_>>();

    let (shared, dropped_from_abundance): (Vec<_>, Vec<_>) = abundance
        .col_names()
        .iter()
        .cloned()
        .partition(|s| trait_species.contains(s.as_str()));
    let dropped_from_traits = traits
        .row_names()
        .iter()
        .filter(|s| !abundance_species.contains(s.as_str()))
        .cloned()
        .collect();

    Ok(SpeciesAlignment {
        abundance: abundance.select_cols(&shared)?,
        traits: traits.select_rows(&shared)?,
        dropped_from_abundance,
        dropped_from_traits,
    })
}

/// Result of comparing the row names of two tables.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::IsVariant)]
pub enum OrderCheck {
    Aligned,
    Mismatch {
        /// First row index where the names differ (or where one table ends).
        position: usize,
        left: Option<String>,
        right: Option<String>,
    },
}

impl OrderCheck {
    /// Human-readable warning for a mismatch, `None` when aligned.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        match self {
            OrderCheck::Aligned => None,
            OrderCheck::Mismatch {
                position,
                left,
                right,
            } => Some(format!(
                "WARNING: row order differs at position {position} ({} vs {})",
                left.as_deref().unwrap_or("<end>"),
                right.as_deref().unwrap_or("<end>"),
            )),
        }
    }
}

/// Compares the row names of two tables position by position.
#[must_use]
pub fn check_row_order(left: &Table, right: &Table) -> OrderCheck {
    let len = left.nrows().max(right.nrows());
    for position in 0..len {
        let l = left.row_names().get(position);
        let r = right.row_names().get(position);
        if l != r {
            return OrderCheck::Mismatch {
                position,
                left: l.cloned(),
                right: r.cloned(),
            };
        }
    }
    OrderCheck::Aligned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plots(names: &[&str]) -> Table {
        Table::filled(
            names.iter().map(|s| (*s).to_owned()).collect(),
            vec!["v".into()],
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn test_row_order_aligned() {
        assert!(check_row_order(&plots(&["a", "b"]), &plots(&["a", "b"])).is_aligned());
        assert_eq!(OrderCheck::Aligned.warning(), None);
    }

    #[test]
    fn test_row_order_mismatch() {
        let check = check_row_order(&plots(&["a", "b"]), &plots(&["b", "a"]));
        assert_eq!(
            check,
            OrderCheck::Mismatch {
                position: 0,
                left: Some("a".into()),
                right: Some("b".into())
            }
        );
        assert!(check.warning().unwrap().contains("position 0"));
    }

    #[test]
    fn test_row_order_length_mismatch() {
        let check = check_row_order(&plots(&["a"]), &plots(&["a", "b"]));
        assert!(check.is_mismatch());
        assert!(check.warning().unwrap().contains("<end>"));
    }

    #[test]
    fn test_align_identical_species_is_lossless() {
        let l = Table::filled(vec!["p".into()], vec!["a".into(), "b".into()], 1.0).unwrap();
        let q = Table::filled(vec!["b".into(), "a".into()], vec!["t".into()], 1.0).unwrap();
        let aligned = align_species(&l, &q).unwrap();
        assert!(!aligned.is_lossy());
        assert_eq!(aligned.traits.row_names(), &["a".to_owned(), "b".to_owned()]);
    }
}
