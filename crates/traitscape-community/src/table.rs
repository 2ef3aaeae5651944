//! Labeled dense tables
//!
//! A [`Table`] is a row-major matrix of `f64` with unique row and column names.
//! It is the single representation for the R, L and Q tables as well as every
//! derived table (CWM, SES components, ordination scores).
//!
//! Missing values are NaN. Serialized tables encode NaN as JSON `null` so that
//! snapshots round-trip.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use traitscape_stats::{descriptive::DescriptiveStats, linalg::Matrix};

use crate::{CommunityError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "TableRepr", try_from = "TableRepr")]
pub struct Table {
    row_names: Vec<String>,
    col_names: Vec<String>,
    values: Matrix,
}

#[derive(Serialize, Deserialize)]
struct TableRepr {
    row_names: Vec<String>,
    col_names: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl From<Table> for TableRepr {
    fn from(table: Table) -> Self {
        let rows = (0..table.nrows())
            .map(|r| {
                table
                    .row(r)
                    .iter()
                    .map(|v| if v.is_nan() { None } else { Some(*v) })
                    .collect()
            })
            .collect();
        Self {
            row_names: table.row_names,
            col_names: table.col_names,
            rows,
        }
    }
}

impl TryFrom<TableRepr> for Table {
    type Error = CommunityError;

    fn try_from(repr: TableRepr) -> Result<Self> {
        let rows = repr
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .collect();
        Table::from_rows(repr.row_names, repr.col_names, rows)
    }
}

impl Table {
    /// Wraps a matrix with row and column names.
    ///
    /// Names must be unique along each axis and match the matrix shape.
    pub fn new(row_names: Vec<String>, col_names: Vec<String>, values: Matrix) -> Result<Self> {
        if row_names.len() != values.rows() {
            return Err(CommunityError::DimensionMismatch {
                what: "row names",
                expected: values.rows(),
                found: row_names.len(),
            });
        }
        if col_names.len() != values.cols() {
            return Err(CommunityError::DimensionMismatch {
                what: "column names",
                expected: values.cols(),
                found: col_names.len(),
            });
        }
        ensure_unique("row", &row_names)?;
        ensure_unique("column", &col_names)?;
        Ok(Self {
            row_names,
            col_names,
            values,
        })
    }

    /// Builds a table from rows of values.
    ///
    /// # Examples
    ///
    /// ```
    /// use traitscape_community::table::Table;
    ///
    /// let table = Table::from_rows(
    ///     vec!["p1".into(), "p2".into()],
    ///     vec!["temperature".into()],
    ///     vec![vec![12.5], vec![14.0]],
    /// )?;
    /// assert_eq!(table.cell("p2", "temperature"), Some(14.0));
    /// # Ok::<(), traitscape_community::CommunityError>(())
    /// ```
    pub fn from_rows(
        row_names: Vec<String>,
        col_names: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|row| row.len() != col_names.len()) {
            return Err(CommunityError::DimensionMismatch {
                what: "row length",
                expected: col_names.len(),
                found: bad.len(),
            });
        }
        let values = Matrix::from_vec(
            rows.len(),
            col_names.len(),
            rows.into_iter().flatten().collect(),
        )?;
        Self::new(row_names, col_names, values)
    }

    /// A table of the given shape with every cell set to `value`.
    pub fn filled(row_names: Vec<String>, col_names: Vec<String>, value: f64) -> Result<Self> {
        let data = vec![value; row_names.len() * col_names.len()];
        let values = Matrix::from_vec(row_names.len(), col_names.len(), data)?;
        Self::new(row_names, col_names, values)
    }

    /// Replaces the values while keeping the names.
    pub fn with_values(&self, values: Matrix) -> Result<Self> {
        Self::new(self.row_names.clone(), self.col_names.clone(), values)
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.row_names.len()
    }

    #[must_use]
    pub fn ncols(&self) -> usize {
        self.col_names.len()
    }

    #[must_use]
    pub fn row_names(&self) -> &[String] {
        &self.row_names
    }

    #[must_use]
    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }

    #[must_use]
    pub fn values(&self) -> &Matrix {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Matrix {
        &mut self.values
    }

    #[must_use]
    pub fn into_values(self) -> Matrix {
        self.values
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[(row, col)] = value;
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        self.values.row(row)
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        self.values.column(col)
    }

    #[must_use]
    pub fn row_index(&self, name: &str) -> Option<usize> {
        self.row_names.iter().position(|n| n == name)
    }

    #[must_use]
    pub fn col_index(&self, name: &str) -> Option<usize> {
        self.col_names.iter().position(|n| n == name)
    }

    /// Value at the named row and column.
    #[must_use]
    pub fn cell(&self, row: &str, col: &str) -> Option<f64> {
        Some(self.get(self.row_index(row)?, self.col_index(col)?))
    }

    /// Subset of rows in the requested order.
    pub fn select_rows<S>(&self, names: &[S]) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let indices = names
            .iter()
            .map(|name| {
                self.row_index(name.as_ref())
                    .ok_or_else(|| CommunityError::UnknownName {
                        axis: "row",
                        name: name.as_ref().to_owned(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let rows = indices.iter().map(|&r| self.row(r).to_vec()).collect();
        Self::from_rows(
            indices.iter().map(|&r| self.row_names[r].clone()).collect(),
            self.col_names.clone(),
            rows,
        )
    }

    /// Subset of columns in the requested order.
    pub fn select_cols<S>(&self, names: &[S]) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let indices = names
            .iter()
            .map(|name| {
                self.col_index(name.as_ref())
                    .ok_or_else(|| CommunityError::UnknownName {
                        axis: "column",
                        name: name.as_ref().to_owned(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let rows = (0..self.nrows())
            .map(|r| indices.iter().map(|&c| self.get(r, c)).collect())
            .collect();
        Self::from_rows(
            self.row_names.clone(),
            indices.iter().map(|&c| self.col_names[c].clone()).collect(),
            rows,
        )
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        Self {
            row_names: self.col_names.clone(),
            col_names: self.row_names.clone(),
            values: self.values.transpose(),
        }
    }

    #[must_use]
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.nrows())
            .map(|r| self.row(r).iter().sum())
            .collect()
    }

    #[must_use]
    pub fn col_sums(&self) -> Vec<f64> {
        (0..self.ncols()).map(|c| self.column(c).sum()).collect()
    }

    /// Applies `f` to every cell.
    #[must_use]
    pub fn map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(f64) -> f64,
    {
        let mut out = self.clone();
        for r in 0..out.nrows() {
            for c in 0..out.ncols() {
                let v = out.get(r, c);
                out.set(r, c, f(v));
            }
        }
        out
    }

    /// Centers every column and optionally scales it to unit sample standard
    /// deviation.
    ///
    /// Columns with zero (or undefined) standard deviation are only centered.
    /// NaN cells are ignored when computing the column moments and stay NaN.
    ///
    /// # Examples
    ///
    /// ```
    /// use traitscape_community::table::Table;
    ///
    /// let table = Table::from_rows(
    ///     vec!["a".into(), "b".into(), "c".into()],
    ///     vec!["x".into()],
    ///     vec![vec![1.0], vec![2.0], vec![3.0]],
    /// )?;
    /// let scaled = table.scale_columns(true);
    /// assert_eq!(scaled.column(0).collect::<Vec<_>>(), vec![-1.0, 0.0, 1.0]);
    /// # Ok::<(), traitscape_community::CommunityError>(())
    /// ```
    #[must_use]
    pub fn scale_columns(&self, scale: bool) -> Self {
        let mut out = self.clone();
        for c in 0..self.ncols() {
            let Some(stats) = DescriptiveStats::new(self.column(c)) else {
                continue;
            };
            let divisor = if scale && stats.std_dev > 0.0 {
                stats.std_dev
            } else {
                1.0
            };
            for r in 0..self.nrows() {
                let v = self.get(r, c);
                out.set(r, c, (v - stats.mean) / divisor);
            }
        }
        out
    }
}

fn ensure_unique(axis: &'static str, names: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(CommunityError::DuplicateName {
                axis,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn sample() -> Table {
        Table::from_rows(
            names("p", 2),
            names("s", 3),
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_dimension_checks() {
        let err = Table::from_rows(names("p", 2), names("s", 2), vec![vec![1.0], vec![2.0]]);
        assert!(matches!(err, Err(CommunityError::DimensionMismatch { .. })));

        let err = Table::from_rows(names("p", 1), names("s", 1), vec![]);
        assert!(matches!(err, Err(CommunityError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Table::from_rows(
            vec!["p".into(), "p".into()],
            names("s", 1),
            vec![vec![1.0], vec![2.0]],
        );
        assert!(matches!(
            err,
            Err(CommunityError::DuplicateName { axis: "row", .. })
        ));
    }

    #[test]
    fn test_select_reorders() {
        let table = sample();
        let sub = table.select_cols(&["s2", "s0"]).unwrap();
        assert_eq!(sub.col_names(), &["s2".to_owned(), "s0".to_owned()]);
        assert_eq!(sub.row(1), &[6.0, 4.0]);

        let sub = table.select_rows(&["p1"]).unwrap();
        assert_eq!(sub.nrows(), 1);
        assert_eq!(sub.row(0), &[4.0, 5.0, 6.0]);

        assert!(matches!(
            table.select_rows(&["missing"]),
            Err(CommunityError::UnknownName { .. })
        ));
    }

    #[test]
    fn test_sums_and_transpose() {
        let table = sample();
        assert_eq!(table.row_sums(), vec![6.0, 15.0]);
        assert_eq!(table.col_sums(), vec![5.0, 7.0, 9.0]);
        let t = table.transpose();
        assert_eq!(t.row_names(), table.col_names());
        assert_eq!(t.cell("s1", "p1"), Some(5.0));
    }

    #[test]
    fn test_scale_constant_column_is_centered_only() {
        let table = Table::from_rows(
            names("p", 3),
            vec!["c".into()],
            vec![vec![2.0], vec![2.0], vec![2.0]],
        )
        .unwrap();
        let scaled = table.scale_columns(true);
        assert!(scaled.column(0).all(|v| v == 0.0));
    }

    #[test]
    fn test_serde_round_trip_with_nan() {
        let mut table = sample();
        table.set(0, 1, f64::NAN);
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("null"));
        let back: Table = serde_json::from_str(&json).unwrap();
        assert!(back.get(0, 1).is_nan());
        assert_eq!(back.get(1, 2), 6.0);
        assert_eq!(back.row_names(), table.row_names());
    }
}
