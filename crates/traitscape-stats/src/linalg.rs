//! Dense linear algebra for small ecological matrices.
//!
//! Community tables rarely exceed a few hundred rows or columns, so a plain
//! row-major `Vec<f64>` with textbook algorithms is sufficient:
//!
//! - [`Matrix::symmetric_eigen`]: cyclic Jacobi rotations, eigenvalues sorted
//!   in descending order
//! - [`Matrix::solve`]: Gaussian elimination with partial pivoting
//!
//! # References
//!
//! - Press et al. (2007). Numerical Recipes, 3rd ed. §11.1 (Jacobi).
//! - Golub, G.H. & Van Loan, C.F. (2013). Matrix Computations, 4th ed. §3.4.

use std::ops::{Index, IndexMut};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum LinalgError {
    #[display("dimension mismatch: {left_rows}x{left_cols} vs {right_rows}x{right_cols}")]
    DimensionMismatch {
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },
    #[display("matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[display("matrix is singular (pivot {pivot} at column {column})")]
    Singular { column: usize, pivot: f64 },
    #[display("data length {len} does not match {rows}x{cols}")]
    BadLength { rows: usize, cols: usize, len: usize },
}

/// Row-major dense matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Eigenvalues (descending) and unit eigenvectors of a symmetric matrix.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    pub values: Vec<f64>,
    /// Column `k` holds the eigenvector of `values[k]`.
    pub vectors: Matrix,
}

impl Matrix {
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Wraps row-major data.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, LinalgError> {
        if data.len() != rows * cols {
            return Err(LinalgError::BadLength {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds a matrix from equally long rows.
    ///
    /// # Examples
    ///
    /// ```
    /// use traitscape_stats::linalg::Matrix;
    ///
    /// let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    /// assert_eq!(m[(1, 0)], 3.0);
    /// ```
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, LinalgError> {
        let cols = rows.first().map_or(0, Vec::len);
        let data = rows.iter().flatten().copied().collect::<Vec<_>>();
        Self::from_vec(rows.len(), cols, data)
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[must_use]
    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn column(&self, c: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.rows).map(move |r| self.data[r * self.cols + c])
    }

    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                t[(c, r)] = self[(r, c)];
            }
        }
        t
    }

    /// Matrix product `self · rhs`.
    pub fn matmul(&self, rhs: &Matrix) -> Result<Matrix, LinalgError> {
        if self.cols != rhs.rows {
            return Err(self.mismatch(rhs));
        }
        let mut out = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self[(i, k)];
                if a == 0.0 {
                    continue;
                }
                for j in 0..rhs.cols {
                    out[(i, j)] += a * rhs[(k, j)];
                }
            }
        }
        Ok(out)
    }

    /// Cross product `selfᵀ · rhs` without materializing the transpose.
    pub fn t_matmul(&self, rhs: &Matrix) -> Result<Matrix, LinalgError> {
        if self.rows != rhs.rows {
            return Err(self.mismatch(rhs));
        }
        let mut out = Matrix::zeros(self.cols, rhs.cols);
        for k in 0..self.rows {
            for i in 0..self.cols {
                let a = self[(k, i)];
                if a == 0.0 {
                    continue;
                }
                for j in 0..rhs.cols {
                    out[(i, j)] += a * rhs[(k, j)];
                }
            }
        }
        Ok(out)
    }

    /// Multiplies every element by `factor`.
    #[must_use]
    pub fn scaled(mut self, factor: f64) -> Self {
        for v in &mut self.data {
            *v *= factor;
        }
        self
    }

    /// Sum of squared elements.
    #[must_use]
    pub fn sum_of_squares(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum()
    }

    /// Solves `self · X = rhs` for `X`.
    ///
    /// # Examples
    ///
    /// ```
    /// use traitscape_stats::linalg::Matrix;
    ///
    /// let a = Matrix::from_rows(&[vec![2.0, 1.0], vec![1.0, 3.0]]).unwrap();
    /// let b = Matrix::from_rows(&[vec![3.0], vec![5.0]]).unwrap();
    /// let x = a.solve(&b).unwrap();
    /// assert!((x[(0, 0)] - 0.8).abs() < 1e-12);
    /// assert!((x[(1, 0)] - 1.4).abs() < 1e-12);
    /// ```
    pub fn solve(&self, rhs: &Matrix) -> Result<Matrix, LinalgError> {
        if self.rows != self.cols {
            return Err(LinalgError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if rhs.rows != self.rows {
            return Err(self.mismatch(rhs));
        }
        let n = self.rows;
        let mut a = self.clone();
        let mut b = rhs.clone();
        let scale = self.data.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let tolerance = scale * f64::EPSILON * 64.0;

        for col in 0..n {
            let pivot_row = (col..n)
                .max_by(|&x, &y| a[(x, col)].abs().total_cmp(&a[(y, col)].abs()))
                .unwrap_or(col);
            let pivot = a[(pivot_row, col)];
            if pivot.abs() <= tolerance {
                return Err(LinalgError::Singular { column: col, pivot });
            }
            a.swap_rows(col, pivot_row);
            b.swap_rows(col, pivot_row);

            for r in (col + 1)..n {
                let factor = a[(r, col)] / pivot;
                if factor == 0.0 {
                    continue;
                }
                for c in col..n {
                    a[(r, c)] -= factor * a[(col, c)];
                }
                for c in 0..b.cols {
                    b[(r, c)] -= factor * b[(col, c)];
                }
            }
        }

        let mut x = Matrix::zeros(n, b.cols);
        for c in 0..b.cols {
            for r in (0..n).rev() {
                let tail = ((r + 1)..n).map(|k| a[(r, k)] * x[(k, c)]).sum::<f64>();
                x[(r, c)] = (b[(r, c)] - tail) / a[(r, r)];
            }
        }
        Ok(x)
    }

    /// Eigendecomposition of a symmetric matrix via cyclic Jacobi rotations.
    ///
    /// Eigenvalues are returned in descending order. Each eigenvector is
    /// oriented so that its largest-magnitude component is positive, which
    /// makes results reproducible across runs.
    ///
    /// # Examples
    ///
    /// ```
    /// use traitscape_stats::linalg::Matrix;
    ///
    /// let m = Matrix::from_rows(&[vec![2.0, 1.0], vec![1.0, 2.0]]).unwrap();
    /// let eigen = m.symmetric_eigen().unwrap();
    /// assert!((eigen.values[0] - 3.0).abs() < 1e-12);
    /// assert!((eigen.values[1] - 1.0).abs() < 1e-12);
    /// ```
    #[expect(clippy::many_single_char_names)]
    pub fn symmetric_eigen(&self) -> Result<SymmetricEigen, LinalgError> {
        if self.rows != self.cols {
            return Err(LinalgError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let n = self.rows;
        let mut a = self.clone();
        let mut v = Matrix::identity(n);
        let total = a.sum_of_squares();

        for _sweep in 0..(100 * n.max(1)) {
            let off_diag = (0..n)
                .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
                .map(|(i, j)| a[(i, j)] * a[(i, j)])
                .sum::<f64>();
            if off_diag <= total * 1e-30 {
                break;
            }

            for p in 0..n {
                for q in (p + 1)..n {
                    let apq = a[(p, q)];
                    if apq == 0.0 {
                        continue;
                    }
                    let app = a[(p, p)];
                    let aqq = a[(q, q)];
                    let tau = (aqq - app) / (2.0 * apq);
                    let t = if tau.abs() > 1e15 {
                        1.0 / (2.0 * tau)
                    } else {
                        tau.signum() / (tau.abs() + (1.0 + tau * tau).sqrt())
                    };
                    let c = 1.0 / (1.0 + t * t).sqrt();
                    let s = t * c;

                    a[(p, p)] = app - t * apq;
                    a[(q, q)] = aqq + t * apq;
                    a[(p, q)] = 0.0;
                    a[(q, p)] = 0.0;
                    for r in 0..n {
                        if r != p && r != q {
                            let arp = a[(r, p)];
                            let arq = a[(r, q)];
                            a[(r, p)] = c * arp - s * arq;
                            a[(p, r)] = a[(r, p)];
                            a[(r, q)] = s * arp + c * arq;
                            a[(q, r)] = a[(r, q)];
                        }
                    }
                    for r in 0..n {
                        let vrp = v[(r, p)];
                        let vrq = v[(r, q)];
                        v[(r, p)] = c * vrp - s * vrq;
                        v[(r, q)] = s * vrp + c * vrq;
                    }
                }
            }
        }

        let mut order = (0..n).collect::<Vec<_>>();
        order.sort_by(|&x, &y| a[(y, y)].total_cmp(&a[(x, x)]));

        let values = order.iter().map(|&i| a[(i, i)]).collect();
        let mut vectors = Matrix::zeros(n, n);
        for (k, &src) in order.iter().enumerate() {
            let dominant = v
                .column(src)
                .max_by(|x, y| x.abs().total_cmp(&y.abs()))
                .unwrap_or(0.0);
            let sign = if dominant < 0.0 { -1.0 } else { 1.0 };
            for r in 0..n {
                vectors[(r, k)] = sign * v[(r, src)];
            }
        }
        Ok(SymmetricEigen { values, vectors })
    }

    /// Exchanges two rows in place.
    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    fn mismatch(&self, rhs: &Matrix) -> LinalgError {
        LinalgError::DimensionMismatch {
            left_rows: self.rows,
            left_cols: self.cols,
            right_rows: rhs.rows,
            right_cols: rhs.cols,
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &f64 {
        debug_assert!(r < self.rows && c < self.cols);
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut f64 {
        debug_assert!(r < self.rows && c < self.cols);
        &mut self.data[r * self.cols + c]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_matmul_and_transpose() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let ata = a.t_matmul(&a).unwrap();
        let explicit = a.transpose().matmul(&a).unwrap();
        assert_eq!(ata, explicit);
        assert_eq!(ata[(0, 0)], 17.0);
        assert_eq!(ata[(2, 1)], 39.0);
    }

    #[test]
    fn test_matmul_dimension_mismatch() {
        let a = Matrix::zeros(2, 3);
        assert!(matches!(
            a.matmul(&a),
            Err(LinalgError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_from_vec_rejects_bad_length() {
        assert!(Matrix::from_vec(2, 2, vec![1.0; 3]).is_err());
    }

    #[test]
    fn test_solve_singular() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        assert!(matches!(a.solve(&b), Err(LinalgError::Singular { .. })));
    }

    #[test]
    fn test_solve_requires_pivoting() {
        let a = Matrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let b = Matrix::from_rows(&[vec![2.0], vec![3.0]]).unwrap();
        let x = a.solve(&b).unwrap();
        assert!(approx(x[(0, 0)], 3.0));
        assert!(approx(x[(1, 0)], 2.0));
    }

    #[test]
    fn test_eigen_reconstructs_matrix() {
        let m = Matrix::from_rows(&[
            vec![4.0, 1.0, 0.5],
            vec![1.0, 3.0, 0.25],
            vec![0.5, 0.25, 1.0],
        ])
        .unwrap();
        let eigen = m.symmetric_eigen().unwrap();
        assert!(eigen.values.is_sorted_by(|a, b| a >= b));
        for i in 0..3 {
            for j in 0..3 {
                let rebuilt = (0..3)
                    .map(|k| eigen.vectors[(i, k)] * eigen.values[k] * eigen.vectors[(j, k)])
                    .sum::<f64>();
                assert!(approx(rebuilt, m[(i, j)]), "({i},{j}) {rebuilt}");
            }
        }
    }

    #[test]
    fn test_eigen_sign_convention() {
        let m = Matrix::from_rows(&[vec![1.0, -0.9], vec![-0.9, 1.0]]).unwrap();
        let eigen = m.symmetric_eigen().unwrap();
        for k in 0..2 {
            let dominant = eigen
                .vectors
                .column(k)
                .max_by(|x, y| x.abs().total_cmp(&y.abs()))
                .unwrap();
            assert!(dominant > 0.0);
        }
    }

    #[test]
    fn test_eigen_diagonal_matrix() {
        let m = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 5.0]]).unwrap();
        let eigen = m.symmetric_eigen().unwrap();
        assert_eq!(eigen.values, vec![5.0, 1.0]);
        assert!(approx(eigen.vectors[(1, 0)], 1.0));
    }
}
