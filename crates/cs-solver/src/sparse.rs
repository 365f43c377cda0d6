//! Triplet-based sparse matrix assembly.

use cs_core::Real;
use nalgebra::{DMatrix, DVector, Matrix3};
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Sparse matrix under construction, stored as `(row, col, value)` triplets.
///
/// Duplicate coordinates are allowed and are summed when the matrix is
/// compressed (`to_csc`, `to_dense`, `mul_vector`). This lets per-spring
/// blocks be pushed independently without looking up existing entries.
#[derive(Clone, Debug)]
pub struct TripletMatrix {
    coo: CooMatrix<Real>,
}

impl TripletMatrix {
    /// Empty `nrows x ncols` matrix.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            coo: CooMatrix::new(nrows, ncols),
        }
    }

    /// `n x n` identity.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            m.push(i, i, 1.0);
        }
        m
    }

    pub fn nrows(&self) -> usize {
        self.coo.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.coo.ncols()
    }

    /// Number of stored triplets (duplicates counted separately).
    pub fn nnz(&self) -> usize {
        self.coo.nnz()
    }

    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    /// Append one triplet.
    ///
    /// Panics if `(row, col)` lies outside the matrix; callers compute indices
    /// from a validated state layout.
    pub fn push(&mut self, row: usize, col: usize, value: Real) {
        self.coo.push(row, col, value);
    }

    /// Append `scale * block` with its top-left corner at `(row0, col0)`.
    pub fn push_block3(&mut self, row0: usize, col0: usize, block: &Matrix3<Real>, scale: Real) {
        for r in 0..3 {
            for c in 0..3 {
                self.push(row0 + r, col0 + c, scale * block[(r, c)]);
            }
        }
    }

    /// Append `value * I3` with its top-left corner at `(row0, col0)`.
    pub fn push_diagonal3(&mut self, row0: usize, col0: usize, value: Real) {
        for k in 0..3 {
            self.push(row0 + k, col0 + k, value);
        }
    }

    /// Iterate stored triplets in insertion order.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, Real)> + '_ {
        self.coo.triplet_iter().map(|(i, j, v)| (i, j, *v))
    }

    /// Build `I - scale * self`, the Newton matrix of an implicit step.
    pub fn identity_minus_scaled(&self, scale: Real) -> Self {
        let n = self.nrows();
        let mut out = Self::identity(n);
        for (i, j, v) in self.triplets() {
            out.push(i, j, -scale * v);
        }
        out
    }

    /// True if any stored triplet sits in `row`.
    pub fn row_has_entries(&self, row: usize) -> bool {
        self.coo.row_indices().iter().any(|&r| r == row)
    }

    /// Matrix-vector product, summing duplicate triplets.
    pub fn mul_vector(&self, x: &DVector<Real>) -> DVector<Real> {
        let mut y = DVector::zeros(self.nrows());
        for (i, j, v) in self.triplets() {
            y[i] += v * x[j];
        }
        y
    }

    /// Compressed column form with duplicates summed.
    pub fn to_csc(&self) -> CscMatrix<Real> {
        CscMatrix::from(&self.coo)
    }

    /// Dense copy, for diagnostics and small tests.
    pub fn to_dense(&self) -> DMatrix<Real> {
        let mut dense = DMatrix::zeros(self.nrows(), self.ncols());
        for (i, j, v) in self.triplets() {
            dense[(i, j)] += v;
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_summed() {
        let mut m = TripletMatrix::new(2, 2);
        m.push(0, 1, 1.5);
        m.push(0, 1, 2.0);
        m.push(1, 0, -1.0);
        assert_eq!(m.nnz(), 3);

        let dense = m.to_dense();
        assert_eq!(dense[(0, 1)], 3.5);
        assert_eq!(dense[(1, 0)], -1.0);
        assert_eq!(m.to_csc().nnz(), 2);
    }

    #[test]
    fn identity_minus_scaled_matches_dense() {
        let mut j = TripletMatrix::new(3, 3);
        j.push(0, 2, 4.0);
        j.push(1, 1, 2.0);
        let a = j.identity_minus_scaled(0.5).to_dense();
        let expected = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, -2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(a, expected);
    }

    #[test]
    fn block_push_and_product() {
        let mut m = TripletMatrix::new(6, 6);
        m.push_block3(3, 0, &Matrix3::identity(), 2.0);
        m.push_diagonal3(0, 3, 1.0);
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let y = m.mul_vector(&x);
        assert_eq!(y.as_slice(), &[4.0, 5.0, 6.0, 2.0, 4.0, 6.0]);
        assert!(m.row_has_entries(0));
        assert!(!TripletMatrix::new(2, 2).row_has_entries(0));
    }
}
