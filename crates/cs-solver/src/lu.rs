//! Sparse LU solve of the Newton linear systems.

use crate::error::{SolverError, SolverResult};
use crate::sparse::TripletMatrix;
use cs_core::Real;
use faer::Col;
use faer::prelude::SpSolver;
use faer::sparse::SparseColMat;
use nalgebra::DVector;
use std::panic::{self, AssertUnwindSafe};

/// Solve `a * x = b` with a sparse LU factorization.
///
/// Fails if the factorization does not succeed or if back-substitution
/// produces non-finite values (singular or numerically singular `a`).
pub fn solve_sparse(a: &TripletMatrix, b: &DVector<Real>) -> SolverResult<DVector<Real>> {
    let n = a.nrows();
    if !a.is_square() {
        return Err(SolverError::DimensionMismatch {
            what: "matrix columns",
            expected: n,
            got: a.ncols(),
        });
    }
    if b.len() != n {
        return Err(SolverError::DimensionMismatch {
            what: "right-hand side",
            expected: n,
            got: b.len(),
        });
    }
    if n == 0 {
        return Ok(DVector::zeros(0));
    }

    // Sum duplicates before handing the pattern over.
    let csc = a.to_csc();
    let triplets: Vec<(usize, usize, Real)> =
        csc.triplet_iter().map(|(i, j, v)| (i, j, *v)).collect();

    let mat = SparseColMat::<usize, Real>::try_new_from_triplets(n, n, &triplets).map_err(|e| {
        SolverError::Factorization {
            what: format!("could not build sparse matrix: {e:?}"),
        }
    })?;

    let rhs = Col::<Real>::from_fn(n, |i| b[i]);

    // faer panics on an exactly zero pivot instead of reporting it.
    let solved = panic::catch_unwind(AssertUnwindSafe(|| {
        mat.as_ref()
            .sp_lu()
            .map(|lu| lu.solve(rhs.as_ref()))
            .map_err(|e| format!("{e:?}"))
    }));
    let sol = match solved {
        Ok(Ok(sol)) => sol,
        Ok(Err(what)) => return Err(SolverError::Factorization { what }),
        Err(_) => {
            return Err(SolverError::Factorization {
                what: "zero pivot (numerically singular matrix)".to_string(),
            });
        }
    };

    let x = DVector::from_iterator(n, (0..n).map(|i| sol.read(i)));
    if let Some(bad) = x.iter().position(|v| !v.is_finite()) {
        return Err(SolverError::Solve {
            what: format!("non-finite solution component at index {bad} (singular matrix)"),
        });
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_unsymmetric_system() {
        // [2 1 0; 0 3 1; 1 0 4] x = [3 4 5] -> x = [1 1 1]
        let mut a = TripletMatrix::new(3, 3);
        for &(i, j, v) in &[
            (0, 0, 2.0),
            (0, 1, 1.0),
            (1, 1, 3.0),
            (1, 2, 1.0),
            (2, 0, 1.0),
            (2, 2, 4.0),
        ] {
            a.push(i, j, v);
        }
        let b = DVector::from_vec(vec![3.0, 4.0, 5.0]);
        let x = solve_sparse(&a, &b).unwrap();
        for v in x.iter() {
            assert!((v - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn duplicate_triplets_are_summed_before_solve() {
        let mut a = TripletMatrix::new(2, 2);
        a.push(0, 0, 1.0);
        a.push(0, 0, 1.0);
        a.push(1, 1, 4.0);
        let x = solve_sparse(&a, &DVector::from_vec(vec![2.0, 2.0])).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_mismatched_rhs() {
        let a = TripletMatrix::identity(3);
        let err = solve_sparse(&a, &DVector::zeros(2)).unwrap_err();
        assert!(matches!(err, SolverError::DimensionMismatch { .. }));
    }

    #[test]
    fn singular_matrix_is_an_error() {
        // Row 1 is structurally empty.
        let mut a = TripletMatrix::new(2, 2);
        a.push(0, 0, 1.0);
        a.push(0, 1, 1.0);
        let result = solve_sparse(&a, &DVector::from_vec(vec![1.0, 1.0]));
        assert!(result.is_err());
    }

    #[test]
    fn numerically_singular_matrix_is_a_factorization_error() {
        let mut a = TripletMatrix::new(2, 2);
        for i in 0..2 {
            for j in 0..2 {
                a.push(i, j, 1.0);
            }
        }
        let err = solve_sparse(&a, &DVector::from_vec(vec![1.0, 2.0])).unwrap_err();
        assert!(matches!(err, SolverError::Factorization { .. }));
    }

    #[test]
    fn explicit_zero_on_diagonal_is_a_factorization_error() {
        let mut a = TripletMatrix::new(3, 3);
        a.push(0, 0, 1.0);
        a.push(1, 1, 0.0);
        a.push(2, 2, 1.0);
        let err = solve_sparse(&a, &DVector::from_element(3, 1.0)).unwrap_err();
        assert!(matches!(err, SolverError::Factorization { .. }));
    }
}
