//! Finite difference Jacobians, used to cross-check analytic assembly.

use crate::error::SolverResult;
use cs_core::Real;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

/// Compute Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by epsilon and computes (f(x+e) - f(x))/epsilon.
/// Columns are evaluated in parallel; `f` must be a pure function of `x`.
pub fn finite_difference_jacobian<F>(
    x: &DVector<Real>,
    f: F,
    epsilon: Real,
) -> SolverResult<DMatrix<Real>>
where
    F: Fn(&DVector<Real>) -> SolverResult<DVector<Real>> + Sync,
{
    let f_x = f(x)?;
    let columns: Vec<DVector<Real>> = (0..x.len())
        .into_par_iter()
        .map(|j| {
            let mut x_perturbed = x.clone();
            let dx = epsilon * x[j].abs().max(1.0);
            x_perturbed[j] += dx;
            let f_perturbed = f(&x_perturbed)?;
            Ok((f_perturbed - &f_x) / dx)
        })
        .collect::<SolverResult<_>>()?;

    Ok(assemble_columns(f_x.len(), &columns))
}

/// Compute Jacobian using central finite differences (more accurate but 2x cost).
pub fn central_difference_jacobian<F>(
    x: &DVector<Real>,
    f: F,
    epsilon: Real,
) -> SolverResult<DMatrix<Real>>
where
    F: Fn(&DVector<Real>) -> SolverResult<DVector<Real>> + Sync,
{
    let m = f(x)?.len();
    let columns: Vec<DVector<Real>> = (0..x.len())
        .into_par_iter()
        .map(|j| {
            let dx = epsilon * x[j].abs().max(1.0);

            let mut x_plus = x.clone();
            x_plus[j] += dx;
            let f_plus = f(&x_plus)?;

            let mut x_minus = x.clone();
            x_minus[j] -= dx;
            let f_minus = f(&x_minus)?;

            Ok((f_plus - f_minus) / (2.0 * dx))
        })
        .collect::<SolverResult<_>>()?;

    Ok(assemble_columns(m, &columns))
}

fn assemble_columns(nrows: usize, columns: &[DVector<Real>]) -> DMatrix<Real> {
    let mut jac = DMatrix::zeros(nrows, columns.len());
    for (j, col) in columns.iter().enumerate() {
        jac.set_column(j, col);
    }
    jac
}

/// Largest entrywise error of `approx` against `exact`, relative to the
/// largest magnitude in `exact` (absolute when `exact` is all zeros).
pub fn max_relative_error(exact: &DMatrix<Real>, approx: &DMatrix<Real>) -> Real {
    let scale = exact.amax().max(1.0);
    (exact - approx).amax() / scale
}
