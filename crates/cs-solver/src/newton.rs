//! Newton iteration for implicit integrator steps.

use crate::error::SolverError;
use crate::lu::solve_sparse;
use crate::sparse::TripletMatrix;
use cs_core::{Real, ensure_all_finite};
use cs_core::timing::{step_timing, timed};
use nalgebra::DVector;

/// What to do when the iteration budget runs out before the update norm
/// drops below tolerance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConvergencePolicy {
    /// Accept the last iterate and report `converged = false`.
    #[default]
    BestEffort,
    /// Fail with `SolverError::NotConverged`.
    Strict,
}

/// Newton solver configuration.
#[derive(Clone, Copy, Debug)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Stop once the Euclidean norm of the update falls below this
    pub step_tol: Real,
    /// Behaviour on budget exhaustion
    pub policy: ConvergencePolicy,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            step_tol: 1e-12,
            policy: ConvergencePolicy::BestEffort,
        }
    }
}

/// Newton iteration result.
#[derive(Clone, Debug)]
pub struct NewtonResult {
    /// Final iterate
    pub x: DVector<Real>,
    /// Norm of the last update applied
    pub update_norm: Real,
    /// Number of linear solves performed
    pub iterations: usize,
    /// Converged flag
    pub converged: bool,
}

/// Solve `G(x) = 0` by Newton's method starting from `x_guess`.
///
/// Each iteration solves `dG/dx * dx = -G(x)` with a sparse LU and applies the
/// full step. Iteration stops when `|dx| <= step_tol` or after
/// `max_iterations` solves. A failed factorization or solve aborts
/// immediately; budget exhaustion follows `config.policy`.
///
/// The callbacks may fail with any error type that a `SolverError` converts
/// into, so model errors pass through untouched.
pub fn newton_solve<E, F, J>(
    x_guess: DVector<Real>,
    mut residual_fn: F,
    mut jacobian_fn: J,
    config: &NewtonConfig,
) -> Result<NewtonResult, E>
where
    E: From<SolverError>,
    F: FnMut(&DVector<Real>) -> Result<DVector<Real>, E>,
    J: FnMut(&DVector<Real>) -> Result<TripletMatrix, E>,
{
    let mut x = x_guess;
    let mut update_norm = Real::INFINITY;
    let mut iterations = 0;

    while iterations < config.max_iterations && update_norm > config.step_tol {
        let r = residual_fn(&x)?;
        ensure_all_finite(r.as_slice(), "newton residual")
            .map_err(|e| E::from(SolverError::from(e)))?;
        let jac = jacobian_fn(&x)?;

        let dx = timed("linear solve", &step_timing::LINEAR_SOLVES, || {
            solve_sparse(&jac, &(-r))
        })?;

        x += &dx;
        update_norm = dx.norm();
        iterations += 1;

        tracing::debug!(iteration = iterations, update_norm, "newton iteration");
    }

    let converged = update_norm <= config.step_tol;
    if !converged {
        match config.policy {
            ConvergencePolicy::Strict => {
                return Err(SolverError::NotConverged {
                    iterations,
                    update_norm,
                }
                .into());
            }
            ConvergencePolicy::BestEffort => {
                tracing::warn!(
                    iterations,
                    update_norm,
                    "newton budget exhausted, accepting last iterate"
                );
            }
        }
    }

    Ok(NewtonResult {
        x,
        update_norm,
        iterations,
        converged,
    })
}
