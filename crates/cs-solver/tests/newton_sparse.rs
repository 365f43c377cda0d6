//! Newton iteration over sparse LU solves on a coupled nonlinear problem.

use cs_solver::{
    ConvergencePolicy, NewtonConfig, SolverError, SolverResult, TripletMatrix, newton_solve,
    solve_sparse,
};
use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;

const N: usize = 20;

/// `G_i(x) = 2 x_i - x_{i-1} - x_{i+1} + x_i^3 - 1`, zero boundary values.
fn residual(x: &DVector<f64>) -> SolverResult<DVector<f64>> {
    let n = x.len();
    Ok(DVector::from_fn(n, |i, _| {
        let left = if i > 0 { x[i - 1] } else { 0.0 };
        let right = if i + 1 < n { x[i + 1] } else { 0.0 };
        2.0 * x[i] - left - right + x[i].powi(3) - 1.0
    }))
}

fn jacobian(x: &DVector<f64>) -> SolverResult<TripletMatrix> {
    let n = x.len();
    let mut jac = TripletMatrix::new(n, n);
    for i in 0..n {
        jac.push(i, i, 2.0 + 3.0 * x[i] * x[i]);
        if i > 0 {
            jac.push(i, i - 1, -1.0);
        }
        if i + 1 < n {
            jac.push(i, i + 1, -1.0);
        }
    }
    Ok(jac)
}

#[test]
fn newton_converges_on_tridiagonal_problem() {
    // From zero the cubic term needs well over the default ten iterations.
    let config = NewtonConfig {
        max_iterations: 30,
        ..NewtonConfig::default()
    };
    let result = newton_solve(DVector::zeros(N), residual, jacobian, &config).unwrap();

    assert!(result.converged);
    assert!(result.iterations > NewtonConfig::default().max_iterations);
    assert!(result.iterations < 30);
    assert!(residual(&result.x).unwrap().amax() < 1e-10);
    // symmetric problem, symmetric solution
    for i in 0..N / 2 {
        assert!((result.x[i] - result.x[N - 1 - i]).abs() < 1e-10);
    }
}

#[test]
fn strict_policy_reports_budget_exhaustion() {
    let config = NewtonConfig {
        max_iterations: 2,
        policy: ConvergencePolicy::Strict,
        ..NewtonConfig::default()
    };
    let err = newton_solve(DVector::zeros(N), residual, jacobian, &config).unwrap_err();
    assert!(matches!(err, SolverError::NotConverged { iterations: 2, .. }));
}

#[test]
fn callback_errors_abort_iteration() {
    let mut calls = 0;
    let err = newton_solve(
        DVector::zeros(N),
        |x| {
            calls += 1;
            if calls > 1 {
                return Err(SolverError::Numeric {
                    what: "model failure".into(),
                });
            }
            residual(x)
        },
        jacobian,
        &NewtonConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        SolverError::Numeric {
            what: "model failure".into()
        }
    );
}

proptest! {
    #[test]
    fn sparse_lu_matches_dense_lu(
        entries in prop::collection::vec((0usize..8, 0usize..8, -1.0f64..1.0), 0..40),
        rhs in prop::collection::vec(-10.0f64..10.0, 8),
    ) {
        // diagonal dominance keeps the matrix well conditioned
        let mut sparse = TripletMatrix::new(8, 8);
        let mut dense = DMatrix::<f64>::zeros(8, 8);
        for i in 0..8 {
            sparse.push(i, i, 50.0);
            dense[(i, i)] += 50.0;
        }
        for &(i, j, v) in &entries {
            sparse.push(i, j, v);
            dense[(i, j)] += v;
        }
        let b = DVector::from_vec(rhs);

        let x_sparse = solve_sparse(&sparse, &b).unwrap();
        let x_dense = dense.lu().solve(&b).unwrap();
        prop_assert!((x_sparse - x_dense).amax() < 1e-10);
    }
}
