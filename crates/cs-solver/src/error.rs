//! Error types for solver operations.

use cs_core::error::CsError;
use thiserror::Error;

/// Errors that can occur during sparse solves and Newton iteration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Dimension mismatch: {what} (expected {expected}, got {got})")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Sparse factorization failed: {what}")]
    Factorization { what: String },

    #[error("Sparse solve failed: {what}")]
    Solve { what: String },

    #[error("Newton did not converge after {iterations} iterations (|dx| = {update_norm:e})")]
    NotConverged { iterations: usize, update_norm: f64 },

    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<CsError> for SolverError {
    fn from(e: CsError) -> Self {
        SolverError::Numeric {
            what: e.to_string(),
        }
    }
}

impl From<SolverError> for CsError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::DimensionMismatch { what, .. } => CsError::InvalidArg { what },
            SolverError::Factorization { .. } => CsError::Invariant {
                what: "factorization",
            },
            SolverError::Solve { .. } => CsError::Invariant { what: "solve" },
            SolverError::NotConverged { .. } => CsError::Invariant {
                what: "convergence",
            },
            SolverError::Numeric { .. } => CsError::Invariant { what: "numeric" },
        }
    }
}
