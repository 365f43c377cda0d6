//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while stepping a system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown integrator: {name}")]
    UnknownIntegrator { name: String },

    #[error(transparent)]
    Solver(#[from] cs_solver::SolverError),

    #[error(transparent)]
    System(#[from] cs_systems::SystemError),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<cs_core::error::CsError> for SimError {
    fn from(e: cs_core::error::CsError) -> Self {
        SimError::Solver(e.into())
    }
}
