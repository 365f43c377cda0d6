//! Error types for the cs-app session layer.

use cs_sim::SimError;
use cs_solver::SolverError;
use cs_systems::SystemError;

/// Application error type that wraps errors from the backend crates and
/// provides a single error interface for every front end.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    #[error("Unknown system: {0}")]
    UnknownSystem(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("System error: {0}")]
    System(#[from] SystemError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

/// Result type for cs-app operations.
pub type AppResult<T> = Result<T, AppError>;
