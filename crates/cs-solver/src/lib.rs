//! Sparse linear algebra and Newton iteration for implicit time stepping.
//!
//! Jacobians are accumulated as `(row, col, value)` triplets and turned into
//! a compressed matrix once per solve. The Newton driver is generic over the
//! residual/Jacobian callbacks so it has no knowledge of particles or springs.

pub mod error;
pub mod jacobian;
pub mod lu;
pub mod newton;
pub mod sparse;

pub use error::{SolverError, SolverResult};
pub use jacobian::{central_difference_jacobian, finite_difference_jacobian, max_relative_error};
pub use lu::solve_sparse;
pub use newton::{ConvergencePolicy, NewtonConfig, NewtonResult, newton_solve};
pub use sparse::TripletMatrix;
