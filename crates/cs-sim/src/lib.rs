//! Time integration for clothsim dynamical systems.
//!
//! Provides:
//! - Explicit schemes: forward Euler, classical RK4
//! - Implicit schemes: backward Euler, implicit midpoint (Newton + sparse LU)
//! - A frame runner that applies a fixed number of steps per displayed frame

pub mod error;
pub mod integrator;
pub mod sim;

// Re-exports for public API
pub use error::{SimError, SimResult};
pub use integrator::{
    BackwardEuler, ForwardEuler, ImplicitMidpoint, Integrator, IntegratorType, RK4, StepReport,
};
pub use sim::{FrameStats, SimOptions, SimRecord, advance_frame, run_frames};
