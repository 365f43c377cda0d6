//! cs-core: stable foundation for clothsim.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers + physical constants)
//! - error (shared error types)
//! - timing (opt-in wall-clock timers for the simulation hot paths)

pub mod error;
pub mod numeric;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CsError, CsResult};
pub use numeric::*;
