//! cs-systems: dynamical systems for the cloth sandbox.
//!
//! Provides:
//! - `DynamicalSystem`, the contract integrators work through
//! - `StateLayout`, the stacked `[positions | velocities]` index helpers
//! - `PinSet`, the fixed-particle set shared by all systems
//! - `Cloth`, a mass-spring grid with analytic sparse Jacobian
//! - `Oscillator` and `Planet`, small analytic reference systems
//!
//! Systems own their state and pins but know nothing about rendering; the
//! shell reads positions, triangles and pins back out as plain data.

pub mod cloth;
pub mod error;
pub mod layout;
pub mod oscillator;
pub mod pins;
pub mod planet;
pub mod spring;
pub mod traits;

// Re-exports
pub use cloth::{Cloth, ClothParams, SpringCounts};
pub use error::{SystemError, SystemResult};
pub use layout::StateLayout;
pub use oscillator::Oscillator;
pub use pins::PinSet;
pub use planet::{Planet, PlanetParams};
pub use spring::{Spring, SpringKind};
pub use traits::{DynamicalSystem, SystemCore};
