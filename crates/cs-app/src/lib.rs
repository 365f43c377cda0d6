//! Shell-facing session layer for clothsim.
//!
//! A front end (windowed viewer or the headless CLI) owns one `Session` and
//! drives it through plain method calls: pick a system and an integrator,
//! set step parameters, advance frames, pin particles and pull a render
//! snapshot. Picking and projection stay with the caller; the session only
//! ever sees particle indices and screen-space points.

pub mod error;
pub mod render;
pub mod selection;
pub mod session;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use render::{Color3, RenderSnapshot, marker_colors};
pub use selection::{Aabb, Lasso, Pixel, bresenham};
pub use session::{Session, SessionSettings, SessionSummary, SystemKind};
