use crate::CsError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CsError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CsError::NonFinite { what, value: v })
    }
}

/// Check every entry of a slice, reporting the first offender.
pub fn ensure_all_finite(values: &[Real], what: &'static str) -> Result<(), CsError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(&value) => Err(CsError::NonFinite { what, value }),
        None => Ok(()),
    }
}

pub mod constants {
    use super::Real;

    /// Gravitational acceleration used by the cloth model (m/s^2).
    pub const GRAVITY: Real = 9.81;

    /// Scalars per particle coordinate block (x, y, z).
    pub const DIM: usize = 3;
}
