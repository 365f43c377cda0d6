//! Hookean springs between two particles.

use cs_core::Real;
use nalgebra::{Matrix3, Vector3};

/// Below this length a spring has no usable direction.
const MIN_LENGTH: Real = 1e-12;

/// Role of a spring in the cloth grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpringKind {
    /// Grid neighbours along a row or column
    Structural,
    /// Diagonal across one cell
    Shear,
    /// Two apart along a row or column
    Bend,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spring {
    pub left: usize,
    pub right: usize,
    pub stiffness: Real,
    pub rest_length: Real,
    pub kind: SpringKind,
}

impl Spring {
    pub fn new(left: usize, right: usize, stiffness: Real, rest_length: Real, kind: SpringKind) -> Self {
        Self {
            left,
            right,
            stiffness,
            rest_length,
            kind,
        }
    }

    /// Force acting on the right endpoint; the left endpoint receives its negation.
    ///
    /// `f = -k (|d| - L) d/|d|` with `d = x_right - x_left`. Coincident
    /// endpoints exert no force.
    pub fn force(&self, x_left: &Vector3<Real>, x_right: &Vector3<Real>) -> Vector3<Real> {
        let d = x_right - x_left;
        let len = d.norm();
        if len <= MIN_LENGTH {
            return Vector3::zeros();
        }
        d * (-self.stiffness * (len - self.rest_length) / len)
    }

    /// Derivative of `force` with respect to the right endpoint position.
    ///
    /// `K = -k ((1 - L/|d|) (I - n n^T) + n n^T)`. The same block with the
    /// opposite sign is the derivative with respect to the left endpoint, and
    /// the left endpoint's own force has the mirrored pair.
    pub fn force_jacobian(&self, x_left: &Vector3<Real>, x_right: &Vector3<Real>) -> Matrix3<Real> {
        let d = x_right - x_left;
        let len = d.norm();
        if len <= MIN_LENGTH {
            return Matrix3::zeros();
        }
        let n = d / len;
        let nnt = n * n.transpose();
        let tangential = Matrix3::identity() - nnt;
        (tangential * (1.0 - self.rest_length / len) + nnt) * (-self.stiffness)
    }
}
