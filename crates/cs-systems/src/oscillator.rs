//! Single point rotating in the x-z plane.

use crate::error::{SystemError, SystemResult};
use crate::traits::{DynamicalSystem, SystemCore};
use cs_core::Real;
use cs_solver::TripletMatrix;
use nalgebra::{DVector, Point3};

/// `d/dt (x, y, z) = (-z, 0, x)`: a linear system whose exact solution is a
/// circle of the initial radius, period `2 pi`.
///
/// The state is just the point's position (3 scalars, no velocity block).
/// Pinning particle 0 freezes it.
#[derive(Clone, Debug)]
pub struct Oscillator {
    radius: Real,
    core: SystemCore,
}

impl Oscillator {
    pub const DOF: usize = 3;

    pub fn new(radius: Real) -> Self {
        let mut osc = Self {
            radius,
            core: SystemCore::default(),
        };
        osc.core.reinit(osc.initial_state());
        osc
    }

    pub fn radius(&self) -> Real {
        self.radius
    }

    fn initial_state(&self) -> DVector<Real> {
        DVector::from_vec(vec![0.0, 0.0, self.radius])
    }

    fn check_state(state: &DVector<Real>) -> SystemResult<()> {
        if state.len() != Self::DOF {
            return Err(SystemError::StateLength {
                expected: Self::DOF,
                got: state.len(),
            });
        }
        Ok(())
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl DynamicalSystem for Oscillator {
    fn name(&self) -> &str {
        "oscillator"
    }

    fn core(&self) -> &SystemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SystemCore {
        &mut self.core
    }

    fn particle_count(&self) -> usize {
        1
    }

    fn particle_mass(&self) -> Real {
        1.0
    }

    fn eval_derivative(&self, state: &DVector<Real>) -> SystemResult<DVector<Real>> {
        Self::check_state(state)?;
        if self.is_pinned(0) {
            return Ok(DVector::zeros(Self::DOF));
        }
        Ok(DVector::from_vec(vec![-state[2], 0.0, state[0]]))
    }

    fn eval_jacobian(&self, state: &DVector<Real>) -> SystemResult<TripletMatrix> {
        Self::check_state(state)?;
        let mut jac = TripletMatrix::new(Self::DOF, Self::DOF);
        if !self.is_pinned(0) {
            jac.push(0, 2, -1.0);
            jac.push(2, 0, 1.0);
        }
        Ok(jac)
    }

    fn reset(&mut self) -> SystemResult<()> {
        let state = self.initial_state();
        self.core.reinit(state);
        self.core.pins_mut().clear();
        Ok(())
    }

    /// Empty when `state` is too short to hold the point.
    fn particle_positions_of(&self, state: &DVector<Real>) -> Vec<Point3<Real>> {
        match state.as_slice() {
            [x, y, z, ..] => vec![Point3::new(*x, *y, *z)],
            _ => Vec::new(),
        }
    }
}
