//! The dynamical system contract used by every integrator.

use crate::error::{SystemError, SystemResult};
use crate::pins::PinSet;
use cs_core::Real;
use cs_solver::TripletMatrix;
use nalgebra::{DVector, Point3};
use std::collections::BTreeSet;

/// State vector and pinned set shared by every system.
///
/// The state length is fixed between resets: `set_state` rejects vectors of
/// a different length, only `reinit` may change it.
#[derive(Clone, Debug, Default)]
pub struct SystemCore {
    state: DVector<Real>,
    pins: PinSet,
}

impl SystemCore {
    pub fn new(state: DVector<Real>) -> Self {
        Self {
            state,
            pins: PinSet::new(),
        }
    }

    pub fn state(&self) -> &DVector<Real> {
        &self.state
    }

    pub fn set_state(&mut self, state: DVector<Real>) -> SystemResult<()> {
        if state.len() != self.state.len() {
            return Err(SystemError::StateLength {
                expected: self.state.len(),
                got: state.len(),
            });
        }
        self.state = state;
        Ok(())
    }

    /// Replace the state wholesale, possibly with a new length.
    pub fn reinit(&mut self, state: DVector<Real>) {
        self.state = state;
    }

    pub fn pins(&self) -> &PinSet {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut PinSet {
        &mut self.pins
    }
}

/// A first-order ODE `dx/dt = f(x)` with an analytic Jacobian `df/dx`.
///
/// Integrators only ever talk to this trait, so any system can be paired with
/// any integrator at runtime. Pinned particles have their derivative blocks
/// forced to zero by `eval_derivative`, and `eval_jacobian` omits the rows of
/// those blocks, which keeps the Newton update for pinned particles at zero.
pub trait DynamicalSystem: Send + Sync {
    /// Short identifier for logs and reports.
    fn name(&self) -> &str;

    fn core(&self) -> &SystemCore;

    fn core_mut(&mut self) -> &mut SystemCore;

    /// Number of particles (renderable points).
    fn particle_count(&self) -> usize;

    /// Uniform mass of every particle.
    fn particle_mass(&self) -> Real;

    /// Time derivative of `state`. Must not depend on anything but `state`
    /// and the fixed system parameters (including the pinned set).
    fn eval_derivative(&self, state: &DVector<Real>) -> SystemResult<DVector<Real>>;

    /// Jacobian of `eval_derivative` with respect to `state`.
    fn eval_jacobian(&self, state: &DVector<Real>) -> SystemResult<TripletMatrix>;

    /// Rebuild the deterministic initial configuration, including default pins.
    fn reset(&mut self) -> SystemResult<()>;

    /// Particle positions extracted from an arbitrary state vector.
    fn particle_positions_of(&self, state: &DVector<Real>) -> Vec<Point3<Real>>;

    /// Triangle list for rendering, empty for point systems.
    fn triangles(&self) -> &[[usize; 3]] {
        &[]
    }

    fn state(&self) -> &DVector<Real> {
        self.core().state()
    }

    fn set_state(&mut self, state: DVector<Real>) -> SystemResult<()> {
        self.core_mut().set_state(state)
    }

    /// Scalar count of the state vector.
    fn dof(&self) -> usize {
        self.state().len()
    }

    /// Positions from the current state.
    fn particle_positions(&self) -> Vec<Point3<Real>> {
        self.particle_positions_of(self.state())
    }

    fn pins(&self) -> &PinSet {
        self.core().pins()
    }

    fn pinned_ids(&self) -> &BTreeSet<usize> {
        self.pins().ids()
    }

    fn is_pinned(&self, id: usize) -> bool {
        self.pins().contains(id)
    }

    /// Flip the pin state of particle `id`; returns whether it is now pinned.
    fn toggle_pinned(&mut self, id: usize) -> SystemResult<bool> {
        check_particle(id, self.particle_count())?;
        Ok(self.core_mut().pins_mut().toggle(id))
    }

    /// Pin or unpin particle `id`. Unpinning never fails.
    fn set_pinned(&mut self, id: usize, pinned: bool) -> SystemResult<()> {
        if pinned {
            check_particle(id, self.particle_count())?;
        }
        self.core_mut().pins_mut().set(id, pinned);
        Ok(())
    }

    fn clear_pinned(&mut self) {
        self.core_mut().pins_mut().clear();
    }
}

fn check_particle(id: usize, count: usize) -> SystemResult<()> {
    if id >= count {
        return Err(SystemError::IndexOob {
            what: "particle",
            index: id,
            len: count,
        });
    }
    Ok(())
}
