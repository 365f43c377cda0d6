//! Stacked state layout for position/velocity particle systems.
//!
//! The state of `n` particles is `[x_0 .. x_{n-1} | v_0 .. v_{n-1}]`, three
//! scalars per block. Positions and velocities are not interleaved, so the
//! Jacobian splits into four `3n x 3n` quadrants.

use crate::error::{SystemError, SystemResult};
use cs_core::Real;
use cs_core::constants::DIM;
use nalgebra::{DVector, Point3, Vector3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateLayout {
    particles: usize,
}

impl StateLayout {
    pub const fn new(particles: usize) -> Self {
        Self { particles }
    }

    pub fn particles(&self) -> usize {
        self.particles
    }

    /// Total scalar count, `2 * 3 * n`.
    pub fn dof(&self) -> usize {
        2 * DIM * self.particles
    }

    /// Offset of the velocity block, `3 * n`.
    pub fn velocity_base(&self) -> usize {
        DIM * self.particles
    }

    pub fn position_offset(&self, i: usize) -> usize {
        DIM * i
    }

    pub fn velocity_offset(&self, i: usize) -> usize {
        self.velocity_base() + DIM * i
    }

    pub fn check_state(&self, state: &DVector<Real>) -> SystemResult<()> {
        if state.len() != self.dof() {
            return Err(SystemError::StateLength {
                expected: self.dof(),
                got: state.len(),
            });
        }
        Ok(())
    }

    pub fn position(&self, state: &DVector<Real>, i: usize) -> Vector3<Real> {
        state.fixed_rows::<3>(self.position_offset(i)).into_owned()
    }

    pub fn velocity(&self, state: &DVector<Real>, i: usize) -> Vector3<Real> {
        state.fixed_rows::<3>(self.velocity_offset(i)).into_owned()
    }

    pub fn set_position(&self, state: &mut DVector<Real>, i: usize, p: &Vector3<Real>) {
        state.fixed_rows_mut::<3>(self.position_offset(i)).copy_from(p);
    }

    pub fn set_velocity(&self, state: &mut DVector<Real>, i: usize, v: &Vector3<Real>) {
        state.fixed_rows_mut::<3>(self.velocity_offset(i)).copy_from(v);
    }

    pub fn add_velocity(&self, state: &mut DVector<Real>, i: usize, dv: &Vector3<Real>) {
        let mut block = state.fixed_rows_mut::<3>(self.velocity_offset(i));
        block += dv;
    }

    /// Zero both 3-blocks of particle `i`.
    pub fn zero_particle(&self, state: &mut DVector<Real>, i: usize) {
        state.fixed_rows_mut::<3>(self.position_offset(i)).fill(0.0);
        state.fixed_rows_mut::<3>(self.velocity_offset(i)).fill(0.0);
    }

    pub fn positions(&self, state: &DVector<Real>) -> Vec<Point3<Real>> {
        (0..self.particles)
            .map(|i| Point3::from(self.position(state, i)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_stacked_not_interleaved() {
        let layout = StateLayout::new(4);
        assert_eq!(layout.dof(), 24);
        assert_eq!(layout.position_offset(2), 6);
        assert_eq!(layout.velocity_offset(0), 12);
        assert_eq!(layout.velocity_offset(3), 21);
    }

    #[test]
    fn block_accessors_round_trip() {
        let layout = StateLayout::new(2);
        let mut state = DVector::zeros(layout.dof());
        layout.set_position(&mut state, 1, &Vector3::new(1.0, 2.0, 3.0));
        layout.set_velocity(&mut state, 0, &Vector3::new(-1.0, 0.5, 0.0));
        layout.add_velocity(&mut state, 0, &Vector3::new(1.0, 0.5, 2.0));

        assert_eq!(layout.position(&state, 1), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(layout.velocity(&state, 0), Vector3::new(0.0, 1.0, 2.0));
        assert_eq!(state[3], 1.0);
        assert_eq!(state[6], 0.0);
        assert_eq!(state[8], 2.0);

        layout.zero_particle(&mut state, 0);
        assert_eq!(layout.velocity(&state, 0), Vector3::zeros());
        assert_eq!(layout.positions(&state)[1], Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn check_state_rejects_wrong_length() {
        let layout = StateLayout::new(3);
        assert!(layout.check_state(&DVector::zeros(18)).is_ok());
        let err = layout.check_state(&DVector::zeros(9)).unwrap_err();
        assert_eq!(
            err,
            SystemError::StateLength {
                expected: 18,
                got: 9
            }
        );
    }
}
