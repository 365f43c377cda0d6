//! One particle orbiting a fixed attractor at the origin.

use crate::error::{SystemError, SystemResult};
use crate::layout::StateLayout;
use crate::traits::{DynamicalSystem, SystemCore};
use cs_core::{Real, ensure_finite};
use cs_solver::TripletMatrix;
use nalgebra::{DVector, Matrix3, Point3, Vector3};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanetParams {
    /// Initial distance from the attractor, along +z
    pub radius: Real,
    /// Gravitational parameter `G * M` of the attractor
    pub mu: Real,
}

impl Default for PlanetParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            mu: 1.0,
        }
    }
}

impl PlanetParams {
    /// Period of the circular orbit started by `reset`.
    pub fn orbital_period(&self) -> Real {
        2.0 * PI * (self.radius.powi(3) / self.mu).sqrt()
    }
}

/// Inverse-square attraction `a = -mu x / |x|^3`.
///
/// `reset` places the particle at `(0, 0, r)` with velocity
/// `(-sqrt(mu / r), 0, 0)`, which is a circular orbit.
#[derive(Clone, Debug)]
pub struct Planet {
    params: PlanetParams,
    layout: StateLayout,
    core: SystemCore,
}

impl Planet {
    pub fn new(params: PlanetParams) -> SystemResult<Self> {
        let mut planet = Self {
            params,
            layout: StateLayout::new(1),
            core: SystemCore::default(),
        };
        planet.reset()?;
        Ok(planet)
    }

    pub fn params(&self) -> &PlanetParams {
        &self.params
    }

    /// Distance of the particle from the attractor in the current state.
    pub fn distance(&self) -> Real {
        self.layout.position(self.state(), 0).norm()
    }
}

impl DynamicalSystem for Planet {
    fn name(&self) -> &str {
        "planet"
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
        self.layout.check_state(state)?;
        let mut d = DVector::zeros(self.layout.dof());
        if self.is_pinned(0) {
            return Ok(d);
        }

        let x = self.layout.position(state, 0);
        let v = self.layout.velocity(state, 0);
        self.layout.set_position(&mut d, 0, &v);

        let r = x.norm();
        if r > 0.0 {
            let a = x * (-self.params.mu / (r * r * r));
            self.layout.set_velocity(&mut d, 0, &a);
        }
        Ok(d)
    }

    fn eval_jacobian(&self, state: &DVector<Real>) -> SystemResult<TripletMatrix> {
        self.layout.check_state(state)?;
        let mut jac = TripletMatrix::new(self.layout.dof(), self.layout.dof());
        if self.is_pinned(0) {
            return Ok(jac);
        }

        jac.push_diagonal3(self.layout.position_offset(0), self.layout.velocity_offset(0), 1.0);

        let x = self.layout.position(state, 0);
        let r2 = x.norm_squared();
        if r2 > 0.0 {
            // d/dx (-mu x / r^3) = mu (3 x x^T / r^5 - I / r^3)
            let r3 = r2 * r2.sqrt();
            let block: Matrix3<Real> =
                (x * x.transpose()) * (3.0 / (r2 * r3)) - Matrix3::identity() * (1.0 / r3);
            jac.push_block3(self.layout.velocity_offset(0), self.layout.position_offset(0), &block, self.params.mu);
        }
        Ok(jac)
    }

    fn reset(&mut self) -> SystemResult<()> {
        positive_finite(self.params.radius, "planet radius must be positive and finite")?;
        positive_finite(self.params.mu, "planet mu must be positive and finite")?;
        let mut state = DVector::zeros(self.layout.dof());
        self.layout
            .set_position(&mut state, 0, &Vector3::new(0.0, 0.0, self.params.radius));
        let speed = (self.params.mu / self.params.radius).sqrt();
        self.layout.set_velocity(&mut state, 0, &Vector3::new(-speed, 0.0, 0.0));

        self.core.reinit(state);
        self.core.pins_mut().clear();
        Ok(())
    }

    fn particle_positions_of(&self, state: &DVector<Real>) -> Vec<Point3<Real>> {
        self.layout.positions(state)
    }
}

fn positive_finite(value: Real, what: &'static str) -> SystemResult<Real> {
    match ensure_finite(value, what) {
        Ok(v) if v > 0.0 => Ok(v),
        _ => Err(SystemError::InvalidConfig { what }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_starts_circular_orbit() {
        let planet = Planet::new(PlanetParams {
            radius: 4.0,
            mu: 1.0,
        })
        .unwrap();
        assert_eq!(planet.state().as_slice(), &[0.0, 0.0, 4.0, -0.5, 0.0, 0.0]);
        // Centripetal acceleration v^2 / r equals mu / r^2.
        let d = planet.eval_derivative(planet.state()).unwrap();
        assert!((d[5] + 1.0 / 16.0).abs() < 1e-15);
    }

    #[test]
    fn orbital_period_of_unit_orbit() {
        assert!((PlanetParams::default().orbital_period() - 2.0 * PI).abs() < 1e-15);
    }

    #[test]
    fn invalid_radius_is_rejected() {
        let err = Planet::new(PlanetParams {
            radius: 0.0,
            mu: 1.0,
        })
        .unwrap_err();
        assert!(matches!(err, SystemError::InvalidConfig { .. }));
    }

    #[test]
    fn non_finite_parameters_are_rejected() {
        for params in [
            PlanetParams {
                radius: Real::INFINITY,
                mu: 1.0,
            },
            PlanetParams {
                radius: 1.0,
                mu: Real::NAN,
            },
        ] {
            let err = Planet::new(params).unwrap_err();
            assert!(matches!(err, SystemError::InvalidConfig { what } if what.contains("finite")));
        }
    }

    #[test]
    fn pinned_planet_has_zero_derivative_and_empty_jacobian() {
        let mut planet = Planet::new(PlanetParams::default()).unwrap();
        planet.toggle_pinned(0).unwrap();
        let d = planet.eval_derivative(planet.state()).unwrap();
        assert!(d.iter().all(|&v| v == 0.0));
        assert_eq!(planet.eval_jacobian(planet.state()).unwrap().nnz(), 0);
    }
}
