//! Integrators driving the reference systems.

use cs_sim::{
    BackwardEuler, ForwardEuler, ImplicitMidpoint, Integrator, IntegratorType, RK4, SimError,
    SimOptions, run_frames,
};
use cs_solver::{ConvergencePolicy, NewtonConfig, SolverError, TripletMatrix};
use cs_systems::{
    Cloth, ClothParams, DynamicalSystem, Oscillator, Planet, PlanetParams, SystemCore,
    SystemResult,
};
use nalgebra::{DVector, Point3};
use proptest::prelude::*;

/// Largest |r - r0| over one orbital period.
fn orbit_radius_drift(kind: IntegratorType, dt: f64) -> f64 {
    let params = PlanetParams::default();
    let mut planet = Planet::new(params).unwrap();
    let r0 = planet.distance();
    let steps = (params.orbital_period() / dt).round() as usize;
    let newton = NewtonConfig::default();

    let mut drift: f64 = 0.0;
    for _ in 0..steps {
        kind.step(&mut planet, dt, &newton).unwrap();
        drift = drift.max((planet.distance() - r0).abs() / r0);
    }
    drift
}

fn pendulum_cloth() -> Cloth {
    let mut cloth = Cloth::new(ClothParams::with_size(2, 1)).unwrap();
    cloth.clear_pinned();
    cloth.set_pinned(0, true).unwrap();
    cloth
}

#[test]
fn rk4_keeps_circular_orbit() {
    assert!(orbit_radius_drift(IntegratorType::RK4, 0.05) < 0.01);
}

#[test]
fn rk4_orbit_closes_after_one_period() {
    let params = PlanetParams::default();
    let mut planet = Planet::new(params).unwrap();
    let start = planet.state().clone();
    let steps = 200;
    let dt = params.orbital_period() / steps as f64;
    for _ in 0..steps {
        RK4.step(&mut planet, dt).unwrap();
    }
    // position and velocity both return to the start
    assert!((planet.state() - &start).amax() < 1e-3);
}

#[test]
fn forward_euler_orbit_spirals_out() {
    assert!(orbit_radius_drift(IntegratorType::ForwardEuler, 0.05) > 0.05);
}

#[test]
fn implicit_midpoint_keeps_circular_orbit() {
    assert!(orbit_radius_drift(IntegratorType::ImplicitMidpoint, 0.01) < 0.01);
}

#[test]
fn backward_euler_orbit_stays_bounded() {
    let mut planet = Planet::new(PlanetParams::default()).unwrap();
    for _ in 0..200 {
        let report = BackwardEuler::default().step(&mut planet, 0.01).unwrap();
        assert!(report.converged);
    }
    // numerical damping pulls the orbit inward, never outward
    let r = planet.distance();
    assert!(r.is_finite());
    assert!(r <= 1.0 + 1e-3);
}

#[test]
fn backward_euler_satisfies_implicit_equation() {
    let mut cloth = pendulum_cloth();
    let dt = 0.01;
    for _ in 0..20 {
        let x0 = cloth.state().clone();
        let report = BackwardEuler::default().step(&mut cloth, dt).unwrap();
        assert!(report.converged);
        assert!(report.iterations >= 1);

        let x1 = cloth.state().clone();
        let f1 = cloth.eval_derivative(&x1).unwrap();
        let residual = &x1 - &x0 - f1 * dt;
        assert!(residual.norm() < 1e-9, "residual {}", residual.norm());
    }
}

#[test]
fn implicit_midpoint_satisfies_implicit_equation() {
    let mut cloth = pendulum_cloth();
    let dt = 0.01;
    for _ in 0..20 {
        let x0 = cloth.state().clone();
        let report = ImplicitMidpoint::default().step(&mut cloth, dt).unwrap();
        assert!(report.converged);

        let x1 = cloth.state().clone();
        let mid = (&x1 + &x0) * 0.5;
        let f_mid = cloth.eval_derivative(&mid).unwrap();
        let residual = &x1 - &x0 - f_mid * dt;
        assert!(residual.norm() < 1e-9, "residual {}", residual.norm());
    }
}

#[test]
fn pinned_particles_do_not_move() {
    for kind in IntegratorType::ALL {
        let mut cloth = Cloth::new(ClothParams::default()).unwrap();
        let layout = cloth.layout();
        let pinned: Vec<usize> = cloth.pinned_ids().iter().copied().collect();
        let before: Vec<_> = pinned
            .iter()
            .map(|&i| layout.position(cloth.state(), i))
            .collect();

        for _ in 0..50 {
            kind.step(&mut cloth, 0.001, &NewtonConfig::default()).unwrap();
        }

        for (&i, p0) in pinned.iter().zip(&before) {
            let p1 = layout.position(cloth.state(), i);
            assert!((p1 - p0).norm() < 1e-12, "{kind}: particle {i} moved");
            assert!(layout.velocity(cloth.state(), i).norm() < 1e-12);
        }
        assert!(cloth.state().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn free_cloth_falls() {
    let mut cloth = Cloth::new(ClothParams::default()).unwrap();
    cloth.clear_pinned();
    let layout = cloth.layout();
    let z0 = layout.position(cloth.state(), 5).z;
    for _ in 0..10 {
        RK4.step(&mut cloth, 0.01).unwrap();
    }
    // springs are at rest, so every particle is in free fall: z = z0 - g t^2 / 2
    let z1 = layout.position(cloth.state(), 5).z;
    let expected = z0 - 0.5 * 9.81 * 0.1 * 0.1;
    assert!((z1 - expected).abs() < 1e-3);
}

#[test]
fn explicit_schemes_report_converged() {
    let mut osc = Oscillator::default();
    let a = ForwardEuler.step(&mut osc, 0.1).unwrap();
    let b = RK4.step(&mut osc, 0.1).unwrap();
    for report in [a, b] {
        assert!(report.converged);
        assert_eq!(report.iterations, 0);
        assert_eq!(report.last_update_norm, 0.0);
    }
}

#[test]
fn strict_policy_fails_without_touching_state() {
    let mut osc = Oscillator::default();
    let strict = NewtonConfig {
        max_iterations: 1,
        policy: ConvergencePolicy::Strict,
        ..NewtonConfig::default()
    };
    let before = osc.state().clone();
    let err = IntegratorType::BackwardEuler
        .step(&mut osc, 0.1, &strict)
        .unwrap_err();
    assert!(matches!(
        err,
        SimError::Solver(SolverError::NotConverged { iterations: 1, .. })
    ));
    assert_eq!(osc.state(), &before);
}

#[test]
fn best_effort_policy_accepts_last_iterate() {
    let mut osc = Oscillator::default();
    let budget = NewtonConfig {
        max_iterations: 1,
        ..NewtonConfig::default()
    };
    let report = IntegratorType::ImplicitMidpoint
        .step(&mut osc, 0.1, &budget)
        .unwrap();
    assert!(!report.converged);
    assert_eq!(report.iterations, 1);
    assert!(osc.state() != &DVector::from_vec(vec![0.0, 0.0, 1.0]));
}

#[test]
fn oscillator_accuracy_by_order() {
    // error after t = 1 at dt = 0.01 against the exact rotation
    let exact = [-(1.0_f64.sin()), 0.0, 1.0_f64.cos()];
    let error = |kind: IntegratorType| {
        let mut osc = Oscillator::default();
        let opts = SimOptions {
            dt: 0.01,
            steps_per_frame: 100,
            frames: 1,
            integrator: kind,
            ..SimOptions::default()
        };
        let record = run_frames(&mut osc, &opts).unwrap();
        let x = record.final_state().unwrap();
        x.iter()
            .zip(exact)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    };

    assert!(error(IntegratorType::ForwardEuler) < 1e-2);
    assert!(error(IntegratorType::BackwardEuler) < 1e-2);
    assert!(error(IntegratorType::ImplicitMidpoint) < 1e-4);
    assert!(error(IntegratorType::RK4) < 1e-9);
}

#[test]
fn switching_integrators_between_steps() {
    let mut planet = Planet::new(PlanetParams::default()).unwrap();
    let newton = NewtonConfig::default();
    for (i, kind) in IntegratorType::ALL.iter().cycle().take(40).enumerate() {
        let report = kind.step(&mut planet, 0.01, &newton).unwrap();
        assert!(report.converged, "step {i} with {kind}");
    }
    assert!((planet.distance() - 1.0).abs() < 0.01);
}

proptest! {
    #[test]
    fn backward_euler_damps_rotation(radius in 0.1f64..10.0, dt in 1e-3f64..0.5) {
        let mut osc = Oscillator::new(radius);
        BackwardEuler::default().step(&mut osc, dt).unwrap();
        let expected = radius / (1.0 + dt * dt).sqrt();
        prop_assert!((osc.state().norm() - expected).abs() < 1e-9 * radius);
    }

    #[test]
    fn implicit_midpoint_preserves_rotation_radius(radius in 0.1f64..10.0, dt in 1e-3f64..0.5) {
        let mut osc = Oscillator::new(radius);
        ImplicitMidpoint::default().step(&mut osc, dt).unwrap();
        prop_assert!((osc.state().norm() - radius).abs() < 1e-9 * radius);
    }
}

/// `dx/dt = rate * x`. With `dt * rate == 1` the backward Euler matrix
/// `I - dt J` is exactly zero.
struct Growth {
    rate: f64,
    core: SystemCore,
}

impl Growth {
    fn new(rate: f64) -> Self {
        Self {
            rate,
            core: SystemCore::new(DVector::from_vec(vec![1.0, 2.0, 3.0])),
        }
    }
}

impl DynamicalSystem for Growth {
    fn name(&self) -> &str {
        "growth"
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

    fn particle_mass(&self) -> f64 {
        1.0
    }

    fn eval_derivative(&self, state: &DVector<f64>) -> SystemResult<DVector<f64>> {
        Ok(state * self.rate)
    }

    fn eval_jacobian(&self, state: &DVector<f64>) -> SystemResult<TripletMatrix> {
        let mut jac = TripletMatrix::new(state.len(), state.len());
        for i in 0..state.len() {
            jac.push(i, i, self.rate);
        }
        Ok(jac)
    }

    fn reset(&mut self) -> SystemResult<()> {
        self.core.reinit(DVector::from_vec(vec![1.0, 2.0, 3.0]));
        Ok(())
    }

    fn particle_positions_of(&self, state: &DVector<f64>) -> Vec<Point3<f64>> {
        vec![Point3::new(state[0], state[1], state[2])]
    }
}

#[test]
fn singular_implicit_system_is_a_solver_error() {
    let mut system = Growth::new(10.0);
    let before = system.state().clone();

    let err = BackwardEuler::default().step(&mut system, 0.1).unwrap_err();
    assert!(matches!(
        err,
        SimError::Solver(SolverError::Factorization { .. })
    ));
    assert_eq!(system.state(), &before);

    // A step length away from the singular point still solves.
    BackwardEuler::default().step(&mut system, 0.05).unwrap();
    assert!(system.state()[0] > before[0]);
}
