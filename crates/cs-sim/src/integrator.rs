//! Fixed-step time integrators.
//!
//! Every integrator reads the system's current state, advances it by `dt`
//! and writes the result back with `set_state`. Nothing is carried over
//! between calls, so integrators can be swapped between any two steps.

use crate::error::{SimError, SimResult};
use cs_core::Real;
use cs_core::timing::{step_timing, timed};
use cs_solver::{NewtonConfig, TripletMatrix, newton_solve};
use cs_systems::DynamicalSystem;
use nalgebra::DVector;
use std::fmt;
use std::str::FromStr;

/// Outcome of one integrator step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepReport {
    /// Newton iterations (0 for explicit schemes)
    pub iterations: usize,
    /// False only when an implicit step ran out of Newton iterations
    pub converged: bool,
    /// Norm of the last Newton update (0 for explicit schemes)
    pub last_update_norm: Real,
}

impl StepReport {
    fn explicit() -> Self {
        Self {
            iterations: 0,
            converged: true,
            last_update_norm: 0.0,
        }
    }
}

/// Trait for time integrators.
pub trait Integrator {
    /// Advance the system's state by one time step.
    fn step<S: DynamicalSystem + ?Sized>(&self, system: &mut S, dt: Real) -> SimResult<StepReport>;
}

fn check_dt(dt: Real) -> SimResult<()> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(SimError::InvalidArg {
            what: "dt must be positive and finite",
        });
    }
    Ok(())
}

fn derivative<S: DynamicalSystem + ?Sized>(system: &S, x: &DVector<Real>) -> SimResult<DVector<Real>> {
    Ok(timed("derivative", &step_timing::DERIVATIVE_EVALS, || {
        system.eval_derivative(x)
    })?)
}

fn jacobian<S: DynamicalSystem + ?Sized>(system: &S, x: &DVector<Real>) -> SimResult<TripletMatrix> {
    Ok(timed("jacobian", &step_timing::JACOBIAN_EVALS, || {
        system.eval_jacobian(x)
    })?)
}

/// Forward Euler (explicit, 1st order): `x1 = x0 + dt f(x0)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<S: DynamicalSystem + ?Sized>(&self, system: &mut S, dt: Real) -> SimResult<StepReport> {
        check_dt(dt)?;
        let x0 = system.state();
        let x1 = x0 + derivative(system, x0)? * dt;
        system.set_state(x1)?;
        Ok(StepReport::explicit())
    }
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Copy, Debug, Default)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<S: DynamicalSystem + ?Sized>(&self, system: &mut S, dt: Real) -> SimResult<StepReport> {
        check_dt(dt)?;
        let x0 = system.state();

        let k1 = derivative(system, x0)?;
        let k2 = derivative(system, &(x0 + &k1 * (0.5 * dt)))?;
        let k3 = derivative(system, &(x0 + &k2 * (0.5 * dt)))?;
        let k4 = derivative(system, &(x0 + &k3 * dt))?;

        // x1 = x0 + dt/6 * (k1 + 2 k2 + 2 k3 + k4)
        let x1 = x0 + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0);
        system.set_state(x1)?;
        Ok(StepReport::explicit())
    }
}

/// Backward Euler (implicit, 1st order): solves `x1 = x0 + dt f(x1)`.
///
/// Newton starts from the forward Euler prediction and iterates on
/// `(I - dt J(x)) dx = -(x - x0 - dt f(x))`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BackwardEuler {
    pub newton: NewtonConfig,
}

impl Integrator for BackwardEuler {
    fn step<S: DynamicalSystem + ?Sized>(&self, system: &mut S, dt: Real) -> SimResult<StepReport> {
        check_dt(dt)?;
        let x0 = system.state().clone();
        let sys: &S = &*system;

        let guess = &x0 + derivative(sys, &x0)? * dt;
        let result = newton_solve(
            guess,
            |x: &DVector<Real>| -> SimResult<DVector<Real>> {
                let f = derivative(sys, x)?;
                Ok(x - &x0 - f * dt)
            },
            |x: &DVector<Real>| -> SimResult<TripletMatrix> {
                Ok(jacobian(sys, x)?.identity_minus_scaled(dt))
            },
            &self.newton,
        )?;

        system.set_state(result.x)?;
        Ok(StepReport {
            iterations: result.iterations,
            converged: result.converged,
            last_update_norm: result.update_norm,
        })
    }
}

/// Implicit midpoint (implicit, 2nd order): solves
/// `x1 = x0 + dt f((x0 + x1) / 2)`.
///
/// Same Newton loop as backward Euler with the derivative and Jacobian taken
/// at the midpoint and the Jacobian term halved: `I - dt/2 J(mid)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImplicitMidpoint {
    pub newton: NewtonConfig,
}

impl Integrator for ImplicitMidpoint {
    fn step<S: DynamicalSystem + ?Sized>(&self, system: &mut S, dt: Real) -> SimResult<StepReport> {
        check_dt(dt)?;
        let x0 = system.state().clone();
        let sys: &S = &*system;
        let midpoint = |x: &DVector<Real>| (x + &x0) * 0.5;

        let guess = &x0 + derivative(sys, &x0)? * dt;
        let result = newton_solve(
            guess,
            |x: &DVector<Real>| -> SimResult<DVector<Real>> {
                let f = derivative(sys, &midpoint(x))?;
                Ok(x - &x0 - f * dt)
            },
            |x: &DVector<Real>| -> SimResult<TripletMatrix> {
                Ok(jacobian(sys, &midpoint(x))?.identity_minus_scaled(0.5 * dt))
            },
            &self.newton,
        )?;

        system.set_state(result.x)?;
        Ok(StepReport {
            iterations: result.iterations,
            converged: result.converged,
            last_update_norm: result.update_norm,
        })
    }
}

/// Integrator selection, switchable between any two steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntegratorType {
    /// Forward Euler (1st-order, 1 derivative evaluation per step).
    #[default]
    ForwardEuler,
    /// 4th-order Runge-Kutta (4 derivative evaluations per step).
    RK4,
    /// Backward Euler (Newton + sparse LU).
    BackwardEuler,
    /// Implicit midpoint (Newton + sparse LU).
    ImplicitMidpoint,
}

impl IntegratorType {
    pub const ALL: [IntegratorType; 4] = [
        IntegratorType::ForwardEuler,
        IntegratorType::RK4,
        IntegratorType::BackwardEuler,
        IntegratorType::ImplicitMidpoint,
    ];

    /// Human-readable name, as shown in a selection list.
    pub fn label(self) -> &'static str {
        match self {
            IntegratorType::ForwardEuler => "Forward Euler",
            IntegratorType::RK4 => "RK4",
            IntegratorType::BackwardEuler => "Backward Euler",
            IntegratorType::ImplicitMidpoint => "Implicit midpoint",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn is_implicit(self) -> bool {
        matches!(
            self,
            IntegratorType::BackwardEuler | IntegratorType::ImplicitMidpoint
        )
    }

    /// Advance `system` by one step with this scheme.
    pub fn step<S: DynamicalSystem + ?Sized>(
        self,
        system: &mut S,
        dt: Real,
        newton: &NewtonConfig,
    ) -> SimResult<StepReport> {
        match self {
            IntegratorType::ForwardEuler => ForwardEuler.step(system, dt),
            IntegratorType::RK4 => RK4.step(system, dt),
            IntegratorType::BackwardEuler => BackwardEuler { newton: *newton }.step(system, dt),
            IntegratorType::ImplicitMidpoint => {
                ImplicitMidpoint { newton: *newton }.step(system, dt)
            }
        }
    }
}

impl fmt::Display for IntegratorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for IntegratorType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "forwardeuler" | "euler" | "explicit" => Ok(IntegratorType::ForwardEuler),
            "rk4" | "rungekutta" => Ok(IntegratorType::RK4),
            "backwardeuler" | "impliciteuler" => Ok(IntegratorType::BackwardEuler),
            "implicitmidpoint" | "backwardmidpoint" | "midpoint" => {
                Ok(IntegratorType::ImplicitMidpoint)
            }
            _ => Err(SimError::UnknownIntegrator { name: s.to_string() }),
        }
    }
}
