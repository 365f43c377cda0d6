//! Frame runner and result recording.
//!
//! A displayed frame is a fixed number of integrator steps of a fixed length.
//! `run_frames` drives a whole headless run and records the state after
//! every frame.

use crate::error::{SimError, SimResult};
use crate::integrator::{IntegratorType, StepReport};
use cs_core::Real;
use cs_core::timing::Timer;
use cs_solver::NewtonConfig;
use cs_systems::DynamicalSystem;
use nalgebra::DVector;

/// Options for simulation runs.
#[derive(Clone, Copy, Debug)]
pub struct SimOptions {
    /// Fixed time step (seconds)
    pub dt: Real,
    /// Integrator steps per displayed frame
    pub steps_per_frame: usize,
    /// Number of frames for `run_frames`
    pub frames: usize,
    /// Integrator type (default: forward Euler)
    pub integrator: IntegratorType,
    /// Newton settings for the implicit schemes
    pub newton: NewtonConfig,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 1e-4,
            steps_per_frame: 5,
            frames: 1,
            integrator: IntegratorType::default(),
            newton: NewtonConfig::default(),
        }
    }
}

impl SimOptions {
    /// Simulated time covered by one frame.
    pub fn frame_time(&self) -> Real {
        self.dt * self.steps_per_frame as Real
    }

    fn validate(&self) -> SimResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive and finite",
            });
        }
        if self.steps_per_frame == 0 {
            return Err(SimError::InvalidArg {
                what: "steps_per_frame must be positive",
            });
        }
        Ok(())
    }
}

/// Aggregated step reports of one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameStats {
    /// Integrator steps taken
    pub steps: usize,
    /// Newton iterations summed over all steps
    pub newton_iterations: usize,
    /// Steps whose Newton solve ran out of iterations
    pub unconverged_steps: usize,
    /// Largest final Newton update norm seen in the frame
    pub max_update_norm: Real,
    /// Wall time of the frame, present only when timing is enabled
    pub wall_seconds: Option<f64>,
}

impl FrameStats {
    fn absorb(&mut self, report: &StepReport) {
        self.steps += 1;
        self.newton_iterations += report.iterations;
        if !report.converged {
            self.unconverged_steps += 1;
        }
        self.max_update_norm = self.max_update_norm.max(report.last_update_norm);
    }

    /// True when every step of the frame converged.
    pub fn converged(&self) -> bool {
        self.unconverged_steps == 0
    }
}

/// Record of a multi-frame run.
#[derive(Clone, Debug, Default)]
pub struct SimRecord {
    /// Time points (seconds), starting at 0
    pub t: Vec<Real>,
    /// State snapshots, one per time point
    pub x: Vec<DVector<Real>>,
    /// Per-frame statistics (one fewer entry than `t`)
    pub frames: Vec<FrameStats>,
}

impl SimRecord {
    pub fn final_state(&self) -> Option<&DVector<Real>> {
        self.x.last()
    }
}

/// Apply `opts.steps_per_frame` steps of `opts.integrator` to `system`.
///
/// A failing step aborts the frame and leaves the system at the last
/// successfully computed state.
pub fn advance_frame<S: DynamicalSystem + ?Sized>(
    system: &mut S,
    opts: &SimOptions,
) -> SimResult<FrameStats> {
    opts.validate()?;

    let timer = Timer::start("frame");
    let mut stats = FrameStats::default();
    for _ in 0..opts.steps_per_frame {
        let report = opts.integrator.step(system, opts.dt, &opts.newton)?;
        stats.absorb(&report);
    }
    stats.wall_seconds = timer.stop();

    tracing::debug!(
        system = system.name(),
        integrator = opts.integrator.label(),
        steps = stats.steps,
        newton_iterations = stats.newton_iterations,
        unconverged = stats.unconverged_steps,
        "frame advanced"
    );
    Ok(stats)
}

/// Run `opts.frames` frames from the system's current state.
pub fn run_frames<S: DynamicalSystem + ?Sized>(
    system: &mut S,
    opts: &SimOptions,
) -> SimResult<SimRecord> {
    opts.validate()?;

    let mut t = 0.0;
    let mut record = SimRecord {
        t: vec![t],
        x: vec![system.state().clone()],
        frames: Vec::with_capacity(opts.frames),
    };

    for _ in 0..opts.frames {
        let stats = advance_frame(system, opts)?;
        t += opts.frame_time();
        record.t.push(t);
        record.x.push(system.state().clone());
        record.frames.push(stats);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_core::{Tolerances, nearly_equal};
    use cs_systems::Oscillator;

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.dt, 1e-4);
        assert_eq!(opts.steps_per_frame, 5);
        assert_eq!(opts.frames, 1);
        assert_eq!(opts.integrator, IntegratorType::ForwardEuler);
        assert!((opts.frame_time() - 5e-4).abs() < 1e-18);
    }

    #[test]
    fn sim_options_invalid() {
        let mut osc = Oscillator::default();
        let opts = SimOptions {
            steps_per_frame: 0,
            ..SimOptions::default()
        };
        assert!(matches!(
            advance_frame(&mut osc, &opts),
            Err(SimError::InvalidArg { .. })
        ));

        let opts = SimOptions {
            dt: -1.0,
            ..SimOptions::default()
        };
        assert!(run_frames(&mut osc, &opts).is_err());
    }

    #[test]
    fn frame_counts_steps() {
        let mut osc = Oscillator::default();
        let opts = SimOptions {
            dt: 0.01,
            steps_per_frame: 7,
            integrator: IntegratorType::BackwardEuler,
            ..SimOptions::default()
        };
        let stats = advance_frame(&mut osc, &opts).unwrap();
        assert_eq!(stats.steps, 7);
        assert!(stats.converged());
        assert!(stats.newton_iterations >= 7);
    }

    #[test]
    fn run_records_every_frame() {
        let mut osc = Oscillator::default();
        let opts = SimOptions {
            dt: 0.01,
            steps_per_frame: 10,
            frames: 4,
            integrator: IntegratorType::RK4,
            ..SimOptions::default()
        };
        let record = run_frames(&mut osc, &opts).unwrap();
        assert_eq!(record.t.len(), 5);
        assert_eq!(record.x.len(), 5);
        assert_eq!(record.frames.len(), 4);
        assert!(nearly_equal(record.t[4], 0.4, Tolerances::default()));
        assert_eq!(record.final_state(), Some(osc.state()));

        // exact solution after t = 0.4 is (-sin t, 0, cos t)
        let x = osc.state();
        assert!((x[0] + 0.4_f64.sin()).abs() < 1e-8);
        assert!((x[2] - 0.4_f64.cos()).abs() < 1e-8);
    }
}
