//! The simulation session a front end drives.

use crate::error::{AppError, AppResult};
use crate::render::RenderSnapshot;
use crate::selection::Lasso;
use cs_core::Real;
use cs_core::timing::AccumulatingTimer;
use cs_sim::{FrameStats, IntegratorType, SimOptions};
use cs_solver::NewtonConfig;
use cs_systems::{Cloth, ClothParams, DynamicalSystem, Oscillator, Planet, PlanetParams};
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// The selectable reference systems, in selection-list order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum SystemKind {
    Oscillator,
    Planet,
    #[default]
    Cloth,
}

impl SystemKind {
    pub const ALL: [SystemKind; 3] = [SystemKind::Oscillator, SystemKind::Planet, SystemKind::Cloth];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            SystemKind::Oscillator => "Oscillator",
            SystemKind::Planet => "Planet",
            SystemKind::Cloth => "Cloth",
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SystemKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::UnknownSystem(s.to_string()))
    }
}

/// User-adjustable session parameters.
///
/// Setters clamp to the ranges a front end exposes through its sliders.
#[derive(Clone, Copy, Debug)]
pub struct SessionSettings {
    dt: Real,
    steps_per_frame: usize,
    cloth_size: (usize, usize),
    integrator: IntegratorType,
    newton: NewtonConfig,
    show_markers: bool,
}

impl SessionSettings {
    pub const DT_RANGE: RangeInclusive<Real> = 1e-5..=0.05;
    pub const STEPS_RANGE: RangeInclusive<usize> = 1..=1000;
    pub const CLOTH_SIZE_RANGE: RangeInclusive<usize> = 1..=40;

    pub fn dt(&self) -> Real {
        self.dt
    }

    pub fn steps_per_frame(&self) -> usize {
        self.steps_per_frame
    }

    pub fn cloth_size(&self) -> (usize, usize) {
        self.cloth_size
    }

    pub fn integrator(&self) -> IntegratorType {
        self.integrator
    }

    pub fn newton(&self) -> &NewtonConfig {
        &self.newton
    }

    pub fn show_markers(&self) -> bool {
        self.show_markers
    }

    /// Set the step length, clamped to `DT_RANGE`. Returns the value kept.
    pub fn set_dt(&mut self, dt: Real) -> AppResult<Real> {
        if dt.is_nan() {
            return Err(AppError::InvalidArg("step length is NaN".into()));
        }
        self.dt = dt.clamp(*Self::DT_RANGE.start(), *Self::DT_RANGE.end());
        if self.dt != dt {
            tracing::debug!(requested = dt, kept = self.dt, "step length clamped");
        }
        Ok(self.dt)
    }

    /// Set the steps per frame, clamped to `STEPS_RANGE`. Returns the value kept.
    pub fn set_steps_per_frame(&mut self, steps: usize) -> usize {
        self.steps_per_frame = clamp_usize(steps, &Self::STEPS_RANGE, "steps per frame");
        self.steps_per_frame
    }

    /// Set the cloth grid size, each axis clamped to `CLOTH_SIZE_RANGE`.
    pub fn set_cloth_size(&mut self, size_x: usize, size_y: usize) -> (usize, usize) {
        self.cloth_size = (
            clamp_usize(size_x, &Self::CLOTH_SIZE_RANGE, "cloth size x"),
            clamp_usize(size_y, &Self::CLOTH_SIZE_RANGE, "cloth size y"),
        );
        self.cloth_size
    }

    pub fn set_integrator(&mut self, integrator: IntegratorType) {
        self.integrator = integrator;
    }

    pub fn set_newton(&mut self, newton: NewtonConfig) {
        self.newton = newton;
    }

    pub fn set_show_markers(&mut self, show: bool) {
        self.show_markers = show;
    }

    fn sim_options(&self) -> SimOptions {
        SimOptions {
            dt: self.dt,
            steps_per_frame: self.steps_per_frame,
            frames: 1,
            integrator: self.integrator,
            newton: self.newton,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        let sim = SimOptions::default();
        let cloth = ClothParams::default();
        Self {
            dt: sim.dt,
            steps_per_frame: sim.steps_per_frame,
            cloth_size: (cloth.size_x, cloth.size_y),
            integrator: sim.integrator,
            newton: sim.newton,
            show_markers: true,
        }
    }
}

fn clamp_usize(value: usize, range: &RangeInclusive<usize>, what: &'static str) -> usize {
    let kept = value.clamp(*range.start(), *range.end());
    if kept != value {
        tracing::debug!(what, requested = value, kept, "value clamped");
    }
    kept
}

/// Serializable overview of a session's state.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub system: SystemKind,
    pub integrator: String,
    pub particles: usize,
    pub dof: usize,
    pub pinned: usize,
    pub time: Real,
    pub frames: u64,
    pub dt: Real,
    pub steps_per_frame: usize,
    pub average_frame_seconds: Option<f64>,
}

/// One running simulation: the selected system plus its step parameters.
pub struct Session {
    kind: SystemKind,
    system: Box<dyn DynamicalSystem>,
    settings: SessionSettings,
    time: Real,
    frames: u64,
    frame_timer: AccumulatingTimer,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.kind)
            .field("settings", &self.settings)
            .field("time", &self.time)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

fn build_system(kind: SystemKind, settings: &SessionSettings) -> AppResult<Box<dyn DynamicalSystem>> {
    Ok(match kind {
        SystemKind::Oscillator => Box::new(Oscillator::default()),
        SystemKind::Planet => Box::new(Planet::new(PlanetParams::default())?),
        SystemKind::Cloth => {
            let (size_x, size_y) = settings.cloth_size;
            Box::new(Cloth::new(ClothParams::with_size(size_x, size_y))?)
        }
    })
}

impl Session {
    pub fn new(kind: SystemKind) -> AppResult<Self> {
        Self::with_settings(kind, SessionSettings::default())
    }

    pub fn with_settings(kind: SystemKind, settings: SessionSettings) -> AppResult<Self> {
        let system = build_system(kind, &settings)?;
        Ok(Self {
            kind,
            system,
            settings,
            time: 0.0,
            frames: 0,
            frame_timer: AccumulatingTimer::new(),
        })
    }

    pub fn kind(&self) -> SystemKind {
        self.kind
    }

    pub fn system(&self) -> &dyn DynamicalSystem {
        self.system.as_ref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Simulated time since the last system switch or reset.
    pub fn time(&self) -> Real {
        self.time
    }

    /// Replace the current system with a fresh instance of `kind`.
    pub fn set_system(&mut self, kind: SystemKind) -> AppResult<()> {
        self.system = build_system(kind, &self.settings)?;
        self.kind = kind;
        self.restart_clock();
        tracing::info!(system = %kind, "system selected");
        Ok(())
    }

    /// Restore the current system's initial configuration and default pins.
    pub fn reset(&mut self) -> AppResult<()> {
        self.system.reset()?;
        self.restart_clock();
        tracing::info!(system = %self.kind, "simulation reset");
        Ok(())
    }

    fn restart_clock(&mut self) {
        self.time = 0.0;
        self.frames = 0;
        self.frame_timer.reset();
    }

    pub fn set_integrator(&mut self, integrator: IntegratorType) {
        self.settings.set_integrator(integrator);
        tracing::info!(integrator = %integrator, "integrator selected");
    }

    pub fn set_newton(&mut self, newton: NewtonConfig) {
        self.settings.set_newton(newton);
    }

    pub fn set_step_length(&mut self, dt: Real) -> AppResult<Real> {
        self.settings.set_dt(dt)
    }

    pub fn set_steps_per_frame(&mut self, steps: usize) -> usize {
        self.settings.set_steps_per_frame(steps)
    }

    /// Change the cloth grid size. A cloth currently on screen is rebuilt
    /// at the new size; other systems keep running and pick the size up the
    /// next time the cloth is selected.
    pub fn set_cloth_size(&mut self, size_x: usize, size_y: usize) -> AppResult<(usize, usize)> {
        let size = self.settings.set_cloth_size(size_x, size_y);
        if self.kind == SystemKind::Cloth {
            self.set_system(SystemKind::Cloth)?;
        }
        Ok(size)
    }

    pub fn set_marker_visibility(&mut self, show: bool) {
        self.settings.set_show_markers(show);
    }

    /// Run one frame of `steps_per_frame` integrator steps.
    pub fn advance_frame(&mut self) -> AppResult<FrameStats> {
        let opts = self.settings.sim_options();
        let stats = cs_sim::advance_frame(self.system.as_mut(), &opts)?;
        self.time += opts.frame_time();
        self.frames += 1;
        if let Some(seconds) = stats.wall_seconds {
            self.frame_timer.record(seconds);
        }
        Ok(stats)
    }

    /// Average wall time per frame, if timing is enabled and a frame ran.
    pub fn average_frame_seconds(&self) -> Option<f64> {
        (self.frame_timer.count() > 0).then(|| self.frame_timer.average_seconds())
    }

    /// Toggle the pin on a picked particle. `None` (nothing under the
    /// pointer) is a no-op. Returns the particle's new pinned state.
    pub fn toggle_pinned(&mut self, picked: Option<usize>) -> AppResult<Option<bool>> {
        let Some(id) = picked else {
            return Ok(None);
        };
        let pinned = self.system.toggle_pinned(id)?;
        tracing::debug!(particle = id, pinned, "pin toggled");
        Ok(Some(pinned))
    }

    /// Pin every particle in `ids`. Either all ids are valid and pinned, or
    /// nothing changes. Returns how many were newly pinned.
    pub fn pin_many<I: IntoIterator<Item = usize>>(&mut self, ids: I) -> AppResult<usize> {
        let ids: Vec<usize> = ids.into_iter().collect();
        let count = self.system.particle_count();
        if let Some(&bad) = ids.iter().find(|&&id| id >= count) {
            return Err(cs_systems::SystemError::IndexOob {
                what: "particle",
                index: bad,
                len: count,
            }
            .into());
        }

        let mut added = 0;
        for id in ids {
            if !self.system.is_pinned(id) {
                self.system.set_pinned(id, true)?;
                added += 1;
            }
        }
        tracing::debug!(added, "particles pinned");
        Ok(added)
    }

    /// Pin every particle whose screen-space point falls inside the lasso's
    /// bounding box. `screen_points[i]` is the caller's projection of
    /// particle `i`. An empty lasso pins nothing.
    pub fn pin_in_region(&mut self, lasso: &Lasso, screen_points: &[[f64; 2]]) -> AppResult<usize> {
        let Some(bounds) = lasso.bounds() else {
            return Ok(0);
        };
        if screen_points.len() != self.system.particle_count() {
            return Err(AppError::InvalidArg(format!(
                "expected {} screen points, got {}",
                self.system.particle_count(),
                screen_points.len()
            )));
        }
        let inside: Vec<usize> = screen_points
            .iter()
            .enumerate()
            .filter(|(_, p)| bounds.contains(**p))
            .map(|(i, _)| i)
            .collect();
        self.pin_many(inside)
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot::capture(self.system.as_ref(), self.settings.show_markers)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            system: self.kind,
            integrator: self.settings.integrator.label().to_string(),
            particles: self.system.particle_count(),
            dof: self.system.dof(),
            pinned: self.system.pinned_ids().len(),
            time: self.time,
            frames: self.frames,
            dt: self.settings.dt,
            steps_per_frame: self.settings.steps_per_frame,
            average_frame_seconds: self.average_frame_seconds(),
        }
    }
}
