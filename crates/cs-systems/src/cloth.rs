//! Mass-spring cloth on a rectangular particle grid.

use crate::error::{SystemError, SystemResult};
use crate::layout::StateLayout;
use crate::spring::{Spring, SpringKind};
use crate::traits::{DynamicalSystem, SystemCore};
use cs_core::Real;
use cs_core::constants::GRAVITY;
use cs_solver::TripletMatrix;
use nalgebra::{DVector, Point3, Vector3};

/// Construction parameters for a `Cloth`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClothParams {
    /// Particles per row
    pub size_x: usize,
    /// Particles per column
    pub size_y: usize,
    /// Extent along x, divided evenly between columns
    pub width: Real,
    /// Extent along y, divided evenly between rows
    pub height: Real,
    /// Spring constant shared by every spring
    pub stiffness: Real,
    /// Linear drag coefficient, force `-drag * v`
    pub drag: Real,
    /// Uniform particle mass
    pub particle_mass: Real,
    /// Gravitational acceleration along -z
    pub gravity: Real,
}

impl Default for ClothParams {
    fn default() -> Self {
        Self {
            size_x: 4,
            size_y: 4,
            width: 1.5,
            height: 1.5,
            stiffness: 20.0,
            drag: 0.01,
            particle_mass: 0.025,
            gravity: GRAVITY,
        }
    }
}

impl ClothParams {
    pub fn with_size(size_x: usize, size_y: usize) -> Self {
        Self {
            size_x,
            size_y,
            ..Self::default()
        }
    }

    fn validate(&self) -> SystemResult<()> {
        if self.size_x == 0 || self.size_y == 0 {
            return Err(SystemError::InvalidConfig {
                what: "cloth size must be nonzero in both dimensions",
            });
        }
        if self.particle_mass <= 0.0 || !self.particle_mass.is_finite() {
            return Err(SystemError::InvalidConfig {
                what: "particle mass must be positive",
            });
        }
        if self.width <= 0.0 || self.height <= 0.0 || !self.width.is_finite() || !self.height.is_finite() {
            return Err(SystemError::InvalidConfig {
                what: "cloth extent must be positive",
            });
        }
        if !self.stiffness.is_finite() || !self.drag.is_finite() || !self.gravity.is_finite() {
            return Err(SystemError::InvalidConfig {
                what: "cloth coefficients must be finite",
            });
        }
        Ok(())
    }
}

/// Number of springs of each kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpringCounts {
    pub structural: usize,
    pub shear: usize,
    pub bend: usize,
}

impl SpringCounts {
    pub fn total(&self) -> usize {
        self.structural + self.shear + self.bend
    }
}

/// Rectangular cloth of `size_x * size_y` particles joined by structural,
/// shear and bend springs. Particle `(x, y)` has index `y * size_x + x`.
#[derive(Clone, Debug)]
pub struct Cloth {
    params: ClothParams,
    layout: StateLayout,
    springs: Vec<Spring>,
    triangles: Vec<[usize; 3]>,
    core: SystemCore,
}

impl Cloth {
    pub fn new(params: ClothParams) -> SystemResult<Self> {
        let mut cloth = Self {
            params,
            layout: StateLayout::new(0),
            springs: Vec::new(),
            triangles: Vec::new(),
            core: SystemCore::default(),
        };
        cloth.reset()?;
        Ok(cloth)
    }

    pub fn params(&self) -> &ClothParams {
        &self.params
    }

    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    pub fn size(&self) -> (usize, usize) {
        (self.params.size_x, self.params.size_y)
    }

    /// Change the grid dimensions; discards the current state.
    pub fn set_size(&mut self, size_x: usize, size_y: usize) -> SystemResult<()> {
        let previous = self.params;
        self.params.size_x = size_x;
        self.params.size_y = size_y;
        if let Err(e) = self.reset() {
            self.params = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    pub fn spring_counts(&self) -> SpringCounts {
        let mut counts = SpringCounts::default();
        for s in &self.springs {
            match s.kind {
                SpringKind::Structural => counts.structural += 1,
                SpringKind::Shear => counts.shear += 1,
                SpringKind::Bend => counts.bend += 1,
            }
        }
        counts
    }

    /// Particle index of grid coordinate `(x, y)`.
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.params.size_x + x
    }

    /// The two top corners, `(0, 0)` and `(size_x - 1, 0)`.
    pub fn default_pins(size_x: usize) -> [usize; 2] {
        [0, size_x.saturating_sub(1)]
    }

    fn build_springs(&self) -> Vec<Spring> {
        let ClothParams {
            size_x: sx,
            size_y: sy,
            stiffness: k,
            ..
        } = self.params;
        let (rest_x, rest_y) = self.spacing();
        let rest_diag = rest_x.hypot(rest_y);
        let idx = |x: usize, y: usize| y * sx + x;

        let mut springs = Vec::new();

        // Structural along rows, then along columns.
        for y in 0..sy {
            for x in 0..sx - 1 {
                springs.push(Spring::new(idx(x, y), idx(x + 1, y), k, rest_x, SpringKind::Structural));
            }
        }
        for x in 0..sx {
            for y in 0..sy - 1 {
                springs.push(Spring::new(idx(x, y), idx(x, y + 1), k, rest_y, SpringKind::Structural));
            }
        }

        // Shear across each cell, both diagonals.
        for y in 0..sy - 1 {
            for x in 0..sx - 1 {
                springs.push(Spring::new(idx(x, y), idx(x + 1, y + 1), k, rest_diag, SpringKind::Shear));
            }
        }
        for y in 1..sy {
            for x in 0..sx - 1 {
                springs.push(Spring::new(idx(x, y), idx(x + 1, y - 1), k, rest_diag, SpringKind::Shear));
            }
        }

        // Bend, skipping one particle, only where the axis has room.
        for y in 0..sy {
            for x in 0..sx {
                if sy > 2 && y < sy - 2 {
                    springs.push(Spring::new(idx(x, y), idx(x, y + 2), k, 2.0 * rest_y, SpringKind::Bend));
                }
                if sx > 2 && x < sx - 2 {
                    springs.push(Spring::new(idx(x, y), idx(x + 2, y), k, 2.0 * rest_x, SpringKind::Bend));
                }
            }
        }

        springs
    }

    fn build_triangles(&self) -> Vec<[usize; 3]> {
        let (sx, sy) = self.size();
        let mut triangles = Vec::with_capacity(2 * (sx - 1) * (sy - 1));
        for row in 0..sy - 1 {
            for col in 0..sx - 1 {
                let a = row * sx + col;
                triangles.push([a, a + 1, a + sx]);
                triangles.push([a + 1, a + 1 + sx, a + sx]);
            }
        }
        triangles
    }

    fn initial_state(&self) -> DVector<Real> {
        let (sx, sy) = self.size();
        let (dx, dy) = self.spacing();
        let offset = Vector3::new(-0.5 * self.params.width, 0.0, 1.0);
        let mut state = DVector::zeros(self.layout.dof());
        for y in 0..sy {
            for x in 0..sx {
                let p = offset + Vector3::new(x as Real * dx, -(y as Real) * dy, 0.0);
                self.layout.set_position(&mut state, self.index(x, y), &p);
            }
        }
        state
    }

    fn spacing(&self) -> (Real, Real) {
        (
            self.params.width / self.params.size_x as Real,
            self.params.height / self.params.size_y as Real,
        )
    }
}

impl DynamicalSystem for Cloth {
    fn name(&self) -> &str {
        "cloth"
    }

    fn core(&self) -> &SystemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SystemCore {
        &mut self.core
    }

    fn particle_count(&self) -> usize {
        self.layout.particles()
    }

    fn particle_mass(&self) -> Real {
        self.params.particle_mass
    }

    fn eval_derivative(&self, state: &DVector<Real>) -> SystemResult<DVector<Real>> {
        self.layout.check_state(state)?;
        let n = self.layout.particles();
        let inv_mass = 1.0 / self.params.particle_mass;
        let mut dxdt = DVector::zeros(self.layout.dof());

        // dx/dt = v: the whole velocity block moves up into the position block.
        let base = self.layout.velocity_base();
        dxdt.rows_mut(0, base).copy_from(&state.rows(base, base));

        for s in &self.springs {
            let f = s.force(
                &self.layout.position(state, s.left),
                &self.layout.position(state, s.right),
            ) * inv_mass;
            self.layout.add_velocity(&mut dxdt, s.right, &f);
            self.layout.add_velocity(&mut dxdt, s.left, &(-f));
        }

        let gravity = Vector3::new(0.0, 0.0, -self.params.gravity);
        for i in 0..n {
            let v = self.layout.velocity(state, i);
            let a = gravity - v * (self.params.drag * inv_mass);
            self.layout.add_velocity(&mut dxdt, i, &a);
        }

        for i in self.core.pins().iter() {
            self.layout.zero_particle(&mut dxdt, i);
        }

        Ok(dxdt)
    }

    fn eval_jacobian(&self, state: &DVector<Real>) -> SystemResult<TripletMatrix> {
        self.layout.check_state(state)?;
        let n = self.layout.particles();
        let dof = self.layout.dof();
        let pins = self.core.pins();
        let inv_mass = 1.0 / self.params.particle_mass;
        let base = self.layout.velocity_base();

        let mut jac = TripletMatrix::new(dof, dof);

        for i in (0..n).filter(|&i| !pins.contains(i)) {
            // d(dx/dt)/dv = I
            jac.push_diagonal3(self.layout.position_offset(i), self.layout.velocity_offset(i), 1.0);
            // d(dv/dt)/dv = -drag/m I
            jac.push_diagonal3(
                self.layout.velocity_offset(i),
                self.layout.velocity_offset(i),
                -self.params.drag * inv_mass,
            );
        }

        for s in &self.springs {
            let (l, r) = (s.left, s.right);
            let k = s.force_jacobian(&self.layout.position(state, l), &self.layout.position(state, r));
            let (row_l, row_r) = (base + self.layout.position_offset(l), base + self.layout.position_offset(r));
            let (col_l, col_r) = (self.layout.position_offset(l), self.layout.position_offset(r));

            if !pins.contains(r) {
                jac.push_block3(row_r, col_r, &k, inv_mass);
                jac.push_block3(row_r, col_l, &k, -inv_mass);
            }
            if !pins.contains(l) {
                jac.push_block3(row_l, col_l, &k, inv_mass);
                jac.push_block3(row_l, col_r, &k, -inv_mass);
            }
        }

        Ok(jac)
    }

    fn reset(&mut self) -> SystemResult<()> {
        self.params.validate()?;
        self.layout = StateLayout::new(self.params.size_x * self.params.size_y);
        self.springs = self.build_springs();
        self.triangles = self.build_triangles();
        let state = self.initial_state();
        self.core.reinit(state);

        let pins = self.core.pins_mut();
        pins.clear();
        for id in Self::default_pins(self.params.size_x) {
            pins.set(id, true);
        }

        tracing::debug!(
            size_x = self.params.size_x,
            size_y = self.params.size_y,
            springs = self.springs.len(),
            "cloth reset"
        );
        Ok(())
    }

    fn particle_positions_of(&self, state: &DVector<Real>) -> Vec<Point3<Real>> {
        self.layout.positions(state)
    }

    fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }
}
