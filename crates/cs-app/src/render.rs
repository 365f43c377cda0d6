//! Data a viewer needs to draw the current frame.

use cs_systems::DynamicalSystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Linear RGB colour, components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color3 {
    pub const WHITE: Color3 = Color3::new(1.0, 1.0, 1.0);
    pub const RED: Color3 = Color3::new(1.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Marker colour per particle: red when pinned, white otherwise.
pub fn marker_colors(particle_count: usize, pinned: &BTreeSet<usize>) -> Vec<Color3> {
    (0..particle_count)
        .map(|i| {
            if pinned.contains(&i) {
                Color3::RED
            } else {
                Color3::WHITE
            }
        })
        .collect()
}

/// Everything a renderer reads from the simulation for one frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RenderSnapshot {
    /// Particle positions in particle-index order
    pub positions: Vec<[f64; 3]>,
    /// Triangle mesh over `positions` (empty for point systems)
    pub triangles: Vec<[usize; 3]>,
    /// One marker colour per particle
    pub marker_colors: Vec<Color3>,
    /// Whether particle markers should be drawn
    pub show_markers: bool,
}

impl RenderSnapshot {
    pub fn capture(system: &dyn DynamicalSystem, show_markers: bool) -> Self {
        let positions = system
            .particle_positions()
            .into_iter()
            .map(|p| [p.x, p.y, p.z])
            .collect();
        Self {
            positions,
            triangles: system.triangles().to_vec(),
            marker_colors: marker_colors(system.particle_count(), system.pinned_ids()),
            show_markers,
        }
    }
}
