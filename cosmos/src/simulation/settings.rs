//! Per-step runtime settings
//!
//! Selects the scenario mode, time stepping, gravity, collision and
//! interactive-tool options consumed by `SimulationEngine::reset`/`step`

use serde::Deserialize;

use crate::simulation::params::BarnesHutParams;
use crate::simulation::states::NVec3;

/// Which initial population `reset` generates, and which post-step runs
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationMode {
    #[serde(rename = "galaxy")] // rotating disk around one dominant central mass
    #[default]
    Galaxy,

    #[serde(rename = "accretion_disk")] // dense fast disk around an absorbing body
    AccretionDisk,

    #[serde(rename = "burst")] // isotropic radial explosion from the origin
    Burst,

    #[serde(rename = "cloud")] // uniform cloud at rest, free interaction
    Cloud,
}

/// Interactive tool kind applied around `ToolSettings::center`
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionTool {
    #[serde(rename = "none")]
    #[default]
    None,

    #[serde(rename = "attract")]
    Attract,

    #[serde(rename = "repel")]
    Repel,

    #[serde(rename = "drag")] // spring pull toward the center
    Drag,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSettings {
    pub kind: InteractionTool,
    pub center: NVec3, // world-space point
    pub radius: f64, // influence radius
    pub strength: f64,
    pub engaged: bool, // true while the user holds the tool down
}

impl ToolSettings {
    /// A tool only produces force when engaged and not `None`
    pub fn is_active(&self) -> bool {
        self.engaged && self.kind != InteractionTool::None && self.radius > 0.0
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            kind: InteractionTool::None,
            center: NVec3::zeros(),
            radius: 50.0,
            strength: 1000.0,
            engaged: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub mode: SimulationMode,
    pub particle_count: usize, // target population on reset
    pub seed: u64, // seed for the reset-owned rng
    pub time_step: f64, // dt
    pub damping: f64, // velocity damping factor per step, in [0, 1]
    pub gravity_g: f64, // gravitational constant
    pub softening: f64, // softening length
    pub theta: f64, // opening angle
    pub max_leaf_size: usize,
    pub collisions: bool,
    pub restitution: f64, // 1 elastic, < 1 inelastic
    pub collision_cell_scale: f64, // grid cell = scale * sampled mean radius
    pub rebuild_every_n: usize, // rebuild the tree every N steps
    pub tool: ToolSettings,
}

impl SimulationSettings {
    /// Tree parameters derived from these settings
    pub fn barnes_hut(&self) -> BarnesHutParams {
        BarnesHutParams {
            theta: self.theta,
            softening: self.softening,
            g: self.gravity_g,
            max_leaf_size: self.max_leaf_size.max(1),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            mode: SimulationMode::Galaxy,
            particle_count: 100_000,
            seed: 42,
            time_step: 0.005,
            damping: 0.0,
            gravity_g: 1.0,
            softening: 0.01,
            theta: 0.7,
            max_leaf_size: 8,
            collisions: false,
            restitution: 1.0,
            collision_cell_scale: 2.5,
            rebuild_every_n: 1,
            tool: ToolSettings::default(),
        }
    }
}
