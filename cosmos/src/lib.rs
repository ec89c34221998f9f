pub mod simulation;
pub mod configuration;
pub mod benchmark;

pub use simulation::states::{Particle, NVec3, NVec4};
pub use simulation::params::BarnesHutParams;
pub use simulation::settings::{SimulationSettings, SimulationMode, InteractionTool, ToolSettings};
pub use simulation::barnes_hut::{Aabb, BarnesHutTree, OctreeNode, compute_bounds};
pub use simulation::forces::{ForceTerm, ForceSet, TreeGravity, DirectGravity, InteractiveField};
pub use simulation::integrator::semi_implicit_euler;
pub use simulation::collision::{SpatialGrid, resolve_collisions, resolve_collisions_naive};
pub use simulation::absorption::apply_event_horizon;
pub use simulation::engine::{SimulationEngine, StepReport};

pub use configuration::config::{SettingsConfig, ConfigError, load_settings};

pub use benchmark::benchmark::{bench_gravity, bench_step};
