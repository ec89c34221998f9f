//! Simulation engine: owns the particles, the tree and the random source
//!
//! One `step` runs the stage pipeline with a full barrier between stages:
//! tree build + mass aggregation (when due) → gravity → interactive field →
//! integration → collisions → mode post-step

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::simulation::absorption::apply_event_horizon;
use crate::simulation::barnes_hut::BarnesHutTree;
use crate::simulation::collision::resolve_collisions;
use crate::simulation::forces::{ForceSet, InteractiveField, TreeGravity};
use crate::simulation::integrator::semi_implicit_euler;
use crate::simulation::params::BarnesHutParams;
use crate::simulation::scenario;
use crate::simulation::settings::{SimulationMode, SimulationSettings};
use crate::simulation::states::{NVec3, Particle};

/// What a single step did, for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub rebuilt_tree: bool,
    pub collisions: usize, // contacts resolved
    pub absorbed: usize, // particles captured by the event horizon
}

pub struct SimulationEngine {
    particles: Vec<Particle>,
    tree: Option<BarnesHutTree>,
    tree_frame: u64, // frame the current tree was built on
    rng: StdRng,
    frame: u64, // steps taken since reset
    time: f64, // simulated time since reset
}

impl SimulationEngine {
    /// Empty engine; call `reset` to populate it
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
            tree: None,
            tree_frame: 0,
            rng: StdRng::seed_from_u64(0),
            frame: 0,
            time: 0.0,
        }
    }

    /// Start from an explicit population instead of a generated scenario
    pub fn from_particles(particles: Vec<Particle>, settings: &SimulationSettings) -> Self {
        let mut engine = Self {
            particles,
            tree: None,
            tree_frame: 0,
            rng: StdRng::seed_from_u64(settings.seed),
            frame: 0,
            time: 0.0,
        };
        engine.rebuild_tree(settings.barnes_hut());
        engine
    }

    /// Discard all state, reseed, regenerate the population for the mode and
    /// build a fresh tree
    pub fn reset(&mut self, settings: &SimulationSettings) {
        self.rng = StdRng::seed_from_u64(settings.seed);
        self.particles = scenario::generate(settings.mode, settings.particle_count, &mut self.rng);
        self.frame = 0;
        self.time = 0.0;
        self.rebuild_tree(settings.barnes_hut());

        info!(
            "reset: mode {:?}, {} particles, seed {}",
            settings.mode,
            self.particles.len(),
            settings.seed
        );
    }

    /// Advance the simulation by one frame
    pub fn step(&mut self, settings: &SimulationSettings) -> StepReport {
        let mut report = StepReport::default();
        let params = settings.barnes_hut();

        if self.tree_is_due(&params, settings.rebuild_every_n) {
            self.rebuild_tree(params);
            report.rebuilt_tree = true;
        }

        // forces into a scratch buffer, then into each accumulator
        let mut forces = vec![NVec3::zeros(); self.particles.len()];
        {
            let mut set = ForceSet::new();
            if let Some(tree) = self.tree.as_ref() {
                set = set.with(TreeGravity { tree });
            }
            if settings.tool.is_active() {
                set = set.with(InteractiveField { tool: settings.tool });
            }
            set.accumulate_forces(&self.particles, &mut forces);
        }
        for (p, f) in self.particles.iter_mut().zip(forces) {
            p.force = f;
        }

        semi_implicit_euler(&mut self.particles, settings.time_step, settings.damping);

        if settings.collisions {
            report.collisions = resolve_collisions(
                &mut self.particles,
                settings.restitution,
                settings.collision_cell_scale,
            );
        }

        if settings.mode == SimulationMode::AccretionDisk {
            report.absorbed = apply_event_horizon(&mut self.particles);
        }

        self.frame += 1;
        self.time += settings.time_step;

        debug!(
            "step {}: {} particles, rebuilt {}, collisions {}, absorbed {}",
            self.frame,
            self.particles.len(),
            report.rebuilt_tree,
            report.collisions,
            report.absorbed
        );

        report
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Write access for external tools (e.g. an instantaneous kick).
    /// The population size cannot change through this view.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn tree(&self) -> Option<&BarnesHutTree> {
        self.tree.as_ref()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    // helpers ==============================================================================

    /// Rebuild when there is no tree, the population size or tree
    /// parameters changed, or the cadence says so. A tree built on the
    /// current frame (by `reset` or `from_particles`) is already fresh.
    fn tree_is_due(&self, params: &BarnesHutParams, every_n: usize) -> bool {
        let Some(tree) = self.tree.as_ref() else {
            return true;
        };
        tree.particle_count() != self.particles.len()
            || tree.params() != params
            || (self.frame % every_n.max(1) as u64 == 0 && self.tree_frame != self.frame)
    }

    fn rebuild_tree(&mut self, params: BarnesHutParams) {
        self.tree = Some(BarnesHutTree::build(&self.particles, params));
        self.tree_frame = self.frame;
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(mode: SimulationMode) -> SimulationSettings {
        SimulationSettings {
            mode,
            particle_count: 200,
            ..Default::default()
        }
    }

    #[test]
    fn new_engine_is_empty_and_steps_inertly() {
        let mut engine = SimulationEngine::new();
        let report = engine.step(&SimulationSettings::default());
        assert!(engine.particles().is_empty());
        assert_eq!(report.collisions, 0);
        assert_eq!(engine.frame(), 1);
    }

    #[test]
    fn rebuild_cadence_is_honoured() {
        let mut settings = small(SimulationMode::Cloud);
        settings.rebuild_every_n = 3;
        let mut engine = SimulationEngine::new();
        engine.reset(&settings);

        let rebuilt: Vec<bool> = (0..7).map(|_| engine.step(&settings).rebuilt_tree).collect();
        assert_eq!(rebuilt, vec![false, false, false, true, false, false, true]);
    }

    #[test]
    fn first_step_reuses_the_reset_tree() {
        let settings = small(SimulationMode::Galaxy);
        assert_eq!(settings.rebuild_every_n, 1);
        let mut engine = SimulationEngine::new();
        engine.reset(&settings);

        assert!(!engine.step(&settings).rebuilt_tree);
        assert!(engine.step(&settings).rebuilt_tree);

        let mut fresh = SimulationEngine::from_particles(engine.particles().to_vec(), &settings);
        assert!(!fresh.step(&settings).rebuilt_tree);
    }

    #[test]
    fn stepping_a_new_engine_builds_its_first_tree() {
        let mut engine = SimulationEngine::new();
        assert!(engine.tree().is_none());
        assert!(engine.step(&SimulationSettings::default()).rebuilt_tree);
    }

    #[test]
    fn parameter_change_forces_rebuild() {
        let mut settings = small(SimulationMode::Cloud);
        settings.rebuild_every_n = 10;
        let mut engine = SimulationEngine::new();
        engine.reset(&settings);
        engine.step(&settings);
        assert!(!engine.step(&settings).rebuilt_tree);

        settings.theta = 0.4;
        assert!(engine.step(&settings).rebuilt_tree);
        assert_eq!(engine.tree().map(|t| t.params().theta), Some(0.4));
    }

    #[test]
    fn population_shrink_forces_rebuild() {
        let mut settings = small(SimulationMode::AccretionDisk);
        settings.rebuild_every_n = 10;
        let mut engine = SimulationEngine::new();
        engine.reset(&settings);
        engine.step(&settings);

        // park a particle inside the horizon; it is captured this step
        engine.particles_mut()[7].x = NVec3::new(1.0, 0.0, 0.0);
        engine.particles_mut()[7].v = NVec3::zeros();
        let report = engine.step(&settings);
        assert!(report.absorbed >= 1);

        assert!(engine.step(&settings).rebuilt_tree);
        assert_eq!(engine.tree().map(|t| t.particle_count()), Some(engine.particles().len()));
    }

    #[test]
    fn time_and_frame_advance() {
        let settings = small(SimulationMode::Burst);
        let mut engine = SimulationEngine::new();
        engine.reset(&settings);
        for _ in 0..4 {
            engine.step(&settings);
        }
        assert_eq!(engine.frame(), 4);
        assert!((engine.time() - 4.0 * settings.time_step).abs() < 1e-12);

        engine.reset(&settings);
        assert_eq!(engine.frame(), 0);
        assert_eq!(engine.time(), 0.0);
    }
}
