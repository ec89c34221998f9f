use std::time::Instant;

use crate::simulation::barnes_hut::BarnesHutTree;
use crate::simulation::diagnostics::total_energy;
use crate::simulation::engine::SimulationEngine;
use crate::simulation::forces::{DirectGravity, ForceSet, TreeGravity};
use crate::simulation::params::BarnesHutParams;
use crate::simulation::settings::{SimulationMode, SimulationSettings};
use crate::simulation::states::{NVec3, Particle};

/// Helper to build a deterministic population of size `n`, no rng needed
fn make_particles(n: usize) -> Vec<Particle> {
    (0..n)
        .map(|i| {
            let i_f = i as f64;
            let x = NVec3::new(
                (i_f * 0.37).sin() * 5.0,
                (i_f * 0.13).cos() * 5.0,
                (i_f * 0.07).sin() * 5.0,
            );
            Particle::new(x, NVec3::zeros(), 1.0, 0.01)
        })
        .collect()
}

/// Time one force evaluation, direct vs tree (build included), over growing n
pub fn bench_gravity() {
    let ns = [200, 400, 800, 1600, 3200, 6400];
    let params = BarnesHutParams {
        softening: 1e-2,
        g: 0.1,
        ..Default::default()
    };

    for n in ns {
        let particles = make_particles(n);
        let mut out = vec![NVec3::zeros(); n];

        let direct = ForceSet::new().with(DirectGravity { params });

        // Warm up
        direct.accumulate_forces(&particles, &mut out);

        let t0 = Instant::now();
        direct.accumulate_forces(&particles, &mut out);
        let dt_direct = t0.elapsed().as_secs_f64();

        let t1 = Instant::now();
        let tree = BarnesHutTree::build(&particles, params);
        let dt_build = t1.elapsed().as_secs_f64();
        ForceSet::new().with(TreeGravity { tree: &tree }).accumulate_forces(&particles, &mut out);
        let dt_bh = t1.elapsed().as_secs_f64();

        println!(
            "N = {n:5}, direct = {dt_direct:8.6} s, BH = {dt_bh:8.6} s (build {dt_build:8.6} s, {} nodes)",
            tree.node_count()
        );
    }
}

/// Time full engine steps per mode, printed as CSV for graphing
pub fn bench_step() {
    println!("mode,n,step_ms,energy_drift");

    let modes = [SimulationMode::Galaxy, SimulationMode::AccretionDisk, SimulationMode::Burst, SimulationMode::Cloud];
    for mode in modes {
        for n in [1_000, 5_000, 20_000] {
            let settings = SimulationSettings {
                mode,
                particle_count: n,
                collisions: true,
                ..Default::default()
            };

            let mut engine = SimulationEngine::new();
            engine.reset(&settings);
            let e0 = total_energy(engine.particles(), settings.gravity_g, settings.softening);

            // Small n: average over a few steps to smooth noise
            let steps = if n <= 5_000 { 5 } else { 2 };
            let t0 = Instant::now();
            for _ in 0..steps {
                engine.step(&settings);
            }
            let ms = t0.elapsed().as_secs_f64() * 1000.0 / steps as f64;

            let e1 = total_energy(engine.particles(), settings.gravity_g, settings.softening);
            let drift = (e1 - e0) / e0.abs().max(f64::MIN_POSITIVE);

            println!("{mode:?},{n},{ms:.3},{drift:.3e}");
        }
    }
}
