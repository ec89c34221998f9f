//! Initial particle populations for each simulation mode
//!
//! Every generator is a pure function of the requested count and the
//! `StdRng` threaded in by the caller, so a fixed seed reproduces the same
//! population bit for bit. Disk modes reserve index 0 for the central body.

use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::TAU;

use crate::simulation::settings::SimulationMode;
use crate::simulation::states::{NVec3, NVec4, Particle};

/// Central body of the galaxy disk
pub const GALAXY_CORE_MASS: f64 = 100_000.0;
pub const GALAXY_CORE_RADIUS: f64 = 5.0;

/// Absorbing body of the accretion disk
pub const ACCRETOR_MASS: f64 = 200_000.0;
pub const ACCRETOR_RADIUS: f64 = 8.0;

/// Time since detonation used to place burst particles on their rays
const BURST_SPREAD_TIME: f64 = 0.01;

struct DiskShape {
    radius: f64, // outer radius in the x-z plane
    thickness: f64, // full height along y
    speed: f64, // orbital speed scale
    particle_mass: f64,
    particle_radius: f64,
    core_mass: f64,
    core_radius: f64,
    core_color: NVec4,
}

/// Generate the population for `mode`
pub fn generate(mode: SimulationMode, n: usize, rng: &mut StdRng) -> Vec<Particle> {
    match mode {
        SimulationMode::Galaxy => galaxy(n, rng),
        SimulationMode::AccretionDisk => accretion_disk(n, rng),
        SimulationMode::Burst => burst(n, rng),
        SimulationMode::Cloud => cloud(n, rng),
    }
}

/// Rotating disk of radius 500 around a dominant central mass at index 0
pub fn galaxy(n: usize, rng: &mut StdRng) -> Vec<Particle> {
    let shape = DiskShape {
        radius: 500.0,
        thickness: 10.0,
        speed: 50.0,
        particle_mass: 1.0,
        particle_radius: 0.5,
        core_mass: GALAXY_CORE_MASS,
        core_radius: GALAXY_CORE_RADIUS,
        core_color: NVec4::new(5.0, 4.0, 2.0, 1.0),
    };
    rotating_disk(n, rng, &shape, |rng| NVec4::new(0.7 + 0.3 * rng.gen::<f64>(), 0.7, 1.0, 1.0))
}

/// Thinner, faster disk around a very massive absorbing body at index 0
pub fn accretion_disk(n: usize, rng: &mut StdRng) -> Vec<Particle> {
    let shape = DiskShape {
        radius: 400.0,
        thickness: 2.0,
        speed: 80.0,
        particle_mass: 1.0,
        particle_radius: 0.5,
        core_mass: ACCRETOR_MASS,
        core_radius: ACCRETOR_RADIUS,
        core_color: NVec4::new(10.0, 8.0, 6.0, 1.0),
    };
    rotating_disk(n, rng, &shape, |_| NVec4::new(1.0, 0.9, 0.6, 1.0))
}

/// Isotropic explosion: directions uniform on the sphere, speeds in [0, 200)
pub fn burst(n: usize, rng: &mut StdRng) -> Vec<Particle> {
    (0..n)
        .map(|_| {
            let dir = unit_vector(rng);
            let speed = 200.0 * rng.gen::<f64>();
            let v = dir * speed;
            let color = NVec4::new(2.0, 0.5 + 0.5 * rng.gen::<f64>(), 0.2, 1.0);
            Particle::new(v * BURST_SPREAD_TIME, v, 0.5, 0.6).with_color(color)
        })
        .collect()
}

/// Uniform cloud at rest in a 200-wide cube centered on the origin
pub fn cloud(n: usize, rng: &mut StdRng) -> Vec<Particle> {
    (0..n)
        .map(|_| {
            let x = NVec3::new(
                (rng.gen::<f64>() - 0.5) * 200.0,
                (rng.gen::<f64>() - 0.5) * 200.0,
                (rng.gen::<f64>() - 0.5) * 200.0,
            );
            Particle::new(x, NVec3::zeros(), 1.0, 1.0).with_color(NVec4::new(0.8, 0.9, 1.0, 1.0))
        })
        .collect()
}

// helpers ===========================================================================

fn rotating_disk(n: usize, rng: &mut StdRng, shape: &DiskShape, tint: impl Fn(&mut StdRng) -> NVec4) -> Vec<Particle> {
    if n == 0 {
        return Vec::new();
    }

    let mut particles = Vec::with_capacity(n);
    particles.push(
        Particle::new(NVec3::zeros(), NVec3::zeros(), shape.core_mass, shape.core_radius)
            .with_color(shape.core_color),
    );

    for _ in 1..n {
        // sqrt for uniform areal density
        let r = shape.radius * rng.gen::<f64>().sqrt();
        let angle = TAU * rng.gen::<f64>();
        let y = (rng.gen::<f64>() - 0.5) * shape.thickness;

        let (s, c) = angle.sin_cos();
        let x = NVec3::new(r * c, y, r * s);
        let v = NVec3::new(-s, 0.0, c) * (shape.speed / (r + 1.0).sqrt());

        particles.push(
            Particle::new(x, v, shape.particle_mass, shape.particle_radius).with_color(tint(rng)),
        );
    }

    particles
}

/// Uniform direction by rejection sampling inside the unit ball
fn unit_vector(rng: &mut StdRng) -> NVec3 {
    loop {
        let v = NVec3::new(
            2.0 * rng.gen::<f64>() - 1.0,
            2.0 * rng.gen::<f64>() - 1.0,
            2.0 * rng.gen::<f64>() - 1.0,
        );
        let n2 = v.norm_squared();
        if n2 > 1e-12 && n2 <= 1.0 {
            return v / n2.sqrt();
        }
    }
}
