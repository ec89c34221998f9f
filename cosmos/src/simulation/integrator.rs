//! Fixed-step time integrator for the particle system
//!
//! Semi-implicit (symplectic) Euler driven by the force accumulated in each
//! `Particle::force`

use rayon::prelude::*;

use super::states::{NVec3, Particle};

/// Advance every particle by one step of size `dt`.
///
/// Per particle, in this order:
/// 1. `a = force / m` (zero for massless tracers)
/// 2. `v += a * dt`
/// 3. `v *= 1 - damping`
/// 4. `x += v * dt`
///
/// Moving with the already-updated velocity is what makes the scheme
/// symplectic; the order must not change.
pub fn semi_implicit_euler(particles: &mut [Particle], dt: f64, damping: f64) {
    let keep = 1.0 - damping;
    particles.par_iter_mut().for_each(|p| {
        let accel = if p.m > 0.0 { p.force / p.m } else { NVec3::zeros() };
        p.v += accel * dt;
        p.v *= keep;
        p.x += p.v * dt;
    });
}
