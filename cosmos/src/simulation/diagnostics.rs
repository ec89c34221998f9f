//! Conserved-quantity reductions over a particle snapshot
//!
//! Used for run logs, benchmarks and stability checks. Potential energy is a
//! direct O(n²) sum with the same softening as the force law.

use rayon::prelude::*;

use crate::simulation::states::{NVec3, Particle};

/// Σ ½ m v²
pub fn kinetic_energy(particles: &[Particle]) -> f64 {
    particles.par_iter().map(|p| 0.5 * p.m * p.v.norm_squared()).sum()
}

/// Σ_{i<j} −G m_i m_j / sqrt(r² + ε²)
pub fn potential_energy(particles: &[Particle], g: f64, softening: f64) -> f64 {
    let eps2 = softening * softening;
    (0..particles.len())
        .into_par_iter()
        .map(|i| {
            let p_i = &particles[i];
            particles[i + 1..]
                .iter()
                .map(|p_j| {
                    let d2 = (p_j.x - p_i.x).norm_squared() + eps2;
                    if d2 > 0.0 { -g * p_i.m * p_j.m / d2.sqrt() } else { 0.0 }
                })
                .sum::<f64>()
        })
        .sum()
}

pub fn total_energy(particles: &[Particle], g: f64, softening: f64) -> f64 {
    kinetic_energy(particles) + potential_energy(particles, g, softening)
}

pub fn total_mass(particles: &[Particle]) -> f64 {
    particles.iter().map(|p| p.m).sum()
}

pub fn total_momentum(particles: &[Particle]) -> NVec3 {
    particles.iter().fold(NVec3::zeros(), |acc, p| acc + p.m * p.v)
}

/// Mass-weighted mean position; the plain mean when total mass is zero,
/// and the origin for an empty set
pub fn center_of_mass(particles: &[Particle]) -> NVec3 {
    if particles.is_empty() {
        return NVec3::zeros();
    }
    let mass = total_mass(particles);
    if mass > 0.0 {
        particles.iter().fold(NVec3::zeros(), |acc, p| acc + p.m * p.x) / mass
    } else {
        particles.iter().fold(NVec3::zeros(), |acc, p| acc + p.x) / particles.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_body_energies() {
        let mut a = Particle::new(NVec3::new(-0.5, 0.0, 0.0), NVec3::new(0.0, 1.0, 0.0), 2.0, 0.1);
        let b = Particle::new(NVec3::new(0.5, 0.0, 0.0), NVec3::zeros(), 3.0, 0.1);
        a.v *= 2.0;
        let ps = vec![a, b];

        assert!((kinetic_energy(&ps) - 4.0).abs() < 1e-12);
        assert!((potential_energy(&ps, 1.0, 0.0) + 6.0).abs() < 1e-12);
        assert!((total_energy(&ps, 1.0, 0.0) + 2.0).abs() < 1e-12);
        assert!((center_of_mass(&ps).x - 0.1).abs() < 1e-12);
        assert_eq!(total_momentum(&ps), NVec3::new(0.0, 4.0, 0.0));
    }

    #[test]
    fn empty_set_is_inert() {
        assert_eq!(kinetic_energy(&[]), 0.0);
        assert_eq!(potential_energy(&[], 1.0, 0.1), 0.0);
        assert_eq!(center_of_mass(&[]), NVec3::zeros());
    }
}
