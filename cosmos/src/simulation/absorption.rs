//! Event-horizon capture for the accretion-disk mode

use crate::simulation::states::Particle;

/// Capture radius as a multiple of the central body's radius
pub const HORIZON_FACTOR: f64 = 1.2;

/// Remove every particle (other than the central body at index 0) closer
/// to the central body than `HORIZON_FACTOR * radius`. Removal is
/// permanent and keeps the relative order of survivors.
///
/// Returns how many particles were captured.
pub fn apply_event_horizon(particles: &mut Vec<Particle>) -> usize {
    let Some(core) = particles.first() else {
        return 0;
    };
    let center = core.x;
    let horizon2 = (core.radius * HORIZON_FACTOR).powi(2);

    let before = particles.len();
    let mut index = 0;
    particles.retain(|p| {
        let keep = index == 0 || (p.x - center).norm_squared() >= horizon2;
        index += 1;
        keep
    });
    before - particles.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::states::NVec3;

    fn at(x: f64, m: f64) -> Particle {
        Particle::new(NVec3::new(x, 0.0, 0.0), NVec3::zeros(), m, 0.5)
    }

    #[test]
    fn captures_inside_horizon_only() {
        let mut core = at(0.0, 1000.0);
        core.radius = 10.0;
        let mut ps = vec![core, at(5.0, 1.0), at(11.9, 2.0), at(12.5, 3.0), at(-30.0, 4.0)];

        assert_eq!(apply_event_horizon(&mut ps), 2);
        let masses: Vec<f64> = ps.iter().map(|p| p.m).collect();
        assert_eq!(masses, vec![1000.0, 3.0, 4.0]);
    }

    #[test]
    fn empty_and_core_only_are_untouched() {
        let mut empty: Vec<Particle> = Vec::new();
        assert_eq!(apply_event_horizon(&mut empty), 0);

        let mut lone = vec![at(0.0, 1.0)];
        assert_eq!(apply_event_horizon(&mut lone), 0);
        assert_eq!(lone.len(), 1);
    }
}
