//! Sphere-sphere collision resolution
//!
//! Broad phase: a uniform spatial hash keyed by integer cell coordinates.
//! Narrow phase: overlap test, impulse along the contact normal and a
//! positional split of the overlap by inverse mass.
//!
//! Contacts are gathered first, sorted by `(i, j)`, then resolved one by one
//! against current positions. The grid only decides which pairs get tested,
//! so the naive O(n²) scan yields the same contact list and the same result.

use std::collections::HashMap;

use crate::simulation::states::{NVec3, Particle};

/// Default cell size as a multiple of the sampled mean radius
pub const DEFAULT_CELL_SCALE: f64 = 2.5;

/// Lower clamp on the cell size
pub const MIN_CELL_SIZE: f64 = 0.5;

/// Particles sampled (from the front) when estimating the mean radius
pub const RADIUS_SAMPLE: usize = 256;

/// Extra push so resolved pairs end up touching, never overlapping
const SEPARATION_SLOP: f64 = 1e-9;

pub type CellKey = (i64, i64, i64);

/// Cell size for a population: `scale` times the mean radius of the first
/// [`RADIUS_SAMPLE`] particles, never below [`MIN_CELL_SIZE`].
pub fn cell_size_for(particles: &[Particle], scale: f64) -> f64 {
    let sample = &particles[..particles.len().min(RADIUS_SAMPLE)];
    if sample.is_empty() {
        return MIN_CELL_SIZE;
    }
    let mean = sample.iter().map(|p| p.radius).sum::<f64>() / sample.len() as f64;
    (scale * mean).max(MIN_CELL_SIZE)
}

/// Uniform hash grid; every particle index sits in exactly one bucket.
pub struct SpatialGrid {
    cell_size: f64,
    buckets: HashMap<CellKey, Vec<usize>>,
}

impl SpatialGrid {
    pub fn build(particles: &[Particle], cell_size: f64) -> Self {
        let mut grid = Self {
            cell_size,
            buckets: HashMap::new(),
        };
        for (i, p) in particles.iter().enumerate() {
            let key = grid.cell_of(&p.x);
            grid.buckets.entry(key).or_default().push(i);
        }
        grid
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn cell_of(&self, x: &NVec3) -> CellKey {
        (
            (x.x / self.cell_size).floor() as i64,
            (x.y / self.cell_size).floor() as i64,
            (x.z / self.cell_size).floor() as i64,
        )
    }

    /// Number of occupied cells
    pub fn occupied(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket(&self, key: &CellKey) -> &[usize] {
        self.buckets.get(key).map_or(&[], Vec::as_slice)
    }

    /// Overlapping pairs `(i, j)` with `i < j`, sorted, each listed once.
    ///
    /// Inside a cell, bucket entry `a` is only tested against later entries.
    /// A neighbour cell is only visited from the cell with the smaller key,
    /// so each unordered pair of cells is scanned once and all of its pairs
    /// are tested.
    pub fn contacts(&self, particles: &[Particle]) -> Vec<(usize, usize)> {
        let mut keys: Vec<CellKey> = self.buckets.keys().copied().collect();
        keys.sort_unstable();

        let mut contacts = Vec::new();
        for key in &keys {
            let bucket = self.bucket(key);

            for (a, &i) in bucket.iter().enumerate() {
                for &j in &bucket[a + 1..] {
                    if overlapping(&particles[i], &particles[j]) {
                        contacts.push(ordered(i, j));
                    }
                }
            }

            for dx in -1..=1i64 {
                for dy in -1..=1i64 {
                    for dz in -1..=1i64 {
                        let neighbour = (
                            key.0.saturating_add(dx),
                            key.1.saturating_add(dy),
                            key.2.saturating_add(dz),
                        );
                        if neighbour <= *key {
                            continue;
                        }
                        let Some(other) = self.buckets.get(&neighbour) else {
                            continue;
                        };
                        for &i in bucket {
                            for &j in other {
                                if overlapping(&particles[i], &particles[j]) {
                                    contacts.push(ordered(i, j));
                                }
                            }
                        }
                    }
                }
            }
        }

        contacts.sort_unstable();
        contacts
    }
}

/// Every overlapping pair by brute force, in `(i, j)` order
pub fn naive_contacts(particles: &[Particle]) -> Vec<(usize, usize)> {
    let mut contacts = Vec::new();
    for i in 0..particles.len() {
        for j in (i + 1)..particles.len() {
            if overlapping(&particles[i], &particles[j]) {
                contacts.push((i, j));
            }
        }
    }
    contacts
}

/// Grid-accelerated pass over the whole population; returns contacts resolved
pub fn resolve_collisions(particles: &mut [Particle], restitution: f64, cell_scale: f64) -> usize {
    if particles.len() < 2 {
        return 0;
    }
    let grid = SpatialGrid::build(particles, cell_size_for(particles, cell_scale));
    let contacts = grid.contacts(particles);
    resolve_all(particles, &contacts, restitution)
}

/// O(n²) reference pass, identical in outcome to [`resolve_collisions`]
pub fn resolve_collisions_naive(particles: &mut [Particle], restitution: f64) -> usize {
    let contacts = naive_contacts(particles);
    resolve_all(particles, &contacts, restitution)
}

fn resolve_all(particles: &mut [Particle], contacts: &[(usize, usize)], restitution: f64) -> usize {
    let mut resolved = 0;
    for &(i, j) in contacts {
        if resolve_contact(particles, i, j, restitution) {
            resolved += 1;
        }
    }
    resolved
}

/// Resolve one pair if it still overlaps. Returns whether it did.
///
/// Both the velocity change and the overlap removal are split by the other
/// particle's mass fraction, `m_j / (m_i + m_j)` for particle `i`. For two
/// massive spheres this is the usual `J = -(1 + e) v_n / (1/m_i + 1/m_j)`.
/// The velocity change is applied only while the spheres approach along the
/// normal. Momentum and the center of mass are left unchanged. A massless
/// tracer takes the whole response and its partner is not disturbed. Two
/// massless particles get no impulse and split the overlap evenly.
/// Coincident centers use +x as the normal.
pub fn resolve_contact(particles: &mut [Particle], i: usize, j: usize, restitution: f64) -> bool {
    if i == j || i >= particles.len() || j >= particles.len() {
        return false;
    }
    let (a, b) = pair_mut(particles, i, j);

    let r = b.x - a.x;
    let min_dist = a.radius + b.radius;
    let dist2 = r.norm_squared();
    if dist2 >= min_dist * min_dist {
        return false;
    }

    let dist = dist2.sqrt();
    let n = if dist > 0.0 { r / dist } else { NVec3::x() };

    let total = a.m + b.m;
    let (share_a, share_b) = if total > 0.0 {
        (b.m / total, a.m / total)
    } else {
        (0.5, 0.5)
    };

    let v_n = (b.v - a.v).dot(&n);
    if total > 0.0 && v_n < 0.0 {
        let dv = -(1.0 + restitution) * v_n;
        a.v -= n * (dv * share_a);
        b.v += n * (dv * share_b);
    }

    let correction = min_dist - dist + SEPARATION_SLOP;
    a.x -= n * (correction * share_a);
    b.x += n * (correction * share_b);

    true
}

// helpers ===========================================================================

fn overlapping(a: &Particle, b: &Particle) -> bool {
    let min_dist = a.radius + b.radius;
    (b.x - a.x).norm_squared() < min_dist * min_dist
}

fn ordered(i: usize, j: usize) -> (usize, usize) {
    if i < j { (i, j) } else { (j, i) }
}

/// Two distinct mutable particles, returned in `(i, j)` order
fn pair_mut(particles: &mut [Particle], i: usize, j: usize) -> (&mut Particle, &mut Particle) {
    if i < j {
        let (lo, hi) = particles.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = particles.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}
