//! # Barnes–Hut Octree (3D)
//!
//! This module implements a **3D Barnes–Hut octree** for approximating
//! gravitational forces in an `N`-body system. It replaces the naive
//! `O(N²)` all-pairs sum with an approximate `O(N log N)` traversal while
//! keeping near-field interactions exact.
//!
//! ## Core Concepts
//!
//! - The scene's bounding box is recursively split into 8 octants.
//! - A node stops splitting once it holds at most `max_leaf_size` particle
//!   indices, or once the depth cap is passed; it then becomes a leaf that
//!   owns those indices.
//! - Each node stores:
//!   - total mass of its subtree
//!   - center of mass (COM)
//!   - bounding box (center + half extents)
//!
//! ## Stages
//!
//! 1. [`compute_bounds`] finds a box covering every particle.
//! 2. The builder partitions indices into octants. Independent octants are
//!    built as separate `rayon` tasks; each task writes only its own child
//!    slot, joined before the parent is returned.
//! 3. A post-order pass aggregates mass and COM from the leaves up.
//! 4. [`BarnesHutTree::compute_force`] walks the tree with an explicit stack.

use rayon::prelude::*;

use crate::simulation::params::{BarnesHutParams, MAX_TREE_DEPTH};
use crate::simulation::states::{NVec3, Particle};

/// Margin added to every half extent so boundary points are strictly inside
pub const BOUNDS_EPS: f64 = 1e-3;

/// Floor added to the query-to-COM distance in the opening test
const DIST_EPS: f64 = 1e-6;

/// Axis-aligned bounding box stored as center + half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: NVec3,
    pub half: NVec3,
}

impl Aabb {
    pub fn new(center: NVec3, half: NVec3) -> Self {
        Self { center, half }
    }

    /// Degenerate box used when there is nothing to bound
    pub fn unit() -> Self {
        Self::new(NVec3::zeros(), NVec3::new(1.0, 1.0, 1.0))
    }

    /// Closed containment test
    pub fn contains(&self, p: &NVec3) -> bool {
        let d = p - self.center;
        d.x.abs() <= self.half.x && d.y.abs() <= self.half.y && d.z.abs() <= self.half.z
    }

    /// Characteristic node size used by the opening test: twice the largest
    /// half extent, so non-cubic boxes are never under-estimated.
    pub fn size(&self) -> f64 {
        2.0 * self.half.x.max(self.half.y).max(self.half.z)
    }

    /// Compute the octant index for a point relative to this box's center.
    ///
    /// The index is encoded using 3 bits:
    ///
    /// - Bit 0 (value 1): X axis: 1 when `x >= center.x`
    /// - Bit 1 (value 2): Y axis: 1 when `y >= center.y`
    /// - Bit 2 (value 4): Z axis: 1 when `z >= center.z`
    ///
    /// Ties on the center plane always go to the upper half, so every point
    /// maps to exactly one octant. Points outside the box are still assigned
    /// (by the same sign rule); the builder never drops an index.
    pub fn octant_of(&self, p: &NVec3) -> usize {
        let mut idx = 0;

        if p.x >= self.center.x { idx |= 1; } // bit 0
        if p.y >= self.center.y { idx |= 2; } // bit 1
        if p.z >= self.center.z { idx |= 4; } // bit 2

        idx
    }

    /// Box of child octant `octant` (same bit layout as [`Aabb::octant_of`]).
    pub fn child(&self, octant: usize) -> Aabb {
        let h = self.half * 0.5;
        let offset = NVec3::new(
            if octant & 1 != 0 { h.x } else { -h.x },
            if octant & 2 != 0 { h.y } else { -h.y },
            if octant & 4 != 0 { h.z } else { -h.z },
        );
        Aabb::new(self.center + offset, h)
    }
}

/// Compute the axis-aligned box covering every particle position.
///
/// The tight min/max box is expanded by [`BOUNDS_EPS`] on every half extent
/// so points lying exactly on the boundary sit strictly inside. An empty
/// slice yields [`Aabb::unit`].
pub fn compute_bounds(particles: &[Particle]) -> Aabb {
    let Some(first) = particles.first() else {
        return Aabb::unit();
    };

    let mut min = first.x;
    let mut max = first.x;
    for p in particles {
        min = min.inf(&p.x);
        max = max.sup(&p.x);
    }

    let center = (min + max) * 0.5;
    let half = (max - center).add_scalar(BOUNDS_EPS);
    Aabb::new(center, half)
}

/// A single octree node.
///
/// A node is a leaf iff all `children` are `None`; only leaves carry
/// particle indices. Children are exclusively owned, so the tree is a plain
/// acyclic hierarchy dropped in one go when the tree is rebuilt.
#[derive(Debug)]
pub struct OctreeNode {
    pub bounds: Aabb,
    pub mass: f64,
    pub com: NVec3,
    pub indices: Vec<usize>, // particle indices, leaves only
    pub children: [Option<Box<OctreeNode>>; 8],
}

impl OctreeNode {
    fn leaf(bounds: Aabb, indices: Vec<usize>) -> Self {
        Self {
            bounds,
            mass: 0.0,
            com: bounds.center,
            indices,
            children: Default::default(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Iterate over the non-empty child slots
    pub fn children(&self) -> impl Iterator<Item = &OctreeNode> {
        self.children.iter().flatten().map(|c| c.as_ref())
    }
}

/// A complete Barnes–Hut octree built over one particle snapshot.
///
/// The tree only stores indices; positions and masses are read back from
/// the particle slice passed to [`BarnesHutTree::compute_force`], which must
/// be the same population (same length) the tree was built from.
#[derive(Debug)]
pub struct BarnesHutTree {
    root: OctreeNode,
    params: BarnesHutParams,
    len: usize,
}

impl BarnesHutTree {
    /// Build an octree from the current particle state.
    ///
    /// This:
    /// 1. Computes the bounding box of all particles.
    /// 2. Partitions the indices `0..n` recursively into octants.
    /// 3. Computes total mass and center of mass for every node (bottom-up).
    ///
    /// # Parameters
    /// - `particles`: The population to partition.
    /// - `params`   : Leaf capacity plus the force-law values used later by
    ///   [`BarnesHutTree::compute_force`].
    ///
    /// # Returns
    /// A fully constructed tree where every index appears in exactly one leaf.
    pub fn build(particles: &[Particle], params: BarnesHutParams) -> Self {
        let bounds = compute_bounds(particles);
        let indices: Vec<usize> = (0..particles.len()).collect();
        let max_leaf = params.max_leaf_size.max(1);

        let mut root = build_node(particles, bounds, indices, 0, max_leaf);
        accumulate_mass(&mut root, particles);

        Self {
            root,
            params,
            len: particles.len(),
        }
    }

    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    pub fn params(&self) -> &BarnesHutParams {
        &self.params
    }

    /// Number of particles the tree was built over
    pub fn particle_count(&self) -> usize {
        self.len
    }

    /// Compute the gravitational field at particle `i` (force per unit mass).
    ///
    /// Read-only with respect to both the tree and `particles`; the caller
    /// scales by the particle's mass and stores it in the accumulator.
    ///
    /// Traversal is an iterative depth-first walk with an explicit stack.
    /// For each node:
    ///
    /// - **Non-positive mass**: skipped (no contribution).
    /// - **Leaf**: exact softened pairwise sum over its particles, skipping
    ///   `i` itself.
    /// - **Interior**: with `s` the node size and `d` the distance to its
    ///   COM, if `s / d < theta` the subtree acts as one point mass at its
    ///   COM; otherwise its children are pushed.
    ///
    /// Smaller `theta` opens more nodes; `theta = 0` degenerates to the
    /// direct pairwise sum.
    ///
    /// # Parameters
    /// - `i`        : Index of the query particle.
    /// - `particles`: Population the tree was built from.
    ///
    /// # Returns
    /// The softened Newtonian field `Σ G m_j (r_j − r_i) / (|r|² + ε²)^{3/2}`.
    pub fn compute_force(&self, i: usize, particles: &[Particle]) -> NVec3 {
        let mut force = NVec3::zeros();
        let Some(p_i) = particles.get(i) else {
            return force;
        };

        let g = self.params.g;
        let eps2 = self.params.softening * self.params.softening;
        let theta = self.params.theta;

        let mut stack: Vec<&OctreeNode> = Vec::with_capacity(64);
        stack.push(&self.root);

        while let Some(node) = stack.pop() {
            if node.mass <= 0.0 {
                continue;
            }

            if node.is_leaf() {
                for &j in &node.indices {
                    if j == i {
                        continue; // don't self-interact
                    }
                    let Some(p_j) = particles.get(j) else {
                        continue;
                    };
                    force += softened_pull(p_j.x - p_i.x, p_j.m, g, eps2);
                }
                continue;
            }

            let r = node.com - p_i.x;
            let dist = r.norm() + DIST_EPS;

            if node.bounds.size() / dist < theta {
                // Far enough away: one pseudo-particle at the COM
                let dist2 = dist * dist + eps2;
                let inv = dist2.sqrt().recip();
                force += g * node.mass * inv * inv * inv * r;
            } else {
                stack.extend(node.children());
            }
        }

        force
    }

    /// All leaves in depth-first order
    pub fn leaves(&self) -> Vec<&OctreeNode> {
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                out.push(node);
            } else {
                stack.extend(node.children());
            }
        }
        out
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children());
        }
        count
    }

    /// Depth of the deepest leaf (root = 0)
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(&self.root, 0usize)];
        while let Some((node, d)) = stack.pop() {
            deepest = deepest.max(d);
            stack.extend(node.children().map(|c| (c, d + 1)));
        }
        deepest
    }
}

// helpers ===========================================================================

/// Softened Newtonian pull of a mass `m` displaced by `r` from the query point.
pub(crate) fn softened_pull(r: NVec3, m: f64, g: f64, eps2: f64) -> NVec3 {
    let dist2 = r.dot(&r) + eps2;
    if dist2 <= 0.0 {
        return NVec3::zeros(); // coincident points with zero softening
    }
    let inv_r = dist2.sqrt().recip();
    let inv_r3 = inv_r * inv_r * inv_r;
    g * m * inv_r3 * r
}

/// Recursively partition `indices` inside `bounds`.
///
/// Terminates as a leaf when the set fits in `max_leaf` or the depth cap is
/// passed. Otherwise every index is classified into exactly one octant and
/// only the non-empty octants are built. When more than two octants need
/// building they are built in parallel; each subtree owns disjoint data, so
/// the only synchronisation is the join before this node is assembled.
///
/// If no octant ends up populated the node falls back to a leaf holding
/// every index, which together with the depth cap guarantees termination
/// for coincident points.
fn build_node(particles: &[Particle], bounds: Aabb, indices: Vec<usize>, depth: usize, max_leaf: usize) -> OctreeNode {
    if indices.len() <= max_leaf || depth > MAX_TREE_DEPTH {
        return OctreeNode::leaf(bounds, indices);
    }

    let mut buckets: [Vec<usize>; 8] = Default::default();
    let expected = indices.len() / 8 + 1;
    for bucket in buckets.iter_mut() {
        bucket.reserve(expected);
    }
    for &idx in &indices {
        buckets[bounds.octant_of(&particles[idx].x)].push(idx);
    }

    let tasks: Vec<(usize, Vec<usize>)> = buckets
        .into_iter()
        .enumerate()
        .filter(|(_, bucket)| !bucket.is_empty())
        .collect();

    if tasks.is_empty() {
        return OctreeNode::leaf(bounds, indices);
    }

    let build_child = |(octant, child_indices): (usize, Vec<usize>)| {
        let child = build_node(particles, bounds.child(octant), child_indices, depth + 1, max_leaf);
        (octant, child)
    };

    let built: Vec<(usize, OctreeNode)> = if tasks.len() > 2 {
        tasks.into_par_iter().map(build_child).collect()
    } else {
        tasks.into_iter().map(build_child).collect()
    };

    let mut node = OctreeNode::leaf(bounds, Vec::new());
    for (octant, child) in built {
        node.children[octant] = Some(Box::new(child));
    }
    node
}

/// Post-order mass / COM aggregation.
///
/// Leaves sum their own particles; interior nodes sum their children after
/// visiting them. A node with zero mass takes its box center as COM so no
/// NaN reaches the opening test.
fn accumulate_mass(node: &mut OctreeNode, particles: &[Particle]) {
    let mut mass = 0.0;
    let mut weighted = NVec3::zeros();

    if node.is_leaf() {
        for &idx in &node.indices {
            let p = &particles[idx];
            mass += p.m;
            weighted += p.x * p.m;
        }
    } else {
        for child in node.children.iter_mut().flatten() {
            accumulate_mass(child, particles);
            mass += child.mass;
            weighted += child.com * child.mass;
        }
    }

    node.mass = mass;
    node.com = if mass > 0.0 { weighted / mass } else { node.bounds.center };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_particles(n: usize, seed: u64) -> Vec<Particle> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let x = NVec3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                Particle::new(x, NVec3::zeros(), rng.gen_range(0.5..2.0), 0.1)
            })
            .collect()
    }

    fn check_interior_invariants(node: &OctreeNode) {
        if node.is_leaf() {
            return;
        }
        assert!(node.indices.is_empty(), "interior node holds indices");
        let mut mass = 0.0;
        let mut weighted = NVec3::zeros();
        for child in node.children() {
            check_interior_invariants(child);
            mass += child.mass;
            weighted += child.com * child.mass;
        }
        assert!((node.mass - mass).abs() <= 1e-9 * mass.max(1.0));
        if mass > 0.0 {
            assert!((node.com - weighted / mass).norm() < 1e-9);
        }
    }

    #[test]
    fn empty_bounds_is_unit_box() {
        let b = compute_bounds(&[]);
        assert_eq!(b, Aabb::unit());
    }

    #[test]
    fn bounds_contain_boundary_points_strictly() {
        let ps = vec![
            Particle::new(NVec3::new(-1.0, 0.0, 2.0), NVec3::zeros(), 1.0, 1.0),
            Particle::new(NVec3::new(3.0, 5.0, -2.0), NVec3::zeros(), 1.0, 1.0),
        ];
        let b = compute_bounds(&ps);
        for p in &ps {
            let d = p.x - b.center;
            assert!(d.x.abs() < b.half.x && d.y.abs() < b.half.y && d.z.abs() < b.half.z);
        }
        assert!((b.half.x - (2.0 + BOUNDS_EPS)).abs() < 1e-12);
    }

    #[test]
    fn octant_tie_goes_to_upper_half() {
        let b = Aabb::unit();
        assert_eq!(b.octant_of(&NVec3::zeros()), 7);
        assert_eq!(b.octant_of(&NVec3::new(-0.1, 0.0, -0.1)), 2);
        for octant in 0..8 {
            let child = b.child(octant);
            assert_eq!(b.octant_of(&child.center), octant);
            assert!(b.contains(&child.center));
        }
    }

    #[test]
    fn small_population_is_single_leaf() {
        let ps = random_particles(8, 1);
        let tree = BarnesHutTree::build(&ps, BarnesHutParams::default());
        assert!(tree.root().is_leaf());
        assert_eq!(tree.root().indices.len(), 8);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn partition_is_exact() {
        let ps = random_particles(2_000, 7);
        let tree = BarnesHutTree::build(&ps, BarnesHutParams::default());

        let mut seen: Vec<usize> = tree.leaves().iter().flat_map(|l| l.indices.iter().copied()).collect();
        assert_eq!(seen.len(), ps.len());
        seen.sort_unstable();
        assert!(seen.iter().copied().eq(0..ps.len()), "index missing or duplicated");

        for leaf in tree.leaves() {
            assert!(leaf.indices.len() <= 8);
        }
    }

    #[test]
    fn root_mass_is_conserved_and_interiors_aggregate() {
        let ps = random_particles(3_000, 11);
        let tree = BarnesHutTree::build(&ps, BarnesHutParams::default());
        let total: f64 = ps.iter().map(|p| p.m).sum();
        assert!((tree.root().mass - total).abs() < 1e-9 * total);
        check_interior_invariants(tree.root());
    }

    #[test]
    fn coincident_points_terminate_at_depth_cap() {
        let ps: Vec<Particle> = (0..100)
            .map(|_| Particle::new(NVec3::new(1.0, 2.0, 3.0), NVec3::zeros(), 1.0, 1.0))
            .collect();
        let tree = BarnesHutTree::build(&ps, BarnesHutParams::default());
        assert!(tree.depth() <= MAX_TREE_DEPTH + 1);
        let held: usize = tree.leaves().iter().map(|l| l.indices.len()).sum();
        assert_eq!(held, 100);
    }

    #[test]
    fn massless_population_uses_box_center() {
        let ps: Vec<Particle> = (0..20)
            .map(|i| Particle::new(NVec3::new(i as f64, 0.0, 0.0), NVec3::zeros(), 0.0, 1.0))
            .collect();
        let tree = BarnesHutTree::build(&ps, BarnesHutParams::default());
        assert_eq!(tree.root().mass, 0.0);
        assert_eq!(tree.root().com, tree.root().bounds.center);
        assert_eq!(tree.compute_force(3, &ps), NVec3::zeros());
    }

    #[test]
    fn empty_tree_yields_zero_force() {
        let tree = BarnesHutTree::build(&[], BarnesHutParams::default());
        assert_eq!(tree.particle_count(), 0);
        assert_eq!(tree.compute_force(0, &[]), NVec3::zeros());
    }

    #[test]
    fn zero_theta_matches_direct_sum() {
        let ps = random_particles(50, 3);
        let params = BarnesHutParams { theta: 0.0, max_leaf_size: 2, ..Default::default() };
        let tree = BarnesHutTree::build(&ps, params);
        assert!(!tree.root().is_leaf());

        let eps2 = params.softening * params.softening;
        for i in 0..ps.len() {
            let mut direct = NVec3::zeros();
            for (j, p_j) in ps.iter().enumerate() {
                if j != i {
                    direct += softened_pull(p_j.x - ps[i].x, p_j.m, params.g, eps2);
                }
            }
            let approx = tree.compute_force(i, &ps);
            assert!((approx - direct).norm() <= 1e-9 * direct.norm().max(1.0), "particle {i}");
        }
    }

    #[test]
    fn larger_theta_stays_close_to_direct_sum() {
        let ps = random_particles(500, 5);
        let params = BarnesHutParams { theta: 0.5, ..Default::default() };
        let tree = BarnesHutTree::build(&ps, params);
        let eps2 = params.softening * params.softening;

        let mut err2 = 0.0;
        let mut norm2 = 0.0;
        for i in (0..ps.len()).step_by(25) {
            let mut direct = NVec3::zeros();
            for (j, p_j) in ps.iter().enumerate() {
                if j != i {
                    direct += softened_pull(p_j.x - ps[i].x, p_j.m, params.g, eps2);
                }
            }
            err2 += (tree.compute_force(i, &ps) - direct).norm_squared();
            norm2 += direct.norm_squared();
        }
        let rms = (err2 / norm2).sqrt();
        assert!(rms < 0.03, "relative rms error too large: {rms}");
    }
}
