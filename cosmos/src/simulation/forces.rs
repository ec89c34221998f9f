//! Force contributors for the n-body engine
//!
//! Defines the `ForceTerm` trait and its implementations: Barnes–Hut
//! gravity, direct O(n²) gravity, and the interactive tool field

use rayon::prelude::*;

use crate::simulation::barnes_hut::{softened_pull, BarnesHutTree};
use crate::simulation::params::BarnesHutParams;
use crate::simulation::settings::{InteractionTool, ToolSettings};
use crate::simulation::states::{NVec3, Particle};

/// Trait for force sources operating on a particle slice
/// Implementations add their contribution into `out[i]` for each particle
pub trait ForceTerm {
    fn accumulate(&self, particles: &[Particle], out: &mut [NVec3]);
}

/// Collection of force terms, summed into one force per particle
pub struct ForceSet<'a> {
    terms: Vec<Box<dyn ForceTerm + Send + Sync + 'a>>,
}

impl<'a> ForceSet<'a> {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Add a force term
    pub fn with(mut self, term: impl ForceTerm + Send + Sync + 'a) -> Self {
        self.terms.push(Box::new(term));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Zero `out` and add every term's contribution
    pub fn accumulate_forces(&self, particles: &[Particle], out: &mut [NVec3]) {
        for f in out.iter_mut() {
            *f = NVec3::zeros();
        }
        for term in &self.terms {
            term.accumulate(particles, out);
        }
    }
}

impl Default for ForceSet<'_> {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================================
// Gravity
// =========================================================================================

/// Newtonian gravity evaluated through a prebuilt [`BarnesHutTree`]
/// The tree may be a few steps old (rebuild cadence); leaves still read
/// current positions from `particles`
pub struct TreeGravity<'a> {
    pub tree: &'a BarnesHutTree,
}

impl ForceTerm for TreeGravity<'_> {
    fn accumulate(&self, particles: &[Particle], out: &mut [NVec3]) {
        out.par_iter_mut().enumerate().for_each(|(i, f)| {
            *f += particles[i].m * self.tree.compute_force(i, particles);
        });
    }
}

/// Softened Newtonian gravity by direct summation over unordered pairs
pub struct DirectGravity {
    pub params: BarnesHutParams,
}

impl ForceTerm for DirectGravity {
    fn accumulate(&self, particles: &[Particle], out: &mut [NVec3]) {
        let n = particles.len();
        let eps2 = self.params.softening * self.params.softening;

        // Loop over each unordered pair (i, j) with i < j
        for i in 0..n {
            let p_i = &particles[i];
            for j in (i + 1)..n {
                let p_j = &particles[j];

                // unit-mass pull on i toward j, scaled below for each side
                let pull = softened_pull(p_j.x - p_i.x, 1.0, self.params.g, eps2);

                // equal and opposite
                out[i] += p_i.m * p_j.m * pull;
                out[j] -= p_i.m * p_j.m * pull;
            }
        }
    }
}

// =========================================================================================
// Interactive tool
// =========================================================================================

/// Radial field centered on a user-supplied world point.
///
/// Only particles strictly inside `radius` of the center are affected, and
/// only while the tool is engaged. All forces are scaled by particle mass so
/// the resulting acceleration does not depend on it.
pub struct InteractiveField {
    pub tool: ToolSettings,
}

impl InteractiveField {
    /// Force on a single particle
    pub fn force_on(&self, p: &Particle) -> NVec3 {
        let tool = &self.tool;
        if !tool.is_active() {
            return NVec3::zeros();
        }

        let to_center = tool.center - p.x;
        let dist = to_center.norm();
        if dist >= tool.radius {
            return NVec3::zeros();
        }

        match tool.kind {
            InteractionTool::None => NVec3::zeros(),
            InteractionTool::Attract | InteractionTool::Repel => {
                if dist <= 0.0 {
                    return NVec3::zeros();
                }
                let sign = if tool.kind == InteractionTool::Attract { 1.0 } else { -1.0 };
                let falloff = 1.0 - dist / tool.radius;
                (sign * p.m * tool.strength * falloff / dist) * to_center
            }
            InteractionTool::Drag => (p.m * tool.strength / tool.radius) * to_center,
        }
    }
}

impl ForceTerm for InteractiveField {
    fn accumulate(&self, particles: &[Particle], out: &mut [NVec3]) {
        if !self.tool.is_active() {
            return;
        }
        out.par_iter_mut().zip(particles.par_iter()).for_each(|(f, p)| {
            *f += self.force_on(p);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(kind: InteractionTool) -> ToolSettings {
        ToolSettings {
            kind,
            center: NVec3::zeros(),
            radius: 10.0,
            strength: 100.0,
            engaged: true,
        }
    }

    fn at(x: f64, m: f64) -> Particle {
        Particle::new(NVec3::new(x, 0.0, 0.0), NVec3::zeros(), m, 1.0)
    }

    #[test]
    fn attract_pulls_toward_center_with_falloff() {
        let field = InteractiveField { tool: tool(InteractionTool::Attract) };
        let f = field.force_on(&at(5.0, 2.0));
        // m * strength * (1 - 5/10) = 100, pointing to -x
        assert!((f - NVec3::new(-100.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn repel_pushes_away() {
        let field = InteractiveField { tool: tool(InteractionTool::Repel) };
        let f = field.force_on(&at(-2.0, 1.0));
        assert!(f.x < 0.0 && f.y == 0.0 && f.z == 0.0);
    }

    #[test]
    fn drag_is_a_linear_spring() {
        let field = InteractiveField { tool: tool(InteractionTool::Drag) };
        let near = field.force_on(&at(2.0, 1.0));
        let far = field.force_on(&at(4.0, 1.0));
        assert!((far - 2.0 * near).norm() < 1e-12);
        assert!((near - NVec3::new(-20.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn inactive_or_out_of_range_tool_has_no_effect() {
        let mut t = tool(InteractionTool::Attract);
        let field = InteractiveField { tool: t };
        assert_eq!(field.force_on(&at(10.0, 1.0)), NVec3::zeros());
        assert_eq!(field.force_on(&at(0.0, 1.0)), NVec3::zeros());

        t.engaged = false;
        let field = InteractiveField { tool: t };
        assert_eq!(field.force_on(&at(1.0, 1.0)), NVec3::zeros());
    }

    #[test]
    fn direct_gravity_obeys_third_law() {
        let ps = vec![at(-0.5, 2.0), at(0.5, 3.0), Particle::new(NVec3::new(0.0, 1.0, 0.3), NVec3::zeros(), 1.5, 1.0)];
        let mut out = vec![NVec3::zeros(); ps.len()];
        ForceSet::new()
            .with(DirectGravity { params: BarnesHutParams::default() })
            .accumulate_forces(&ps, &mut out);
        let net: NVec3 = out.iter().sum();
        assert!(net.norm() < 1e-12, "net force not zero: {net:?}");
        assert!(out[0].x > 0.0 && out[1].x < 0.0);
    }

    #[test]
    fn tree_gravity_matches_direct_for_small_sets() {
        let ps: Vec<Particle> = (0..6)
            .map(|i| {
                let t = i as f64;
                Particle::new(NVec3::new(t.sin(), t.cos(), 0.1 * t), NVec3::zeros(), 1.0 + t, 0.1)
            })
            .collect();
        let params = BarnesHutParams::default();
        let tree = BarnesHutTree::build(&ps, params);

        let mut via_tree = vec![NVec3::zeros(); ps.len()];
        let mut direct = vec![NVec3::zeros(); ps.len()];
        ForceSet::new().with(TreeGravity { tree: &tree }).accumulate_forces(&ps, &mut via_tree);
        ForceSet::new().with(DirectGravity { params }).accumulate_forces(&ps, &mut direct);

        for (a, b) in via_tree.iter().zip(&direct) {
            assert!((a - b).norm() < 1e-9 * b.norm().max(1.0));
        }
    }
}
